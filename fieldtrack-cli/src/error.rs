//! CLI error handling with user-friendly messages.

use std::fmt;
use std::path::PathBuf;
use std::process;

use fieldtrack::config::ConfigFileError;
use fieldtrack::TrackerError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or written
    Config(ConfigFileError),
    /// Scenario file could not be read or is malformed
    Scenario { path: PathBuf, reason: String },
    /// Tracker could not be created
    Tracker(TrackerError),
    /// Failed to build the Tokio runtime
    Runtime(std::io::Error),
    /// Failed to write replay output
    Output(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Scenario { .. } = self {
            eprintln!();
            eprintln!("A scenario is a JSON object with:");
            eprintln!("  one_shots   - [{{\"delay_ms\": 0, \"reading\": {{...}}}} | {{\"error\": {{\"kind\": \"timeout\"}}}}]");
            eprintln!("  watch       - [{{\"at_ms\": 5000, \"reading\": {{...}}}}]");
            eprintln!("  stop_at_ms  - optional, when to stop the tracker");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Scenario { path, reason } => {
                write!(f, "Invalid scenario '{}': {}", path.display(), reason)
            }
            CliError::Tracker(e) => write!(f, "Failed to create tracker: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to create Tokio runtime: {}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Tracker(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<TrackerError> for CliError {
    fn from(e: TrackerError) -> Self {
        CliError::Tracker(e)
    }
}
