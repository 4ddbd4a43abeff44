//! `fieldtrack config` - show or initialize the configuration file.

use std::path::{Path, PathBuf};

use clap::Args;
use fieldtrack::config::{config_file_path, TrackerConfig};

use crate::error::CliError;

/// Arguments of the `config` subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config file to inspect instead of ~/.fieldtrack/config.ini
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Write a default config file if none exists
    #[arg(long)]
    pub init: bool,
}

/// Run the config subcommand.
pub fn run(args: ConfigArgs) -> Result<(), CliError> {
    let path = args.path.unwrap_or_else(config_file_path);
    print!("{}", render(&path, args.init)?);
    Ok(())
}

/// Effective configuration as INI text, headed by where it came from.
fn render(path: &Path, init: bool) -> Result<String, CliError> {
    let mut out = String::new();

    if init {
        if TrackerConfig::ensure_exists_at(path)? {
            out.push_str(&format!("; Created {}\n", path.display()));
        } else {
            out.push_str(&format!("; Config already exists at {}\n", path.display()));
        }
    }

    let source = if path.exists() {
        path.display().to_string()
    } else {
        "built-in defaults".to_string()
    };
    let config = TrackerConfig::load_from(path)?;

    out.push_str(&format!("; Effective configuration ({})\n", source));
    out.push_str(&config.to_config_string());
    Ok(out)
}
