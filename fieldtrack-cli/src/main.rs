//! FieldTrack CLI - Command-line interface
//!
//! Replays scripted provider scenarios through the location tracker and
//! manages the configuration file.

mod commands;
mod error;
mod scenario;

use clap::{Parser, Subcommand};

use commands::config::ConfigArgs;
use commands::replay::ReplayArgs;

#[derive(Parser)]
#[command(name = "fieldtrack")]
#[command(version, about = "Location acquisition and validation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted scenario and print the emitted events as JSON lines
    Replay(ReplayArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay(args) => commands::replay::run(args),
        Commands::Config(args) => commands::config::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
