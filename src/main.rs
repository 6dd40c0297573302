//! spamflow: Spam Classification Pipeline CLI
//!
//! Runs the ingestion, preprocessing, feature engineering, model building
//! and evaluation stages individually or end to end.

use std::process::ExitCode;

use clap::Parser;

use spamflow::cli::{commands, Cli, Commands};
use spamflow::pipeline::ArtifactLayout;
use spamflow::utils::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The declaration command only prints; it never touches the log directory
    let log_dir = match cli.command {
        Commands::Dag { .. } => None,
        _ if cli.no_log_file => None,
        _ => Some(ArtifactLayout::new(&cli.root).log_dir()),
    };

    // Held until exit so the file writer flushes
    let _guard = match init_logging(cli.log_level(), log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match commands::execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
