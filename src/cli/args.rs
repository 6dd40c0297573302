//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::Stage;

/// spamflow - Reproducible spam classification pipeline
#[derive(Parser, Debug)]
#[command(name = "spamflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Parameter file. Relative paths are resolved against --root.
    #[arg(short, long, global = true, default_value = "params.yaml")]
    pub params: PathBuf,

    /// Project root; every artifact path is resolved under it
    #[arg(short, long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress banner, step headers and progress output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Do not write the JSON log file under <root>/logs
    #[arg(long, global = true, default_value = "false")]
    pub no_log_file: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Load the source dataset and write the train/test split
    Ingest,
    /// Encode labels, normalize text and deduplicate both splits
    Preprocess,
    /// Fit TF-IDF on the train split and write both feature matrices
    Featurize,
    /// Train the random forest and save the model
    Train,
    /// Score the model on the test matrix and write the metrics file
    Evaluate,
    /// Run all five stages in order
    Run,
    /// Print the stage declaration for the pipeline tracking tool
    Dag {
        /// Write the declaration to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    /// Stages executed by this command, in order
    pub fn stages(&self) -> Vec<Stage> {
        match self {
            Commands::Ingest => vec![Stage::Ingestion],
            Commands::Preprocess => vec![Stage::Preprocessing],
            Commands::Featurize => vec![Stage::FeatureEngineering],
            Commands::Train => vec![Stage::ModelBuilding],
            Commands::Evaluate => vec![Stage::ModelEvaluation],
            Commands::Run => Stage::ALL.to_vec(),
            Commands::Dag { .. } => Vec::new(),
        }
    }
}

impl Cli {
    /// Parameter file path, resolved against the project root
    pub fn params_path(&self) -> PathBuf {
        if self.params.is_absolute() {
            self.params.clone()
        } else {
            self.root.join(&self.params)
        }
    }

    /// Map the `-v` count to a default log level
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
