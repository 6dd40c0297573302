//! Command dispatch: run stages with step headers, spinners and a summary

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info};

use super::args::{Cli, Commands};
use crate::pipeline::loader::write_atomic;
use crate::pipeline::{
    render_pipeline_declaration, run_stage_with_progress, ArtifactLayout, Params, Stage,
};
use crate::report::{describe_outcome, display_metrics, RunSummary};
use crate::utils::{
    create_progress_bar, create_spinner, finish_with_failure, finish_with_success, print_banner,
    print_completion, print_config, print_failure, print_step_header, print_step_time,
};

/// Execute the parsed command line
pub fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Dag { output } => run_dag(output.as_deref()),
        command => run_stages(cli, &command.stages()),
    }
}

/// Print or write the stage declaration
pub fn run_dag(output: Option<&Path>) -> Result<()> {
    let yaml = render_pipeline_declaration().context("Failed to render pipeline declaration")?;
    match output {
        Some(path) => {
            write_atomic(path, |file| {
                use std::io::Write;
                file.write_all(yaml.as_bytes())?;
                Ok(())
            })
            .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote pipeline declaration");
        }
        None => print!("{}", yaml),
    }
    Ok(())
}

fn run_stages(cli: &Cli, stages: &[Stage]) -> Result<()> {
    let params_path = cli.params_path();
    let layout = ArtifactLayout::new(&cli.root);

    if !cli.quiet {
        print_banner(env!("CARGO_PKG_VERSION"));
        print_config(layout.root(), &params_path);
    }

    let params = Params::from_path(&params_path)?;
    let mut summary = RunSummary::new();

    for (idx, &stage) in stages.iter().enumerate() {
        if !cli.quiet {
            print_step_header(idx + 1, stage.title());
        }

        let progress = (!cli.quiet).then(|| match stage {
            Stage::ModelBuilding => {
                let n_trees = params.model_building().map_or(0, |m| m.n_estimators);
                create_progress_bar(n_trees as u64, "    Fitting trees")
            }
            _ => create_spinner(&format!("Running {}...", stage.title().to_lowercase())),
        });
        let on_tree = || {
            if let Some(pb) = &progress {
                pb.inc(1);
            }
        };

        let start = Instant::now();
        info!(stage = stage.name(), "stage started");
        let result = run_stage_with_progress(stage, &params, &layout, on_tree);
        let elapsed = start.elapsed();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(pb) = &progress {
                    finish_with_failure(pb);
                }
                error!(stage = stage.name(), error = %e, "stage failed");
                if !cli.quiet {
                    print_failure(&format!("{} failed", stage.title()));
                }
                return Err(e).with_context(|| format!("Stage '{}' failed", stage.name()));
            }
        };

        let description = describe_outcome(&outcome);
        info!(stage = stage.name(), elapsed_ms = elapsed.as_millis() as u64, "{}", description);
        if let Some(pb) = &progress {
            finish_with_success(pb, &description);
        }
        if !cli.quiet {
            print_step_time(elapsed);
        }
        summary.record(stage, elapsed, outcome);
    }

    if !cli.quiet {
        match stages {
            [Stage::ModelEvaluation] => {
                if let Some(metrics) = summary.metrics() {
                    display_metrics(metrics);
                }
            }
            [_] => {}
            _ => {
                summary.display();
                print_completion();
            }
        }
    }

    Ok(())
}
