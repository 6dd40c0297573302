//! Run summary and metrics tables

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{Metrics, Stage, StageOutcome};

/// One finished stage of a CLI invocation
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub stage: Stage,
    pub elapsed: Duration,
    pub outcome: StageOutcome,
}

/// Everything executed by one CLI invocation
#[derive(Debug, Default)]
pub struct RunSummary {
    pub stages: Vec<StageRecord>,
}

/// Short description of what a stage produced
pub fn describe_outcome(outcome: &StageOutcome) -> String {
    match outcome {
        StageOutcome::Ingestion(r) => {
            format!("{} records → {} train / {} test", r.total, r.train, r.test)
        }
        StageOutcome::Preprocessing(r) => format!(
            "{} train / {} test kept, {} duplicates, {} skipped",
            r.train.records.len(),
            r.test.records.len(),
            r.train.duplicates + r.test.duplicates,
            r.train.skipped + r.test.skipped
        ),
        StageOutcome::FeatureEngineering(r) => format!(
            "{} terms, {} train / {} test rows",
            r.vocabulary_size, r.train_rows, r.test_rows
        ),
        StageOutcome::ModelBuilding(r) => format!(
            "{} trees on {} rows, mean depth {:.1}",
            r.n_trees, r.train_rows, r.mean_depth
        ),
        StageOutcome::ModelEvaluation(m) => {
            format!("accuracy {:.4}, auc {:.4}", m.accuracy, m.auc)
        }
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, elapsed: Duration, outcome: StageOutcome) {
        self.stages.push(StageRecord {
            stage,
            elapsed,
            outcome,
        });
    }

    pub fn total_elapsed(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }

    /// Metrics from the evaluation stage, if it ran
    pub fn metrics(&self) -> Option<&Metrics> {
        self.stages.iter().find_map(|s| match &s.outcome {
            StageOutcome::ModelEvaluation(m) => Some(m),
            _ => None,
        })
    }

    pub fn build_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Stage").add_attribute(Attribute::Bold),
            Cell::new("Result").add_attribute(Attribute::Bold),
            Cell::new("Time").add_attribute(Attribute::Bold),
        ]);

        for record in &self.stages {
            table.add_row(vec![
                Cell::new(record.stage.title()),
                Cell::new(describe_outcome(&record.outcome)),
                Cell::new(format!("{:.2}s", record.elapsed.as_secs_f64())).fg(Color::Cyan),
            ]);
        }

        table.add_row(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new(""),
            Cell::new(format!("{:.2}s", self.total_elapsed().as_secs_f64()))
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();
        print_indented(&self.build_table());

        if let Some(metrics) = self.metrics() {
            display_metrics(metrics);
        }
    }
}

fn score_color(value: f64) -> Color {
    if value >= 0.9 {
        Color::Green
    } else if value >= 0.7 {
        Color::Yellow
    } else {
        Color::Red
    }
}

pub fn metrics_table(metrics: &Metrics) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    for (name, value) in [
        ("Accuracy", metrics.accuracy),
        ("Precision", metrics.precision),
        ("Recall", metrics.recall),
        ("AUC", metrics.auc),
    ] {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.4}", value)).fg(score_color(value)),
        ]);
    }
    table
}

pub fn display_metrics(metrics: &Metrics) {
    println!();
    println!(
        "    {} {}",
        style("📊").cyan(),
        style("TEST METRICS").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();
    print_indented(&metrics_table(metrics));
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::IngestionReport;

    fn metrics() -> Metrics {
        Metrics {
            accuracy: 0.95,
            precision: 0.5,
            recall: 1.0,
            auc: 0.75,
        }
    }

    #[test]
    fn test_metrics_table_lists_all_scores() {
        let rendered = metrics_table(&metrics()).to_string();
        for needle in ["Accuracy", "Precision", "Recall", "AUC", "0.9500", "0.7500"] {
            assert!(rendered.contains(needle), "missing {}", needle);
        }
    }

    #[test]
    fn test_run_summary_totals() {
        let mut summary = RunSummary::new();
        summary.record(
            Stage::Ingestion,
            Duration::from_millis(250),
            StageOutcome::Ingestion(IngestionReport {
                total: 10,
                train: 8,
                test: 2,
            }),
        );
        summary.record(
            Stage::ModelEvaluation,
            Duration::from_millis(750),
            StageOutcome::ModelEvaluation(metrics()),
        );

        assert_eq!(summary.total_elapsed(), Duration::from_secs(1));
        assert_eq!(summary.metrics(), Some(&metrics()));

        let rendered = summary.build_table().to_string();
        assert!(rendered.contains("Data Ingestion"));
        assert!(rendered.contains("10 records → 8 train / 2 test"));
        assert!(rendered.contains("1.00s"));
    }
}
