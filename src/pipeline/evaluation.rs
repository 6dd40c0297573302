//! Model evaluation stage: score the test matrix and write the metrics file

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::artifacts::ArtifactLayout;
use super::features::FeatureMatrix;
use super::forest::RandomForestModel;
use super::loader::write_json;
use super::records::Label;
use super::training::load_model;
use crate::error::{PipelineError, Result};

/// Scores written to `reports/metrics.json`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub auc: f64,
}

/// Counts of predicted vs. actual labels, spam being the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(predicted: &[Label], actual: &[Label]) -> Self {
        let mut cm = Self::default();
        for (&p, &a) in predicted.iter().zip(actual) {
            match (p.is_positive(), a.is_positive()) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (true, false) => cm.fp += 1,
                (false, true) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }
}

/// `num / denom`, or 0.0 for an empty denominator
fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Area under the ROC curve as the Mann-Whitney rank statistic.
///
/// Tied scores receive their average rank. Returns `None` when `actual`
/// holds a single class and the curve is undefined.
pub fn roc_auc(scores: &[f64], actual: &[Label]) -> Option<f64> {
    let n_pos = actual.iter().filter(|l| l.is_positive()).count();
    let n_neg = actual.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, averaged over runs of equal scores
    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        start = end;
    }

    let pos_rank_sum: f64 = ranks
        .iter()
        .zip(actual)
        .filter(|(_, l)| l.is_positive())
        .map(|(r, _)| r)
        .sum();
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}

/// Score a fitted model on a test matrix
pub fn evaluate(
    model: &RandomForestModel,
    matrix: &FeatureMatrix,
) -> Result<(Metrics, ConfusionMatrix)> {
    if matrix.is_empty() {
        return Err(PipelineError::evaluation("Test matrix has no rows"));
    }
    if matrix.n_features() != model.n_features() {
        return Err(PipelineError::evaluation(format!(
            "Test matrix has {} features but the model was trained on {}",
            matrix.n_features(),
            model.n_features()
        )));
    }
    if matrix.columns != model.feature_names() {
        return Err(PipelineError::evaluation(
            "Test matrix columns differ from the training columns",
        ));
    }

    let (predicted, scores) = model.predict_batch(&matrix.rows);
    let cm = ConfusionMatrix::from_predictions(&predicted, &matrix.labels);

    let auc = match roc_auc(&scores, &matrix.labels) {
        Some(auc) => auc,
        None => {
            warn!("test labels contain a single class, reporting AUC as 0.5");
            0.5
        }
    };

    let metrics = Metrics {
        accuracy: cm.accuracy(),
        precision: cm.precision(),
        recall: cm.recall(),
        auc,
    };
    Ok((metrics, cm))
}

/// Run the evaluation stage end to end
pub fn run_model_evaluation(layout: &ArtifactLayout) -> Result<Metrics> {
    let model = load_model(layout)?;
    let matrix = FeatureMatrix::read_csv(&layout.features_test())?;

    let (metrics, cm) = evaluate(&model, &matrix)?;
    write_json(&metrics, &layout.metrics())?;

    info!(
        accuracy = metrics.accuracy,
        precision = metrics.precision,
        recall = metrics.recall,
        auc = metrics.auc,
        tp = cm.tp,
        fp = cm.fp,
        tn = cm.tn,
        fn_ = cm.fn_,
        "wrote evaluation metrics"
    );
    Ok(metrics)
}
