//! Results returned by training runs.

use serde::{Deserialize, Serialize};

use crate::booster::BoosterFamily;
use crate::metrics::RegressionMetrics;
use crate::optimizer::{Trial, TrialParams};

/// Scores of the model fitted on one fold of the final evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    /// Zero-based fold number; also the stored model's file stem.
    pub fold_no: usize,
    pub rmse: f64,
    pub mae: f64,
    pub rmsle: f64,
    pub r2: f64,
    pub adj_r2: f64,
    /// Targets of the fold's test rows.
    pub actual: Vec<f64>,
    /// Predictions for the same rows, in the same order.
    pub predicted: Vec<f64>,
}

impl FoldResult {
    pub fn new(fold_no: usize, metrics: RegressionMetrics, actual: Vec<f64>, predicted: Vec<f64>) -> Self {
        Self {
            fold_no,
            rmse: metrics.rmse,
            mae: metrics.mae,
            rmsle: metrics.rmsle,
            r2: metrics.r2,
            adj_r2: metrics.adjusted_r2,
            actual,
            predicted,
        }
    }
}

/// Everything a successful training run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrainingOutcome {
    pub family: BoosterFamily,
    pub folds: Vec<FoldResult>,
    /// Fold whose model was promoted to best.
    pub best_fold_no: usize,
    pub best_params: TrialParams,
    /// Mean cross-validated RMSE of `best_params` during the search.
    pub best_value: f64,
    pub trials: Vec<Trial>,
    /// Features the models were trained on, in model order.
    pub selected_features: Vec<String>,
}

impl TrainingOutcome {
    pub fn best_fold(&self) -> Option<&FoldResult> {
        self.folds.iter().find(|f| f.fold_no == self.best_fold_no)
    }

    /// Mean of a metric over every fold.
    pub fn mean_of(&self, metric: impl Fn(&FoldResult) -> f64) -> f64 {
        if self.folds.is_empty() {
            return f64::NAN;
        }
        self.folds.iter().map(metric).sum::<f64>() / self.folds.len() as f64
    }
}

/// Index of the fold with the lowest RMSE; the first one wins ties.
pub fn best_fold_index(folds: &[FoldResult]) -> Option<usize> {
    folds
        .iter()
        .enumerate()
        .fold(None::<(usize, f64)>, |best, (i, f)| match best {
            Some((_, rmse)) if rmse <= f.rmse => best,
            _ => Some((i, f.rmse)),
        })
        .map(|(i, _)| i)
}
