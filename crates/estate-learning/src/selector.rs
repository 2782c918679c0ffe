//! Feature selection by mean absolute SHAP attribution.
//!
//! A fixed depth-wise booster is fitted on the encoded training rows, then
//! TreeSHAP attributions are computed on the hold-out rows. Features are
//! ranked by the mean magnitude of their attribution and the top `n` are
//! kept.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::booster::{BoosterFamily, BoosterParams, GradientBooster};
use crate::error::{LearningError, Result};

/// Settings of the ranking model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Number of features kept.
    /// Default: 61
    pub top_n: usize,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub gamma: f64,
    pub min_child_weight: f64,
    pub seed: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            top_n: 61,
            n_estimators: 1000,
            max_depth: 8,
            learning_rate: 0.01,
            gamma: 0.2,
            min_child_weight: 4.0,
            seed: 33,
        }
    }
}

impl SelectorConfig {
    fn booster_params(&self) -> BoosterParams {
        BoosterParams {
            learning_rate: self.learning_rate,
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            gamma: self.gamma,
            min_child_weight: self.min_child_weight,
            subsample: 1.0,
            colsample_bytree: 1.0,
            colsample_bylevel: 1.0,
            seed: self.seed,
            ..BoosterParams::for_family(BoosterFamily::XGBRegressor)
        }
    }
}

/// One feature's importance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub mean_abs_shap: f64,
}

/// Every feature ranked, plus the kept prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRanking {
    pub ranked: Vec<FeatureImportance>,
    pub selected: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureSelector {
    config: SelectorConfig,
}

impl FeatureSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn select(
        &self,
        names: &[String],
        train_x: &Array2<f64>,
        train_y: &[f64],
        holdout_x: &Array2<f64>,
    ) -> Result<FeatureRanking> {
        if names.len() != train_x.ncols() || holdout_x.ncols() != train_x.ncols() {
            return Err(LearningError::InvalidData(format!(
                "{} feature names for {} training and {} hold-out columns",
                names.len(),
                train_x.ncols(),
                holdout_x.ncols()
            )));
        }
        if holdout_x.nrows() == 0 {
            return Err(LearningError::InvalidData(
                "Hold-out partition is empty".to_string(),
            ));
        }

        let mut model =
            GradientBooster::with_params(BoosterFamily::XGBRegressor, self.config.booster_params());
        model.fit(train_x, train_y)?;
        debug!(trees = model.n_trees(), "Fitted selection model");

        let shap = model.shap_values(holdout_x)?;
        let n_rows = holdout_x.nrows() as f64;
        let mut ranked: Vec<FeatureImportance> = names
            .iter()
            .zip(shap.columns())
            .map(|(name, column)| FeatureImportance {
                name: name.clone(),
                mean_abs_shap: column.iter().map(|v| v.abs()).sum::<f64>() / n_rows,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.mean_abs_shap
                .total_cmp(&a.mean_abs_shap)
                .then_with(|| a.name.cmp(&b.name))
        });

        let keep = self.config.top_n.min(ranked.len());
        let selected: Vec<String> = ranked[..keep].iter().map(|f| f.name.clone()).collect();
        info!(
            "Selected {} of {} features by mean |SHAP|",
            selected.len(),
            ranked.len()
        );
        Ok(FeatureRanking { ranked, selected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(top_n: usize) -> SelectorConfig {
        SelectorConfig {
            top_n,
            n_estimators: 40,
            learning_rate: 0.3,
            min_child_weight: 1.0,
            gamma: 0.0,
            ..SelectorConfig::default()
        }
    }

    /// Only `signal` drives the target; `noise` and `constant` do not.
    fn data(n: usize) -> (Vec<String>, Array2<f64>, Vec<f64>) {
        let names = vec!["constant".to_string(), "noise".to_string(), "signal".to_string()];
        let mut values = Vec::with_capacity(n * 3);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let signal = (i % 10) as f64;
            values.extend_from_slice(&[1.0, ((i * 7) % 3) as f64, signal]);
            y.push(100.0 * signal);
        }
        (names, Array2::from_shape_vec((n, 3), values).unwrap(), y)
    }

    #[test]
    fn test_signal_ranks_first() {
        let (names, x, y) = data(80);
        let ranking = FeatureSelector::new(config(2)).select(&names, &x, &y, &x).unwrap();
        assert_eq!(ranking.selected.len(), 2);
        assert_eq!(ranking.selected[0], "signal");
        assert_eq!(ranking.ranked.len(), 3);
        // Never-split features tie at zero and fall back to name order.
        let constant = ranking.ranked.iter().find(|f| f.name == "constant").unwrap();
        assert_eq!(constant.mean_abs_shap, 0.0);
    }

    #[test]
    fn test_top_n_is_capped_by_feature_count() {
        let (names, x, y) = data(40);
        let ranking = FeatureSelector::new(config(61)).select(&names, &x, &y, &x).unwrap();
        assert_eq!(ranking.selected.len(), 3);
    }

    #[test]
    fn test_name_count_must_match() {
        let (names, x, y) = data(20);
        let err = FeatureSelector::new(config(2))
            .select(&names[..2], &x, &y, &x)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }
}
