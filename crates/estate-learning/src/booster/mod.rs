//! Native gradient-boosted regression trees.
//!
//! One engine serves the three supported model families. They share
//! histogram binning, squared-error gradients and regularised leaf weights,
//! and differ in their defaults and in how trees are grown:
//!
//! | Family | Growth | Defaults |
//! |--------|--------|----------|
//! | `XGBRegressor` | depth-wise | lr 0.3, 100 trees, depth 6 |
//! | `LGBMRegressor` | leaf-wise, `num_leaves` | lr 0.1, 100 trees, 31 leaves |
//! | `CatBoostRegressor` | symmetric (oblivious) | lr 0.03, 1000 trees, depth 6 |
//!
//! Fitted models are plain serde data and are persisted with bincode by the
//! [`crate::store`] module.

pub mod binning;
mod grow;
pub mod tree;

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{LearningError, Result};
use crate::optimizer::{ParamValue, TrialParams};
use binning::BinnedMatrix;
use grow::GrowContext;
use tree::Tree;

// ============================================================================
// Families
// ============================================================================

/// The supported model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoosterFamily {
    XGBRegressor,
    LGBMRegressor,
    CatBoostRegressor,
}

/// How a family expands its trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowPolicy {
    DepthWise,
    LeafWise,
    Symmetric,
}

impl BoosterFamily {
    pub const ALL: [BoosterFamily; 3] = [
        BoosterFamily::XGBRegressor,
        BoosterFamily::LGBMRegressor,
        BoosterFamily::CatBoostRegressor,
    ];

    /// Name used in artifact paths and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoosterFamily::XGBRegressor => "XGBRegressor",
            BoosterFamily::LGBMRegressor => "LGBMRegressor",
            BoosterFamily::CatBoostRegressor => "CatBoostRegressor",
        }
    }

    pub fn grow_policy(&self) -> GrowPolicy {
        match self {
            BoosterFamily::XGBRegressor => GrowPolicy::DepthWise,
            BoosterFamily::LGBMRegressor => GrowPolicy::LeafWise,
            BoosterFamily::CatBoostRegressor => GrowPolicy::Symmetric,
        }
    }
}

impl fmt::Display for BoosterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoosterFamily {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xgbregressor" | "xgboost" | "xgb" => Ok(BoosterFamily::XGBRegressor),
            "lgbmregressor" | "lightgbm" | "lgbm" => Ok(BoosterFamily::LGBMRegressor),
            "catboostregressor" | "catboost" | "cat" => Ok(BoosterFamily::CatBoostRegressor),
            _ => Err(LearningError::InvalidConfig(format!(
                "Unknown model family '{s}'. Expected one of: XGBRegressor, LGBMRegressor, CatBoostRegressor"
            ))),
        }
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Hyperparameters of the boosting engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    pub learning_rate: f64,
    /// Number of boosting rounds. Zero yields a constant model.
    pub n_estimators: usize,
    /// Maximum tree depth; `0` means unlimited (leaf-wise growth only).
    pub max_depth: usize,
    /// Leaf budget for leaf-wise growth.
    pub num_leaves: usize,
    pub max_bin: usize,
    /// Minimum hessian sum in each child.
    pub min_child_weight: f64,
    /// Minimum row count in each child.
    pub min_child_samples: usize,
    /// L2 penalty on leaf weights.
    pub reg_lambda: f64,
    /// Minimum gain required to split.
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub colsample_bylevel: f64,
    pub seed: u64,
}

impl BoosterParams {
    /// Library defaults of each family.
    pub fn for_family(family: BoosterFamily) -> Self {
        match family {
            BoosterFamily::XGBRegressor => Self {
                learning_rate: 0.3,
                n_estimators: 100,
                max_depth: 6,
                num_leaves: 31,
                max_bin: 256,
                min_child_weight: 1.0,
                min_child_samples: 1,
                reg_lambda: 1.0,
                gamma: 0.0,
                subsample: 1.0,
                colsample_bytree: 1.0,
                colsample_bylevel: 1.0,
                seed: 0,
            },
            BoosterFamily::LGBMRegressor => Self {
                learning_rate: 0.1,
                n_estimators: 100,
                max_depth: 0,
                num_leaves: 31,
                max_bin: 255,
                min_child_weight: 1e-3,
                min_child_samples: 20,
                reg_lambda: 0.0,
                gamma: 0.0,
                subsample: 1.0,
                colsample_bytree: 1.0,
                colsample_bylevel: 1.0,
                seed: 0,
            },
            BoosterFamily::CatBoostRegressor => Self {
                learning_rate: 0.03,
                n_estimators: 1000,
                max_depth: 6,
                num_leaves: 64,
                max_bin: 254,
                min_child_weight: 0.0,
                min_child_samples: 1,
                reg_lambda: 3.0,
                gamma: 0.0,
                subsample: 1.0,
                colsample_bytree: 1.0,
                colsample_bylevel: 1.0,
                seed: 33,
            },
        }
    }

    /// Overwrite parameters by name.
    ///
    /// Accepts the names used by the search space plus `random_seed`
    /// (alias of `seed`). Unknown names and out-of-range values are
    /// configuration errors.
    pub fn apply(&mut self, params: &TrialParams) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "learning_rate" | "eta" => self.learning_rate = value.as_f64(),
                "n_estimators" => self.n_estimators = as_count(name, value)?,
                "max_depth" | "depth" => self.max_depth = as_count(name, value)?,
                "num_leaves" => self.num_leaves = as_count(name, value)?,
                "max_bin" => self.max_bin = as_count(name, value)?,
                "min_child_weight" => self.min_child_weight = value.as_f64(),
                "min_child_samples" => self.min_child_samples = as_count(name, value)?,
                "reg_lambda" | "l2_leaf_reg" => self.reg_lambda = value.as_f64(),
                "gamma" => self.gamma = value.as_f64(),
                "subsample" => self.subsample = value.as_f64(),
                "colsample_bytree" => self.colsample_bytree = value.as_f64(),
                "colsample_bylevel" => self.colsample_bylevel = value.as_f64(),
                "seed" | "random_seed" | "random_state" => self.seed = as_count(name, value)? as u64,
                other => {
                    return Err(LearningError::InvalidConfig(format!(
                        "Unknown hyperparameter '{other}'"
                    )));
                }
            }
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let ratio_ok = |v: f64| v > 0.0 && v <= 1.0;
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid("learning_rate", self.learning_rate));
        }
        if !ratio_ok(self.subsample) {
            return Err(invalid("subsample", self.subsample));
        }
        if !ratio_ok(self.colsample_bytree) {
            return Err(invalid("colsample_bytree", self.colsample_bytree));
        }
        if !ratio_ok(self.colsample_bylevel) {
            return Err(invalid("colsample_bylevel", self.colsample_bylevel));
        }
        if self.max_bin < 2 {
            return Err(invalid("max_bin", self.max_bin as f64));
        }
        if self.num_leaves < 2 {
            return Err(invalid("num_leaves", self.num_leaves as f64));
        }
        if self.reg_lambda < 0.0 || self.gamma < 0.0 || self.min_child_weight < 0.0 {
            return Err(LearningError::InvalidConfig(
                "reg_lambda, gamma and min_child_weight must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn invalid(name: &str, value: f64) -> LearningError {
    LearningError::InvalidConfig(format!("{name} out of range: {value}"))
}

fn as_count(name: &str, value: &ParamValue) -> Result<usize> {
    let v = value.as_f64();
    if v < 0.0 || v.fract() != 0.0 || !v.is_finite() {
        return Err(LearningError::InvalidConfig(format!(
            "{name} must be a non-negative integer, got {v}"
        )));
    }
    Ok(v as usize)
}

// ============================================================================
// Model
// ============================================================================

/// A gradient-boosted tree ensemble for regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBooster {
    family: BoosterFamily,
    params: BoosterParams,
    base_score: f64,
    trees: Vec<Tree>,
    /// Width of the training matrix, `None` until fitted.
    n_features: Option<usize>,
    best_iteration: Option<usize>,
}

/// Validation rows watched for early stopping.
#[derive(Debug, Clone, Copy)]
pub struct EvalSet<'a> {
    pub x: &'a Array2<f64>,
    pub y: &'a [f64],
}

impl GradientBooster {
    /// An unfitted model with the family's default parameters.
    pub fn new(family: BoosterFamily) -> Self {
        Self::with_params(family, BoosterParams::for_family(family))
    }

    pub fn with_params(family: BoosterFamily, params: BoosterParams) -> Self {
        Self {
            family,
            params,
            base_score: 0.0,
            trees: Vec::new(),
            n_features: None,
            best_iteration: None,
        }
    }

    pub fn family(&self) -> BoosterFamily {
        self.family
    }

    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    /// Apply named hyperparameters. Drops any fitted state.
    pub fn set_params(&mut self, params: &TrialParams) -> Result<()> {
        self.params.apply(params)?;
        self.reset();
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features.is_some()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    /// Round with the best validation RMSE when early stopping ran.
    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    fn reset(&mut self) {
        self.base_score = 0.0;
        self.trees.clear();
        self.n_features = None;
        self.best_iteration = None;
    }

    /// Fit on `x`/`y` for `n_estimators` rounds.
    pub fn fit(&mut self, x: &Array2<f64>, y: &[f64]) -> Result<()> {
        self.fit_inner(x, y, None)
    }

    /// Fit while watching `eval`; stop once its RMSE has not improved for
    /// `early_stopping_rounds` rounds and keep the trees up to the best
    /// round.
    pub fn fit_with_eval(
        &mut self,
        x: &Array2<f64>,
        y: &[f64],
        eval: EvalSet<'_>,
        early_stopping_rounds: usize,
    ) -> Result<()> {
        if eval.x.ncols() != x.ncols() || eval.x.nrows() != eval.y.len() {
            return Err(LearningError::InvalidData(format!(
                "Evaluation set shape {}x{} does not match training width {} / {} targets",
                eval.x.nrows(),
                eval.x.ncols(),
                x.ncols(),
                eval.y.len()
            )));
        }
        self.fit_inner(x, y, Some((eval, early_stopping_rounds)))
    }

    fn fit_inner(&mut self, x: &Array2<f64>, y: &[f64], eval: Option<(EvalSet<'_>, usize)>) -> Result<()> {
        self.params.validate()?;
        validate_training_data(x, y)?;
        self.reset();

        let n_rows = x.nrows();
        let n_features = x.ncols();
        let params = self.params.clone();

        self.base_score = y.iter().sum::<f64>() / n_rows as f64;
        let bins = BinnedMatrix::from_matrix(x, params.max_bin);
        let rows = row_major(x);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(params.seed);

        let mut predictions = vec![self.base_score; n_rows];
        let hess = vec![1.0; n_rows];
        let mut grad = vec![0.0; n_rows];

        let mut watch = eval.map(|(set, rounds)| EarlyStopping::new(set, rounds, self.base_score));

        let all_features: Vec<usize> = (0..n_features).collect();
        let all_rows: Vec<usize> = (0..n_rows).collect();
        let level_count = match params.max_depth {
            0 => 1,
            d => d,
        };

        for iteration in 0..params.n_estimators {
            for i in 0..n_rows {
                grad[i] = predictions[i] - y[i];
            }

            let sampled_rows = if params.subsample < 1.0 {
                sample_indices(&mut rng, &all_rows, params.subsample)
            } else {
                all_rows.clone()
            };
            let tree_features = sample_indices(&mut rng, &all_features, params.colsample_bytree);
            let level_features: Vec<Vec<usize>> = (0..level_count)
                .map(|_| sample_indices(&mut rng, &tree_features, params.colsample_bylevel))
                .collect();

            let ctx = GrowContext {
                bins: &bins,
                grad: &grad,
                hess: &hess,
                params: &params,
                level_features: &level_features,
            };
            let tree = match self.family.grow_policy() {
                GrowPolicy::DepthWise => grow::grow_depthwise(&ctx, &sampled_rows),
                GrowPolicy::LeafWise => grow::grow_leafwise(&ctx, &sampled_rows),
                GrowPolicy::Symmetric => grow::grow_symmetric(&ctx, &sampled_rows),
            };

            for (pred, row) in predictions.iter_mut().zip(&rows) {
                *pred += tree.predict(row);
            }

            let stop = match watch.as_mut() {
                Some(watch) => watch.record(iteration, &tree),
                None => false,
            };
            trace!(iteration, leaves = tree.n_leaves(), "Boosting round complete");
            self.trees.push(tree);
            if stop {
                debug!(iteration, "Early stopping triggered");
                break;
            }
        }

        if let Some(watch) = watch {
            if let Some(best) = watch.best_iteration {
                self.trees.truncate(best + 1);
                self.best_iteration = Some(best);
            }
        }

        self.n_features = Some(n_features);
        debug!(
            family = %self.family,
            trees = self.trees.len(),
            rows = n_rows,
            features = n_features,
            "Booster fitted"
        );
        Ok(())
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if !self.is_fitted() {
            return Err(LearningError::InvalidData(format!(
                "{} model has not been fitted",
                self.family
            )));
        }
        let expected = self.n_features.unwrap_or_default();
        if x.ncols() != expected {
            return Err(LearningError::InvalidData(format!(
                "Expected {expected} features, got {}",
                x.ncols()
            )));
        }
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        self.check_input(x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                self.predict_row(&row)
            })
            .collect())
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Model output when no feature is known.
    pub fn expected_value(&self) -> f64 {
        self.base_score + self.trees.iter().map(Tree::expected_value).sum::<f64>()
    }

    /// Exact TreeSHAP attributions, one row per sample and one column per
    /// feature. Each row plus [`Self::expected_value`] sums to the
    /// prediction.
    pub fn shap_values(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;
        let mut phi = Array2::zeros((x.nrows(), x.ncols()));
        for (row, mut out) in x.rows().into_iter().zip(phi.rows_mut()) {
            let row = row.to_vec();
            let mut acc = vec![0.0; row.len()];
            for tree in &self.trees {
                tree.accumulate_shap(&row, &mut acc);
            }
            for (slot, value) in out.iter_mut().zip(acc) {
                *slot = value;
            }
        }
        Ok(phi)
    }
}

struct EarlyStopping<'a> {
    set: EvalSet<'a>,
    rows: Vec<Vec<f64>>,
    predictions: Vec<f64>,
    rounds: usize,
    best_rmse: f64,
    best_iteration: Option<usize>,
}

impl<'a> EarlyStopping<'a> {
    fn new(set: EvalSet<'a>, rounds: usize, base_score: f64) -> Self {
        Self {
            rows: row_major(set.x),
            predictions: vec![base_score; set.y.len()],
            set,
            rounds,
            best_rmse: f64::INFINITY,
            best_iteration: None,
        }
    }

    /// Add `tree` to the running predictions; true when training should stop.
    fn record(&mut self, iteration: usize, tree: &Tree) -> bool {
        for (pred, row) in self.predictions.iter_mut().zip(&self.rows) {
            *pred += tree.predict(row);
        }
        let rmse = crate::metrics::rmse(self.set.y, &self.predictions);
        trace!(iteration, rmse, "Validation score");
        if rmse < self.best_rmse {
            self.best_rmse = rmse;
            self.best_iteration = Some(iteration);
            return false;
        }
        match self.best_iteration {
            Some(best) => iteration - best >= self.rounds,
            None => iteration + 1 >= self.rounds,
        }
    }
}

fn validate_training_data(x: &Array2<f64>, y: &[f64]) -> Result<()> {
    if x.nrows() == 0 {
        return Err(LearningError::InvalidData("Training matrix has no rows".to_string()));
    }
    if x.nrows() != y.len() {
        return Err(LearningError::InvalidData(format!(
            "Training matrix has {} rows but {} targets",
            x.nrows(),
            y.len()
        )));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(LearningError::InvalidData("Target contains non-finite values".to_string()));
    }
    Ok(())
}

fn row_major(x: &Array2<f64>) -> Vec<Vec<f64>> {
    x.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// `ceil(len * ratio)` (at least one) distinct items of `pool`, sorted.
fn sample_indices(rng: &mut Xoshiro256PlusPlus, pool: &[usize], ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 || pool.is_empty() {
        return pool.to_vec();
    }
    let take = ((pool.len() as f64 * ratio).ceil() as usize).clamp(1, pool.len());
    let mut picked = pool.to_vec();
    picked.shuffle(rng);
    picked.truncate(take);
    picked.sort_unstable();
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::rmse;
    use pretty_assertions::assert_eq;

    /// y = 3*x0 + x1^2 with a little structure in x2.
    fn synthetic(n: usize) -> (Array2<f64>, Vec<f64>) {
        let mut values = Vec::with_capacity(n * 3);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let x0 = (i % 17) as f64;
            let x1 = ((i * 7) % 11) as f64 - 5.0;
            let x2 = ((i * 3) % 5) as f64;
            values.extend_from_slice(&[x0, x1, x2]);
            y.push(3.0 * x0 + x1 * x1 + if x2 > 2.0 { 4.0 } else { 0.0 });
        }
        (Array2::from_shape_vec((n, 3), values).unwrap(), y)
    }

    fn std_dev(y: &[f64]) -> f64 {
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        (y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / y.len() as f64).sqrt()
    }

    fn small_params(family: BoosterFamily) -> BoosterParams {
        BoosterParams {
            n_estimators: 60,
            learning_rate: 0.3,
            min_child_samples: 2,
            ..BoosterParams::for_family(family)
        }
    }

    #[test]
    fn test_family_names_round_trip() {
        for family in BoosterFamily::ALL {
            assert_eq!(family.as_str().parse::<BoosterFamily>().unwrap(), family);
        }
        assert_eq!("xgboost".parse::<BoosterFamily>().unwrap(), BoosterFamily::XGBRegressor);
        assert!("RandomForest".parse::<BoosterFamily>().is_err());
    }

    #[test]
    fn test_every_family_learns() {
        let (x, y) = synthetic(200);
        for family in BoosterFamily::ALL {
            let mut model = GradientBooster::with_params(family, small_params(family));
            model.fit(&x, &y).unwrap();
            let pred = model.predict(&x).unwrap();
            assert!(
                rmse(&y, &pred) < 0.5 * std_dev(&y),
                "{family} failed to fit: rmse {}",
                rmse(&y, &pred)
            );
        }
    }

    #[test]
    fn test_fit_is_deterministic_with_sampling() {
        let (x, y) = synthetic(120);
        let params = BoosterParams {
            subsample: 0.7,
            colsample_bytree: 0.7,
            colsample_bylevel: 0.8,
            seed: 33,
            ..small_params(BoosterFamily::XGBRegressor)
        };
        let mut a = GradientBooster::with_params(BoosterFamily::XGBRegressor, params.clone());
        let mut b = GradientBooster::with_params(BoosterFamily::XGBRegressor, params);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_zero_estimators_predicts_the_mean() {
        let (x, y) = synthetic(30);
        let params = BoosterParams {
            n_estimators: 0,
            ..BoosterParams::for_family(BoosterFamily::LGBMRegressor)
        };
        let mut model = GradientBooster::with_params(BoosterFamily::LGBMRegressor, params);
        model.fit(&x, &y).unwrap();
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        assert_eq!(model.n_trees(), 0);
        assert!(model.predict(&x).unwrap().iter().all(|p| (p - mean).abs() < 1e-9));
    }

    #[test]
    fn test_early_stopping_keeps_best_round() {
        let (x, y) = synthetic(150);
        // Constant validation targets: every round that learns the
        // training signal makes the validation error worse.
        let eval_x = x.clone();
        let eval_y = vec![y.iter().sum::<f64>() / y.len() as f64; y.len()];
        let params = BoosterParams {
            n_estimators: 500,
            ..small_params(BoosterFamily::XGBRegressor)
        };
        let mut model = GradientBooster::with_params(BoosterFamily::XGBRegressor, params);
        model
            .fit_with_eval(&x, &y, EvalSet { x: &eval_x, y: &eval_y }, 5)
            .unwrap();

        let best = model.best_iteration().unwrap();
        assert_eq!(model.n_trees(), best + 1);
        assert!(model.n_trees() < 500);
    }

    #[test]
    fn test_shap_values_sum_to_prediction() {
        let (x, y) = synthetic(80);
        for family in BoosterFamily::ALL {
            let mut model = GradientBooster::with_params(family, small_params(family));
            model.fit(&x, &y).unwrap();
            let pred = model.predict(&x).unwrap();
            let phi = model.shap_values(&x).unwrap();
            let base = model.expected_value();
            for (row, p) in phi.rows().into_iter().zip(&pred) {
                let total = row.sum() + base;
                assert!((total - p).abs() < 1e-6, "{family}: {total} vs {p}");
            }
        }
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = synthetic(40);
        let mut model = GradientBooster::new(BoosterFamily::XGBRegressor);
        assert!(model.predict(&x).is_err());
        model.fit(&x, &y).unwrap();
        let narrow = Array2::zeros((2, 2));
        let err = model.predict(&narrow).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }

    #[test]
    fn test_apply_params() {
        let mut params = BoosterParams::for_family(BoosterFamily::CatBoostRegressor);
        let mut trial = TrialParams::new();
        trial.insert("learning_rate".into(), ParamValue::Float(0.1));
        trial.insert("max_depth".into(), ParamValue::Int(8));
        trial.insert("random_seed".into(), ParamValue::Int(33));
        params.apply(&trial).unwrap();
        assert_eq!(params.learning_rate, 0.1);
        assert_eq!(params.max_depth, 8);

        trial.insert("bogus".into(), ParamValue::Int(1));
        assert!(params.apply(&trial).is_err());

        let mut bad = TrialParams::new();
        bad.insert("subsample".into(), ParamValue::Float(0.0));
        assert!(params.apply(&bad).is_err());
    }

    #[test]
    fn test_nan_features_are_accepted() {
        let (mut x, y) = synthetic(60);
        x[[0, 0]] = f64::NAN;
        x[[5, 1]] = f64::NAN;
        let mut model = GradientBooster::with_params(
            BoosterFamily::XGBRegressor,
            small_params(BoosterFamily::XGBRegressor),
        );
        model.fit(&x, &y).unwrap();
        assert!(model.predict(&x).unwrap().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_serde_round_trip_preserves_predictions() {
        let (x, y) = synthetic(50);
        let mut model = GradientBooster::with_params(
            BoosterFamily::LGBMRegressor,
            small_params(BoosterFamily::LGBMRegressor),
        );
        model.fit(&x, &y).unwrap();
        let bytes = bincode::serialize(&model).unwrap();
        let loaded: GradientBooster = bincode::deserialize(&bytes).unwrap();
        assert_eq!(loaded.predict(&x).unwrap(), model.predict(&x).unwrap());
    }
}
