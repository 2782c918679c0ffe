//! Hyperparameter search.
//!
//! Every trial clones the base model, applies the sampled parameters and
//! scores them by mean RMSE over the k-fold splits. Lower is better. A trial
//! whose fit fails is recorded with an infinite objective and the search
//! moves on; only a search where every trial failed is an error.

mod samplers;
mod search_space;

pub use samplers::{create_sampler, RandomSampler, Sampler, SamplerKind, TpeSampler};
pub use search_space::{ParamSpec, ParamValue, SearchSpace, TrialParams};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::booster::GradientBooster;
use crate::cv::KFold;
use crate::error::{LearningError, Result};
use crate::metrics;

/// One evaluated parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub number: usize,
    pub params: TrialParams,
    /// Mean fold RMSE, `f64::INFINITY` for a failed trial.
    pub value: f64,
    pub error: Option<String>,
}

impl Trial {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub best_params: TrialParams,
    pub best_value: f64,
    pub trials: Vec<Trial>,
}

/// Searches a [`SearchSpace`] for the parameters with the lowest
/// cross-validated RMSE.
pub struct HyperparameterOptimizer {
    space: SearchSpace,
    n_trials: usize,
    sampler: Box<dyn Sampler>,
}

impl HyperparameterOptimizer {
    pub fn new(space: SearchSpace, n_trials: usize, sampler: Box<dyn Sampler>) -> Self {
        Self {
            space,
            n_trials,
            sampler,
        }
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    pub fn optimize(
        &mut self,
        base: &GradientBooster,
        x: &Array2<f64>,
        y: &[f64],
        folds: &KFold,
    ) -> Result<OptimizationOutcome> {
        if self.n_trials == 0 {
            return Err(LearningError::InvalidConfig(
                "Number of trials must be at least 1".to_string(),
            ));
        }
        let splits = folds.split(x.nrows())?;
        let mut history: Vec<(TrialParams, f64)> = Vec::with_capacity(self.n_trials);
        let mut trials = Vec::with_capacity(self.n_trials);

        for number in 0..self.n_trials {
            let params = self.sampler.sample(&self.space, &history);
            let (value, error) = match evaluate_trial(base, &params, x, y, &splits) {
                Ok(value) => (value, None),
                Err(e) => {
                    warn!(trial = number, error = %e, "Trial failed");
                    (f64::INFINITY, Some(e.to_string()))
                }
            };
            debug!(trial = number, value, "Trial finished");
            history.push((params.clone(), value));
            trials.push(Trial {
                number,
                params,
                value,
                error,
            });
        }

        // First trial wins ties.
        let best = trials
            .iter()
            .filter(|t| !t.failed())
            .fold(None::<&Trial>, |best, t| match best {
                Some(b) if b.value <= t.value => Some(b),
                _ => Some(t),
            });

        let Some(best) = best else {
            return Err(LearningError::TrainingFailed(format!(
                "All {} hyperparameter trials failed",
                trials.len()
            )));
        };

        info!(
            trial = best.number,
            rmse = best.value,
            "Hyperparameter search finished"
        );
        Ok(OptimizationOutcome {
            best_params: best.params.clone(),
            best_value: best.value,
            trials,
        })
    }
}

fn evaluate_trial(
    base: &GradientBooster,
    params: &TrialParams,
    x: &Array2<f64>,
    y: &[f64],
    splits: &[crate::cv::CvSplit],
) -> Result<f64> {
    let mut model = base.clone();
    model.set_params(params)?;

    let mut total = 0.0;
    for split in splits {
        let (train_x, train_y, test_x, test_y) = split.take(x, y);
        model.fit(&train_x, &train_y)?;
        let pred = model.predict(&test_x)?;
        let score = metrics::rmse(&test_y, &pred);
        if !score.is_finite() {
            return Err(LearningError::TrainingFailed(format!(
                "Fold {} produced a non-finite RMSE",
                split.fold
            )));
        }
        total += score;
    }
    Ok(total / splits.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booster::{BoosterFamily, BoosterParams};

    fn data() -> (Array2<f64>, Vec<f64>) {
        let n = 60;
        let mut values = Vec::with_capacity(n * 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let a = (i % 12) as f64;
            let b = ((i * 5) % 7) as f64;
            values.extend_from_slice(&[a, b]);
            y.push(10.0 * a + b);
        }
        (Array2::from_shape_vec((n, 2), values).unwrap(), y)
    }

    fn small_space() -> SearchSpace {
        SearchSpace::new()
            .float("learning_rate", 0.1, 0.5, 0.1)
            .int("n_estimators", 5, 30, 5)
            .int("max_depth", 2, 4, 1)
    }

    #[test]
    fn test_finds_finite_best() {
        let (x, y) = data();
        let base = GradientBooster::new(BoosterFamily::XGBRegressor);
        let mut optimizer =
            HyperparameterOptimizer::new(small_space(), 4, create_sampler(SamplerKind::Random, 33));
        let outcome = optimizer.optimize(&base, &x, &y, &KFold::new(3).with_shuffle(33)).unwrap();

        assert_eq!(outcome.trials.len(), 4);
        assert!(outcome.best_value.is_finite());
        let min = outcome
            .trials
            .iter()
            .map(|t| t.value)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(outcome.best_value, min);
        assert!(outcome.best_params.contains_key("max_depth"));
    }

    #[test]
    fn test_failed_trials_are_recorded() {
        let (x, y) = data();
        let base = GradientBooster::new(BoosterFamily::XGBRegressor);
        // `subsample = 0` is rejected by the booster, so every trial fails.
        let space = SearchSpace::new().fixed("subsample", ParamValue::Float(0.0));
        let mut optimizer =
            HyperparameterOptimizer::new(space, 2, create_sampler(SamplerKind::Tpe, 1));
        let err = optimizer
            .optimize(&base, &x, &y, &KFold::new(3))
            .unwrap_err();
        assert_eq!(err.error_code(), "TRAINING_FAILED");
    }

    #[test]
    fn test_mixed_failures_keep_searching() {
        let (x, y) = data();
        let params = BoosterParams {
            n_estimators: 10,
            ..BoosterParams::for_family(BoosterFamily::LGBMRegressor)
        };
        let base = GradientBooster::with_params(BoosterFamily::LGBMRegressor, params);
        // Half of the grid is an invalid leaf budget.
        let space = SearchSpace::new().int("num_leaves", 1, 2, 1).int("min_child_samples", 1, 1, 1);
        let mut optimizer =
            HyperparameterOptimizer::new(space, 12, create_sampler(SamplerKind::Random, 5));
        let outcome = optimizer.optimize(&base, &x, &y, &KFold::new(3)).unwrap();

        assert!(outcome.trials.iter().any(|t| t.failed() && t.value.is_infinite()));
        assert!(outcome.best_value.is_finite());
        assert_eq!(outcome.best_params["num_leaves"], ParamValue::Int(2));
    }
}
