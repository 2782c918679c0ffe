//! Progress reporting for training runs.
//!
//! A run moves through the stages in order:
//!
//! 1. [`DatasetBuild`](TrainingStage::DatasetBuild) - read, encode, select
//!    features and persist the pipeline state
//! 2. [`HyperparameterSearch`](TrainingStage::HyperparameterSearch) - score
//!    candidate parameters with k-fold RMSE
//! 3. [`FinalEvaluation`](TrainingStage::FinalEvaluation) - fit every fold
//!    with the best parameters and promote the best fold
//! 4. [`Complete`](TrainingStage::Complete)
//!
//! Any stage may end in [`Failed`](TrainingStage::Failed).
//!
//! # Example
//!
//! ```
//! use estate_learning::{ProgressUpdate, TrainingStage};
//!
//! let on_progress = |update: ProgressUpdate| {
//!     println!("[{}] {:.0}% - {}", update.stage.as_str(), update.progress * 100.0, update.message);
//!     if let Some((done, total)) = update.current_fold {
//!         println!("  Fold {}/{}", done, total);
//!     }
//! };
//! on_progress(ProgressUpdate::default());
//! ```

use std::str::FromStr;
use std::sync::Arc;

/// Phase of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TrainingStage {
    #[default]
    DatasetBuild,
    HyperparameterSearch,
    FinalEvaluation,
    Complete,
    Failed,
}

impl TrainingStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStage::DatasetBuild => "dataset_build",
            TrainingStage::HyperparameterSearch => "hyperparameter_search",
            TrainingStage::FinalEvaluation => "final_evaluation",
            TrainingStage::Complete => "complete",
            TrainingStage::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainingStage::Complete | TrainingStage::Failed)
    }

    /// Whether a run in this stage may move to `next`.
    #[must_use]
    pub fn can_advance_to(&self, next: TrainingStage) -> bool {
        use TrainingStage::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Failed) => true,
            (DatasetBuild, HyperparameterSearch)
            | (HyperparameterSearch, FinalEvaluation)
            | (FinalEvaluation, Complete) => true,
            _ => false,
        }
    }
}

/// Error returned when a string names no [`TrainingStage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTrainingStageError {
    invalid_value: String,
}

impl ParseTrainingStageError {
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl std::fmt::Display for ParseTrainingStageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid training stage: '{}'. Valid values are: dataset_build, \
             hyperparameter_search, final_evaluation, complete, failed",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseTrainingStageError {}

impl FromStr for TrainingStage {
    type Err = ParseTrainingStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dataset_build" => Ok(TrainingStage::DatasetBuild),
            "hyperparameter_search" => Ok(TrainingStage::HyperparameterSearch),
            "final_evaluation" => Ok(TrainingStage::FinalEvaluation),
            "complete" => Ok(TrainingStage::Complete),
            "failed" => Ok(TrainingStage::Failed),
            _ => Err(ParseTrainingStageError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// A progress update sent to the callback.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressUpdate {
    pub stage: TrainingStage,

    /// Overall progress from 0.0 to 1.0, non-decreasing within a run.
    pub progress: f64,

    pub message: String,

    /// `(completed, total)` folds, during the final evaluation only.
    pub current_fold: Option<(u32, u32)>,
}

/// Callback receiving [`ProgressUpdate`]s. It runs on the training thread
/// and should return quickly.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TrainingStage; 5] = [
        TrainingStage::DatasetBuild,
        TrainingStage::HyperparameterSearch,
        TrainingStage::FinalEvaluation,
        TrainingStage::Complete,
        TrainingStage::Failed,
    ];

    #[test]
    fn test_training_stage_roundtrip() {
        for stage in ALL {
            let parsed: TrainingStage = stage.as_str().parse().unwrap();
            assert_eq!(parsed, stage);
        }

        let err = "training".parse::<TrainingStage>().unwrap_err();
        assert_eq!(err.invalid_value(), "training");
        assert!(err.to_string().contains("Valid values"));
    }

    #[test]
    fn test_transitions() {
        use TrainingStage::*;
        assert!(DatasetBuild.can_advance_to(HyperparameterSearch));
        assert!(HyperparameterSearch.can_advance_to(FinalEvaluation));
        assert!(FinalEvaluation.can_advance_to(Complete));
        assert!(DatasetBuild.can_advance_to(Failed));

        assert!(!DatasetBuild.can_advance_to(FinalEvaluation));
        assert!(!Complete.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(DatasetBuild));
    }

    #[test]
    fn test_terminal_stages() {
        let terminal: Vec<_> = ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![&TrainingStage::Complete, &TrainingStage::Failed]);
    }

    #[test]
    fn test_progress_update_default() {
        let update = ProgressUpdate::default();
        assert_eq!(update.stage, TrainingStage::DatasetBuild);
        assert_eq!(update.progress, 0.0);
        assert!(update.message.is_empty());
        assert!(update.current_fold.is_none());
    }
}
