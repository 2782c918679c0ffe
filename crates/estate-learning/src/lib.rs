//! estate-learning: gradient-boosted sale-price models.
//!
//! This crate turns the encoded frames produced by `estate-processing` into
//! trained regressors. It provides native gradient boosting in three growth
//! styles, SHAP-based feature selection, k-fold hyperparameter search,
//! cross-validated final training with best-fold promotion, and inference
//! from the promoted model.
//!
//! # Features
//!
//! - **Boosting engine**: histogram trees grown depth-wise, leaf-wise or
//!   symmetrically, one style per [`BoosterFamily`]
//! - **Feature selection**: mean |TreeSHAP| ranking on hold-out rows
//! - **Hyperparameter search**: random or TPE sampling scored by k-fold RMSE
//! - **Final training**: every fold refit with early stopping; the lowest
//!   RMSE fold is promoted atomically
//! - **Progress reporting**: stage-aware callbacks
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use estate_learning::{BoosterFamily, Predictor, Trainer, TrainerConfig};
//!
//! let config = TrainerConfig::builder().artifact_root("artifacts").build()?;
//!
//! let mut trainer = Trainer::builder()
//!     .config(config.clone())
//!     .on_progress(|u| println!("{:.0}% - {}", u.progress * 100.0, u.message))
//!     .build()?;
//! let outcome = trainer.train(BoosterFamily::XGBRegressor, "train.csv".as_ref())?;
//!
//! let predictions = Predictor::new(&config)
//!     .predict(BoosterFamily::XGBRegressor, "test.csv".as_ref())?;
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`]:
//!
//! - [`LearningError::InvalidConfig`] - invalid configuration or parameters
//! - [`LearningError::InvalidData`] - matrix shapes or targets unusable
//! - [`LearningError::TrainingFailed`] - a fold fit failed, or every trial did
//! - [`LearningError::ArtifactNotFound`] - no promoted model for a family
//! - [`LearningError::Processing`] - preprocessing failed (schema mismatch
//!   included)

pub mod booster;
mod config;
pub mod cv;
mod error;
pub mod matrix;
pub mod metrics;
pub mod optimizer;
mod predictor;
mod progress;
pub mod selector;
pub mod store;
mod trainer;
mod types;

// Configuration types
pub use config::{TrainerConfig, TrainerConfigBuilder};
// Error types
pub use error::{LearningError, Result};
// Model types
pub use booster::{BoosterFamily, BoosterParams, EvalSet, GradientBooster, GrowPolicy};
pub use cv::{CvSplit, KFold};
pub use metrics::RegressionMetrics;
pub use optimizer::{HyperparameterOptimizer, OptimizationOutcome, SamplerKind, SearchSpace, Trial};
pub use selector::{FeatureRanking, FeatureSelector, SelectorConfig};
pub use store::{FsModelStore, ModelStore, BEST_MODEL_FILE};
// Training and inference
pub use predictor::Predictor;
pub use trainer::{PreparedDataset, Trainer, TrainerBuilder};
// Progress reporting types
pub use progress::{ParseTrainingStageError, ProgressCallback, ProgressUpdate, TrainingStage};
// Result types
pub use types::{best_fold_index, FoldResult, TrainingOutcome};

// Re-export the preprocessing crate so the binary and tests agree on one version.
pub use estate_processing;
