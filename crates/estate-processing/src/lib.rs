//! Housing Data Preprocessing Library
//!
//! Turns raw residential sale records into a numeric feature matrix, and
//! persists everything it learned so that the exact same transformation can
//! be replayed on unseen rows.
//!
//! # Overview
//!
//! - **Column roles**: ordinal, categorical, numeric and numeric-with-missing,
//!   decided once from the raw training rows
//! - **Missing values**: per-column sentinel fills plus training-fitted
//!   medians and modes
//! - **Feature engineering**: ratios, sums, ages and presence flags
//! - **Encoding**: rank encoding for quality scales, one-hot for nominal
//!   columns, both tolerant of unseen categories
//! - **Persistence**: a typed [`FittedPipelineState`] saved as one artifact
//!   per concern
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use estate_processing::{ArtifactPaths, ColumnRoles, EncodingPipeline, PipelineConfig};
//! use estate_processing::dataset::{drop_identifier, read_dataset, split_target, train_test_split};
//!
//! let config = PipelineConfig::default();
//! let raw = drop_identifier(read_dataset("train.csv".as_ref())?, &config.id_column)?;
//! let roles = ColumnRoles::classify(&raw, &config)?;
//!
//! let (x, y) = split_target(raw, &config.target_column)?;
//! let split = train_test_split(&x, &y, config.test_size, config.random_seed)?;
//!
//! let fitted = EncodingPipeline::new(config).fit(split.train_x, split.holdout_x, &roles)?;
//! println!("{} encoded features", fitted.feature_names().len());
//! ```

pub mod config;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod features;
pub mod missing;
pub mod pipeline;
pub mod profiler;
pub mod roles;
pub mod state;
pub mod utils;

pub use config::{ArtifactPaths, ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use dataset::TrainTestSplit;
pub use encoding::{OneHotEncoder, OrdinalEncoder, UNKNOWN_RANK};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use features::FeatureEngineer;
pub use missing::{MissingValuePolicy, MissingValueState};
pub use pipeline::{EncodingPipeline, FitOutput};
pub use profiler::DataProfiler;
pub use roles::ColumnRoles;
pub use state::{FittedEncoders, FittedPipelineState};

// Re-export polars so downstream crates and binaries agree on one version.
pub use polars;
