//! Configuration of training and inference runs.
//!
//! [`TrainerConfig`] gathers the preprocessing settings, the artifact root
//! and the search/evaluation knobs. It can be built in code with
//! [`TrainerConfig::builder()`] or read from a JSON file; missing JSON
//! fields fall back to their defaults.
//!
//! # Example
//!
//! ```
//! use estate_learning::TrainerConfig;
//!
//! let config = TrainerConfig::builder()
//!     .artifact_root("artifacts")
//!     .n_folds(5)
//!     .n_trials(20)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.early_stopping_rounds, 200);
//! ```

use std::path::{Path, PathBuf};

use estate_processing::{ArtifactPaths, PipelineConfig};
use serde::{Deserialize, Serialize};

use crate::error::LearningError;
use crate::optimizer::SamplerKind;
use crate::selector::SelectorConfig;

/// Settings shared by the trainer and the predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Preprocessing settings. `processing.top_features` also sets how many
    /// features the selector keeps.
    pub processing: PipelineConfig,

    /// Directory holding every artifact (default: `artifacts`).
    pub artifact_root: PathBuf,

    /// Folds used by both the search and the final evaluation (default: 5).
    pub n_folds: usize,

    /// Hyperparameter trials per training run (default: 1).
    pub n_trials: usize,

    /// Seed of the fold shuffle and the sampler (default: 33).
    pub random_seed: u64,

    /// Rounds without validation improvement before a fold fit stops
    /// (default: 200).
    pub early_stopping_rounds: usize,

    pub sampler: SamplerKind,

    /// Settings of the feature-ranking model.
    pub selector: SelectorConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            processing: PipelineConfig::default(),
            artifact_root: PathBuf::from("artifacts"),
            n_folds: 5,
            n_trials: 1,
            random_seed: 33,
            early_stopping_rounds: 200,
            sampler: SamplerKind::default(),
            selector: SelectorConfig::default(),
        }
    }
}

impl TrainerConfig {
    #[must_use]
    pub fn builder() -> TrainerConfigBuilder {
        TrainerConfigBuilder::default()
    }

    /// Read a JSON configuration file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self, LearningError> {
        let text = std::fs::read_to_string(path)?;
        let config: TrainerConfig = serde_json::from_str(&text).map_err(|e| {
            LearningError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Standard artifact layout under [`Self::artifact_root`].
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::under(&self.artifact_root)
    }

    /// Selector settings with the configured feature budget.
    pub fn selector_config(&self) -> SelectorConfig {
        SelectorConfig {
            top_n: self.processing.top_features,
            ..self.selector.clone()
        }
    }

    pub fn validate(&self) -> Result<(), LearningError> {
        self.processing
            .validate()
            .map_err(|e| LearningError::InvalidConfig(e.to_string()))?;

        if self.n_folds < 2 {
            return Err(LearningError::InvalidConfig(
                "n_folds must be at least 2".to_string(),
            ));
        }
        if self.n_trials == 0 {
            return Err(LearningError::InvalidConfig(
                "n_trials must be at least 1".to_string(),
            ));
        }
        if self.early_stopping_rounds == 0 {
            return Err(LearningError::InvalidConfig(
                "early_stopping_rounds must be at least 1".to_string(),
            ));
        }
        if self.selector.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "selector.n_estimators must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`TrainerConfig`]; [`build()`](Self::build) validates.
#[derive(Debug, Clone, Default)]
pub struct TrainerConfigBuilder {
    config: TrainerConfig,
}

impl TrainerConfigBuilder {
    #[must_use]
    pub fn processing(mut self, processing: PipelineConfig) -> Self {
        self.config.processing = processing;
        self
    }

    #[must_use]
    pub fn artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.artifact_root = root.into();
        self
    }

    #[must_use]
    pub fn n_folds(mut self, n: usize) -> Self {
        self.config.n_folds = n;
        self
    }

    #[must_use]
    pub fn n_trials(mut self, n: usize) -> Self {
        self.config.n_trials = n;
        self
    }

    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    #[must_use]
    pub fn early_stopping_rounds(mut self, rounds: usize) -> Self {
        self.config.early_stopping_rounds = rounds;
        self
    }

    #[must_use]
    pub fn sampler(mut self, sampler: SamplerKind) -> Self {
        self.config.sampler = sampler;
        self
    }

    #[must_use]
    pub fn selector(mut self, selector: SelectorConfig) -> Self {
        self.config.selector = selector;
        self
    }

    pub fn build(self) -> Result<TrainerConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
