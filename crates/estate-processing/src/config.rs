//! Configuration types for the preprocessing pipeline.
//!
//! [`PipelineConfig`] replaces the scattered constants a notebook-style
//! workflow would use (target name, identifier, ordinal list, split ratio,
//! seeds). [`ArtifactPaths`] enumerates every persisted file location under a
//! single root directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Ordinal (rank-encoded) columns of the housing schema.
///
/// `KitchenQual` appears once here; the classifier deduplicates anyway.
pub const DEFAULT_ORDINAL_COLUMNS: [&str; 16] = [
    "ExterCond",
    "HeatingQC",
    "ExterQual",
    "KitchenQual",
    "FireplaceQu",
    "GarageQual",
    "GarageCond",
    "BsmtQual",
    "BsmtCond",
    "BsmtExposure",
    "BsmtFinType1",
    "BsmtFinType2",
    "GarageRangeBuilt",
    "OverallQual",
    "OverallCond",
    "PoolQC",
];

/// Configuration for the preprocessing pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust
/// use estate_processing::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .target_column("SalePrice")
///     .top_features(40)
///     .build();
/// assert_eq!(config.top_features, 40);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the numeric column being predicted.
    /// Default: "SalePrice"
    pub target_column: String,

    /// Unique row identifier, dropped before modelling.
    /// Default: "Id"
    pub id_column: String,

    /// Columns encoded as integer ranks rather than one-hot indicators.
    pub ordinal_columns: Vec<String>,

    /// Columns with fewer distinct values than this (nulls included) are
    /// treated as nominal categories.
    /// Default: 30
    pub categorical_max_unique: usize,

    /// Fraction of the training file held out for feature selection.
    /// Default: 0.2
    pub test_size: f64,

    /// Seed for the train/hold-out shuffle.
    /// Default: 33
    pub random_seed: u64,

    /// Number of features kept by importance ranking.
    /// Default: 61
    pub top_features: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_column: "SalePrice".to_string(),
            id_column: "Id".to_string(),
            ordinal_columns: DEFAULT_ORDINAL_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            categorical_max_unique: 30,
            test_size: 0.2,
            random_seed: 33,
            top_features: 61,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.target_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyName("target_column"));
        }
        if self.id_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyName("id_column"));
        }
        if self.target_column == self.id_column {
            return Err(ConfigValidationError::TargetIsIdentifier(
                self.target_column.clone(),
            ));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigValidationError::InvalidRatio {
                field: "test_size".to_string(),
                value: self.test_size,
            });
        }
        if self.top_features == 0 {
            return Err(ConfigValidationError::ZeroCount("top_features"));
        }
        if self.categorical_max_unique == 0 {
            return Err(ConfigValidationError::ZeroCount("categorical_max_unique"));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid ratio for '{field}': {value} (must be strictly between 0.0 and 1.0)")]
    InvalidRatio { field: String, value: f64 },

    #[error("'{0}' must not be empty")]
    EmptyName(&'static str),

    #[error("'{0}' must be at least 1")]
    ZeroCount(&'static str),

    #[error("Target column '{0}' cannot also be the identifier column")]
    TargetIsIdentifier(String),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    target_column: Option<String>,
    id_column: Option<String>,
    ordinal_columns: Option<Vec<String>>,
    categorical_max_unique: Option<usize>,
    test_size: Option<f64>,
    random_seed: Option<u64>,
    top_features: Option<usize>,
}

impl PipelineConfigBuilder {
    /// Set the target column name.
    pub fn target_column(mut self, name: impl Into<String>) -> Self {
        self.target_column = Some(name.into());
        self
    }

    /// Set the identifier column name.
    pub fn id_column(mut self, name: impl Into<String>) -> Self {
        self.id_column = Some(name.into());
        self
    }

    /// Replace the list of ordinal columns.
    pub fn ordinal_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ordinal_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the distinct-value threshold below which a column is categorical.
    pub fn categorical_max_unique(mut self, limit: usize) -> Self {
        self.categorical_max_unique = Some(limit);
        self
    }

    /// Set the hold-out fraction used while fitting.
    ///
    /// # Arguments
    /// * `ratio` - Value strictly between 0.0 and 1.0 (e.g., 0.2 = 20%)
    pub fn test_size(mut self, ratio: f64) -> Self {
        self.test_size = Some(ratio);
        self
    }

    /// Set the seed for the train/hold-out shuffle.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set how many ranked features are kept.
    pub fn top_features(mut self, n: usize) -> Self {
        self.top_features = Some(n);
        self
    }

    /// Build the configuration, filling unset fields with defaults.
    pub fn build(self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            target_column: self.target_column.unwrap_or(defaults.target_column),
            id_column: self.id_column.unwrap_or(defaults.id_column),
            ordinal_columns: self.ordinal_columns.unwrap_or(defaults.ordinal_columns),
            categorical_max_unique: self
                .categorical_max_unique
                .unwrap_or(defaults.categorical_max_unique),
            test_size: self.test_size.unwrap_or(defaults.test_size),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
            top_features: self.top_features.unwrap_or(defaults.top_features),
        }
    }
}

/// Locations of every persisted artifact, all under one root directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub root: PathBuf,
    pub column_roles: PathBuf,
    pub missing_values: PathBuf,
    pub medians: PathBuf,
    pub ordinal: PathBuf,
    pub one_hot: PathBuf,
    pub selected_features: PathBuf,
    pub cleaned_train: PathBuf,
    /// Model snapshots live in `<models>/<Family>/`.
    pub models: PathBuf,
}

impl ArtifactPaths {
    /// Derive the standard artifact layout under `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            column_roles: root.join("column_roles.bin"),
            missing_values: root.join("missing_values.bin"),
            medians: root.join("medians.bin"),
            ordinal: root.join("ordinal.bin"),
            one_hot: root.join("one_hot.bin"),
            selected_features: root.join("selected_features.bin"),
            cleaned_train: root.join("cleaned_train.csv"),
            models: root.join("models"),
            root,
        }
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::under("artifacts")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_column, "SalePrice");
        assert_eq!(config.id_column, "Id");
        assert_eq!(config.categorical_max_unique, 30);
        assert_eq!(config.top_features, 61);
        assert_eq!(config.random_seed, 33);
        assert!(config.ordinal_columns.contains(&"GarageRangeBuilt".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfig::builder()
            .target_column("Price")
            .ordinal_columns(["Quality"])
            .categorical_max_unique(5)
            .test_size(0.25)
            .build();

        assert_eq!(config.target_column, "Price");
        assert_eq!(config.ordinal_columns, vec!["Quality".to_string()]);
        assert_eq!(config.categorical_max_unique, 5);
        assert_eq!(config.test_size, 0.25);
        assert_eq!(config.id_column, "Id");
    }

    #[test]
    fn test_validation_rejects_bad_ratio() {
        let result = PipelineConfig::builder().test_size(1.0).build().validate();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidRatio { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_target_as_id() {
        let config = PipelineConfig::builder()
            .target_column("Id")
            .id_column("Id")
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::TargetIsIdentifier(_))
        ));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = PipelineConfig::builder().top_features(12).build();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: PipelineConfig = serde_json::from_str(r#"{"top_features": 10}"#).unwrap();
        assert_eq!(parsed.top_features, 10);
        assert_eq!(parsed.target_column, "SalePrice");
    }

    #[test]
    fn test_artifact_layout() {
        let paths = ArtifactPaths::under("/tmp/run");
        assert_eq!(paths.medians, PathBuf::from("/tmp/run/medians.bin"));
        assert_eq!(paths.models, PathBuf::from("/tmp/run/models"));
        assert_eq!(paths.root, PathBuf::from("/tmp/run"));
    }
}
