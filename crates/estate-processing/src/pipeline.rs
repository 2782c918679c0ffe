//! The encoding pipeline: fit on training rows, replay anywhere.
//!
//! Fit mode learns every data-dependent quantity from the training
//! partition only and applies it to both partitions. Transform mode replays
//! the persisted [`FittedPipelineState`] on new rows and then selects the
//! model's input columns, in model order.
//!
//! Both modes run the same steps in the same order:
//!
//! 1. missing-value policy
//! 2. training medians for numeric columns that had nulls
//! 3. feature engineering
//! 4. ordinal rank encoding
//! 5. one-hot encoding (source columns dropped)
//!
//! Replay is a pure function of its input and the persisted state.

use crate::config::PipelineConfig;
use crate::dataset::drop_identifier;
use crate::encoding::{OneHotEncoder, OrdinalEncoder};
use crate::error::{ProcessingError, Result};
use crate::features::FeatureEngineer;
use crate::missing::MissingValuePolicy;
use crate::roles::ColumnRoles;
use crate::state::{FittedEncoders, FittedPipelineState};
use crate::utils::{column_f64, f64_series, has_column, median, total_nulls};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Result of fitting the pipeline on a train/hold-out pair.
#[derive(Debug, Clone)]
pub struct FitOutput {
    pub encoders: FittedEncoders,
    /// Encoded training rows.
    pub train: DataFrame,
    /// Hold-out rows replayed through the fitted encoders.
    pub holdout: DataFrame,
    /// Human-readable audit trail of what the fit did.
    pub steps: Vec<String>,
}

impl FitOutput {
    /// Encoded feature names, in frame order.
    pub fn feature_names(&self) -> Vec<String> {
        self.train
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }
}

/// Fits and replays the housing preprocessing.
#[derive(Debug, Clone, Default)]
pub struct EncodingPipeline {
    config: PipelineConfig,
}

impl EncodingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fit every encoder on `train` and replay them on `holdout`.
    ///
    /// Both frames hold features only: no target and no identifier.
    pub fn fit(
        &self,
        train: DataFrame,
        holdout: DataFrame,
        roles: &ColumnRoles,
    ) -> Result<FitOutput> {
        if train.height() == 0 {
            return Err(ProcessingError::EmptyDataset(
                "training partition has no rows".to_string(),
            ));
        }
        let mut steps = Vec::new();

        info!("Step 1: Applying missing-value policy...");
        let missing_values = MissingValuePolicy::fit(&train)?;
        let train = MissingValuePolicy::apply(&missing_values, train)?;

        info!("Step 2: Computing training medians...");
        let mut medians = BTreeMap::new();
        for column in &roles.numeric_with_missing {
            if !has_column(&train, column) {
                continue;
            }
            match median(&column_f64(&train, column)?) {
                Some(value) => {
                    steps.push(format!("Median fill for {column}: {value}"));
                    medians.insert(column.clone(), value);
                }
                None => warn!("Column {column} has no observed values; leaving nulls"),
            }
        }
        let train = fill_medians(train, &medians)?;

        info!("Step 3: Engineering features...");
        let train = FeatureEngineer::transform(train)?;

        info!("Step 4: Fitting ordinal encoders...");
        let ordinal = OrdinalEncoder::fit(&train, &roles.ordinal)?;
        for (column, mapping) in &ordinal.mappings {
            steps.push(format!(
                "Ordinal {column}: {} categories",
                mapping.categories.len()
            ));
        }
        let train = ordinal.transform(train)?;

        info!("Step 5: Fitting one-hot encoder...");
        let one_hot = OneHotEncoder::fit(&train, &roles.categorical)?;
        steps.push(format!(
            "One-hot: {} columns -> {} indicators",
            one_hot.columns.len(),
            one_hot.feature_names().len()
        ));
        let train = one_hot.transform(train)?;

        let encoders = FittedEncoders {
            missing_values,
            medians,
            ordinal,
            one_hot,
        };
        let holdout = Self::replay(holdout, &encoders)?;

        info!(
            "Encoding fitted: train {:?}, hold-out {:?}",
            train.shape(),
            holdout.shape()
        );
        debug!(
            "Remaining nulls: train {}, hold-out {}",
            total_nulls(&train),
            total_nulls(&holdout)
        );

        Ok(FitOutput {
            encoders,
            train,
            holdout,
            steps,
        })
    }

    /// Replay the persisted state on raw rows and select the model inputs.
    ///
    /// The identifier and target columns are dropped if present. A selected
    /// feature missing from the result is a schema mismatch and fails with
    /// [`ProcessingError::ColumnNotFound`].
    pub fn transform(&self, raw: DataFrame, state: &FittedPipelineState) -> Result<DataFrame> {
        let mut df = drop_identifier(raw, &self.config.id_column)?;
        if has_column(&df, &self.config.target_column) {
            df = df.drop(&self.config.target_column)?;
        }
        let df = Self::replay(df, &state.encoders)?;
        select_features(&df, &state.selected_features)
    }

    /// Steps 1-5 with already fitted encoders.
    pub fn replay(df: DataFrame, encoders: &FittedEncoders) -> Result<DataFrame> {
        let df = MissingValuePolicy::apply(&encoders.missing_values, df)?;
        let df = fill_medians(df, &encoders.medians)?;
        let df = FeatureEngineer::transform(df)?;
        let df = encoders.ordinal.transform(df)?;
        encoders.one_hot.transform(df)
    }
}

/// Fill nulls of each listed column with its median. Columns absent from
/// the frame are skipped.
fn fill_medians(mut df: DataFrame, medians: &BTreeMap<String, f64>) -> Result<DataFrame> {
    for (column, value) in medians {
        if !has_column(&df, column) {
            continue;
        }
        let filled = column_f64(&df, column)?
            .into_iter()
            .map(|v| Some(v.unwrap_or(*value)))
            .collect();
        df.replace(column, f64_series(column, filled))?;
    }
    Ok(df)
}

/// Select exactly `features`, in order.
pub fn select_features(df: &DataFrame, features: &[String]) -> Result<DataFrame> {
    if let Some(missing) = features.iter().find(|f| !has_column(df, f)) {
        return Err(ProcessingError::ColumnNotFound(missing.clone()));
    }
    Ok(df.select(features.iter().map(String::as_str))?)
}
