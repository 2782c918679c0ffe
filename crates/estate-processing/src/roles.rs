//! Column role classification.
//!
//! Roles are decided once from the raw training rows and then frozen: the
//! transform path reuses the persisted [`ColumnRoles`] verbatim even if new
//! data would suggest otherwise.

use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Frozen partition of the training columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoles {
    /// Rank-encoded columns (deduplicated configuration order).
    pub ordinal: Vec<String>,
    /// Nominal columns that are one-hot encoded.
    pub categorical: Vec<String>,
    /// Numeric columns that are neither ordinal nor categorical.
    pub numeric: Vec<String>,
    /// Subset of `numeric` with at least one null in training.
    pub numeric_with_missing: Vec<String>,
}

impl ColumnRoles {
    /// Classify the columns of a raw training frame.
    ///
    /// The target and identifier columns are never assigned a role. Distinct
    /// counts include null as a value.
    pub fn classify(df: &DataFrame, config: &PipelineConfig) -> Result<Self> {
        if df.height() == 0 {
            return Err(ProcessingError::EmptyDataset(
                "cannot classify columns of an empty frame".to_string(),
            ));
        }

        let mut ordinal: Vec<String> = Vec::new();
        for name in &config.ordinal_columns {
            if !ordinal.contains(name) {
                ordinal.push(name.clone());
            }
        }

        let mut roles = ColumnRoles {
            ordinal,
            ..Default::default()
        };

        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == config.target_column || name == config.id_column {
                continue;
            }
            if roles.ordinal.iter().any(|o| o == name) {
                continue;
            }

            let series = column.as_materialized_series();
            let distinct = series.n_unique()?;
            if distinct < config.categorical_max_unique {
                roles.categorical.push(name.to_string());
            } else if is_numeric_dtype(series.dtype()) {
                roles.numeric.push(name.to_string());
                if series.null_count() > 0 {
                    roles.numeric_with_missing.push(name.to_string());
                }
            }
        }

        debug!(
            "Classified columns: {} ordinal, {} categorical, {} numeric ({} with missing)",
            roles.ordinal.len(),
            roles.categorical.len(),
            roles.numeric.len(),
            roles.numeric_with_missing.len()
        );
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame() -> DataFrame {
        let ids: Vec<i64> = (1..=40).collect();
        let area: Vec<Option<f64>> = (0..40)
            .map(|i| if i % 10 == 0 { None } else { Some(1000.0 + i as f64) })
            .collect();
        let lot: Vec<i64> = (0..40).map(|i| 5000 + i * 13).collect();
        let zone: Vec<&str> = (0..40).map(|i| ["RL", "RM", "FV"][i % 3]).collect();
        let qual: Vec<&str> = (0..40).map(|i| ["Gd", "TA"][i % 2]).collect();
        let month: Vec<i64> = (0..40).map(|i| (i % 12) + 1).collect();
        let price: Vec<f64> = (0..40).map(|i| 100_000.0 + i as f64 * 1500.0).collect();
        df![
            "Id" => ids,
            "GrLivArea" => area,
            "LotArea" => lot,
            "MSZoning" => zone,
            "ExterQual" => qual,
            "MoSold" => month,
            "SalePrice" => price,
        ]
        .unwrap()
    }

    #[test]
    fn test_classify_partitions_columns() {
        let roles = ColumnRoles::classify(&frame(), &PipelineConfig::default()).unwrap();

        assert!(roles.ordinal.contains(&"ExterQual".to_string()));
        assert_eq!(roles.categorical, vec!["MSZoning", "MoSold"]);
        assert_eq!(roles.numeric, vec!["GrLivArea", "LotArea"]);
        assert_eq!(roles.numeric_with_missing, vec!["GrLivArea"]);
    }

    #[test]
    fn test_target_and_id_have_no_role() {
        let roles = ColumnRoles::classify(&frame(), &PipelineConfig::default()).unwrap();
        let assigned: Vec<&String> = roles
            .ordinal
            .iter()
            .chain(&roles.categorical)
            .chain(&roles.numeric)
            .collect();
        assert!(!assigned.iter().any(|c| *c == "SalePrice" || *c == "Id"));
    }

    #[test]
    fn test_ordinal_list_is_deduplicated() {
        let config = PipelineConfig::builder()
            .ordinal_columns(["KitchenQual", "KitchenQual", "PoolQC"])
            .build();
        let roles = ColumnRoles::classify(&frame(), &config).unwrap();
        assert_eq!(roles.ordinal, vec!["KitchenQual", "PoolQC"]);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let config = PipelineConfig::builder().categorical_max_unique(5).build();
        let roles = ColumnRoles::classify(&frame(), &config).unwrap();
        assert_eq!(roles.categorical, vec!["MSZoning"]);
        assert!(roles.numeric.contains(&"MoSold".to_string()));
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        let df = df!["Id" => Vec::<i64>::new()].unwrap();
        assert!(ColumnRoles::classify(&df, &PipelineConfig::default()).is_err());
    }
}
