//! Ordinal and one-hot encoders.
//!
//! Both encoders learn their vocabulary from training rows only and never
//! fail on unseen values at transform time: an unseen ordinal category maps
//! to [`UNKNOWN_RANK`], an unseen nominal category yields an all-zero
//! indicator row.

use crate::error::Result;
use crate::utils::{f64_series, has_column, is_numeric_dtype, series, series_f64, series_strings};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rank assigned to categories never seen during fit.
pub const UNKNOWN_RANK: i64 = -1;

/// Category label given to nulls in nominal columns.
pub const NULL_CATEGORY: &str = "null";

/// Sorted vocabulary of one column.
///
/// Numeric columns sort by value, string columns lexicographically. Labels
/// are the string form of each value so that fit and transform compare the
/// same representation.
fn sorted_vocabulary(series: &Series) -> Result<Vec<String>> {
    let labels = series_strings(series)?;

    if is_numeric_dtype(series.dtype()) {
        let values = series_f64(series)?;
        let mut pairs: Vec<(f64, String)> = values
            .into_iter()
            .zip(labels)
            .filter_map(|(v, l)| Some((v?, l?)))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        pairs.dedup_by(|a, b| a.0 == b.0);
        Ok(pairs.into_iter().map(|(_, l)| l).collect())
    } else {
        let mut labels: Vec<String> = labels.into_iter().flatten().collect();
        labels.sort();
        labels.dedup();
        Ok(labels)
    }
}

// =============================================================================
// Ordinal encoding
// =============================================================================

/// Category → rank table for one ordinal column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinalMapping {
    /// Categories in rank order; a category's rank is its index.
    pub categories: Vec<String>,
}

impl OrdinalMapping {
    /// Rank of `category`, or [`UNKNOWN_RANK`] if it was not seen in fit.
    pub fn rank(&self, category: &str) -> i64 {
        self.categories
            .iter()
            .position(|c| c == category)
            .map_or(UNKNOWN_RANK, |i| i as i64)
    }
}

/// Rank encoder over the ordinal columns present at fit time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    pub mappings: BTreeMap<String, OrdinalMapping>,
}

impl OrdinalEncoder {
    /// Learn one mapping per listed column that exists in `df`.
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let mut mappings = BTreeMap::new();
        for column in columns {
            if !has_column(df, column) {
                continue;
            }
            let categories = sorted_vocabulary(series(df, column)?)?;
            mappings.insert(column.clone(), OrdinalMapping { categories });
        }
        Ok(Self { mappings })
    }

    /// Replace each mapped column by its Float64 rank. Nulls and unseen
    /// categories become [`UNKNOWN_RANK`].
    pub fn transform(&self, mut df: DataFrame) -> Result<DataFrame> {
        for (column, mapping) in &self.mappings {
            let ranks = series_strings(series(&df, column)?)?
                .into_iter()
                .map(|v| {
                    let rank = v.as_deref().map_or(UNKNOWN_RANK, |label| mapping.rank(label));
                    Some(rank as f64)
                })
                .collect();
            df.replace(column, f64_series(column, ranks))?;
        }
        Ok(df)
    }
}

// =============================================================================
// One-hot encoding
// =============================================================================

/// Vocabulary of one nominal column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotColumn {
    pub column: String,
    /// Sorted categories, with [`NULL_CATEGORY`] last when nulls were seen.
    pub categories: Vec<String>,
}

impl OneHotColumn {
    /// Indicator column names, `{column}_{category}`.
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }
}

/// One-hot encoder over the categorical columns present at fit time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub columns: Vec<OneHotColumn>,
}

impl OneHotEncoder {
    /// Learn vocabularies for the listed columns that exist in `df`.
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let mut fitted = Vec::new();
        for column in columns {
            if !has_column(df, column) {
                continue;
            }
            let source = series(df, column)?;
            let mut categories = sorted_vocabulary(source)?;
            if source.null_count() > 0 {
                categories.push(NULL_CATEGORY.to_string());
            }
            fitted.push(OneHotColumn {
                column: column.clone(),
                categories,
            });
        }
        Ok(Self { columns: fitted })
    }

    /// Every indicator column name in output order.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(OneHotColumn::feature_names)
            .collect()
    }

    /// Append Float64 indicator columns and drop the source columns.
    ///
    /// A value outside the fitted vocabulary sets no indicator.
    pub fn transform(&self, mut df: DataFrame) -> Result<DataFrame> {
        let mut indicators = Vec::new();

        for fitted in &self.columns {
            let labels: Vec<String> = series_strings(series(&df, &fitted.column)?)?
                .into_iter()
                .map(|v| v.unwrap_or_else(|| NULL_CATEGORY.to_string()))
                .collect();

            for (category, name) in fitted.categories.iter().zip(fitted.feature_names()) {
                let values = labels
                    .iter()
                    .map(|l| Some(if l == category { 1.0 } else { 0.0 }))
                    .collect();
                indicators.push(f64_series(&name, values));
            }
        }

        for fitted in &self.columns {
            df = df.drop(&fitted.column)?;
        }
        for indicator in indicators {
            df.with_column(indicator)?;
        }
        Ok(df)
    }
}
