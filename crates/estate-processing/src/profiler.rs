//! Dataset overview for exploring a housing file before training.
//!
//! Nothing here feeds the fitted pipeline; the profiler only describes data.

use crate::error::{ProcessingError, Result};
use crate::utils::{is_numeric_dtype, series_f64};
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Per-column summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub unique_count: usize,
    pub null_count: usize,
    pub null_percentage: f64,
    pub sample_values: Vec<String>,
    /// Present for numeric columns with at least one value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
}

/// Moments of a numeric column, nulls excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub skewness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub shape: (usize, usize),
    pub columns: Vec<ColumnProfile>,
    pub duplicate_count: usize,
}

/// A column with missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingEntry {
    pub column: String,
    pub null_count: usize,
    pub null_percentage: f64,
}

/// Pearson correlation of one column with the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCorrelation {
    pub column: String,
    pub correlation: f64,
}

/// Number of sample values shown per column.
const SAMPLE_SIZE: usize = 5;

pub struct DataProfiler;

impl DataProfiler {
    /// Shape, duplicates and a profile of every column.
    pub fn overview(df: &DataFrame) -> Result<DatasetOverview> {
        let columns = df
            .get_columns()
            .iter()
            .map(|c| Self::profile_column(c.as_materialized_series(), df.height()))
            .collect::<Result<Vec<_>>>()?;

        let duplicate_count = df.height()
            - df.unique::<&str, &str>(None, UniqueKeepStrategy::First, None)?
                .height();

        Ok(DatasetOverview {
            shape: df.shape(),
            columns,
            duplicate_count,
        })
    }

    fn profile_column(series: &Series, rows: usize) -> Result<ColumnProfile> {
        let null_count = series.null_count();
        let non_null = series.drop_nulls();

        let mut sample_values = Vec::new();
        if !non_null.is_empty() {
            let mut indices: Vec<usize> = (0..non_null.len()).collect();
            let mut rng = StdRng::seed_from_u64(42);
            indices.shuffle(&mut rng);
            for idx in indices.into_iter().take(SAMPLE_SIZE) {
                sample_values.push(format!("{}", non_null.get(idx)?));
            }
        }

        let numeric = if is_numeric_dtype(series.dtype()) {
            let values: Vec<f64> = series_f64(&non_null)?.into_iter().flatten().collect();
            summarize(&values)
        } else {
            None
        };

        Ok(ColumnProfile {
            name: series.name().to_string(),
            dtype: format!("{:?}", series.dtype()),
            unique_count: series.n_unique()?,
            null_count,
            null_percentage: percentage(null_count, rows),
            sample_values,
            numeric,
        })
    }

    /// Columns with nulls, most missing first. Ties keep frame order.
    pub fn missing_summary(df: &DataFrame) -> Vec<MissingEntry> {
        let mut entries: Vec<MissingEntry> = df
            .get_columns()
            .iter()
            .filter(|c| c.null_count() > 0)
            .map(|c| MissingEntry {
                column: c.name().to_string(),
                null_count: c.null_count(),
                null_percentage: percentage(c.null_count(), df.height()),
            })
            .collect();
        entries.sort_by(|a, b| b.null_count.cmp(&a.null_count));
        entries
    }

    /// Pearson correlation of each numeric column with `target`, strongest
    /// positive first. Rows where either side is null are skipped; columns
    /// with zero variance are left out.
    pub fn target_correlations(
        df: &DataFrame,
        target: &str,
        exclude: &[&str],
    ) -> Result<Vec<TargetCorrelation>> {
        let target_col = df
            .column(target)
            .map_err(|_| ProcessingError::ColumnNotFound(target.to_string()))?;
        let y = series_f64(target_col.as_materialized_series())?;

        let mut correlations = Vec::new();
        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == target || exclude.contains(&name) {
                continue;
            }
            let series = column.as_materialized_series();
            if !is_numeric_dtype(series.dtype()) {
                continue;
            }
            let x = series_f64(series)?;
            let pairs: Vec<(f64, f64)> = x
                .iter()
                .zip(&y)
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .collect();
            if let Some(correlation) = pearson(&pairs) {
                correlations.push(TargetCorrelation {
                    column: name.to_string(),
                    correlation,
                });
            }
        }
        correlations.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
        Ok(correlations)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn summarize(values: &[f64]) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    let skewness = if std > 0.0 {
        values.iter().map(|v| ((v - mean) / std).powi(3)).sum::<f64>() / n
    } else {
        0.0
    };
    Some(NumericSummary {
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean,
        std,
        skewness,
    })
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame() -> DataFrame {
        df![
            "Id" => [1i64, 2, 3, 4],
            "GrLivArea" => [Some(1000.0), Some(1500.0), None, Some(2500.0)],
            "Flat" => [1.0, 1.0, 1.0, 1.0],
            "Alley" => [None, None, Some("Grvl"), None],
            "SalePrice" => [100.0, 150.0, 175.0, 250.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_overview_counts() {
        let overview = DataProfiler::overview(&frame()).unwrap();
        assert_eq!(overview.shape, (4, 5));
        assert_eq!(overview.duplicate_count, 0);

        let area = &overview.columns[1];
        assert_eq!(area.null_count, 1);
        assert_eq!(area.null_percentage, 25.0);
        assert_eq!(area.sample_values.len(), 3);
        let summary = area.numeric.as_ref().unwrap();
        assert_eq!(summary.min, 1000.0);
        assert_eq!(summary.max, 2500.0);

        assert!(overview.columns[3].numeric.is_none());
    }

    #[test]
    fn test_missing_summary_is_descending() {
        let missing = DataProfiler::missing_summary(&frame());
        let columns: Vec<&str> = missing.iter().map(|m| m.column.as_str()).collect();
        assert_eq!(columns, vec!["Alley", "GrLivArea"]);
        assert_eq!(missing[0].null_count, 3);
    }

    #[test]
    fn test_target_correlations() {
        let correlations =
            DataProfiler::target_correlations(&frame(), "SalePrice", &["Id"]).unwrap();
        // Flat has zero variance and is left out.
        assert_eq!(correlations.len(), 1);
        assert_eq!(correlations[0].column, "GrLivArea");
        assert!((correlations[0].correlation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_target() {
        let err = DataProfiler::target_correlations(&frame(), "Price", &[]).unwrap_err();
        assert!(err.is_schema_mismatch());
    }
}
