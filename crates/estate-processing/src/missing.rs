//! Column-specific missing-value rules for the housing schema.
//!
//! Most rules are constant fills that encode "this feature is absent" with a
//! sentinel per feature family. Four rules depend on data and are fitted on
//! the training rows once ([`MissingValuePolicy::fit`]) so that inference
//! never recomputes them:
//!
//! - `MasVnrArea` takes the training mode.
//! - `LotFrontage` takes the training median of the row's `Neighborhood`.
//! - `Electrical` takes the training mode of `BsmtExposure`. This borrows a
//!   value from an unrelated column and is kept exactly as the housing
//!   workflow has always done it.
//! - `GarageYrBlt` takes a sentinel year and is then bucketed into
//!   `GarageRangeBuilt`.
//!
//! Every rule is skipped when its column is absent.

use crate::error::Result;
use crate::utils::{
    column_f64, column_strings, f64_series, fill_string_nulls, has_column, median,
    numeric_mode, series, string_mode, string_series,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Sentinel fills for "feature not present" columns.
pub const ABSENCE_SENTINELS: [(&str, &str); 13] = [
    ("BsmtFinType2", "NH"),
    ("BsmtFinType1", "NB"),
    ("BsmtQual", "NB"),
    ("Fence", "NF"),
    ("FireplaceQu", "NFP"),
    ("MiscFeature", "NH"),
    ("PoolQC", "NH"),
    ("Alley", "NH"),
    ("BsmtCond", "NH"),
    ("GarageType", "NH"),
    ("GarageFinish", "NH"),
    ("GarageQual", "NH"),
    ("GarageCond", "NH"),
];

/// Veneer type null means no veneer.
pub const VENEER_TYPE_FILL: (&str, &str) = ("MasVnrType", "None");

/// Basement exposure null means no exposure.
pub const EXPOSURE_FILL: (&str, &str) = ("BsmtExposure", "No");

/// Year used for houses without a garage; falls in the final bucket.
pub const GARAGE_SENTINEL_YEAR: i64 = 2015;

/// Name of the derived garage-age bucket column.
pub const GARAGE_RANGE_COLUMN: &str = "GarageRangeBuilt";

/// Right-inclusive bucket edges for garage construction years.
pub const GARAGE_YEAR_EDGES: [i64; 19] = [
    1900, 1909, 1919, 1929, 1939, 1949, 1954, 1959, 1964, 1969, 1974, 1979, 1984, 1989, 1994,
    1999, 2004, 2010, 2015,
];

/// Labels for the buckets `(edge[i], edge[i + 1]]`.
pub const GARAGE_YEAR_LABELS: [&str; 18] = [
    "1900-1909",
    "1910-1919",
    "1920-1929",
    "1930-1939",
    "1940-1949",
    "1950-1954",
    "1955-1959",
    "1960-1964",
    "1965-1969",
    "1970-1974",
    "1975-1979",
    "1980-1984",
    "1985-1989",
    "1990-1994",
    "1995-1999",
    "2000-2004",
    "2005-2010",
    "NH",
];

const LOT_FRONTAGE: &str = "LotFrontage";
const NEIGHBORHOOD: &str = "Neighborhood";
const VENEER_AREA: &str = "MasVnrArea";
const ELECTRICAL: &str = "Electrical";
const GARAGE_YEAR: &str = "GarageYrBlt";

/// Training-time statistics the data-dependent rules need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingValueState {
    /// Median `LotFrontage` per `Neighborhood`, over training rows only.
    pub lot_frontage_by_neighborhood: BTreeMap<String, f64>,
    /// Median `LotFrontage` over all training rows, for unseen neighbourhoods.
    pub lot_frontage_fallback: Option<f64>,
    /// Most frequent `MasVnrArea`.
    pub veneer_area_mode: Option<f64>,
    /// Most frequent `BsmtExposure` after its own fill.
    pub electrical_fallback: Option<String>,
}

/// Applies the fixed missing-value rules of the housing schema.
pub struct MissingValuePolicy;

impl MissingValuePolicy {
    /// Learn the data-dependent fills from training rows.
    pub fn fit(df: &DataFrame) -> Result<MissingValueState> {
        let mut state = MissingValueState::default();

        if has_column(df, LOT_FRONTAGE) {
            let frontage = column_f64(df, LOT_FRONTAGE)?;
            state.lot_frontage_fallback = median(&frontage);

            if has_column(df, NEIGHBORHOOD) {
                let groups = column_strings(df, NEIGHBORHOOD)?;
                let mut by_group: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
                for (group, value) in groups.into_iter().zip(frontage) {
                    if let Some(group) = group {
                        by_group.entry(group).or_default().push(value);
                    }
                }
                state.lot_frontage_by_neighborhood = by_group
                    .into_iter()
                    .filter_map(|(group, values)| median(&values).map(|m| (group, m)))
                    .collect();
            }
        }

        if has_column(df, VENEER_AREA) {
            state.veneer_area_mode = numeric_mode(&column_f64(df, VENEER_AREA)?);
        }

        if has_column(df, EXPOSURE_FILL.0) {
            let exposure: Vec<Option<String>> = column_strings(df, EXPOSURE_FILL.0)?
                .into_iter()
                .map(|v| Some(v.unwrap_or_else(|| EXPOSURE_FILL.1.to_string())))
                .collect();
            state.electrical_fallback = string_mode(&exposure);
        }

        debug!(
            "Missing-value state: {} neighbourhood medians, veneer mode {:?}, electrical fallback {:?}",
            state.lot_frontage_by_neighborhood.len(),
            state.veneer_area_mode,
            state.electrical_fallback
        );
        Ok(state)
    }

    /// Apply every rule whose column exists. The frame keeps its schema,
    /// plus `GarageRangeBuilt` when `GarageYrBlt` is present.
    pub fn apply(state: &MissingValueState, mut df: DataFrame) -> Result<DataFrame> {
        for (column, sentinel) in ABSENCE_SENTINELS
            .iter()
            .chain([&VENEER_TYPE_FILL, &EXPOSURE_FILL])
        {
            if has_column(&df, column) {
                let filled = fill_string_nulls(series(&df, column)?, sentinel)?;
                df.replace(column, filled)?;
            }
        }

        if has_column(&df, VENEER_AREA)
            && let Some(mode) = state.veneer_area_mode
        {
            let values = fill_f64(column_f64(&df, VENEER_AREA)?, |_| Some(mode));
            df.replace(VENEER_AREA, f64_series(VENEER_AREA, values))?;
        }

        if has_column(&df, LOT_FRONTAGE) {
            let groups = if has_column(&df, NEIGHBORHOOD) {
                column_strings(&df, NEIGHBORHOOD)?
            } else {
                vec![None; df.height()]
            };
            let frontage = column_f64(&df, LOT_FRONTAGE)?;
            let values = frontage
                .into_iter()
                .zip(groups)
                .map(|(value, group)| {
                    value.or_else(|| {
                        group
                            .and_then(|g| state.lot_frontage_by_neighborhood.get(&g).copied())
                            .or(state.lot_frontage_fallback)
                    })
                })
                .collect();
            df.replace(LOT_FRONTAGE, f64_series(LOT_FRONTAGE, values))?;
        }

        if has_column(&df, ELECTRICAL)
            && let Some(fallback) = &state.electrical_fallback
        {
            let filled = fill_string_nulls(series(&df, ELECTRICAL)?, fallback)?;
            df.replace(ELECTRICAL, filled)?;
        }

        if has_column(&df, GARAGE_YEAR) {
            let years: Vec<Option<i64>> = column_f64(&df, GARAGE_YEAR)?
                .into_iter()
                .map(|v| Some(v.map_or(GARAGE_SENTINEL_YEAR, |y| y as i64)))
                .collect();
            let buckets: Vec<Option<String>> = years
                .iter()
                .map(|y| y.and_then(garage_year_bucket).map(str::to_string))
                .collect();
            df.replace(GARAGE_YEAR, Series::new(GARAGE_YEAR.into(), years))?;
            df.with_column(string_series(GARAGE_RANGE_COLUMN, buckets))?;
        }

        Ok(df)
    }
}

/// Bucket label for a garage construction year, `None` outside
/// `(1900, 2015]`.
pub fn garage_year_bucket(year: i64) -> Option<&'static str> {
    GARAGE_YEAR_EDGES
        .windows(2)
        .position(|edge| year > edge[0] && year <= edge[1])
        .map(|i| GARAGE_YEAR_LABELS[i])
}

fn fill_f64(values: Vec<Option<f64>>, fill: impl Fn(usize) -> Option<f64>) -> Vec<Option<f64>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.or_else(|| fill(i)))
        .collect()
}
