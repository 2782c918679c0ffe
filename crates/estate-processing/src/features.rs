//! Derived housing features.
//!
//! [`FeatureEngineer::transform`] is a pure function of its input frame: it
//! adds ratio, sum and age features plus presence flags, then drops the raw
//! columns those features subsume. It holds no state and performs no
//! fitting, so training and inference call exactly the same code.

use crate::error::Result;
use crate::utils::{column_f64, f64_series, has_column, has_columns};
use polars::prelude::*;
use tracing::debug;

/// Reference year for the quality/age blend.
const QUALITY_REFERENCE_YEAR: f64 = 2010.0;

/// Raw columns removed after derivation.
pub const SUBSUMED_COLUMNS: [&str; 30] = [
    "GarageArea",
    "GarageCars",
    "GrLivArea",
    "TotRmsAbvGrd",
    "TotalBsmtSF",
    "1stFlrSF",
    "2ndFlrSF",
    "FullBath",
    "BsmtFullBath",
    "HalfBath",
    "BsmtHalfBath",
    "YrSold",
    "YearBuilt",
    "YearRemodAdd",
    "GarageYrBlt",
    "OpenPorchSF",
    "EnclosedPorch",
    "3SsnPorch",
    "ScreenPorch",
    "OverallQual",
    "OverallCond",
    "Utilities",
    "Street",
    "PoolQC",
    "BsmtFinSF1",
    "BsmtFinSF2",
    "HouseAge",
    "WoodDeckSF",
    "PoolArea",
    "Fireplaces",
];

/// How a derived column combines its inputs.
#[derive(Debug, Clone, Copy)]
enum Derivation {
    /// `a / b`, zero when `b` is zero.
    Ratio,
    /// Sum of all inputs.
    Sum,
    /// `a - b`.
    Difference,
    /// `1.0` when the single input is positive.
    Presence,
}

/// A derived feature: output name, rule and input columns.
struct DerivedFeature {
    name: &'static str,
    rule: Derivation,
    inputs: &'static [&'static str],
}

const DERIVED: [DerivedFeature; 14] = [
    DerivedFeature {
        name: "GarageCarSize",
        rule: Derivation::Ratio,
        inputs: &["GarageArea", "GarageCars"],
    },
    DerivedFeature {
        name: "LivAreaRoomSize",
        rule: Derivation::Ratio,
        inputs: &["GrLivArea", "TotRmsAbvGrd"],
    },
    DerivedFeature {
        name: "TotalHouseSquareFeet",
        rule: Derivation::Sum,
        inputs: &["TotalBsmtSF", "1stFlrSF", "2ndFlrSF"],
    },
    DerivedFeature {
        name: "TotalBasementSquareFeet",
        rule: Derivation::Sum,
        inputs: &["BsmtFinSF1", "BsmtFinSF2"],
    },
    DerivedFeature {
        name: "TotalFullBathSize",
        rule: Derivation::Sum,
        inputs: &["FullBath", "BsmtFullBath"],
    },
    DerivedFeature {
        name: "TotalHalfBathSize",
        rule: Derivation::Sum,
        inputs: &["HalfBath", "BsmtHalfBath"],
    },
    DerivedFeature {
        name: "HouseAge",
        rule: Derivation::Difference,
        inputs: &["YrSold", "YearBuilt"],
    },
    DerivedFeature {
        name: "GarageAge",
        rule: Derivation::Difference,
        inputs: &["YrSold", "GarageYrBlt"],
    },
    DerivedFeature {
        name: "HouseTotalPorchSquareFeet",
        rule: Derivation::Sum,
        inputs: &[
            "OpenPorchSF",
            "3SsnPorch",
            "EnclosedPorch",
            "ScreenPorch",
            "WoodDeckSF",
        ],
    },
    DerivedFeature {
        name: "HasPool",
        rule: Derivation::Presence,
        inputs: &["PoolArea"],
    },
    DerivedFeature {
        name: "Has2ndFloor",
        rule: Derivation::Presence,
        inputs: &["2ndFlrSF"],
    },
    DerivedFeature {
        name: "HasGarage",
        rule: Derivation::Presence,
        inputs: &["GarageArea"],
    },
    DerivedFeature {
        name: "HasBasement",
        rule: Derivation::Presence,
        inputs: &["TotalBsmtSF"],
    },
    DerivedFeature {
        name: "HasFirePlace",
        rule: Derivation::Presence,
        inputs: &["Fireplaces"],
    },
];

/// Stateless feature derivation.
pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Derive engineered features and drop subsumed raw columns.
    ///
    /// Each derived feature is produced only when all of its inputs are
    /// present. Null inputs give a null output.
    pub fn transform(mut df: DataFrame) -> Result<DataFrame> {
        let mut derived = Vec::new();

        for feature in &DERIVED {
            if !has_columns(&df, feature.inputs) {
                continue;
            }
            let inputs = feature
                .inputs
                .iter()
                .map(|c| column_f64(&df, c))
                .collect::<Result<Vec<_>>>()?;
            let values = combine(feature.rule, &inputs);
            derived.push(f64_series(feature.name, values));
        }

        // These depend on more than one derivation shape, so they are
        // written out directly.
        if has_columns(&df, &["YrSold", "YearBuilt", "YearRemodAdd"]) {
            let sold = column_f64(&df, "YrSold")?;
            let built = column_f64(&df, "YearBuilt")?;
            let remod = column_f64(&df, "YearRemodAdd")?;

            let remod_age = (0..df.height())
                .map(|i| match (sold[i], built[i], remod[i]) {
                    (Some(s), Some(b), Some(r)) => Some((s - b) - (s - r)),
                    _ => None,
                })
                .collect();
            derived.push(f64_series("RemodHouseAge", remod_age));
        }

        if has_columns(&df, &["YearRemodAdd", "YearBuilt"]) {
            let built = column_f64(&df, "YearBuilt")?;
            let remod = column_f64(&df, "YearRemodAdd")?;
            let is_remod = built
                .iter()
                .zip(&remod)
                .map(|(b, r)| match (b, r) {
                    (Some(b), Some(r)) => Some(if r - b > 0.0 { 1.0 } else { 0.0 }),
                    _ => None,
                })
                .collect();
            derived.push(f64_series("IsRemod", is_remod));
        }

        if has_columns(&df, &["OverallQual", "OverallCond", "YearBuilt"]) {
            let qual = column_f64(&df, "OverallQual")?;
            let cond = column_f64(&df, "OverallCond")?;
            let built = column_f64(&df, "YearBuilt")?;
            let blend = (0..df.height())
                .map(|i| match (qual[i], cond[i], built[i]) {
                    (Some(q), Some(c), Some(b)) => {
                        Some((q + c) / 2.0 + (QUALITY_REFERENCE_YEAR - b))
                    }
                    _ => None,
                })
                .collect();
            derived.push(f64_series("YearHouseQuality", blend));
        }

        let added = derived.len();
        for series in derived {
            df.with_column(series)?;
        }

        let mut dropped = 0;
        for column in SUBSUMED_COLUMNS {
            if has_column(&df, column) {
                df = df.drop(column)?;
                dropped += 1;
            }
        }

        debug!("Feature engineering added {added} columns, dropped {dropped}");
        Ok(df)
    }
}

fn combine(rule: Derivation, inputs: &[Vec<Option<f64>>]) -> Vec<Option<f64>> {
    let rows = inputs.first().map_or(0, Vec::len);
    (0..rows)
        .map(|i| {
            let row: Option<Vec<f64>> = inputs.iter().map(|col| col[i]).collect();
            let row = row?;
            Some(match rule {
                Derivation::Ratio => safe_div(row[0], row[1]),
                Derivation::Sum => row.iter().sum(),
                Derivation::Difference => row[0] - row[1],
                Derivation::Presence => {
                    if row[0] > 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                }
            })
        })
        .collect()
}

/// Division that yields zero for a zero denominator.
#[inline]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DataFrame {
        df![
            "GarageArea" => [480.0, 0.0],
            "GarageCars" => [2.0, 0.0],
            "GrLivArea" => [1710.0, 1262.0],
            "TotRmsAbvGrd" => [8.0, 6.0],
            "TotalBsmtSF" => [856.0, 0.0],
            "1stFlrSF" => [856.0, 1262.0],
            "2ndFlrSF" => [854.0, 0.0],
            "YrSold" => [2008.0, 2007.0],
            "YearBuilt" => [2003.0, 1976.0],
            "YearRemodAdd" => [2003.0, 1990.0],
            "OverallQual" => [7.0, 6.0],
            "OverallCond" => [5.0, 8.0],
            "PoolArea" => [0.0, 512.0],
            "LotArea" => [8450.0, 9600.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_ratio_features_tolerate_zero_denominator() {
        let out = FeatureEngineer::transform(sample()).unwrap();
        assert_eq!(
            column_f64(&out, "GarageCarSize").unwrap(),
            vec![Some(240.0), Some(0.0)]
        );
        assert_eq!(
            column_f64(&out, "LivAreaRoomSize").unwrap(),
            vec![Some(213.75), Some(1262.0 / 6.0)]
        );
    }

    #[test]
    fn test_age_and_quality_features() {
        let out = FeatureEngineer::transform(sample()).unwrap();
        assert_eq!(
            column_f64(&out, "RemodHouseAge").unwrap(),
            vec![Some(0.0), Some(14.0)]
        );
        assert_eq!(
            column_f64(&out, "IsRemod").unwrap(),
            vec![Some(0.0), Some(1.0)]
        );
        assert_eq!(
            column_f64(&out, "YearHouseQuality").unwrap(),
            vec![Some(6.0 + 7.0), Some(7.0 + 34.0)]
        );
        assert_eq!(
            column_f64(&out, "TotalHouseSquareFeet").unwrap(),
            vec![Some(2566.0), Some(1262.0)]
        );
    }

    #[test]
    fn test_presence_flags_and_drops() {
        let out = FeatureEngineer::transform(sample()).unwrap();
        assert_eq!(column_f64(&out, "HasPool").unwrap(), vec![Some(0.0), Some(1.0)]);
        assert_eq!(
            column_f64(&out, "Has2ndFloor").unwrap(),
            vec![Some(1.0), Some(0.0)]
        );
        assert_eq!(
            column_f64(&out, "HasGarage").unwrap(),
            vec![Some(1.0), Some(0.0)]
        );

        for dropped in ["GarageArea", "YrSold", "HouseAge", "OverallQual", "PoolArea"] {
            assert!(!has_column(&out, dropped), "{dropped} should be dropped");
        }
        assert!(has_column(&out, "LotArea"));
    }

    #[test]
    fn test_transform_is_replayable() {
        let first = FeatureEngineer::transform(sample()).unwrap();
        let second = FeatureEngineer::transform(sample()).unwrap();
        assert!(first.equals_missing(&second));
    }

    #[test]
    fn test_null_inputs_give_null_outputs() {
        let df = df![
            "FullBath" => [Some(2.0), Some(1.0)],
            "BsmtFullBath" => [None, Some(1.0)],
        ]
        .unwrap();
        let out = FeatureEngineer::transform(df).unwrap();
        assert_eq!(
            column_f64(&out, "TotalFullBathSize").unwrap(),
            vec![None, Some(2.0)]
        );
        assert_eq!(out.width(), 1);
    }
}
