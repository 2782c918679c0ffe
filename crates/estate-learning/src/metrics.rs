//! Regression metrics used for fold scoring and hyperparameter search.

use serde::{Deserialize, Serialize};

/// Scores of one set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub rmsle: f64,
    pub r2: f64,
    /// `NaN` when the fold has too few rows for its feature count.
    pub adjusted_r2: f64,
}

/// Score `y_pred` against `y_true`.
///
/// `n_train` and `n_features` are the shape of the matrix the model was
/// fitted on; adjusted R² is computed from them.
pub fn evaluate(y_true: &[f64], y_pred: &[f64], n_train: usize, n_features: usize) -> RegressionMetrics {
    let r2 = r2_score(y_true, y_pred);
    RegressionMetrics {
        rmse: rmse(y_true, y_pred),
        mae: mae(y_true, y_pred),
        rmsle: rmsle(y_true, y_pred),
        r2,
        adjusted_r2: adjusted_r2(r2, n_train, n_features),
    }
}

pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean(y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)), y_true.len())
}

pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mse(y_true, y_pred).sqrt()
}

pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean(y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()), y_true.len())
}

/// Root mean squared log error. Negative values are clamped to zero before
/// taking `ln(1 + v)`.
pub fn rmsle(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let log1p = |v: f64| v.max(0.0).ln_1p();
    mean(
        y_true
            .iter()
            .zip(y_pred)
            .map(|(t, p)| (log1p(*t) - log1p(*p)).powi(2)),
        y_true.len(),
    )
    .sqrt()
}

/// Coefficient of determination.
///
/// Constant targets give 1.0 for a perfect fit and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    let mean_true = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean_true).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// `1 - (1 - r2) * (n - 1) / (n - p - 1)`, or `NaN` when `n - p - 1 <= 0`.
pub fn adjusted_r2(r2: f64, n: usize, p: usize) -> f64 {
    let denom = n as f64 - p as f64 - 1.0;
    if denom <= 0.0 {
        return f64::NAN;
    }
    1.0 - (1.0 - r2) * (n as f64 - 1.0) / denom
}

fn mean(values: impl Iterator<Item = f64>, len: usize) -> f64 {
    if len == 0 {
        return f64::NAN;
    }
    values.sum::<f64>() / len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = [100.0, 200.0, 300.0, 400.0];
        let m = evaluate(&y, &y, 10, 2);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmsle, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.adjusted_r2, 1.0);
    }

    #[test]
    fn test_known_values() {
        let y_true = [3.0, -0.5, 2.0, 7.0];
        let y_pred = [2.5, 0.0, 2.0, 8.0];
        assert!((mse(&y_true, &y_pred) - 0.375).abs() < 1e-12);
        assert!((mae(&y_true, &y_pred) - 0.5).abs() < 1e-12);
        assert!((r2_score(&y_true, &y_pred) - 0.948_608_137_044_967_9).abs() < 1e-12);
    }

    #[test]
    fn test_rmsle_is_a_root() {
        let y_true = [0.0_f64.exp_m1(), 2.0_f64.exp_m1()];
        let y_pred = [1.0_f64.exp_m1(), 0.0_f64.exp_m1()];
        // log errors are 1 and 2: sqrt((1 + 4) / 2)
        assert!((rmsle(&y_true, &y_pred) - 2.5_f64.sqrt()).abs() < 1e-12);
        // negatives are clamped, not NaN
        assert!(rmsle(&[-5.0], &[0.0]).abs() < 1e-12);
    }

    #[test]
    fn test_r2_constant_target() {
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[1.0, 3.0]), 0.0);
    }

    #[test]
    fn test_adjusted_r2() {
        assert!((adjusted_r2(0.9, 101, 10) - (1.0 - 0.1 * 100.0 / 90.0)).abs() < 1e-12);
        assert!(adjusted_r2(0.9, 5, 4).is_nan());
    }
}
