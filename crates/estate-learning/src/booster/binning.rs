//! Histogram binning of the training matrix.
//!
//! Every feature gets a sorted list of cut points (at most `max_bin - 1`).
//! A value's bin code is `1 + #{cuts < value}`; code `0` is reserved for
//! NaN. Splitting after cut `s` therefore sends codes `<= s + 1` left, which
//! is exactly `value <= cuts[s] || value.is_nan()` at prediction time.

use ndarray::{Array2, ArrayView1};

/// Bin code assigned to missing values.
pub const MISSING_BIN: u16 = 0;

/// Binned, column-major copy of a training matrix.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    /// Upper-inclusive cut points per feature.
    pub cuts: Vec<Vec<f64>>,
    /// Bin codes per feature, one per row.
    pub codes: Vec<Vec<u16>>,
    pub n_rows: usize,
}

impl BinnedMatrix {
    pub fn from_matrix(x: &Array2<f64>, max_bin: usize) -> Self {
        let max_bin = max_bin.clamp(2, u16::MAX as usize - 2);
        let mut cuts = Vec::with_capacity(x.ncols());
        let mut codes = Vec::with_capacity(x.ncols());

        for column in x.columns() {
            let feature_cuts = quantile_cuts(column, max_bin);
            let feature_codes = column
                .iter()
                .map(|&v| bin_code(&feature_cuts, v))
                .collect();
            cuts.push(feature_cuts);
            codes.push(feature_codes);
        }

        Self {
            cuts,
            codes,
            n_rows: x.nrows(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.cuts.len()
    }

    /// Number of distinct codes feature `f` can take, including the
    /// missing bin.
    pub fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 2
    }
}

fn bin_code(cuts: &[f64], value: f64) -> u16 {
    if value.is_nan() {
        MISSING_BIN
    } else {
        1 + cuts.partition_point(|&c| c < value) as u16
    }
}

/// Cut points for one feature.
///
/// With few distinct values every gap gets a cut at its midpoint. Otherwise
/// cuts sit at evenly spaced quantiles of the observed values, deduplicated,
/// and never at the maximum (a cut there would send every row left).
fn quantile_cuts(column: ArrayView1<'_, f64>, max_bin: usize) -> Vec<f64> {
    let mut values: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return Vec::new();
    }
    values.sort_by(f64::total_cmp);

    let mut distinct = values.clone();
    distinct.dedup();

    if distinct.len() <= max_bin {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }

    let max = distinct[distinct.len() - 1];
    let n = values.len();
    let mut cuts: Vec<f64> = (1..max_bin)
        .map(|i| values[(i * n / max_bin).min(n - 1)])
        .filter(|&v| v < max)
        .collect();
    cuts.dedup();
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_few_distinct_values_cut_at_midpoints() {
        let x = array![[1.0], [2.0], [2.0], [4.0]];
        let binned = BinnedMatrix::from_matrix(&x, 256);
        assert_eq!(binned.cuts[0], vec![1.5, 3.0]);
        assert_eq!(binned.codes[0], vec![1, 2, 2, 3]);
        assert_eq!(binned.n_bins(0), 4);
    }

    #[test]
    fn test_nan_goes_to_missing_bin() {
        let x = array![[f64::NAN], [1.0], [3.0]];
        let binned = BinnedMatrix::from_matrix(&x, 256);
        assert_eq!(binned.codes[0][0], MISSING_BIN);
        assert_eq!(binned.cuts[0], vec![2.0]);
    }

    #[test]
    fn test_many_values_respect_max_bin() {
        let values: Vec<f64> = (0..1000).map(f64::from).collect();
        let x = Array2::from_shape_vec((1000, 1), values).unwrap();
        let binned = BinnedMatrix::from_matrix(&x, 16);
        assert!(binned.cuts[0].len() <= 15);
        assert!(binned.cuts[0].windows(2).all(|w| w[0] < w[1]));
        // Codes agree with the threshold rule used at prediction time.
        for (row, &code) in binned.codes[0].iter().enumerate() {
            let v = row as f64;
            for (s, &cut) in binned.cuts[0].iter().enumerate() {
                assert_eq!(code as usize <= s + 1, v <= cut);
            }
        }
    }

    #[test]
    fn test_constant_feature_has_no_cuts() {
        let x = array![[5.0], [5.0], [5.0]];
        let binned = BinnedMatrix::from_matrix(&x, 64);
        assert!(binned.cuts[0].is_empty());
    }
}
