//! Conversion of encoded frames into model matrices.

use estate_processing::utils::series_f64;
use ndarray::Array2;
use polars::prelude::DataFrame;

use crate::error::Result;

/// Row-major `f64` matrix of every column of `df`, in column order.
/// Nulls become `NaN`; a column that is not numeric is an error.
pub fn frame_to_matrix(df: &DataFrame) -> Result<Array2<f64>> {
    let (rows, cols) = df.shape();
    let mut matrix = Array2::from_elem((rows, cols), f64::NAN);
    for (j, column) in df.get_columns().iter().enumerate() {
        let values = series_f64(column.as_materialized_series())?;
        for (i, value) in values.into_iter().enumerate() {
            if let Some(v) = value {
                matrix[[i, j]] = v;
            }
        }
    }
    Ok(matrix)
}
