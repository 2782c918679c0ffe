//! Reading, writing and splitting tabular housing data.

use crate::error::{ProcessingError, Result, ResultExt};
use crate::utils::{has_column, series_f64};
use calamine::{Data, Reader, open_workbook_auto};
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Marker the housing files use for "not available".
const NULL_MARKER: &str = "NA";

/// Read a CSV, Parquet or spreadsheet file into a DataFrame.
///
/// CSV cells equal to `NA` are read as null. Spreadsheets (`.xlsx`, `.xls`)
/// are read from their first sheet with the first row as header.
pub fn read_dataset(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ProcessingError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let df = match extension.as_str() {
        "csv" => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .with_parse_options(
                CsvParseOptions::default()
                    .with_quote_char(Some(b'"'))
                    .with_null_values(Some(NullValues::AllColumnsSingle(NULL_MARKER.into()))),
            )
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()
            .context(format!("Failed to parse {}", path.display()))?,
        "parquet" => ParquetReader::new(File::open(path)?)
            .finish()
            .context(format!("Failed to parse {}", path.display()))?,
        "xlsx" | "xls" => read_spreadsheet(path)?,
        _ => {
            return Err(ProcessingError::UnsupportedFormat {
                path: path.display().to_string(),
                extension,
            });
        }
    };

    info!(
        "Loaded {} ({} rows x {} columns)",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Read the first sheet of a workbook, taking column names from its first row.
///
/// Empty cells, error cells and `NA` strings become null. A column whose
/// remaining cells are all whole numbers is Int64, all numbers Float64, all
/// booleans Boolean; anything else is read as text.
fn read_spreadsheet(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ProcessingError::EmptyDataset(format!("{} has no sheets", path.display())))??;

    let mut rows = sheet.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(ToString::to_string).collect(),
        None => return Err(ProcessingError::EmptyDataset(path.display().to_string())),
    };
    let body: Vec<&[Data]> = rows.collect();

    let columns = header
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let cells: Vec<Option<&Data>> = body
                .iter()
                .map(|row| row.get(j).filter(|cell| !is_null_cell(cell)))
                .collect();
            sheet_column(name, &cells).into()
        })
        .collect::<Vec<Column>>();
    Ok(DataFrame::new(columns)?)
}

fn is_null_cell(cell: &Data) -> bool {
    match cell {
        Data::Empty | Data::Error(_) => true,
        Data::String(s) => s.is_empty() || s == NULL_MARKER,
        _ => false,
    }
}

fn whole_number(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(v) => Some(*v),
        Data::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Some(*v as i64),
        _ => None,
    }
}

fn number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(v) => Some(*v as f64),
        Data::Float(v) => Some(*v),
        _ => None,
    }
}

/// Build one typed series from the non-null cells of a sheet column.
fn sheet_column(name: &str, cells: &[Option<&Data>]) -> Series {
    let mut present = cells.iter().flatten().peekable();
    if present.peek().is_none() {
        return Series::new(name.into(), vec![None::<String>; cells.len()]);
    }
    let present: Vec<&Data> = present.copied().collect();

    if present.iter().all(|c| whole_number(c).is_some()) {
        let values: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(whole_number)).collect();
        Series::new(name.into(), values)
    } else if present.iter().all(|c| number(c).is_some()) {
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(number)).collect();
        Series::new(name.into(), values)
    } else if present.iter().all(|c| matches!(c, Data::Bool(_))) {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Some(Data::Bool(b)) => Some(*b),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = cells.iter().map(|c| c.map(ToString::to_string)).collect();
        Series::new(name.into(), values)
    }
}

/// Write a frame as CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Drop the identifier column when present.
pub fn drop_identifier(df: DataFrame, id_column: &str) -> Result<DataFrame> {
    if has_column(&df, id_column) {
        Ok(df.drop(id_column)?)
    } else {
        Ok(df)
    }
}

/// Separate the target from the features.
///
/// The target must exist and contain no nulls.
pub fn split_target(df: DataFrame, target: &str) -> Result<(DataFrame, Vec<f64>)> {
    if !has_column(&df, target) {
        return Err(ProcessingError::ColumnNotFound(target.to_string()));
    }
    let values = series_f64(df.column(target)?.as_materialized_series())?;
    let y = values
        .into_iter()
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| ProcessingError::TypeConversionFailed {
            column: target.to_string(),
            target_type: "Float64".to_string(),
            reason: "target contains null values".to_string(),
        })?;
    Ok((df.drop(target)?, y))
}

/// A seeded train/hold-out partition of features and target.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train_x: DataFrame,
    pub holdout_x: DataFrame,
    pub train_y: Vec<f64>,
    pub holdout_y: Vec<f64>,
}

/// Shuffle rows with `seed` and hold out `ceil(n * test_size)` of them.
pub fn train_test_split(
    x: &DataFrame,
    y: &[f64],
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = x.height();
    if n != y.len() {
        return Err(ProcessingError::InvalidConfig(format!(
            "feature rows ({n}) and target values ({}) differ",
            y.len()
        )));
    }

    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ProcessingError::EmptyDataset(format!(
            "cannot hold out {n_test} of {n} rows"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(n_test);

    let take = |idx: &[usize]| -> Result<DataFrame> {
        let idx = IdxCa::from_vec(
            "idx".into(),
            idx.iter().map(|&i| i as IdxSize).collect(),
        );
        Ok(x.take(&idx)?)
    };

    Ok(TrainTestSplit {
        train_x: take(train_idx)?,
        holdout_x: take(test_idx)?,
        train_y: train_idx.iter().map(|&i| y[i]).collect(),
        holdout_y: test_idx.iter().map(|&i| y[i]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_csv_treats_na_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("houses.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "Id,LotFrontage,Alley,SalePrice").unwrap();
        writeln!(file, "1,65,NA,208500").unwrap();
        writeln!(file, "2,NA,Grvl,181500").unwrap();
        drop(file);

        let df = read_dataset(&path).unwrap();
        assert_eq!(df.shape(), (2, 4));
        assert_eq!(df.column("LotFrontage").unwrap().null_count(), 1);
        assert_eq!(df.column("Alley").unwrap().null_count(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("houses.json");
        File::create(&path).unwrap();
        let err = read_dataset(&path).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_corrupt_workbook_is_a_spreadsheet_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("houses.xlsx");
        std::fs::write(&path, "Id,LotArea\n1,8450\n").unwrap();
        let err = read_dataset(&path).unwrap_err();
        assert_eq!(err.error_code(), "SPREADSHEET_ERROR");
    }

    #[test]
    fn test_sheet_column_types() {
        let int = Data::Int(8450);
        let float = Data::Float(65.5);
        let text = Data::String("RL".to_string());
        let flag = Data::Bool(true);

        let lot_area = sheet_column("LotArea", &[Some(&int), None, Some(&Data::Float(9600.0))]);
        assert_eq!(lot_area.dtype(), &DataType::Int64);
        assert_eq!(lot_area.null_count(), 1);

        let frontage = sheet_column("LotFrontage", &[Some(&int), Some(&float)]);
        assert_eq!(frontage.dtype(), &DataType::Float64);

        let zoning = sheet_column("MSZoning", &[Some(&text), Some(&int)]);
        assert_eq!(zoning.dtype(), &DataType::String);

        let central_air = sheet_column("CentralAir", &[Some(&flag), None]);
        assert_eq!(central_air.dtype(), &DataType::Boolean);

        let alley = sheet_column("Alley", &[None, None]);
        assert_eq!(alley.dtype(), &DataType::String);
        assert_eq!(alley.null_count(), 2);
    }

    #[test]
    fn test_split_target_and_identifier() {
        let df = df![
            "Id" => [1i64, 2],
            "LotArea" => [8450i64, 9600],
            "SalePrice" => [208500i64, 181500],
        ]
        .unwrap();
        let df = drop_identifier(df, "Id").unwrap();
        let (x, y) = split_target(df, "SalePrice").unwrap();
        assert_eq!(x.width(), 1);
        assert_eq!(y, vec![208500.0, 181500.0]);
    }

    #[test]
    fn test_split_is_seeded_and_disjoint() {
        let x = df!["row" => (0..10i64).collect::<Vec<_>>()].unwrap();
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();

        let a = train_test_split(&x, &y, 0.2, 33).unwrap();
        let b = train_test_split(&x, &y, 0.2, 33).unwrap();
        assert_eq!(a.holdout_y, b.holdout_y);
        assert_eq!(a.train_x.height(), 8);
        assert_eq!(a.holdout_x.height(), 2);

        let mut all: Vec<f64> = a.train_y.iter().chain(&a.holdout_y).copied().collect();
        all.sort_by(f64::total_cmp);
        assert_eq!(all, y);
    }
}
