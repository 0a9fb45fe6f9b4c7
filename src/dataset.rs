use polars::prelude::*;
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::DVError;

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// A single cell of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Empty,
}

impl Value {
    /// Numeric view of the cell. Text is parsed, so "12.5" counts as a number.
    /// NaN and infinities are not numbers here.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Empty => None,
        };
        n.filter(|n| n.is_finite())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Empty => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

/// One record, an ordered mapping of field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Display string of a field, empty if the field is missing.
    pub fn display(&self, field: &str) -> String {
        self.get(field).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    #[cfg(test)]
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The immutable, ordered set of rows loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    name: String,
    fields: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, fields: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            fields,
            rows,
        }
    }

    /// Builds a dataset whose field list is taken from the first row.
    #[cfg(test)]
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let fields = rows
            .first()
            .map(|r| r.fields().iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default();
        Self::new("memory", fields, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn load(path: PathBuf) -> Result<Self, DVError> {
        let file_info = Self::get_file_info(path)?;
        debug!("Loading {:?}", file_info);
        let frame = match file_info.file_type {
            FileType::CSV => Self::load_csv(&file_info.path)?,
            FileType::PARQUET => Self::load_parquet(&file_info.path)?,
            FileType::ARROW => Self::load_arrow(&file_info.path)?,
        };

        let start_time = Instant::now();
        let df = frame.collect()?;
        if df.width() == 0 {
            return Err(DVError::EmptyDataset);
        }

        // Each column is converted in its own thread, rows are assembled afterwards.
        let columns: Result<Vec<(String, Vec<Value>)>, PolarsError> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(&df, name))
            .collect();
        let columns = columns?;

        let fields: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
        let rows: Vec<Row> = (0..df.height())
            .map(|ridx| {
                Row::new(
                    columns
                        .iter()
                        .map(|(name, data)| (name.clone(), data[ridx].clone()))
                        .collect(),
                )
            })
            .collect();

        info!(
            "Loaded {} rows, {} columns ({} bytes) in {}ms",
            rows.len(),
            fields.len(),
            file_info.file_size,
            start_time.elapsed().as_millis()
        );

        let name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        Ok(Self::new(name, fields, rows))
    }

    fn is_numeric_type(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64
        )
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<(String, Vec<Value>), PolarsError> {
        let column = df.column(col_name)?;
        trace!("Column \"{}\" has dtype {:?}", col_name, column.dtype());

        let data = if Self::is_numeric_type(column.dtype()) {
            let col = column.cast(&DataType::Float64)?;
            col.f64()?
                .into_iter()
                .map(|v| v.map(Value::Number).unwrap_or(Value::Empty))
                .collect()
        } else {
            let col = column.cast(&DataType::String)?;
            col.str()?
                .into_iter()
                .map(|v| match v {
                    Some(s) => Value::Text(s.replace("\r\n", " ").replace('\n', " ")),
                    None => Value::Empty,
                })
                .collect()
        };
        Ok((col_name.to_string(), data))
    }

    fn detect_file_type(path: &Path) -> Result<FileType, DVError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(DVError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, DVError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DVError::FileNotFound,
            ErrorKind::PermissionDenied => DVError::PermissionDenied,
            _ => DVError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(DVError::LoadingFailed("Not a file!".into()));
        }

        let file_type = Self::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size: metadata.len(),
            file_type,
        })
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }
}
