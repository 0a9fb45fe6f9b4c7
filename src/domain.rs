use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::filter::{ColumnSpec, FilterKind};

pub const DEFAULT_PAGE_SIZE: usize = 10;

pub const HELP_TEXT: &str = "\
 Table
   ↑/k ↓/j      select row
   ←/h →/l      select column
   PgUp/p PgDn/n previous / next page
   Enter         expand / collapse row details
   s / S         sort column ascending / descending
   /             edit global search
   1-9           toggle year checkbox
   y             copy row to clipboard
   f / Tab       open filter of selected column
   c / C         clear column filter / clear all filters
   q             quit

 Filter panel
   ↑ ↓           move between options
   Space         select option / toggle checkbox
   m             toggle multi select (checkboxes)
   + / -         move slider, o turns it off
   [ / ]         edit lower / upper bound
   Enter         edit text filter
   Esc           back to table
";

#[derive(Debug)]
pub enum DVError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    EmptyDataset,
    InvalidPath(String),
}

impl From<Error> for DVError {
    fn from(err: Error) -> Self {
        DVError::IoError(err)
    }
}

impl From<PolarsError> for DVError {
    fn from(err: PolarsError) -> Self {
        DVError::PolarsError(err)
    }
}

impl fmt::Display for DVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DVError::IoError(e) => write!(f, "io error: {e}"),
            DVError::PolarsError(e) => write!(f, "failed to read data: {e}"),
            DVError::LoadingFailed(reason) => write!(f, "loading failed: {reason}"),
            DVError::FileNotFound => write!(f, "file not found"),
            DVError::PermissionDenied => write!(f, "permission denied"),
            DVError::UnknownFileType => write!(f, "unknown file type"),
            DVError::EmptyDataset => write!(f, "dataset has no columns"),
            DVError::InvalidPath(reason) => write!(f, "invalid path {reason}"),
        }
    }
}

impl std::error::Error for DVError {}

/// Columns of the deal table, in display order, with their default filter.
pub fn default_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("Announcement Date", FilterKind::Contains),
        ColumnSpec::new("Deal type", FilterKind::Checkbox),
        ColumnSpec::new("Buyer/in-licenser/investor", FilterKind::Equals),
        ColumnSpec::new("Target/partner/investee", FilterKind::Contains),
        ColumnSpec::new("Total deal value($m)", FilterKind::Between),
        ColumnSpec::new("Therapy Area(s)", FilterKind::Checkbox),
        ColumnSpec::new("Stage of lead product", FilterKind::Equals),
    ]
}

#[derive(Debug, Clone, Setters)]
pub struct DVConfig {
    pub data_path: PathBuf,
    pub log_file: PathBuf,
    pub event_poll_time: u64,
    pub page_size: usize,
    pub max_column_width: usize,
    pub columns: Vec<ColumnSpec>,
}

impl Default for DVConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/deals.csv"),
            log_file: PathBuf::from("dealview.log"),
            event_poll_time: 100,
            page_size: DEFAULT_PAGE_SIZE,
            max_column_width: 32,
            columns: default_columns(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditTarget {
    Search,
    LowerBound,
    UpperBound,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    Enter,
    Exit,
    Help,
    Search,
    Filter,
    Select,
    ToggleMultiMode,
    Increase,
    Decrease,
    Off,
    EditLowerBound,
    EditUpperBound,
    SortAscending,
    SortDescending,
    ClearFilter,
    ClearAll,
    CopyRow,
    ToggleYearSlot(usize),
    RawKey(KeyEvent),
}
