use crate::dataset::Row;
use crate::filter::{FilterOptions, RowFilter};

/// Free text filter, case-insensitive substring match on one column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContainsFilter {
    pub needle: String,
}

impl ContainsFilter {
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }
}

impl RowFilter for ContainsFilter {
    fn options(&self, _column: &str, _rows: &[&Row]) -> FilterOptions {
        FilterOptions::None
    }

    fn matches(&self, column: &str, row: &Row) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        row.get(column).is_some_and(|value| {
            value
                .to_string()
                .to_lowercase()
                .contains(&self.needle.to_lowercase())
        })
    }

    fn is_active(&self) -> bool {
        !self.needle.is_empty()
    }
}
