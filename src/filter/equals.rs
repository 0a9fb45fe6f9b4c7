use crate::dataset::Row;
use crate::filter::options::distinct_values;
use crate::filter::{FilterOptions, RowFilter, Selection};

/// Keeps rows whose column value equals the selected value exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualsFilter {
    pub selected: Selection,
}

impl Default for EqualsFilter {
    fn default() -> Self {
        Self {
            selected: Selection::All,
        }
    }
}

impl EqualsFilter {
    pub fn new(selected: Selection) -> Self {
        Self { selected }
    }
}

impl RowFilter for EqualsFilter {
    fn options(&self, column: &str, rows: &[&Row]) -> FilterOptions {
        FilterOptions::Choices(distinct_values(column, rows))
    }

    fn matches(&self, column: &str, row: &Row) -> bool {
        match &self.selected {
            Selection::All => true,
            Selection::Only(value) => row.get(column) == Some(value),
        }
    }

    fn is_active(&self) -> bool {
        self.selected != Selection::All
    }
}
