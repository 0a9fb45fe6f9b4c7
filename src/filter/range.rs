use crate::dataset::Row;
use crate::filter::options::numeric_bounds;
use crate::filter::{FilterOptions, RowFilter};

/// Inclusive numeric range, either bound may be open.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Bound typed into a number box. Anything that is not a number clears the bound.
pub fn parse_bound(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl RangeFilter {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn set_min(&mut self, text: &str) {
        self.min = parse_bound(text);
    }

    pub fn set_max(&mut self, text: &str) {
        self.max = parse_bound(text);
    }
}

impl RowFilter for RangeFilter {
    fn options(&self, column: &str, rows: &[&Row]) -> FilterOptions {
        let (min, max) = numeric_bounds(column, rows);
        FilterOptions::Bounds { min, max }
    }

    fn matches(&self, column: &str, row: &Row) -> bool {
        let Some(value) = row.get(column).and_then(|v| v.as_number()) else {
            return !self.is_active();
        };
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}
