use crate::dataset::Row;
use crate::filter::options::numeric_bounds;
use crate::filter::{FilterOptions, RowFilter};

/// Slider filter. Pins the column to exactly one value, `None` is "Off".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThresholdFilter {
    pub value: Option<f64>,
}

impl ThresholdFilter {
    pub fn new(value: Option<f64>) -> Self {
        Self { value }
    }

    /// Moves the slider by `delta` within `[min, max]`. An unset slider is
    /// placed on `min` first.
    pub fn step(&mut self, delta: f64, (min, max): (f64, f64)) {
        let next = match self.value {
            Some(current) => current + delta,
            None => min,
        };
        self.value = Some(next.max(min).min(max));
    }

    pub fn off(&mut self) {
        self.value = None;
    }
}

impl RowFilter for ThresholdFilter {
    fn options(&self, column: &str, rows: &[&Row]) -> FilterOptions {
        let (min, max) = numeric_bounds(column, rows);
        FilterOptions::Bounds { min, max }
    }

    fn matches(&self, column: &str, row: &Row) -> bool {
        match self.value {
            None => true,
            Some(value) => row.get(column).and_then(|v| v.as_number()) == Some(value),
        }
    }

    fn is_active(&self) -> bool {
        self.value.is_some()
    }
}
