//! Derivation of filter widget options from a set of rows.
//!
//! All functions are total: missing fields are skipped and an empty row set
//! yields empty (or zero) options.

use std::collections::{BTreeMap, HashSet};

use crate::dataset::Row;
use crate::filter::Selection;

/// Distinct values of `column` in first-seen order, preceded by [`Selection::All`].
/// Values are told apart by their display string.
pub fn distinct_values(column: &str, rows: &[&Row]) -> Vec<Selection> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut choices = vec![Selection::All];
    for value in rows.iter().filter_map(|row| row.get(column)) {
        if seen.insert(value.to_string()) {
            choices.push(Selection::Only(value.clone()));
        }
    }
    choices
}

/// Smallest and largest numeric value of `column`, `(0, 0)` if there is none.
pub fn numeric_bounds(column: &str, rows: &[&Row]) -> (f64, f64) {
    rows.iter()
        .filter_map(|row| row.get(column).and_then(|v| v.as_number()))
        .fold(None, |acc: Option<(f64, f64)>, n| match acc {
            Some((min, max)) => Some((min.min(n), max.max(n))),
            None => Some((n, n)),
        })
        .unwrap_or((0.0, 0.0))
}

/// Number of occurrences of each displayed value of `column`.
pub fn value_counts(column: &str, rows: &[&Row]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in rows.iter().filter_map(|row| row.get(column)) {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}
