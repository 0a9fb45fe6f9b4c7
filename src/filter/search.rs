//! Filters that are not bound to a column: the global search box and the
//! announcement year checkboxes.

use std::collections::BTreeSet;

use crate::dataset::{Dataset, Row};

/// Field the year checkboxes look at.
pub const DATE_FIELD: &str = "Announcement Date";

/// Case-insensitive substring search over every field of a row.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    needle: String,
}

impl SearchFilter {
    pub fn new(text: &str) -> Self {
        Self {
            needle: text.to_lowercase(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.needle.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        !self.is_active()
            || row
                .values()
                .any(|value| value.to_string().to_lowercase().contains(&self.needle))
    }
}

/// Keeps rows whose date field contains any of the checked years.
///
/// The check is a plain substring test on the whole field, "2019" also
/// matches a day or month part that happens to read "2019".
#[derive(Debug, Clone, Default)]
pub struct YearFilter<'a> {
    years: Option<&'a BTreeSet<String>>,
}

impl<'a> YearFilter<'a> {
    pub fn new(years: &'a BTreeSet<String>) -> Self {
        Self {
            years: (!years.is_empty()).then_some(years),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self.years {
            None => true,
            Some(years) => years.iter().any(|year| matches_year(row, year)),
        }
    }
}

pub fn matches_year(row: &Row, year: &str) -> bool {
    row.get(DATE_FIELD)
        .is_some_and(|date| date.to_string().contains(year))
}

/// Years offered as checkboxes: the third `/`-separated part of every date in `dataset`.
pub fn year_options(dataset: &Dataset) -> Vec<String> {
    dataset
        .rows()
        .iter()
        .filter_map(|row| {
            let date = row.display(DATE_FIELD);
            date.split('/')
                .nth(2)
                .map(str::trim)
                .filter(|year| !year.is_empty())
                .map(String::from)
        })
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
