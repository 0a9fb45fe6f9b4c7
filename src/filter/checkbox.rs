use std::collections::BTreeSet;

use tracing::trace;

use crate::dataset::Row;
use crate::filter::options::value_counts;
use crate::filter::{FilterOptions, RowFilter};

/// Multi-value checkbox filter. `selected == None` means every value is checked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckboxFilter {
    pub selected: Option<BTreeSet<String>>,
    pub multi: bool,
}

impl CheckboxFilter {
    pub fn is_checked(&self, value: &str) -> bool {
        self.selected.as_ref().is_none_or(|set| set.contains(value))
    }

    pub fn set_multi(&mut self, multi: bool) {
        self.multi = multi;
    }

    /// Clicks the checkbox of `value`. `keys` are all values currently offered.
    ///
    /// Single mode selects only `value`, clicking the sole selected value again
    /// checks everything. Multi mode flips `value` in the checked set, removing
    /// the last member checks everything.
    pub fn toggle<I>(&mut self, value: &str, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        if self.multi {
            let mut checked = self
                .selected
                .take()
                .unwrap_or_else(|| keys.into_iter().collect());
            if checked.contains(value) {
                if checked.len() > 1 {
                    checked.remove(value);
                    self.selected = Some(checked);
                }
            } else {
                checked.insert(value.to_string());
                self.selected = Some(checked);
            }
        } else {
            let sole = self
                .selected
                .as_ref()
                .is_some_and(|set| set.len() == 1 && set.contains(value));
            self.selected = if sole {
                None
            } else {
                Some(BTreeSet::from([value.to_string()]))
            };
        }
        trace!("Checkbox {value} toggled, selected: {:?}", self.selected);
    }
}

impl RowFilter for CheckboxFilter {
    fn options(&self, column: &str, rows: &[&Row]) -> FilterOptions {
        FilterOptions::Counts(value_counts(column, rows))
    }

    fn matches(&self, column: &str, row: &Row) -> bool {
        match &self.selected {
            None => true,
            Some(set) => row
                .get(column)
                .is_some_and(|value| set.contains(&value.to_string())),
        }
    }

    fn is_active(&self) -> bool {
        self.selected.is_some()
    }
}
