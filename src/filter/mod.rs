//! Column filters.
//!
//! Every filterable column carries a [`ColumnFilter`], a tagged value whose
//! payload depends on the [`FilterKind`] configured for the column. Each
//! payload implements [`RowFilter`], which decides row inclusion and derives
//! the options shown by the column's filter widget.

mod checkbox;
mod contains;
mod equals;
pub mod options;
mod range;
pub mod search;
mod threshold;

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::dataset::{Row, Value};
use crate::domain::EditTarget;

pub use checkbox::CheckboxFilter;
pub use contains::ContainsFilter;
pub use equals::EqualsFilter;
pub use range::RangeFilter;
pub use search::{SearchFilter, YearFilter};
pub use threshold::ThresholdFilter;

/// Behavior shared by all column filters.
pub trait RowFilter {
    /// Options for the filter widget, derived from the rows the filter can reach.
    fn options(&self, column: &str, rows: &[&Row]) -> FilterOptions;
    /// Whether `row` passes the filter on `column`.
    fn matches(&self, column: &str, row: &Row) -> bool;
    /// False when no constraint is configured.
    fn is_active(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterKind {
    #[default]
    None,
    Equals,
    Between,
    Threshold,
    Checkbox,
    Contains,
}

/// Widget used to edit a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterWidget {
    Select,
    RangeInputs,
    Slider,
    Checkboxes,
    TextBox,
}

/// Unknown tags disable filtering, so parsing never fails.
impl FromStr for FilterKind {
    type Err = Infallible;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Ok(match tag.trim().to_lowercase().as_str() {
            "equals" => FilterKind::Equals,
            "between" => FilterKind::Between,
            ">" | "threshold" | "slider" => FilterKind::Threshold,
            "check" | "checkbox" => FilterKind::Checkbox,
            "contains" | "text" => FilterKind::Contains,
            _ => FilterKind::None,
        })
    }
}

impl FilterKind {
    /// Unconfigured filter for this kind.
    pub fn build(self) -> ColumnFilter {
        match self {
            FilterKind::None => ColumnFilter::None,
            FilterKind::Equals => ColumnFilter::Equals(EqualsFilter::new(Selection::All)),
            FilterKind::Between => ColumnFilter::Between(RangeFilter::new(None, None)),
            FilterKind::Threshold => ColumnFilter::Threshold(ThresholdFilter::new(None)),
            FilterKind::Checkbox => ColumnFilter::Checkbox(CheckboxFilter::default()),
            FilterKind::Contains => ColumnFilter::Contains(ContainsFilter::new("")),
        }
    }

    pub fn widget(self) -> Option<FilterWidget> {
        match self {
            FilterKind::None => None,
            FilterKind::Equals => Some(FilterWidget::Select),
            FilterKind::Between => Some(FilterWidget::RangeInputs),
            FilterKind::Threshold => Some(FilterWidget::Slider),
            FilterKind::Checkbox => Some(FilterWidget::Checkboxes),
            FilterKind::Contains => Some(FilterWidget::TextBox),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub id: String,
    pub header: String,
    pub kind: FilterKind,
}

impl ColumnSpec {
    pub fn new(id: impl Into<String>, kind: FilterKind) -> Self {
        let id = id.into();
        Self {
            header: id.clone(),
            id,
            kind,
        }
    }

    /// Parses `<column>=<kind>`. The last `=` separates the two, column ids may contain `=`.
    pub fn parse(s: &str) -> Option<Self> {
        let (id, tag) = s.rsplit_once('=')?;
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        let Ok(kind) = tag.parse::<FilterKind>();
        Some(Self::new(id, kind))
    }
}

/// Entry of an equality select box.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    All,
    Only(Value),
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "All"),
            Selection::Only(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOptions {
    None,
    Choices(Vec<Selection>),
    Bounds { min: f64, max: f64 },
    Counts(BTreeMap<String, usize>),
}

impl FilterOptions {
    /// Number of selectable entries in the widget.
    pub fn len(&self) -> usize {
        match self {
            FilterOptions::None | FilterOptions::Bounds { .. } => 0,
            FilterOptions::Choices(choices) => choices.len(),
            FilterOptions::Counts(counts) => counts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            FilterOptions::Bounds { min, max } => Some((*min, *max)),
            _ => None,
        }
    }
}

/// The configured filter of one column.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColumnFilter {
    #[default]
    None,
    Equals(EqualsFilter),
    Between(RangeFilter),
    Threshold(ThresholdFilter),
    Checkbox(CheckboxFilter),
    Contains(ContainsFilter),
}

impl ColumnFilter {
    fn as_row_filter(&self) -> Option<&dyn RowFilter> {
        match self {
            ColumnFilter::None => None,
            ColumnFilter::Equals(f) => Some(f),
            ColumnFilter::Between(f) => Some(f),
            ColumnFilter::Threshold(f) => Some(f),
            ColumnFilter::Checkbox(f) => Some(f),
            ColumnFilter::Contains(f) => Some(f),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            ColumnFilter::None => FilterKind::None,
            ColumnFilter::Equals(_) => FilterKind::Equals,
            ColumnFilter::Between(_) => FilterKind::Between,
            ColumnFilter::Threshold(_) => FilterKind::Threshold,
            ColumnFilter::Checkbox(_) => FilterKind::Checkbox,
            ColumnFilter::Contains(_) => FilterKind::Contains,
        }
    }

    pub fn matches(&self, column: &str, row: &Row) -> bool {
        self.as_row_filter()
            .is_none_or(|f| !f.is_active() || f.matches(column, row))
    }

    pub fn options(&self, column: &str, rows: &[&Row]) -> FilterOptions {
        self.as_row_filter()
            .map(|f| f.options(column, rows))
            .unwrap_or(FilterOptions::None)
    }

    pub fn is_active(&self) -> bool {
        self.as_row_filter().is_some_and(|f| f.is_active())
    }

    // The edit operations below return whether the filter changed.

    /// Picks the widget entry at `cursor`. Out of range entries are ignored.
    pub fn select(&mut self, cursor: usize, options: &FilterOptions) -> bool {
        match (self, options) {
            (ColumnFilter::Equals(f), FilterOptions::Choices(choices)) => match choices.get(cursor) {
                Some(choice) => {
                    f.selected = choice.clone();
                    true
                }
                None => false,
            },
            (ColumnFilter::Checkbox(f), FilterOptions::Counts(counts)) => {
                match counts.keys().nth(cursor) {
                    Some(value) => {
                        f.toggle(value, counts.keys().cloned());
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    pub fn toggle_multi(&mut self) -> bool {
        match self {
            ColumnFilter::Checkbox(f) => {
                f.set_multi(!f.multi);
                true
            }
            _ => false,
        }
    }

    /// Moves a slider within the bounds offered for the column.
    pub fn step(&mut self, delta: f64, options: &FilterOptions) -> bool {
        match (self, options.bounds()) {
            (ColumnFilter::Threshold(f), Some(bounds)) => {
                f.step(delta, bounds);
                true
            }
            _ => false,
        }
    }

    /// Turns the filter off, a slider keeps no value and everything else is rebuilt.
    pub fn off(&mut self) {
        match self {
            ColumnFilter::Threshold(f) => f.off(),
            other => *other = other.kind().build(),
        }
    }

    /// Field edited when the filter is entered, if it takes typed input.
    pub fn entry_target(&self) -> Option<EditTarget> {
        match self {
            ColumnFilter::Contains(_) => Some(EditTarget::Text),
            ColumnFilter::Between(_) => Some(EditTarget::LowerBound),
            _ => None,
        }
    }

    /// Current text of the field `target`, `None` if the filter has no such field.
    pub fn text(&self, target: EditTarget) -> Option<String> {
        match (self, target) {
            (ColumnFilter::Contains(f), EditTarget::Text) => Some(f.needle.clone()),
            (ColumnFilter::Between(f), EditTarget::LowerBound) => Some(bound_text(f.min)),
            (ColumnFilter::Between(f), EditTarget::UpperBound) => Some(bound_text(f.max)),
            _ => None,
        }
    }

    pub fn set_text(&mut self, target: EditTarget, text: &str) -> bool {
        match (self, target) {
            (ColumnFilter::Contains(f), EditTarget::Text) => f.needle = text.to_string(),
            (ColumnFilter::Between(f), EditTarget::LowerBound) => f.set_min(text),
            (ColumnFilter::Between(f), EditTarget::UpperBound) => f.set_max(text),
            _ => return false,
        }
        true
    }

    /// Short description for the status line, e.g. `10..250`.
    pub fn describe(&self) -> String {
        match self {
            ColumnFilter::None => String::new(),
            ColumnFilter::Equals(f) => f.selected.to_string(),
            ColumnFilter::Between(f) => format!("{}..{}", bound_text(f.min), bound_text(f.max)),
            ColumnFilter::Threshold(f) => match f.value {
                Some(v) => format!("= {}", Value::Number(v)),
                None => "Off".to_string(),
            },
            ColumnFilter::Checkbox(f) => match &f.selected {
                Some(set) => set.iter().cloned().collect::<Vec<_>>().join("|"),
                None => "All".to_string(),
            },
            ColumnFilter::Contains(f) => format!("~{}", f.needle),
        }
    }
}

fn bound_text(bound: Option<f64>) -> String {
    bound.map(|b| Value::Number(b).to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_map_to_kinds() {
        assert_eq!("equals".parse::<FilterKind>(), Ok(FilterKind::Equals));
        assert_eq!("between".parse::<FilterKind>(), Ok(FilterKind::Between));
        assert_eq!(">".parse::<FilterKind>(), Ok(FilterKind::Threshold));
        assert_eq!("check".parse::<FilterKind>(), Ok(FilterKind::Checkbox));
        assert_eq!(" Contains ".parse::<FilterKind>(), Ok(FilterKind::Contains));
        assert_eq!("fuzzy".parse::<FilterKind>(), Ok(FilterKind::None));
    }

    #[test]
    fn unknown_kind_has_no_widget_and_includes_everything() {
        let Ok(kind) = "unknown".parse::<FilterKind>();
        assert_eq!(kind.widget(), None);

        let filter = kind.build();
        let row: Row = [("a", "x")].into_iter().collect();
        assert!(filter.matches("a", &row));
        assert!(!filter.is_active());
        assert_eq!(filter.options("a", &[&row]), FilterOptions::None);
    }

    #[test]
    fn built_filters_keep_their_kind_and_pass_everything() {
        let row: Row = [("a", "x")].into_iter().collect();
        for kind in [
            FilterKind::Equals,
            FilterKind::Between,
            FilterKind::Threshold,
            FilterKind::Checkbox,
            FilterKind::Contains,
        ] {
            let filter = kind.build();
            assert_eq!(filter.kind(), kind);
            assert!(kind.widget().is_some());
            assert!(!filter.is_active());
            assert!(filter.matches("a", &row));
            assert!(filter.matches("missing", &row));
        }
    }

    #[test]
    fn column_override_is_parsed() {
        let spec = ColumnSpec::parse("Total deal value($m)=>").unwrap();
        assert_eq!(spec.id, "Total deal value($m)");
        assert_eq!(spec.kind, FilterKind::Threshold);
        assert!(ColumnSpec::parse("no separator").is_none());
        assert!(ColumnSpec::parse("=equals").is_none());
    }

    #[test]
    fn selection_all_displays_as_all() {
        assert_eq!(Selection::All.to_string(), "All");
        assert_eq!(Selection::Only(Value::from("Pfizer")).to_string(), "Pfizer");
    }

    #[test]
    fn select_out_of_range_keeps_filter() {
        let choices = FilterOptions::Choices(vec![
            Selection::All,
            Selection::Only(Value::from("Roche")),
        ]);
        let mut filter = ColumnFilter::Equals(EqualsFilter::new(Selection::Only(Value::from("Pfizer"))));
        assert!(!filter.select(4, &choices));
        assert_eq!(filter.describe(), "Pfizer");

        assert!(filter.select(1, &choices));
        assert_eq!(filter.describe(), "Roche");

        let counts = FilterOptions::Counts(BTreeMap::from([("Licensing".to_string(), 2)]));
        let mut filter = FilterKind::Checkbox.build();
        assert!(!filter.select(1, &counts));
        assert!(!filter.is_active());
        assert!(filter.select(0, &counts));
        assert_eq!(filter.describe(), "Licensing");
    }

    #[test]
    fn edits_are_routed_by_filter() {
        let mut range = FilterKind::Between.build();
        assert_eq!(range.entry_target(), Some(EditTarget::LowerBound));
        assert!(range.set_text(EditTarget::LowerBound, "100"));
        assert!(range.set_text(EditTarget::UpperBound, "2.5e3"));
        assert_eq!(range.text(EditTarget::UpperBound), Some("2500".to_string()));
        assert!(!range.set_text(EditTarget::Text, "x"));
        assert_eq!(range.describe(), "100..2500");

        let mut contains = FilterKind::Contains.build();
        assert_eq!(contains.entry_target(), Some(EditTarget::Text));
        assert!(contains.set_text(EditTarget::Text, "gene"));
        assert_eq!(contains.text(EditTarget::Text), Some("gene".to_string()));
        assert_eq!(contains.text(EditTarget::LowerBound), None);

        let mut equals = FilterKind::Equals.build();
        assert_eq!(equals.entry_target(), None);
        assert!(!equals.toggle_multi());
        assert!(!equals.step(1.0, &FilterOptions::Bounds { min: 0.0, max: 1.0 }));
    }

    #[test]
    fn off_resets_slider_and_other_filters() {
        let bounds = FilterOptions::Bounds { min: 10.0, max: 20.0 };
        let mut slider = FilterKind::Threshold.build();
        assert!(slider.step(1.0, &bounds));
        assert_eq!(slider.describe(), "= 10");
        slider.off();
        assert!(!slider.is_active());
        assert_eq!(slider.kind(), FilterKind::Threshold);

        let mut contains = ColumnFilter::Contains(ContainsFilter::new("x"));
        contains.off();
        assert_eq!(contains, FilterKind::Contains.build());
    }
}
