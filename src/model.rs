use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::dataset::{Dataset, Row, Value};
use crate::detail::{detail_view, row_as_csv};
use crate::domain::{DVConfig, EditTarget, Message};
use crate::filter::search::year_options;
use crate::filter::{ColumnFilter, ColumnSpec, FilterOptions, SearchFilter, YearFilter};
use crate::inputter::{InputResult, Inputter};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    FILTER,
    INPUT,
    POPUP,
}

/// Session state derived from user input.
///
/// `active_rows` holds dataset indices in dataset order. `expanded` is keyed by
/// display position, so after refiltering an entry may point at a different
/// row than the one that was expanded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub active_rows: Vec<usize>,
    pub expanded: HashMap<usize, bool>,
    pub search_text: String,
    pub years: BTreeSet<String>,
}

impl ViewState {
    pub fn new(dataset: &Dataset) -> Self {
        Self {
            active_rows: (0..dataset.len()).collect(),
            ..Default::default()
        }
    }

    pub fn is_expanded(&self, position: usize) -> bool {
        self.expanded.get(&position).copied().unwrap_or(false)
    }

    pub fn toggle_expanded(&mut self, position: usize) {
        let expanded = !self.is_expanded(position);
        self.expanded.insert(position, expanded);
    }
}

pub struct PageRow {
    pub position: usize,
    pub cells: Vec<String>,
    pub expanded: bool,
    pub detail: Vec<(&'static str, String)>,
}

/// One page of the table as handed to the renderer.
pub struct PageView {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<PageRow>,
    pub page: usize,
    pub pages: usize,
    pub filtered: usize,
    pub total: usize,
}

pub struct Model {
    config: DVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    dataset: Dataset,
    columns: Vec<ColumnSpec>,
    filters: Vec<ColumnFilter>,
    options: Vec<FilterOptions>,
    years: Vec<String>,
    view: ViewState,
    display: Vec<usize>, // active_rows in display order
    sort: Option<(usize, bool)>,
    page: usize,
    cursor_row: usize, // Row on the current page
    cursor_column: usize,
    option_cursor: usize,
    input: Inputter,
    edit_target: Option<EditTarget>,
    input_backup: String,
    last_input: InputResult,
    clipboard: Option<Clipboard>,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &DVConfig, dataset: Dataset) -> Self {
        if dataset.is_empty() {
            warn!("Dataset {} has no rows", dataset.name());
        }
        for spec in config.columns.iter() {
            if !dataset.fields().contains(&spec.id) {
                warn!("Column \"{}\" is not part of the dataset", spec.id);
            }
        }
        let columns = config.columns.clone();
        let filters = columns.iter().map(|spec| spec.kind.build()).collect();
        let options = vec![FilterOptions::None; columns.len()];

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            years: year_options(&dataset),
            view: ViewState::new(&dataset),
            dataset,
            columns,
            filters,
            options,
            display: Vec::new(),
            sort: None,
            page: 0,
            cursor_row: 0,
            cursor_column: 0,
            option_cursor: 0,
            input: Inputter::default(),
            edit_target: None,
            input_backup: String::new(),
            last_input: InputResult::default(),
            clipboard: None,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.refresh();
        model.set_status_message(format!(
            "Loaded {} rows from {}",
            model.dataset.len(),
            model.dataset.name()
        ));
        model
    }

    // -------------------- View state transitions ---------------------- //

    /// Replaces the filter of `column` and recomputes the view.
    pub fn set_filter(&mut self, column: &str, filter: ColumnFilter) {
        let Some(cidx) = self.column_index(column) else {
            warn!("Ignoring filter for unknown column \"{column}\"");
            return;
        };
        debug!("Filter \"{}\" set to {:?}", column, filter);
        self.filters[cidx] = filter;
        self.refresh();
    }

    pub fn clear_filter(&mut self, column: &str) {
        if let Some(cidx) = self.column_index(column) {
            let filter = self.columns[cidx].kind.build();
            self.set_filter(column, filter);
        }
    }

    /// Resets every column filter, the search text and the year checkboxes.
    pub fn clear_all(&mut self) {
        self.filters = self.columns.iter().map(|spec| spec.kind.build()).collect();
        self.view.search_text.clear();
        self.view.years.clear();
        self.refresh();
    }

    pub fn set_search(&mut self, text: &str) {
        trace!("Search text \"{text}\"");
        self.view.search_text = text.to_string();
        self.refresh();
    }

    /// Checks or unchecks the year box for `year`.
    pub fn toggle_year(&mut self, year: &str) {
        if !self.view.years.remove(year) {
            self.view.years.insert(year.to_string());
        }
        debug!("Checked years: {:?}", self.view.years);
        self.refresh();
    }

    pub fn toggle_expanded(&mut self, position: usize) {
        self.view.toggle_expanded(position);
    }

    pub fn sort_by(&mut self, column: usize, ascending: bool) {
        if column < self.columns.len() {
            self.sort = Some((column, ascending));
            self.rebuild_display();
        }
    }

    // Recompute active rows from the full dataset, then every column's options.
    fn refresh(&mut self) {
        let start_time = Instant::now();
        let search = SearchFilter::new(&self.view.search_text);
        let years = YearFilter::new(&self.view.years);
        let rows = self.dataset.rows();

        let active: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| self.passes(row, None, &search, &years))
            .map(|(idx, _)| idx)
            .collect();

        // Options of a column ignore the column's own filter.
        let options: Vec<FilterOptions> = self
            .columns
            .iter()
            .zip(self.filters.iter())
            .enumerate()
            .map(|(cidx, (spec, filter))| {
                if filter.kind().widget().is_none() {
                    return FilterOptions::None;
                }
                let reachable: Vec<&Row> = if filter.is_active() {
                    rows.iter()
                        .filter(|row| self.passes(row, Some(cidx), &search, &years))
                        .collect()
                } else {
                    active.iter().map(|&idx| &rows[idx]).collect()
                };
                filter.options(&spec.id, &reachable)
            })
            .collect();

        trace!(
            "Refresh kept {}/{} rows in {}ms (search {}, years {:?})",
            active.len(),
            rows.len(),
            start_time.elapsed().as_millis(),
            search.is_active(),
            self.view.years
        );
        self.view.active_rows = active;
        self.options = options;

        // The option list of the open panel may have shrunk.
        self.option_cursor = match self.options.get(self.cursor_column) {
            Some(options) if !options.is_empty() => self.option_cursor.min(options.len() - 1),
            _ => 0,
        };
        self.rebuild_display();
    }

    fn passes(
        &self,
        row: &Row,
        skip: Option<usize>,
        search: &SearchFilter,
        years: &YearFilter,
    ) -> bool {
        search.matches(row)
            && years.matches(row)
            && self
                .columns
                .iter()
                .zip(self.filters.iter())
                .enumerate()
                .filter(|(cidx, _)| Some(*cidx) != skip)
                .all(|(_, (spec, filter))| filter.matches(&spec.id, row))
    }

    fn rebuild_display(&mut self) {
        let mut display = self.view.active_rows.clone();
        if let Some((cidx, ascending)) = self.sort {
            let field = &self.columns[cidx].id;
            let rows = self.dataset.rows();
            display.sort_by(|&a, &b| compare_cells(rows[a].get(field), rows[b].get(field), ascending));
        }
        self.display = display;

        self.page = self.page.min(self.pages() - 1);
        self.cursor_row = self.cursor_row.min(self.rows_on_page().saturating_sub(1));
    }

    // -------------------- Accessors for the UI ---------------------- //

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn years(&self) -> &[String] {
        &self.years
    }

    pub fn filter(&self, column: &str) -> Option<&ColumnFilter> {
        self.column_index(column).map(|cidx| &self.filters[cidx])
    }

    pub fn filter_options(&self, column: &str) -> Option<&FilterOptions> {
        self.column_index(column).map(|cidx| &self.options[cidx])
    }

    /// Rows in the order they are displayed.
    #[cfg(test)]
    pub fn displayed_rows(&self) -> impl Iterator<Item = &Row> {
        self.display.iter().filter_map(|&idx| self.dataset.row(idx))
    }

    pub fn selected_column(&self) -> usize {
        self.cursor_column
    }

    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    pub fn option_cursor(&self) -> usize {
        self.option_cursor
    }

    pub fn sort(&self) -> Option<(usize, bool)> {
        self.sort
    }

    pub fn filter_panel_open(&self) -> bool {
        self.modus == Modus::FILTER
            || (self.modus == Modus::INPUT && self.previous_modus == Modus::FILTER)
    }

    pub fn show_help(&self) -> bool {
        self.modus == Modus::POPUP
    }

    pub fn input(&self) -> Option<(EditTarget, &InputResult)> {
        self.edit_target.map(|target| (target, &self.last_input))
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::INPUT
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn status_message_age(&self) -> Duration {
        self.last_status_message_update.elapsed()
    }

    pub fn pages(&self) -> usize {
        self.display.len().div_ceil(self.page_size()).max(1)
    }

    pub fn page(&self) -> PageView {
        let begin = self.page * self.page_size();
        let end = (begin + self.page_size()).min(self.display.len());
        let rows = self.display[begin..end]
            .iter()
            .enumerate()
            .filter_map(|(offset, &idx)| {
                let row = self.dataset.row(idx)?;
                let position = begin + offset;
                let expanded = self.view.is_expanded(position);
                Some(PageRow {
                    position,
                    cells: self.columns.iter().map(|c| row.display(&c.id)).collect(),
                    expanded,
                    detail: if expanded { detail_view(row) } else { Vec::new() },
                })
            })
            .collect();

        PageView {
            name: self.dataset.name().to_string(),
            headers: self.columns.iter().map(|c| c.header.clone()).collect(),
            rows,
            page: self.page,
            pages: self.pages(),
            filtered: self.view.active_rows.len(),
            total: self.dataset.len(),
        }
    }

    pub fn selected_row(&self) -> Option<&Row> {
        let idx = self.display.get(self.selected_position()?)?;
        self.dataset.row(*idx)
    }

    fn selected_position(&self) -> Option<usize> {
        let position = self.page * self.page_size() + self.cursor_row;
        (position < self.display.len()).then_some(position)
    }

    fn page_size(&self) -> usize {
        self.config.page_size.max(1)
    }

    fn rows_on_page(&self) -> usize {
        let begin = self.page * self.page_size();
        self.display.len().saturating_sub(begin).min(self.page_size())
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column)
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    // -------------------- Message handling ---------------------- //

    pub fn update(&mut self, message: Option<Message>) {
        let Some(msg) = message else {
            return;
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);

        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_selection_up(),
                Message::MoveDown => self.move_selection_down(),
                Message::MoveLeft => self.move_column(-1),
                Message::MoveRight => self.move_column(1),
                Message::NextPage => self.move_page(1),
                Message::PrevPage => self.move_page(-1),
                Message::Enter => {
                    if let Some(position) = self.selected_position() {
                        self.toggle_expanded(position);
                    }
                }
                Message::Search => self.enter_input(EditTarget::Search),
                Message::Filter => self.open_filter_panel(),
                Message::SortAscending => self.sort_by(self.cursor_column, true),
                Message::SortDescending => self.sort_by(self.cursor_column, false),
                Message::ClearFilter => self.clear_selected_filter(),
                Message::ClearAll => self.clear_all(),
                Message::CopyRow => self.copy_selected_row(),
                Message::ToggleYearSlot(slot) => self.toggle_year_slot(slot),
                Message::Help => self.show_help_popup(),
                _ => (),
            },
            Modus::FILTER => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.option_cursor = self.option_cursor.saturating_sub(1),
                Message::MoveDown => {
                    let len = self.options.get(self.cursor_column).map_or(0, FilterOptions::len);
                    if self.option_cursor + 1 < len {
                        self.option_cursor += 1;
                    }
                }
                Message::MoveLeft => {
                    self.move_column(-1);
                    self.option_cursor = 0;
                }
                Message::MoveRight => {
                    self.move_column(1);
                    self.option_cursor = 0;
                }
                Message::Select => self.select_option(),
                Message::Enter => {
                    match self.filters.get(self.cursor_column).and_then(|f| f.entry_target()) {
                        Some(target) => self.enter_input(target),
                        None => self.select_option(),
                    }
                }
                Message::ToggleMultiMode => {
                    self.modify_selected_filter(|filter, _| filter.toggle_multi())
                }
                Message::Increase => self.modify_selected_filter(|filter, options| filter.step(1.0, options)),
                Message::Decrease => {
                    self.modify_selected_filter(|filter, options| filter.step(-1.0, options))
                }
                Message::Off => self.modify_selected_filter(|filter, _| {
                    filter.off();
                    true
                }),
                Message::EditLowerBound => self.enter_input(EditTarget::LowerBound),
                Message::EditUpperBound => self.enter_input(EditTarget::UpperBound),
                Message::ClearFilter => self.clear_selected_filter(),
                Message::ToggleYearSlot(slot) => self.toggle_year_slot(slot),
                Message::Help => self.show_help_popup(),
                Message::Exit | Message::Filter => {
                    self.previous_modus = Modus::FILTER;
                    self.modus = Modus::TABLE;
                }
                _ => (),
            },
            Modus::INPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Help => {
                    self.modus = self.previous_modus;
                    self.previous_modus = Modus::POPUP;
                }
                _ => (),
            },
        }
    }

    // -------------------- Control handling functions ---------------------- //

    fn move_selection_up(&mut self) {
        if self.cursor_row > 0 {
            self.cursor_row -= 1;
        } else if self.page > 0 {
            self.page -= 1;
            self.cursor_row = self.rows_on_page().saturating_sub(1);
        }
    }

    fn move_selection_down(&mut self) {
        if self.cursor_row + 1 < self.rows_on_page() {
            self.cursor_row += 1;
        } else if self.page + 1 < self.pages() {
            self.page += 1;
            self.cursor_row = 0;
        }
    }

    fn move_page(&mut self, step: isize) {
        let last = self.pages() - 1;
        self.page = self.page.saturating_add_signed(step).min(last);
        self.cursor_row = self.cursor_row.min(self.rows_on_page().saturating_sub(1));
    }

    fn move_column(&mut self, step: isize) {
        let last = self.columns.len().saturating_sub(1);
        self.cursor_column = self.cursor_column.saturating_add_signed(step).min(last);
    }

    fn toggle_year_slot(&mut self, slot: usize) {
        match self.years.get(slot).cloned() {
            Some(year) => self.toggle_year(&year),
            None => trace!("No year checkbox in slot {slot}"),
        }
    }

    fn open_filter_panel(&mut self) {
        let Some(spec) = self.columns.get(self.cursor_column) else {
            return;
        };
        if spec.kind.widget().is_none() {
            let message = format!("Column \"{}\" has no filter", spec.header);
            self.set_status_message(message);
            return;
        }
        self.previous_modus = self.modus;
        self.modus = Modus::FILTER;
        self.option_cursor = 0;
    }

    fn clear_selected_filter(&mut self) {
        if let Some(spec) = self.columns.get(self.cursor_column) {
            let column = spec.id.clone();
            self.clear_filter(&column);
        }
    }

    // Applies `change` to the selected column's filter. The view is only
    // recomputed when `change` reports a modification.
    fn modify_selected_filter<F>(&mut self, change: F)
    where
        F: FnOnce(&mut ColumnFilter, &FilterOptions) -> bool,
    {
        let cidx = self.cursor_column;
        let (Some(current), Some(options)) = (self.filters.get(cidx), self.options.get(cidx)) else {
            return;
        };
        let mut filter = current.clone();
        if change(&mut filter, options) {
            let column = self.columns[cidx].id.clone();
            self.set_filter(&column, filter);
        }
    }

    fn select_option(&mut self) {
        let cursor = self.option_cursor;
        self.modify_selected_filter(|filter, options| filter.select(cursor, options));
    }

    fn enter_input(&mut self, target: EditTarget) {
        let current = match target {
            EditTarget::Search => self.view.search_text.clone(),
            _ => match self.filters.get(self.cursor_column).and_then(|f| f.text(target)) {
                Some(text) => text,
                None => return,
            },
        };
        trace!("Editing {:?} starting from \"{}\"", target, current);
        let numeric = matches!(target, EditTarget::LowerBound | EditTarget::UpperBound);
        self.input.start(&current, numeric);
        self.last_input = self.input.get();
        self.input_backup = current;
        self.edit_target = Some(target);
        self.previous_modus = self.modus;
        self.modus = Modus::INPUT;
    }

    fn raw_input(&mut self, key: KeyEvent) {
        let Some(target) = self.edit_target else {
            return;
        };
        self.last_input = self.input.read(key);
        let text = if self.last_input.canceled {
            self.input_backup.clone()
        } else {
            self.last_input.input.clone()
        };
        self.apply_input(target, &text);

        if self.last_input.finished {
            self.edit_target = None;
            self.modus = self.previous_modus;
            self.previous_modus = Modus::INPUT;
            self.set_status_message(format!(
                "{} of {} rows shown",
                self.view.active_rows.len(),
                self.dataset.len()
            ));
        }
    }

    fn apply_input(&mut self, target: EditTarget, text: &str) {
        match target {
            EditTarget::Search => {
                if text != self.view.search_text {
                    self.set_search(text);
                }
            }
            _ => self.modify_selected_filter(|filter, _| filter.set_text(target, text)),
        }
    }

    fn show_help_popup(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn copy_selected_row(&mut self) {
        let Some(content) = self.selected_row().map(row_as_csv) else {
            return;
        };
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard unavailable: {:?}", e);
                    self.set_status_message("Clipboard unavailable");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(_) => {
                    info!("Copied row to clipboard.");
                    self.set_status_message("Copied row to clipboard");
                }
                Err(e) => warn!("Error copying to clipboard: {:?}", e),
            }
        }
    }
}

// Numbers sort before text, text falls back to string order.
fn compare_cells(a: Option<&Value>, b: Option<&Value>, ascending: bool) -> Ordering {
    let a_num = a.and_then(|v| v.as_number());
    let b_num = b.and_then(|v| v.as_number());
    let ordering = match (a_num, b_num) {
        (Some(a_float), Some(b_float)) => a_float.total_cmp(&b_float),
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (None, None) => {
            let a_str = a.map(|v| v.to_string()).unwrap_or_default();
            let b_str = b.map(|v| v.to_string()).unwrap_or_default();
            a_str.cmp(&b_str)
        }
    };
    if ascending { ordering } else { ordering.reverse() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::default_columns;
    use crate::filter::search::DATE_FIELD;
    use crate::filter::{
        CheckboxFilter, ContainsFilter, EqualsFilter, FilterKind, RangeFilter, Selection,
        ThresholdFilter,
    };
    use proptest::prelude::*;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    const BUYER: &str = "Buyer/in-licenser/investor";
    const VALUE: &str = "Total deal value($m)";
    const TYPE: &str = "Deal type";

    fn deal(date: &str, kind: &str, buyer: &str, value: Value) -> Row {
        [
            (DATE_FIELD, Value::from(date)),
            (TYPE, Value::from(kind)),
            (BUYER, Value::from(buyer)),
            ("Target/partner/investee", Value::from("Target")),
            (VALUE, value),
            ("Therapy Area(s)", Value::from("Oncology")),
            ("Stage of lead product", Value::from("Phase I")),
            ("Completion date", Value::from("01/01/2021")),
        ]
        .into_iter()
        .collect()
    }

    fn dataset() -> Dataset {
        Dataset::from_rows(vec![
            deal("03/04/2019", "Acquisition", "Novartis", Value::from(250i64)),
            deal("01/02/2020", "Licensing", "Pfizer", Value::from(650i64)),
            deal("15/07/2018", "Investment", "Roche", Value::from(4300i64)),
            deal("22/11/2021", "Licensing", "Novartis", Value::Empty),
            deal("09/09/2019", "Acquisition", "Bristol-Myers Squibb", Value::from(74000i64)),
        ])
    }

    fn model() -> Model {
        Model::init(&DVConfig::default(), dataset())
    }

    fn buyers(model: &Model) -> Vec<String> {
        model.displayed_rows().map(|r| r.display(BUYER)).collect()
    }

    fn key(code: KeyCode) -> Option<Message> {
        Some(Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn big_model(rows: usize, page_size: usize) -> Model {
        let rows = (0..rows)
            .map(|i| deal("01/01/2020", "Licensing", &format!("Buyer {i}"), Value::from(i as i64)))
            .collect();
        Model::init(&DVConfig::default().page_size(page_size), Dataset::from_rows(rows))
    }

    #[test]
    fn starts_with_whole_dataset() {
        let model = model();
        assert_eq!(model.view().active_rows, vec![0, 1, 2, 3, 4]);
        assert!(model.view().expanded.is_empty());
        assert_eq!(model.years(), ["2018", "2019", "2020", "2021"]);
    }

    #[test]
    fn applying_then_clearing_each_filter_restores_dataset() {
        let filters = [
            (BUYER, ColumnFilter::Equals(EqualsFilter::new(Selection::Only(Value::from("Pfizer"))))),
            (VALUE, ColumnFilter::Between(RangeFilter::new(Some(300.0), None))),
            (VALUE, ColumnFilter::Threshold(ThresholdFilter::new(Some(650.0)))),
            (
                TYPE,
                ColumnFilter::Checkbox(CheckboxFilter {
                    selected: Some(BTreeSet::from(["Licensing".to_string()])),
                    multi: false,
                }),
            ),
            (DATE_FIELD, ColumnFilter::Contains(ContainsFilter::new("2019"))),
        ];
        for (column, filter) in filters {
            let mut model = model();
            model.set_filter(column, filter);
            assert!(model.view().active_rows.len() < 5, "{column} did not filter");
            model.clear_filter(column);
            assert_eq!(model.view().active_rows, vec![0, 1, 2, 3, 4]);
        }
    }

    #[test]
    fn column_filters_are_and_combined() {
        let mut model = model();
        model.set_filter(
            BUYER,
            ColumnFilter::Equals(EqualsFilter::new(Selection::Only(Value::from("Novartis")))),
        );
        assert_eq!(model.view().active_rows, vec![0, 3]);

        model.set_filter(VALUE, ColumnFilter::Between(RangeFilter::new(Some(100.0), Some(1000.0))));
        assert_eq!(model.view().active_rows, vec![0]);
    }

    #[test]
    fn inverted_range_gives_empty_view() {
        let mut model = model();
        model.set_filter(VALUE, ColumnFilter::Between(RangeFilter::new(Some(1000.0), Some(10.0))));
        assert!(model.view().active_rows.is_empty());
        assert_eq!(model.pages(), 1);
        assert!(model.page().rows.is_empty());
        assert!(model.selected_row().is_none());
    }

    #[test]
    fn search_matches_any_field() {
        let mut model = model();
        model.set_search("");
        assert_eq!(model.view().active_rows.len(), 5);

        model.set_search("pfiz");
        assert_eq!(buyers(&model), vec!["Pfizer"]);

        model.set_search("74000");
        assert_eq!(buyers(&model), vec!["Bristol-Myers Squibb"]);

        model.set_search("");
        assert_eq!(model.view().active_rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn year_checkboxes_filter_and_restore() {
        let mut model = model();
        model.toggle_year("2019");
        assert_eq!(model.view().active_rows, vec![0, 4]);

        model.toggle_year("2020");
        assert_eq!(model.view().active_rows, vec![0, 1, 4]);

        model.toggle_year("2019");
        model.toggle_year("2020");
        assert_eq!(model.view().active_rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn year_filter_yields_exactly_the_matching_row() {
        let rows = vec![
            deal("03/04/2019", "Acquisition", "Novartis", Value::from(250i64)),
            deal("01/02/2020", "Licensing", "Pfizer", Value::from(650i64)),
        ];
        let mut model = Model::init(&DVConfig::default(), Dataset::from_rows(rows));
        model.toggle_year("2019");
        assert_eq!(buyers(&model), vec!["Novartis"]);
    }

    #[test]
    fn years_compose_with_column_filters_and_search() {
        let mut model = model();
        model.toggle_year("2019");
        model.set_filter(TYPE, ColumnFilter::Checkbox(CheckboxFilter {
            selected: Some(BTreeSet::from(["Acquisition".to_string()])),
            multi: false,
        }));
        assert_eq!(model.view().active_rows, vec![0, 4]);
        model.set_search("novartis");
        assert_eq!(model.view().active_rows, vec![0]);

        model.update(Some(Message::ClearAll));
        assert_eq!(model.view().active_rows, vec![0, 1, 2, 3, 4]);
        assert!(model.view().years.is_empty());
        assert!(model.view().search_text.is_empty());
    }

    #[test]
    fn options_of_a_column_ignore_its_own_filter() {
        let mut model = model();
        model.set_filter(
            BUYER,
            ColumnFilter::Equals(EqualsFilter::new(Selection::Only(Value::from("Pfizer")))),
        );

        // The buyer select still offers every buyer.
        let Some(FilterOptions::Choices(choices)) = model.filter_options(BUYER) else {
            panic!("buyer column should offer choices");
        };
        assert_eq!(choices.len(), 5);
        assert_eq!(choices[0], Selection::All);

        // Other columns only see Pfizer deals.
        assert_eq!(
            model.filter_options(VALUE),
            Some(&FilterOptions::Bounds { min: 650.0, max: 650.0 })
        );
        let Some(FilterOptions::Counts(counts)) = model.filter_options(TYPE) else {
            panic!("deal type column should offer counts");
        };
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("Licensing"), Some(&1));
    }

    #[test]
    fn options_over_empty_view_are_zero() {
        let mut model = model();
        model.set_search("no such deal");
        assert_eq!(
            model.filter_options(VALUE),
            Some(&FilterOptions::Bounds { min: 0.0, max: 0.0 })
        );
        assert_eq!(
            model.filter_options(TYPE),
            Some(&FilterOptions::Counts(Default::default()))
        );
        assert_eq!(model.filter_options(DATE_FIELD), Some(&FilterOptions::None));
    }

    #[test]
    fn expansion_is_positional() {
        let mut model = model();
        model.update(Some(Message::MoveDown));
        model.update(Some(Message::Enter));
        assert!(model.view().is_expanded(1));
        assert!(!model.view().is_expanded(0));
        assert!(!model.view().is_expanded(2));

        let page = model.page();
        assert!(page.rows[1].expanded);
        assert_eq!(page.rows[1].detail[0], ("Completion date", "01/01/2021".to_string()));
        assert!(page.rows[0].detail.is_empty());

        // Refiltering keeps the positional entry, now pointing at another row.
        model.set_search("roche");
        assert!(model.view().is_expanded(1));
        assert_eq!(model.view().active_rows, vec![2]);

        model.set_search("");
        model.update(Some(Message::MoveDown));
        model.update(Some(Message::Enter));
        assert!(!model.view().is_expanded(1));
    }

    #[test]
    fn pagination_with_default_page_size() {
        let mut model = big_model(23, 10);
        assert_eq!(model.pages(), 3);
        assert_eq!(model.page().rows.len(), 10);

        model.update(Some(Message::NextPage));
        model.update(Some(Message::NextPage));
        model.update(Some(Message::NextPage));
        let page = model.page();
        assert_eq!(page.page, 2);
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.rows[0].position, 20);

        // Filtering down to a single page pulls the view back.
        model.set_search("Buyer 1");
        assert_eq!(model.pages(), 2);
        assert_eq!(model.page().page, 1);
        model.set_search("Buyer 7");
        assert_eq!(model.page().page, 0);
    }

    #[test]
    fn cursor_crosses_page_boundaries() {
        let mut model = big_model(12, 10);
        for _ in 0..10 {
            model.update(Some(Message::MoveDown));
        }
        assert_eq!(model.page().page, 1);
        assert_eq!(model.selected_row().map(|r| r.display(BUYER)), Some("Buyer 10".to_string()));
        model.update(Some(Message::MoveUp));
        assert_eq!(model.page().page, 0);
        assert_eq!(model.cursor_row(), 9);
    }

    #[test]
    fn sorting_reorders_display_only() {
        let mut model = model();
        model.sort_by(4, false);
        assert_eq!(
            buyers(&model),
            vec!["Bristol-Myers Squibb", "Roche", "Pfizer", "Novartis", "Novartis"]
        );
        assert_eq!(model.view().active_rows, vec![0, 1, 2, 3, 4]);

        model.sort_by(4, true);
        // The deal without a value goes last.
        assert_eq!(buyers(&model).last().map(String::as_str), Some("Novartis"));
        assert_eq!(buyers(&model).first().map(String::as_str), Some("Novartis"));
    }

    #[test]
    fn checkbox_panel_select_and_reset() {
        let mut model = model();
        model.update(Some(Message::MoveRight)); // Deal type
        model.update(Some(Message::Filter));
        assert!(model.filter_panel_open());

        // Counts are sorted: Acquisition, Investment, Licensing
        model.update(Some(Message::MoveDown));
        model.update(Some(Message::MoveDown));
        model.update(Some(Message::Select));
        assert_eq!(buyers(&model), vec!["Pfizer", "Novartis"]);

        model.update(Some(Message::Select));
        assert_eq!(model.view().active_rows, vec![0, 1, 2, 3, 4]);

        // Multi mode starts from everything checked and unchecks Licensing.
        model.update(Some(Message::ToggleMultiMode));
        model.update(Some(Message::Select));
        assert_eq!(model.view().active_rows, vec![0, 2, 4]);

        model.update(Some(Message::Exit));
        assert!(!model.filter_panel_open());
    }

    #[test]
    fn option_cursor_follows_shrinking_options() {
        let mut model = model();
        model.update(Some(Message::MoveRight));
        model.update(Some(Message::MoveRight)); // Buyer
        model.update(Some(Message::Filter));
        for _ in 0..4 {
            model.update(Some(Message::MoveDown));
        }
        model.update(Some(Message::Select));
        assert_eq!(buyers(&model), vec!["Bristol-Myers Squibb"]);

        // Checking 2018 leaves only Roche to choose from.
        model.update(Some(Message::ToggleYearSlot(0)));
        assert_eq!(
            model.filter_options(BUYER),
            Some(&FilterOptions::Choices(vec![Selection::All, Selection::Only(Value::from("Roche"))]))
        );
        assert_eq!(model.option_cursor(), 1);

        model.update(Some(Message::Select));
        assert_eq!(
            model.filter(BUYER),
            Some(&ColumnFilter::Equals(EqualsFilter::new(Selection::Only(Value::from("Roche")))))
        );
        assert_eq!(buyers(&model), vec!["Roche"]);
    }

    #[test]
    fn sorting_ignores_nan_cells() {
        let rows = (0..400)
            .map(|i| {
                let value = if i % 3 == 0 { Value::from("NaN") } else { Value::from((i * 7919 % 400) as i64) };
                deal("01/01/2020", "Licensing", &format!("Buyer {i}"), value)
            })
            .collect();
        let mut model = Model::init(&DVConfig::default(), Dataset::from_rows(rows));
        model.sort_by(4, true);

        let values: Vec<Option<f64>> = model
            .displayed_rows()
            .map(|r| r.get(VALUE).and_then(|v| v.as_number()))
            .collect();
        let numbers: Vec<f64> = values.iter().map_while(|v| *v).collect();
        assert_eq!(numbers.len(), 266);
        assert!(numbers.windows(2).all(|w| w[0] <= w[1]), "not sorted: {numbers:?}");
        assert!(values[266..].iter().all(Option::is_none));
    }

    #[test]
    fn equals_panel_selects_choice() {
        let mut model = model();
        model.update(Some(Message::MoveRight));
        model.update(Some(Message::MoveRight)); // Buyer
        model.update(Some(Message::Filter));
        model.update(Some(Message::MoveDown));
        model.update(Some(Message::Enter));
        assert_eq!(buyers(&model), vec!["Novartis", "Novartis"]);

        model.update(Some(Message::MoveUp));
        model.update(Some(Message::Select));
        assert_eq!(model.view().active_rows.len(), 5);
    }

    #[test]
    fn threshold_slider_steps_through_bounds() {
        let mut columns = default_columns();
        columns[4].kind = FilterKind::Threshold;
        let mut model = Model::init(&DVConfig::default().columns(columns), dataset());
        for _ in 0..4 {
            model.update(Some(Message::MoveRight));
        }
        model.update(Some(Message::Filter));
        model.update(Some(Message::Increase));
        assert_eq!(buyers(&model), vec!["Novartis"]);
        assert_eq!(
            model.filter(VALUE),
            Some(&ColumnFilter::Threshold(ThresholdFilter::new(Some(250.0))))
        );

        model.update(Some(Message::Increase));
        assert!(model.view().active_rows.is_empty());

        model.update(Some(Message::Off));
        assert_eq!(model.view().active_rows.len(), 5);
    }

    #[test]
    fn range_bounds_are_typed_in() {
        let mut model = model();
        for _ in 0..4 {
            model.update(Some(Message::MoveRight));
        }
        model.update(Some(Message::Filter));
        model.update(Some(Message::EditLowerBound));
        assert!(model.raw_keyevents());
        for c in "1000".chars() {
            model.update(key(KeyCode::Char(c)));
        }
        model.update(key(KeyCode::Enter));
        assert!(model.filter_panel_open());
        assert_eq!(buyers(&model), vec!["Roche", "Bristol-Myers Squibb"]);

        model.update(Some(Message::EditUpperBound));
        for c in "5000".chars() {
            model.update(key(KeyCode::Char(c)));
        }
        model.update(key(KeyCode::Enter));
        assert_eq!(buyers(&model), vec!["Roche"]);
        assert_eq!(model.filter(VALUE).map(|f| f.describe()), Some("1000..5000".to_string()));
    }

    #[test]
    fn search_box_filters_while_typing_and_restores_on_escape() {
        let mut model = model();
        model.update(Some(Message::Search));
        assert!(model.raw_keyevents());
        model.update(key(KeyCode::Char('r')));
        model.update(key(KeyCode::Char('o')));
        assert_eq!(buyers(&model), vec!["Roche"]);
        assert_eq!(model.input().map(|(t, i)| (t, i.input.clone())), Some((EditTarget::Search, "ro".to_string())));

        model.update(key(KeyCode::Esc));
        assert!(!model.raw_keyevents());
        assert!(model.input().is_none());
        assert_eq!(model.view().active_rows.len(), 5);
    }

    #[test]
    fn year_slots_follow_year_options() {
        let mut model = model();
        model.update(Some(Message::ToggleYearSlot(0))); // 2018
        assert_eq!(buyers(&model), vec!["Roche"]);
        model.update(Some(Message::ToggleYearSlot(9)));
        assert_eq!(buyers(&model), vec!["Roche"]);
    }

    #[test]
    fn column_without_filter_does_not_open_panel() {
        let mut columns = default_columns();
        columns[0].kind = FilterKind::None;
        let mut model = Model::init(&DVConfig::default().columns(columns), dataset());
        model.update(Some(Message::Filter));
        assert!(!model.filter_panel_open());
        assert!(model.status_message().contains("has no filter"));
    }

    #[test]
    fn unknown_columns_are_harmless() {
        let mut model = model();
        model.set_filter("Nope", ColumnFilter::Contains(ContainsFilter::new("x")));
        assert_eq!(model.view().active_rows.len(), 5);

        let columns = vec![ColumnSpec::new("Missing", FilterKind::Contains)];
        let mut model = Model::init(&DVConfig::default().columns(columns), dataset());
        assert_eq!(model.page().rows[0].cells, vec![String::new()]);
        model.set_filter("Missing", ColumnFilter::Contains(ContainsFilter::new("x")));
        assert!(model.view().active_rows.is_empty());
    }

    #[test]
    fn help_popup_toggles() {
        let mut model = model();
        model.update(Some(Message::Help));
        assert!(model.show_help());
        model.update(Some(Message::Exit));
        assert!(!model.show_help());
        model.update(Some(Message::Quit));
        assert_eq!(model.status, Status::QUITTING);
    }

    proptest! {
        #[test]
        fn clearing_a_range_restores_order(
            values in prop::collection::vec(-1000i64..1000, 0..40),
            lo in proptest::option::of(-1000.0f64..1000.0),
            hi in proptest::option::of(-1000.0f64..1000.0),
        ) {
            let rows = values
                .iter()
                .map(|v| deal("01/01/2020", "Licensing", "Buyer", Value::from(*v)))
                .collect::<Vec<_>>();
            let len = rows.len();
            let mut model = Model::init(&DVConfig::default(), Dataset::from_rows(rows));

            model.set_filter(VALUE, ColumnFilter::Between(RangeFilter::new(lo, hi)));
            let kept = &model.view().active_rows;
            prop_assert!(kept.windows(2).all(|w| w[0] < w[1]));
            for &idx in kept {
                let v = values[idx] as f64;
                prop_assert!(lo.is_none_or(|lo| v >= lo) && hi.is_none_or(|hi| v <= hi));
            }

            model.clear_filter(VALUE);
            prop_assert_eq!(&model.view().active_rows, &(0..len).collect::<Vec<_>>());
        }
    }
}
