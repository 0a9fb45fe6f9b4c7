use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Gauge, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
};

use crate::detail::DETAIL_FIELDS;
use crate::domain::{DVConfig, EditTarget, HELP_TEXT};
use crate::dataset::Value;
use crate::filter::{ColumnFilter, FilterOptions};
use crate::model::{Model, PageView};

pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const FILTER_PANEL_WIDTH: u16 = 36;
pub const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(8);

pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(cfg: &DVConfig) -> Self {
        Self {
            max_column_width: cfg.max_column_width,
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let page = model.page();
        let expanded: Vec<_> = page.rows.iter().filter(|r| r.expanded).collect();
        let detail_height = if expanded.is_empty() {
            0
        } else {
            (expanded.len() * (DETAIL_FIELDS.len() + 1) + 1).min(18) as u16
        };

        let [top_area, main_area, detail_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(detail_height),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_search_bar(model, frame, top_area);

        if model.filter_panel_open() {
            let [table_area, filter_area] = Layout::horizontal([
                Constraint::Min(20),
                Constraint::Length(FILTER_PANEL_WIDTH),
            ])
            .areas(main_area);
            self.draw_table(model, &page, frame, table_area);
            self.draw_filter_panel(model, frame, filter_area);
        } else {
            self.draw_table(model, &page, frame, main_area);
        }

        if detail_height > 0 {
            let lines: Vec<Line> = expanded
                .iter()
                .flat_map(|row| {
                    let mut lines = vec![
                        Line::from(format!("#{} {}", row.position + 1, row.cells.join(" · "))).bold(),
                    ];
                    lines.extend(row.detail.iter().map(|(label, value)| {
                        Line::from(vec![
                            Span::styled(format!("  {label:<28}"), Style::new().dim()),
                            Span::raw(value.clone()),
                        ])
                    }));
                    lines
                })
                .collect();
            frame.render_widget(
                Paragraph::new(lines).block(Block::bordered().title(" Details ")),
                detail_area,
            );
        }

        self.draw_status_line(model, &page, frame, status_area);

        if model.show_help() {
            let area = popup_area(frame.area(), 60, 80);
            frame.render_widget(Clear, area);
            frame.render_widget(
                Paragraph::new(HELP_TEXT)
                    .wrap(Wrap { trim: false })
                    .block(Block::bordered().title(" Help ".bold())),
                area,
            );
        }
    }

    fn draw_search_bar(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let editing = matches!(model.input(), Some((EditTarget::Search, _)));
        let search = &model.view().search_text;

        let mut spans = vec![
            Span::styled(" Search: ", Style::new().bold()),
            if editing {
                Span::styled(format!("{search} "), Style::new().reversed())
            } else if search.is_empty() {
                Span::styled("(press /)", Style::new().dim())
            } else {
                Span::raw(search.clone())
            },
            Span::raw("   Years: "),
        ];
        for (slot, year) in model.years().iter().enumerate() {
            let checked = model.view().years.contains(year);
            let mark = if checked { "[x]" } else { "[ ]" };
            let style = if checked { Style::new().yellow() } else { Style::new() };
            spans.push(Span::styled(format!("{mark} {year}"), style));
            if slot < 9 {
                spans.push(Span::styled(format!("({}) ", slot + 1), Style::new().dim()));
            }
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);

        if let Some((EditTarget::Search, input)) = model.input() {
            let x = area.x + 9 + input.cursor_pos as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
        }
    }

    fn draw_table(&self, model: &Model, page: &PageView, frame: &mut Frame, area: Rect) {
        let widths: Vec<Constraint> = page
            .headers
            .iter()
            .enumerate()
            .map(|(cidx, header)| {
                let content = page
                    .rows
                    .iter()
                    .map(|r| r.cells[cidx].chars().count())
                    .max()
                    .unwrap_or(0);
                let width = content.max(header.chars().count() + 2) + COLUMN_WIDTH_MARGIN;
                Constraint::Length(width.min(self.max_column_width) as u16)
            })
            .collect();

        let sort = model.sort();
        let header = Row::new(page.headers.iter().enumerate().map(|(cidx, name)| {
            let marker = match sort {
                Some((c, true)) if c == cidx => "▲",
                Some((c, false)) if c == cidx => "▼",
                _ => "",
            };
            let filtered = model
                .filter(&model.columns()[cidx].id)
                .is_some_and(|f| f.is_active());
            let text = format!("{}{}{}", if filtered { "⚑" } else { "" }, name, marker);
            Cell::from(text)
        }))
        .style(Style::new().bold().underlined());

        let rows: Vec<Row> = page
            .rows
            .iter()
            .map(|r| {
                let row = Row::new(r.cells.clone());
                if r.expanded { row.style(Style::new().italic()) } else { row }
            })
            .collect();

        let title = format!(" {} ", page.name);
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::bordered().title(Line::from(title).bold()))
            .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED))
            .column_highlight_style(Style::new().yellow());

        let mut state = TableState::default();
        if !page.rows.is_empty() {
            state.select(Some(model.cursor_row()));
        }
        state.select_column(Some(model.selected_column()));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_filter_panel(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let Some(spec) = model.columns().get(model.selected_column()) else {
            return;
        };
        let block = Block::bordered().title(Line::from(format!(" Filter: {} ", spec.header)).bold());
        let (Some(filter), Some(options)) = (model.filter(&spec.id), model.filter_options(&spec.id)) else {
            return;
        };
        let editing = model.input();

        match (filter, options) {
            (ColumnFilter::Equals(f), FilterOptions::Choices(choices)) => {
                let items: Vec<ListItem> = choices
                    .iter()
                    .map(|choice| {
                        let mark = if *choice == f.selected { "(•) " } else { "( ) " };
                        ListItem::new(format!("{mark}{choice}"))
                    })
                    .collect();
                self.draw_option_list(items, model.option_cursor(), block, frame, area);
            }
            (ColumnFilter::Checkbox(f), FilterOptions::Counts(counts)) => {
                let items: Vec<ListItem> = counts
                    .iter()
                    .map(|(value, count)| {
                        let mark = if f.is_checked(value) { "[x] " } else { "[ ] " };
                        ListItem::new(format!("{mark}{value} ({count})"))
                    })
                    .collect();
                let mode = if f.multi { " multi " } else { " single " };
                self.draw_option_list(
                    items,
                    model.option_cursor(),
                    block.title_bottom(mode),
                    frame,
                    area,
                );
            }
            (ColumnFilter::Between(f), FilterOptions::Bounds { min, max }) => {
                let field = |target: EditTarget, bound: Option<f64>, placeholder: String| {
                    match editing {
                        Some((t, input)) if t == target => {
                            Span::styled(format!("{} ", input.input), Style::new().reversed())
                        }
                        _ => match bound {
                            Some(b) => Span::raw(fmt_number(b)),
                            None => Span::styled(placeholder, Style::new().dim()),
                        },
                    }
                };
                let text = Text::from(vec![
                    Line::from(vec![
                        Span::raw("[ from "),
                        field(EditTarget::LowerBound, f.min, format!("Min ({})", fmt_number(*min))),
                    ]),
                    Line::from(vec![
                        Span::raw("] to   "),
                        field(EditTarget::UpperBound, f.max, format!("Max ({})", fmt_number(*max))),
                    ]),
                ]);
                frame.render_widget(Paragraph::new(text).block(block), area);
            }
            (ColumnFilter::Threshold(f), FilterOptions::Bounds { min, max }) => {
                let ratio = match f.value {
                    Some(v) if max > min => ((v - min) / (max - min)).clamp(0.0, 1.0),
                    _ => 0.0,
                };
                let label = match f.value {
                    Some(v) => format!("{} [{}..{}]", fmt_number(v), fmt_number(*min), fmt_number(*max)),
                    None => format!("Off [{}..{}]", fmt_number(*min), fmt_number(*max)),
                };
                let [gauge_area, _] =
                    Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);
                frame.render_widget(
                    Gauge::default()
                        .block(block.title_bottom(" +/- move, o off "))
                        .ratio(ratio)
                        .label(label),
                    gauge_area,
                );
            }
            (ColumnFilter::Contains(f), _) => {
                let content = match editing {
                    Some((EditTarget::Text, input)) => {
                        Span::styled(format!("{} ", input.input), Style::new().reversed())
                    }
                    _ if f.needle.is_empty() => Span::styled("(Enter to edit)", Style::new().dim()),
                    _ => Span::raw(f.needle.clone()),
                };
                frame.render_widget(Paragraph::new(Line::from(content)).block(block), area);
            }
            _ => frame.render_widget(Paragraph::new("No filter").block(block), area),
        }
    }

    fn draw_option_list(
        &self,
        items: Vec<ListItem>,
        cursor: usize,
        block: Block,
        frame: &mut Frame,
        area: Rect,
    ) {
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::new().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default().with_selected(Some(cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_status_line(&self, model: &Model, page: &PageView, frame: &mut Frame, area: Rect) {
        let active: Vec<String> = model
            .columns()
            .iter()
            .filter_map(|spec| {
                let filter = model.filter(&spec.id)?;
                filter
                    .is_active()
                    .then(|| format!("{}: {}", spec.header, filter.describe()))
            })
            .collect();

        let mut spans = vec![
            Span::styled(
                format!(" Page {}/{} ", page.page + 1, page.pages),
                Style::new().reversed(),
            ),
            Span::raw(format!(" {} of {} rows ", page.filtered, page.total)),
        ];
        if !active.is_empty() {
            spans.push(Span::styled(active.join(" | "), Style::new().yellow()));
        }
        if model.status_message_age() < STATUS_MESSAGE_TIMEOUT {
            spans.push(Span::styled(format!("  {}", model.status_message()), Style::new().dim()));
        }
        spans.push(Span::styled("  ? help", Style::new().dim()));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

fn fmt_number(n: f64) -> String {
    Value::Number(n).to_string()
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}
