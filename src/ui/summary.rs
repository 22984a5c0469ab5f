//! Main table: one row per data point.

use std::cmp::Ordering;

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};
use swissknife_types::now_ms;

use crate::app::App;
use crate::data::duration::format_age;
use crate::data::PointRow;

/// Column to sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    /// Fixed feeds first, then bus stops by code.
    #[default]
    Catalog,
    Name,
    /// Time of the last successful fetch.
    Updated,
    Status,
}

impl SortColumn {
    pub fn next(self) -> Self {
        match self {
            SortColumn::Catalog => SortColumn::Name,
            SortColumn::Name => SortColumn::Updated,
            SortColumn::Updated => SortColumn::Status,
            SortColumn::Status => SortColumn::Catalog,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortColumn::Catalog => "default",
            SortColumn::Name => "name",
            SortColumn::Updated => "updated",
            SortColumn::Status => "status",
        }
    }
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let Some(ref data) = app.data else {
        return;
    };
    let total = data.rows.len();
    let rows = app.visible_rows();
    let now = now_ms();

    let header = Row::new(vec![
        Cell::from(format_header("Name", SortColumn::Name, app)),
        Cell::from("State"),
        Cell::from(format_header("Updated", SortColumn::Updated, app)),
        Cell::from("Latency"),
        Cell::from(format_header("Status", SortColumn::Status, app)),
    ])
    .height(1)
    .style(app.theme.header);

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            let age = row
                .last_success_ms
                .map(|ms| format_age(ms, now))
                .unwrap_or_else(|| "never".to_string());

            Row::new(vec![
                Cell::from(row.presentation.name.clone()),
                Cell::from(row.display_value()),
                Cell::from(age).style(app.theme.muted_style()),
                Cell::from(format!("{}ms", row.elapsed.as_millis())).style(app.theme.muted_style()),
                Cell::from(row.status.symbol()).style(app.theme.status_style(row.status)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(3),
        Constraint::Fill(3),
        Constraint::Fill(1),
        Constraint::Min(8),
        Constraint::Min(6),
    ];

    let selected = app.selected_index.min(rows.len().saturating_sub(1));
    let sort_dir = if app.sort_ascending { "↑" } else { "↓" };

    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };

    let position_info = if !rows.is_empty() {
        format!(" [{}/{}]", selected + 1, rows.len())
    } else {
        String::new()
    };

    let title = format!(
        " Data points ({}/{}) [s:sort {}{}]{}{} ",
        rows.len(),
        total,
        app.sort_column.label(),
        sort_dir,
        filter_info,
        position_info
    );

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}

fn format_header(name: &str, col: SortColumn, app: &App) -> Span<'static> {
    if app.sort_column == col {
        let arrow = if app.sort_ascending { "↑" } else { "↓" };
        Span::raw(format!("{}{}", name, arrow))
    } else {
        Span::raw(name.to_string())
    }
}

/// Sort rows by the given column and direction.
pub fn sort_rows_by(rows: &mut [&PointRow], column: SortColumn, ascending: bool) {
    rows.sort_by(|a, b| {
        let primary = match column {
            SortColumn::Catalog => a.presentation.rank().cmp(&b.presentation.rank()),
            SortColumn::Name => a.presentation.name.cmp(&b.presentation.name),
            SortColumn::Updated => a.last_success_ms.cmp(&b.last_success_ms),
            SortColumn::Status => a.status.cmp(&b.status),
        };
        let primary = if ascending { primary } else { primary.reverse() };

        // Stable tie-break so equal rows don't jump between frames
        if primary == Ordering::Equal {
            a.presentation.rank().cmp(&b.presentation.rank())
        } else {
            primary
        }
    });
}
