//! Detail overlay for the selected data point.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};
use swissknife_types::now_ms;

use crate::app::App;
use crate::data::duration::{format_age, format_duration};
use crate::data::PointStatus;

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 14;

/// Render the selected point as a modal: value, freshness, last error and
/// every attribute the upstream returned.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }
    let Some(row) = app.selected_row() else {
        return;
    };

    let overlay_width = (area.width * 95 / 100).clamp(MIN_OVERLAY_WIDTH, 100);
    let overlay_height = (area.height * 90 / 100).clamp(MIN_OVERLAY_HEIGHT, 40);
    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([
        Constraint::Length(8),
        Constraint::Min(4),
        Constraint::Length(1),
    ])
    .split(overlay_area);

    // ===== HEADER =====
    let status_label = match row.status {
        PointStatus::Live => "Live",
        PointStatus::Stale => "Stale",
        PointStatus::Failing => "Failing",
    };
    let now = now_ms();
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let header_lines = vec![
        Line::from(vec![
            Span::styled(format!(" {} ", row.presentation.name), bold),
            Span::styled(
                format!("{}  {}", row.presentation.unique_id, row.presentation.icon),
                app.theme.muted_style(),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::raw(" Value: "),
            Span::styled(row.display_value(), bold),
            Span::raw("    Status: "),
            Span::styled(
                format!("{} {}", row.status.symbol(), status_label),
                app.theme.status_style(row.status).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw(" Last success: "),
            Span::raw(
                row.last_success_ms
                    .map(|ms| format_age(ms, now))
                    .unwrap_or_else(|| "never".to_string()),
            ),
            Span::raw("    Attempted: "),
            Span::raw(format_age(row.updated_ms, now)),
            Span::raw("    Latency: "),
            Span::raw(format_duration(row.elapsed)),
        ]),
        Line::from(vec![
            Span::raw(" Last error: "),
            match row.error {
                Some(ref e) => Span::styled(e.clone(), app.theme.status_style(PointStatus::Failing)),
                None => Span::styled("none", app.theme.muted_style()),
            },
        ]),
    ];

    let header_block = Block::default()
        .title(" Data Point ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    frame.render_widget(Paragraph::new(header_lines).block(header_block), chunks[0]);

    // ===== ATTRIBUTES =====
    let attr_block = Block::default()
        .title(format!(" Attributes ({}) ", row.attributes.len()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if row.attributes.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No attributes",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(attr_block);
        frame.render_widget(empty, chunks[1]);
    } else {
        let header = Row::new(vec![Cell::from("Key"), Cell::from("Value")])
            .height(1)
            .style(app.theme.header);

        let rows: Vec<Row> = row
            .attributes
            .iter()
            .map(|(key, value)| {
                Row::new(vec![Cell::from(key.clone()), Cell::from(attribute_text(value))])
            })
            .collect();

        let table = Table::new(rows, [Constraint::Fill(1), Constraint::Fill(3)])
            .header(header)
            .block(attr_block);
        frame.render_widget(table, chunks[1]);
    }

    // ===== FOOTER =====
    let footer = Paragraph::new(Line::from(vec![Span::styled(
        " Press Esc to close ",
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[2]);
}

// Strings without their JSON quotes; everything else as compact JSON
fn attribute_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
