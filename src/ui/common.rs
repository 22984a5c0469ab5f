//! Header bar, status bar and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::PointStatus;

/// Render the header: overall status, counts by status, tick number.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref data) = app.data else {
        let line = Line::from(vec![
            Span::styled(" CHILE SWISSKNIFE ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Waiting for first refresh..."),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let counts = data.counts();

    let overall = if counts.failing > 0 {
        PointStatus::Failing
    } else if counts.stale > 0 {
        PointStatus::Stale
    } else {
        PointStatus::Live
    };

    let dim_zero = |n: usize, status: PointStatus| {
        if n > 0 {
            Span::styled(n.to_string(), app.theme.status_style(status))
        } else {
            Span::styled("0", Style::default().add_modifier(Modifier::DIM))
        }
    };

    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.status_style(overall)),
        Span::styled("CHILE SWISSKNIFE ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(counts.live.to_string(), Style::default().fg(app.theme.live)),
        Span::raw(" live "),
        dim_zero(counts.stale, PointStatus::Stale),
        Span::raw(" stale "),
        dim_zero(counts.failing, PointStatus::Failing),
        Span::raw(" failing │ "),
        Span::styled(format!("tick {}", data.tick), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" │ "),
        Span::styled(app.source_description().to_string(), app.theme.muted_style()),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar: age of the data, errors, available keys.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let status = if let Some(ref data) = app.data {
        let controls = if app.filter_active {
            "Type to search | Enter:apply Esc:cancel"
        } else {
            "/:search s:sort r:refresh Enter:detail ?:help q:quit"
        };
        let error = app
            .load_error
            .as_ref()
            .map(|e| format!(" | Error: {}", e))
            .unwrap_or_default();

        format!(
            " Received {:.1}s ago{} | {}",
            data.last_updated.elapsed().as_secs_f64(),
            error,
            controls,
        )
    } else if let Some(ref err) = app.load_error {
        format!(" Error: {} | q:quit r:retry", err)
    } else {
        " Loading... | q:quit".to_string()
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Centered help modal listing the key bindings.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(title, Style::default().add_modifier(Modifier::BOLD))])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  Enter       Show detail"),
        Line::from("  Esc         Close detail / clear filter"),
        Line::from(""),
        section(" Table"),
        Line::from("  /         Start filter/search"),
        Line::from("  c         Clear filter"),
        Line::from("  s         Cycle sort column"),
        Line::from("  S         Toggle sort direction"),
        Line::from(""),
        section(" General"),
        Line::from("  r         Refresh now"),
        Line::from("  e         Export to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 44u16.min(area.width.saturating_sub(4));
    let help_height = 23u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
