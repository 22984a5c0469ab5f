//! Colors and styles, with light/dark detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::PointStatus;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] to pick from the terminal background, or
/// [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for titles and active elements.
    pub highlight: Color,
    pub live: Color,
    pub stale: Color,
    pub failing: Color,
    /// Secondary text such as ages and latencies.
    pub muted: Color,
    pub border: Color,
    pub header: Style,
    pub selected: Style,
    pub border_type: BorderType,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            live: Color::Green,
            stale: Color::Yellow,
            failing: Color::Red,
            muted: Color::Gray,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            live: Color::Green,
            stale: Color::Yellow,
            failing: Color::Red,
            muted: Color::DarkGray,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn status_style(&self, status: PointStatus) -> Style {
        match status {
            PointStatus::Live => Style::default().fg(self.live),
            PointStatus::Stale => Style::default().fg(self.stale),
            PointStatus::Failing => Style::default().fg(self.failing).add_modifier(Modifier::BOLD),
        }
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }
}
