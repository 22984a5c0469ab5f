//! Application state and navigation logic.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use tracing::{debug, warn};

use crate::data::{Dashboard, PointRow};
use crate::source::DataSource;
use crate::ui::summary::{sort_rows_by, SortColumn};
use crate::ui::Theme;

/// How long a status message stays in the status bar.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    source: Box<dyn DataSource>,
    pub data: Option<Dashboard>,
    pub load_error: Option<String>,

    /// Visual index into [`App::visible_rows`].
    pub selected_index: usize,

    pub sort_column: SortColumn,
    pub sort_ascending: bool,

    pub filter_text: String,
    pub filter_active: bool,

    pub theme: Theme,

    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(source: Box<dyn DataSource>) -> Self {
        Self::with_theme(source, Theme::auto_detect())
    }

    pub fn with_theme(source: Box<dyn DataSource>, theme: Theme) -> Self {
        Self {
            running: true,
            show_help: false,
            show_detail_overlay: false,
            source,
            data: None,
            load_error: None,
            selected_index: 0,
            sort_column: SortColumn::default(),
            sort_ascending: true,
            filter_text: String::new(),
            filter_active: false,
            theme,
            status_message: None,
        }
    }

    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// The current status message, if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Poll the data source for a new snapshot.
    ///
    /// Returns true when the dashboard was rebuilt.
    pub fn reload_data(&mut self) -> bool {
        let Some(snapshot) = self.source.poll() else {
            if let Some(err) = self.source.error() {
                if self.load_error.as_deref() != Some(err) {
                    warn!(error = err, "data source error");
                }
                self.load_error = Some(err.to_string());
            }
            return false;
        };

        debug!(tick = snapshot.tick, entries = snapshot.len(), "new snapshot");
        let dashboard = Dashboard::from_snapshot(&snapshot, self.data.as_ref());
        self.data = Some(dashboard);
        self.load_error = None;
        self.clamp_selection();
        true
    }

    /// Ask the source for an immediate refresh.
    pub fn request_refresh(&mut self) {
        if self.source.request_refresh() {
            self.set_status_message("Refresh requested".to_string());
        } else {
            self.set_status_message("Refresh not available for this source".to_string());
        }
    }

    /// Rows after filtering and sorting, in display order.
    pub fn visible_rows(&self) -> Vec<&PointRow> {
        let Some(ref data) = self.data else {
            return Vec::new();
        };
        let mut rows: Vec<&PointRow> = data
            .rows
            .iter()
            .filter(|r| self.matches_filter(&r.presentation.name))
            .collect();
        sort_rows_by(&mut rows, self.sort_column, self.sort_ascending);
        rows
    }

    pub fn selected_row(&self) -> Option<&PointRow> {
        self.visible_rows().get(self.selected_index).copied()
    }

    fn clamp_selection(&mut self) {
        let count = self.visible_rows().len();
        if self.selected_index >= count {
            self.selected_index = count.saturating_sub(1);
        }
    }

    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    pub fn select_next_n(&mut self, n: usize) {
        let max = self.visible_rows().len().saturating_sub(1);
        self.selected_index = (self.selected_index + n).min(max);
    }

    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_index = self.selected_index.saturating_sub(n);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.visible_rows().len().saturating_sub(1);
    }

    pub fn enter_detail(&mut self) {
        if self.selected_row().is_some() {
            self.show_detail_overlay = true;
        }
    }

    /// Close the overlay if one is open, otherwise clear the filter.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
        } else if !self.filter_text.is_empty() {
            self.clear_filter();
        }
    }

    pub fn close_overlay(&mut self) {
        self.show_detail_overlay = false;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn cycle_sort(&mut self) {
        self.sort_column = self.sort_column.next();
    }

    pub fn toggle_sort_direction(&mut self) {
        self.sort_ascending = !self.sort_ascending;
    }

    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Exit filter input mode, keeping the filter text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
    }

    pub fn filter_push(&mut self, c: char) {
        self.filter_text.push(c);
        self.selected_index = 0;
    }

    pub fn filter_pop(&mut self) {
        self.filter_text.pop();
        self.clamp_selection();
    }

    /// Case-insensitive substring match on the display name.
    pub fn matches_filter(&self, name: &str) -> bool {
        if self.filter_text.is_empty() {
            return true;
        }
        name.to_lowercase().contains(&self.filter_text.to_lowercase())
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Write the current dashboard as JSON.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let Some(ref data) = self.data else {
            bail!("No data to export");
        };
        std::fs::write(path, data.export_json()?)?;
        Ok(())
    }
}
