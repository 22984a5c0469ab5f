//! # chile-swissknife
//!
//! A terminal dashboard for Chilean public data feeds: USD and UF exchange
//! rates, Metro de Santiago network status, bus arrivals per stop and the
//! latest earthquake.
//!
//! Polling is done by a [`swissknife_sdk::Coordinator`]; this crate hosts
//! it, loads settings and renders its snapshots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐  │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│  │
//! │  │ (state) │    │ (rows)   │    │(render) │    │         │  │
//! │  └────┬────┘    └──────────┘    └─────────┘    └─────────┘  │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  ┌─────────┐                                                │
//! │  │ source  │◀── CoordinatorSource | FileSource              │
//! │  └─────────┘                                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, selection, filtering and sorting
//! - **[`source`]**: The [`DataSource`] trait and its implementations
//! - **[`data`]**: Turns snapshots into display rows ([`Dashboard`])
//! - **[`catalog`]**: Names, icons, units and stable ids per data point
//! - **[`config`]**: Layered [`Settings`]
//! - **[`ui`]**: Rendering with ratatui
//!
//! ## Usage
//!
//! ```bash
//! # Live dashboard with two bus stops, refreshing every 15 seconds
//! chile-swissknife --bus-stops PA433,PC1050 --interval 15
//!
//! # One refresh, snapshot JSON on stdout
//! chile-swissknife --once
//!
//! # Share one poller between terminals
//! chile-swissknife --snapshot-out /tmp/swissknife.json
//! chile-swissknife --file /tmp/swissknife.json
//! ```
//!
//! ### As a library
//!
//! ```
//! use chile_swissknife::{App, FileSource};
//!
//! let source = Box::new(FileSource::new("snapshot.json"));
//! let app = App::new(source);
//! ```

pub mod app;
pub mod catalog;
pub mod config;
pub mod data;
pub mod events;
pub mod logging;
pub mod source;
pub mod ui;

pub use app::App;
pub use catalog::{presentation, Presentation};
pub use config::Settings;
pub use data::{Dashboard, PointRow, PointStatus};
pub use source::{CoordinatorSource, DataSource, FileSource};
