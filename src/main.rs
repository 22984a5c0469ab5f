use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chile_swissknife::config::{Overrides, Settings};
use chile_swissknife::{events, logging, ui, App, CoordinatorSource, DataSource, FileSource};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use swissknife_sdk::{Coordinator, Output};
use swissknife_sources::{default_fetchers, HttpClient};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "chile-swissknife")]
#[command(about = "Terminal dashboard for Chilean public data: exchange rates, Metro, buses and earthquakes")]
struct Args {
    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bus stop codes, comma-separated (e.g. "PA433,PC1050")
    #[arg(short, long)]
    bus_stops: Option<String>,

    /// Seconds between refreshes, clamped to 1..=60
    #[arg(short, long)]
    interval: Option<i64>,

    /// Per-source fetch timeout in seconds
    #[arg(long)]
    fetch_timeout: Option<u64>,

    /// What a failing source shows: "retain_last_good" or "overwrite"
    #[arg(long)]
    failure_policy: Option<String>,

    /// Watch a snapshot file written by another instance instead of polling
    #[arg(short, long, conflicts_with_all = ["once", "snapshot_out"])]
    file: Option<PathBuf>,

    /// Also rewrite the snapshot to this file after every refresh
    #[arg(long)]
    snapshot_out: Option<PathBuf>,

    /// Refresh once, print the snapshot as JSON and exit
    #[arg(long)]
    once: bool,

    /// With --once, write the snapshot here instead of stdout
    #[arg(short, long, requires = "once")]
    export: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            bus_stops: self.bus_stops.clone(),
            update_interval: self.interval,
            fetch_timeout_secs: self.fetch_timeout,
            failure_policy: self.failure_policy.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(ref path) = args.file {
        let _guard = logging::init_file_logging(&logging::default_log_dir(), logging::DEFAULT_LOG_FILE)
            .context("Failed to set up logging")?;
        info!(path = %path.display(), "watching snapshot file");
        return run_tui(Box::new(FileSource::new(path)), Duration::from_millis(500));
    }

    let settings = Settings::load(args.config.as_deref(), &args.overrides())?;

    if args.once {
        let _guard = logging::init_stderr_logging();
        return run_once(&settings, args.export.as_deref());
    }

    let _guard = logging::init_file_logging(&logging::default_log_dir(), logging::DEFAULT_LOG_FILE)
        .context("Failed to set up logging")?;
    run_live(&settings, args.snapshot_out)
}

fn build_coordinator(settings: &Settings, extra: Vec<Output>) -> Result<Coordinator> {
    let client = HttpClient::builder()
        .timeout(settings.fetch_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let mut builder = Coordinator::builder()
        .fetchers(default_fetchers(&client, &settings.unique_stops()))
        .interval(settings.interval())
        .fetch_timeout(settings.fetch_timeout())
        .failure_policy(settings.failure_policy);
    for output in extra {
        builder = builder.output(output);
    }

    Ok(builder.build()?)
}

/// Run a single refresh and emit the snapshot.
fn run_once(settings: &Settings, export: Option<&Path>) -> Result<()> {
    let coordinator = build_coordinator(settings, Vec::new())?;

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(coordinator.refresh_now())?;
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "refresh complete"
    );

    let json = serde_json::to_string_pretty(&*report.snapshot)?;
    match export {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported snapshot to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Drive a coordinator in the background and show its snapshots.
fn run_live(settings: &Settings, snapshot_out: Option<PathBuf>) -> Result<()> {
    let (channel, receiver) = Output::channel();
    let mut outputs = vec![channel];
    outputs.extend(snapshot_out.map(Output::file));
    let coordinator = build_coordinator(settings, outputs)?;

    info!(
        sources = coordinator.sources().count(),
        interval_secs = settings.update_interval,
        policy = ?settings.failure_policy,
        "starting coordinator"
    );

    // Ticks run on the runtime's workers; the TUI keeps the main thread
    let rt = tokio::runtime::Runtime::new()?;
    let handle = {
        let _enter = rt.enter();
        coordinator.start()
    };

    let source = CoordinatorSource::new(coordinator, receiver);
    let result = run_tui(Box::new(source), Duration::from_millis(100));

    rt.block_on(handle.stop());
    result
}

/// Run the TUI with the given data source
fn run_tui(source: Box<dyn DataSource>, refresh_interval: Duration) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Restore the terminal before printing a panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let mut app = App::new(source);
    app.reload_data();

    let result = run_app(&mut terminal, &mut app, refresh_interval);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh_interval: Duration,
) -> Result<()> {
    let mut last_refresh = Instant::now();

    while app.running {
        terminal.draw(|frame| ui::draw(frame, app))?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse, ui::CONTENT_START_ROW),
                _ => {}
            }
        }

        if last_refresh.elapsed() >= refresh_interval {
            app.reload_data();
            last_refresh = Instant::now();
        }
    }

    Ok(())
}
