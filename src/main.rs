mod config;
mod headless;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use agentscope_feed::{
    FixtureProvider, StaticFixtures, SyntheticTransport, Transport, WebSocketTransport,
};
use agentscope_logs::{LogStreamConsumer, Update, export_filename, write_export};
use agentscope_tui::{
    Action, AppState, Event, EventHandler, HelpOverlay, KeyBindings, KeyContext, LogViewerScreen,
    Tui,
};

use config::{AppConfig, Overrides, SourceKind};

/// Rows moved by PageUp/PageDown
const PAGE: usize = 20;

/// agentscope - A terminal monitor for live multi-agent log streams
#[derive(Parser, Debug)]
#[command(name = "agentscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log source
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// WebSocket endpoint for the live feed
    #[arg(long, env = "AGENTSCOPE_WS_URL")]
    url: Option<String>,

    /// Maximum number of retained log entries
    #[arg(long)]
    capacity: Option<usize>,

    /// Number of fixtures preloaded in synthetic mode
    #[arg(long)]
    seed: Option<usize>,

    /// Delay between synthetic entries, in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// JSON file with fixture log entries
    #[arg(long, value_name = "PATH")]
    fixtures: Option<PathBuf>,

    /// Automatic reconnection attempts after a transport error
    #[arg(long)]
    max_retries: Option<u32>,

    /// Print entries to stdout instead of starting the dashboard
    #[arg(long)]
    headless: bool,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            source: self.source,
            url: self.url.clone(),
            capacity: self.capacity,
            seed: self.seed,
            interval_ms: self.interval_ms,
            fixtures: self.fixtures.clone(),
            max_retries: self.max_retries,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.log_file.as_deref())?;

    // Run the application
    let result = run_app(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let subscriber = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
    );

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => subscriber.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

async fn run_app(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply(args.overrides());
    config.validate()?;

    let consumer = build_consumer(&config)?;
    info!(source = %consumer.describe(), capacity = config.stream.capacity, "starting");

    if args.headless {
        headless::run(consumer).await
    } else {
        run_dashboard(consumer).await
    }
}

fn build_consumer(config: &AppConfig) -> Result<LogStreamConsumer> {
    let capacity = config.stream.capacity;
    let policy = config.reconnect.policy();

    match config.source.kind {
        SourceKind::Synthetic => {
            let fixtures = match &config.source.fixtures {
                Some(path) => StaticFixtures::from_file(path)?,
                None => StaticFixtures::builtin().context("failed to load built-in fixtures")?,
            };
            let fixtures: Arc<dyn FixtureProvider> = Arc::new(fixtures);
            let transport: Arc<dyn Transport> = Arc::new(
                SyntheticTransport::new(Arc::clone(&fixtures))
                    .with_interval(config.source.interval()),
            );

            let mut consumer = LogStreamConsumer::new(transport, capacity).with_reconnect(policy);
            // Seeding happens once; resume never replays it
            consumer.seed(fixtures.as_ref(), config.stream.seed);
            Ok(consumer)
        }
        SourceKind::Websocket => {
            let transport: Arc<dyn Transport> =
                Arc::new(WebSocketTransport::new(config.source.url.clone()));
            Ok(LogStreamConsumer::new(transport, capacity).with_reconnect(policy))
        }
    }
}

async fn run_dashboard(mut consumer: LogStreamConsumer) -> Result<()> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut state = AppState::new(consumer.describe(), action_tx.clone());
    state.observe_agents(&consumer.logs());

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(250));
    let keybindings = KeyBindings::new();

    consumer.connect();

    // Main event loop
    loop {
        if state.render_dirty {
            let snapshot = consumer.snapshot();
            tui.draw(|frame| {
                LogViewerScreen::render(frame, &mut state, &snapshot);
                if state.ui_state.help_visible {
                    HelpOverlay::render(frame);
                }
            })?;
            state.render_dirty = false;
        }

        tokio::select! {
            // Handle terminal events
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        let action = if state.ui_state.search_active {
                            keybindings.get_filter_input_action(&key)
                        } else {
                            keybindings.get_action(KeyContext::LogViewer, &key)
                        };
                        if let Some(action) = action {
                            let _ = action_tx.send(action);
                        }
                    }
                    Event::Tick => {}
                    Event::Resize(_, _) => {
                        let _ = action_tx.send(Action::Render);
                    }
                    Event::Error(e) => {
                        let _ = action_tx.send(Action::ShowMessage(e));
                    }
                }
            }

            // Handle stream events, taking everything queued before the next redraw
            Some(update) = consumer.process_next() => {
                apply_update(&mut state, &update);
                for update in consumer.process_pending() {
                    apply_update(&mut state, &update);
                }
            }

            // Handle user actions
            Some(action) = action_rx.recv() => {
                handle_action(&mut state, &mut consumer, action);
            }
        }

        if state.should_quit {
            break;
        }
    }

    consumer.disconnect();
    events.shutdown();
    tui.restore()?;

    Ok(())
}

fn apply_update(state: &mut AppState, update: &Update) {
    match update {
        Update::Ingested(entry) => state.note_entry(entry),
        Update::StateChanged(_) | Update::RetryStarted(_) | Update::Discarded(_) => {
            state.render_dirty = true;
        }
        Update::Stale(_) => {}
    }
}

fn handle_action(state: &mut AppState, consumer: &mut LogStreamConsumer, action: Action) {
    state.render_dirty = true;

    match action {
        Action::Quit => {
            state.should_quit = true;
        }
        Action::ToggleHelp => {
            state.ui_state.help_visible = !state.ui_state.help_visible;
        }

        // Stream control
        Action::TogglePause => {
            consumer.toggle_pause();
        }
        Action::Reconnect => {
            consumer.connect();
            state.show_message(format!("Reconnecting to {}", consumer.describe()));
        }
        Action::ClearLogs => {
            consumer.clear_logs();
            state.mark_logs_changed();
            state.ui_state.log_scroll = 0;
        }
        Action::ExportLogs => {
            state.refresh_view(&consumer.logs());
            let filename = export_filename(Local::now());
            match write_export(&filename, state.view()) {
                Ok(count) => {
                    info!(count, file = %filename, "exported logs");
                    state.show_message(format!("Exported {} logs to {}", count, filename));
                }
                Err(e) => {
                    state.show_message(format!("Export failed: {}", e));
                }
            }
        }

        // Search/filter input
        Action::OpenSearch => state.start_search(),
        Action::CloseSearch => state.cancel_search(),
        Action::SearchInput(c) => state.search_input_char(c),
        Action::SearchBackspace => state.search_input_backspace(),
        Action::SearchClear => state.ui_state.search_input.clear(),
        Action::ApplyFilter => state.apply_filter(),

        // Filters
        Action::ClearFilter => state.clear_filter(),
        Action::ToggleRegex => state.toggle_regex(),
        Action::CycleLevel => state.cycle_level(),
        Action::CycleStatus => state.cycle_status(),
        Action::CycleAgent => state.cycle_agent(),

        // Scrolling
        Action::ScrollUp(n) => state.scroll_up(n),
        Action::ScrollDown(n) => state.scroll_down(n),
        Action::PageUp => state.scroll_up(PAGE),
        Action::PageDown => state.scroll_down(PAGE),
        Action::ScrollToTop => state.scroll_to_top(),
        Action::ScrollToBottom => state.scroll_to_bottom(),

        // Display
        Action::ToggleFollow => state.toggle_follow(),
        Action::ToggleTimestamps => {
            state.ui_state.show_timestamps = !state.ui_state.show_timestamps;
        }
        Action::ToggleStats => {
            state.ui_state.stats_visible = !state.ui_state.stats_visible;
        }

        Action::ShowMessage(msg) => state.show_message(msg),
        Action::DismissMessage => {
            if state.ui_state.help_visible {
                state.ui_state.help_visible = false;
            } else {
                state.dismiss_message();
            }
        }
        Action::Render => {}
    }
}
