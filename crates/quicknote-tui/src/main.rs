//! quicknote - a terminal client for keeping short personal notes.
//!
//! Accounts live in an Amazon Cognito user pool; notes live on the
//! quicknote message server, which trusts the pool's identity tokens.

mod app;
mod ui;
mod utils;

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quicknote_core::{ApiClient, Config};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name prefix; tracing-appender adds the date.
const LOG_FILE_PREFIX: &str = "quicknote.log";

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so logs go to a daily file under the
/// cache directory. Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.cache_dir()?);

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--health") => return health(&config).await,
        Some("--sign-out") => return sign_out(&config).await,
        Some(other) => anyhow::bail!("Unknown argument: {} (expected --health or --sign-out)", other),
        None => {}
    }

    info!("quicknote starting");
    let mut app = App::from_config(config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    if app.resume_session().await {
        app.refresh().await;
    } else {
        app.start_sign_in();
    }

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("quicknote shutting down");
    Ok(())
}

/// Print the server health check and exit.
async fn health(config: &Config) -> Result<()> {
    // The health check is unauthenticated, so no identity pool is needed.
    let api = ApiClient::unauthenticated(config.api_url.clone())?;
    let status = api
        .health_check()
        .await
        .with_context(|| format!("Health check against {} failed", config.api_url))?;

    println!("{}: {}", status.status, status.message);
    if !status.is_healthy() {
        anyhow::bail!("Server reported status {}", status.status);
    }
    Ok(())
}

/// Forget the cached session and exit.
async fn sign_out(config: &Config) -> Result<()> {
    config.session_store()?.clear()?;
    println!("Signed out");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
