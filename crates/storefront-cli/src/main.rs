//! Storefront TUI - a terminal client for the storefront demo.
//!
//! Signs in against the auth API, keeps the session across restarts and
//! browses the post feed behind a login gate.

mod app;
mod ui;

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_core::api::describe_error;
use storefront_core::config::{Config, CredentialBackend};
use storefront_core::Services;

use app::{login_error_message, validate_login_form, App, AppState, ENV_PASSWORD, ENV_USERNAME};
use ui::input::handle_input;
use ui::render::{render, render_splash};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_NAME: &str = "storefront.log";

const USAGE: &str = "\
Usage: storefront [OPTIONS]

Options:
  --login       Sign in from the plain terminal and exit
  --logout      Forget the saved session and exit
  --status      Show whether a session is saved and exit
  --ephemeral   Keep the session in memory for this run only
  --version     Print version
  --help        Print this help";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a file in the cache dir so they never draw over the TUI.
/// Use RUST_LOG to control the level (e.g., RUST_LOG=debug).
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let Some(dir) = log_dir.filter(|d| std::fs::create_dir_all(d).is_ok()) else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::sink))
            .with(filter)
            .init();
        return None;
    };

    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Some(guard)
}

#[derive(Debug, Default)]
struct Flags {
    login: bool,
    logout: bool,
    status: bool,
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut flags = Flags::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("storefront {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                return Ok(());
            }
            "--login" => flags.login = true,
            "--logout" => flags.logout = true,
            "--status" => flags.status = true,
            "--ephemeral" => flags.ephemeral = true,
            other => anyhow::bail!("Unknown option: {}\n\n{}", other, USAGE),
        }
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    if flags.ephemeral {
        config.credential_backend = CredentialBackend::Memory;
    }

    // Initialize logging
    let _log_guard = init_tracing(config.cache_dir().ok().as_deref());
    info!(backend = ?config.credential_backend, "Storefront starting");

    let services = Services::from_config(&config)?;

    if flags.logout {
        services.session.logout();
        println!("Signed out.");
        return Ok(());
    }
    if flags.status {
        let restored = services.session.restore();
        println!("{}", if restored { "Signed in (session saved)" } else { "Not signed in" });
        return Ok(());
    }
    if flags.login {
        return login_from_prompt(&mut config, &services).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(config, services);

    // Splash while the saved session is read, then the route gate decides
    terminal.draw(render_splash)?;
    app.restore_session();
    if app.state == AppState::Normal {
        app.ensure_posts_loaded();
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
        eprintln!("Error: {}", describe_error(&e));
    }

    info!("Storefront shutting down");
    Ok(())
}

/// `--login`: ask for credentials on the plain terminal.
async fn login_from_prompt(config: &mut Config, services: &Services) -> Result<()> {
    let default_username = std::env::var(ENV_USERNAME)
        .ok()
        .or_else(|| config.last_username.clone())
        .unwrap_or_default();

    if default_username.is_empty() {
        print!("Username: ");
    } else {
        print!("Username [{}]: ", default_username);
    }
    io::stdout().flush()?;
    let mut username = String::new();
    io::stdin()
        .read_line(&mut username)
        .context("Failed to read username")?;
    let username = match username.trim() {
        "" => default_username,
        typed => typed.to_string(),
    };

    let password = match std::env::var(ENV_PASSWORD) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    if let Err(message) = validate_login_form(&username, &password) {
        anyhow::bail!(message);
    }

    match services.session.login(&username, &password).await {
        Ok(()) => {
            config.last_username = Some(username.trim().to_string());
            config.save()?;
            println!("Signed in as {}.", username.trim());
            Ok(())
        }
        Err(e) => anyhow::bail!("Login failed: {}", login_error_message(&e)),
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks and session changes
        app.check_background_tasks().await;

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
