use std::fs::{self, File};
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use chailv_core::{Config, PolicyTables, RelayClient, TableStore};

mod app;
mod editor;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "chailv")]
#[command(about = "Ask travel-expense policy questions from the terminal")]
struct Cli {
    /// Base URL of the relay endpoint
    #[arg(long, env = "CHAILV_RELAY_URL")]
    relay_url: Option<String>,
}

/// Log to a file; stderr belongs to the terminal UI
fn init_logging() {
    let Some(log_dir) = dirs::cache_dir().map(|d| d.join("chailv")) else {
        return;
    };
    if fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let Ok(file) = File::create(log_dir.join("chailv.log")) else {
        return;
    };

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default config");
        Config::new()
    });
    let relay_url = cli
        .relay_url
        .unwrap_or_else(|| config.relay_url().to_string());

    let store = TableStore::open_default()?;
    tracing::info!(relay = %relay_url, tables = ?store.root(), "starting");
    let mut app = App::new(RelayClient::new(&relay_url), PolicyTables::load(store));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
