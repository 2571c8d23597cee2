use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatbox_core::{ChatClient, Config};

mod app;
mod handler;
mod markdown;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "chatbox")]
#[command(about = "Terminal chat client for a JSON chat endpoint", version)]
struct Cli {
    /// Base URL of the chat server; requests go to <url>/chat
    #[arg(short, long, env = "CHATBOX_SERVER_URL")]
    server_url: Option<String>,

    /// Message sent on start-up to open the conversation
    #[arg(short, long)]
    greeting: Option<String>,

    /// Log file (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_file)?;

    let mut config = Config::load().context("failed to load config")?;
    if let Some(greeting) = cli.greeting {
        config.greeting = Some(greeting);
    }
    let server_url = cli.server_url.unwrap_or_else(|| config.server_url());

    let client = ChatClient::with_timeout(&server_url, config.request_timeout())?;
    tracing::info!(endpoint = client.endpoint(), "starting chatbox");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(&config, server_url, Arc::new(client), events.sender());
    app.start();

    let result = run(&mut terminal, &mut app, &mut events).await;

    let outcome = finish(result, tui::restore());
    tracing::info!("chatbox exited");
    outcome
}

/// Combine the run and terminal restore outcomes
///
/// A run error wins; a restore failure alongside it is only logged.
fn finish(result: Result<()>, restored: Result<()>) -> Result<()> {
    match (result, restored) {
        (Err(e), Err(restore_err)) => {
            tracing::error!(error = %restore_err, "failed to restore the terminal");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), restored) => restored.context("failed to restore the terminal"),
    }
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

/// File-based tracing; the terminal belongs to the UI
fn init_logging(log_file: Option<PathBuf>) -> Result<()> {
    let log_path = match log_file {
        Some(path) => path,
        None => dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatbox")
            .join("chatbox.log"),
    };
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file '{}'", log_path.display()))?;

    let filter = EnvFilter::try_from_env("CHATBOX_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();

    Ok(())
}
