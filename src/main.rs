use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use documind::{handler, logging, tui, ui, ApiClient, App, Config};

#[derive(Parser)]
#[command(name = "documind")]
#[command(about = "Upload a PDF to the DocuMind backend and ask questions about it")]
struct Cli {
    /// PDF to pre-select for upload
    pdf: Option<PathBuf>,
    /// Backend base address (overrides the config file)
    #[arg(long)]
    backend_url: Option<String>,
    /// Log file location
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load config")?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }

    if cli.save_config {
        config.save().context("Failed to save config")?;
        println!("Saved config to {}", Config::get_config_path()?.display());
        return Ok(());
    }

    let log_path = cli.log_file.unwrap_or_else(logging::default_log_path);
    logging::init(&log_path)?;
    tracing::info!(backend = %config.backend_url, "starting documind");

    let client = ApiClient::new(&config.backend_url);
    {
        let client = client.clone();
        tokio::spawn(async move {
            match client.health().await {
                Ok(health) => tracing::info!(
                    status = %health.status,
                    message = %health.message,
                    "backend reachable"
                ),
                Err(e) => tracing::warn!(error = %e, "backend not reachable yet"),
            }
        });
    }

    let mut app = App::new(Arc::new(client), &config);
    if let Some(pdf) = &cli.pdf {
        app.select_file(&pdf.to_string_lossy());
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "documind exited with an error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);
        app.poll_tasks().await;
    }

    if app.has_pending_tasks() {
        tracing::info!("quitting with a request still in flight");
    }
    Ok(())
}
