//! Main entry point for the application.
//!
//! Loads `.env` and the configuration, initializes logging, then either
//! answers a single question on the terminal, serves the HTTP API, or prints
//! the stored chat history.

mod api;
mod app;
mod capabilities;
mod checkpoint;
mod cli;
mod config;
mod constants;
mod core;
mod db;
mod errors;
mod event;
mod llm;
mod schema;
mod services;
mod tabular;
mod utils;
mod websearch;

use crate::app::AppContext;
use crate::errors::Result;
use crate::event::Event;
use clap::Parser;
use cli::Command;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    utils::init_logging(
        &cli.logging_level,
        cli.log_file.then_some(Path::new("logs")),
    );

    if let Err(e) = dotenvy::dotenv() {
        warn!("Failed to load .env file: {}", e);
    }

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli) -> Result<()> {
    let config = config::load_app_config(cli.config.as_deref())?;

    match cli.command {
        Command::Ask { query } => {
            let query = match query {
                Some(q) => q,
                None => Input::<String>::with_theme(&ColorfulTheme::default())
                    .with_prompt("📝 Your question")
                    .interact_text()
                    .map_err(|e| std::io::Error::other(e.to_string()))?,
            };
            let ctx = AppContext::from_config(&config).await?;
            ask(&ctx, &query).await
        }
        Command::Serve { port } => {
            let ctx = AppContext::from_config(&config).await?;
            let port = port.unwrap_or(config.api.port);
            println!("{} {}", "🚀 Serving on port".green(), port);
            api::server::launch_server(ctx, port).await
        }
        Command::History => {
            let ctx = AppContext::from_config(&config).await?;
            for entry in ctx.chat.history().await?.messages {
                println!(
                    "{} {}\n{} {}\n",
                    entry.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    entry.message.bold(),
                    "→".green(),
                    entry.response
                );
            }
            Ok(())
        }
    }
}

/// Runs one question with a spinner fed by engine events
async fn ask(ctx: &AppContext, query: &str) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("-\\|/")
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("🧩 Planning tasks...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let progress = spinner.clone();
    let listener = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            progress.set_message(event.message());
        }
    });

    let correlation_id = Uuid::new_v4().to_string();
    let result = ctx
        .chat
        .process_message_observed(query, &correlation_id, Some(&tx))
        .await;
    drop(tx);
    let _ = listener.await;
    spinner.finish_and_clear();

    let response = result?;
    println!("{}", response.response.green());
    Ok(())
}
