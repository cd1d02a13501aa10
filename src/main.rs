use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;
use tracing::info;

use price_watcher::app::{self, App};
use price_watcher::config::AppConfig;
use price_watcher::orchestrator::Trigger;
use price_watcher::storage::load_state;

#[derive(Parser)]
#[command(name = "price-watcher", version, about = "Watches a Jumia product page for price drops")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the watcher: periodic checks, and the HTTP API when enabled
    Run,
    /// Run one price check now
    Check,
    /// Show the product on the current page
    Show,
    /// Save the target price
    SetTarget { price: String },
    /// Change how often the price is checked
    Interval { minutes: u64 },
    /// Print the recorded price history
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("price_watcher=debug".parse()?),
        )
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    match Cli::parse().command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Check => check(config).await,
        Command::Show => show(config).await,
        Command::SetTarget { price } => set_target(config, &price).await,
        Command::Interval { minutes } => interval(config, minutes).await,
        Command::History => history(config).await,
    }
}

async fn run(config: AppConfig) -> Result<()> {
    info!("Starting Price Watcher...");

    let app = App::build(config).await?;
    app.run_until(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down...");
    })
    .await?;

    Ok(())
}

async fn check(config: AppConfig) -> Result<()> {
    let store = app::build_store(&config).await?;
    let pages = app::build_page_source(&config).await?;
    let orchestrator = app::build_orchestrator(&config, store.clone(), pages)?;

    match orchestrator.run_cycle_logged(Trigger::Manual).await {
        Some(outcome) => {
            println!("{}", outcome.verdict.message);
            if let Some(error) = outcome.notify_error {
                println!("Notification failed: {}", error);
            }
        }
        None => println!("Price check skipped, see log for details"),
    }

    store.close().await;
    Ok(())
}

async fn show(config: AppConfig) -> Result<()> {
    let app = App::build(config).await?;
    let popup = app.popup();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let service = tokio::spawn(app.run_service_until(async move {
        let _ = stop_rx.await;
    }));

    let view = popup.refresh().await?;
    let _ = stop_tx.send(());
    service.await??;

    println!("{}", view.title);
    println!("Price:      {}", view.price);
    println!("Last price: {}", view.last_price);
    println!("Target:     {}", view.target_price.as_deref().unwrap_or("not set"));
    if !view.status.is_empty() {
        println!("{}", view.status);
    }
    Ok(())
}

async fn set_target(config: AppConfig, price: &str) -> Result<()> {
    let app = App::build_offline(config).await?;

    match app.popup().save_target(price).await? {
        Some(status) => println!("{}", status),
        None => println!("No target price given"),
    }
    Ok(())
}

async fn interval(config: AppConfig, minutes: u64) -> Result<()> {
    let app = App::build_offline(config).await?;
    app.service().set_check_interval(minutes).await?;
    println!("Check interval set to {} minutes, used from the next start", minutes);
    Ok(())
}

async fn history(config: AppConfig) -> Result<()> {
    let store = app::build_store(&config).await?;
    let state = load_state(store.as_ref()).await?;

    if state.price_history.is_empty() {
        println!("No price history recorded yet");
    }
    for entry in state.price_history.iter() {
        println!("{}  {} {}  {}", entry.timestamp, config.alerts.currency, entry.price, entry.title);
    }

    store.close().await;
    Ok(())
}
