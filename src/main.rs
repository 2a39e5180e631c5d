use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use hw_statusbot::config;
use hw_statusbot::logging;
use hw_statusbot::poller::StatusPoller;
use hw_statusbot::practicum::PracticumClient;
use hw_statusbot::telegram::TelegramNotifier;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file (optional; secrets may come from the environment)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print an example config file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.print_config {
        print!("{}", config::example());
        return Ok(());
    }

    dotenvy::dotenv().ok();
    let mut cfg = config::read_file(Some(args.config.as_path()))?;
    cfg.apply_env_with(|key| std::env::var(key).ok());
    logging::init(cfg.app.log_file.as_deref())?;

    if let Err(err) = config::validate(&cfg) {
        error!(%err, "required configuration is missing; the bot stops");
        return Err(err).context("required configuration is missing; the bot stops");
    }

    let source = PracticumClient::from_config(&cfg)?;
    let notifier = TelegramNotifier::from_config(&cfg)?;
    let poller = StatusPoller::new(source, notifier, &cfg.app);

    info!(?cfg, "telegram bot starting");
    poller
        .announce_start()
        .await
        .context("failed to send the start message")?;
    poller.run().await;
    Ok(())
}
