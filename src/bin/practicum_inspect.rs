use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use hw_statusbot::config;
use hw_statusbot::model::{self, HomeworkStatus};
use hw_statusbot::practicum::{PracticumClient, StatusSource};

/// Fetch one batch of homework statuses and print it. Sends nothing.
#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Unix timestamp to request changes from (0 = now)
    #[arg(long, default_value = "0")]
    from_date: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let mut cfg = config::read_file(Some(args.config.as_path()))?;
    cfg.apply_env_with(|key| std::env::var(key).ok());
    if cfg.practicum.token.trim().is_empty() {
        anyhow::bail!("practicum.token (or {}) must be set", config::PRACTICUM_TOKEN_ENV);
    }
    let client = PracticumClient::from_config(&cfg)?;

    let raw = client.fetch(args.from_date).await?;
    let batch = model::validate(raw)?;
    println!("current_date: {}", batch.current_date);
    println!("homeworks: {}", batch.homeworks.len());
    for record in &batch.homeworks {
        match HomeworkStatus::from_record(record) {
            Ok(status) => println!("  {} -> {}", status.name, status.verdict.as_str()),
            Err(err) => println!("  <invalid record: {}> {}", err, record),
        }
    }
    println!("message: {}", batch.message().unwrap_or_else(|err| err.to_string()));
    Ok(())
}
