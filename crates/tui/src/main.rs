mod app;
mod client;
mod config;
mod error;
mod form;
mod ui;

use std::{fs::OpenOptions, sync::Mutex};

use crate::{
    config::AppConfig,
    error::{AppError, Result},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;
    init_tracing(&config)?;
    tracing::info!("starting against {}", config.base_url);

    let mut app = app::App::new(&config)?;
    app.run().await?;
    Ok(())
}

/// Logs go to a file: stdout belongs to the terminal UI.
fn init_tracing(config: &AppConfig) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "expenses_tui={level},api_types={level}",
            level = config.log_level
        ))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| AppError::Logging(err.to_string()))
}
