use chrono::{Local, NaiveDate};
use clap::Parser;
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/expenses_tui.toml";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Day opened at startup. Today when unset.
    pub date: Option<String>,
    pub log_level: String,
    pub log_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            date: None,
            log_level: "info".to_string(),
            log_file: "expenses_tui.log".to_string(),
        }
    }
}

impl AppConfig {
    pub fn start_date(&self) -> Result<NaiveDate> {
        match self.date.as_deref() {
            Some(raw) => parse_date(raw),
            None => Ok(Local::now().date_naive()),
        }
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::Date(raw.to_string()))
}

#[derive(Debug, Parser)]
#[command(name = "expenses_tui", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override base URL (e.g. http://localhost:8000).
    #[arg(long)]
    base_url: Option<String>,
    /// Day to open, as YYYY-MM-DD.
    #[arg(long)]
    date: Option<String>,
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
    /// Override log file path.
    #[arg(long)]
    log_file: Option<String>,
}

pub fn load() -> Result<AppConfig> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("EXPENSES_TUI"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(date) = args.date {
        settings.date = Some(date);
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(log_file) = args.log_file {
        settings.log_file = log_file;
    }

    // Fail at startup rather than inside the event loop.
    settings.start_date()?;

    Ok(settings)
}
