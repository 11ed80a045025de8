use std::future::Future;

use api_types::expense::ExpenseEntry;
use chrono::NaiveDate;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::DATE_FORMAT,
    error::{AppError, Result},
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("server unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Error payload. Accepts both `{"error": ..}` and `{"detail": ..}` bodies.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    detail: Option<serde_json::Value>,
}

/// Remote storage of the expenses of a day.
pub trait ExpensesApi {
    fn fetch_expenses(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = std::result::Result<Vec<ExpenseEntry>, ClientError>>;

    /// Replaces the whole list stored for `date`.
    fn replace_expenses(
        &self,
        date: NaiveDate,
        entries: &[ExpenseEntry],
    ) -> impl Future<Output = std::result::Result<(), ClientError>>;
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        // `Url::join` drops the last path segment unless it ends with '/'.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|err| AppError::Terminal(format!("invalid base_url: {err}")))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("expenses_tui/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn expenses_endpoint(&self, date: NaiveDate) -> std::result::Result<Url, ClientError> {
        self.base_url
            .join(&format!("expenses/{}", date.format(DATE_FORMAT)))
            .map_err(|err| ClientError::InvalidUrl(err.to_string()))
    }
}

impl ExpensesApi for Client {
    async fn fetch_expenses(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<Vec<ExpenseEntry>, ClientError> {
        let endpoint = self.expenses_endpoint(date)?;
        tracing::info!("fetching expenses from {endpoint}");

        let res = self.http.get(endpoint).send().await?;
        if res.status() == StatusCode::OK {
            return Ok(res.json::<Vec<ExpenseEntry>>().await?);
        }

        Err(status_error(res).await)
    }

    async fn replace_expenses(
        &self,
        date: NaiveDate,
        entries: &[ExpenseEntry],
    ) -> std::result::Result<(), ClientError> {
        let endpoint = self.expenses_endpoint(date)?;
        tracing::info!("posting {} expenses to {endpoint}", entries.len());

        let res = self.http.post(endpoint).json(entries).send().await?;
        if res.status() == StatusCode::OK {
            return Ok(());
        }

        Err(status_error(res).await)
    }
}

async fn status_error(res: reqwest::Response) -> ClientError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ErrorResponse>(&body).ok();
    let message = match parsed {
        Some(ErrorResponse {
            error: Some(error), ..
        }) => error,
        Some(ErrorResponse {
            detail: Some(serde_json::Value::String(detail)),
            ..
        }) => detail,
        Some(ErrorResponse {
            detail: Some(detail),
            ..
        }) => detail.to_string(),
        _ if body.trim().is_empty() => "unknown error".to_string(),
        _ => body,
    };
    tracing::warn!("request failed with {status}: {message}");
    ClientError::Status { status, message }
}
