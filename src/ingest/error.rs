// src/ingest/error.rs
use thiserror::Error;

/// Why a source contributed nothing to a run. Never escapes `aggregate`.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, timeout, or non-2xx status.
    #[error("transient fetch error{}: {detail}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transient { status: Option<u16>, detail: String },

    /// Body arrived but could not be parsed (JSON, XML or HTML).
    #[error("parse error: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn transient(detail: impl Into<String>) -> Self {
        FetchError::Transient {
            status: None,
            detail: detail.into(),
        }
    }

    pub fn parse(detail: impl ToString) -> Self {
        FetchError::Parse(detail.to_string())
    }

    /// Short label used as a metrics/log dimension.
    pub fn label(&self) -> &'static str {
        match self {
            FetchError::Transient { .. } => "transient",
            FetchError::Parse(_) => "parse",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transient {
            status: e.status().map(|s| s.as_u16()),
            detail: e.to_string(),
        }
    }
}
