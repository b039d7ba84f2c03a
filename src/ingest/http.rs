// src/ingest/http.rs
//! HTTP context handed to every fetch strategy.
//!
//! The aggregator owns one `HttpFetch` for the lifetime of a run; strategies
//! never build clients of their own.

use crate::ingest::error::FetchError;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use std::collections::HashMap;
use std::time::Duration;

/// Single GET with the budget of one source.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub timeout: Duration,
    pub user_agent: Option<&'a str>,
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Return the body of a 2xx response as text.
    async fn get_text(&self, req: FetchRequest<'_>) -> Result<String, FetchError>;
}

/// `reqwest`-backed transport (rustls).
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get_text(&self, req: FetchRequest<'_>) -> Result<String, FetchError> {
        let mut builder = self.client.get(req.url).timeout(req.timeout);
        if let Some(ua) = req.user_agent {
            builder = builder.header(USER_AGENT, ua);
        }
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Transient {
                status: Some(status.as_u16()),
                detail: format!("GET {} returned {}", req.url, status),
            });
        }
        Ok(resp.text().await?)
    }
}

/// Canned responses keyed by URL. Unknown URLs fail as transient errors,
/// which is what an unreachable host looks like to the strategies.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Result<String, u16>>,
    delays: HashMap<String, Duration>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), Ok(body.into()));
        self
    }

    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.bodies.insert(url.into(), Err(status));
        self
    }

    /// Sleep before answering; used to exercise per-source timeouts.
    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }
}

#[async_trait]
impl HttpFetch for StaticFetcher {
    async fn get_text(&self, req: FetchRequest<'_>) -> Result<String, FetchError> {
        if let Some(delay) = self.delays.get(req.url) {
            tokio::time::sleep(*delay).await;
        }
        match self.bodies.get(req.url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::Transient {
                status: Some(*status),
                detail: format!("GET {} returned {}", req.url, status),
            }),
            None => Err(FetchError::transient(format!(
                "connection refused: {}",
                req.url
            ))),
        }
    }
}
