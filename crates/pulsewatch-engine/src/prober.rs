//! Endpoint probe — one bounded-time HTTP GET per call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// A completed HTTP exchange, whatever its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
    /// Time from request start until the body was read.
    pub elapsed: Duration,
}

/// Why a probe produced no HTTP response. Every variant is retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed")]
    ConnectionFailed,

    /// Throttled before any response arrived, e.g. by a client-side limiter
    /// or an intermediary that drops the request. [`HttpProber`] never returns
    /// this: an upstream 429 is a completed response and is classified as such.
    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("{0}")]
    Other(String),
}

/// A single probe attempt against one endpoint. Implementations never retry.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, TransportFailure>;
}

/// The production [`Prober`], backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

/// Content types a status endpoint may answer with.
const ACCEPT_STATUS_PAGE: &str = "application/json, text/html;q=0.9, */*;q=0.8";

impl HttpProber {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, TransportFailure> {
        let start = Instant::now();

        let exchange = async {
            let resp = self
                .client
                .get(url)
                .header(ACCEPT, ACCEPT_STATUS_PAGE)
                .send()
                .await
                .map_err(categorize)?;
            let status = resp.status().as_u16();
            let body = resp.text().await.map_err(categorize)?;
            Ok(ProbeResponse {
                status,
                body,
                elapsed: start.elapsed(),
            })
        };

        // Dropping the exchange future on expiry cancels the in-flight request.
        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => {
                if let Err(ref failure) = result {
                    debug!(%url, %failure, "probe failed");
                }
                result
            }
            Err(_) => {
                debug!(%url, timeout_ms = timeout.as_millis() as u64, "probe timed out");
                Err(TransportFailure::Timeout)
            }
        }
    }
}

/// Map a `reqwest` error onto a transport failure tag.
fn categorize(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::ConnectionFailed
    } else {
        TransportFailure::Other(error_chain(&err))
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
