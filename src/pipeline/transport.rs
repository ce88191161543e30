//! HTTP transport seam.
//!
//! The pipeline never talks to `reqwest` directly; it goes through the
//! [`Transport`] trait so tests and embedders can substitute their own
//! network layer. A transport performs exactly one GET and hands back the
//! status plus an unread body stream. Reading (and size-limiting) the body
//! is the pipeline's job.
//!
//! # Cancellation
//!
//! Each call receives the attempt's [`CancellationToken`]. Implementations
//! should stop work once it fires; [`ReqwestTransport`] abandons the
//! in-flight request, which closes the connection.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderValue, USER_AGENT};
use tokio_util::sync::CancellationToken;

use crate::{EuroparlError, Result};

/// Response body as a stream of chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Media type requested from the API.
pub const JSON_LD: &str = "application/ld+json";

/// Status line, advertised length, and an unread body.
pub struct HttpResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// One outbound GET.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging/debugging.
    fn name(&self) -> &str;

    /// Issue `GET url?query`.
    ///
    /// Connection-level failures map to [`EuroparlError::Http`]. A non-2xx
    /// status is *not* an error at this layer; the caller reads the body.
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        cancel: CancellationToken,
    ) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build a client with JSON-LD defaults and a connect timeout.
    ///
    /// The overall request deadline is owned by the retry orchestrator, not
    /// by the client.
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EuroparlError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http))
    }

    /// Wrap an existing client.
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        cancel: CancellationToken,
    ) -> Result<HttpResponse> {
        let request = self
            .http
            .get(url)
            .query(query)
            .header(ACCEPT, HeaderValue::from_static(JSON_LD))
            .header(USER_AGENT, crate::version::user_agent())
            .send();

        // Under the retry orchestrator a timed-out attempt is dropped before
        // its token fires. The arm serves callers driving the transport
        // with a token of their own.
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EuroparlError::Cancelled),
            response = request => response?,
        };

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(EuroparlError::from));

        Ok(HttpResponse {
            status,
            content_length,
            body: Box::pin(body),
        })
    }
}
