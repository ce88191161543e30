//! europarl-gateway - resilient client for the European Parliament open-data API
//!
//! Every request goes through one pipeline: a bounded LRU/TTL response
//! cache, a token-bucket rate limiter, a timeout/retry orchestrator and a
//! streaming response-size guard, with counters and latency percentiles
//! recorded along the way. Domain sub-clients (MEPs, plenary, committees,
//! documents, legislative procedures, questions, vocabularies) are thin
//! wrappers over that pipeline.
//!
//! # Example
//!
//! ```rust,no_run
//! use europarl_gateway::{EuroparlClient, MepQuery, Page, RateLimitInterval};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> europarl_gateway::Result<()> {
//!     let client = EuroparlClient::builder()
//!         .timeout(Duration::from_secs(5))
//!         .rate_limit(60, RateLimitInterval::Minute)
//!         .build()?;
//!
//!     let meps = client
//!         .meps()
//!         .current(&MepQuery::new().country("SE").page(Page::first(5)))
//!         .await?;
//!     println!("{meps:#}");
//!
//!     if let Some(latency) = client
//!         .metrics()
//!         .histogram_summary(europarl_gateway::telemetry::REQUEST_DURATION_MS, &[("endpoint", "meps")])
//!     {
//!         println!("p95 = {:.1} ms", latency.p95);
//!     }
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod params;
pub mod pipeline;
pub(crate) mod sync;
pub mod telemetry;
pub mod version;

// Re-export main types at crate root
pub use audit::{AuditEvent, AuditOutcome, AuditSink, NoopAuditSink, TracingAuditSink};
pub use cache::{CacheConfig, CacheKey, ResponseCache};
pub use client::{
    ClientBuilder, Committees, Documents, EuroparlClient, Legislative, MepQuery, Meps, Page,
    Plenary, Questions, Vocabularies,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClientConfig;
pub use error::{ErrorKind, EuroparlError, Result, ToolError};
pub use params::{ParamValue, QueryParams};
pub use pipeline::{
    FetchPipeline, HttpResponse, RateLimitInterval, RateLimiter, ReqwestTransport, RetryConfig,
    RetryOrchestrator, Transport,
};
pub use telemetry::{HistogramSummary, MetricsCollector};
pub use version::{BuildInfo, PKG_VERSION, version_string};
