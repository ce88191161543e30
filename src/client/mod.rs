//! The public client.
//!
//! [`EuroparlClient`] owns one [`FetchPipeline`] and hands out borrowed
//! domain sub-clients that all share it, so every call made through one
//! client draws from the same cache, rate-limit bucket and metrics store.
//! Clients are cheap to clone; clones share the pipeline too.

mod builder;
pub mod endpoints;

pub use builder::ClientBuilder;
pub use endpoints::{
    Committees, Documents, Legislative, MepQuery, Meps, Page, Plenary, Questions, Vocabularies,
};

use std::sync::Arc;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::params::QueryParams;
use crate::pipeline::FetchPipeline;
use crate::telemetry::MetricsCollector;
use crate::Result;

/// Client for the European Parliament open-data API.
#[derive(Debug, Clone)]
pub struct EuroparlClient {
    pipeline: Arc<FetchPipeline>,
    config: Arc<ClientConfig>,
}

impl EuroparlClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Build a client from a loaded configuration with default collaborators.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new().config(config).build()
    }

    pub(crate) fn from_pipeline(pipeline: Arc<FetchPipeline>, config: ClientConfig) -> Self {
        Self {
            pipeline,
            config: Arc::new(config),
        }
    }

    /// Raw fetch of any endpoint path through the pipeline.
    pub async fn fetch(&self, endpoint: &str, params: &QueryParams) -> Result<Value> {
        self.pipeline.fetch(endpoint, params).await
    }

    pub fn meps(&self) -> Meps<'_> {
        Meps::new(&self.pipeline)
    }

    pub fn plenary(&self) -> Plenary<'_> {
        Plenary::new(&self.pipeline)
    }

    pub fn committees(&self) -> Committees<'_> {
        Committees::new(&self.pipeline)
    }

    pub fn documents(&self) -> Documents<'_> {
        Documents::new(&self.pipeline)
    }

    pub fn legislative(&self) -> Legislative<'_> {
        Legislative::new(&self.pipeline)
    }

    pub fn questions(&self) -> Questions<'_> {
        Questions::new(&self.pipeline)
    }

    pub fn vocabularies(&self) -> Vocabularies<'_> {
        Vocabularies::new(&self.pipeline)
    }

    /// The metrics store backing this client.
    pub fn metrics(&self) -> &MetricsCollector {
        self.pipeline.metrics()
    }

    /// The effective configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Live cache entries.
    pub fn cache_len(&self) -> usize {
        self.pipeline.cache().len()
    }

    pub fn clear_cache(&self) {
        self.pipeline.clear_cache();
    }

    /// Drop one cached response. Returns whether an entry was removed.
    pub fn invalidate(&self, endpoint: &str, params: &QueryParams) -> bool {
        self.pipeline.invalidate(endpoint, params)
    }

    /// Tokens left in the rate-limit bucket.
    pub fn available_tokens(&self) -> f64 {
        self.pipeline.limiter().available_tokens()
    }

    pub fn pipeline(&self) -> &FetchPipeline {
        &self.pipeline
    }
}
