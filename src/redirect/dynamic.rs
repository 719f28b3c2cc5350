//! Dynamic redirect sources.
//!
//! # Responsibilities
//! - Ask an external lookup for extra rules at resolution time
//! - Compile the returned map into a host-less overlay partition
//! - Turn every failure into "no dynamic rules" after logging it
//!
//! # Design Decisions
//! - The source receives the full redirect options
//! - No lock on the route table is held while a fetch is in flight
//! - No timeout is imposed here; sources bound their own latency

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::RedirectOptions;
use crate::observability::metrics;
use crate::redirect::spec::RouteMap;
use crate::redirect::table::{Partition, RegistrationError};

#[derive(Debug, thiserror::Error)]
pub enum DynamicSourceError {
    #[error("dynamic redirect source failed: {0}")]
    Failed(String),

    #[error("dynamic redirect request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("dynamic redirect rules are invalid: {0}")]
    Invalid(#[from] RegistrationError),
}

/// An external lookup producing extra pattern → spec rules.
#[async_trait]
pub trait DynamicSource: Send + Sync + 'static {
    async fn fetch(&self, options: &RedirectOptions) -> Result<RouteMap, DynamicSourceError>;
}

/// Adapts an async closure into a [`DynamicSource`].
pub struct FnSource<F>(F);

impl<F, Fut> FnSource<F>
where
    F: Fn(&RedirectOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RouteMap, DynamicSourceError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> DynamicSource for FnSource<F>
where
    F: Fn(&RedirectOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RouteMap, DynamicSourceError>> + Send + 'static,
{
    async fn fetch(&self, options: &RedirectOptions) -> Result<RouteMap, DynamicSourceError> {
        (self.0)(options).await
    }
}

/// Fetches rules as a JSON object from an HTTP endpoint.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DynamicSourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl DynamicSource for HttpSource {
    async fn fetch(&self, _options: &RedirectOptions) -> Result<RouteMap, DynamicSourceError> {
        let routes = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<RouteMap>()
            .await?;
        Ok(routes)
    }
}

/// Run `source` and compile its rules.
///
/// Returns `None` when the source fails or returns malformed patterns; the
/// caller then resolves against registered rules only.
pub async fn fetch_overlay(
    source: &dyn DynamicSource,
    options: &RedirectOptions,
) -> Option<Partition> {
    let result = match source.fetch(options).await {
        Ok(routes) => Partition::compile(None, &routes).map_err(DynamicSourceError::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(partition) => {
            if options.verbose {
                tracing::debug!(rules = partition.len(), "Dynamic redirect rules fetched");
            }
            Some(partition)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Dynamic redirect source unavailable");
            metrics::record_dynamic_source_error();
            None
        }
    }
}
