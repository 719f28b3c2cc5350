//! Redirect resolution.
//!
//! # Data Flow
//! ```text
//! CHECKING_RESPONSE        tentative status != 404      → PASSTHROUGH
//!   → FETCHING_DYNAMIC     source error                 → static rules only
//!   → MERGING_RULES        dynamic key already known    → 500
//!   → MATCHING             nothing matches              → PASSTHROUGH
//!   → SUBSTITUTING         params into destination
//!   → COMPOSING_QUERY      request query + destination query
//!   → EMITTING             RedirectDecision, listeners notified
//! ```
//!
//! # Design Decisions
//! - The resolver owns the route table; nothing is a global
//! - The dynamic fetch happens before the table snapshot is taken
//! - Eager routes share `emit` with the interception path

use std::sync::Arc;
use std::time::Instant;

use crate::config::RedirectOptions;
use crate::observability::metrics;
use crate::redirect::dynamic::{fetch_overlay, DynamicSource};
use crate::redirect::events::{EventBus, RedirectEvent, RedirectListener};
use crate::redirect::host::{RequestContext, ResponseInspector};
use crate::redirect::params::substitute;
use crate::redirect::query::compose_location;
use crate::redirect::spec::RedirectStatus;
use crate::redirect::table::{
    keys_list, MatchResult, RegistrationError, RouteBatch, RouteKey, RouteTable, SharedRouteTable,
};

/// The final answer for a request that is redirected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDecision {
    pub status: RedirectStatus,
    pub location: String,
}

/// Errors that must reach the client as a 500.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("dynamic redirects collide with registered routes: {}", keys_list(.0))]
    Duplicate(Vec<RouteKey>),

    #[error("no redirect target configured for {0}")]
    MissingTarget(String),
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Leave the host's response alone.
    Passthrough,
    /// Replace the response with a redirect.
    Redirect(RedirectDecision),
    /// Replace the response with a server error.
    Failed(ResolveError),
}

/// Resolves requests against the route table and an optional dynamic source.
pub struct Resolver {
    options: Arc<RedirectOptions>,
    table: SharedRouteTable,
    source: Option<Arc<dyn DynamicSource>>,
    events: EventBus,
}

impl Resolver {
    /// Build a resolver from the static rules in `options`.
    ///
    /// A malformed pattern is a configuration error and fails construction.
    pub fn new(options: RedirectOptions) -> Result<Self, RegistrationError> {
        let table = RouteTable::from_static(&options.routes, &options.vhosts)?;
        tracing::info!(
            rules = table.len(),
            default_status = %options.status_code,
            mode = ?options.mode,
            "Redirect table loaded"
        );
        Ok(Self {
            options: Arc::new(options),
            table: SharedRouteTable::new(table),
            source: None,
            events: EventBus::new(),
        })
    }

    pub fn with_dynamic_source(mut self, source: Arc<dyn DynamicSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn options(&self) -> &RedirectOptions {
        &self.options
    }

    pub fn has_dynamic_source(&self) -> bool {
        self.source.is_some()
    }

    /// Current table snapshot.
    pub fn table(&self) -> Arc<RouteTable> {
        self.table.snapshot()
    }

    pub fn subscribe(&self, listener: impl RedirectListener + 'static) {
        self.events.subscribe(Arc::new(listener));
    }

    /// Add rules at runtime. Fails loudly, and installs nothing, if any key
    /// is already registered.
    pub fn register(&self, batch: &RouteBatch) -> Result<(), RegistrationError> {
        match self.table.register_additional(batch) {
            Ok(()) => {
                tracing::info!(
                    redirects = batch.redirects.len(),
                    vhosts = batch.vhosts.len(),
                    "Additional redirects registered"
                );
                Ok(())
            }
            Err(RegistrationError::Duplicate(keys)) => {
                tracing::error!(keys = %keys_list(&keys), "Duplicate redirect registration rejected");
                metrics::record_duplicate_routes();
                self.events.emit(&RedirectEvent::Duplicate { keys: keys.clone() });
                Err(RegistrationError::Duplicate(keys))
            }
            Err(e) => Err(e),
        }
    }

    /// True if a tentative response should be resolved at all.
    ///
    /// Only a 404 qualifies, whether it is a normal response or a framework
    /// error response.
    pub fn warrants_resolution(&self, response: &dyn ResponseInspector) -> bool {
        response.status() == axum::http::StatusCode::NOT_FOUND
    }

    /// Full interception pass for a tentative response.
    pub async fn intercept(
        &self,
        response: &(dyn ResponseInspector + Sync),
        request: &RequestContext,
    ) -> Resolution {
        if !self.warrants_resolution(response) {
            if self.options.verbose {
                tracing::debug!(
                    status = %response.status(),
                    error = response.is_error(),
                    path = %request.path,
                    "Response is not a 404, passing through"
                );
            }
            return Resolution::Passthrough;
        }
        self.resolve(request).await
    }

    /// Resolve a request that would otherwise 404.
    pub async fn resolve(&self, request: &RequestContext) -> Resolution {
        let start = Instant::now();
        let resolution = self.resolve_with_overlay(request).await;
        metrics::record_resolve_duration(start);
        resolution
    }

    async fn resolve_with_overlay(&self, request: &RequestContext) -> Resolution {
        // Fetch first; the table snapshot is taken only once rules are in hand.
        let overlay = match &self.source {
            Some(source) => fetch_overlay(source.as_ref(), &self.options).await,
            None => None,
        };

        let table = self.table.snapshot();
        if let Some(overlay) = &overlay {
            let keys = table.collisions(overlay);
            if !keys.is_empty() {
                tracing::error!(
                    keys = %keys_list(&keys),
                    path = %request.path,
                    "Dynamic redirects collide with registered routes"
                );
                metrics::record_duplicate_routes();
                self.events.emit(&RedirectEvent::Duplicate { keys: keys.clone() });
                return Resolution::Failed(ResolveError::Duplicate(keys));
            }
        }

        match table.find(&request.path, request.host.as_deref(), overlay.as_ref()) {
            Some(matched) => self.emit(&matched, request, true),
            None => self.miss(request),
        }
    }

    /// Resolve through an eagerly installed route: registered rules only,
    /// no 404 gate.
    pub fn resolve_installed(&self, request: &RequestContext) -> Resolution {
        let start = Instant::now();
        let table = self.table.snapshot();
        let resolution = match table.find(&request.path, request.host.as_deref(), None) {
            Some(matched) => self.emit(&matched, request, self.options.append_query_string),
            None => self.miss(request),
        };
        metrics::record_resolve_duration(start);
        resolution
    }

    /// Turn a match into a decision and announce it.
    pub fn emit(&self, matched: &MatchResult, request: &RequestContext, append_query: bool) -> Resolution {
        let spec = &matched.route.spec;
        if spec.destination().trim().is_empty() {
            tracing::error!(route = %matched.key, "Redirect route has no destination");
            return Resolution::Failed(ResolveError::MissingTarget(matched.key.to_string()));
        }

        let destination = substitute(spec.destination(), &matched.params);
        let request_query: &[(String, String)] = if append_query { &request.query } else { &[] };
        let location = compose_location(&destination, request_query);
        let status = spec.status().unwrap_or(self.options.status_code);

        if self.options.log {
            tracing::info!(
                remote_address = ?request.remote_addr,
                host = ?request.host,
                user_agent = ?request.user_agent,
                referrer = ?request.referrer,
                route = %matched.key,
                from = %request.original_url(),
                to = %location,
                status = %status,
                "Redirect"
            );
        }
        if self.options.verbose {
            tracing::debug!(params = ?matched.params, "Redirect params captured");
        }
        metrics::record_redirect(status.as_u16());

        self.events.emit(&RedirectEvent::Redirected {
            from: request.original_url(),
            location: location.clone(),
            status: status.as_u16(),
            host: request.host.clone(),
            route: matched.key.to_string(),
        });
        Resolution::Redirect(RedirectDecision { status, location })
    }

    fn miss(&self, request: &RequestContext) -> Resolution {
        if self.options.log404 {
            tracing::info!(
                path = %request.path,
                host = ?request.host,
                referrer = ?request.referrer,
                "No redirect found"
            );
        }
        metrics::record_miss();
        self.events.emit(&RedirectEvent::Missed {
            path: request.path.clone(),
            host: request.host.clone(),
        });
        Resolution::Passthrough
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("rules", &self.table.snapshot().len())
            .field("dynamic_source", &self.source.is_some())
            .field("events", &self.events)
            .finish()
    }
}
