//! Narrow interfaces to the host HTTP framework.
//!
//! The engine reads a tentative response through [`ResponseInspector`] and
//! installs exact-match routes through [`RouteInstaller`]; the axum
//! implementations live in `crate::http`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::redirect::pattern::PathPattern;
use crate::redirect::query::parse_query;
use crate::redirect::resolver::Resolver;

/// Read access to the response the host is about to send.
pub trait ResponseInspector {
    /// Status of the tentative response, whether it came from a handler or
    /// from the framework's own error path.
    fn status(&self) -> StatusCode;

    /// True if the framework produced this response as an error.
    fn is_error(&self) -> bool {
        self.status().is_client_error() || self.status().is_server_error()
    }
}

impl ResponseInspector for StatusCode {
    fn status(&self) -> StatusCode {
        *self
    }
}

/// Registers an exact route for one pattern at startup.
pub trait RouteInstaller {
    fn install(&mut self, pattern: &PathPattern, resolver: Arc<Resolver>);
}

/// The parts of an inbound request the engine looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub path: String,
    pub host: Option<String>,
    pub query: Vec<(String, String)>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the query from its raw form, without the leading `?`.
    pub fn with_raw_query(mut self, raw: &str) -> Self {
        self.query = parse_query(raw);
        self
    }

    /// Path plus query, as the client asked for it.
    pub fn original_url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        format!("{}?{}", self.path, query)
    }
}
