//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! redirector. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

use crate::redirect::spec::{RedirectStatus, RouteMap, VhostMap};

/// Root configuration for the redirector.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RedirectorConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Redirect rules and resolution behaviour.
    pub redirects: RedirectOptions,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Timeout for the HTTP dynamic redirect source in seconds.
    pub dynamic_source_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            dynamic_source_secs: 5,
        }
    }
}

/// How static redirects are wired into the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMode {
    /// Resolve only when the tentative response is a 404.
    #[default]
    Intercept,
    /// Install one route per static pattern at startup.
    Eager,
}

/// Redirect rules and the options handed to dynamic sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectOptions {
    /// Default status when a rule does not set one.
    #[serde(alias = "statusCode")]
    pub status_code: RedirectStatus,

    /// Whether eager routes append the request query string.
    #[serde(alias = "appendQueryString")]
    pub append_query_string: bool,

    /// Log every redirect issued.
    pub log: bool,

    /// Log every 404 that found no redirect.
    pub log404: bool,

    /// Log matcher and dynamic-source details.
    pub verbose: bool,

    pub mode: RedirectMode,

    /// Host-less rules: pattern → spec.
    pub routes: RouteMap,

    /// Host-scoped rules: host → (pattern → spec).
    pub vhosts: VhostMap,

    /// Endpoint returning extra rules as JSON on every 404.
    pub dynamic_source_url: Option<String>,
}

impl Default for RedirectOptions {
    fn default() -> Self {
        Self {
            status_code: RedirectStatus::PERMANENT,
            append_query_string: true,
            log: false,
            log404: false,
            verbose: false,
            mode: RedirectMode::Intercept,
            routes: RouteMap::new(),
            vhosts: VhostMap::new(),
            dynamic_source_url: None,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
