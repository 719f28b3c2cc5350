//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every redirect pattern and report the broken ones
//! - Validate addresses and URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RedirectorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{RedirectorConfig, PLACEHOLDER_API_KEY};
use crate::redirect::pattern::PathPattern;
use crate::redirect::spec::RouteMap;
use crate::redirect::table::RouteTable;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &RedirectorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address {:?}", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let redirects = &config.redirects;
    check_patterns("redirects.routes", &redirects.routes, &mut errors);
    let mut hosts = HashSet::new();
    for (host, routes) in &redirects.vhosts {
        if host.trim().is_empty() {
            errors.push(ValidationError::new("redirects.vhosts", "host must not be empty"));
        }
        if !hosts.insert(host.to_ascii_lowercase()) {
            errors.push(ValidationError::new(
                "redirects.vhosts",
                format!("host {host:?} is configured more than once (hosts are case-insensitive)"),
            ));
        }
        check_patterns(&format!("redirects.vhosts.{host:?}"), routes, &mut errors);
    }

    // Pattern errors are already reported; this catches `test` vs `/test`.
    if errors.is_empty() {
        if let Err(e) = RouteTable::from_static(&redirects.routes, &redirects.vhosts) {
            errors.push(ValidationError::new("redirects", e.to_string()));
        }
    }

    if let Some(source) = &redirects.dynamic_source_url {
        match url::Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::new(
                "redirects.dynamic_source_url",
                format!("expected an http(s) URL, got {source:?}"),
            )),
        }
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be set when the admin API is enabled",
            ));
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("invalid socket address {:?}", config.admin.bind_address),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_patterns(field: &str, routes: &RouteMap, errors: &mut Vec<ValidationError>) {
    for pattern in routes.keys() {
        if let Err(e) = PathPattern::parse(pattern) {
            errors.push(ValidationError::new(field, e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirect::spec::RedirectSpec;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RedirectorConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = RedirectorConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.redirects.routes.insert("/{broken".into(), RedirectSpec::from("/x"));
        config.redirects.routes.insert("/{a*}/tail".into(), RedirectSpec::from("/x"));
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.field == "admin.api_key"));
    }

    #[test]
    fn test_two_spellings_of_one_pattern() {
        let mut config = RedirectorConfig::default();
        config.redirects.routes.insert("/test".into(), RedirectSpec::from("/a"));
        config.redirects.routes.insert("test".into(), RedirectSpec::from("/b"));
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "redirects");
    }

    #[test]
    fn test_dynamic_source_must_be_http() {
        let mut config = RedirectorConfig::default();
        config.redirects.dynamic_source_url = Some("file:///etc/redirects.json".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_case_variant_hosts_reported() {
        let mut config = RedirectorConfig::default();
        config.redirects.vhosts.insert(
            "A.example".into(),
            [("/a".to_string(), RedirectSpec::from("/x"))].into_iter().collect(),
        );
        config.redirects.vhosts.insert(
            "a.example".into(),
            [("/b".to_string(), RedirectSpec::from("/y"))].into_iter().collect(),
        );
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "redirects.vhosts");
        assert!(errors[0].message.contains("a.example"));
    }
}
