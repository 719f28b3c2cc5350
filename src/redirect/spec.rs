//! Redirect specifications and status codes.
//!
//! A spec is either a bare destination string or a record carrying its own
//! status code. Both shapes deserialize from TOML and JSON without a tag.

use std::collections::BTreeMap;
use std::fmt;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Pattern → spec, iterated in pattern order.
pub type RouteMap = BTreeMap<String, RedirectSpec>;

/// Host → (pattern → spec).
pub type VhostMap = BTreeMap<String, RouteMap>;

/// A redirect status code, normalized at load time.
///
/// Accepts any 3xx redirect code as a number, or the symbolic names
/// `"temporary"` (302) and `"permanent"` (301).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "RawStatus", into = "u16")]
pub struct RedirectStatus(u16);

impl RedirectStatus {
    pub const PERMANENT: RedirectStatus = RedirectStatus(301);
    pub const TEMPORARY: RedirectStatus = RedirectStatus(302);

    /// Validate a numeric code. Only redirection codes that carry a
    /// `Location` header are accepted.
    pub fn new(code: u16) -> Result<Self, InvalidStatus> {
        match code {
            300..=303 | 307 | 308 => Ok(Self(code)),
            other => Err(InvalidStatus(other.to_string())),
        }
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn as_status_code(self) -> StatusCode {
        StatusCode::from_u16(self.0).unwrap_or(StatusCode::MOVED_PERMANENTLY)
    }
}

impl Default for RedirectStatus {
    fn default() -> Self {
        Self::PERMANENT
    }
}

impl fmt::Display for RedirectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RedirectStatus> for u16 {
    fn from(status: RedirectStatus) -> u16 {
        status.0
    }
}

impl std::str::FromStr for RedirectStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temporary" => Ok(Self::TEMPORARY),
            "permanent" => Ok(Self::PERMANENT),
            other => other
                .parse::<u16>()
                .map_err(|_| InvalidStatus(s.to_string()))
                .and_then(Self::new),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Code(u16),
    Name(String),
}

impl TryFrom<RawStatus> for RedirectStatus {
    type Error = InvalidStatus;

    fn try_from(raw: RawStatus) -> Result<Self, Self::Error> {
        match raw {
            RawStatus::Code(code) => Self::new(code),
            RawStatus::Name(name) => name.parse(),
        }
    }
}

/// A status value that is neither a redirect code nor a known name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid redirect status code: {0} (expected 301, 302, 303, 307, 308, \"temporary\" or \"permanent\")")]
pub struct InvalidStatus(pub String);

/// Where a matched request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RedirectSpec {
    /// Bare destination; status falls back to the configured default.
    Literal(String),
    /// Destination with an optional per-route status.
    WithStatus {
        destination: String,
        #[serde(
            default,
            alias = "statusCode",
            skip_serializing_if = "Option::is_none"
        )]
        status_code: Option<RedirectStatus>,
    },
}

impl RedirectSpec {
    pub fn destination(&self) -> &str {
        match self {
            RedirectSpec::Literal(destination) => destination,
            RedirectSpec::WithStatus { destination, .. } => destination,
        }
    }

    pub fn status(&self) -> Option<RedirectStatus> {
        match self {
            RedirectSpec::Literal(_) => None,
            RedirectSpec::WithStatus { status_code, .. } => *status_code,
        }
    }
}

impl From<&str> for RedirectSpec {
    fn from(destination: &str) -> Self {
        RedirectSpec::Literal(destination.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic_status_names() {
        assert_eq!("temporary".parse::<RedirectStatus>().unwrap().as_u16(), 302);
        assert_eq!("permanent".parse::<RedirectStatus>().unwrap().as_u16(), 301);
        assert_eq!("307".parse::<RedirectStatus>().unwrap().as_u16(), 307);
        assert!("sometimes".parse::<RedirectStatus>().is_err());
        assert!(RedirectStatus::new(200).is_err());
        assert_eq!(RedirectStatus::default().as_u16(), 301);
    }

    #[test]
    fn test_spec_shapes_from_json() {
        let map: RouteMap = serde_json::from_str(
            r#"{
                "/a": "/it/works",
                "/b": { "destination": "/newtest", "statusCode": 302 },
                "/c": { "destination": "/other", "status_code": "temporary" },
                "/d": { "destination": "/plain" }
            }"#,
        )
        .unwrap();

        assert_eq!(map["/a"], RedirectSpec::Literal("/it/works".into()));
        assert_eq!(map["/b"].destination(), "/newtest");
        assert_eq!(map["/b"].status(), Some(RedirectStatus::TEMPORARY));
        assert_eq!(map["/c"].status(), Some(RedirectStatus::TEMPORARY));
        assert_eq!(map["/d"].status(), None);
    }

    #[test]
    fn test_invalid_status_rejected_at_parse() {
        let res: Result<RouteMap, _> =
            serde_json::from_str(r#"{ "/a": { "destination": "/x", "statusCode": 200 } }"#);
        assert!(res.is_err());
    }
}
