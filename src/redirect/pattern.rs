//! Path pattern compilation.
//!
//! # Grammar
//! ```text
//! /literal            exact segment
//! /{name}             one non-empty segment
//! /{name?}            optional last segment
//! /{name*N}           exactly N non-empty segments, joined with '/'
//! /{name*}  or  /*    every remaining segment (may be empty)
//! ```
//!
//! # Design Decisions
//! - A placeholder must occupy a whole segment
//! - Optional and open wildcard segments are only allowed last
//! - Specificity is computed once at compile time

use std::fmt;

use crate::redirect::params::Params;

/// Error raised for a pattern that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed pattern {pattern:?}: {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: String,
}

impl PatternError {
    fn new(pattern: &str, reason: impl Into<String>) -> Self {
        Self {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// One segment of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Optional(String),
    Multi { name: String, count: usize },
    Wildcard(Option<String>),
}

impl Segment {
    /// Lower ranks are more specific.
    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 0,
            Segment::Param(_) => 1,
            Segment::Optional(_) => 2,
            Segment::Multi { .. } => 3,
            Segment::Wildcard(_) => 4,
        }
    }
}

/// Ordering key for patterns; `Ord` puts the most specific first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(Vec<u8>);

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    specificity: Specificity,
}

/// Add the leading '/' a pattern may have been configured without.
pub fn normalize(pattern: &str) -> String {
    let trimmed = pattern.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

impl PathPattern {
    /// Compile a pattern, normalizing a missing leading slash.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let raw = normalize(pattern);
        let body = &raw[1..];

        let parts: Vec<&str> = body.split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<String> = Vec::new();

        for (i, part) in parts.iter().enumerate() {
            let segment = parse_segment(&raw, part)?;
            match &segment {
                Segment::Optional(_) | Segment::Wildcard(_) if i != last => {
                    return Err(PatternError::new(
                        &raw,
                        format!("segment {part:?} is only allowed at the end"),
                    ));
                }
                Segment::Param(name)
                | Segment::Optional(name)
                | Segment::Multi { name, .. }
                | Segment::Wildcard(Some(name)) => {
                    if names.contains(name) {
                        return Err(PatternError::new(
                            &raw,
                            format!("parameter {name:?} is used twice"),
                        ));
                    }
                    names.push(name.clone());
                }
                _ => {}
            }
            segments.push(segment);
        }

        let specificity = Specificity(segments.iter().map(Segment::rank).collect());
        Ok(Self {
            raw,
            segments,
            specificity,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn specificity(&self) -> &Specificity {
        &self.specificity
    }

    /// Match a request path, returning the captured parameters.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let body = path.strip_prefix('/')?;
        let parts: Vec<&str> = body.split('/').collect();
        let mut params = Params::new();
        let mut pos = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    if parts.get(pos) != Some(&lit.as_str()) {
                        return None;
                    }
                    pos += 1;
                }
                Segment::Param(name) => {
                    let value = parts.get(pos).filter(|v| !v.is_empty())?;
                    params.insert(name.as_str(), *value);
                    pos += 1;
                }
                Segment::Optional(name) => {
                    let value = parts.get(pos).copied();
                    params.insert(name.as_str(), value.unwrap_or(""));
                    if value.is_some() {
                        pos += 1;
                    }
                }
                Segment::Multi { name, count } => {
                    let taken = parts.get(pos..pos + count)?;
                    if taken.iter().any(|v| v.is_empty()) {
                        return None;
                    }
                    params.insert(name.as_str(), taken.join("/"));
                    pos += count;
                }
                Segment::Wildcard(name) => {
                    let rest = parts.get(pos..).unwrap_or(&[]).join("/");
                    if let Some(name) = name {
                        params.insert(name.as_str(), rest);
                    }
                    pos = parts.len();
                }
            }
        }

        (pos == parts.len()).then_some(params)
    }

    /// Path shapes understood by an exact-match router (`{p0}`, `{*rest}`).
    ///
    /// Parameter names are positional so that patterns of the same shape
    /// translate to the same route. An optional last segment yields two
    /// shapes.
    pub fn router_paths(&self) -> Vec<String> {
        let mut base = Vec::new();
        let mut next = 0usize;
        let mut positional = || {
            let name = format!("{{p{next}}}");
            next += 1;
            name
        };

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => base.push(lit.clone()),
                Segment::Param(_) => base.push(positional()),
                Segment::Multi { count, .. } => {
                    for _ in 0..*count {
                        base.push(positional());
                    }
                }
                Segment::Optional(_) => {
                    let without = join_path(&base);
                    base.push(positional());
                    return vec![without, join_path(&base)];
                }
                Segment::Wildcard(_) => {
                    let without = join_path(&base);
                    base.push("{*rest}".to_string());
                    return vec![without, join_path(&base)];
                }
            }
        }
        vec![join_path(&base)]
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn join_path(parts: &[String]) -> String {
    format!("/{}", parts.join("/"))
}

fn parse_segment(raw: &str, part: &str) -> Result<Segment, PatternError> {
    if part == "*" {
        return Ok(Segment::Wildcard(None));
    }

    let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) else {
        if part.contains('{') || part.contains('}') {
            return Err(PatternError::new(
                raw,
                format!("placeholder in {part:?} must fill the whole segment"),
            ));
        }
        return Ok(Segment::Literal(part.to_string()));
    };

    let (name, modifier) = match inner.find(['?', '*']) {
        Some(idx) => (&inner[..idx], &inner[idx..]),
        None => (inner, ""),
    };
    validate_name(raw, name)?;
    let name = name.to_string();

    match modifier {
        "" => Ok(Segment::Param(name)),
        "?" => Ok(Segment::Optional(name)),
        "*" => Ok(Segment::Wildcard(Some(name))),
        _ => {
            let count = modifier[1..]
                .parse::<usize>()
                .ok()
                .filter(|c| *c > 0 && modifier.starts_with('*'))
                .ok_or_else(|| {
                    PatternError::new(raw, format!("invalid placeholder modifier in {part:?}"))
                })?;
            Ok(Segment::Multi { name, count })
        }
    }
}

fn validate_name(raw: &str, name: &str) -> Result<(), PatternError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PatternError::new(
            raw,
            format!("invalid parameter name {name:?}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(pattern: &str, path: &str) -> Option<Vec<(String, String)>> {
        PathPattern::parse(pattern)
            .unwrap()
            .captures(path)
            .map(|p| p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_literal_and_root() {
        assert_eq!(capture("/test", "/test"), Some(vec![]));
        assert_eq!(capture("/test", "/test/more"), None);
        assert_eq!(capture("/", "/"), Some(vec![]));
        assert_eq!(capture("/", "/test"), None);
        assert_eq!(capture("test", "/test"), Some(vec![]));
    }

    #[test]
    fn test_single_and_optional() {
        assert_eq!(
            capture("/from/{param}", "/from/myParam"),
            Some(vec![("param".into(), "myParam".into())])
        );
        assert_eq!(capture("/from/{param}", "/from/"), None);
        assert_eq!(
            capture("/from/{param?}", "/from"),
            Some(vec![("param".into(), "".into())])
        );
        assert_eq!(
            capture("/from/{param?}", "/from/x"),
            Some(vec![("param".into(), "x".into())])
        );
        assert_eq!(capture("/from/{param?}", "/from/x/y"), None);
    }

    #[test]
    fn test_multi_segment_exact_count() {
        assert_eq!(
            capture("/test/{param*2}", "/test/param1/param2"),
            Some(vec![("param".into(), "param1/param2".into())])
        );
        assert_eq!(capture("/test/{param*2}", "/test/param1"), None);
        assert_eq!(capture("/test/{param*2}", "/test/a/b/c"), None);
    }

    #[test]
    fn test_wildcard_takes_rest() {
        assert_eq!(
            capture("/{params*}", "/some/params/here"),
            Some(vec![("params".into(), "some/params/here".into())])
        );
        assert_eq!(capture("/*", "/anything/at/all"), Some(vec![]));
    }

    #[test]
    fn test_malformed_patterns() {
        assert!(PathPattern::parse("/{}").is_err());
        assert!(PathPattern::parse("/{1abc}").is_err());
        assert!(PathPattern::parse("/{a*}/b").is_err());
        assert!(PathPattern::parse("/{a?}/b").is_err());
        assert!(PathPattern::parse("/{a*0}").is_err());
        assert!(PathPattern::parse("/x{a}").is_err());
        assert!(PathPattern::parse("/{a}/{a}").is_err());
        assert!(PathPattern::parse("/{a").is_err());
    }

    #[test]
    fn test_specificity_order() {
        let lit = PathPattern::parse("/test/x").unwrap();
        let param = PathPattern::parse("/test/{p}").unwrap();
        let wild = PathPattern::parse("/test/{p*}").unwrap();
        assert!(lit.specificity() < param.specificity());
        assert!(param.specificity() < wild.specificity());
    }

    #[test]
    fn test_router_paths() {
        let p = PathPattern::parse("/test/{param*2}").unwrap();
        assert_eq!(p.router_paths(), vec!["/test/{p0}/{p1}"]);
        let p = PathPattern::parse("/a/{x?}").unwrap();
        assert_eq!(p.router_paths(), vec!["/a", "/a/{p0}"]);
        let p = PathPattern::parse("/{rest*}").unwrap();
        assert_eq!(p.router_paths(), vec!["/", "/{*rest}"]);
    }
}
