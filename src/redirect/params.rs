//! Placeholder substitution for destination templates.
//!
//! Captured path parameters are written into the destination by name.
//! `{name}`, `{name?}` and `{name*}` are replaced literally, and the
//! multi-segment form `{name*K}` is located by pattern. Values are inserted
//! as-is; encoding happens when the location is composed.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static MULTI_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{([a-z][a-z0-9_]*)\*(\d+)\}").expect("multi-segment placeholder regex")
});

/// Parameters captured by a path match, in capture order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Render `template` with every parameter in `params`.
///
/// Parameters are applied in iteration order. A name with no placeholder in
/// the template is a no-op, so a template without placeholders comes back
/// unchanged.
pub fn substitute(template: &str, params: &Params) -> String {
    let mut rendered = template.to_string();
    for (name, value) in params.iter() {
        rendered = substitute_one(&rendered, name, value);
    }
    rendered
}

fn substitute_one(template: &str, name: &str, value: &str) -> String {
    if !template.contains('{') {
        return template.to_string();
    }

    let replaced = template
        .replace(&format!("{{{name}}}"), value)
        .replace(&format!("{{{name}?}}"), value)
        .replace(&format!("{{{name}*}}"), value);

    MULTI_SEGMENT
        .replace_all(&replaced, |caps: &Captures<'_>| {
            if &caps[1] == name {
                value.to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}
