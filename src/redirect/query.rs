//! Query-string merging and `Location` composition.
//!
//! The request query is laid down first, then the destination's own query
//! overlays it key by key. Keys are emitted in sorted order so the same
//! inputs always produce the same location.

use std::collections::BTreeMap;

use url::{form_urlencoded, Url};

/// Parse a raw query string (without `?`) into ordered pairs.
pub fn parse_query(raw: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}

/// Merge request pairs with destination pairs; destination keys replace
/// every request value for the same key.
pub fn merge_queries(
    request: &[(String, String)],
    destination: &[(String, String)],
) -> BTreeMap<String, Vec<String>> {
    let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in request {
        merged.entry(key.clone()).or_default().push(value.clone());
    }

    let mut overlaid: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (key, value) in destination {
        overlaid.entry(key.as_str()).or_default().push(value.clone());
    }
    for (key, values) in overlaid {
        merged.insert(key.to_string(), values);
    }
    merged
}

fn encode(merged: &BTreeMap<String, Vec<String>>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, values) in merged {
        for value in values {
            serializer.append_pair(key, value);
        }
    }
    serializer.finish()
}

/// Build the final `Location` from a rendered destination and the request
/// query pairs.
///
/// `http`/`https` destinations are kept absolute; anything else is reduced
/// to its path, query and fragment.
pub fn compose_location(destination: &str, request_query: &[(String, String)]) -> String {
    if let Ok(mut url) = Url::parse(destination) {
        let own = parse_query(url.query().unwrap_or_default());
        let merged = merge_queries(request_query, &own);
        let query = encode(&merged);
        url.set_query((!query.is_empty()).then_some(query.as_str()));

        if matches!(url.scheme(), "http" | "https") {
            return url.to_string();
        }
        let mut location = url.path().to_string();
        if let Some(query) = url.query() {
            location.push('?');
            location.push_str(query);
        }
        return location;
    }

    let (rest, fragment) = match destination.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (destination, None),
    };
    let (path, own_query) = match rest.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (rest, Vec::new()),
    };

    let merged = merge_queries(request_query, &own_query);
    let mut location = path.to_string();
    if !merged.is_empty() {
        location.push('?');
        location.push_str(&encode(&merged));
    }
    if let Some(fragment) = fragment {
        location.push('#');
        location.push_str(fragment);
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(raw: &str) -> Vec<(String, String)> {
        parse_query(raw)
    }

    #[test]
    fn test_plain_destination() {
        assert_eq!(compose_location("/it/works", &[]), "/it/works");
    }

    #[test]
    fn test_destination_query_kept() {
        assert_eq!(compose_location("/it/works?test=1", &[]), "/it/works?test=1");
    }

    #[test]
    fn test_request_query_merged_in_sorted_order() {
        assert_eq!(
            compose_location("/it/works?test=1", &q("moniker=hugo")),
            "/it/works?moniker=hugo&test=1"
        );
        assert_eq!(
            compose_location("/to/test", &q("query=1")),
            "/to/test?query=1"
        );
    }

    #[test]
    fn test_destination_wins_on_collision() {
        assert_eq!(
            compose_location("/x?a=dest", &q("a=req&a=req2&b=2")),
            "/x?a=dest&b=2"
        );
    }

    #[test]
    fn test_repeated_request_keys_survive() {
        assert_eq!(compose_location("/x", &q("a=1&a=2")), "/x?a=1&a=2");
    }

    #[test]
    fn test_absolute_destination() {
        assert_eq!(
            compose_location("https://example.com/landing?src=old", &q("utm=mail")),
            "https://example.com/landing?src=old&utm=mail"
        );
        assert_eq!(
            compose_location("http://example.com/a", &[]),
            "http://example.com/a"
        );
    }

    #[test]
    fn test_non_http_scheme_reduced_to_path() {
        assert_eq!(compose_location("ftp://files.example.com/pub?x=1", &[]), "/pub?x=1");
    }

    #[test]
    fn test_fragment_stays_last() {
        assert_eq!(compose_location("/doc#intro", &q("a=1")), "/doc?a=1#intro");
    }

    #[test]
    fn test_values_are_encoded() {
        assert_eq!(compose_location("/s", &q("q=a%20b%26c")), "/s?q=a+b%26c");
    }
}
