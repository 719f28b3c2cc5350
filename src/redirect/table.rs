//! Route table: (virtual host, pattern) → redirect spec.
//!
//! # Responsibilities
//! - Compile and store static rules, partitioned by host
//! - Merge runtime batches all-or-nothing, rejecting duplicates
//! - Find the most specific match for a path, vhost rules first
//!
//! # Design Decisions
//! - A table value is immutable; `SharedRouteTable` swaps whole snapshots
//! - Writers are serialized, readers never block
//! - Host keys are lowercase; a request host is tried with and without port

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::redirect::params::Params;
use crate::redirect::pattern::{normalize, PathPattern, PatternError, Specificity};
use crate::redirect::spec::{RedirectSpec, RouteMap, VhostMap};

/// Identifies one rule: host scope (`None` = any host) plus pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RouteKey {
    pub vhost: Option<String>,
    pub pattern: String,
}

impl RouteKey {
    pub fn new(vhost: Option<&str>, pattern: &str) -> Self {
        Self {
            vhost: vhost.map(|h| h.to_ascii_lowercase()),
            pattern: normalize(pattern),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.vhost {
            Some(host) => write!(f, "{}{}", host, self.pattern),
            None => f.write_str(&self.pattern),
        }
    }
}

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("duplicate redirect routes: {}", keys_list(.0))]
    Duplicate(Vec<RouteKey>),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

pub(crate) fn keys_list(keys: &[RouteKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A batch of rules to register, in either scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteBatch {
    pub redirects: RouteMap,
    pub vhosts: VhostMap,
}

impl RouteBatch {
    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty() && self.vhosts.values().all(|m| m.is_empty())
    }
}

/// A compiled rule.
#[derive(Debug)]
pub struct Route {
    pub pattern: PathPattern,
    pub spec: RedirectSpec,
}

/// Rules for one host scope, kept in specificity order.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    ranked: Vec<Arc<Route>>,
}

impl Partition {
    /// Compile a pattern map. Two spellings of one pattern (`test` and
    /// `/test`) are a duplicate.
    pub fn compile(vhost: Option<&str>, routes: &RouteMap) -> Result<Self, RegistrationError> {
        let mut partition = Partition::default();
        let mut duplicates = Vec::new();
        for (pattern, spec) in routes {
            let pattern = PathPattern::parse(pattern)?;
            if partition.get(pattern.as_str()).is_some() {
                duplicates.push(RouteKey::new(vhost, pattern.as_str()));
                continue;
            }
            partition.push(Route {
                pattern,
                spec: spec.clone(),
            });
        }
        if !duplicates.is_empty() {
            return Err(RegistrationError::Duplicate(duplicates));
        }
        Ok(partition)
    }

    fn push(&mut self, route: Route) {
        self.ranked_insert(Arc::new(route));
    }

    fn ranked_insert(&mut self, route: Arc<Route>) {
        let at = self
            .ranked
            .partition_point(|r| rank_key(r) <= rank_key(&route));
        self.ranked.insert(at, route);
    }

    pub fn get(&self, pattern: &str) -> Option<&Arc<Route>> {
        self.ranked.iter().find(|r| r.pattern.as_str() == pattern)
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.ranked.iter()
    }

    /// First (most specific) route that captures `path`.
    fn best(&self, path: &str) -> Option<(&Arc<Route>, Params)> {
        self.ranked
            .iter()
            .find_map(|route| route.pattern.captures(path).map(|params| (route, params)))
    }
}

fn rank_key(route: &Route) -> (&Specificity, &str) {
    (route.pattern.specificity(), route.pattern.as_str())
}

/// A successful match; lives for a single resolution pass.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub key: RouteKey,
    pub route: Arc<Route>,
    pub params: Params,
}

impl MatchResult {
    pub fn pattern(&self) -> &str {
        &self.key.pattern
    }
}

/// Immutable snapshot of every registered rule.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    default: Partition,
    vhosts: HashMap<String, Partition>,
}

impl RouteTable {
    /// Build the startup table. Any malformed pattern fails the whole table.
    pub fn from_static(redirects: &RouteMap, vhosts: &VhostMap) -> Result<Self, RegistrationError> {
        Self::default().merged(&RouteBatch {
            redirects: redirects.clone(),
            vhosts: vhosts.clone(),
        })
    }

    /// Return a new table with `batch` added.
    ///
    /// Fails without side effects if any key in the batch already exists.
    pub fn merged(&self, batch: &RouteBatch) -> Result<Self, RegistrationError> {
        let incoming_default = Partition::compile(None, &batch.redirects)?;
        let mut incoming_vhosts: BTreeMap<String, Partition> = BTreeMap::new();
        let mut duplicates = Vec::new();
        for (host, routes) in &batch.vhosts {
            let host = host.to_ascii_lowercase();
            let partition = Partition::compile(Some(host.as_str()), routes)?;
            match incoming_vhosts.entry(host) {
                Entry::Vacant(slot) => {
                    slot.insert(partition);
                }
                // `A.example` and `a.example` share one scope.
                Entry::Occupied(mut slot) => {
                    let host = slot.key().clone();
                    let scope = slot.get_mut();
                    for route in partition.ranked {
                        if scope.get(route.pattern.as_str()).is_some() {
                            duplicates.push(RouteKey::new(Some(host.as_str()), route.pattern.as_str()));
                        } else {
                            scope.ranked_insert(route);
                        }
                    }
                }
            }
        }

        duplicates.extend(
            incoming_default
                .routes()
                .filter(|r| self.default.get(r.pattern.as_str()).is_some())
                .map(|r| RouteKey::new(None, r.pattern.as_str())),
        );
        for (host, partition) in &incoming_vhosts {
            if let Some(existing) = self.vhosts.get(host) {
                duplicates.extend(
                    partition
                        .routes()
                        .filter(|r| existing.get(r.pattern.as_str()).is_some())
                        .map(|r| RouteKey::new(Some(host.as_str()), r.pattern.as_str())),
                );
            }
        }
        if !duplicates.is_empty() {
            duplicates.sort();
            return Err(RegistrationError::Duplicate(duplicates));
        }

        let mut next = self.clone();
        for route in incoming_default.ranked {
            next.default.ranked_insert(route);
        }
        for (host, partition) in incoming_vhosts {
            let scope = next.vhosts.entry(host).or_default();
            for route in partition.ranked {
                scope.ranked_insert(route);
            }
        }
        Ok(next)
    }

    pub fn lookup(&self, vhost: Option<&str>, pattern: &str) -> Option<&RedirectSpec> {
        let pattern = normalize(pattern);
        let partition = match vhost {
            Some(host) => self.vhosts.get(&host.to_ascii_lowercase())?,
            None => &self.default,
        };
        partition.get(&pattern).map(|r| &r.spec)
    }

    /// Keys in any scope whose pattern also appears in `overlay`.
    ///
    /// Dynamic rules carry no host, so a pattern present under any vhost
    /// counts as a collision too.
    pub fn collisions(&self, overlay: &Partition) -> Vec<RouteKey> {
        let mut keys = Vec::new();
        for route in overlay.routes() {
            let pattern = route.pattern.as_str();
            if self.default.get(pattern).is_some() {
                keys.push(RouteKey::new(None, pattern));
            }
            for (host, partition) in &self.vhosts {
                if partition.get(pattern).is_some() {
                    keys.push(RouteKey::new(Some(host.as_str()), pattern));
                }
            }
        }
        keys.sort();
        keys
    }

    /// Find the rule for `path` requested on `host`.
    ///
    /// A rule scoped to the request host wins over host-less rules. Among
    /// host-less rules and `overlay`, the most specific pattern wins.
    pub fn find(&self, path: &str, host: Option<&str>, overlay: Option<&Partition>) -> Option<MatchResult> {
        if let Some((scope, partition)) = host.and_then(|h| self.vhost_partition(h)) {
            if let Some((route, params)) = partition.best(path) {
                return Some(MatchResult {
                    key: RouteKey::new(Some(scope), route.pattern.as_str()),
                    route: route.clone(),
                    params,
                });
            }
        }

        let from_static = self.default.best(path);
        let from_overlay = overlay.and_then(|o| o.best(path));
        let (route, params) = match (from_static, from_overlay) {
            (Some(a), Some(b)) => {
                if rank_key(b.0) < rank_key(a.0) {
                    b
                } else {
                    a
                }
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => return None,
        };
        Some(MatchResult {
            key: RouteKey::new(None, route.pattern.as_str()),
            route: route.clone(),
            params,
        })
    }

    fn vhost_partition(&self, host: &str) -> Option<(&str, &Partition)> {
        let host = host.to_ascii_lowercase();
        let bare = host.rsplit_once(':').map(|(h, _)| h);
        let found = [Some(host.as_str()), bare]
            .into_iter()
            .flatten()
            .find_map(|h| self.vhosts.get_key_value(h))
            .map(|(k, p)| (k.as_str(), p));
        found
    }

    /// Every rule, host-less scope first, then hosts in name order.
    pub fn entries(&self) -> Vec<(RouteKey, &RedirectSpec)> {
        let mut hosts: Vec<_> = self.vhosts.iter().collect();
        hosts.sort_by(|a, b| a.0.cmp(b.0));
        let default = self
            .default
            .routes()
            .map(|r| (RouteKey::new(None, r.pattern.as_str()), &r.spec));
        let scoped = hosts.into_iter().flat_map(|(host, partition)| {
            partition
                .routes()
                .map(move |r| (RouteKey::new(Some(host.as_str()), r.pattern.as_str()), &r.spec))
        });
        default.chain(scoped).collect()
    }

    /// Every compiled pattern with its key.
    pub fn patterns(&self) -> Vec<(RouteKey, &PathPattern)> {
        let mut hosts: Vec<_> = self.vhosts.iter().collect();
        hosts.sort_by(|a, b| a.0.cmp(b.0));
        let default = self
            .default
            .routes()
            .map(|r| (RouteKey::new(None, r.pattern.as_str()), &r.pattern));
        let scoped = hosts.into_iter().flat_map(|(host, partition)| {
            partition
                .routes()
                .map(move |r| (RouteKey::new(Some(host.as_str()), r.pattern.as_str()), &r.pattern))
        });
        default.chain(scoped).collect()
    }

    pub fn len(&self) -> usize {
        self.default.len() + self.vhosts.values().map(Partition::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide table handle shared by the resolver and its collaborators.
#[derive(Debug)]
pub struct SharedRouteTable {
    current: ArcSwap<RouteTable>,
    writer: Mutex<()>,
}

impl SharedRouteTable {
    pub fn new(table: RouteTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
            writer: Mutex::new(()),
        }
    }

    /// The table as of now; never partially merged.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }

    /// Merge `batch` into the live table, or change nothing.
    pub fn register_additional(&self, batch: &RouteBatch) -> Result<(), RegistrationError> {
        let _guard = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = self.current.load().merged(batch)?;
        self.current.store(Arc::new(next));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirect::spec::RedirectStatus;

    fn routes(pairs: &[(&str, &str)]) -> RouteMap {
        pairs.iter().map(|(p, d)| (p.to_string(), RedirectSpec::from(*d))).collect()
    }

    fn table() -> RouteTable {
        let mut vhosts = VhostMap::new();
        vhosts.insert(
            "Blahblah.com.localhost".into(),
            [(
                "/test".to_string(),
                RedirectSpec::WithStatus {
                    destination: "/newtest".into(),
                    status_code: Some(RedirectStatus::TEMPORARY),
                },
            )]
            .into_iter()
            .collect(),
        );
        RouteTable::from_static(
            &routes(&[
                ("/test", "/it/works"),
                ("/test/{param*2}", "/newtest/{param*2}"),
                ("/test/{param}", "/one/{param}"),
                ("/test/fixed", "/fixed"),
                ("/{rest*}", "/catchall/{rest*}"),
            ]),
            &vhosts,
        )
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let t = table();
        assert_eq!(t.lookup(None, "test").unwrap().destination(), "/it/works");
        assert_eq!(
            t.lookup(Some("blahblah.com.localhost"), "/test").unwrap().destination(),
            "/newtest"
        );
        assert!(t.lookup(Some("other.com"), "/test").is_none());
        assert_eq!(t.len(), 6);
    }

    #[test]
    fn test_vhost_takes_priority() {
        let t = table();
        let m = t.find("/test", Some("blahblah.com.localhost:8080"), None).unwrap();
        assert_eq!(m.key.vhost.as_deref(), Some("blahblah.com.localhost"));
        assert_eq!(m.route.spec.destination(), "/newtest");

        let m = t.find("/test", Some("example.org"), None).unwrap();
        assert_eq!(m.key.vhost, None);
        assert_eq!(m.route.spec.destination(), "/it/works");
    }

    #[test]
    fn test_vhost_falls_through_to_default() {
        let t = table();
        let m = t.find("/test/a/b", Some("blahblah.com.localhost"), None).unwrap();
        assert_eq!(m.pattern(), "/test/{param*2}");
        assert_eq!(m.params.get("param"), Some("a/b"));
    }

    #[test]
    fn test_most_specific_wins() {
        let t = table();
        assert_eq!(t.find("/test/fixed", None, None).unwrap().pattern(), "/test/fixed");
        assert_eq!(t.find("/test/other", None, None).unwrap().pattern(), "/test/{param}");
        assert_eq!(t.find("/x/y/z", None, None).unwrap().pattern(), "/{rest*}");
    }

    #[test]
    fn test_overlay_competes_on_specificity() {
        let t = table();
        let overlay = Partition::compile(None, &routes(&[("/x/{id}", "/dyn/{id}")])).unwrap();
        let m = t.find("/x/1", None, Some(&overlay)).unwrap();
        assert_eq!(m.route.spec.destination(), "/dyn/{id}");
    }

    #[test]
    fn test_merge_rejects_duplicates_atomically() {
        let t = table();
        let batch = RouteBatch {
            redirects: routes(&[("/fresh", "/a"), ("test", "/b")]),
            vhosts: VhostMap::new(),
        };
        let err = t.merged(&batch).unwrap_err();
        assert_eq!(err, RegistrationError::Duplicate(vec![RouteKey::new(None, "/test")]));
        assert!(t.lookup(None, "/fresh").is_none());
    }

    #[test]
    fn test_collisions_cover_vhost_scopes() {
        let t = table();
        let overlay = Partition::compile(None, &routes(&[("/test", "/dyn")])).unwrap();
        let keys = t.collisions(&overlay);
        assert_eq!(
            keys,
            vec![
                RouteKey::new(None, "/test"),
                RouteKey::new(Some("blahblah.com.localhost"), "/test"),
            ]
        );
    }

    #[test]
    fn test_same_pattern_twice_in_one_map() {
        let err = Partition::compile(None, &routes(&[("/a", "/x"), ("a", "/y")])).unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate(_)));
    }

    #[test]
    fn test_shared_table_swaps_whole_batches() {
        let shared = SharedRouteTable::new(table());
        let before = shared.snapshot();
        shared
            .register_additional(&RouteBatch {
                redirects: routes(&[("/added", "/there")]),
                vhosts: VhostMap::new(),
            })
            .unwrap();
        assert!(before.lookup(None, "/added").is_none());
        assert!(shared.snapshot().lookup(None, "/added").is_some());

        let err = shared.register_additional(&RouteBatch {
            redirects: routes(&[("/another", "/x"), ("/added", "/y")]),
            vhosts: VhostMap::new(),
        });
        assert!(err.is_err());
        assert!(shared.snapshot().lookup(None, "/another").is_none());
    }

    #[test]
    fn test_case_variant_hosts_share_one_scope() {
        let mut vhosts = VhostMap::new();
        vhosts.insert("A.example".into(), routes(&[("/a", "/from-upper")]));
        vhosts.insert("a.example".into(), routes(&[("/b", "/from-lower")]));
        let t = RouteTable::from_static(&RouteMap::new(), &vhosts).unwrap();

        assert_eq!(t.len(), 2);
        assert_eq!(t.lookup(Some("a.example"), "/a").unwrap().destination(), "/from-upper");
        assert_eq!(t.lookup(Some("A.EXAMPLE"), "/b").unwrap().destination(), "/from-lower");
    }

    #[test]
    fn test_case_variant_hosts_with_same_pattern_fail() {
        let mut vhosts = VhostMap::new();
        vhosts.insert("A.example".into(), routes(&[("/a", "/one")]));
        vhosts.insert("a.example".into(), routes(&[("a", "/two")]));
        let err = RouteTable::from_static(&RouteMap::new(), &vhosts).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::Duplicate(vec![RouteKey::new(Some("a.example"), "/a")])
        );
    }
}
