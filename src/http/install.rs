//! Eager route installation.
//!
//! # Responsibilities
//! - Register one axum route per static pattern shape
//! - Resolve those routes through the shared destination logic
//!
//! # Design Decisions
//! - Route shapes use positional names, so `/a/{x}` and `/a/{y}` share one
//!   route; the handler re-matches against the full table
//! - Shapes axum would reject are skipped and left to interception

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};

use crate::http::interception::AlreadyResolved;
use crate::redirect::{PathPattern, RequestContext, Resolution, Resolver, RouteInstaller};

/// Installs exact routes into an axum router.
pub struct AxumInstaller {
    router: Router,
    shapes: matchit::Router<()>,
    installed: HashSet<String>,
}

impl AxumInstaller {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            shapes: matchit::Router::new(),
            installed: HashSet::new(),
        }
    }

    /// Install a route for every registered pattern.
    pub fn install_all(&mut self, resolver: &Arc<Resolver>) {
        let table = resolver.table();
        for (_, pattern) in table.patterns() {
            self.install(pattern, resolver.clone());
        }
    }

    pub fn installed(&self) -> usize {
        self.installed.len()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

impl Default for AxumInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteInstaller for AxumInstaller {
    fn install(&mut self, pattern: &PathPattern, resolver: Arc<Resolver>) {
        for path in pattern.router_paths() {
            if self.installed.contains(&path) {
                continue;
            }
            if let Err(e) = self.shapes.insert(path.clone(), ()) {
                tracing::warn!(pattern = %pattern, route = %path, error = %e, "Route shape conflicts, leaving it to interception");
                continue;
            }

            let resolver = resolver.clone();
            let handler = move |request: Request| {
                let resolver = resolver.clone();
                async move { eager_redirect(&resolver, &request) }
            };
            self.router = std::mem::replace(&mut self.router, Router::new()).route(&path, any(handler));
            self.installed.insert(path);
        }
    }
}

fn eager_redirect(resolver: &Resolver, request: &Request) -> Response {
    let context = RequestContext::from(request);
    match resolver.resolve_installed(&context) {
        Resolution::Passthrough => {
            let mut response = Resolution::Passthrough.into_response();
            response.extensions_mut().insert(AlreadyResolved);
            response
        }
        resolution => resolution.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RedirectMode, RedirectOptions};
    use crate::redirect::{RedirectSpec, RouteMap, VhostMap};
    use axum::{
        body::Body,
        http::{header, StatusCode},
    };
    use tower::ServiceExt;

    fn resolver(append: bool) -> Arc<Resolver> {
        let routes: RouteMap = [
            ("/test", "/it/works"),
            ("/test/{a}", "/one/{a}"),
            ("/test/{b}/x", "/two/{b}"),
            ("/test/{param*2}", "/newtest/{param*2}"),
            ("/opt/{o?}", "/opt-to/{o?}"),
        ]
        .into_iter()
        .map(|(p, d)| (p.to_string(), RedirectSpec::from(d)))
        .collect();
        let mut vhosts = VhostMap::new();
        vhosts.insert(
            "only.example".into(),
            [("/scoped".to_string(), RedirectSpec::from("/in-scope"))].into_iter().collect(),
        );
        Arc::new(
            Resolver::new(RedirectOptions {
                mode: RedirectMode::Eager,
                append_query_string: append,
                routes,
                vhosts,
                ..RedirectOptions::default()
            })
            .unwrap(),
        )
    }

    async fn get(router: &Router, uri: &str, host: &str) -> Response {
        router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("Host", host)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_installed_routes_redirect() {
        let mut installer = AxumInstaller::new();
        installer.install_all(&resolver(true));
        let router = installer.into_router();

        let r = get(&router, "/test?x=1", "localhost").await;
        assert_eq!(r.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(r.headers()[header::LOCATION], "/it/works?x=1");

        let r = get(&router, "/test/param1/param2", "localhost").await;
        assert_eq!(r.headers()[header::LOCATION], "/newtest/param1/param2");

        let r = get(&router, "/test/q/x", "localhost").await;
        assert_eq!(r.headers()[header::LOCATION], "/two/q");

        let r = get(&router, "/opt", "localhost").await;
        assert_eq!(r.headers()[header::LOCATION], "/opt-to/");
    }

    #[tokio::test]
    async fn test_append_flag_off() {
        let mut installer = AxumInstaller::new();
        installer.install_all(&resolver(false));
        let router = installer.into_router();

        let r = get(&router, "/test?x=1", "localhost").await;
        assert_eq!(r.headers()[header::LOCATION], "/it/works");
    }

    #[tokio::test]
    async fn test_vhost_route_on_other_host_is_marked_404() {
        let mut installer = AxumInstaller::new();
        installer.install_all(&resolver(true));
        let router = installer.into_router();

        let r = get(&router, "/scoped", "only.example").await;
        assert_eq!(r.headers()[header::LOCATION], "/in-scope");

        let r = get(&router, "/scoped", "elsewhere.example").await;
        assert_eq!(r.status(), StatusCode::NOT_FOUND);
        assert!(r.extensions().get::<AlreadyResolved>().is_some());
    }

    #[test]
    fn test_same_shape_installed_once() {
        let mut installer = AxumInstaller::new();
        installer.install_all(&resolver(true));
        // /test, /test/{p0}, /test/{p0}/x, /test/{p0}/{p1}, /opt, /opt/{p0}, /scoped
        assert_eq!(installer.installed(), 7);
    }
}
