//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the resolver from configuration
//! - Create the Axum router around the host application
//! - Wire up middleware (redirects, timeout, request ID, tracing)
//! - Bind the public and admin listeners and drain them on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::{RedirectMode, RedirectorConfig};
use crate::http::install::AxumInstaller;
use crate::http::interception::with_redirects;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::fallback;
use crate::lifecycle::{shutdown::wait as wait_for_shutdown, Shutdown};
use crate::redirect::{DynamicSourceError, HttpSource, RegistrationError, Resolver};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid redirect rules: {0}")]
    Rules(#[from] RegistrationError),

    #[error("dynamic redirect source: {0}")]
    DynamicSource(#[from] DynamicSourceError),
}

/// HTTP server for the redirector.
pub struct HttpServer {
    router: Router,
    config: RedirectorConfig,
    resolver: Arc<Resolver>,
}

impl HttpServer {
    /// Create a server with no application routes: every request either
    /// redirects or gets a 404.
    pub fn new(config: RedirectorConfig) -> Result<Self, ServerError> {
        let resolver = Arc::new(Self::build_resolver(&config)?);
        Ok(Self::with_app(config, resolver, Router::new()))
    }

    /// Create a server around an existing resolver and application.
    pub fn with_app(config: RedirectorConfig, resolver: Arc<Resolver>, app: Router) -> Self {
        let router = Self::build_router(&config, &resolver, app);
        Self {
            router,
            config,
            resolver,
        }
    }

    fn build_resolver(config: &RedirectorConfig) -> Result<Resolver, ServerError> {
        let mut resolver = Resolver::new(config.redirects.clone())?;
        if let Some(url) = &config.redirects.dynamic_source_url {
            let timeout = Duration::from_secs(config.timeouts.dynamic_source_secs);
            resolver = resolver.with_dynamic_source(Arc::new(HttpSource::new(url.as_str(), timeout)?));
            tracing::info!(url = %url, "Dynamic redirect source configured");
        }
        Ok(resolver)
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RedirectorConfig, resolver: &Arc<Resolver>, app: Router) -> Router {
        let app = match config.redirects.mode {
            RedirectMode::Intercept => app.fallback(fallback),
            RedirectMode::Eager => {
                let mut installer = AxumInstaller::new();
                installer.install_all(resolver);
                tracing::info!(routes = installer.installed(), "Installed eager redirect routes");
                // Application routes win; installed routes only see what the app does not handle.
                app.fallback_service(installer.into_router().fallback(fallback))
            }
        };

        with_redirects(app, resolver.clone())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rules = self.resolver.table().len(),
            mode = ?self.config.redirects.mode,
            "HTTP server starting"
        );

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_router =
                setup_admin_router(AdminState::new(self.resolver.clone(), &self.config.admin.api_key));
            let admin_shutdown = shutdown.subscribe();
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API starting");
            tokio::spawn(async move {
                if let Err(e) = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(wait_for_shutdown(admin_shutdown))
                    .await
                {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown.subscribe()))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn config(&self) -> &RedirectorConfig {
        &self.config
    }
}
