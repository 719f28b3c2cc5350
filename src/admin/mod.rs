//! Admin API: the runtime `register` capability.
//!
//! # Responsibilities
//! - Expose the live route table for inspection
//! - Accept additional redirect batches at runtime
//!
//! # Design Decisions
//! - Separate listener from public traffic
//! - Every endpoint requires `Authorization: Bearer <api_key>`

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::get,
    Router,
};

use crate::redirect::Resolver;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub resolver: Arc<Resolver>,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(resolver: Arc<Resolver>, api_key: &str) -> Self {
        Self {
            resolver,
            api_key: Arc::from(api_key),
            started_at: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/redirects", get(list_redirects).post(register_redirects))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
