//! Request handling.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) and echo it on the response
//! - Extract the routing-relevant parts of a request (path, host, query)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `Host` header first, URI authority as the HTTP/2 fallback

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderValue, Request},
};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

use crate::redirect::query::parse_query;
use crate::redirect::RequestContext;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Issues a fresh UUID v4 for every request without an `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Layer that sets the request ID.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// The request ID, or `"unknown"` if none was set.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

impl From<&Request<Body>> for RequestContext {
    fn from(request: &Request<Body>) -> Self {
        let headers = request.headers();
        let uri = request.uri();
        let host = header_string(headers, header::HOST)
            .or_else(|| uri.authority().map(|a| a.to_string()));

        RequestContext {
            path: uri.path().to_string(),
            host,
            query: uri.query().map(parse_query).unwrap_or_default(),
            user_agent: header_string(headers, header::USER_AGENT),
            referrer: header_string(headers, header::REFERER),
            remote_addr: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0),
        }
    }
}
