//! 404 fallback interception.
//!
//! # Responsibilities
//! - Let the wrapped app produce its tentative response
//! - Resolve a redirect only when that response is a 404
//! - Either continue with the tentative response or take it over
//!
//! # Design Decisions
//! - Runs as one axum middleware around the whole app
//! - Request parts are captured before the app consumes the request
//! - Eagerly installed routes mark their own 404s so they are not resolved
//!   twice

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use crate::redirect::{RequestContext, Resolution, Resolver, ResponseInspector};

impl ResponseInspector for Response<Body> {
    fn status(&self) -> StatusCode {
        Response::status(self)
    }
}

/// Marker on a 404 that already went through resolution.
#[derive(Debug, Clone, Copy)]
pub struct AlreadyResolved;

/// What the hook tells the host to do with its tentative response.
pub enum Hook {
    Continue(Response),
    Takeover(Response),
}

impl Hook {
    pub fn into_response(self) -> Response {
        match self {
            Hook::Continue(response) | Hook::Takeover(response) => response,
        }
    }

    pub fn is_takeover(&self) -> bool {
        matches!(self, Hook::Takeover(_))
    }
}

/// Decide what happens to `response`, produced for `request`.
pub async fn on_pre_response(resolver: &Resolver, request: &RequestContext, response: Response) -> Hook {
    if response.extensions().get::<AlreadyResolved>().is_some()
        || !resolver.warrants_resolution(&response)
    {
        return Hook::Continue(response);
    }

    match resolver.resolve(request).await {
        Resolution::Passthrough => Hook::Continue(response),
        resolution => Hook::Takeover(resolution.into_response()),
    }
}

/// Middleware wrapping an app with redirect interception.
pub async fn redirect_fallback(
    State(resolver): State<Arc<Resolver>>,
    request: Request,
    next: Next,
) -> Response {
    let context = RequestContext::from(&request);
    let response = next.run(request).await;
    on_pre_response(&resolver, &context, response)
        .await
        .into_response()
}

/// Wrap `app` so that its 404s are resolved against `resolver`.
pub fn with_redirects(app: Router, resolver: Arc<Resolver>) -> Router {
    app.layer(middleware::from_fn_with_state(resolver, redirect_fallback))
}
