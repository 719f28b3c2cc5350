//! Response construction.
//!
//! # Responsibilities
//! - Turn a redirect decision into a 3xx with a `Location` header
//! - Map resolution errors to a generic 500 page
//!
//! # Design Decisions
//! - Error bodies never carry route details; those go to the log
//! - A location that is not a valid header value is a 500, not a panic

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::redirect::{RedirectDecision, Resolution, ResolveError};

impl IntoResponse for RedirectDecision {
    fn into_response(self) -> Response {
        match HeaderValue::from_str(&self.location) {
            Ok(location) => {
                (self.status.as_status_code(), [(header::LOCATION, location)]).into_response()
            }
            Err(_) => {
                tracing::error!(location = %self.location, "Redirect location is not a valid header value");
                internal_error()
            }
        }
    }
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        internal_error()
    }
}

impl IntoResponse for Resolution {
    fn into_response(self) -> Response {
        match self {
            Resolution::Redirect(decision) => decision.into_response(),
            Resolution::Failed(error) => error.into_response(),
            Resolution::Passthrough => not_found(),
        }
    }
}

pub fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Router fallback for paths no route handles.
pub async fn fallback() -> Response {
    not_found()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirect::RedirectStatus;

    #[test]
    fn test_decision_response() {
        let response = RedirectDecision {
            status: RedirectStatus::TEMPORARY,
            location: "/newtest?a=1".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/newtest?a=1");
    }

    #[test]
    fn test_invalid_location_is_500() {
        let response = RedirectDecision {
            status: RedirectStatus::PERMANENT,
            location: "/bad\nheader".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_is_generic_500() {
        let response = ResolveError::MissingTarget("/x".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_fallback_serves_as_router_fallback() {
        use axum::{body::Body, extract::Request, Router};
        use tower::ServiceExt;

        let router = Router::new().fallback(fallback);
        let response = router
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
