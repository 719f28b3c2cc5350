use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::redirect::{RegistrationError, RouteBatch, RouteKey, RouteMap};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub rules: usize,
    pub dynamic_source: bool,
}

#[derive(Serialize)]
pub struct RedirectEntry {
    pub vhost: Option<String>,
    pub pattern: String,
    pub destination: String,
    pub status: u16,
}

/// Either `{ "redirects": {...}, "vhosts": {...} }` or a bare pattern map.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum RegisterBody {
    Batch(RouteBatch),
    Bare(RouteMap),
}

impl From<RegisterBody> for RouteBatch {
    fn from(body: RegisterBody) -> Self {
        match body {
            RegisterBody::Batch(batch) => batch,
            RegisterBody::Bare(redirects) => RouteBatch {
                redirects,
                ..RouteBatch::default()
            },
        }
    }
}

#[derive(Serialize)]
struct RegisterError {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    keys: Vec<RouteKey>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        rules: state.resolver.table().len(),
        dynamic_source: state.resolver.has_dynamic_source(),
    })
}

pub async fn list_redirects(State(state): State<AdminState>) -> Json<Vec<RedirectEntry>> {
    let table = state.resolver.table();
    let default_status = state.resolver.options().status_code;
    let entries = table
        .entries()
        .into_iter()
        .map(|(key, spec)| RedirectEntry {
            vhost: key.vhost,
            pattern: key.pattern,
            destination: spec.destination().to_string(),
            status: spec.status().unwrap_or(default_status).as_u16(),
        })
        .collect();
    Json(entries)
}

pub async fn register_redirects(
    State(state): State<AdminState>,
    Json(body): Json<RegisterBody>,
) -> Response {
    let batch = RouteBatch::from(body);
    if batch.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "no redirects in request".into(), Vec::new());
    }

    match state.resolver.register(&batch) {
        Ok(()) => {
            let registered = batch.redirects.len()
                + batch.vhosts.values().map(|m| m.len()).sum::<usize>();
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "registered": registered })),
            )
                .into_response()
        }
        Err(RegistrationError::Duplicate(keys)) => {
            error_response(StatusCode::CONFLICT, "duplicate redirect routes".into(), keys)
        }
        Err(e @ RegistrationError::Pattern(_)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string(), Vec::new())
        }
    }
}

fn error_response(status: StatusCode, error: String, keys: Vec<RouteKey>) -> Response {
    (status, Json(RegisterError { error, keys })).into_response()
}
