//! Redirector: HTTP redirect resolution for axum applications.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod redirect;

pub use config::schema::RedirectorConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use redirect::Resolver;
