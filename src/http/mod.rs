//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, RequestContext)
//!     → host application / install.rs (eager routes)
//!     → interception.rs (404 → resolver)
//!     → response.rs (3xx + Location, or 500)
//!     → Send to client
//! ```

pub mod install;
pub mod interception;
pub mod request;
pub mod response;
pub mod server;

pub use install::AxumInstaller;
pub use interception::{on_pre_response, with_redirects, Hook};
pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerError};
