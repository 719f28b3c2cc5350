//! Redirect resolution engine.
//!
//! # Data Flow
//! ```text
//! Tentative 404 (path, host, query)
//!     → dynamic.rs (fetch extra rules, failures degrade to none)
//!     → table.rs (collision check, vhost-first specificity match)
//!     → params.rs (captured params into destination)
//!     → query.rs (request query + destination query → Location)
//!     → resolver.rs (status selection, events, decision)
//!
//! Table construction (at startup):
//!     RouteMap + VhostMap
//!     → pattern.rs (compile, reject malformed)
//!     → RouteTable partitioned by host, ranked by specificity
//! ```
//!
//! # Design Decisions
//! - Table snapshots are immutable; runtime registration swaps a new one in
//! - Collisions fail loudly and never overwrite
//! - Host framework coupling is limited to the traits in host.rs

pub mod dynamic;
pub mod events;
pub mod host;
pub mod params;
pub mod pattern;
pub mod query;
pub mod resolver;
pub mod spec;
pub mod table;

pub use dynamic::{DynamicSource, DynamicSourceError, FnSource, HttpSource};
pub use events::{RedirectEvent, RedirectListener};
pub use host::{RequestContext, ResponseInspector, RouteInstaller};
pub use params::{substitute, Params};
pub use pattern::{PathPattern, PatternError};
pub use resolver::{RedirectDecision, Resolution, ResolveError, Resolver};
pub use spec::{RedirectSpec, RedirectStatus, RouteMap, VhostMap};
pub use table::{MatchResult, RegistrationError, RouteBatch, RouteKey, RouteTable};
