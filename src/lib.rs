//! Route-pattern dispatch with security validation.
//!
//! Resolves strings such as `admin.users@index` to a handler type and
//! method, refuses anything that must not be reachable from the network,
//! and caches successful resolutions across two tiers.

// Core
pub mod catalog;
pub mod routing;
pub mod security;
pub mod cache;
pub mod engine;

// Surfaces
pub mod http;
pub mod admin;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use catalog::{Handler, HandlerRegistry, MethodInfo, TypeInfo};
pub use config::DispatchConfig;
pub use engine::{Collaborators, ResolutionEngine, ResolutionError};
pub use http::HttpServer;
