//! HTTP adapter subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (request ID assigned / propagated)
//!     → server.rs  (trace span, timeout, route match)
//!     → ResolutionEngine::resolve(pattern, verb)
//!     → Handler::invoke(method)
//!     → response.rs (JSON value, or classified error envelope)
//! ```
//!
//! # Design Decisions
//! - The adapter owns no resolution logic; it only maps verbs in and
//!   results out
//! - Error detail is hidden unless `expose_error_details` is set

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
