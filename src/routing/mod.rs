//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Raw pattern ("admin.users@edit")
//!     → pattern.rs (validate, split into namespace / handler / method)
//!     → search.rs (ordered candidate names, first structural match wins)
//!     → Return: ResolvedHandler or HandlerNotFound
//! ```
//!
//! # Design Decisions
//! - Patterns are parsed once per request and never mutated
//! - No regex in the hot path (allow-list check is byte-wise)
//! - Deterministic: same input and catalog always resolve the same type
//! - First match wins (ordered by suffix form, then namespace root)

pub mod pattern;
pub mod search;

pub use pattern::{PatternError, PatternErrorKind, PatternParser, RoutePattern};
pub use search::{
    canonical_segment, HandlerNotFound, HandlerSearch, RejectReason, RejectedCandidate,
    ResolvedHandler, SearchSettings,
};
