//! Resolution orchestration.
//!
//! # Data Flow
//! ```text
//! resolve(raw, verb)
//!     → cache key (fingerprint, VERB, raw)
//!     → ResolutionCache hit?  → instantiate cached type → Resolution
//!     → PatternParser::parse           (InvalidPattern)
//!     → HandlerSearch::search          (HandlerNotFound)
//!     → SecurityValidator::validate    (SecurityViolation)
//!     → ResolutionCache::put           (successes only)
//!     → HandlerFactory::instantiate    (InstantiationFailed)
//!     → Resolution { handler, target, cache_hit }
//! ```
//!
//! # Design Decisions
//! - The engine is the only entry point the HTTP layer calls
//! - Failures keep their classification end to end; adapters decide how
//!   much of `ResolutionError::details` to expose

pub mod error;
pub mod resolver;

pub use error::{ErrorCode, ResolutionError};
pub use resolver::{Collaborators, EngineStats, Resolution, ResolutionEngine};
