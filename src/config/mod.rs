//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, pattern compilation)
//!     → DispatchConfig (validated, immutable)
//!     → resolver + security sections handed to the ResolutionEngine
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → ResolutionEngine::reload swaps the compiled pipeline
//!     → new fingerprint, old cache keys unreachable
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, CacheConfig, DispatchConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ResolverSettings, SecuritySettings, SharedBackend,
};
