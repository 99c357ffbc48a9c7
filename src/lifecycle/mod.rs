//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server drains → reload task exits → cache persisted
//!
//! Reload (reload.rs):
//!     ConfigWatcher update → apply_config → ResolutionEngine::reload
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans shutdown out to every long-running task
//! - Settings that only take effect at startup (bind address, cache
//!   backend) are stored on reload but flagged as needing a restart

pub mod reload;
pub mod shutdown;
pub mod signals;

pub use reload::{apply_config, restart_required, spawn_config_reloader};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
