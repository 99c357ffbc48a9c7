//! route-dispatch server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http (request id, trace, timeout)
//!                      │
//!                      ▼
//!                  engine ──▶ cache (local FIFO → shared store)
//!                      │
//!                      ▼ miss
//!                  routing::pattern ──▶ routing::search ──▶ security::validator
//!                      │
//!                      ▼
//!                  catalog (HandlerRegistry) ──▶ Handler::invoke
//!
//!     Cross-cutting: config (+ hot reload) · observability · lifecycle · admin
//! ```

mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::net::TcpListener;

use route_dispatch::cache::{ResolutionCache, SharedTier};
use route_dispatch::config::{load_config, watcher::ConfigWatcher, DispatchConfig};
use route_dispatch::engine::{Collaborators, ResolutionEngine};
use route_dispatch::http::{AppState, HttpServer};
use route_dispatch::lifecycle::{shutdown_signal, spawn_config_reloader, Shutdown};
use route_dispatch::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "route-dispatch", version, about = "Route-pattern dispatch server")]
struct Args {
    /// Path to a TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => DispatchConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "route-dispatch starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        dispatch_prefix = %config.listener.dispatch_prefix,
        cache_enabled = config.cache.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shared = if config.cache.enabled {
        match SharedTier::open(&config.cache).await {
            Ok(tier) => Some(tier),
            Err(e) => {
                tracing::warn!(error = %e, "Shared cache unavailable, using the local tier only");
                None
            }
        }
    } else {
        None
    };
    let cache = ResolutionCache::new(&config.cache, shared.as_ref().map(SharedTier::store));

    let registry = Arc::new(demo::registry());
    let engine = Arc::new(ResolutionEngine::new(
        Collaborators::from_registry(registry),
        &config.resolver,
        &config.security,
        cache,
    )?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let current = Arc::new(ArcSwap::from_pointee(config));
    let shutdown = Shutdown::new();

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            spawn_config_reloader(engine.clone(), current.clone(), updates, &shutdown);
            Some(watcher.run()?)
        }
        None => None,
    };

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.trigger();
        });
    }

    let server = HttpServer::new(AppState::new(engine, current));
    server.run(listener, shutdown.wait()).await?;

    if let Some(tier) = &shared {
        if let Err(e) = tier.persist() {
            tracing::error!(error = %e, "Failed to persist shared cache");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
