//! Applying configuration updates to a running process.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::DispatchConfig;
use crate::engine::ResolutionEngine;
use crate::lifecycle::Shutdown;

/// Apply one validated configuration. Returns false when the engine
/// rejected it, in which case nothing changes.
pub fn apply_config(
    engine: &ResolutionEngine,
    current: &ArcSwap<DispatchConfig>,
    next: DispatchConfig,
) -> bool {
    let previous = current.load_full();

    if previous.resolver != next.resolver || previous.security != next.security {
        if let Err(e) = engine.reload(&next.resolver, &next.security) {
            tracing::error!(error = %e, "Engine rejected new configuration, keeping current");
            return false;
        }
    }

    for setting in restart_required(&previous, &next) {
        tracing::warn!(setting, "Setting changes take effect after restart");
    }

    current.store(Arc::new(next));
    tracing::info!(fingerprint = %engine.fingerprint(), "Configuration applied");
    true
}

/// Settings that differ between `previous` and `next` but are only read
/// at startup: the listener socket, the router and its layers, and the
/// cache tiers.
pub fn restart_required(previous: &DispatchConfig, next: &DispatchConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if previous.listener.bind_address != next.listener.bind_address {
        changed.push("listener.bind_address");
    }
    if previous.listener.dispatch_prefix != next.listener.dispatch_prefix {
        changed.push("listener.dispatch_prefix");
    }
    if previous.listener.request_timeout_secs != next.listener.request_timeout_secs {
        changed.push("listener.request_timeout_secs");
    }
    if previous.admin.enabled != next.admin.enabled {
        changed.push("admin.enabled");
    }
    if previous.cache != next.cache {
        changed.push("cache");
    }
    changed
}

/// Consume watcher updates until the channel closes or shutdown fires.
pub fn spawn_config_reloader(
    engine: Arc<ResolutionEngine>,
    current: Arc<ArcSwap<DispatchConfig>>,
    mut updates: mpsc::UnboundedReceiver<DispatchConfig>,
    shutdown: &Shutdown,
) -> JoinHandle<()> {
    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Some(config) => {
                        apply_config(&engine, &current, config);
                    }
                    None => break,
                },
                _ = stop.recv() => break,
            }
        }
        tracing::debug!("Config reloader stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResolutionCache;
    use crate::catalog::{HandlerRegistry, MethodInfo, TypeInfo};
    use crate::engine::Collaborators;
    use serde_json::json;

    struct Echo;

    impl crate::catalog::Handler for Echo {
        fn invoke(&self, method: &str) -> Option<serde_json::Value> {
            Some(json!(method))
        }
    }

    fn setup() -> (Arc<ResolutionEngine>, Arc<ArcSwap<DispatchConfig>>) {
        let registry = HandlerRegistry::new()
            .register_type(TypeInfo::abstract_type("App.Http.Controllers.Controller"))
            .register(
                TypeInfo::concrete("App.Http.Controllers.UsersController")
                    .extends("App.Http.Controllers.Controller")
                    .method(MethodInfo::public("index")),
                || Box::new(Echo),
            );
        let config = DispatchConfig::default();
        let engine = ResolutionEngine::new(
            Collaborators::from_registry(Arc::new(registry)),
            &config.resolver,
            &config.security,
            ResolutionCache::disabled(),
        )
        .unwrap();
        (Arc::new(engine), Arc::new(ArcSwap::from_pointee(config)))
    }

    #[test]
    fn test_apply_swaps_engine_and_config() {
        let (engine, current) = setup();
        let before = engine.fingerprint();

        let mut next = DispatchConfig::default();
        next.security.blocked_methods.push("index".to_string());
        assert!(apply_config(&engine, &current, next.clone()));

        assert_ne!(before, engine.fingerprint());
        assert_eq!(**current.load(), next);
    }

    #[test]
    fn test_listener_only_change_keeps_fingerprint() {
        let (engine, current) = setup();
        let before = engine.fingerprint();

        let mut next = DispatchConfig::default();
        next.listener.expose_error_details = true;
        assert!(apply_config(&engine, &current, next));

        assert_eq!(before, engine.fingerprint());
        assert!(current.load().listener.expose_error_details);
    }

    #[test]
    fn test_restart_required_settings() {
        let previous = DispatchConfig::default();
        assert!(restart_required(&previous, &previous.clone()).is_empty());

        let mut next = previous.clone();
        next.listener.dispatch_prefix = "/rpc".to_string();
        next.admin.enabled = false;
        next.listener.expose_error_details = true;
        next.admin.api_key = "rotated-admin-key".to_string();
        assert_eq!(
            restart_required(&previous, &next),
            vec!["listener.dispatch_prefix", "admin.enabled"]
        );

        let mut next = previous.clone();
        next.listener.bind_address = "127.0.0.1:9090".to_string();
        next.listener.request_timeout_secs = 5;
        next.cache.local_capacity = 10;
        assert_eq!(
            restart_required(&previous, &next),
            vec!["listener.bind_address", "listener.request_timeout_secs", "cache"]
        );
    }

    #[tokio::test]
    async fn test_reloader_applies_updates() {
        let (engine, current) = setup();
        let shutdown = Shutdown::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = spawn_config_reloader(engine.clone(), current.clone(), rx, &shutdown);

        let mut next = DispatchConfig::default();
        next.admin.api_key = "rotated-admin-key".to_string();
        tx.send(next).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(current.load().admin.api_key, "rotated-admin-key");
    }
}
