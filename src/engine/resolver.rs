//! The resolution engine.
//!
//! # Responsibilities
//! - Run Parser → Search → Validation for a (pattern, verb) pair
//! - Consult and populate the resolution cache
//! - Request a fresh handler instance for every resolution
//! - Swap the compiled pipeline atomically on configuration reload
//!
//! # Design Decisions
//! - The compiled pipeline sits behind `ArcSwap`; a request works against
//!   the snapshot it loaded even if a reload lands mid-flight
//! - Concurrent resolutions of the same pattern may both recompute;
//!   writes are idempotent so no resolution-level lock is taken
//! - Counters are plain atomics; `stats()` is a best-effort snapshot
//! - Cache keys use the canonical verb, so unknown extension methods share
//!   one entry per pattern

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::cache::{config_fingerprint, CacheEntry, CacheKey, ResolutionCache};
use crate::catalog::{Handler, HandlerFactory, HandlerRegistry, Introspection, TypeCatalog};
use crate::config::{ResolverSettings, SecuritySettings};
use crate::engine::error::ResolutionError;
use crate::observability::metrics;
use crate::routing::{HandlerSearch, PatternParser, ResolvedHandler, SearchSettings};
use crate::security::{PolicyError, SecurityPolicy, SecurityValidator, SecurityVerdict};

/// Everything derived from one resolver + security configuration.
struct Pipeline {
    parser: PatternParser,
    search: HandlerSearch,
    validator: SecurityValidator,
    fingerprint: String,
}

/// A resolved, validated, freshly constructed handler.
pub struct Resolution {
    pub handler: Box<dyn Handler>,
    pub target: ResolvedHandler,
    /// Served from cache rather than a fresh search and validation.
    pub cache_hit: bool,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("target", &self.target)
            .field("cache_hit", &self.cache_hit)
            .finish_non_exhaustive()
    }
}

/// Engine counters plus cache detail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub attempts: u64,
    pub successes: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub local_hits: u64,
    pub shared_hits: u64,
    pub shared_errors: u64,
    /// Entries in the in-process tier.
    pub size: usize,
    /// Memoized security approvals under the active policy.
    pub approvals: usize,
}

/// Collaborators the engine resolves against.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn TypeCatalog>,
    pub introspection: Arc<dyn Introspection>,
    pub factory: Arc<dyn HandlerFactory>,
}

impl Collaborators {
    /// All three roles served by one registry.
    pub fn from_registry(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            catalog: registry.clone(),
            introspection: registry.clone(),
            factory: registry,
        }
    }
}

pub struct ResolutionEngine {
    collaborators: Collaborators,
    pipeline: ArcSwap<Pipeline>,
    cache: ResolutionCache,
    attempts: AtomicU64,
    successes: AtomicU64,
}

impl ResolutionEngine {
    pub fn new(
        collaborators: Collaborators,
        resolver: &ResolverSettings,
        security: &SecuritySettings,
        cache: ResolutionCache,
    ) -> Result<Self, PolicyError> {
        let pipeline = Self::compile(&collaborators, resolver, security)?;
        tracing::info!(
            fingerprint = %pipeline.fingerprint,
            namespaces = ?resolver.namespaces,
            cache_enabled = cache.is_enabled(),
            shared_backend = cache.shared_backend().unwrap_or("none"),
            "Resolution engine ready"
        );
        Ok(Self {
            collaborators,
            pipeline: ArcSwap::from_pointee(pipeline),
            cache,
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
        })
    }

    fn compile(
        collaborators: &Collaborators,
        resolver: &ResolverSettings,
        security: &SecuritySettings,
    ) -> Result<Pipeline, PolicyError> {
        let policy = SecurityPolicy::compile(security)?;
        Ok(Pipeline {
            parser: PatternParser::new(resolver.max_pattern_length),
            search: HandlerSearch::new(
                collaborators.catalog.clone(),
                SearchSettings::from(resolver),
            ),
            validator: SecurityValidator::new(
                Arc::new(policy),
                collaborators.introspection.clone(),
            ),
            fingerprint: config_fingerprint(resolver, security),
        })
    }

    /// Resolve `raw` for `verb` and construct a fresh handler instance.
    pub async fn resolve(&self, raw: &str, verb: &str) -> Result<Resolution, ResolutionError> {
        let start = Instant::now();
        let result = self.resolve_inner(raw, verb).await;
        self.finish(raw, verb, start, &result);
        result
    }

    /// Resolve and validate without instantiating.
    pub async fn resolve_target(
        &self,
        raw: &str,
        verb: &str,
    ) -> Result<ResolvedHandler, ResolutionError> {
        let start = Instant::now();
        let result = self.lookup(raw, verb).await.map(|(target, _)| target);
        self.finish(raw, verb, start, &result);
        result
    }

    async fn resolve_inner(&self, raw: &str, verb: &str) -> Result<Resolution, ResolutionError> {
        let (target, cache_hit) = self.lookup(raw, verb).await?;
        let handler = self
            .collaborators
            .factory
            .instantiate(&target.type_name)
            .inspect_err(|e| {
                tracing::error!(
                    handler = %target.type_name,
                    error = %e,
                    "Handler instantiation failed"
                );
            })?;
        Ok(Resolution {
            handler,
            target,
            cache_hit,
        })
    }

    async fn lookup(
        &self,
        raw: &str,
        verb: &str,
    ) -> Result<(ResolvedHandler, bool), ResolutionError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let pipeline = self.pipeline.load_full();
        let verb = pipeline.validator.policy().canonical_verb(verb);
        let key = CacheKey::new(&pipeline.fingerprint, raw, &verb);

        if let Some(entry) = self.cache.get(&key).await {
            if entry.verdict.is_approved() {
                return Ok((entry.handler, true));
            }
        }

        let pattern = pipeline.parser.parse(raw)?;
        let target = pipeline.search.search(&pattern)?;
        pipeline
            .validator
            .validate(&target.type_name, &target.method, &verb)?;

        self.cache
            .put(key, CacheEntry::new(target.clone(), SecurityVerdict::Approved))
            .await;
        Ok((target, false))
    }

    fn finish<T>(&self, raw: &str, verb: &str, start: Instant, result: &Result<T, ResolutionError>) {
        match result {
            Ok(_) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                metrics::record_resolution("success", start);
            }
            Err(e) => {
                metrics::record_resolution(e.code().as_str(), start);
                tracing::debug!(
                    pattern = %raw,
                    verb = %verb,
                    code = e.code().as_str(),
                    error = %e,
                    "Resolution failed"
                );
            }
        }
    }

    /// Swap in a pipeline compiled from new settings.
    ///
    /// On error the running pipeline is kept.
    pub fn reload(
        &self,
        resolver: &ResolverSettings,
        security: &SecuritySettings,
    ) -> Result<(), PolicyError> {
        let next = Self::compile(&self.collaborators, resolver, security)?;
        let previous = self.pipeline.swap(Arc::new(next));
        self.cache.clear_local();
        tracing::info!(
            previous = %previous.fingerprint,
            current = %self.fingerprint(),
            "Resolution pipeline reloaded"
        );
        Ok(())
    }

    /// Drop every cached resolution and memoized approval.
    pub async fn clear_cache(&self) {
        self.cache.invalidate_all().await;
        self.pipeline.load().validator.clear_approvals();
    }

    pub fn fingerprint(&self) -> String {
        self.pipeline.load().fingerprint.clone()
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn stats(&self) -> EngineStats {
        let cache = self.cache.stats();
        EngineStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            cache_hits: cache.hits,
            cache_misses: cache.misses,
            local_hits: cache.local_hits,
            shared_hits: cache.shared_hits,
            shared_errors: cache.shared_errors,
            size: cache.size,
            approvals: self.pipeline.load().validator.approvals(),
        }
    }
}
