//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use route_dispatch::cache::ResolutionCache;
use route_dispatch::catalog::{
    Handler, HandlerFactory, HandlerRegistry, InstantiationError, Introspection, MethodInfo,
    ParamInfo, TypeCatalog, TypeInfo, TypeKind, Visibility,
};
use route_dispatch::config::{ResolverSettings, SecuritySettings};
use route_dispatch::engine::{Collaborators, ResolutionEngine};

pub const BASE: &str = "App.Http.Controllers.Controller";
pub const USERS: &str = "App.Controllers.UsersController";
pub const ADMIN_USERS: &str = "App.Http.Controllers.Admin.UsersController";
pub const REPORTS: &str = "App.Http.Controllers.ReportsController";

/// Echoes the handler and method for every method in `known`.
struct Recorder {
    name: &'static str,
    known: &'static [&'static str],
}

impl Handler for Recorder {
    fn invoke(&self, method: &str) -> Option<Value> {
        self.known
            .contains(&method)
            .then(|| json!({ "handler": self.name, "method": method }))
    }
}

pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new()
        .register_type(
            TypeInfo::abstract_type(BASE)
                .method(MethodInfo::public("callAction"))
                .method(MethodInfo::public("middleware")),
        )
        .register(
            TypeInfo::concrete(USERS)
                .extends(BASE)
                .method(MethodInfo::public("index"))
                .method(MethodInfo::public("show").param(ParamInfo::optional("id", "int")))
                .method(MethodInfo::public("export"))
                .method(MethodInfo::public("destroy"))
                .method(MethodInfo::with_visibility("audit", Visibility::Private))
                .method(MethodInfo::public("rebuild").marker("@internal")),
            || {
                Box::new(Recorder {
                    name: "users",
                    known: &["index", "show", "destroy"],
                })
            },
        )
        .register(
            TypeInfo::concrete(ADMIN_USERS)
                .extends(BASE)
                .method(MethodInfo::public("create"))
                .method(MethodInfo::public("destroy")),
            || {
                Box::new(Recorder {
                    name: "admin.users",
                    known: &["create", "destroy"],
                })
            },
        )
        .register_with_deps(
            TypeInfo::concrete(REPORTS)
                .extends(BASE)
                .method(MethodInfo::public("index")),
            &["ReportingDatabase"],
            || {
                Box::new(Recorder {
                    name: "reports",
                    known: &["index"],
                })
            },
        )
}

/// Wraps a registry and counts calls per collaborator role.
pub struct CountingRegistry {
    inner: HandlerRegistry,
    pub catalog_calls: AtomicUsize,
    pub introspection_calls: AtomicUsize,
    pub instantiations: AtomicUsize,
}

impl CountingRegistry {
    pub fn new(inner: HandlerRegistry) -> Arc<Self> {
        Arc::new(Self {
            inner,
            catalog_calls: AtomicUsize::new(0),
            introspection_calls: AtomicUsize::new(0),
            instantiations: AtomicUsize::new(0),
        })
    }

    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    pub fn introspection_calls(&self) -> usize {
        self.introspection_calls.load(Ordering::SeqCst)
    }

    pub fn instantiations(&self) -> usize {
        self.instantiations.load(Ordering::SeqCst)
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            catalog: self.clone(),
            introspection: self.clone(),
            factory: self.clone(),
        }
    }
}

impl TypeCatalog for CountingRegistry {
    fn exists(&self, name: &str) -> bool {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(name)
    }

    fn kind(&self, name: &str) -> Option<TypeKind> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.kind(name)
    }

    fn is_subtype_of(&self, name: &str, base: &str) -> bool {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.is_subtype_of(name, base)
    }
}

impl Introspection for CountingRegistry {
    fn method(&self, type_name: &str, method: &str) -> Option<MethodInfo> {
        self.introspection_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.method(type_name, method)
    }

    fn ancestors(&self, type_name: &str) -> Vec<String> {
        self.inner.ancestors(type_name)
    }
}

impl HandlerFactory for CountingRegistry {
    fn instantiate(&self, type_name: &str) -> Result<Box<dyn Handler>, InstantiationError> {
        self.instantiations.fetch_add(1, Ordering::SeqCst);
        self.inner.instantiate(type_name)
    }
}

pub fn engine_with(
    counting: &Arc<CountingRegistry>,
    security: &SecuritySettings,
    cache: ResolutionCache,
) -> ResolutionEngine {
    ResolutionEngine::new(
        counting.collaborators(),
        &ResolverSettings::default(),
        security,
        cache,
    )
    .expect("default settings compile")
}

/// Engine over the fixture registry with default settings and a local-only cache.
pub fn engine() -> (ResolutionEngine, Arc<CountingRegistry>) {
    let counting = CountingRegistry::new(registry());
    let engine = engine_with(
        &counting,
        &SecuritySettings::default(),
        ResolutionCache::new(&Default::default(), None),
    );
    (engine, counting)
}
