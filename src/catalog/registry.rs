//! In-process handler registry.
//!
//! # Responsibilities
//! - Store type descriptors for handlers, their bases and interfaces
//! - Answer existence, kind and subtype queries for namespace search
//! - Resolve methods through the parent chain for introspection
//! - Construct handler instances, checking declared dependencies first
//!
//! # Design Decisions
//! - Built once at startup, then shared read-only behind `Arc`
//! - Ancestor walks track visited names so a cyclic declaration terminates
//! - Types referenced as parents but never registered still appear in
//!   ancestor lists; the walk simply stops there

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::catalog::{
    Handler, HandlerFactory, InstantiationError, Introspection, MethodInfo, TypeCatalog, TypeInfo,
    TypeKind,
};

type FactoryFn = Arc<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

struct Registration {
    factory: FactoryFn,
    requires: Vec<String>,
}

/// A catalog of handler types with their factories.
#[derive(Default)]
pub struct HandlerRegistry {
    types: HashMap<String, TypeInfo>,
    factories: HashMap<String, Registration>,
    services: HashSet<String>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.types.len())
            .field("factories", &self.factories.len())
            .field("services", &self.services)
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor without a factory (bases, interfaces, helpers).
    pub fn register_type(mut self, info: TypeInfo) -> Self {
        let info = Self::stamp_declared_on(info);
        self.types.insert(info.name.clone(), info);
        self
    }

    /// Register a constructible handler type.
    pub fn register<F>(self, info: TypeInfo, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Handler> + Send + Sync + 'static,
    {
        self.register_with_deps(info, &[], factory)
    }

    /// Register a handler type whose construction needs named services.
    pub fn register_with_deps<F>(mut self, info: TypeInfo, requires: &[&str], factory: F) -> Self
    where
        F: Fn() -> Box<dyn Handler> + Send + Sync + 'static,
    {
        self.factories.insert(
            info.name.clone(),
            Registration {
                factory: Arc::new(factory),
                requires: requires.iter().map(|s| s.to_string()).collect(),
            },
        );
        self.register_type(info)
    }

    /// Mark a service as available to handler factories.
    pub fn provide(mut self, service: impl Into<String>) -> Self {
        self.services.insert(service.into());
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn stamp_declared_on(mut info: TypeInfo) -> TypeInfo {
        for method in &mut info.methods {
            if method.declared_on.is_empty() {
                method.declared_on = info.name.clone();
            }
        }
        info
    }

    /// Breadth-first walk over parents then interfaces, excluding `name`.
    fn walk_ancestors(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        seen.insert(name.to_string());
        queue.push_back(name.to_string());

        while let Some(current) = queue.pop_front() {
            let Some(info) = self.types.get(&current) else {
                continue;
            };
            for next in info.parent.iter().chain(info.interfaces.iter()) {
                if seen.insert(next.clone()) {
                    order.push(next.clone());
                    queue.push_back(next.clone());
                }
            }
        }
        order
    }

    /// Parent chain only, nearest first.
    fn parent_chain(&self, name: &str) -> Vec<&TypeInfo> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.types.get(name);
        while let Some(info) = current {
            if !seen.insert(info.name.as_str()) {
                break;
            }
            chain.push(info);
            current = info.parent.as_deref().and_then(|p| self.types.get(p));
        }
        chain
    }
}

impl TypeCatalog for HandlerRegistry {
    fn exists(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn kind(&self, name: &str) -> Option<TypeKind> {
        self.types.get(name).map(|t| t.kind)
    }

    fn is_subtype_of(&self, name: &str, base: &str) -> bool {
        if !self.exists(name) {
            return false;
        }
        name == base || self.walk_ancestors(name).iter().any(|a| a == base)
    }
}

impl Introspection for HandlerRegistry {
    fn method(&self, type_name: &str, method: &str) -> Option<MethodInfo> {
        self.parent_chain(type_name)
            .into_iter()
            .find_map(|info| info.methods.iter().find(|m| m.name == method))
            .cloned()
    }

    fn ancestors(&self, type_name: &str) -> Vec<String> {
        self.walk_ancestors(type_name)
    }
}

impl HandlerFactory for HandlerRegistry {
    fn instantiate(&self, type_name: &str) -> Result<Box<dyn Handler>, InstantiationError> {
        let registration =
            self.factories
                .get(type_name)
                .ok_or_else(|| InstantiationError::NotRegistered {
                    type_name: type_name.to_string(),
                })?;

        if let Some(missing) = registration
            .requires
            .iter()
            .find(|dep| !self.services.contains(*dep))
        {
            return Err(InstantiationError::MissingDependency {
                type_name: type_name.to_string(),
                dependency: missing.clone(),
            });
        }

        Ok((registration.factory)())
    }
}
