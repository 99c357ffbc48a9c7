//! Handler catalog: the type system the resolver searches.
//!
//! # Data Flow
//! ```text
//! Application startup:
//!     HandlerRegistry::new()
//!     → register(TypeInfo, factory)   (concrete handlers)
//!     → register_type(TypeInfo)       (bases, interfaces, abstract helpers)
//!     → provide(service)              (satisfiable dependencies)
//!     → frozen behind Arc, shared by search, validation and instantiation
//!
//! Per request:
//!     HandlerSearch       → TypeCatalog   (exists / kind / is_subtype_of)
//!     SecurityValidator   → Introspection (method metadata, ancestors)
//!     ResolutionEngine    → HandlerFactory (fresh Handler instance)
//! ```
//!
//! # Design Decisions
//! - Rust has no runtime reflection, so handlers describe themselves with
//!   `TypeInfo` descriptors registered up front
//! - Three narrow traits instead of one, so tests can stub each collaborator
//! - Handler instances are created per request and never shared

pub mod registry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use registry::HandlerRegistry;

/// Structural kind of a catalogued type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Concrete,
    Abstract,
    Interface,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Concrete => "concrete",
            TypeKind::Abstract => "abstract",
            TypeKind::Interface => "interface",
        }
    }
}

/// Declared visibility of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    /// Fully-qualified declared type, if any.
    pub declared_type: Option<String>,
    /// Has a default value and can be omitted.
    pub optional: bool,
}

impl ParamInfo {
    pub fn required(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(declared_type.into()),
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(declared_type.into()),
            optional: true,
        }
    }
}

/// Metadata for one method as seen by the security validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub parameters: Vec<ParamInfo>,
    /// Type the method is declared on. Filled in by the registry when empty.
    pub declared_on: String,
    /// Documentation/metadata markers attached to the method itself.
    pub markers: Vec<String>,
}

impl MethodInfo {
    /// A public instance method without parameters.
    pub fn public(name: impl Into<String>) -> Self {
        Self::with_visibility(name, Visibility::Public)
    }

    pub fn with_visibility(name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            visibility,
            is_static: false,
            parameters: Vec::new(),
            declared_on: String::new(),
            markers: Vec::new(),
        }
    }

    pub fn make_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn param(mut self, param: ParamInfo) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Descriptor for a catalogued type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Fully-qualified, dot-separated name.
    pub name: String,
    pub kind: TypeKind,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodInfo>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn concrete(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Concrete)
    }

    pub fn abstract_type(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Abstract)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }
}

/// Type-existence oracle plus the structural checks needed by search.
pub trait TypeCatalog: Send + Sync {
    fn exists(&self, name: &str) -> bool;

    fn kind(&self, name: &str) -> Option<TypeKind>;

    /// True when `name` is `base` or transitively extends/implements it.
    fn is_subtype_of(&self, name: &str, base: &str) -> bool;
}

/// Method-level introspection used by the security validator.
pub trait Introspection: Send + Sync {
    /// Look up a method on the type or, failing that, on its ancestors.
    fn method(&self, type_name: &str, method: &str) -> Option<MethodInfo>;

    /// Parent chain and implemented interfaces, nearest first.
    fn ancestors(&self, type_name: &str) -> Vec<String>;
}

/// A live handler instance.
pub trait Handler: Send + Sync {
    /// Run `method`. `None` when the instance has no such entry point.
    fn invoke(&self, method: &str) -> Option<serde_json::Value>;
}

/// Construction collaborator.
pub trait HandlerFactory: Send + Sync {
    fn instantiate(&self, type_name: &str) -> Result<Box<dyn Handler>, InstantiationError>;
}

/// Errors raised while constructing a handler instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstantiationError {
    #[error("no factory registered for '{type_name}'")]
    NotRegistered { type_name: String },

    #[error("cannot construct '{type_name}': dependency '{dependency}' is not available")]
    MissingDependency {
        type_name: String,
        dependency: String,
    },
}

impl InstantiationError {
    pub fn type_name(&self) -> &str {
        match self {
            InstantiationError::NotRegistered { type_name }
            | InstantiationError::MissingDependency { type_name, .. } => type_name,
        }
    }
}

/// Namespace part of a dot-separated type name.
pub fn namespace_of(type_name: &str) -> &str {
    type_name.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("")
}

/// Unqualified part of a dot-separated type name.
pub fn short_name(type_name: &str) -> &str {
    type_name
        .rsplit_once('.')
        .map(|(_, name)| name)
        .unwrap_or(type_name)
}
