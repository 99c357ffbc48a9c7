//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the route dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Listener configuration (bind address, dispatch prefix).
    pub listener: ListenerConfig,

    /// Pattern parsing and namespace search settings.
    pub resolver: ResolverSettings,

    /// Security validation rules.
    pub security: SecuritySettings,

    /// Resolution cache settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path prefix under which patterns are dispatched.
    pub dispatch_prefix: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Include rule, severity and candidate details in error bodies.
    pub expose_error_details: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            dispatch_prefix: "/_dispatch".to_string(),
            request_timeout_secs: 30,
            expose_error_details: false,
        }
    }
}

/// Settings that shape how a pattern becomes a handler type.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ResolverSettings {
    /// Maximum accepted pattern length in characters.
    pub max_pattern_length: usize,

    /// Base namespaces searched in order.
    pub namespaces: Vec<String>,

    /// Conventional type suffixes, tried before the bare handler name.
    pub handler_suffixes: Vec<String>,

    /// Every resolved handler must be a subtype of this type.
    pub base_type: String,

    /// How many attempted candidates a `HandlerNotFound` reports.
    pub max_reported_candidates: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_pattern_length: 200,
            namespaces: vec![
                "App.Http.Controllers".to_string(),
                "App.Controllers".to_string(),
            ],
            handler_suffixes: vec!["Controller".to_string(), "Handler".to_string()],
            base_type: "App.Http.Controllers.Controller".to_string(),
            max_reported_candidates: 20,
        }
    }
}

/// Security validation settings.
///
/// Lists are kept as `Vec` so the serialized form, and with it the
/// configuration fingerprint, is deterministic.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecuritySettings {
    /// Maximum method name length.
    pub max_method_length: usize,

    /// Method names that are never callable (case-insensitive).
    pub blocked_methods: Vec<String>,

    /// Regular expressions a method name must not match.
    pub blocked_method_patterns: Vec<String>,

    /// Doc/metadata markers that hide a method regardless of visibility.
    pub internal_markers: Vec<String>,

    /// Parameter types that must not appear as required parameters.
    /// A trailing `*` matches any suffix.
    pub dangerous_parameter_types: Vec<String>,

    /// Types a callable method must not be declared on or inherited from.
    /// A trailing `*` matches any suffix.
    pub blocked_ancestors: Vec<String>,

    /// Method name prefixes conventionally meaning a state change.
    pub destructive_method_prefixes: Vec<String>,

    /// HTTP verbs allowed to reach a destructive method.
    pub mutating_verbs: Vec<String>,

    /// Reject handler types outside `allowed_namespaces`.
    pub enforce_namespace_allowlist: bool,

    /// Namespace allow-patterns; `App.Http.*` covers `App.Http` and below.
    pub allowed_namespaces: Vec<String>,

    /// Most approvals remembered by the validator (0 = no memo).
    pub approval_memo_capacity: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            max_method_length: 100,
            blocked_methods: default_blocked_methods(),
            blocked_method_patterns: vec!["(?i)password".to_string(), "^_".to_string()],
            internal_markers: vec!["internal".to_string(), "private".to_string()],
            dangerous_parameter_types: vec![
                "Reflection*".to_string(),
                "Closure".to_string(),
                "Container".to_string(),
                "Application".to_string(),
            ],
            blocked_ancestors: vec!["Reflection*".to_string()],
            destructive_method_prefixes: vec![
                "store".to_string(),
                "update".to_string(),
                "destroy".to_string(),
                "delete".to_string(),
                "remove".to_string(),
            ],
            mutating_verbs: vec![
                "POST".to_string(),
                "PUT".to_string(),
                "PATCH".to_string(),
                "DELETE".to_string(),
            ],
            enforce_namespace_allowlist: false,
            allowed_namespaces: vec!["App.Http.Controllers.*".to_string()],
            approval_memo_capacity: 1000,
        }
    }
}

fn default_blocked_methods() -> Vec<String> {
    [
        // Construction, destruction and magic hooks
        "__construct",
        "__destruct",
        "__call",
        "__callStatic",
        "__get",
        "__set",
        "__isset",
        "__unset",
        "__invoke",
        "__clone",
        "__toString",
        "__sleep",
        "__wakeup",
        "__serialize",
        "__unserialize",
        "__set_state",
        "__debugInfo",
        "new",
        "drop",
        "clone",
        // Framework lifecycle
        "middleware",
        "getMiddleware",
        "callAction",
        "resolveRouteBinding",
        "resolveChildRouteBinding",
        "getRouteKey",
        "getRouteKeyName",
        "authorize",
        "authorizeResource",
        "validate",
        "validateWith",
        "dispatch",
        "dispatchNow",
        "dispatchSync",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Which store backs the shared cache tier.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SharedBackend {
    /// Process-local concurrent map, optionally persisted to a JSON file.
    Memory,
    /// Redis-compatible server (requires the `redis` feature).
    Redis,
}

/// Resolution cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable caching of successful resolutions.
    pub enabled: bool,

    /// Maximum entries held in the in-process tier.
    pub local_capacity: usize,

    /// Shared tier backend.
    pub shared_backend: SharedBackend,

    /// Time-to-live for shared entries in seconds (0 = no expiry).
    pub shared_ttl_secs: u64,

    /// Upper bound for a single shared-store round trip in milliseconds.
    pub shared_timeout_ms: u64,

    /// Prefix applied to every shared-store key.
    pub key_prefix: String,

    /// Redis connection URL when `shared_backend = "redis"`.
    pub redis_url: String,

    /// JSON file the memory backend is loaded from and saved to.
    pub persistence_path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            local_capacity: 1000,
            shared_backend: SharedBackend::Memory,
            shared_ttl_secs: 3600,
            shared_timeout_ms: 50,
            key_prefix: "route-dispatch:".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            persistence_path: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format.
    pub log_format: LogFormat,

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Enable Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_filter: "route_dispatch=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// Bearer token required by every admin route.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: "admin-secret-key".to_string(),
        }
    }
}
