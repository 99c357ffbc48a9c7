//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check value ranges (lengths > 0, capacities > 0)
//! - Compile every security pattern once so bad regexes fail at load time
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DispatchConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{DispatchConfig, SharedBackend};
use crate::security::SecurityPolicy;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &DispatchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if !config.listener.dispatch_prefix.starts_with('/') {
        errors.push(ValidationError::new(
            "listener.dispatch_prefix",
            "must start with '/'",
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    let resolver = &config.resolver;
    if resolver.max_pattern_length == 0 {
        errors.push(ValidationError::new(
            "resolver.max_pattern_length",
            "must be greater than 0",
        ));
    }
    if resolver.namespaces.is_empty() {
        errors.push(ValidationError::new(
            "resolver.namespaces",
            "at least one base namespace is required",
        ));
    }
    if resolver.namespaces.iter().any(|ns| ns.trim().is_empty()) {
        errors.push(ValidationError::new(
            "resolver.namespaces",
            "namespaces must not be empty strings",
        ));
    }
    if resolver.handler_suffixes.iter().any(|s| s.trim().is_empty()) {
        errors.push(ValidationError::new(
            "resolver.handler_suffixes",
            "suffixes must not be empty strings",
        ));
    }
    if resolver.base_type.trim().is_empty() {
        errors.push(ValidationError::new(
            "resolver.base_type",
            "a base handler type is required",
        ));
    }

    let security = &config.security;
    if security.max_method_length == 0 {
        errors.push(ValidationError::new(
            "security.max_method_length",
            "must be greater than 0",
        ));
    }
    if security.mutating_verbs.is_empty() {
        errors.push(ValidationError::new(
            "security.mutating_verbs",
            "at least one mutating verb is required",
        ));
    }
    if security.enforce_namespace_allowlist && security.allowed_namespaces.is_empty() {
        errors.push(ValidationError::new(
            "security.allowed_namespaces",
            "allow-list enforcement is on but no namespace is allowed",
        ));
    }
    if let Err(e) = SecurityPolicy::compile(security) {
        errors.push(ValidationError::new("security", e.to_string()));
    }

    let cache = &config.cache;
    if cache.enabled && cache.local_capacity == 0 {
        errors.push(ValidationError::new(
            "cache.local_capacity",
            "must be greater than 0 when caching is enabled",
        ));
    }
    if cache.shared_backend == SharedBackend::Redis && !cfg!(feature = "redis") {
        errors.push(ValidationError::new(
            "cache.shared_backend",
            "redis backend requires the `redis` feature",
        ));
    }

    if config.admin.enabled && config.admin.api_key.len() < 8 {
        errors.push(ValidationError::new(
            "admin.api_key",
            "must be at least 8 characters",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&DispatchConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = DispatchConfig::default();
        config.resolver.namespaces.clear();
        config.security.max_method_length = 0;
        config.cache.local_capacity = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "resolver.namespaces",
                "security.max_method_length",
                "cache.local_capacity"
            ]
        );
    }

    #[test]
    fn test_bad_regex_rejected() {
        let mut config = DispatchConfig::default();
        config.security.blocked_method_patterns.push("(unclosed".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "security");
        assert!(errors[0].message.contains("(unclosed"));
    }

    #[test]
    fn test_enforced_allowlist_needs_entries() {
        let mut config = DispatchConfig::default();
        config.security.enforce_namespace_allowlist = true;
        config.security.allowed_namespaces.clear();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "security.allowed_namespaces");
    }
}
