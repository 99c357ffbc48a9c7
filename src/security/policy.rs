//! Compiled security policy.
//!
//! # Responsibilities
//! - Turn `SecuritySettings` into lookup-friendly structures once
//! - Compile blacklist regexes up front so bad patterns fail at load
//! - Provide the name and namespace matchers used by the validator
//!
//! # Design Decisions
//! - Immutable after compilation; a config change builds a new policy
//! - Blacklist comparison is case-insensitive (names are lowercased here)
//! - Wildcards are trailing-only (`Reflection*`, `App.Http.*`), no globs

use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

use crate::catalog::{namespace_of, short_name};
use crate::config::SecuritySettings;
use crate::security::verbs::canonical_verb;

/// Errors raised while compiling a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid blocked method pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Type-name matcher with an optional trailing `*`.
///
/// Matches against both the fully-qualified and the short name, so
/// `Reflection*` catches `ReflectionClass` and `Vendor.ReflectionMethod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    Exact(String),
    Prefix(String),
}

impl NamePattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => NamePattern::Prefix(prefix.to_string()),
            None => NamePattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, type_name: &str) -> bool {
        let short = short_name(type_name);
        match self {
            NamePattern::Exact(name) => type_name == name || short == name,
            NamePattern::Prefix(prefix) => {
                type_name.starts_with(prefix.as_str()) || short.starts_with(prefix.as_str())
            }
        }
    }
}

/// Namespace allow-pattern.
///
/// `App.Http.*` allows the `App.Http` namespace and everything below it;
/// `App.Http` allows exactly that namespace; `*` allows everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespacePattern {
    Any,
    Exact(String),
    Subtree(String),
}

impl NamespacePattern {
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            return NamespacePattern::Any;
        }
        match pattern.strip_suffix(".*") {
            Some(root) => NamespacePattern::Subtree(root.to_string()),
            None => NamespacePattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches_namespace(&self, namespace: &str) -> bool {
        match self {
            NamespacePattern::Any => true,
            NamespacePattern::Exact(ns) => namespace == ns,
            NamespacePattern::Subtree(root) => {
                namespace == root
                    || namespace
                        .strip_prefix(root.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            }
        }
    }
}

/// Security settings compiled for evaluation.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    pub(crate) max_method_length: usize,
    pub(crate) blocked_methods: HashSet<String>,
    pub(crate) blocked_patterns: Vec<Regex>,
    pub(crate) internal_markers: HashSet<String>,
    pub(crate) dangerous_parameter_types: Vec<NamePattern>,
    pub(crate) blocked_ancestors: Vec<NamePattern>,
    pub(crate) destructive_prefixes: Vec<String>,
    pub(crate) mutating_verbs: Vec<String>,
    pub(crate) namespace_allowlist: Option<Vec<NamespacePattern>>,
    pub(crate) approval_memo_capacity: usize,
}

impl SecurityPolicy {
    pub fn compile(settings: &SecuritySettings) -> Result<Self, PolicyError> {
        let blocked_patterns = settings
            .blocked_method_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| PolicyError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let namespace_allowlist = settings.enforce_namespace_allowlist.then(|| {
            settings
                .allowed_namespaces
                .iter()
                .map(|p| NamespacePattern::parse(p))
                .collect()
        });

        Ok(Self {
            max_method_length: settings.max_method_length,
            blocked_methods: settings
                .blocked_methods
                .iter()
                .map(|m| m.to_ascii_lowercase())
                .collect(),
            blocked_patterns,
            internal_markers: settings
                .internal_markers
                .iter()
                .map(|m| normalize_marker(m))
                .collect(),
            dangerous_parameter_types: settings
                .dangerous_parameter_types
                .iter()
                .map(|p| NamePattern::parse(p))
                .collect(),
            blocked_ancestors: settings
                .blocked_ancestors
                .iter()
                .map(|p| NamePattern::parse(p))
                .collect(),
            destructive_prefixes: settings.destructive_method_prefixes.clone(),
            mutating_verbs: settings
                .mutating_verbs
                .iter()
                .map(|v| v.to_ascii_uppercase())
                .collect(),
            namespace_allowlist,
            approval_memo_capacity: settings.approval_memo_capacity,
        })
    }

    /// See [`canonical_verb`].
    pub fn canonical_verb(&self, verb: &str) -> String {
        canonical_verb(verb, &self.mutating_verbs)
    }

    pub fn approval_memo_capacity(&self) -> usize {
        self.approval_memo_capacity
    }

    pub fn max_method_length(&self) -> usize {
        self.max_method_length
    }

    pub fn is_blocked_method(&self, method: &str) -> bool {
        self.blocked_methods.contains(&method.to_ascii_lowercase())
    }

    /// The first blacklist regex matching `method`.
    pub fn blocked_pattern_for(&self, method: &str) -> Option<&Regex> {
        self.blocked_patterns.iter().find(|re| re.is_match(method))
    }

    /// The first marker that hides a method, as written on the method.
    pub fn internal_marker_in<'a>(&self, markers: &'a [String]) -> Option<&'a String> {
        markers
            .iter()
            .find(|m| self.internal_markers.contains(&normalize_marker(m)))
    }

    pub fn is_dangerous_parameter_type(&self, type_name: &str) -> bool {
        self.dangerous_parameter_types
            .iter()
            .any(|p| p.matches(type_name))
    }

    pub fn is_blocked_ancestor(&self, type_name: &str) -> bool {
        self.blocked_ancestors.iter().any(|p| p.matches(type_name))
    }

    pub fn destructive_prefixes(&self) -> &[String] {
        &self.destructive_prefixes
    }

    pub fn mutating_verbs(&self) -> &[String] {
        &self.mutating_verbs
    }

    /// `None` when the allow-list is not enforced.
    pub fn namespace_allowed(&self, type_name: &str) -> Option<bool> {
        let patterns = self.namespace_allowlist.as_ref()?;
        let namespace = namespace_of(type_name);
        Some(patterns.iter().any(|p| p.matches_namespace(namespace)))
    }
}

/// `@Internal` and ` internal` both normalize to `internal`.
fn normalize_marker(marker: &str) -> String {
    marker
        .trim()
        .trim_start_matches('@')
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SecurityPolicy {
        SecurityPolicy::compile(&SecuritySettings::default()).unwrap()
    }

    #[test]
    fn test_blacklist_is_case_insensitive() {
        let p = policy();
        assert!(p.is_blocked_method("middleware"));
        assert!(p.is_blocked_method("Middleware"));
        assert!(p.is_blocked_method("MIDDLEWARE"));
        assert!(p.is_blocked_method("__CONSTRUCT"));
        assert!(!p.is_blocked_method("index"));
    }

    #[test]
    fn test_pattern_blacklist() {
        let p = policy();
        assert!(p.blocked_pattern_for("resetPassword").is_some());
        assert!(p.blocked_pattern_for("PASSWORDS").is_some());
        assert!(p.blocked_pattern_for("_helper").is_some());
        assert!(p.blocked_pattern_for("show").is_none());
    }

    #[test]
    fn test_invalid_regex() {
        let mut settings = SecuritySettings::default();
        settings.blocked_method_patterns = vec!["[".to_string()];
        let err = SecurityPolicy::compile(&settings).unwrap_err();
        assert!(err.to_string().contains("'['"));
    }

    #[test]
    fn test_name_pattern() {
        let prefix = NamePattern::parse("Reflection*");
        assert!(prefix.matches("ReflectionClass"));
        assert!(prefix.matches("Vendor.Meta.ReflectionMethod"));
        assert!(!prefix.matches("App.Models.User"));

        let exact = NamePattern::parse("Closure");
        assert!(exact.matches("Closure"));
        assert!(exact.matches("Std.Closure"));
        assert!(!exact.matches("ClosureFactory"));
    }

    #[test]
    fn test_namespace_pattern() {
        let subtree = NamespacePattern::parse("App.Http.*");
        assert!(subtree.matches_namespace("App.Http"));
        assert!(subtree.matches_namespace("App.Http.Controllers.Admin"));
        assert!(!subtree.matches_namespace("App.HttpClient"));
        assert!(!subtree.matches_namespace("App"));

        let exact = NamespacePattern::parse("App.Http.Controllers");
        assert!(exact.matches_namespace("App.Http.Controllers"));
        assert!(!exact.matches_namespace("App.Http.Controllers.Admin"));

        assert!(NamespacePattern::parse("*").matches_namespace(""));
    }

    #[test]
    fn test_allowlist_gated() {
        assert_eq!(policy().namespace_allowed("Vendor.Anything"), None);

        let mut settings = SecuritySettings::default();
        settings.enforce_namespace_allowlist = true;
        let p = SecurityPolicy::compile(&settings).unwrap();
        assert_eq!(
            p.namespace_allowed("App.Http.Controllers.UsersController"),
            Some(true)
        );
        assert_eq!(p.namespace_allowed("Vendor.Tools.Shell"), Some(false));
    }

    #[test]
    fn test_internal_markers() {
        let p = policy();
        let markers = vec!["@deprecated".to_string(), "@Internal use only".to_string()];
        assert_eq!(p.internal_marker_in(&markers), Some(&markers[1]));
        assert_eq!(p.internal_marker_in(&["@api".to_string()]), None);
    }
}
