//! Security validation subsystem.
//!
//! # Data Flow
//! ```text
//! ResolvedHandler (type, method) + inbound HTTP verb:
//!     → method syntax       (empty, length, character set)
//!     → exact blacklist     (case-insensitive)
//!     → leading underscore  (syntax, after the blacklist)
//!     → pattern blacklist   (regex)
//!     → introspection       (exists, public, non-static, markers,
//!                            parameter types, ancestors)
//!     → verbs.rs            (destructive names need a mutating verb)
//!     → namespace allow-list (optional)
//!     → Approved, or the first SecurityViolation
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: the first failing rule rejects
//! - No trust in client input: every path segment is attacker-controlled
//! - Every rejection carries a stable rule id and severity

pub mod policy;
pub mod validator;
pub mod verbs;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use policy::{NamePattern, NamespacePattern, PolicyError, SecurityPolicy};
pub use validator::SecurityValidator;

/// Operator-facing classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High and critical rejections always reach the operational log.
    pub fn is_security_event(&self) -> bool {
        *self >= Severity::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifiers for every validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    MethodSyntax,
    MethodBlacklist,
    MethodPatternBlacklist,
    MethodExists,
    MethodVisibility,
    MethodStatic,
    InternalMarker,
    DangerousParameter,
    BlockedAncestor,
    HttpVerbSemantics,
    NamespaceAllowlist,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::MethodSyntax => "method_syntax",
            Rule::MethodBlacklist => "method_blacklist",
            Rule::MethodPatternBlacklist => "method_pattern_blacklist",
            Rule::MethodExists => "method_exists",
            Rule::MethodVisibility => "method_visibility",
            Rule::MethodStatic => "method_static",
            Rule::InternalMarker => "internal_marker",
            Rule::DangerousParameter => "dangerous_parameter",
            Rule::BlockedAncestor => "blocked_ancestor",
            Rule::HttpVerbSemantics => "http_verb_semantics",
            Rule::NamespaceAllowlist => "namespace_allowlist",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Rule::MethodSyntax | Rule::MethodExists => Severity::Low,
            Rule::HttpVerbSemantics | Rule::NamespaceAllowlist => Severity::Medium,
            Rule::MethodBlacklist
            | Rule::MethodPatternBlacklist
            | Rule::MethodVisibility
            | Rule::MethodStatic => Severity::High,
            Rule::InternalMarker | Rule::DangerousParameter | Rule::BlockedAncestor => {
                Severity::Critical
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authoritative rejection from the validation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("security violation [{rule}/{severity}] {type_name}@{method}: {reason}")]
pub struct SecurityViolation {
    pub rule: Rule,
    pub severity: Severity,
    pub reason: String,
    pub type_name: String,
    pub method: String,
}

impl SecurityViolation {
    pub fn new(rule: Rule, type_name: &str, method: &str, reason: impl Into<String>) -> Self {
        Self {
            rule,
            severity: rule.severity(),
            reason: reason.into(),
            type_name: type_name.to_string(),
            method: method.to_string(),
        }
    }
}

/// Outcome of validating one (type, method, verb) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SecurityVerdict {
    Approved,
    Rejected(SecurityViolation),
}

impl SecurityVerdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, SecurityVerdict::Approved)
    }

    pub fn into_result(self) -> Result<(), SecurityViolation> {
        match self {
            SecurityVerdict::Approved => Ok(()),
            SecurityVerdict::Rejected(violation) => Err(violation),
        }
    }
}

impl From<Result<(), SecurityViolation>> for SecurityVerdict {
    fn from(result: Result<(), SecurityViolation>) -> Self {
        match result {
            Ok(()) => SecurityVerdict::Approved,
            Err(violation) => SecurityVerdict::Rejected(violation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::High.is_security_event());
        assert!(!Severity::Medium.is_security_event());
    }

    #[test]
    fn test_rule_ids_are_stable() {
        assert_eq!(Rule::HttpVerbSemantics.as_str(), "http_verb_semantics");
        assert_eq!(
            serde_json::to_string(&Rule::MethodBlacklist).unwrap(),
            "\"method_blacklist\""
        );
        assert_eq!(Rule::InternalMarker.severity(), Severity::Critical);
        assert_eq!(Rule::MethodSyntax.severity(), Severity::Low);
    }

    #[test]
    fn test_verdict_serde() {
        let verdict = SecurityVerdict::Rejected(SecurityViolation::new(
            Rule::HttpVerbSemantics,
            "App.Http.Controllers.UsersController",
            "destroy",
            "needs a mutating verb",
        ));
        let json = serde_json::to_string(&verdict).unwrap();
        let decoded: SecurityVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, verdict);

        let approved = serde_json::to_string(&SecurityVerdict::Approved).unwrap();
        assert_eq!(approved, r#"{"verdict":"approved"}"#);
    }
}
