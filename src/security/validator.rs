//! Security validation pipeline.
//!
//! # Responsibilities
//! - Evaluate the ordered rule set for one (type, method, verb) tuple
//! - Short-circuit on the first failing rule
//! - Report high and critical rejections to the operational log
//! - Memoize approvals for the lifetime of the compiled policy, bounded
//!   by `approval_memo_capacity` with least-recently-used eviction
//!
//! # Design Decisions
//! - Rules that only look at the method name run before introspection,
//!   so blacklisted names never reach the catalog
//! - Rejections are never memoized; only approvals are
//! - Verbs are canonicalized before evaluation and memo lookup: uppercased,
//!   with unknown extension methods folded into one key

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::catalog::Introspection;
use crate::observability::metrics;
use crate::security::policy::SecurityPolicy;
use crate::security::verbs::{is_destructive, is_mutating};
use crate::security::{Rule, SecurityVerdict, SecurityViolation, Severity};

type ApprovalKey = (String, String, String);

/// Decides whether a handler method may be invoked dynamically.
pub struct SecurityValidator {
    policy: Arc<SecurityPolicy>,
    introspection: Arc<dyn Introspection>,
    /// `None` when the memo is disabled.
    approvals: Option<Mutex<LruCache<ApprovalKey, ()>>>,
}

impl fmt::Debug for SecurityValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityValidator")
            .field("policy", &self.policy)
            .field("approvals", &self.approvals())
            .finish_non_exhaustive()
    }
}

impl SecurityValidator {
    pub fn new(policy: Arc<SecurityPolicy>, introspection: Arc<dyn Introspection>) -> Self {
        let approvals = NonZeroUsize::new(policy.approval_memo_capacity())
            .map(|cap| Mutex::new(LruCache::new(cap)));
        Self {
            policy,
            introspection,
            approvals,
        }
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Number of memoized approvals.
    pub fn approvals(&self) -> usize {
        self.approvals.as_ref().map_or(0, |memo| {
            memo.lock().expect("approval memo mutex poisoned").len()
        })
    }

    pub fn clear_approvals(&self) {
        if let Some(memo) = &self.approvals {
            memo.lock().expect("approval memo mutex poisoned").clear();
        }
    }

    fn is_memoized(&self, key: &ApprovalKey) -> bool {
        self.approvals.as_ref().is_some_and(|memo| {
            memo.lock()
                .expect("approval memo mutex poisoned")
                .get(key)
                .is_some()
        })
    }

    fn memoize(&self, key: ApprovalKey) {
        if let Some(memo) = &self.approvals {
            memo.lock().expect("approval memo mutex poisoned").put(key, ());
        }
    }

    pub fn validate(
        &self,
        type_name: &str,
        method: &str,
        verb: &str,
    ) -> Result<(), SecurityViolation> {
        self.evaluate(type_name, method, verb).into_result()
    }

    pub fn evaluate(&self, type_name: &str, method: &str, verb: &str) -> SecurityVerdict {
        let verb = self.policy.canonical_verb(verb);
        let key = (type_name.to_string(), method.to_string(), verb);
        if self.is_memoized(&key) {
            return SecurityVerdict::Approved;
        }

        match self.run_rules(type_name, method, &key.2) {
            Ok(()) => {
                self.memoize(key);
                SecurityVerdict::Approved
            }
            Err(violation) => {
                report(&violation);
                SecurityVerdict::Rejected(violation)
            }
        }
    }

    fn run_rules(&self, type_name: &str, method: &str, verb: &str) -> Result<(), SecurityViolation> {
        self.check_syntax(type_name, method)?;
        self.check_blacklist(type_name, method)?;
        self.check_leading_underscore(type_name, method)?;
        self.check_pattern_blacklist(type_name, method)?;
        self.check_introspection(type_name, method)?;
        self.check_verb(type_name, method, verb)?;
        self.check_namespace(type_name, method)?;
        Ok(())
    }

    fn check_syntax(&self, type_name: &str, method: &str) -> Result<(), SecurityViolation> {
        let violation = |reason: String| {
            Err(SecurityViolation::new(
                Rule::MethodSyntax,
                type_name,
                method,
                reason,
            ))
        };

        if method.is_empty() {
            return violation("method name is empty".to_string());
        }
        if method.len() > self.policy.max_method_length {
            return violation(format!(
                "method name is {} characters, limit is {}",
                method.len(),
                self.policy.max_method_length
            ));
        }
        if let Some(c) = method
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return violation(format!("character {c:?} is not allowed in a method name"));
        }
        Ok(())
    }

    fn check_blacklist(&self, type_name: &str, method: &str) -> Result<(), SecurityViolation> {
        if self.policy.is_blocked_method(method) {
            return Err(SecurityViolation::new(
                Rule::MethodBlacklist,
                type_name,
                method,
                format!("method '{method}' is on the blocked method list"),
            ));
        }
        Ok(())
    }

    fn check_leading_underscore(
        &self,
        type_name: &str,
        method: &str,
    ) -> Result<(), SecurityViolation> {
        if method.starts_with('_') {
            return Err(SecurityViolation::new(
                Rule::MethodSyntax,
                type_name,
                method,
                "method name must not start with '_'",
            ));
        }
        Ok(())
    }

    fn check_pattern_blacklist(
        &self,
        type_name: &str,
        method: &str,
    ) -> Result<(), SecurityViolation> {
        if let Some(re) = self.policy.blocked_pattern_for(method) {
            return Err(SecurityViolation::new(
                Rule::MethodPatternBlacklist,
                type_name,
                method,
                format!("method '{method}' matches blocked pattern '{}'", re.as_str()),
            ));
        }
        Ok(())
    }

    fn check_introspection(&self, type_name: &str, method: &str) -> Result<(), SecurityViolation> {
        let Some(info) = self.introspection.method(type_name, method) else {
            return Err(SecurityViolation::new(
                Rule::MethodExists,
                type_name,
                method,
                format!("method '{method}' does not exist on {type_name}"),
            ));
        };

        if !info.is_public() {
            return Err(SecurityViolation::new(
                Rule::MethodVisibility,
                type_name,
                method,
                format!("method '{method}' is {:?}, not public", info.visibility).to_lowercase(),
            ));
        }

        if info.is_static {
            return Err(SecurityViolation::new(
                Rule::MethodStatic,
                type_name,
                method,
                format!("method '{method}' is static"),
            ));
        }

        if let Some(marker) = self.policy.internal_marker_in(&info.markers) {
            return Err(SecurityViolation::new(
                Rule::InternalMarker,
                type_name,
                method,
                format!("method '{method}' is marked '{marker}'"),
            ));
        }

        if let Some(param) = info.parameters.iter().find(|p| {
            !p.optional
                && p.declared_type
                    .as_deref()
                    .is_some_and(|t| self.policy.is_dangerous_parameter_type(t))
        }) {
            return Err(SecurityViolation::new(
                Rule::DangerousParameter,
                type_name,
                method,
                format!(
                    "required parameter '{}' has capability type '{}'",
                    param.name,
                    param.declared_type.as_deref().unwrap_or_default()
                ),
            ));
        }

        let declared_on = if info.declared_on.is_empty() {
            type_name
        } else {
            info.declared_on.as_str()
        };
        let blocked = std::iter::once(declared_on.to_string())
            .chain(self.introspection.ancestors(declared_on))
            .find(|t| self.policy.is_blocked_ancestor(t));
        if let Some(ancestor) = blocked {
            return Err(SecurityViolation::new(
                Rule::BlockedAncestor,
                type_name,
                method,
                format!("method '{method}' is declared on or inherited from {ancestor}"),
            ));
        }

        Ok(())
    }

    fn check_verb(&self, type_name: &str, method: &str, verb: &str) -> Result<(), SecurityViolation> {
        if is_destructive(method, self.policy.destructive_prefixes())
            && !is_mutating(verb, self.policy.mutating_verbs())
        {
            return Err(SecurityViolation::new(
                Rule::HttpVerbSemantics,
                type_name,
                method,
                format!(
                    "method '{method}' changes state and requires one of {}, got {verb}",
                    self.policy.mutating_verbs().join(", ")
                ),
            ));
        }
        Ok(())
    }

    fn check_namespace(&self, type_name: &str, method: &str) -> Result<(), SecurityViolation> {
        if self.policy.namespace_allowed(type_name) == Some(false) {
            return Err(SecurityViolation::new(
                Rule::NamespaceAllowlist,
                type_name,
                method,
                format!("{type_name} is outside the allowed namespaces"),
            ));
        }
        Ok(())
    }
}

fn report(violation: &SecurityViolation) {
    metrics::record_violation(violation.rule, violation.severity);
    match violation.severity {
        Severity::Critical => tracing::error!(
            rule = %violation.rule,
            severity = %violation.severity,
            handler = %violation.type_name,
            method = %violation.method,
            reason = %violation.reason,
            "Security violation"
        ),
        Severity::High => tracing::warn!(
            rule = %violation.rule,
            severity = %violation.severity,
            handler = %violation.type_name,
            method = %violation.method,
            reason = %violation.reason,
            "Security violation"
        ),
        Severity::Medium | Severity::Low => tracing::debug!(
            rule = %violation.rule,
            severity = %violation.severity,
            handler = %violation.type_name,
            method = %violation.method,
            reason = %violation.reason,
            "Method rejected"
        ),
    }
}
