//! Classified resolution failures.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::catalog::InstantiationError;
use crate::routing::{HandlerNotFound, PatternError};
use crate::security::{Rule, SecurityViolation};

/// Stable, machine-readable failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidPattern,
    HandlerNotFound,
    SecurityViolation,
    InstantiationFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidPattern => "invalid_pattern",
            ErrorCode::HandlerNotFound => "handler_not_found",
            ErrorCode::SecurityViolation => "security_violation",
            ErrorCode::InstantiationFailed => "instantiation_failed",
        }
    }
}

/// Every way a resolution can fail. None of these are ever cached.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    #[error(transparent)]
    HandlerNotFound(#[from] HandlerNotFound),

    #[error(transparent)]
    SecurityViolation(#[from] SecurityViolation),

    #[error("handler instantiation failed: {0}")]
    InstantiationFailed(#[from] InstantiationError),
}

impl ResolutionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ResolutionError::InvalidPattern(_) => ErrorCode::InvalidPattern,
            ResolutionError::HandlerNotFound(_) => ErrorCode::HandlerNotFound,
            ResolutionError::SecurityViolation(_) => ErrorCode::SecurityViolation,
            ResolutionError::InstantiationFailed(_) => ErrorCode::InstantiationFailed,
        }
    }

    /// HTTP status for adapters. A method that does not exist is a 404,
    /// not a 403, so probing cannot tell it apart from a missing handler.
    pub fn http_status(&self) -> u16 {
        match self {
            ResolutionError::InvalidPattern(_) => 400,
            ResolutionError::HandlerNotFound(_) => 404,
            ResolutionError::SecurityViolation(v) if v.rule == Rule::MethodExists => 404,
            ResolutionError::SecurityViolation(_) => 403,
            ResolutionError::InstantiationFailed(_) => 500,
        }
    }

    /// Structured context for operators.
    pub fn details(&self) -> Value {
        match self {
            ResolutionError::InvalidPattern(e) => json!({
                "pattern": e.pattern,
                "problem": e.kind,
                "message": e.to_string(),
            }),
            ResolutionError::HandlerNotFound(e) => json!({
                "pattern": e.pattern,
                "attempted": e.attempted,
                "total_attempted": e.total_attempted,
                "rejected": e.rejected,
            }),
            ResolutionError::SecurityViolation(v) => json!({
                "rule": v.rule,
                "severity": v.severity,
                "reason": v.reason,
                "handler": v.type_name,
                "method": v.method,
            }),
            ResolutionError::InstantiationFailed(e) => json!({
                "handler": e.type_name(),
                "message": e.to_string(),
            }),
        }
    }
}
