//! Route pattern parsing.
//!
//! # Responsibilities
//! - Reject malformed patterns before any type lookup happens
//! - Split `admin.users@edit` into namespace segments, handler and method
//!
//! # Design Decisions
//! - Character allow-list is checked byte-wise; anything non-ASCII fails
//! - Length is measured in characters and checked before the allow-list
//! - Empty dot-segments survive parsing so the raw form can always be
//!   rebuilt from the parts; search ignores them

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separates the handler path from the method name.
pub const METHOD_SEPARATOR: char = '@';

/// Separates namespace segments in the handler path.
pub const NAMESPACE_SEPARATOR: char = '.';

/// Why a raw pattern was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternErrorKind {
    Empty,
    TooLong { length: usize, max: usize },
    InvalidCharacter { character: char, position: usize },
    MissingSeparator,
    MultipleSeparators { count: usize },
    EmptyHandler,
    EmptyMethod,
}

/// The pattern could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid route pattern '{pattern}': {}", describe(.kind))]
pub struct PatternError {
    /// The offending input, truncated for reporting.
    pub pattern: String,
    pub kind: PatternErrorKind,
}

fn describe(kind: &PatternErrorKind) -> String {
    match kind {
        PatternErrorKind::Empty => "pattern is empty".to_string(),
        PatternErrorKind::TooLong { length, max } => {
            format!("pattern is {length} characters, limit is {max}")
        }
        PatternErrorKind::InvalidCharacter {
            character,
            position,
        } => format!("character {character:?} at position {position} is not allowed"),
        PatternErrorKind::MissingSeparator => {
            format!("missing '{METHOD_SEPARATOR}' method separator")
        }
        PatternErrorKind::MultipleSeparators { count } => {
            format!("expected one '{METHOD_SEPARATOR}', found {count}")
        }
        PatternErrorKind::EmptyHandler => "handler segment is empty".to_string(),
        PatternErrorKind::EmptyMethod => "method segment is empty".to_string(),
    }
}

const REPORTED_PATTERN_CHARS: usize = 64;

impl PatternError {
    fn new(raw: &str, kind: PatternErrorKind) -> Self {
        Self {
            pattern: raw.chars().take(REPORTED_PATTERN_CHARS).collect(),
            kind,
        }
    }
}

/// A parsed, immutable route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutePattern {
    namespace: Vec<String>,
    handler: String,
    method: String,
    raw: String,
}

impl RoutePattern {
    /// Namespace segments before the handler, in order.
    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Rebuild the pattern string from its parts.
    pub fn to_canonical(&self) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.namespace {
            out.push_str(segment);
            out.push(NAMESPACE_SEPARATOR);
        }
        out.push_str(&self.handler);
        out.push(METHOD_SEPARATOR);
        out.push_str(&self.method);
        out
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | METHOD_SEPARATOR)
}

/// Validates and decomposes raw pattern strings.
#[derive(Debug, Clone, Copy)]
pub struct PatternParser {
    max_length: usize,
}

impl Default for PatternParser {
    fn default() -> Self {
        Self::new(200)
    }
}

impl PatternParser {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn parse(&self, raw: &str) -> Result<RoutePattern, PatternError> {
        if raw.trim().is_empty() {
            return Err(PatternError::new(raw, PatternErrorKind::Empty));
        }

        let length = raw.chars().count();
        if length > self.max_length {
            return Err(PatternError::new(
                raw,
                PatternErrorKind::TooLong {
                    length,
                    max: self.max_length,
                },
            ));
        }

        if let Some((position, character)) = raw.chars().enumerate().find(|(_, c)| !is_allowed(*c))
        {
            return Err(PatternError::new(
                raw,
                PatternErrorKind::InvalidCharacter {
                    character,
                    position,
                },
            ));
        }

        let (controller, method) = match raw.matches(METHOD_SEPARATOR).count() {
            0 => return Err(PatternError::new(raw, PatternErrorKind::MissingSeparator)),
            1 => raw
                .split_once(METHOD_SEPARATOR)
                .ok_or_else(|| PatternError::new(raw, PatternErrorKind::MissingSeparator))?,
            count => {
                return Err(PatternError::new(
                    raw,
                    PatternErrorKind::MultipleSeparators { count },
                ))
            }
        };

        if controller.is_empty() {
            return Err(PatternError::new(raw, PatternErrorKind::EmptyHandler));
        }
        if method.is_empty() {
            return Err(PatternError::new(raw, PatternErrorKind::EmptyMethod));
        }

        let mut namespace: Vec<String> = controller
            .split(NAMESPACE_SEPARATOR)
            .map(str::to_string)
            .collect();
        // split always yields at least one item
        let handler = namespace.pop().unwrap_or_default();

        Ok(RoutePattern {
            namespace,
            handler,
            method: method.to_string(),
            raw: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kind(raw: &str) -> PatternErrorKind {
        PatternParser::default().parse(raw).unwrap_err().kind
    }

    #[test]
    fn test_parse_simple() {
        let p = PatternParser::default().parse("users@index").unwrap();
        assert!(p.namespace().is_empty());
        assert_eq!(p.handler(), "users");
        assert_eq!(p.method(), "index");
        assert_eq!(p.raw(), "users@index");
    }

    #[test]
    fn test_parse_namespaced() {
        let p = PatternParser::default()
            .parse("admin.user-profiles@edit_form")
            .unwrap();
        assert_eq!(p.namespace(), ["admin".to_string()]);
        assert_eq!(p.handler(), "user-profiles");
        assert_eq!(p.method(), "edit_form");
    }

    #[test]
    fn test_structural_rejections() {
        assert_eq!(kind(""), PatternErrorKind::Empty);
        assert_eq!(kind("   \t"), PatternErrorKind::Empty);
        assert_eq!(kind("usersindex"), PatternErrorKind::MissingSeparator);
        assert_eq!(
            kind("users@index@x"),
            PatternErrorKind::MultipleSeparators { count: 2 }
        );
        assert_eq!(kind("@index"), PatternErrorKind::EmptyHandler);
        assert_eq!(kind("users@"), PatternErrorKind::EmptyMethod);
        assert_eq!(
            kind("users@in dex"),
            PatternErrorKind::InvalidCharacter {
                character: ' ',
                position: 8
            }
        );
        assert_eq!(
            kind("../etc/passwd@x"),
            PatternErrorKind::InvalidCharacter {
                character: '/',
                position: 2
            }
        );
    }

    #[test]
    fn test_length_limit() {
        let ok = format!("{}@m", "a".repeat(198));
        assert!(PatternParser::default().parse(&ok).is_ok());

        let long = format!("{}@m", "a".repeat(199));
        assert_eq!(
            kind(&long),
            PatternErrorKind::TooLong {
                length: 201,
                max: 200
            }
        );
        assert!(PatternParser::new(300).parse(&long).is_ok());
    }

    #[test]
    fn test_error_pattern_is_truncated() {
        let long = "x".repeat(500);
        let err = PatternParser::default().parse(&long).unwrap_err();
        assert_eq!(err.pattern.len(), 64);
    }

    proptest! {
        #[test]
        fn prop_valid_patterns_round_trip(
            controller in "[A-Za-z0-9_.-]{1,80}",
            method in "[A-Za-z0-9_.-]{1,80}",
        ) {
            let raw = format!("{controller}@{method}");
            let parsed = PatternParser::default().parse(&raw).unwrap();
            prop_assert_eq!(parsed.to_canonical(), raw);
        }

        #[test]
        fn prop_bad_character_rejected(
            prefix in "[a-z]{1,10}",
            bad in "[^A-Za-z0-9_.@-]",
        ) {
            let raw = format!("{prefix}{bad}@index");
            let rejected = PatternParser::default().parse(&raw).is_err();
            prop_assert!(rejected);
        }

        #[test]
        fn prop_separator_count_enforced(
            parts in proptest::collection::vec("[a-z]{1,5}", 3..6),
        ) {
            let raw = parts.join("@");
            let result = PatternParser::default().parse(&raw);
            let is_multiple = matches!(
                result,
                Err(PatternError { kind: PatternErrorKind::MultipleSeparators { .. }, .. })
            );
            prop_assert!(is_multiple);
        }
    }
}
