//! Namespace and handler search.
//!
//! # Responsibilities
//! - Build the ordered candidate list for a parsed pattern
//! - Return the first candidate that exists, is concrete and extends the
//!   configured base handler type
//! - Report every attempted candidate when nothing qualifies
//!
//! # Candidate Order
//! ```text
//! for form in [Name+Suffix1, Name+Suffix2, ..., Name]:
//!     for root in namespaces:
//!         root.Ns1.Ns2.form
//! ```
//! Suffixed forms of every root are tried before any bare form, so a
//! conventionally named `UsersController` wins over a `Users` helper even
//! when the helper sits under an earlier root.
//!
//! # Design Decisions
//! - Deterministic: the list depends only on the pattern and settings
//! - Duplicates removed keeping the first occurrence
//! - A suffix already on the handler name is not appended again

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{TypeCatalog, TypeKind};
use crate::config::ResolverSettings;
use crate::routing::pattern::{RoutePattern, NAMESPACE_SEPARATOR};

/// A handler type confirmed to exist and to satisfy structural checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHandler {
    pub type_name: String,
    pub method: String,
    pub pattern: RoutePattern,
}

/// Why an existing candidate was passed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    NotConcrete { kind: TypeKind },
    NotSubtype { base: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotConcrete { kind } => write!(f, "{} type", kind.as_str()),
            RejectReason::NotSubtype { base } => write!(f, "does not extend {base}"),
        }
    }
}

/// A candidate that exists but cannot serve as a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedCandidate {
    pub name: String,
    pub reason: RejectReason,
}

/// No candidate resolved to a usable handler type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no handler found for '{pattern}' (tried {total_attempted} candidates: {})", .attempted.join(", "))]
pub struct HandlerNotFound {
    pub pattern: String,
    /// Attempted names in order, capped for reporting.
    pub attempted: Vec<String>,
    /// Number of candidates actually tried.
    pub total_attempted: usize,
    /// Candidates that exist but failed a structural check.
    pub rejected: Vec<RejectedCandidate>,
}

/// Settings the search runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub namespaces: Vec<String>,
    pub handler_suffixes: Vec<String>,
    pub base_type: String,
    pub max_reported_candidates: usize,
}

impl From<&ResolverSettings> for SearchSettings {
    fn from(settings: &ResolverSettings) -> Self {
        Self {
            namespaces: settings.namespaces.clone(),
            handler_suffixes: settings.handler_suffixes.clone(),
            base_type: settings.base_type.clone(),
            max_reported_candidates: settings.max_reported_candidates,
        }
    }
}

/// Convert one kebab-case or snake_case segment into a single capitalized word.
///
/// `user-profiles` and `user_profiles` both become `UserProfiles`; letters
/// after the first of each piece keep their case, so `adminPanel` becomes
/// `AdminPanel`.
pub fn canonical_segment(segment: &str) -> String {
    segment
        .split(['-', '_'])
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            let mut chars = piece.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Resolves parsed patterns to handler types.
#[derive(Clone)]
pub struct HandlerSearch {
    catalog: Arc<dyn TypeCatalog>,
    settings: SearchSettings,
}

impl fmt::Debug for HandlerSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSearch")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl HandlerSearch {
    pub fn new(catalog: Arc<dyn TypeCatalog>, settings: SearchSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// The ordered, de-duplicated candidate list for `pattern`.
    pub fn candidates(&self, pattern: &RoutePattern) -> Vec<String> {
        let handler = canonical_segment(pattern.handler());
        if handler.is_empty() {
            return Vec::new();
        }

        let namespace: Vec<String> = pattern
            .namespace()
            .iter()
            .map(|s| canonical_segment(s))
            .filter(|s| !s.is_empty())
            .collect();
        let sep = NAMESPACE_SEPARATOR.to_string();
        let relative_ns = namespace.join(sep.as_str());

        let mut forms: Vec<String> = self
            .settings
            .handler_suffixes
            .iter()
            .filter(|suffix| !handler.ends_with(suffix.as_str()))
            .map(|suffix| format!("{handler}{suffix}"))
            .collect();
        forms.push(handler);

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for form in &forms {
            for root in &self.settings.namespaces {
                let name = [root.as_str(), relative_ns.as_str(), form.as_str()]
                    .iter()
                    .filter(|part| !part.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(sep.as_str());
                if seen.insert(name.clone()) {
                    out.push(name);
                }
            }
        }
        out
    }

    pub fn search(&self, pattern: &RoutePattern) -> Result<ResolvedHandler, HandlerNotFound> {
        let candidates = self.candidates(pattern);
        let mut rejected = Vec::new();

        for (index, candidate) in candidates.iter().enumerate() {
            if !self.catalog.exists(candidate) {
                continue;
            }

            match self.check_structure(candidate) {
                Ok(()) => {
                    tracing::debug!(
                        pattern = %pattern.raw(),
                        handler = %candidate,
                        position = index,
                        "Handler resolved"
                    );
                    return Ok(ResolvedHandler {
                        type_name: candidate.clone(),
                        method: pattern.method().to_string(),
                        pattern: pattern.clone(),
                    });
                }
                Err(reason) => {
                    tracing::debug!(
                        pattern = %pattern.raw(),
                        candidate = %candidate,
                        %reason,
                        "Candidate exists but was skipped"
                    );
                    rejected.push(RejectedCandidate {
                        name: candidate.clone(),
                        reason,
                    });
                }
            }
        }

        let total_attempted = candidates.len();
        let mut attempted = candidates;
        attempted.truncate(self.settings.max_reported_candidates);

        Err(HandlerNotFound {
            pattern: pattern.raw().to_string(),
            attempted,
            total_attempted,
            rejected,
        })
    }

    fn check_structure(&self, candidate: &str) -> Result<(), RejectReason> {
        match self.catalog.kind(candidate) {
            Some(TypeKind::Concrete) => {}
            Some(kind) => return Err(RejectReason::NotConcrete { kind }),
            None => {
                return Err(RejectReason::NotSubtype {
                    base: self.settings.base_type.clone(),
                })
            }
        }
        if !self
            .catalog
            .is_subtype_of(candidate, &self.settings.base_type)
        {
            return Err(RejectReason::NotSubtype {
                base: self.settings.base_type.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{HandlerRegistry, TypeInfo};
    use crate::routing::pattern::PatternParser;

    const BASE: &str = "App.Http.Controllers.Controller";

    fn parse(raw: &str) -> RoutePattern {
        PatternParser::default().parse(raw).unwrap()
    }

    fn search_over(registry: HandlerRegistry) -> HandlerSearch {
        let registry = registry.register_type(TypeInfo::abstract_type(BASE));
        HandlerSearch::new(
            Arc::new(registry),
            SearchSettings::from(&ResolverSettings::default()),
        )
    }

    fn controller(name: &str) -> TypeInfo {
        TypeInfo::concrete(name).extends(BASE)
    }

    #[test]
    fn test_canonical_segment() {
        assert_eq!(canonical_segment("users"), "Users");
        assert_eq!(canonical_segment("user-profiles"), "UserProfiles");
        assert_eq!(canonical_segment("user_profiles"), "UserProfiles");
        assert_eq!(canonical_segment("adminPanel"), "AdminPanel");
        assert_eq!(canonical_segment("api-v2"), "ApiV2");
        assert_eq!(canonical_segment("--"), "");
    }

    #[test]
    fn test_candidate_order() {
        let search = search_over(HandlerRegistry::new());
        assert_eq!(
            search.candidates(&parse("admin.user-profiles@edit")),
            vec![
                "App.Http.Controllers.Admin.UserProfilesController",
                "App.Controllers.Admin.UserProfilesController",
                "App.Http.Controllers.Admin.UserProfilesHandler",
                "App.Controllers.Admin.UserProfilesHandler",
                "App.Http.Controllers.Admin.UserProfiles",
                "App.Controllers.Admin.UserProfiles",
            ]
        );
    }

    #[test]
    fn test_existing_suffix_not_doubled() {
        let search = search_over(HandlerRegistry::new());
        let candidates = search.candidates(&parse("users-controller@index"));
        assert_eq!(
            candidates,
            vec![
                "App.Http.Controllers.UsersControllerHandler",
                "App.Controllers.UsersControllerHandler",
                "App.Http.Controllers.UsersController",
                "App.Controllers.UsersController",
            ]
        );
    }

    #[test]
    fn test_empty_segments_ignored() {
        let search = search_over(HandlerRegistry::new());
        assert_eq!(
            search.candidates(&parse("admin..users@index"))[0],
            "App.Http.Controllers.Admin.UsersController"
        );
        assert!(search.candidates(&parse("admin.@index")).is_empty());
    }

    #[test]
    fn test_suffixed_form_preferred() {
        let search = search_over(
            HandlerRegistry::new()
                .register_type(controller("App.Http.Controllers.Users"))
                .register_type(controller("App.Controllers.UsersController")),
        );
        let resolved = search.search(&parse("users@index")).unwrap();
        assert_eq!(resolved.type_name, "App.Controllers.UsersController");
        assert_eq!(resolved.method, "index");
    }

    #[test]
    fn test_search_is_deterministic() {
        let search = search_over(
            HandlerRegistry::new()
                .register_type(controller("App.Http.Controllers.UsersHandler"))
                .register_type(controller("App.Controllers.UsersHandler")),
        );
        let first = search.search(&parse("users@index")).unwrap();
        for _ in 0..10 {
            assert_eq!(search.search(&parse("users@index")).unwrap(), first);
        }
        assert_eq!(first.type_name, "App.Http.Controllers.UsersHandler");
    }

    #[test]
    fn test_structural_failures_continue_search() {
        let search = search_over(
            HandlerRegistry::new()
                .register_type(TypeInfo::abstract_type("App.Http.Controllers.UsersController").extends(BASE))
                .register_type(TypeInfo::concrete("App.Controllers.UsersController"))
                .register_type(controller("App.Http.Controllers.UsersHandler")),
        );
        let resolved = search.search(&parse("users@index")).unwrap();
        assert_eq!(resolved.type_name, "App.Http.Controllers.UsersHandler");
    }

    #[test]
    fn test_not_found_lists_attempts_and_rejections() {
        let search = search_over(
            HandlerRegistry::new()
                .register_type(TypeInfo::interface("App.Controllers.MissingController")),
        );
        let err = search.search(&parse("missing@anything")).unwrap_err();
        assert_eq!(err.total_attempted, 6);
        assert_eq!(err.attempted.len(), 6);
        assert_eq!(err.attempted[0], "App.Http.Controllers.MissingController");
        assert_eq!(
            err.rejected,
            vec![RejectedCandidate {
                name: "App.Controllers.MissingController".to_string(),
                reason: RejectReason::NotConcrete {
                    kind: TypeKind::Interface
                },
            }]
        );
    }

    #[test]
    fn test_reported_candidates_capped() {
        let mut settings = SearchSettings::from(&ResolverSettings::default());
        settings.max_reported_candidates = 2;
        let search = HandlerSearch::new(Arc::new(HandlerRegistry::new()), settings);

        let err = search.search(&parse("missing@anything")).unwrap_err();
        assert_eq!(err.attempted.len(), 2);
        assert_eq!(err.total_attempted, 6);
    }
}
