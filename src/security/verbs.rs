//! HTTP verb semantics.
//!
//! A method whose name says it changes state (`store`, `updateEmail`,
//! `destroy`) must not be reachable with a safe verb such as GET, which
//! crawlers, prefetchers and `<img>` tags issue freely.

/// True when `method` starts with one of `prefixes` on a word boundary.
///
/// The boundary is the end of the name or a following uppercase letter,
/// digit or underscore, so `destroyAll` and `update_email` match while
/// `stored` and `updates` do not.
pub fn is_destructive(method: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        let Some(head) = method.get(..prefix.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(prefix) {
            return false;
        }
        match method[prefix.len()..].chars().next() {
            None => true,
            Some(c) => c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_',
        }
    })
}

/// Methods registered in the HTTP method registry that clients commonly send.
pub const STANDARD_VERBS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "TRACE", "CONNECT",
];

/// Stands in for every extension method that is neither standard nor
/// configured as mutating. Not a valid method token, so no client can send it.
pub const EXTENSION_VERB: &str = "*";

/// Uppercased `verb`, or [`EXTENSION_VERB`] for unknown extension methods.
///
/// Every unknown extension method gets the same verdict (non-mutating),
/// so they share one memo and cache key instead of one per spelling.
pub fn canonical_verb(verb: &str, mutating_verbs: &[String]) -> String {
    let upper = verb.to_ascii_uppercase();
    if STANDARD_VERBS.contains(&upper.as_str()) || is_mutating(&upper, mutating_verbs) {
        upper
    } else {
        EXTENSION_VERB.to_string()
    }
}

/// True when `verb` is in the (uppercase) allowed set.
pub fn is_mutating(verb: &str, mutating_verbs: &[String]) -> bool {
    mutating_verbs
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(verb))
}
