//! Title normalization.
//!
//! Every comparison between two article titles in the engine goes through
//! [`NormalizedTitle`]: Wikipedia treats `Ada Lovelace`, `ada lovelace` and
//! `Ada_Lovelace` as the same page, so raw titles are never compared directly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical comparison key for an article title.
///
/// Case-folded, with underscores and whitespace runs collapsed to single
/// spaces. Two titles refer to the same page (modulo redirects) iff their
/// normalized forms are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedTitle(String);

impl NormalizedTitle {
    /// Normalize a raw title: trim, lowercase, unify `_` and whitespace.
    pub fn from_raw(raw: &str) -> Self {
        let mut out = String::with_capacity(raw.len());
        let mut pending_space = false;
        for c in raw.trim().chars() {
            if c == '_' || c.is_whitespace() {
                pending_space = true;
                continue;
            }
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a raw title normalizes to this key.
    pub fn matches_raw(&self, raw: &str) -> bool {
        Self::from_raw(raw) == *self
    }
}

impl fmt::Display for NormalizedTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_fold() {
        assert_eq!(
            NormalizedTitle::from_raw("Ada Lovelace"),
            NormalizedTitle::from_raw("ada lovelace")
        );
    }

    #[test]
    fn test_normalize_underscores_and_spaces() {
        assert_eq!(
            NormalizedTitle::from_raw("Ada_Lovelace"),
            NormalizedTitle::from_raw("Ada Lovelace")
        );
        assert_eq!(
            NormalizedTitle::from_raw("  Ada   Lovelace "),
            NormalizedTitle::from_raw("Ada Lovelace")
        );
        assert_eq!(
            NormalizedTitle::from_raw("Ada _ Lovelace").as_str(),
            "ada lovelace"
        );
    }

    #[test]
    fn test_normalize_unicode_lowercase() {
        assert_eq!(
            NormalizedTitle::from_raw("Kurt Gödel"),
            NormalizedTitle::from_raw("kurt gödel")
        );
    }

    #[test]
    fn test_matches_raw() {
        let key = NormalizedTitle::from_raw("Voyager 1");
        assert!(key.matches_raw("voyager_1"));
        assert!(!key.matches_raw("Voyager 2"));
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert_eq!(NormalizedTitle::from_raw("").as_str(), "");
        assert_eq!(NormalizedTitle::from_raw("  _ ").as_str(), "");
    }
}
