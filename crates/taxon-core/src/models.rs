//! Core data models for taxon.
//!
//! These types are shared across the taxon crates and represent the
//! taxonomy domain entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// VOCABULARY TYPES
// =============================================================================

/// A named namespace grouping related terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Vocabulary {
    pub id: i64,
    pub name: String,
    /// URL-safe unique identifier, usable as an alternative lookup key.
    pub slug: String,
    pub description: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl std::fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Payload for creating a vocabulary.
///
/// When `slug` is absent one is derived from `name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NewVocabulary {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// TERM TYPES
// =============================================================================

/// A single taxonomy entry, optionally parented and optionally scoped to a
/// vocabulary.
///
/// `name` is the effective display label: when a query was issued with a
/// locale, it carries the localized label for that locale, falling back to
/// the default label where no translation exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Term {
    pub id: i64,
    pub name: String,
    /// URL-safe unique identifier, usable as an alternative lookup key.
    pub slug: String,
    pub vocabulary_id: Option<i64>,
    /// Self-reference forming a forest. Each term has at most one parent.
    pub parent_id: Option<i64>,
    /// Cloud weight. Derived, never persisted: zero on fetch, assigned in
    /// place by cloud calculation.
    #[serde(default)]
    pub weight: i64,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "#{}", self.id)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// A transient, not-yet-persisted term.
///
/// Produced by the lookup-or-create path with its references already
/// resolved; the caller persists it through `TermRepository::insert`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NewTerm {
    pub name: String,
    /// Derived from `name` on insert when absent.
    pub slug: Option<String>,
    pub vocabulary_id: Option<i64>,
    pub parent_id: Option<i64>,
}

impl NewTerm {
    /// A bare transient term with only the name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Result of a name lookup: either a persisted term or a prepared term the
/// caller may choose to insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermLookup {
    /// A matching term already exists.
    Found(Term),
    /// No match; the prepared term carries the resolved references.
    Missing(NewTerm),
}

impl TermLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn found(&self) -> Option<&Term> {
        match self {
            Self::Found(term) => Some(term),
            Self::Missing(_) => None,
        }
    }

    pub fn into_found(self) -> Option<Term> {
        match self {
            Self::Found(term) => Some(term),
            Self::Missing(_) => None,
        }
    }

    pub fn into_missing(self) -> Option<NewTerm> {
        match self {
            Self::Found(_) => None,
            Self::Missing(new) => Some(new),
        }
    }
}

/// Partial update of a term.
///
/// Outer `None` leaves a field unchanged; for the reference fields the
/// inner `None` clears the reference.
#[derive(Debug, Clone, Default)]
pub struct UpdateTermRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub vocabulary_id: Option<Option<i64>>,
    pub parent_id: Option<Option<i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(id: i64, name: &str) -> Term {
        Term {
            id,
            name: name.to_string(),
            slug: name.to_lowercase(),
            vocabulary_id: None,
            parent_id: None,
            weight: 0,
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        }
    }

    #[test]
    fn test_term_display_uses_name() {
        assert_eq!(term(3, "Red").to_string(), "Red");
    }

    #[test]
    fn test_term_display_falls_back_to_id() {
        assert_eq!(term(3, "").to_string(), "#3");
    }

    #[test]
    fn test_term_lookup_accessors() {
        let found = TermLookup::Found(term(1, "Red"));
        assert!(found.is_found());
        assert_eq!(found.found().unwrap().id, 1);

        let missing = TermLookup::Missing(NewTerm::named("Blue"));
        assert!(!missing.is_found());
        assert!(missing.found().is_none());
        assert_eq!(missing.into_missing().unwrap().name, "Blue");
    }

    #[test]
    fn test_new_term_named() {
        let new = NewTerm::named("Dark Red");
        assert_eq!(new.name, "Dark Red");
        assert!(new.slug.is_none());
        assert!(new.vocabulary_id.is_none());
        assert!(new.parent_id.is_none());
    }

    #[test]
    fn test_term_weight_serde_default() {
        let json = r#"{
            "id": 1,
            "name": "Red",
            "slug": "red",
            "vocabulary_id": null,
            "parent_id": null,
            "created_at_utc": "2026-01-01T00:00:00Z",
            "updated_at_utc": "2026-01-01T00:00:00Z"
        }"#;
        let parsed: Term = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.weight, 0);
    }
}
