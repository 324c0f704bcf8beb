//! Reference and scope types for taxonomy queries.
//!
//! Vocabularies and terms can be addressed by numeric id or by slug, and
//! list queries distinguish "no filter" from "explicitly unscoped". These
//! tagged types resolve that choice at the API boundary instead of
//! inspecting values at runtime.

use serde::{Deserialize, Serialize};

use crate::models::{Term, Vocabulary};

/// A vocabulary addressed by id or by slug.
///
/// A `&Vocabulary` converts into its id form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyRef {
    Id(i64),
    Slug(String),
}

impl From<i64> for VocabularyRef {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for VocabularyRef {
    fn from(slug: &str) -> Self {
        Self::Slug(slug.to_string())
    }
}

impl From<String> for VocabularyRef {
    fn from(slug: String) -> Self {
        Self::Slug(slug)
    }
}

impl From<&Vocabulary> for VocabularyRef {
    fn from(vocabulary: &Vocabulary) -> Self {
        Self::Id(vocabulary.id)
    }
}

/// A term addressed by id or by slug.
///
/// A `&Term` converts into its id form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermRef {
    Id(i64),
    Slug(String),
}

impl From<i64> for TermRef {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for TermRef {
    fn from(slug: &str) -> Self {
        Self::Slug(slug.to_string())
    }
}

impl From<String> for TermRef {
    fn from(slug: String) -> Self {
        Self::Slug(slug)
    }
}

impl From<&Term> for TermRef {
    fn from(term: &Term) -> Self {
        Self::Id(term.id)
    }
}

/// Vocabulary filter for list queries.
///
/// `Any` applies no vocabulary condition, `Unscoped` matches terms without
/// a vocabulary, `In` matches one vocabulary precisely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyScope {
    #[default]
    Any,
    Unscoped,
    In(VocabularyRef),
}

impl VocabularyScope {
    /// Scope to one vocabulary by id, slug, or reference.
    pub fn of(vocabulary: impl Into<VocabularyRef>) -> Self {
        Self::In(vocabulary.into())
    }
}

/// Parent filter for list queries, with the same three-way semantics as
/// [`VocabularyScope`]: no condition, root terms only, or one parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentScope {
    #[default]
    Any,
    Root,
    Under(TermRef),
}

impl ParentScope {
    /// Scope to the children of one term by id, slug, or reference.
    pub fn under(parent: impl Into<TermRef>) -> Self {
        Self::Under(parent.into())
    }
}

/// Whitelisted order fields for term listings.
///
/// Ordering is ascending, with the parent's same-named field as the
/// primary sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermOrder {
    Name,
    CreatedAt,
}
