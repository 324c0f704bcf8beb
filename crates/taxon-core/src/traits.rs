//! Core traits for taxon abstractions.
//!
//! These traits define the repository interfaces that concrete
//! implementations must satisfy, enabling pluggable backends and
//! testability.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::{ParentScope, TermOrder, TermRef, VocabularyRef, VocabularyScope};
use crate::models::{NewTerm, NewVocabulary, Term, TermLookup, UpdateTermRequest, Vocabulary};

/// Repository for vocabulary CRUD and resolution.
#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    /// Create a vocabulary, deriving a slug from the name when none is
    /// supplied.
    async fn create(&self, vocabulary: NewVocabulary) -> Result<Vocabulary>;

    /// Fetch a vocabulary by id.
    async fn get(&self, id: i64) -> Result<Option<Vocabulary>>;

    /// Fetch a vocabulary by slug.
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Vocabulary>>;

    /// Resolve a vocabulary reference by id or by slug.
    async fn resolve(&self, vocabulary: &VocabularyRef) -> Result<Option<Vocabulary>>;

    /// List all vocabularies, ordered by name.
    async fn list(&self) -> Result<Vec<Vocabulary>>;

    /// Update name and description.
    async fn update(&self, id: i64, name: &str, description: Option<&str>) -> Result<()>;

    /// Delete a vocabulary, detaching its terms.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// Repository for taxonomy terms: lookup-or-create, tree construction,
/// cloud weighting, and term CRUD.
#[async_trait]
pub trait TermRepository: Send + Sync {
    /// Get a term by name, optionally narrowed to a vocabulary and a
    /// parent term.
    ///
    /// Returns [`TermLookup::Found`] for the first existing match.
    /// Otherwise returns [`TermLookup::Missing`] carrying a prepared
    /// [`NewTerm`] with the references resolved; the caller persists it
    /// via [`insert`](Self::insert). A vocabulary or parent slug that
    /// matches nothing resolves silently to an absent reference on the
    /// prepared term — callers should treat an unexpectedly absent
    /// reference as a possible miss rather than assume the lookup
    /// succeeded.
    async fn get_by_name(
        &self,
        name: &str,
        vocabulary: Option<VocabularyRef>,
        parent: Option<TermRef>,
        locale: Option<&str>,
    ) -> Result<TermLookup>;

    /// List terms filtered by vocabulary and parent scope.
    ///
    /// Localized names fall back to the default name for the terms that
    /// lack a label in `locale`. When `order` is given, results are
    /// ascending on the parent's field first, then the term's own field;
    /// otherwise database order.
    async fn find_by_parent(
        &self,
        vocabulary: VocabularyScope,
        parent: ParentScope,
        locale: Option<&str>,
        order: Option<TermOrder>,
    ) -> Result<Vec<Term>>;

    /// Build the labeled forest reachable from `parent` (the roots when
    /// absent), mapping each term id to its slash-delimited ancestry path
    /// `prefix + "/" + name` joined down the tree.
    ///
    /// Siblings are visited name-ascending unless `order` overrides it.
    /// Cyclic data is skipped at the revisited node instead of looping.
    async fn get_taxonomy_tree(
        &self,
        vocabulary: VocabularyScope,
        parent: Option<TermRef>,
        locale: Option<&str>,
        order: Option<TermOrder>,
        prefix: Option<&str>,
    ) -> Result<BTreeMap<i64, String>>;

    /// Compute and assign the cloud weight of every term in place.
    ///
    /// The whole slice is validated before any weight is assigned; an
    /// element that is not a well-formed persisted term fails the call
    /// with no mutation.
    async fn calculate_cloud(&self, terms: &mut [Term]) -> Result<()>;

    /// Compute the cloud weight of one term: the sum over every
    /// registered usage source of its per-column usage counts times the
    /// source's weight multiplier. Recomputed fully on every call.
    async fn calculate_cloud_weight(&self, term: &Term) -> Result<i64>;

    /// Persist a transient term, deriving a slug from the name when none
    /// is supplied.
    async fn insert(&self, term: NewTerm) -> Result<Term>;

    /// Fetch a term by id with default names.
    async fn get(&self, id: i64) -> Result<Option<Term>>;

    /// Fetch a term by id with the effective name for `locale`.
    async fn get_localized(&self, id: i64, locale: Option<&str>) -> Result<Option<Term>>;

    /// Fetch a term by slug.
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Term>>;

    /// Apply a partial update.
    async fn update(&self, id: i64, req: UpdateTermRequest) -> Result<()>;

    /// Delete a term, promoting its children to the deleted term's own
    /// parent.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Set the localized name of a term for a locale.
    async fn set_label(&self, term_id: i64, locale: &str, name: &str) -> Result<()>;

    /// Remove the localized name of a term for a locale.
    async fn remove_label(&self, term_id: i64, locale: &str) -> Result<()>;
}
