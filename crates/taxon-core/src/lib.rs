//! # taxon-core
//!
//! Core types, traits, and abstractions for the taxon taxonomy library.
//!
//! This crate provides the domain entities (terms, vocabularies), the
//! repository trait definitions, the reference/scope types used to address
//! them, and the usage-source registry behind cloud weighting.

pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod slug;
pub mod traits;
pub mod usage;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use filter::{ParentScope, TermOrder, TermRef, VocabularyRef, VocabularyScope};
pub use models::{NewTerm, NewVocabulary, Term, TermLookup, UpdateTermRequest, Vocabulary};
pub use slug::slugify;
pub use traits::{TermRepository, VocabularyRepository};
pub use usage::{
    validate_identifier, TermUsageRegistry, TermUsageSource, DEFAULT_CLOUD_WEIGHT,
};
