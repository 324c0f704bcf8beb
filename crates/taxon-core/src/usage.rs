//! Term usage sources for cloud weighting.
//!
//! Other tables reference taxonomy terms ad hoc, without a first-class
//! relation in this subsystem. Cloud weighting aggregates usage counts
//! across those tables. The set of such tables is declared explicitly at
//! startup through [`TermUsageRegistry`] rather than discovered by
//! reflection, and every identifier is validated at registration so the
//! count queries can interpolate them safely.

use crate::error::{Error, Result};

/// Default cloud weight multiplier for a usage source.
pub const DEFAULT_CLOUD_WEIGHT: i64 = 1;

/// One table that references taxonomy terms.
///
/// `columns` lists every column holding a term id: a table with a single
/// dedicated term column registers that one column; a table referencing
/// terms through several columns registers them all, and each column is
/// counted separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermUsageSource {
    pub table: String,
    pub columns: Vec<String>,
    /// Cloud weight multiplier applied to this source's counts.
    pub weight: i64,
}

impl TermUsageSource {
    /// A source counting a single term-reference column.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec![column.into()],
            weight: DEFAULT_CLOUD_WEIGHT,
        }
    }

    /// A source counting several term-reference columns.
    pub fn with_columns(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            weight: DEFAULT_CLOUD_WEIGHT,
        }
    }

    /// Set the cloud weight multiplier.
    pub fn weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }
}

/// Startup registry of term usage sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermUsageRegistry {
    sources: Vec<TermUsageSource>,
}

impl TermUsageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a usage source.
    ///
    /// Validates the table and column identifiers and rejects a table
    /// registered twice.
    pub fn register(&mut self, source: TermUsageSource) -> Result<()> {
        validate_identifier(&source.table)?;

        if source.columns.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Usage source '{}' declares no term columns",
                source.table
            )));
        }
        for column in &source.columns {
            validate_identifier(column)?;
        }

        if self.sources.iter().any(|s| s.table == source.table) {
            return Err(Error::InvalidInput(format!(
                "Usage source '{}' is already registered",
                source.table
            )));
        }

        self.sources.push(source);
        Ok(())
    }

    /// Registered sources, in registration order.
    pub fn sources(&self) -> &[TermUsageSource] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}

/// Validate a PostgreSQL table or column identifier.
///
/// Identifiers must:
/// - Not be empty
/// - Not exceed 63 characters (PostgreSQL identifier limit)
/// - Start with a letter or underscore
/// - Contain only alphanumeric characters and underscores
/// - Not be a dangerous SQL keyword
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.len() > 63 {
        return Err(Error::InvalidInput(format!(
            "Identifier exceeds 63 character limit: {} characters",
            name.len()
        )));
    }

    if let Some(first) = name.chars().next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::InvalidInput(format!(
                "Identifier must start with a letter or underscore, found: '{}'",
                first
            )));
        }
    }

    for ch in name.chars() {
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(Error::InvalidInput(format!(
                "Identifier contains invalid character: '{}'. Only alphanumeric and underscore allowed",
                ch
            )));
        }
    }

    const RESERVED_KEYWORDS: &[&str] = &[
        "select", "insert", "update", "delete", "drop", "create", "alter", "grant", "revoke",
        "truncate",
    ];
    if RESERVED_KEYWORDS.contains(&name.to_lowercase().as_str()) {
        return Err(Error::InvalidInput(format!(
            "Identifier '{}' is a reserved SQL keyword",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_valid() {
        assert!(validate_identifier("article").is_ok());
        assert!(validate_identifier("taxonomy_term_id").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("col123").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        let long = "a".repeat(64);
        assert!(validate_identifier(&long).is_err());
        let max = "a".repeat(63);
        assert!(validate_identifier(&max).is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_bad_characters() {
        for name in [
            "article-tags",
            "article tags",
            "article;drop",
            "article'x",
            "\"article\"",
            "article.term",
            "1article",
        ] {
            assert!(validate_identifier(name).is_err(), "accepted: {}", name);
        }
    }

    #[test]
    fn test_validate_identifier_rejects_injection() {
        assert!(validate_identifier("article; DROP TABLE term; --").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_keywords() {
        assert!(validate_identifier("select").is_err());
        assert!(validate_identifier("DROP").is_err());
    }

    #[test]
    fn test_source_defaults() {
        let source = TermUsageSource::new("article", "term_id");
        assert_eq!(source.weight, DEFAULT_CLOUD_WEIGHT);
        assert_eq!(source.columns, vec!["term_id".to_string()]);

        let weighted = TermUsageSource::new("article", "term_id").weight(3);
        assert_eq!(weighted.weight, 3);
    }

    #[test]
    fn test_registry_register() {
        let mut registry = TermUsageRegistry::new();
        assert!(registry.is_empty());

        registry
            .register(TermUsageSource::new("article", "term_id"))
            .unwrap();
        registry
            .register(TermUsageSource::with_columns(
                "event",
                vec!["topic_id".to_string(), "category_id".to_string()],
            ))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.sources()[1].columns.len(), 2);
    }

    #[test]
    fn test_registry_rejects_duplicate_table() {
        let mut registry = TermUsageRegistry::new();
        registry
            .register(TermUsageSource::new("article", "term_id"))
            .unwrap();
        let result = registry.register(TermUsageSource::new("article", "other_id"));
        assert!(result.is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_rejects_invalid_identifiers() {
        let mut registry = TermUsageRegistry::new();
        assert!(registry
            .register(TermUsageSource::new("bad table", "term_id"))
            .is_err());
        assert!(registry
            .register(TermUsageSource::new("article", "bad column"))
            .is_err());
        assert!(registry
            .register(TermUsageSource::with_columns("article", vec![]))
            .is_err());
        assert!(registry.is_empty());
    }
}
