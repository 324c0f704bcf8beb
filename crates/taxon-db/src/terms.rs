//! Term repository implementation.
//!
//! The taxonomy-specific query logic lives here: lookup-or-create by name,
//! scoped listings, tree construction, and cloud weighting. Everything is
//! plain SQL over the shared pool; localized names resolve through the
//! `term_label` table with fallback to the default name.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, warn};

use taxon_core::{
    slugify, Error, NewTerm, ParentScope, Result, Term, TermLookup, TermOrder, TermRef,
    TermRepository, TermUsageRegistry, UpdateTermRequest, VocabularyRef, VocabularyScope,
};

/// Standard SELECT columns for a term, with the effective name resolved
/// against the label table joined as `l`.
const TERM_COLUMNS: &str = "t.id, COALESCE(l.name, t.name) AS name, t.slug, \
     t.vocabulary_id, t.parent_id, t.created_at_utc, t.updated_at_utc";

/// How many suffixed slug candidates are tried before giving up.
const MAX_SLUG_ATTEMPTS: u32 = 50;

/// PostgreSQL implementation of TermRepository.
#[derive(Clone)]
pub struct PgTermRepository {
    pool: Pool<Postgres>,
    usage: TermUsageRegistry,
}

impl PgTermRepository {
    /// Create a new PgTermRepository with the given connection pool and an
    /// empty usage-source registry.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            usage: TermUsageRegistry::new(),
        }
    }

    /// Replace the usage-source registry consulted by cloud weighting.
    pub fn with_usage_sources(mut self, usage: TermUsageRegistry) -> Self {
        self.usage = usage;
        self
    }

    /// The usage-source registry consulted by cloud weighting.
    pub fn usage_sources(&self) -> &TermUsageRegistry {
        &self.usage
    }

    fn map_term(row: &sqlx::postgres::PgRow) -> Term {
        Term {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
            vocabulary_id: row.get("vocabulary_id"),
            parent_id: row.get("parent_id"),
            weight: 0,
            created_at_utc: row.get("created_at_utc"),
            updated_at_utc: row.get("updated_at_utc"),
        }
    }

    /// Resolve a vocabulary reference to an id for assignment.
    ///
    /// An id is trusted as-is; a slug is looked up and a dangling slug
    /// resolves to `None` rather than failing.
    async fn resolve_vocabulary_id(&self, vocabulary: &VocabularyRef) -> Result<Option<i64>> {
        match vocabulary {
            VocabularyRef::Id(id) => Ok(Some(*id)),
            VocabularyRef::Slug(slug) => {
                let row = sqlx::query("SELECT id FROM vocabulary WHERE slug = $1")
                    .bind(slug.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(Error::Database)?;
                Ok(row.map(|r| r.get("id")))
            }
        }
    }

    /// Resolve a parent term reference to an id for assignment, with the
    /// same silent-miss slug semantics as vocabulary resolution.
    async fn resolve_parent_id(&self, parent: &TermRef) -> Result<Option<i64>> {
        match parent {
            TermRef::Id(id) => Ok(Some(*id)),
            TermRef::Slug(slug) => {
                let row = sqlx::query("SELECT id FROM term WHERE slug = $1")
                    .bind(slug.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(Error::Database)?;
                Ok(row.map(|r| r.get("id")))
            }
        }
    }
}

#[async_trait]
impl TermRepository for PgTermRepository {
    async fn get_by_name(
        &self,
        name: &str,
        vocabulary: Option<VocabularyRef>,
        parent: Option<TermRef>,
        locale: Option<&str>,
    ) -> Result<TermLookup> {
        let mut sql = format!(
            "SELECT {} FROM term t \
             LEFT JOIN term_label l ON l.term_id = t.id AND l.locale = $1 \
             WHERE COALESCE(l.name, t.name) = $2",
            TERM_COLUMNS
        );
        let mut param_idx = 3;

        match &vocabulary {
            Some(VocabularyRef::Id(_)) => {
                sql.push_str(&format!(" AND t.vocabulary_id = ${}", param_idx));
                param_idx += 1;
            }
            Some(VocabularyRef::Slug(_)) => {
                sql.push_str(&format!(
                    " AND t.vocabulary_id = (SELECT id FROM vocabulary WHERE slug = ${})",
                    param_idx
                ));
                param_idx += 1;
            }
            None => {}
        }
        match &parent {
            Some(TermRef::Id(_)) => {
                sql.push_str(&format!(" AND t.parent_id = ${}", param_idx));
                param_idx += 1;
            }
            Some(TermRef::Slug(_)) => {
                sql.push_str(&format!(
                    " AND t.parent_id = (SELECT id FROM term WHERE slug = ${})",
                    param_idx
                ));
                param_idx += 1;
            }
            None => {}
        }
        let _ = param_idx;
        sql.push_str(" ORDER BY t.id LIMIT 1");

        let mut query = sqlx::query(&sql).bind(locale).bind(name);
        match &vocabulary {
            Some(VocabularyRef::Id(id)) => query = query.bind(*id),
            Some(VocabularyRef::Slug(slug)) => query = query.bind(slug.as_str()),
            None => {}
        }
        match &parent {
            Some(TermRef::Id(id)) => query = query.bind(*id),
            Some(TermRef::Slug(slug)) => query = query.bind(slug.as_str()),
            None => {}
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        if let Some(row) = row {
            return Ok(TermLookup::Found(Self::map_term(&row)));
        }

        let mut new = NewTerm::named(name);
        if let Some(vocabulary) = &vocabulary {
            new.vocabulary_id = self.resolve_vocabulary_id(vocabulary).await?;
        }
        if let Some(parent) = &parent {
            new.parent_id = self.resolve_parent_id(parent).await?;
        }

        Ok(TermLookup::Missing(new))
    }

    async fn find_by_parent(
        &self,
        vocabulary: VocabularyScope,
        parent: ParentScope,
        locale: Option<&str>,
        order: Option<TermOrder>,
    ) -> Result<Vec<Term>> {
        let mut sql = format!(
            "SELECT {} FROM term t \
             LEFT JOIN term_label l ON l.term_id = t.id AND l.locale = $1 \
             LEFT JOIN term p ON p.id = t.parent_id \
             LEFT JOIN term_label pl ON pl.term_id = p.id AND pl.locale = $1",
            TERM_COLUMNS
        );

        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx = 2;

        match &vocabulary {
            VocabularyScope::Any => {}
            VocabularyScope::Unscoped => conditions.push("t.vocabulary_id IS NULL".to_string()),
            VocabularyScope::In(VocabularyRef::Id(_)) => {
                conditions.push(format!("t.vocabulary_id = ${}", param_idx));
                param_idx += 1;
            }
            VocabularyScope::In(VocabularyRef::Slug(_)) => {
                conditions.push(format!(
                    "t.vocabulary_id = (SELECT id FROM vocabulary WHERE slug = ${})",
                    param_idx
                ));
                param_idx += 1;
            }
        }
        match &parent {
            ParentScope::Any => {}
            ParentScope::Root => conditions.push("t.parent_id IS NULL".to_string()),
            ParentScope::Under(TermRef::Id(_)) => {
                conditions.push(format!("t.parent_id = ${}", param_idx));
                param_idx += 1;
            }
            ParentScope::Under(TermRef::Slug(_)) => {
                conditions.push(format!(
                    "t.parent_id = (SELECT id FROM term WHERE slug = ${})",
                    param_idx
                ));
                param_idx += 1;
            }
        }
        let _ = param_idx;

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        // Ascending order, parent's field first
        match order {
            Some(TermOrder::Name) => sql.push_str(
                " ORDER BY COALESCE(pl.name, p.name) ASC NULLS FIRST, COALESCE(l.name, t.name) ASC",
            ),
            Some(TermOrder::CreatedAt) => {
                sql.push_str(" ORDER BY p.created_at_utc ASC NULLS FIRST, t.created_at_utc ASC")
            }
            None => {}
        }

        let mut query = sqlx::query(&sql).bind(locale);
        match &vocabulary {
            VocabularyScope::In(VocabularyRef::Id(id)) => query = query.bind(*id),
            VocabularyScope::In(VocabularyRef::Slug(slug)) => query = query.bind(slug.as_str()),
            _ => {}
        }
        match &parent {
            ParentScope::Under(TermRef::Id(id)) => query = query.bind(*id),
            ParentScope::Under(TermRef::Slug(slug)) => query = query.bind(slug.as_str()),
            _ => {}
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::map_term).collect())
    }

    async fn get_taxonomy_tree(
        &self,
        vocabulary: VocabularyScope,
        parent: Option<TermRef>,
        locale: Option<&str>,
        order: Option<TermOrder>,
        prefix: Option<&str>,
    ) -> Result<BTreeMap<i64, String>> {
        // The original per-level query always orders by name; an explicit
        // order overrides it.
        let order = order.or(Some(TermOrder::Name));

        let mut tree: BTreeMap<i64, String> = BTreeMap::new();
        let mut visited: HashSet<i64> = HashSet::new();

        let start = match parent {
            None => ParentScope::Root,
            Some(parent) => ParentScope::Under(parent),
        };
        let mut stack: Vec<(ParentScope, String)> =
            vec![(start, prefix.unwrap_or("").to_string())];

        while let Some((scope, prefix)) = stack.pop() {
            let children = self
                .find_by_parent(vocabulary.clone(), scope, locale, order)
                .await?;

            for child in children {
                // Revisits only happen on malformed cyclic data; skip the
                // node instead of walking it again.
                if !visited.insert(child.id) {
                    warn!(
                        subsystem = "taxonomy",
                        component = "terms",
                        op = "get_taxonomy_tree",
                        term_id = child.id,
                        "Term hierarchy contains a cycle, skipping revisited term"
                    );
                    continue;
                }

                let path = format!("{}/{}", prefix, child.name);
                tree.entry(child.id).or_insert_with(|| path.clone());
                stack.push((ParentScope::Under(TermRef::Id(child.id)), path));
            }
        }

        Ok(tree)
    }

    async fn calculate_cloud(&self, terms: &mut [Term]) -> Result<()> {
        // Validate the whole slice before assigning any weight
        for term in terms.iter() {
            if term.id <= 0 {
                return Err(Error::InvalidInput(format!(
                    "invalid term provided: '{}' is not a persisted term",
                    term
                )));
            }
        }

        for term in terms.iter_mut() {
            term.weight = self.calculate_cloud_weight(term).await?;
        }

        Ok(())
    }

    async fn calculate_cloud_weight(&self, term: &Term) -> Result<i64> {
        let mut weight = 0i64;

        for source in self.usage.sources() {
            for column in &source.columns {
                // Identifiers were validated at registration
                let sql = format!(
                    "SELECT COUNT(*) FROM \"{}\" WHERE \"{}\" = $1",
                    source.table, column
                );
                let count: i64 = sqlx::query_scalar(&sql)
                    .bind(term.id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(Error::Database)?;

                weight += count * source.weight;
            }
        }

        debug!(
            subsystem = "taxonomy",
            component = "terms",
            op = "calculate_cloud_weight",
            term_id = term.id,
            source_count = self.usage.len(),
            weight,
            "Calculated cloud weight"
        );

        Ok(weight)
    }

    async fn insert(&self, term: NewTerm) -> Result<Term> {
        if term.name.trim().is_empty() {
            return Err(Error::InvalidInput("Term name cannot be empty".to_string()));
        }

        let base = match term.slug {
            Some(ref slug) if !slug.is_empty() => slug.clone(),
            _ => slugify(&term.name),
        };
        if base.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Term name '{}' produces an empty slug",
                term.name
            )));
        }

        let mut slug = base.clone();
        let mut attempt = 1;
        loop {
            let row = sqlx::query(
                "INSERT INTO term (name, slug, vocabulary_id, parent_id) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (slug) DO NOTHING \
                 RETURNING id, name, slug, vocabulary_id, parent_id, \
                           created_at_utc, updated_at_utc",
            )
            .bind(&term.name)
            .bind(&slug)
            .bind(term.vocabulary_id)
            .bind(term.parent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

            if let Some(row) = row {
                return Ok(Self::map_term(&row));
            }

            attempt += 1;
            if attempt > MAX_SLUG_ATTEMPTS {
                return Err(Error::Internal(format!(
                    "Could not allocate a unique slug for term '{}'",
                    base
                )));
            }
            slug = format!("{}-{}", base, attempt);
        }
    }

    async fn get(&self, id: i64) -> Result<Option<Term>> {
        self.get_localized(id, None).await
    }

    async fn get_localized(&self, id: i64, locale: Option<&str>) -> Result<Option<Term>> {
        let sql = format!(
            "SELECT {} FROM term t \
             LEFT JOIN term_label l ON l.term_id = t.id AND l.locale = $1 \
             WHERE t.id = $2",
            TERM_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(locale)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(|r| Self::map_term(&r)))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Term>> {
        let row = sqlx::query(
            "SELECT t.id, t.name, t.slug, t.vocabulary_id, t.parent_id, \
                    t.created_at_utc, t.updated_at_utc \
             FROM term t WHERE t.slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| Self::map_term(&r)))
    }

    async fn update(&self, id: i64, req: UpdateTermRequest) -> Result<()> {
        if let Some(ref name) = req.name {
            if name.trim().is_empty() {
                return Err(Error::InvalidInput("Term name cannot be empty".to_string()));
            }
        }
        if let Some(ref slug) = req.slug {
            if slug.is_empty() {
                return Err(Error::InvalidInput("Term slug cannot be empty".to_string()));
            }
        }

        let mut updates = vec!["updated_at_utc = now()".to_string()];
        let mut param_idx = 2;
        if req.name.is_some() {
            updates.push(format!("name = ${}", param_idx));
            param_idx += 1;
        }
        if req.slug.is_some() {
            updates.push(format!("slug = ${}", param_idx));
            param_idx += 1;
        }
        if req.vocabulary_id.is_some() {
            updates.push(format!("vocabulary_id = ${}", param_idx));
            param_idx += 1;
        }
        if req.parent_id.is_some() {
            updates.push(format!("parent_id = ${}", param_idx));
            param_idx += 1;
        }
        let _ = param_idx;

        let sql = format!("UPDATE term SET {} WHERE id = $1", updates.join(", "));

        let mut query = sqlx::query(&sql).bind(id);
        if let Some(ref name) = req.name {
            query = query.bind(name.as_str());
        }
        if let Some(ref slug) = req.slug {
            query = query.bind(slug.as_str());
        }
        if let Some(vocabulary_id) = req.vocabulary_id {
            query = query.bind(vocabulary_id);
        }
        if let Some(parent_id) = req.parent_id {
            query = query.bind(parent_id);
        }

        let result = query.execute(&self.pool).await.map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::TermNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let parent_id: Option<i64> = match sqlx::query("SELECT parent_id FROM term WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
        {
            Some(row) => row.get("parent_id"),
            None => return Err(Error::TermNotFound(id)),
        };

        // Promote children to the deleted term's own parent
        sqlx::query("UPDATE term SET parent_id = $1 WHERE parent_id = $2")
            .bind(parent_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM term_label WHERE term_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM term WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn set_label(&self, term_id: i64, locale: &str, name: &str) -> Result<()> {
        if locale.trim().is_empty() {
            return Err(Error::InvalidInput("Locale cannot be empty".to_string()));
        }
        if name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Label name cannot be empty".to_string(),
            ));
        }

        sqlx::query(
            "INSERT INTO term_label (term_id, locale, name) VALUES ($1, $2, $3) \
             ON CONFLICT (term_id, locale) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(term_id)
        .bind(locale)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn remove_label(&self, term_id: i64, locale: &str) -> Result<()> {
        sqlx::query("DELETE FROM term_label WHERE term_id = $1 AND locale = $2")
            .bind(term_id)
            .bind(locale)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(())
    }
}
