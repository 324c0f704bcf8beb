//! Vocabulary repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use taxon_core::{
    slugify, Error, NewVocabulary, Result, Vocabulary, VocabularyRef, VocabularyRepository,
};

const VOCABULARY_COLUMNS: &str =
    "id, name, slug, description, created_at_utc, updated_at_utc";

/// How many suffixed slug candidates are tried before giving up.
const MAX_SLUG_ATTEMPTS: u32 = 50;

/// PostgreSQL implementation of VocabularyRepository.
#[derive(Clone)]
pub struct PgVocabularyRepository {
    pool: Pool<Postgres>,
}

impl PgVocabularyRepository {
    /// Create a new PgVocabularyRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn map_vocabulary(row: &sqlx::postgres::PgRow) -> Vocabulary {
        Vocabulary {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
            description: row.get("description"),
            created_at_utc: row.get("created_at_utc"),
            updated_at_utc: row.get("updated_at_utc"),
        }
    }
}

#[async_trait]
impl VocabularyRepository for PgVocabularyRepository {
    async fn create(&self, vocabulary: NewVocabulary) -> Result<Vocabulary> {
        if vocabulary.name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Vocabulary name cannot be empty".to_string(),
            ));
        }

        let base = match vocabulary.slug {
            Some(ref slug) if !slug.is_empty() => slug.clone(),
            _ => slugify(&vocabulary.name),
        };
        if base.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Vocabulary name '{}' produces an empty slug",
                vocabulary.name
            )));
        }

        let sql = format!(
            "INSERT INTO vocabulary (name, slug, description) VALUES ($1, $2, $3) \
             ON CONFLICT (slug) DO NOTHING \
             RETURNING {}",
            VOCABULARY_COLUMNS
        );

        let mut slug = base.clone();
        let mut attempt = 1;
        loop {
            let row = sqlx::query(&sql)
                .bind(&vocabulary.name)
                .bind(&slug)
                .bind(&vocabulary.description)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;

            if let Some(row) = row {
                return Ok(Self::map_vocabulary(&row));
            }

            attempt += 1;
            if attempt > MAX_SLUG_ATTEMPTS {
                return Err(Error::Internal(format!(
                    "Could not allocate a unique slug for vocabulary '{}'",
                    base
                )));
            }
            slug = format!("{}-{}", base, attempt);
        }
    }

    async fn get(&self, id: i64) -> Result<Option<Vocabulary>> {
        let sql = format!(
            "SELECT {} FROM vocabulary WHERE id = $1",
            VOCABULARY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(|r| Self::map_vocabulary(&r)))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Vocabulary>> {
        let sql = format!(
            "SELECT {} FROM vocabulary WHERE slug = $1",
            VOCABULARY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(|r| Self::map_vocabulary(&r)))
    }

    async fn resolve(&self, vocabulary: &VocabularyRef) -> Result<Option<Vocabulary>> {
        match vocabulary {
            VocabularyRef::Id(id) => self.get(*id).await,
            VocabularyRef::Slug(slug) => self.get_by_slug(slug).await,
        }
    }

    async fn list(&self) -> Result<Vec<Vocabulary>> {
        let sql = format!(
            "SELECT {} FROM vocabulary ORDER BY name",
            VOCABULARY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::map_vocabulary).collect())
    }

    async fn update(&self, id: i64, name: &str, description: Option<&str>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Vocabulary name cannot be empty".to_string(),
            ));
        }

        let result = sqlx::query(
            "UPDATE vocabulary SET name = $1, description = $2, updated_at_utc = now() \
             WHERE id = $3",
        )
        .bind(name)
        .bind(description)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::VocabularyNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Detach owned terms before removing the vocabulary
        sqlx::query("UPDATE term SET vocabulary_id = NULL WHERE vocabulary_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let result = sqlx::query("DELETE FROM vocabulary WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::VocabularyNotFound(id));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
