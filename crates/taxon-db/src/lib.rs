//! # taxon-db
//!
//! PostgreSQL database layer for taxon.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for terms and vocabularies
//! - Lookup-or-create term resolution by name, vocabulary, and parent
//! - Hierarchical taxonomy tree construction
//! - Cloud weighting across registered usage sources
//!
//! ## Example
//!
//! ```rust,ignore
//! use taxon_db::{Database, NewVocabulary, TermRepository, VocabularyRepository, VocabularyScope};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/taxon").await?;
//!
//!     let colors = db.vocabularies.create(NewVocabulary {
//!         name: "Colors".to_string(),
//!         ..Default::default()
//!     }).await?;
//!
//!     let tree = db.terms.get_taxonomy_tree(
//!         VocabularyScope::of(&colors), None, None, None, None,
//!     ).await?;
//!
//!     println!("{} terms", tree.len());
//!     Ok(())
//! }
//! ```

pub mod pool;
pub mod terms;
pub mod vocabularies;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use taxon_core::*;

// Re-export repository implementations
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use terms::PgTermRepository;
pub use vocabularies::PgVocabularyRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Term repository: lookup-or-create, trees, cloud weighting, CRUD.
    pub terms: PgTermRepository,
    /// Vocabulary repository for namespace management.
    pub vocabularies: PgVocabularyRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            terms: PgTermRepository::new(pool.clone()),
            vocabularies: PgVocabularyRepository::new(pool.clone()),
            pool,
        }
    }

    /// Configure the usage sources consulted by cloud weighting.
    pub fn with_usage_sources(mut self, usage: TermUsageRegistry) -> Self {
        self.terms = PgTermRepository::new(self.pool.clone()).with_usage_sources(usage);
        self
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
