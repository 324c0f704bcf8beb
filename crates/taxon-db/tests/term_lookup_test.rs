//! Integration tests for lookup-or-create term resolution.
//!
//! Requires a migrated taxonomy database; configure it with DATABASE_URL
//! or run the default test database from `test_fixtures`.

use sqlx::PgPool;
use taxon_db::{
    create_pool, test_fixtures::DEFAULT_TEST_DATABASE_URL, NewTerm, NewVocabulary,
    PgTermRepository, PgVocabularyRepository, TermLookup, TermRef, TermRepository, Vocabulary,
    VocabularyRef, VocabularyRepository,
};
use uuid::Uuid;

async fn setup_test_pool() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_TEST_DATABASE_URL.to_string());
    create_pool(&database_url)
        .await
        .expect("Failed to create test pool")
}

/// Unique display name so lookups do not collide across test runs on a
/// shared database.
fn unique_name(base: &str) -> String {
    format!("{} {}", base, Uuid::new_v4())
}

async fn create_test_vocabulary(
    vocabularies: &PgVocabularyRepository,
    name: &str,
) -> Vocabulary {
    vocabularies
        .create(NewVocabulary {
            name: unique_name(name),
            slug: None,
            description: Some(format!("Test vocabulary for {}", name)),
        })
        .await
        .expect("Failed to create test vocabulary")
}

#[tokio::test]
async fn test_get_by_name_returns_existing_term() {
    let pool = setup_test_pool().await;
    let terms = PgTermRepository::new(pool.clone());
    let vocabularies = PgVocabularyRepository::new(pool.clone());

    let vocabulary = create_test_vocabulary(&vocabularies, "lookup").await;
    let name = unique_name("Red");

    let red = terms
        .insert(NewTerm {
            name: name.clone(),
            slug: None,
            vocabulary_id: Some(vocabulary.id),
            parent_id: None,
        })
        .await
        .unwrap();

    let first = terms
        .get_by_name(&name, Some(VocabularyRef::from(&vocabulary)), None, None)
        .await
        .unwrap();
    let second = terms
        .get_by_name(&name, Some(VocabularyRef::from(&vocabulary)), None, None)
        .await
        .unwrap();

    assert_eq!(first.found().unwrap().id, red.id);
    assert_eq!(second.found().unwrap().id, red.id);
}

#[tokio::test]
async fn test_get_by_name_prepares_missing_term() {
    let pool = setup_test_pool().await;
    let terms = PgTermRepository::new(pool.clone());
    let vocabularies = PgVocabularyRepository::new(pool.clone());

    let vocabulary = create_test_vocabulary(&vocabularies, "missing").await;
    let name = unique_name("Blue");

    let lookup = terms
        .get_by_name(
            &name,
            Some(VocabularyRef::Slug(vocabulary.slug.clone())),
            None,
            None,
        )
        .await
        .unwrap();

    let prepared = match lookup {
        TermLookup::Missing(new) => new,
        TermLookup::Found(term) => panic!("Unexpected existing term: {}", term.id),
    };
    assert_eq!(prepared.name, name);
    assert_eq!(prepared.vocabulary_id, Some(vocabulary.id));
    assert_eq!(prepared.parent_id, None);

    // Persisting the prepared term makes the next lookup find it
    let inserted = terms.insert(prepared).await.unwrap();
    let found = terms
        .get_by_name(&name, Some(VocabularyRef::from(&vocabulary)), None, None)
        .await
        .unwrap();
    assert_eq!(found.found().unwrap().id, inserted.id);
}

#[tokio::test]
async fn test_get_by_name_dangling_slugs_resolve_silently() {
    let pool = setup_test_pool().await;
    let terms = PgTermRepository::new(pool.clone());

    let name = unique_name("Orphan");
    let missing_vocabulary = format!("no-such-vocabulary-{}", Uuid::new_v4());
    let missing_parent = format!("no-such-term-{}", Uuid::new_v4());

    let lookup = terms
        .get_by_name(
            &name,
            Some(VocabularyRef::Slug(missing_vocabulary)),
            Some(TermRef::Slug(missing_parent)),
            None,
        )
        .await
        .unwrap();

    let prepared = lookup.into_missing().expect("expected a prepared term");
    assert_eq!(prepared.vocabulary_id, None);
    assert_eq!(prepared.parent_id, None);
}

#[tokio::test]
async fn test_get_by_name_narrows_by_parent() {
    let pool = setup_test_pool().await;
    let terms = PgTermRepository::new(pool.clone());

    let parent_a = terms
        .insert(NewTerm::named(unique_name("Parent A")))
        .await
        .unwrap();
    let parent_b = terms
        .insert(NewTerm::named(unique_name("Parent B")))
        .await
        .unwrap();

    // The same display name under two different parents
    let child_name = unique_name("Child");
    terms
        .insert(NewTerm {
            name: child_name.clone(),
            slug: None,
            vocabulary_id: None,
            parent_id: Some(parent_a.id),
        })
        .await
        .unwrap();
    let child_b = terms
        .insert(NewTerm {
            name: child_name.clone(),
            slug: None,
            vocabulary_id: None,
            parent_id: Some(parent_b.id),
        })
        .await
        .unwrap();

    let lookup = terms
        .get_by_name(&child_name, None, Some(TermRef::from(&parent_b)), None)
        .await
        .unwrap();
    assert_eq!(lookup.found().unwrap().id, child_b.id);

    // Narrowing by the parent's slug behaves the same
    let lookup = terms
        .get_by_name(
            &child_name,
            None,
            Some(TermRef::Slug(parent_b.slug.clone())),
            None,
        )
        .await
        .unwrap();
    assert_eq!(lookup.found().unwrap().id, child_b.id);
}

#[tokio::test]
async fn test_get_by_name_matches_localized_label() {
    let pool = setup_test_pool().await;
    let terms = PgTermRepository::new(pool.clone());

    let name = unique_name("Red");
    let localized = unique_name("Rood");
    let red = terms.insert(NewTerm::named(name.clone())).await.unwrap();
    terms.set_label(red.id, "nl", &localized).await.unwrap();

    let lookup = terms
        .get_by_name(&localized, None, None, Some("nl"))
        .await
        .unwrap();
    let found = lookup.found().expect("expected the labeled term");
    assert_eq!(found.id, red.id);
    assert_eq!(found.name, localized);

    // Terms without a label for the locale fall back to the default name
    let other_name = unique_name("Green");
    let green = terms
        .insert(NewTerm::named(other_name.clone()))
        .await
        .unwrap();
    let lookup = terms
        .get_by_name(&other_name, None, None, Some("nl"))
        .await
        .unwrap();
    assert_eq!(lookup.found().unwrap().id, green.id);
}

#[tokio::test]
async fn test_insert_suffixes_colliding_slugs() {
    let pool = setup_test_pool().await;
    let terms = PgTermRepository::new(pool.clone());

    let slug = format!("collision-{}", Uuid::new_v4());
    let first = terms
        .insert(NewTerm {
            name: unique_name("First"),
            slug: Some(slug.clone()),
            vocabulary_id: None,
            parent_id: None,
        })
        .await
        .unwrap();
    let second = terms
        .insert(NewTerm {
            name: unique_name("Second"),
            slug: Some(slug.clone()),
            vocabulary_id: None,
            parent_id: None,
        })
        .await
        .unwrap();

    assert_eq!(first.slug, slug);
    assert_eq!(second.slug, format!("{}-2", slug));
}

#[tokio::test]
async fn test_insert_rejects_empty_name() {
    let pool = setup_test_pool().await;
    let terms = PgTermRepository::new(pool.clone());

    let result = terms.insert(NewTerm::named("   ")).await;
    assert!(result.is_err());
}
