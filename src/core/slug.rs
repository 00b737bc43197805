//! Unique slug assignment
//!
//! A sluggable entity gets its slug at save time, derived from its display
//! field. The slug is computed once, when it is empty, and recomputed whenever
//! it has been reset to something starting with [`COPY_PREFIX`] (what a
//! "duplicate" action writes before saving the copy).
//!
//! Candidates are tried in order `base`, `base-2`, `base-3`, ... against every
//! other entity of the same type. The store's unique constraint on `slug`
//! stays authoritative: [`SlugAssigner::save`] recomputes and retries when it
//! loses a race.

use async_trait::async_trait;
use serde_json::json;

use crate::core::entity::{Entity, Sluggable};
use crate::core::error::{ConfigurationError, FoundationError};
use crate::core::store::{EntityStore, Lookup};

/// Marker forcing regeneration on the next save
pub const COPY_PREFIX: &str = "copy-of";

pub const MAX_SLUG_LENGTH: usize = 255;

/// Bound on both candidate probing and lost-race retries
pub const MAX_SLUG_ATTEMPTS: usize = 100;

/// Whether a slug must be (re)computed before saving
pub fn needs_slug(slug: &str) -> bool {
    slug.is_empty() || slug.starts_with(COPY_PREFIX)
}

/// Lower-cased, URL-safe ASCII form of `text`, at most [`MAX_SLUG_LENGTH`] long.
///
/// Falls back to `fallback` when `text` has nothing to transliterate.
pub fn base_slug(text: &str, fallback: &str) -> String {
    let slug = slug::slugify(text);
    let slug = if slug.is_empty() {
        slug::slugify(fallback)
    } else {
        slug
    };
    truncate(&slug, MAX_SLUG_LENGTH).to_string()
}

/// The `attempt`-th candidate for `base` (1-based), truncated to fit
pub fn candidate(base: &str, attempt: usize) -> String {
    if attempt <= 1 {
        return truncate(base, MAX_SLUG_LENGTH).to_string();
    }
    let suffix = format!("-{}", attempt);
    let stem = truncate(base, MAX_SLUG_LENGTH - suffix.len());
    format!("{}{}", stem, suffix)
}

// Slugs are ASCII, so byte and char boundaries coincide
fn truncate(slug: &str, max: usize) -> &str {
    let cut = if slug.len() > max { &slug[..max] } else { slug };
    cut.trim_end_matches('-')
}

/// Mutate `entity.slug` in place if it needs a (new) slug.
///
/// Returns whether a slug was assigned. No store round trip happens for an
/// entity whose slug is already set and unmarked.
pub async fn ensure_slug<T: Sluggable>(
    entity: &mut T,
    store: &dyn EntityStore<T>,
) -> Result<bool, FoundationError> {
    if !needs_slug(entity.slug()) {
        return Ok(false);
    }

    let text = entity
        .slug_text()
        .ok_or_else(|| ConfigurationError::MissingDisplayField {
            entity_type: T::entity_type().to_string(),
        })?;
    let base = base_slug(text, T::entity_type());

    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let slug = candidate(&base, attempt);
        let lookup = Lookup::exact("slug", json!(slug)).excluding(Some(entity.id()));
        if !store.exists(&lookup).await? {
            tracing::info!(
                entity_type = T::entity_type(),
                id = %entity.id(),
                slug = %slug,
                "slug assigned"
            );
            entity.set_slug(slug);
            return Ok(true);
        }
    }

    Err(ConfigurationError::SlugExhausted {
        base,
        attempts: MAX_SLUG_ATTEMPTS,
    }
    .into())
}

/// Persistence hook run by viewsets when writing an entity
#[async_trait]
pub trait Persist<T: Entity>: Send + Sync {
    async fn persist(&self, entity: T, store: &dyn EntityStore<T>) -> Result<T, FoundationError>;
}

/// Save as is
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSave;

#[async_trait]
impl<T: Entity> Persist<T> for PlainSave {
    async fn persist(&self, entity: T, store: &dyn EntityStore<T>) -> Result<T, FoundationError> {
        Ok(store.save(entity).await?)
    }
}

/// Save with slug assignment
#[derive(Debug, Clone, Copy, Default)]
pub struct SlugAssigner;

impl SlugAssigner {
    /// Ensure the slug, then save.
    ///
    /// When the save is rejected for a duplicate slug that this call assigned,
    /// the slug is recomputed and the save retried, up to
    /// [`MAX_SLUG_ATTEMPTS`] times.
    pub async fn save<T: Sluggable>(
        &self,
        mut entity: T,
        store: &dyn EntityStore<T>,
    ) -> Result<T, FoundationError> {
        for _ in 0..MAX_SLUG_ATTEMPTS {
            let assigned = ensure_slug(&mut entity, store).await?;
            match store.save(entity.clone()).await {
                Ok(saved) => return Ok(saved),
                Err(err) if assigned && err.is_unique_violation_on("slug") => {
                    tracing::warn!(
                        entity_type = T::entity_type(),
                        slug = entity.slug(),
                        "slug taken concurrently, recomputing"
                    );
                    entity.set_slug(String::new());
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ConfigurationError::SlugExhausted {
            base: entity
                .slug_text()
                .map(|text| base_slug(text, T::entity_type()))
                .unwrap_or_default(),
            attempts: MAX_SLUG_ATTEMPTS,
        }
        .into())
    }
}

#[async_trait]
impl<T: Sluggable> Persist<T> for SlugAssigner {
    async fn persist(&self, entity: T, store: &dyn EntityStore<T>) -> Result<T, FoundationError> {
        self.save(entity, store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_slug_model;
    use crate::storage::InMemoryStore;

    impl_slug_model!(Topic, "topic", "topics", display = name, {
        name: String,
    });

    fn topic(name: &str) -> Topic {
        Topic {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_needs_slug() {
        assert!(needs_slug(""));
        assert!(needs_slug("copy-of-books"));
        assert!(!needs_slug("books"));
        assert!(!needs_slug("books-copy-of"));
    }

    #[test]
    fn test_base_slug_transliterates() {
        assert_eq!(base_slug("Crème Brûlée Recipes!", "topic"), "creme-brulee-recipes");
        assert_eq!(base_slug("  Hello   World ", "topic"), "hello-world");
        assert_eq!(base_slug("!!!", "topic"), "topic");
    }

    #[test]
    fn test_candidates_fit_max_length() {
        let base = "a".repeat(MAX_SLUG_LENGTH);
        assert_eq!(candidate(&base, 1).len(), MAX_SLUG_LENGTH);
        let second = candidate(&base, 2);
        assert_eq!(second.len(), MAX_SLUG_LENGTH);
        assert!(second.ends_with("-2"));
        assert_eq!(candidate("books", 3), "books-3");
    }

    #[test]
    fn test_ensure_slug_skips_store_for_slugged_entity() {
        let store = InMemoryStore::new();
        let mut entity = topic("Books");
        entity.slug = "already-there".into();

        let assigned = tokio_test::block_on(ensure_slug(&mut entity, &store)).unwrap();
        assert!(!assigned);
        assert_eq!(entity.slug, "already-there");
    }

    #[tokio::test]
    async fn test_collisions_get_numeric_suffix() {
        let store = InMemoryStore::new();
        let first = SlugAssigner.save(topic("Books"), &store).await.unwrap();
        let second = SlugAssigner.save(topic("books"), &store).await.unwrap();
        let third = SlugAssigner.save(topic("BOOKS!"), &store).await.unwrap();

        assert_eq!(first.slug, "books");
        assert_eq!(second.slug, "books-2");
        assert_eq!(third.slug, "books-3");
    }

    #[tokio::test]
    async fn test_copy_marker_regenerates() {
        let store = InMemoryStore::new();
        let original = SlugAssigner.save(topic("Books"), &store).await.unwrap();

        let mut copy = topic("Books");
        copy.slug = format!("{}-{}", COPY_PREFIX, original.slug);
        let copy = SlugAssigner.save(copy, &store).await.unwrap();
        assert_eq!(copy.slug, "books-2");
    }

    #[tokio::test]
    async fn test_resave_keeps_own_slug() {
        let store = InMemoryStore::new();
        let mut saved = SlugAssigner.save(topic("Books"), &store).await.unwrap();
        saved.slug = COPY_PREFIX.to_string();
        let resaved = SlugAssigner.save(saved, &store).await.unwrap();
        // its own previous row does not count as a collision
        assert_eq!(resaved.slug, "books");
    }

    #[tokio::test]
    async fn test_missing_display_text_is_configuration_error() {
        impl_slug_model!(Untitled, "untitled", "untitled", display = title, {
            title: Option<String>,
        });

        let store = InMemoryStore::new();
        let err = SlugAssigner
            .save(Untitled::default(), &store)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FoundationError::Configuration(ConfigurationError::MissingDisplayField { .. })
        ));
    }
}
