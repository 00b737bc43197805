//! Entity traits defining the base model behaviors shared by every record type

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Base fields the store manages and callers can never write
pub const PROTECTED_FIELDS: &[&str] = &["id", "created_at", "modified_at"];

/// Base trait for all entities in the system.
///
/// Every entity carries:
/// - id: UUID v4 assigned on construction
/// - created_at: set by the store on first insert
/// - modified_at: refreshed by the store on every save
/// - is_active: cleared by soft-deactivating destroys
///
/// Entities are addressed by attribute name through their JSON object form,
/// which is what the field projector and the store's lookups operate on.
/// Use the `impl_base_model!` macro rather than implementing this by hand.
pub trait Entity:
    Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The plural resource name used in URLs (e.g., "users", "categories")
    fn resource_name() -> &'static str;

    /// The singular type name (e.g., "user", "category")
    fn entity_type() -> &'static str;

    // === Base Fields ===

    fn id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;

    fn modified_at(&self) -> DateTime<Utc>;

    /// Overwrite both timestamps. Reserved for the store.
    fn set_timestamps(&mut self, created_at: DateTime<Utc>, modified_at: DateTime<Utc>);

    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    /// Fields the storage layer keeps unique within the entity type.
    ///
    /// `None` and empty-string values never collide.
    fn unique_fields() -> &'static [&'static str] {
        &[]
    }

    /// Unique fields whose text values collide regardless of case
    fn unique_ignoring_case() -> &'static [&'static str] {
        &[]
    }

    // === Attribute Access ===

    /// The entity as an ordered attribute map
    fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "{} does not serialize to an object (got {})",
                Self::entity_type(),
                other
            ))),
        }
    }

    /// Read one attribute by name
    fn field_value(&self, field: &str) -> Option<Value> {
        self.to_fields().ok()?.remove(field)
    }

    /// Write attributes by name.
    ///
    /// Keys that are not attributes of the entity are dropped by the serde
    /// round trip; [`PROTECTED_FIELDS`] are skipped.
    fn apply_fields(&mut self, fields: &Map<String, Value>) -> Result<(), serde_json::Error> {
        let mut current = self.to_fields()?;
        for (name, value) in fields {
            if PROTECTED_FIELDS.contains(&name.as_str()) {
                continue;
            }
            if current.contains_key(name) {
                current.insert(name.clone(), value.clone());
            }
        }
        *self = serde_json::from_value(Value::Object(current))?;
        Ok(())
    }
}

/// Entities carrying a unique, URL-safe slug derived from a display field
///
/// The display field is declared explicitly (`display = name` in
/// `impl_slug_model!`), so there is no runtime probing for a `name` or `title`
/// attribute. A hand-written implementation returning `None` from
/// [`Sluggable::slug_text`] is a configuration error at save time.
pub trait Sluggable: Entity {
    /// Text the slug is derived from
    fn slug_text(&self) -> Option<&str>;

    fn slug(&self) -> &str;

    fn set_slug(&mut self, slug: String);
}

/// Display field types usable as a slug source
pub trait DisplayText {
    fn display_text(&self) -> Option<&str>;
}

impl DisplayText for String {
    fn display_text(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl DisplayText for Option<String> {
    fn display_text(&self) -> Option<&str> {
        self.as_deref()
    }
}
