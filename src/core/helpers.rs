//! Small helpers shared by validators, rules and entities

use chrono::{Local, NaiveDate};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::entity::Entity;

/// Today's date in the server's local timezone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Build a date from its parts.
///
/// A zero year or month means the part was not supplied, which makes the
/// date invalid. Returns `None` for anything that is not a real calendar day.
pub fn combine_date_parts(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if year == 0 || month == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Replace a file's stem with a random UUID, keeping its extension
pub fn uuid_filename(filename: &str) -> String {
    let extension = filename.rsplit('.').next().unwrap_or(filename);
    format!("{}.{}", Uuid::new_v4().simple(), extension)
}

/// Storage path for an uploaded file: `uploads/<owner type>/<uuid>.<ext>`
pub fn upload_path(owner_type: &str, filename: &str) -> String {
    format!("uploads/{}/{}", owner_type.to_lowercase(), uuid_filename(filename))
}

/// Copy a subset of validated values onto an entity.
///
/// With an empty `fields` list every key is applied. Protected base fields
/// are never written.
pub fn set_instance_fields<T: Entity>(
    instance: &mut T,
    validated: &Map<String, Value>,
    fields: &[&str],
) -> Result<(), serde_json::Error> {
    if fields.is_empty() {
        return instance.apply_fields(validated);
    }
    let selected: Map<String, Value> = validated
        .iter()
        .filter(|(name, _)| fields.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    instance.apply_fields(&selected)
}
