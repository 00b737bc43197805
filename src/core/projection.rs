//! Dynamic field projection
//!
//! The observable field set of a request is a pure function of the
//! serializer, the [`SerializerContext`] and the [`FieldSelection`]:
//!
//! 1. start from the serializer's declared fields
//! 2. in a creation context, append its creation-only virtual fields
//! 3. keep the included fields (unknown names are ignored), then drop the
//!    excluded ones; exclusion always wins
//! 4. lock create-only fields (read-only) when the instance already exists
//!
//! The resulting [`ProjectedView`] drives both representation and the
//! validation pipeline.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::core::entity::Entity;
use crate::core::error::{FoundationError, ValidationError};
use crate::core::field::FieldDescriptor;
use crate::core::serializer::{Serializer, SerializerContext, ValidatedData};
use crate::core::store::{EntityStore, Lookup, is_constrained};

/// Optional include and exclude sets of field names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    pub include: Option<BTreeSet<String>>,
    pub exclude: Option<BTreeSet<String>>,
}

fn name_set<I, S>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

fn parse_hint<'a>(hints: impl IntoIterator<Item = &'a str>) -> Option<BTreeSet<String>> {
    let names: BTreeSet<String> = hints
        .into_iter()
        .flat_map(|hint| hint.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    (!names.is_empty()).then_some(names)
}

impl FieldSelection {
    /// Select everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(name_set(names));
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(name_set(names));
        self
    }

    /// Parse `fields` / `exclude` query hints
    ///
    /// Each side takes any number of values, and each value may itself be
    /// comma-separated, so `?fields=id&fields=name` and `?fields=id,name`
    /// select the same set. Blank hints are treated as absent.
    pub fn from_hints<'a, F, E>(fields: F, exclude: E) -> Self
    where
        F: IntoIterator<Item = &'a str>,
        E: IntoIterator<Item = &'a str>,
    {
        Self {
            include: parse_hint(fields),
            exclude: parse_hint(exclude),
        }
    }

    /// Combine viewset defaults (`self`) with request hints.
    ///
    /// A request can only narrow the defaults: include sets are intersected
    /// when both sides have one, and exclude sets are unioned. Either way a
    /// field the viewset hides stays hidden.
    pub fn merge(&self, request: &FieldSelection) -> FieldSelection {
        let include = match (&self.include, &request.include) {
            (Some(defaults), Some(hints)) => Some(defaults.intersection(hints).cloned().collect()),
            (defaults, hints) => hints.clone().or_else(|| defaults.clone()),
        };
        let exclude = match (&self.exclude, &request.exclude) {
            (None, None) => None,
            (defaults, hints) => Some(
                defaults
                    .iter()
                    .chain(hints.iter())
                    .flatten()
                    .cloned()
                    .collect(),
            ),
        };
        FieldSelection { include, exclude }
    }

    /// Whether a field survives both filters
    pub fn admits(&self, name: &str) -> bool {
        let included = self.include.as_ref().is_none_or(|set| set.contains(name));
        let excluded = self.exclude.as_ref().is_some_and(|set| set.contains(name));
        included && !excluded
    }

    /// Include filter, then exclude filter; declaration order is kept
    pub fn apply(&self, fields: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
        let included: Vec<FieldDescriptor> = match &self.include {
            Some(set) => fields.into_iter().filter(|f| set.contains(&f.name)).collect(),
            None => fields,
        };
        match &self.exclude {
            Some(set) => included
                .into_iter()
                .filter(|f| !set.contains(&f.name))
                .collect(),
            None => included,
        }
    }
}

/// Immutable, ordered field set observable by one request
#[derive(Debug, Clone)]
pub struct ProjectedView {
    fields: Vec<FieldDescriptor>,
}

/// Derive the field set for a serializer invocation
pub fn build_view<S>(serializer: &S, ctx: &SerializerContext, selection: &FieldSelection) -> ProjectedView
where
    S: Serializer + ?Sized,
{
    let mut fields = serializer.fields(ctx);
    if ctx.is_creation() {
        fields.extend(
            serializer
                .creation_fields(ctx)
                .into_iter()
                .map(FieldDescriptor::virtual_field),
        );
    }

    let mut fields = selection.apply(fields);

    if ctx.instance_exists() {
        for field in fields.iter_mut().filter(|f| f.create_only) {
            field.read_only = true;
        }
    }

    tracing::debug!(
        action = %ctx.action,
        fields = ?fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        "built projected view"
    );

    ProjectedView { fields }
}

impl ProjectedView {
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Whether `name` is part of the representation
    pub fn is_visible(&self, name: &str) -> bool {
        self.field(name).is_some_and(FieldDescriptor::is_readable)
    }

    /// Represent an entity: readable fields, in view order
    pub fn represent<T: Entity>(&self, entity: &T) -> Result<IndexMap<String, Value>, FoundationError> {
        let mut attributes = entity.to_fields()?;
        Ok(self
            .fields
            .iter()
            .filter(|f| f.is_readable())
            .map(|f| {
                let value = attributes.remove(&f.name).unwrap_or(Value::Null);
                (f.name.clone(), value)
            })
            .collect())
    }

    /// Represent validated data, for serializers without a backing entity
    pub fn represent_data(&self, data: &ValidatedData) -> IndexMap<String, Value> {
        self.fields
            .iter()
            .filter(|f| f.is_readable())
            .filter_map(|f| data.get(&f.name).map(|v| (f.name.clone(), v.clone())))
            .collect()
    }

    /// Per-field validation of a JSON object payload.
    ///
    /// Read-only fields and keys outside the view are ignored. Every writable
    /// field is checked and all failures are collected.
    pub fn validate_fields(&self, payload: &Value, partial: bool) -> Result<ValidatedData, ValidationError> {
        let Some(object) = payload.as_object() else {
            return Err(ValidationError::message(
                "Invalid data. Expected a dictionary of fields.",
            ));
        };

        let mut data = ValidatedData::new();
        let mut errors = ValidationError::new();

        for field in self.fields.iter().filter(|f| !f.read_only) {
            match object.get(&field.name) {
                None => {
                    if field.required && !partial {
                        errors.add(&field.name, "This field is required.");
                    }
                }
                Some(raw) => match field.clean(raw.clone()) {
                    Ok(value) => data.insert(&field.name, value, field.is_virtual),
                    Err(message) => errors.add(&field.name, message),
                },
            }
        }

        errors.into_result().map(|_| data)
    }
}

/// Full validation pipeline for a write.
///
/// Per-field checks, then uniqueness lookups against every stored entity of
/// the type (excluding the instance being updated), then the serializer's
/// cross-field validation. Nothing is persisted here; any failure aborts the
/// operation.
pub async fn validate_payload<T, S>(
    view: &ProjectedView,
    serializer: &S,
    ctx: &SerializerContext,
    payload: &Value,
    store: &dyn EntityStore<T>,
) -> Result<ValidatedData, FoundationError>
where
    T: Entity,
    S: Serializer + ?Sized,
{
    let data = view.validate_fields(payload, ctx.partial)?;

    let mut errors = ValidationError::new();
    for field in view.fields() {
        let (Some(rule), Some(value)) = (&field.unique, data.get(&field.name)) else {
            continue;
        };
        if !is_constrained(value) {
            continue;
        }
        let lookup = if rule.case_insensitive {
            Lookup::iexact(&field.name, value.clone())
        } else {
            Lookup::exact(&field.name, value.clone())
        }
        .excluding(ctx.instance_id);

        if store.exists(&lookup).await? {
            errors.add(&field.name, &rule.message);
        }
    }
    errors.into_result()?;

    Ok(serializer.validate(data, ctx)?)
}
