//! Macros for reducing boilerplate when defining entities
//!
//! These macros generate the struct with its base fields and the trait
//! implementations every entity type needs.

/// Create an entity struct carrying the base model fields
///
/// Generates `id`, `created_at`, `modified_at` and `is_active` followed by the
/// declared fields, a `Default` that assigns a fresh UUID v4 and the current
/// time, and the [`Entity`](crate::core::entity::Entity) implementation.
///
/// # Example
///
/// ```rust,ignore
/// use foundation::prelude::*;
///
/// impl_base_model!(
///     User,
///     "user",
///     "users",
///     {
///         email: String,
///         phone_number: Option<String>,
///     },
///     unique = ["email", "phone_number"],
///     unique_ignore_case = ["email"]
/// );
///
/// let user = User {
///     email: "ada@example.com".into(),
///     ..Default::default()
/// };
/// ```
#[macro_export]
macro_rules! impl_base_model {
    (
        $type:ident,
        $type_name:expr,
        $resource_name:expr,
        {
            $( $(#[$field_meta:meta])* $field:ident : $field_type:ty ),* $(,)?
        }
        $(, unique = [ $( $unique_field:expr ),* $(,)? ] )?
        $(, unique_ignore_case = [ $( $folded_field:expr ),* $(,)? ] )?
        $(,)?
    ) => {
        #[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $type {
            /// Unique identifier for this entity
            pub id: ::uuid::Uuid,

            /// When this entity was first saved
            pub created_at: ::chrono::DateTime<::chrono::Utc>,

            /// When this entity was last saved
            pub modified_at: ::chrono::DateTime<::chrono::Utc>,

            /// Cleared by soft-deactivating destroys
            pub is_active: bool,

            $( $(#[$field_meta])* pub $field : $field_type ),*
        }

        impl Default for $type {
            fn default() -> Self {
                let now = ::chrono::Utc::now();
                Self {
                    id: ::uuid::Uuid::new_v4(),
                    created_at: now,
                    modified_at: now,
                    is_active: true,
                    $( $field: Default::default() ),*
                }
            }
        }

        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $resource_name
            }

            fn entity_type() -> &'static str {
                $type_name
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn modified_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.modified_at
            }

            fn set_timestamps(
                &mut self,
                created_at: ::chrono::DateTime<::chrono::Utc>,
                modified_at: ::chrono::DateTime<::chrono::Utc>,
            ) {
                self.created_at = created_at;
                self.modified_at = modified_at;
            }

            fn is_active(&self) -> bool {
                self.is_active
            }

            fn set_active(&mut self, active: bool) {
                self.is_active = active;
            }

            fn unique_fields() -> &'static [&'static str] {
                &[ $( $( $unique_field ),* )? ]
            }

            fn unique_ignoring_case() -> &'static [&'static str] {
                &[ $( $( $folded_field ),* )? ]
            }
        }
    };
}

/// Create a sluggable entity
///
/// Same as [`impl_base_model!`] plus a unique `slug: String` field and a
/// [`Sluggable`](crate::core::entity::Sluggable) implementation reading the
/// slug text from the declared `display` field (`String` or `Option<String>`).
///
/// # Example
///
/// ```rust,ignore
/// impl_slug_model!(
///     Category,
///     "category",
///     "categories",
///     display = name,
///     {
///         name: String,
///     }
/// );
/// ```
#[macro_export]
macro_rules! impl_slug_model {
    (
        $type:ident,
        $type_name:expr,
        $resource_name:expr,
        display = $display:ident,
        {
            $( $(#[$field_meta:meta])* $field:ident : $field_type:ty ),* $(,)?
        }
        $(, unique = [ $( $unique_field:expr ),* $(,)? ] )?
        $(, unique_ignore_case = [ $( $folded_field:expr ),* $(,)? ] )?
        $(,)?
    ) => {
        $crate::impl_base_model!(
            $type,
            $type_name,
            $resource_name,
            {
                /// Unique, URL-safe identifier derived from the display field
                slug: String,
                $( $(#[$field_meta])* $field : $field_type ),*
            },
            unique = ["slug" $( $(, $unique_field )* )?],
            unique_ignore_case = [ $( $( $folded_field ),* )? ]
        );

        impl $crate::core::entity::Sluggable for $type {
            fn slug_text(&self) -> Option<&str> {
                $crate::core::entity::DisplayText::display_text(&self.$display)
            }

            fn slug(&self) -> &str {
                &self.slug
            }

            fn set_slug(&mut self, slug: String) {
                self.slug = slug;
            }
        }
    };
}
