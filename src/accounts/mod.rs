//! Reference accounts module: the user entity, its serializers and viewset

pub mod model;
pub mod password;
pub mod serializers;
pub mod views;

pub use model::User;
pub use password::{hash_password, verify_password};
pub use serializers::{PasswordChangeSerializer, UserDetailSerializer};
pub use views::{change_password, user_viewset};
