mod claims;
pub mod cookie;
pub(crate) mod extractors;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;

pub use extractors::{authenticate, require_admin, AdminUser, AuthError, CurrentUser};
