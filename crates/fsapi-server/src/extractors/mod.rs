//! Request extractors and middleware

pub mod auth;
pub mod path;

pub use auth::require_auth_token;
pub use path::FilePath;
