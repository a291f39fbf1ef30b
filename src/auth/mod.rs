pub mod accounts;
mod helpers;
mod middleware;
mod password;
mod token;

pub use accounts::{AuthSettings, Session};
pub use helpers::{TokenValidationError, ValidatedToken, validate_token};
pub use middleware::{AuthError, RequireAdmin, RequireAuth};
pub use password::{MIN_PASSWORD_LEN, generate_password, hash_password, verify_password};
pub use token::{TokenGenerator, parse_token};
