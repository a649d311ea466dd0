//! Authentication
//!
//! Bearer-token identity for the authorization API. Tokens carry the user ID
//! and system role; account management lives outside this service.

mod error;
pub mod jwt;
mod middleware;

pub use error::{AuthError, AuthResult, ErrorResponse};
pub use jwt::{generate_access_token, validate_access_token, Claims};
pub use middleware::{optional_auth, AuthUser};
