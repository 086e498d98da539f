//! Credentials, signed tokens and the bearer-token gate for protected routes.

pub mod middleware;
pub mod password;
pub mod tokens;

pub use middleware::require_bearer;
pub use tokens::{AuthClaims, TokenError, TokenPair, TokenService};
