pub mod extractor;
pub mod password;
pub mod token;

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use lazy_static::lazy_static;
use serde::Deserialize;
use validator::Validate;

// Re-export necessary items
pub use extractor::AuthUser;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims};

/// Name of the cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "token";

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    pub static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    #[validate(email)]
    pub email: String,
    /// User's password. Must be at least 5 characters long.
    #[validate(length(min = 5))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username for the new account.
    /// Must be between 4 and 32 characters, alphanumeric, underscores, or hyphens.
    #[validate(
        length(min = 4, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// Email address for the new account.
    #[validate(email)]
    pub email: String,
    /// Password for the new account. Must be at least 5 characters long.
    #[validate(length(min = 5))]
    pub password: String,
}

/// Builds the httpOnly session cookie carrying a freshly signed token.
///
/// The cookie is scoped to the whole site, marked secure, and sent cross-site
/// (`SameSite=None`) so a separately hosted frontend can authenticate. It
/// expires together with the token it carries, one day after issuance.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .max_age(Duration::days(1))
        .finish()
}

/// Builds an immediately expiring session cookie, used to log out.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .max_age(Duration::ZERO)
        .finish()
}
