pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::forms::{self, not_entirely_numeric};

pub use extractors::CurrentUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims};

/// Name of the cookie holding the session token.
pub const SESSION_COOKIE: &str = "session";

pub const LOGIN_URL: &str = "/login/";

/// Secrets and tunables shared by the login flow and `AuthMiddleware`.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// HMAC secret used to sign session tokens.
    pub secret: String,
    /// Lifetime of a session token and its cookie.
    pub session_ttl_hours: i64,
    /// bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
}

/// Login form. `next` may also arrive in the query string.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginInput {
    #[serde(deserialize_with = "forms::trimmed")]
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
    pub next: Option<String>,
}

/// Query string of the login page.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Password change form for the logged-in user.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PasswordChangeInput {
    #[validate(length(min = 1))]
    pub old_password: String,
    #[validate(
        length(min = 8, message = "This password is too short. It must contain at least 8 characters."),
        custom = "not_entirely_numeric"
    )]
    pub new_password1: String,
    #[validate(must_match(other = "new_password1", message = "The two password fields didn't match."))]
    pub new_password2: String,
}

pub fn session_cookie(token: String, settings: &AuthSettings) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(settings.session_ttl_hours))
        .finish()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Accepts only local absolute paths as a post-login destination.
///
/// Browsers drop tabs and newlines inside a URL, so any control character is refused
/// along with the scheme-relative forms.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.map(str::trim).filter(|n| {
        n.starts_with('/')
            && !n.starts_with("//")
            && !n.contains('\\')
            && !n.contains("://")
            && !n.chars().any(char::is_control)
    })
}

/// The login page URL remembering where the user was going.
pub fn login_url(next: &str) -> String {
    match serde_urlencoded::to_string([("next", next)]) {
        Ok(query) => format!("{}?{}", LOGIN_URL, query),
        Err(_) => LOGIN_URL.to_string(),
    }
}
