use crate::{
    auth::{
        clear_session_cookie, generate_token, safe_next, session_cookie, verify_password,
        AuthSettings, CurrentUser, LoginInput, NextQuery,
    },
    error::AppError,
    flash::{self, FlashMessage, Messages},
    forms::{self, NON_FIELD_ERRORS},
    models::User,
};
use actix_web::{get, http::header, post, route, web, HttpResponse};
use log::{info, warn};
use serde_json::json;
use sqlx::SqlitePool;
use validator::{Validate, ValidationErrors};

pub const LOGGED_IN: &str = "You are logged in";
pub const LOGGED_OUT: &str = "You are logged out";
pub const INVALID_LOGIN: &str = "Please enter a correct username and password. \
    Note that both fields may be case-sensitive.";

/// Login page
///
/// Echoes the `next` destination so the form can post it back.
#[get("/login/")]
pub async fn login_page(
    user: Option<CurrentUser>,
    query: web::Query<NextQuery>,
    messages: Messages,
) -> HttpResponse {
    messages.render(json!({
        "page": "login",
        "user": user,
        "next": query.next,
    }))
}

/// Login user
///
/// Checks the credentials, stores a session token in the `session` cookie and
/// redirects to `next` (form field first, then query string) or to `/`.
/// Bad credentials re-render the form (422) with a form-level error.
#[post("/login/")]
pub async fn login(
    pool: web::Data<SqlitePool>,
    settings: web::Data<AuthSettings>,
    query: web::Query<NextQuery>,
    form: web::Form<LoginInput>,
) -> Result<HttpResponse, AppError> {
    let input = form.into_inner();
    input.validate()?;

    let user_id = match User::credentials(&**pool, &input.username).await? {
        Some((id, hash)) => {
            if verify_password(&input.password, &hash)? {
                Some(id)
            } else {
                None
            }
        }
        None => None,
    };

    let user_id = match user_id {
        Some(id) => id,
        None => {
            warn!("failed login for {:?}", input.username);
            let mut errors = ValidationErrors::new();
            errors.add(
                NON_FIELD_ERRORS,
                forms::field_error("invalid_login", INVALID_LOGIN),
            );
            return Err(errors.into());
        }
    };

    let token = generate_token(&settings, user_id)?;
    let next = input.next.as_deref().or(query.next.as_deref());
    let location = safe_next(next).unwrap_or("/");
    info!("user {} logged in", user_id);

    Ok(flash::found(location, FlashMessage::success(LOGGED_IN))
        .cookie(session_cookie(token, &settings))
        .finish())
}

/// Logout user
///
/// Drops the session cookie and returns to the index page.
#[route("/logout/", method = "GET", method = "POST")]
pub async fn logout(user: Option<CurrentUser>) -> HttpResponse {
    let mut response = match user {
        Some(user) => {
            info!("user {} logged out", user.id);
            flash::found("/", FlashMessage::success(LOGGED_OUT))
        }
        None => {
            let mut builder = HttpResponse::Found();
            builder.insert_header((header::LOCATION, "/"));
            builder
        }
    };
    response.cookie(clear_session_cookie()).finish()
}
