use crate::{
    auth::{
        clear_session_cookie, hash_password, verify_password, AuthSettings, CurrentUser,
        PasswordChangeInput,
    },
    db,
    error::AppError,
    flash::{self, FlashMessage, Messages},
    forms,
    models::{user::USERNAME_TAKEN, SignupInput, User, UserUpdateInput},
};
use actix_web::{get, post, web, HttpResponse};
use log::{info, warn};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

pub const USERS_URL: &str = "/users/";

pub const USER_CREATED: &str = "User created successfully";
pub const USER_UPDATED: &str = "User info changed successfully";
pub const USER_DELETED: &str = "User deleted successfully";
pub const NO_PERMISSION: &str = "You have no permissions to change other user";
pub const USER_IN_USE: &str = "Cannot delete the user assigned to task";
pub const PASSWORD_CHANGED: &str = "Password changed successfully";
pub const WRONG_OLD_PASSWORD: &str =
    "Your old password was entered incorrectly. Please enter it again.";

/// Only the account owner or a superuser may change or delete an account.
fn ensure_may_manage(user: &CurrentUser, target_id: i64) -> Result<(), AppError> {
    if user.may_manage(target_id) {
        Ok(())
    } else {
        warn!("user {} may not change user {}", user.id, target_id);
        Err(AppError::denied(NO_PERMISSION, USERS_URL))
    }
}

async fn find_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    User::find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// All users, newest signup first. Public.
#[get("/")]
pub async fn list(
    pool: web::Data<SqlitePool>,
    user: Option<CurrentUser>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let users = User::all(&**pool).await?;
    let users: Vec<_> = users
        .into_iter()
        .map(|u| {
            json!({
                "id": u.id,
                "username": u.username,
                "full_name": u.full_name(),
                "signup_date": u.signup_date,
            })
        })
        .collect();

    Ok(messages.render(json!({
        "page": "users",
        "user": user,
        "users": users,
    })))
}

#[get("/create/")]
pub async fn signup_page(user: Option<CurrentUser>, messages: Messages) -> HttpResponse {
    messages.render(json!({
        "page": "signup",
        "user": user,
    }))
}

/// Register a new user
///
/// On success the visitor is sent to the login page.
#[post("/create/")]
pub async fn signup(
    pool: web::Data<SqlitePool>,
    settings: web::Data<AuthSettings>,
    form: web::Form<SignupInput>,
) -> Result<HttpResponse, AppError> {
    let input = form.into_inner();

    let mut errors = forms::collect(input.validate());
    if User::username_taken(&**pool, &input.username, None).await? {
        errors.add("username", forms::field_error("unique", USERNAME_TAKEN));
    }
    forms::finish(errors)?;

    let password_hash = hash_password(&input.password1, settings.bcrypt_cost)?;
    let user = match User::create(&**pool, &input, &password_hash).await {
        Ok(user) => user,
        // Lost a race with a concurrent signup for the same name.
        Err(e) if db::is_unique_violation(&e) => {
            let mut errors = validator::ValidationErrors::new();
            errors.add("username", forms::field_error("unique", USERNAME_TAKEN));
            return Err(errors.into());
        }
        Err(e) => return Err(e.into()),
    };

    info!("user {} ({}) signed up", user.id, user.username);
    Ok(flash::redirect(
        crate::auth::LOGIN_URL,
        FlashMessage::success(USER_CREATED),
    ))
}

#[get("/password/")]
pub async fn password_page(user: CurrentUser, messages: Messages) -> HttpResponse {
    messages.render(json!({
        "page": "password_change",
        "user": user,
    }))
}

/// Changes the password of the logged-in user after checking the current one.
#[post("/password/")]
pub async fn change_password(
    pool: web::Data<SqlitePool>,
    settings: web::Data<AuthSettings>,
    user: CurrentUser,
    form: web::Form<PasswordChangeInput>,
) -> Result<HttpResponse, AppError> {
    let input = form.into_inner();

    let mut errors = forms::collect(input.validate());
    let current_hash = User::password_hash(&**pool, user.id).await?;
    if !verify_password(&input.old_password, &current_hash)? {
        errors.add(
            "old_password",
            forms::field_error("password_incorrect", WRONG_OLD_PASSWORD),
        );
    }
    forms::finish(errors)?;

    let password_hash = hash_password(&input.new_password1, settings.bcrypt_cost)?;
    User::set_password(&**pool, user.id, &password_hash).await?;

    info!("user {} changed their password", user.id);
    Ok(flash::redirect(
        USERS_URL,
        FlashMessage::success(PASSWORD_CHANGED),
    ))
}

#[get("/{id}/update/")]
pub async fn update_page(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    ensure_may_manage(&user, id)?;
    let target = find_user(&pool, id).await?;

    Ok(messages.render(json!({
        "page": "user_update",
        "user": user,
        "object": target,
    })))
}

/// Changes username and names. Owner or superuser only.
#[post("/{id}/update/")]
pub async fn update(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    form: web::Form<UserUpdateInput>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    ensure_may_manage(&user, id)?;
    find_user(&pool, id).await?;

    let input = form.into_inner();
    let mut errors = forms::collect(input.validate());
    if User::username_taken(&**pool, &input.username, Some(id)).await? {
        errors.add("username", forms::field_error("unique", USERNAME_TAKEN));
    }
    forms::finish(errors)?;

    match User::update(&**pool, id, &input).await {
        Ok(_) => {}
        Err(e) if db::is_unique_violation(&e) => {
            let mut errors = validator::ValidationErrors::new();
            errors.add("username", forms::field_error("unique", USERNAME_TAKEN));
            return Err(errors.into());
        }
        Err(e) => return Err(e.into()),
    }

    info!("user {} updated by {}", id, user.id);
    Ok(flash::redirect(USERS_URL, FlashMessage::success(USER_UPDATED)))
}

#[get("/{id}/delete/")]
pub async fn delete_page(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    ensure_may_manage(&user, id)?;
    let target = find_user(&pool, id).await?;

    Ok(messages.render(json!({
        "page": "user_delete",
        "user": user,
        "object": target,
    })))
}

/// Deletes an account that no task refers to. Deleting your own account logs you out.
#[post("/{id}/delete/")]
pub async fn delete(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    ensure_may_manage(&user, id)?;
    find_user(&pool, id).await?;

    if User::task_count(&**pool, id).await? > 0 {
        warn!("user {} is referenced by tasks, not deleting", id);
        return Err(AppError::denied(USER_IN_USE, USERS_URL));
    }
    match User::delete(&**pool, id).await {
        Ok(_) => {}
        Err(e) if db::is_foreign_key_violation(&e) => {
            warn!("user {} gained a task before deletion", id);
            return Err(AppError::denied(USER_IN_USE, USERS_URL));
        }
        Err(e) => return Err(e.into()),
    }

    info!("user {} deleted by {}", id, user.id);
    let mut response = flash::found(USERS_URL, FlashMessage::success(USER_DELETED));
    if id == user.id {
        response.cookie(clear_session_cookie());
    }
    Ok(response.finish())
}
