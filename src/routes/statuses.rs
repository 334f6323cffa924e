use crate::{
    auth::CurrentUser,
    db,
    error::AppError,
    flash::{self, FlashMessage, Messages},
    models::{Status, StatusInput},
};
use actix_web::{get, post, web, HttpResponse};
use log::{info, warn};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

pub const STATUSES_URL: &str = "/statuses/";

pub const STATUS_CREATED: &str = "Status created successfully";
pub const STATUS_UPDATED: &str = "Status updated successfully";
pub const STATUS_DELETED: &str = "Status deleted successfully";
pub const STATUS_IN_USE: &str = "Cannot delete the status assigned to task";

async fn find_status(pool: &SqlitePool, id: i64) -> Result<Status, AppError> {
    Status::find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Status not found".into()))
}

#[get("/")]
pub async fn list(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let statuses = Status::all(&**pool).await?;
    Ok(messages.render(json!({
        "page": "statuses",
        "user": user,
        "statuses": statuses,
    })))
}

#[get("/create/")]
pub async fn create_page(user: CurrentUser, messages: Messages) -> HttpResponse {
    messages.render(json!({
        "page": "status_create",
        "user": user,
    }))
}

#[post("/create/")]
pub async fn create(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    form: web::Form<StatusInput>,
) -> Result<HttpResponse, AppError> {
    form.validate()?;
    let status = Status::create(&**pool, &form).await?;

    info!("status {} created by {}", status.id, user.id);
    Ok(flash::redirect(STATUSES_URL, FlashMessage::success(STATUS_CREATED)))
}

#[get("/{id}/update/")]
pub async fn update_page(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let status = find_status(&pool, path.into_inner()).await?;
    Ok(messages.render(json!({
        "page": "status_update",
        "user": user,
        "object": status,
    })))
}

#[post("/{id}/update/")]
pub async fn update(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    form: web::Form<StatusInput>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    find_status(&pool, id).await?;
    form.validate()?;
    Status::update(&**pool, id, &form).await?;

    info!("status {} updated by {}", id, user.id);
    Ok(flash::redirect(STATUSES_URL, FlashMessage::success(STATUS_UPDATED)))
}

#[get("/{id}/delete/")]
pub async fn delete_page(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let status = find_status(&pool, path.into_inner()).await?;
    Ok(messages.render(json!({
        "page": "status_delete",
        "user": user,
        "object": status,
    })))
}

/// Deletes a status unless some task is in it.
#[post("/{id}/delete/")]
pub async fn delete(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    find_status(&pool, id).await?;

    if Status::task_count(&**pool, id).await? > 0 {
        warn!("status {} is in use, not deleting", id);
        return Err(AppError::denied(STATUS_IN_USE, STATUSES_URL));
    }
    match Status::delete(&**pool, id).await {
        Ok(_) => {}
        Err(e) if db::is_foreign_key_violation(&e) => {
            return Err(AppError::denied(STATUS_IN_USE, STATUSES_URL));
        }
        Err(e) => return Err(e.into()),
    }

    info!("status {} deleted by {}", id, user.id);
    Ok(flash::redirect(STATUSES_URL, FlashMessage::success(STATUS_DELETED)))
}
