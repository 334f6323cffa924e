use crate::{
    auth::CurrentUser,
    db,
    error::AppError,
    flash::{self, FlashMessage, Messages},
    models::{Label, LabelInput},
};
use actix_web::{get, post, web, HttpResponse};
use log::{info, warn};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

pub const LABELS_URL: &str = "/labels/";

pub const LABEL_CREATED: &str = "Label created successfully";
pub const LABEL_UPDATED: &str = "Label updated successfully";
pub const LABEL_DELETED: &str = "Label deleted successfully";
pub const LABEL_IN_USE: &str = "Cannot delete the label associated with a task";

async fn find_label(pool: &SqlitePool, id: i64) -> Result<Label, AppError> {
    Label::find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Label not found".into()))
}

#[get("/")]
pub async fn list(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let labels = Label::all(&**pool).await?;
    Ok(messages.render(json!({
        "page": "labels",
        "user": user,
        "labels": labels,
    })))
}

#[get("/create/")]
pub async fn create_page(user: CurrentUser, messages: Messages) -> HttpResponse {
    messages.render(json!({ "page": "label_create", "user": user }))
}

#[post("/create/")]
pub async fn create(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    form: web::Form<LabelInput>,
) -> Result<HttpResponse, AppError> {
    form.validate()?;
    let label = Label::create(&**pool, &form).await?;

    info!("label {} created by {}", label.id, user.id);
    Ok(flash::redirect(LABELS_URL, FlashMessage::success(LABEL_CREATED)))
}

#[get("/{id}/update/")]
pub async fn update_page(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let label = find_label(&pool, path.into_inner()).await?;
    Ok(messages.render(json!({ "page": "label_update", "user": user, "object": label })))
}

#[post("/{id}/update/")]
pub async fn update(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    form: web::Form<LabelInput>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    find_label(&pool, id).await?;
    form.validate()?;
    Label::update(&**pool, id, &form).await?;

    info!("label {} updated by {}", id, user.id);
    Ok(flash::redirect(LABELS_URL, FlashMessage::success(LABEL_UPDATED)))
}

#[get("/{id}/delete/")]
pub async fn delete_page(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let label = find_label(&pool, path.into_inner()).await?;
    Ok(messages.render(json!({ "page": "label_delete", "user": user, "object": label })))
}

/// Deletes a label that no task carries.
#[post("/{id}/delete/")]
pub async fn delete(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    find_label(&pool, id).await?;

    if Label::task_count(&**pool, id).await? > 0 {
        warn!("label {} is attached to tasks, not deleting", id);
        return Err(AppError::denied(LABEL_IN_USE, LABELS_URL));
    }
    if let Err(e) = Label::delete(&**pool, id).await {
        return Err(if db::is_foreign_key_violation(&e) {
            AppError::denied(LABEL_IN_USE, LABELS_URL)
        } else {
            e.into()
        });
    }

    info!("label {} deleted by {}", id, user.id);
    Ok(flash::redirect(LABELS_URL, FlashMessage::success(LABEL_DELETED)))
}
