use crate::{
    auth::CurrentUser,
    error::AppError,
    filter::TaskFilter,
    flash::{self, FlashMessage, Messages},
    forms,
    models::{Label, Status, Task, TaskData, TaskInput, User},
};
use actix_web::{get, post, web, HttpResponse};
use log::{info, warn};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;

pub const TASKS_URL: &str = "/tasks/";

pub const TASK_CREATED: &str = "Task created successfully";
pub const TASK_UPDATED: &str = "Task updated successfully";
pub const TASK_DELETED: &str = "Task deleted successfully";
pub const NOT_CREATOR: &str = "You cannot delete the task created by other user";

/// Options offered by the task form and the filter form.
#[derive(Debug, Serialize)]
struct Choices {
    statuses: Vec<Status>,
    performers: Vec<User>,
    labels: Vec<Label>,
}

impl Choices {
    async fn load(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        Ok(Choices {
            statuses: Status::all(pool).await?,
            performers: User::all(pool).await?,
            labels: Label::all(pool).await?,
        })
    }
}

async fn find_task(pool: &SqlitePool, id: i64) -> Result<Task, AppError> {
    Task::find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))
}

/// Field validation, then existence of every chosen row.
async fn validate_form(
    pool: &SqlitePool,
    pairs: &[(String, String)],
) -> Result<TaskData, AppError> {
    let data = TaskInput::from_pairs(pairs).validated()?;
    forms::finish(data.invalid_choices(pool).await?)?;
    Ok(data)
}

/// Only the creator or a superuser may delete a task.
fn ensure_may_delete(user: &CurrentUser, task: &Task) -> Result<(), AppError> {
    if user.may_manage(task.creator_id) {
        Ok(())
    } else {
        warn!("user {} may not delete task {}", user.id, task.id);
        Err(AppError::denied(NOT_CREATOR, TASKS_URL))
    }
}

/// Retrieves the task list.
///
/// ## Query Parameters:
/// - `status` (optional): id of the status tasks must be in.
/// - `performer` (optional): id of the user tasks must be assigned to.
/// - `label` (optional): id of a label tasks must carry.
/// - `self_tasks` (optional): `on` to keep only tasks created by the current user.
///
/// Blank parameters are ignored. Tasks are ordered newest first.
#[get("/")]
pub async fn list(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    query: web::Query<Vec<(String, String)>>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let filter = TaskFilter::from_pairs(&query);
    let tasks = filter.apply(&**pool, user.id).await?;
    let choices = Choices::load(&**pool).await?;

    Ok(messages.render(json!({
        "page": "tasks",
        "user": user,
        "filter": filter,
        "filter_errors": filter.errors(),
        "choices": choices,
        "tasks": tasks,
    })))
}

#[get("/create/")]
pub async fn create_page(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let choices = Choices::load(&**pool).await?;
    Ok(messages.render(json!({
        "page": "task_create",
        "user": user,
        "choices": choices,
    })))
}

/// Creates a new task.
///
/// Form fields: `name`, `description`, `status`, `performer` and any number of
/// `labels`. The creator is the current user.
#[post("/create/")]
pub async fn create(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse, AppError> {
    let data = validate_form(&pool, &form).await?;
    let task = Task::create(&**pool, &data, user.id).await?;

    info!("task {} created by {}", task.id, user.id);
    Ok(flash::redirect(TASKS_URL, FlashMessage::success(TASK_CREATED)))
}

/// Retrieves one task with the names of its status, creator, performer and labels.
#[get("/{id}/")]
pub async fn detail(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let task = Task::detail(&**pool, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    Ok(messages.render(json!({
        "page": "task_detail",
        "user": user,
        "task": task,
    })))
}

#[get("/{id}/update/")]
pub async fn update_page(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let task = find_task(&pool, id).await?;
    let label_ids = Task::label_ids(&**pool, id).await?;
    let choices = Choices::load(&**pool).await?;

    Ok(messages.render(json!({
        "page": "task_update",
        "user": user,
        "object": task,
        "label_ids": label_ids,
        "choices": choices,
    })))
}

/// Updates a task. Any logged-in user may; the creator never changes.
#[post("/{id}/update/")]
pub async fn update(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    find_task(&pool, id).await?;
    let data = validate_form(&pool, &form).await?;
    Task::update(&**pool, id, &data).await?;

    info!("task {} updated by {}", id, user.id);
    Ok(flash::redirect(TASKS_URL, FlashMessage::success(TASK_UPDATED)))
}

#[get("/{id}/delete/")]
pub async fn delete_page(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
    messages: Messages,
) -> Result<HttpResponse, AppError> {
    let task = find_task(&pool, path.into_inner()).await?;
    ensure_may_delete(&user, &task)?;

    Ok(messages.render(json!({
        "page": "task_delete",
        "user": user,
        "object": task,
    })))
}

/// Deletes a task. Creator or superuser only.
#[post("/{id}/delete/")]
pub async fn delete(
    pool: web::Data<SqlitePool>,
    user: CurrentUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let task = find_task(&pool, path.into_inner()).await?;
    ensure_may_delete(&user, &task)?;
    Task::delete(&**pool, task.id).await?;

    info!("task {} deleted by {}", task.id, user.id);
    Ok(flash::redirect(TASKS_URL, FlashMessage::success(TASK_DELETED)))
}
