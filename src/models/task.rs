use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use validator::{Validate, ValidationErrors};

use crate::forms::{self, INVALID_CHOICE};
use crate::models::{Label, Status, User};

/// A stored task row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub creator_id: i64,
    pub performer_id: i64,
    pub status_id: i64,
    /// Set once on creation.
    pub created_on: DateTime<Utc>,
}

/// A task joined with the names of its status, creator and performer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TaskSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status_id: i64,
    pub status_name: String,
    pub creator_id: i64,
    pub creator_username: String,
    pub performer_id: i64,
    pub performer_username: String,
    pub created_on: DateTime<Utc>,
}

/// Everything the detail page shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: TaskSummary,
    pub labels: Vec<Label>,
}

/// Base of every summary query; callers append `WHERE`/`ORDER BY`.
pub const SUMMARY_SELECT: &str = "SELECT t.id, t.name, t.description, \
    t.status_id, s.name AS status_name, \
    t.creator_id, c.username AS creator_username, \
    t.performer_id, p.username AS performer_username, \
    t.created_on \
    FROM tasks t \
    JOIN statuses s ON s.id = t.status_id \
    JOIN users c ON c.id = t.creator_id \
    JOIN users p ON p.id = t.performer_id";

const COLUMNS: &str = "id, name, description, creator_id, performer_id, status_id, created_on";

/// Task form as submitted. Built from raw form pairs because `labels` repeats.
#[derive(Debug, Default, Validate)]
pub struct TaskInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[validate(required)]
    pub status: Option<i64>,
    #[validate(required)]
    pub performer: Option<i64>,
    pub labels: Vec<i64>,
    // Fields whose submitted value was not an id at all.
    invalid: Vec<&'static str>,
}

/// A task form that passed field validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskData {
    pub name: String,
    pub description: String,
    pub status_id: i64,
    pub performer_id: i64,
    pub label_ids: Vec<i64>,
}

impl TaskInput {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut input = TaskInput::default();
        for (key, value) in pairs {
            match key.as_str() {
                "name" => input.name = value.trim().to_string(),
                "description" => input.description = value.trim().to_string(),
                "status" => input.status = input.choice("status", value),
                "performer" => input.performer = input.choice("performer", value),
                "labels" => {
                    if let Some(id) = input.choice("labels", value) {
                        if !input.labels.contains(&id) {
                            input.labels.push(id);
                        }
                    }
                }
                _ => {}
            }
        }
        input
    }

    fn choice(&mut self, field: &'static str, raw: &str) -> Option<i64> {
        match forms::parse_choice(raw) {
            Ok(id) => id,
            Err(_) => {
                if !self.invalid.contains(&field) {
                    self.invalid.push(field);
                }
                None
            }
        }
    }

    /// Runs field validation. A field holding a non-numeric choice reports only
    /// the invalid choice, not an additional "required".
    pub fn validated(self) -> Result<TaskData, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(found) = self.validate() {
            for (field, field_errors) in found.field_errors() {
                if self.invalid.contains(&field) {
                    continue;
                }
                for error in field_errors {
                    errors.add(field, error.clone());
                }
            }
        }
        for &field in &self.invalid {
            errors.add(field, forms::field_error("invalid_choice", INVALID_CHOICE));
        }

        match (self.status, self.performer) {
            (Some(status_id), Some(performer_id)) if errors.is_empty() => Ok(TaskData {
                name: self.name,
                description: self.description,
                status_id,
                performer_id,
                label_ids: self.labels,
            }),
            _ => Err(errors),
        }
    }
}

impl TaskData {
    /// Errors for chosen ids that name no existing row.
    pub async fn invalid_choices(&self, pool: &SqlitePool) -> Result<ValidationErrors, sqlx::Error> {
        let mut errors = ValidationErrors::new();
        if Status::find(pool, self.status_id).await?.is_none() {
            errors.add("status", forms::field_error("invalid_choice", INVALID_CHOICE));
        }
        if !User::exists(pool, self.performer_id).await? {
            errors.add("performer", forms::field_error("invalid_choice", INVALID_CHOICE));
        }
        if !Label::missing(pool, &self.label_ids).await?.is_empty() {
            errors.add("labels", forms::field_error("invalid_choice", INVALID_CHOICE));
        }
        Ok(errors)
    }
}

impl Task {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn detail(pool: &SqlitePool, id: i64) -> Result<Option<TaskDetail>, sqlx::Error> {
        let task = sqlx::query_as::<_, TaskSummary>(&format!("{} WHERE t.id = ?", SUMMARY_SELECT))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        match task {
            Some(task) => {
                let labels = Label::for_task(pool, id).await?;
                Ok(Some(TaskDetail { task, labels }))
            }
            None => Ok(None),
        }
    }

    pub async fn label_ids(pool: &SqlitePool, id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT label_id FROM task_labels WHERE task_id = ? ORDER BY label_id")
                .bind(id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Inserts the task and its labels atomically.
    pub async fn create(
        pool: &SqlitePool,
        data: &TaskData,
        creator_id: i64,
    ) -> Result<Task, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let id = sqlx::query(
            "INSERT INTO tasks (name, description, creator_id, performer_id, status_id, created_on) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(creator_id)
        .bind(data.performer_id)
        .bind(data.status_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        replace_labels(&mut tx, id, &data.label_ids).await?;
        tx.commit().await?;

        Self::find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Rewrites the editable fields and the label set. Creator and creation time stay.
    pub async fn update(pool: &SqlitePool, id: i64, data: &TaskData) -> Result<Task, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE tasks SET name = ?, description = ?, performer_id = ?, status_id = ? WHERE id = ?",
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.performer_id)
        .bind(data.status_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        replace_labels(&mut tx, id, &data.label_ids).await?;
        tx.commit().await?;

        Self::find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn replace_labels(
    tx: &mut Transaction<'_, Sqlite>,
    task_id: i64,
    label_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM task_labels WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut **tx)
        .await?;
    for label_id in label_ids {
        sqlx::query("INSERT INTO task_labels (task_id, label_id) VALUES (?, ?)")
            .bind(task_id)
            .bind(label_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
