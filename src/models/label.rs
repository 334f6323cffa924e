use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

use crate::forms;

/// A tag that can be attached to any number of tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Label {
    pub id: i64,
    pub name: String,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LabelInput {
    #[serde(deserialize_with = "forms::trimmed")]
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

impl Label {
    pub async fn all(pool: &SqlitePool) -> Result<Vec<Label>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            "SELECT id, name, created_on FROM labels ORDER BY created_on DESC, id DESC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Label>, sqlx::Error> {
        sqlx::query_as::<_, Label>("SELECT id, name, created_on FROM labels WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Labels attached to a task, in id order.
    pub async fn for_task(pool: &SqlitePool, task_id: i64) -> Result<Vec<Label>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            "SELECT l.id, l.name, l.created_on FROM labels l \
             JOIN task_labels tl ON tl.label_id = l.id \
             WHERE tl.task_id = ? ORDER BY l.id",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Which of `ids` do not name an existing label.
    pub async fn missing(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
        let mut missing = Vec::new();
        for &id in ids {
            if Self::find(pool, id).await?.is_none() {
                missing.push(id);
            }
        }
        Ok(missing)
    }

    pub async fn create(pool: &SqlitePool, input: &LabelInput) -> Result<Label, sqlx::Error> {
        let id = sqlx::query("INSERT INTO labels (name, created_on) VALUES (?, ?)")
            .bind(&input.name)
            .bind(Utc::now())
            .execute(pool)
            .await?
            .last_insert_rowid();
        Self::find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        input: &LabelInput,
    ) -> Result<Label, sqlx::Error> {
        sqlx::query("UPDATE labels SET name = ? WHERE id = ?")
            .bind(&input.name)
            .bind(id)
            .execute(pool)
            .await?;
        Self::find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Number of tasks carrying this label.
    pub async fn task_count(pool: &SqlitePool, id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM task_labels WHERE label_id = ?")
                .bind(id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM labels WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
