use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

use crate::forms;

/// A named workflow state assignable to tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Status {
    pub id: i64,
    pub name: String,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct StatusInput {
    #[serde(deserialize_with = "forms::trimmed")]
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

impl Status {
    /// All statuses, newest first.
    pub async fn all(pool: &SqlitePool) -> Result<Vec<Status>, sqlx::Error> {
        sqlx::query_as::<_, Status>(
            "SELECT id, name, created_on FROM statuses ORDER BY created_on DESC, id DESC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Status>, sqlx::Error> {
        sqlx::query_as::<_, Status>("SELECT id, name, created_on FROM statuses WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, input: &StatusInput) -> Result<Status, sqlx::Error> {
        let id = sqlx::query("INSERT INTO statuses (name, created_on) VALUES (?, ?)")
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
        input: &StatusInput,
    ) -> Result<Status, sqlx::Error> {
        sqlx::query("UPDATE statuses SET name = ? WHERE id = ?")
            .bind(&input.name)
            .bind(id)
            .execute(pool)
            .await?;
        Self::find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Number of tasks currently in this status.
    pub async fn task_count(pool: &SqlitePool, id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE status_id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM statuses WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
