use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

use crate::forms::{self, not_entirely_numeric};

lazy_static! {
    // Letters, digits and @/./+/-/_ only.
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[\w.@+-]+$").unwrap();
}

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

const COLUMNS: &str = "id, username, first_name, last_name, is_superuser, signup_date";

/// A registered account. The password hash never leaves the database layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
    /// Set once at signup.
    pub signup_date: DateTime<Utc>,
}

/// Signup form.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SignupInput {
    #[validate(
        length(min = 1, max = 50),
        regex(path = "USERNAME_REGEX", message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.")
    )]
    #[serde(deserialize_with = "forms::trimmed")]
    pub username: String,
    #[serde(deserialize_with = "forms::trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[serde(deserialize_with = "forms::trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(
        length(min = 8, message = "This password is too short. It must contain at least 8 characters."),
        custom = "not_entirely_numeric"
    )]
    pub password1: String,
    #[validate(must_match(other = "password1", message = "The two password fields didn't match."))]
    pub password2: String,
}

/// Profile change form.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UserUpdateInput {
    #[validate(
        length(min = 1, max = 50),
        regex(path = "USERNAME_REGEX", message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.")
    )]
    #[serde(deserialize_with = "forms::trimmed")]
    pub username: String,
    #[serde(deserialize_with = "forms::trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[serde(deserialize_with = "forms::trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// All users, newest signup first.
    pub async fn all(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY signup_date DESC, id DESC",
            COLUMNS
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    /// Whether `username` belongs to an account other than `except`.
    pub async fn username_taken(
        pool: &SqlitePool,
        username: &str,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(matches!(row, Some((id,)) if Some(id) != except))
    }

    /// Id and password hash for a login attempt.
    pub async fn credentials(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<(i64, String)>, sqlx::Error> {
        sqlx::query_as("SELECT id, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub async fn password_hash(pool: &SqlitePool, id: i64) -> Result<String, sqlx::Error> {
        let (hash,): (String,) = sqlx::query_as("SELECT password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(hash)
    }

    pub async fn create(
        pool: &SqlitePool,
        input: &SignupInput,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let id = sqlx::query(
            "INSERT INTO users (username, first_name, last_name, password_hash, is_superuser, signup_date) \
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(&input.username)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        input: &UserUpdateInput,
    ) -> Result<User, sqlx::Error> {
        sqlx::query("UPDATE users SET username = ?, first_name = ?, last_name = ? WHERE id = ?")
            .bind(&input.username)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(id)
            .execute(pool)
            .await?;
        Self::find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn set_password(
        pool: &SqlitePool,
        id: i64,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Number of tasks the user created or performs.
    pub async fn task_count(pool: &SqlitePool, id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE creator_id = ? OR performer_id = ?")
                .bind(id)
                .bind(id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
