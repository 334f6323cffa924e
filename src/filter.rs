//! Task list filtering.
//!
//! The list page accepts `status`, `performer` and `label` ids plus the `self_tasks`
//! toggle. Every given predicate narrows the result; blank values are ignored. A value
//! that is not an id at all is dropped from the query and reported back as an invalid
//! choice.

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;

use crate::forms::{self, INVALID_CHOICE};
use crate::models::task::{TaskSummary, SUMMARY_SELECT};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFilter {
    pub status: Option<i64>,
    pub performer: Option<i64>,
    pub label: Option<i64>,
    /// Only tasks created by the current user.
    pub self_tasks: bool,
    #[serde(skip)]
    invalid: Vec<&'static str>,
}

impl TaskFilter {
    /// Reads the filter from query pairs. A repeated key keeps its last value.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut filter = TaskFilter::default();
        for (key, value) in pairs {
            let (field, slot) = match key.as_str() {
                "status" => ("status", &mut filter.status),
                "performer" => ("performer", &mut filter.performer),
                "label" => ("label", &mut filter.label),
                "self_tasks" => {
                    filter.self_tasks = matches!(value.trim(), "on" | "true" | "1");
                    continue;
                }
                _ => continue,
            };
            filter.invalid.retain(|f| *f != field);
            match forms::parse_choice(value) {
                Ok(id) => *slot = id,
                Err(_) => {
                    *slot = None;
                    filter.invalid.push(field);
                }
            }
        }
        filter
    }

    /// Messages for the values that were not ids and so were left out of the query.
    pub fn errors(&self) -> BTreeMap<&'static str, Vec<&'static str>> {
        self.invalid
            .iter()
            .map(|field| (*field, vec![INVALID_CHOICE]))
            .collect()
    }

    /// The list query for `current_user_id`, newest tasks first.
    pub fn query(&self, current_user_id: i64) -> QueryBuilder<'static, Sqlite> {
        let mut query = QueryBuilder::new(SUMMARY_SELECT);
        query.push(" WHERE 1 = 1");

        if let Some(status) = self.status {
            query.push(" AND t.status_id = ").push_bind(status);
        }
        if let Some(performer) = self.performer {
            query.push(" AND t.performer_id = ").push_bind(performer);
        }
        if let Some(label) = self.label {
            query
                .push(" AND EXISTS (SELECT 1 FROM task_labels tl WHERE tl.task_id = t.id AND tl.label_id = ")
                .push_bind(label)
                .push(")");
        }
        if self.self_tasks {
            query.push(" AND t.creator_id = ").push_bind(current_user_id);
        }

        query.push(" ORDER BY t.created_on DESC, t.id DESC");
        query
    }

    pub async fn apply(
        &self,
        pool: &SqlitePool,
        current_user_id: i64,
    ) -> Result<Vec<TaskSummary>, sqlx::Error> {
        let mut query = self.query(current_user_id);
        query
            .build_query_as::<TaskSummary>()
            .fetch_all(pool)
            .await
    }
}
