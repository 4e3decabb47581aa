//! Activity read queries.

use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};

use crate::models::activity::{self, Entity as Activity};

/// Repository for activity reads
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ActivityRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Rows for `repo` with `start <= date <= end`, oldest first.
    pub async fn list_for_repo_between(
        &self,
        repo: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<activity::Model>, DbErr> {
        Activity::find()
            .filter(activity::Column::Repo.eq(repo))
            .filter(activity::Column::Date.between(start, end))
            .order_by_asc(activity::Column::Date)
            .all(&*self.db)
            .await
    }
}
