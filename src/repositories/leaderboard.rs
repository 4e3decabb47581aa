//! Leaderboard read queries over `top100`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Order, QueryOrder, QuerySelect};

use crate::models::top_repository::{self, Entity as TopRepository};

/// Upper bound on rows returned by a leaderboard query.
pub const LEADERBOARD_LIMIT: u64 = 100;

/// Columns the leaderboard may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Stars,
    Watchers,
    Forks,
    OpenIssues,
    Language,
}

impl SortColumn {
    pub const ALLOWED: [&'static str; 5] = ["stars", "watchers", "forks", "open_issues", "language"];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Stars => "stars",
            SortColumn::Watchers => "watchers",
            SortColumn::Forks => "forks",
            SortColumn::OpenIssues => "open_issues",
            SortColumn::Language => "language",
        }
    }

    fn column(&self) -> top_repository::Column {
        match self {
            SortColumn::Stars => top_repository::Column::Stars,
            SortColumn::Watchers => top_repository::Column::Watchers,
            SortColumn::Forks => top_repository::Column::Forks,
            SortColumn::OpenIssues => top_repository::Column::OpenIssues,
            SortColumn::Language => top_repository::Column::Language,
        }
    }
}

impl FromStr for SortColumn {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stars" => Ok(SortColumn::Stars),
            "watchers" => Ok(SortColumn::Watchers),
            "forks" => Ok(SortColumn::Forks),
            "open_issues" => Ok(SortColumn::OpenIssues),
            "language" => Ok(SortColumn::Language),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub const ALLOWED: [&'static str; 2] = ["asc", "desc"];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    fn order(&self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

/// Repository for leaderboard reads
#[derive(Debug, Clone)]
pub struct LeaderboardRepository {
    pub db: Arc<DatabaseConnection>,
}

impl LeaderboardRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Up to [`LEADERBOARD_LIMIT`] rows sorted by `column`, ties broken by current rank.
    pub async fn list_sorted(
        &self,
        column: SortColumn,
        order: SortOrder,
    ) -> Result<Vec<top_repository::Model>, DbErr> {
        TopRepository::find()
            .order_by(column.column(), order.order())
            .order_by_asc(top_repository::Column::PositionCur)
            .limit(LEADERBOARD_LIMIT)
            .all(&*self.db)
            .await
    }
}
