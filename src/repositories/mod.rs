//! # Repositories
//!
//! Read-side database access used by the HTTP handlers.

pub mod activity;
pub mod leaderboard;

pub use activity::ActivityRepository;
pub use leaderboard::{LeaderboardRepository, SortColumn, SortOrder};
