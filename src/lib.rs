//! # ghstats
//!
//! Periodic ingestion of the most-starred GitHub repositories and their
//! recent commit activity, plus a read API over the stored results.

pub mod config;
pub mod db;
pub mod error;
pub mod github;
pub mod handlers;
pub mod ingestion;
pub mod models;
pub mod repositories;
pub mod scheduler;
pub mod server;
pub mod telemetry;
pub use migration;
