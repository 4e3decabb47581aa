//! Database migrations for the ghstats service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_090000_create_top100;
mod m2025_01_10_090100_create_activity;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_090000_create_top100::Migration),
            Box::new(m2025_01_10_090100_create_activity::Migration),
        ]
    }
}
