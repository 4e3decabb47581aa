//! Migration to create the activity table.
//!
//! One row per repository and calendar day with the commit count and the
//! distinct commit authors of that day. `authors` is `text[]` on Postgres;
//! SQLite has no array type and stores the names as JSON text.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DbBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut authors = ColumnDef::new(Activity::Authors);
        match manager.get_database_backend() {
            DbBackend::Postgres => authors.array(ColumnType::Text),
            _ => authors.text(),
        };

        manager
            .create_table(
                Table::create()
                    .table(Activity::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Activity::Repo).text().not_null())
                    .col(ColumnDef::new(Activity::Date).date().not_null())
                    .col(ColumnDef::new(Activity::Commits).integer().not_null())
                    .col(authors.not_null())
                    .primary_key(Index::create().col(Activity::Repo).col(Activity::Date))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activity::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Activity {
    Table,
    Repo,
    Date,
    Commits,
    Authors,
}
