//! Migration to create the top100 table.
//!
//! This migration creates the leaderboard table keyed by repository full name,
//! holding the current and previous rank of each repository.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Top100::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Top100::Repo).text().not_null().primary_key())
                    .col(ColumnDef::new(Top100::Owner).text().not_null())
                    .col(ColumnDef::new(Top100::PositionCur).integer().not_null())
                    .col(ColumnDef::new(Top100::PositionPrev).integer().null())
                    .col(ColumnDef::new(Top100::Stars).integer().not_null().default(0))
                    .col(ColumnDef::new(Top100::Watchers).integer().not_null().default(0))
                    .col(ColumnDef::new(Top100::Forks).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Top100::OpenIssues)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Top100::Language).text().null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Top100::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Top100 {
    #[sea_orm(iden = "top100")]
    Table,
    Repo,
    Owner,
    PositionCur,
    PositionPrev,
    Stars,
    Watchers,
    Forks,
    OpenIssues,
    Language,
}
