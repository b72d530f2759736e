//! Migration to create the client_groups table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClientGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClientGroups::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClientGroups::Name).text().not_null())
                    .col(
                        ColumnDef::new(ClientGroups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClientGroups::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum ClientGroups {
    Table,
    Id,
    Name,
    CreatedAt,
}
