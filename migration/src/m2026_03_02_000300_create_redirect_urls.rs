//! Migration to create the redirect_urls table.
//!
//! Redirect URLs are registered per client by the endpoint registry; the
//! unique (client_id, id) index backs the composite foreign key from
//! client_onboardings so an onboarding can only reference a redirect URL
//! owned by the same client.

use sea_orm_migration::prelude::*;

use crate::m2026_03_02_000100_create_clients::Clients;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RedirectUrls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RedirectUrls::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RedirectUrls::ClientId).uuid().not_null())
                    .col(ColumnDef::new(RedirectUrls::Url).text().not_null())
                    .col(
                        ColumnDef::new(RedirectUrls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_redirect_urls_client")
                            .from(RedirectUrls::Table, RedirectUrls::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_redirect_urls_client_id_id")
                    .table(RedirectUrls::Table)
                    .col(RedirectUrls::ClientId)
                    .col(RedirectUrls::Id)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RedirectUrls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum RedirectUrls {
    Table,
    Id,
    ClientId,
    Url,
    CreatedAt,
}
