//! Migration to create the client_scraping_onboardings table.
//!
//! Scraping providers have no redirect-URL concept, so their onboardings
//! are client-scoped only.

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
                    .table(ClientScrapingOnboardings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClientScrapingOnboardings::ClientId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClientScrapingOnboardings::Provider)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClientScrapingOnboardings::ServiceType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClientScrapingOnboardings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(ClientScrapingOnboardings::ClientId)
                            .col(ClientScrapingOnboardings::Provider)
                            .col(ClientScrapingOnboardings::ServiceType),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_client_scraping_onboardings_client")
                            .from(
                                ClientScrapingOnboardings::Table,
                                ClientScrapingOnboardings::ClientId,
                            )
                            .to(Clients::Table, Clients::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ClientScrapingOnboardings::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum ClientScrapingOnboardings {
    Table,
    ClientId,
    Provider,
    ServiceType,
    CreatedAt,
}
