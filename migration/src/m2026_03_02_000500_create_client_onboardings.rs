//! Migration to create the client_onboardings table.
//!
//! A row authorizes one provider/service-type for a single client, scoped
//! to one registered redirect URL. The composite foreign key on
//! (client_id, redirect_url_id) guarantees the redirect URL belongs to the
//! onboarded client.

use sea_orm_migration::prelude::*;

use crate::m2026_03_02_000300_create_redirect_urls::RedirectUrls;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClientOnboardings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ClientOnboardings::ClientId).uuid().not_null())
                    .col(
                        ColumnDef::new(ClientOnboardings::RedirectUrlId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClientOnboardings::Provider)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClientOnboardings::ServiceType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClientOnboardings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(ClientOnboardings::ClientId)
                            .col(ClientOnboardings::RedirectUrlId)
                            .col(ClientOnboardings::Provider)
                            .col(ClientOnboardings::ServiceType),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_client_onboardings_redirect_url")
                            .from(
                                ClientOnboardings::Table,
                                (
                                    ClientOnboardings::ClientId,
                                    ClientOnboardings::RedirectUrlId,
                                ),
                            )
                            .to(
                                RedirectUrls::Table,
                                (RedirectUrls::ClientId, RedirectUrls::Id),
                            ),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_client_onboardings_client")
                    .table(ClientOnboardings::Table)
                    .col(ClientOnboardings::ClientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClientOnboardings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClientOnboardings {
    Table,
    ClientId,
    RedirectUrlId,
    Provider,
    ServiceType,
    CreatedAt,
}
