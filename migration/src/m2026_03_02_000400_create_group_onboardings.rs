//! Migration to create the group_onboardings table.
//!
//! A row authorizes one provider/service-type for every client in a group.
//! The full attribute tuple is the primary key; there is no surrogate id.

use sea_orm_migration::prelude::*;

use crate::m2026_03_02_000200_create_client_groups::ClientGroups;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GroupOnboardings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GroupOnboardings::GroupId).uuid().not_null())
                    .col(ColumnDef::new(GroupOnboardings::Provider).text().not_null())
                    .col(
                        ColumnDef::new(GroupOnboardings::ServiceType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupOnboardings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(GroupOnboardings::GroupId)
                            .col(GroupOnboardings::Provider)
                            .col(GroupOnboardings::ServiceType),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_onboardings_group")
                            .from(GroupOnboardings::Table, GroupOnboardings::GroupId)
                            .to(ClientGroups::Table, ClientGroups::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupOnboardings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GroupOnboardings {
    Table,
    GroupId,
    Provider,
    ServiceType,
    CreatedAt,
}
