//! Group onboarding entity model
//!
//! A row authorizes a provider for every client in a group. The full
//! attribute tuple is the primary key; `created_at` is set at first insert
//! and is not part of the identity.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::service_type::ServiceType;

/// Group-level onboarding record
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "group_onboardings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub provider: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub service_type: ServiceType,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
