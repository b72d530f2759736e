//! Client scraping onboarding entity model
//!
//! Scraping providers have no redirect-URL concept, so these rows are
//! client-scoped only.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::service_type::ServiceType;

/// Client-scoped onboarding record for scraping providers
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "client_scraping_onboardings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub client_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub provider: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub service_type: ServiceType,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
