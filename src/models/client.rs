//! Client entity model
//!
//! Read-only view of the platform client registry. This service never
//! writes clients; rows are consulted for reference validation only.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Client (tenant) entity owned by the platform registry
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    /// Unique identifier for the client (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name for the client (optional)
    pub name: Option<String>,

    /// Soft-delete marker; deleted clients fail onboarding validation
    pub deleted_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the client was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
