//! Redirect URL entity model
//!
//! Read-only view of the per-client redirect URL registry. An onboarding
//! scoped to a redirect URL must reference a row registered to the same
//! client.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Registered callback address for a client integration
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "redirect_urls")]
pub struct Model {
    /// Unique identifier for the redirect URL (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning client
    pub client_id: Uuid,

    /// The callback address itself
    pub url: String,

    /// Timestamp when the redirect URL was registered
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
