//! Database migrations for the Provider Onboarding service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_03_02_000100_create_clients;
mod m2026_03_02_000200_create_client_groups;
mod m2026_03_02_000300_create_redirect_urls;
mod m2026_03_02_000400_create_group_onboardings;
mod m2026_03_02_000500_create_client_onboardings;
mod m2026_03_02_000600_create_client_scraping_onboardings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_03_02_000100_create_clients::Migration),
            Box::new(m2026_03_02_000200_create_client_groups::Migration),
            Box::new(m2026_03_02_000300_create_redirect_urls::Migration),
            Box::new(m2026_03_02_000400_create_group_onboardings::Migration),
            Box::new(m2026_03_02_000500_create_client_onboardings::Migration),
            Box::new(m2026_03_02_000600_create_client_scraping_onboardings::Migration),
        ]
    }
}
