//! # Data Models
//!
//! This module contains all the data models used throughout the Provider
//! Onboarding service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod client;
pub mod client_group;
pub mod client_onboarding;
pub mod client_scraping_onboarding;
pub mod group_onboarding;
pub mod redirect_url;
pub mod service_type;

pub use client::Entity as Client;
pub use client_group::Entity as ClientGroup;
pub use client_onboarding::Entity as ClientOnboarding;
pub use client_scraping_onboarding::Entity as ClientScrapingOnboarding;
pub use group_onboarding::Entity as GroupOnboarding;
pub use redirect_url::Entity as RedirectUrl;
pub use service_type::ServiceType;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "provider-onboarding".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
