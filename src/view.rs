//! # Unified Onboarding View
//!
//! Read-only query facade over the three store partitions, producing the
//! unified [`OnboardingFact`] shape for downstream consumers. Group rows
//! are never expanded into per-client facts here; the group-membership join
//! belongs to the caller.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{
    ClientOnboarding, ClientScrapingOnboarding, GroupOnboarding, client_onboarding,
    client_scraping_onboarding,
};
use crate::records::OnboardingFact;

/// Read facade over the onboarding store
pub struct OnboardingView<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> OnboardingView<'a, C> {
    /// Create a new view over a pool or transaction
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Union of all three partitions.
    pub async fn all(&self) -> Result<Vec<OnboardingFact>, RepositoryError> {
        let mut facts: Vec<OnboardingFact> = GroupOnboarding::find()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(OnboardingFact::from)
            .collect();

        facts.extend(
            ClientOnboarding::find()
                .all(self.db)
                .await
                .map_err(RepositoryError::database_error)?
                .into_iter()
                .map(OnboardingFact::from),
        );

        facts.extend(
            ClientScrapingOnboarding::find()
                .all(self.db)
                .await
                .map_err(RepositoryError::database_error)?
                .into_iter()
                .map(OnboardingFact::from),
        );

        Ok(facts)
    }

    /// Facts for one literal client id: redirect-URL-scoped and scraping
    /// rows only, no group inheritance.
    pub async fn for_client(&self, client_id: Uuid) -> Result<Vec<OnboardingFact>, RepositoryError> {
        let mut facts: Vec<OnboardingFact> = ClientOnboarding::find()
            .filter(client_onboarding::Column::ClientId.eq(client_id))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(OnboardingFact::from)
            .collect();

        facts.extend(
            ClientScrapingOnboarding::find()
                .filter(client_scraping_onboarding::Column::ClientId.eq(client_id))
                .all(self.db)
                .await
                .map_err(RepositoryError::database_error)?
                .into_iter()
                .map(OnboardingFact::from),
        );

        Ok(facts)
    }

    /// Facts for one client filtered by provider code.
    pub async fn for_client_and_provider(
        &self,
        client_id: Uuid,
        provider: &str,
    ) -> Result<Vec<OnboardingFact>, RepositoryError> {
        let mut facts: Vec<OnboardingFact> = ClientOnboarding::find()
            .filter(client_onboarding::Column::ClientId.eq(client_id))
            .filter(client_onboarding::Column::Provider.eq(provider))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(OnboardingFact::from)
            .collect();

        facts.extend(
            ClientScrapingOnboarding::find()
                .filter(client_scraping_onboarding::Column::ClientId.eq(client_id))
                .filter(client_scraping_onboarding::Column::Provider.eq(provider))
                .all(self.db)
                .await
                .map_err(RepositoryError::database_error)?
                .into_iter()
                .map(OnboardingFact::from),
        );

        Ok(facts)
    }
}
