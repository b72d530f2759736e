//! # Onboarding Repository
//!
//! Repository for the three onboarding store partitions. Writers use either
//! the fine-grained idempotent upsert/delete (incremental event path) or
//! the coarse replace-all primitives, which the reconciler runs inside one
//! transaction. The repository is generic over [`ConnectionTrait`] so the
//! same operations work on the pool and on an open transaction.

use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::error::RepositoryError;
use crate::models::{
    ClientOnboarding, ClientScrapingOnboarding, GroupOnboarding, client_onboarding,
    client_scraping_onboarding, group_onboarding,
};
use crate::records::{
    ClientOnboardingKey, ClientScrapingOnboardingKey, GroupOnboardingKey, StoreKeys,
};

/// Repository for onboarding store operations
pub struct OnboardingRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> OnboardingRepository<'a, C> {
    /// Create a new OnboardingRepository over a pool or transaction
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Insert a group onboarding if its key is not present. Returns whether
    /// a row was actually inserted; re-adding an existing key is a no-op.
    pub async fn upsert_group(&self, key: &GroupOnboardingKey) -> Result<bool, RepositoryError> {
        let row = group_onboarding::ActiveModel {
            group_id: Set(key.group_id),
            provider: Set(key.provider.clone()),
            service_type: Set(key.service_type),
            created_at: Set(Utc::now().into()),
        };

        let inserted = GroupOnboarding::insert(row)
            .on_conflict(
                OnConflict::columns([
                    group_onboarding::Column::GroupId,
                    group_onboarding::Column::Provider,
                    group_onboarding::Column::ServiceType,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(inserted > 0)
    }

    /// Delete a group onboarding. Deleting an absent key is a silent no-op;
    /// the return value says whether a row existed.
    pub async fn delete_group(&self, key: &GroupOnboardingKey) -> Result<bool, RepositoryError> {
        let result = GroupOnboarding::delete_many()
            .filter(group_onboarding::Column::GroupId.eq(key.group_id))
            .filter(group_onboarding::Column::Provider.eq(key.provider.clone()))
            .filter(group_onboarding::Column::ServiceType.eq(key.service_type))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected > 0)
    }

    /// Insert a redirect-URL-scoped client onboarding if absent.
    pub async fn upsert_client(&self, key: &ClientOnboardingKey) -> Result<bool, RepositoryError> {
        let row = client_onboarding::ActiveModel {
            client_id: Set(key.client_id),
            redirect_url_id: Set(key.redirect_url_id),
            provider: Set(key.provider.clone()),
            service_type: Set(key.service_type),
            created_at: Set(Utc::now().into()),
        };

        let inserted = ClientOnboarding::insert(row)
            .on_conflict(
                OnConflict::columns([
                    client_onboarding::Column::ClientId,
                    client_onboarding::Column::RedirectUrlId,
                    client_onboarding::Column::Provider,
                    client_onboarding::Column::ServiceType,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(inserted > 0)
    }

    /// Delete a redirect-URL-scoped client onboarding.
    pub async fn delete_client(&self, key: &ClientOnboardingKey) -> Result<bool, RepositoryError> {
        let result = ClientOnboarding::delete_many()
            .filter(client_onboarding::Column::ClientId.eq(key.client_id))
            .filter(client_onboarding::Column::RedirectUrlId.eq(key.redirect_url_id))
            .filter(client_onboarding::Column::Provider.eq(key.provider.clone()))
            .filter(client_onboarding::Column::ServiceType.eq(key.service_type))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected > 0)
    }

    /// Insert a scraping onboarding if absent.
    pub async fn upsert_client_scraping(
        &self,
        key: &ClientScrapingOnboardingKey,
    ) -> Result<bool, RepositoryError> {
        let row = client_scraping_onboarding::ActiveModel {
            client_id: Set(key.client_id),
            provider: Set(key.provider.clone()),
            service_type: Set(key.service_type),
            created_at: Set(Utc::now().into()),
        };

        let inserted = ClientScrapingOnboarding::insert(row)
            .on_conflict(
                OnConflict::columns([
                    client_scraping_onboarding::Column::ClientId,
                    client_scraping_onboarding::Column::Provider,
                    client_scraping_onboarding::Column::ServiceType,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(inserted > 0)
    }

    /// Delete a scraping onboarding.
    pub async fn delete_client_scraping(
        &self,
        key: &ClientScrapingOnboardingKey,
    ) -> Result<bool, RepositoryError> {
        let result = ClientScrapingOnboarding::delete_many()
            .filter(client_scraping_onboarding::Column::ClientId.eq(key.client_id))
            .filter(client_scraping_onboarding::Column::Provider.eq(key.provider.clone()))
            .filter(client_scraping_onboarding::Column::ServiceType.eq(key.service_type))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected > 0)
    }

    /// Read the full key contents of all three partitions.
    pub async fn all_keys(&self) -> Result<StoreKeys, RepositoryError> {
        let group = GroupOnboarding::find()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(GroupOnboardingKey::from)
            .collect::<BTreeSet<_>>();

        let client = ClientOnboarding::find()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(ClientOnboardingKey::from)
            .collect::<BTreeSet<_>>();

        let client_scraping = ClientScrapingOnboarding::find()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(ClientScrapingOnboardingKey::from)
            .collect::<BTreeSet<_>>();

        Ok(StoreKeys {
            group,
            client,
            client_scraping,
        })
    }

    /// Delete every row of every partition. Returns the number of rows
    /// removed. Intended to run inside the reconciliation transaction.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let mut removed = 0;

        removed += GroupOnboarding::delete_many()
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .rows_affected;
        removed += ClientOnboarding::delete_many()
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .rows_affected;
        removed += ClientScrapingOnboarding::delete_many()
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .rows_affected;

        Ok(removed)
    }

    /// Bulk-insert group onboardings with a shared creation timestamp.
    pub async fn insert_groups(
        &self,
        keys: &BTreeSet<GroupOnboardingKey>,
        created_at: DateTimeWithTimeZone,
    ) -> Result<(), RepositoryError> {
        if keys.is_empty() {
            return Ok(());
        }

        let rows = keys.iter().map(|key| group_onboarding::ActiveModel {
            group_id: Set(key.group_id),
            provider: Set(key.provider.clone()),
            service_type: Set(key.service_type),
            created_at: Set(created_at),
        });

        GroupOnboarding::insert_many(rows)
            .exec_without_returning(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    /// Bulk-insert redirect-URL-scoped client onboardings.
    pub async fn insert_clients(
        &self,
        keys: &BTreeSet<ClientOnboardingKey>,
        created_at: DateTimeWithTimeZone,
    ) -> Result<(), RepositoryError> {
        if keys.is_empty() {
            return Ok(());
        }

        let rows = keys.iter().map(|key| client_onboarding::ActiveModel {
            client_id: Set(key.client_id),
            redirect_url_id: Set(key.redirect_url_id),
            provider: Set(key.provider.clone()),
            service_type: Set(key.service_type),
            created_at: Set(created_at),
        });

        ClientOnboarding::insert_many(rows)
            .exec_without_returning(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    /// Bulk-insert scraping onboardings.
    pub async fn insert_client_scrapings(
        &self,
        keys: &BTreeSet<ClientScrapingOnboardingKey>,
        created_at: DateTimeWithTimeZone,
    ) -> Result<(), RepositoryError> {
        if keys.is_empty() {
            return Ok(());
        }

        let rows = keys
            .iter()
            .map(|key| client_scraping_onboarding::ActiveModel {
                client_id: Set(key.client_id),
                provider: Set(key.provider.clone()),
                service_type: Set(key.service_type),
                created_at: Set(created_at),
            });

        ClientScrapingOnboarding::insert_many(rows)
            .exec_without_returning(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }
}
