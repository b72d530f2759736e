//! # Reference Repository
//!
//! Loads point-in-time snapshots of the externally-owned reference
//! registries (clients, client groups, redirect URLs). One load per
//! reconciliation run, so every record in a run is judged against the same
//! reference state.

use std::collections::HashSet;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{Client, ClientGroup, RedirectUrl, client, client_group, redirect_url};

/// Point-in-time membership sets for reference validation.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSets {
    /// Ids of existing, non-deleted clients.
    pub client_ids: HashSet<Uuid>,
    /// Ids of existing client groups.
    pub group_ids: HashSet<Uuid>,
    /// Registered (client_id, redirect_url_id) pairs.
    pub redirect_urls: HashSet<(Uuid, Uuid)>,
}

impl ReferenceSets {
    pub fn knows_client(&self, client_id: Uuid) -> bool {
        self.client_ids.contains(&client_id)
    }

    pub fn knows_group(&self, group_id: Uuid) -> bool {
        self.group_ids.contains(&group_id)
    }

    pub fn knows_redirect_url(&self, client_id: Uuid, redirect_url_id: Uuid) -> bool {
        self.redirect_urls.contains(&(client_id, redirect_url_id))
    }
}

/// Repository over the read-only reference registries
pub struct ReferenceRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ReferenceRepository<'a, C> {
    /// Create a new ReferenceRepository with the given connection
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Load the membership sets in one pass. Soft-deleted clients are
    /// excluded; their onboardings must not survive validation.
    pub async fn load_sets(&self) -> Result<ReferenceSets, RepositoryError> {
        let client_ids = Client::find()
            .select_only()
            .column(client::Column::Id)
            .filter(client::Column::DeletedAt.is_null())
            .into_tuple::<Uuid>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .collect::<HashSet<_>>();

        let group_ids = ClientGroup::find()
            .select_only()
            .column(client_group::Column::Id)
            .into_tuple::<Uuid>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .collect::<HashSet<_>>();

        let redirect_urls = RedirectUrl::find()
            .select_only()
            .column(redirect_url::Column::ClientId)
            .column(redirect_url::Column::Id)
            .into_tuple::<(Uuid, Uuid)>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .collect::<HashSet<_>>();

        Ok(ReferenceSets {
            client_ids,
            group_ids,
            redirect_urls,
        })
    }
}
