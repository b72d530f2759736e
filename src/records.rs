//! Domain record shapes for onboarding facts.
//!
//! Wire payloads arrive as one flat DTO with nullable group/client/redirect
//! URL identifiers. The flat shape is converted into the
//! [`OnboardingRecord`] tagged union exactly once at the ingestion boundary
//! (event parsing, snapshot partitioning); everything downstream works with
//! the explicit variant instead of re-checking nullability.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::service_type::ServiceType;
use crate::models::{client_onboarding, client_scraping_onboarding, group_onboarding};

/// Flat record shape shared by the upstream snapshot contract and the
/// incremental event payload. The redirect URL travels as `endpointId` on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlatOnboardingRecord {
    pub group_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    #[serde(rename = "endpointId")]
    pub redirect_url_id: Option<Uuid>,
    pub provider: String,
    pub service_type: ServiceType,
}

/// Identity of a group-level onboarding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupOnboardingKey {
    pub group_id: Uuid,
    pub provider: String,
    pub service_type: ServiceType,
}

/// Identity of a redirect-URL-scoped client onboarding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClientOnboardingKey {
    pub client_id: Uuid,
    pub redirect_url_id: Uuid,
    pub provider: String,
    pub service_type: ServiceType,
}

/// Identity of a client-scoped scraping onboarding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClientScrapingOnboardingKey {
    pub client_id: Uuid,
    pub provider: String,
    pub service_type: ServiceType,
}

impl From<group_onboarding::Model> for GroupOnboardingKey {
    fn from(model: group_onboarding::Model) -> Self {
        Self {
            group_id: model.group_id,
            provider: model.provider,
            service_type: model.service_type,
        }
    }
}

impl From<client_onboarding::Model> for ClientOnboardingKey {
    fn from(model: client_onboarding::Model) -> Self {
        Self {
            client_id: model.client_id,
            redirect_url_id: model.redirect_url_id,
            provider: model.provider,
            service_type: model.service_type,
        }
    }
}

impl From<client_scraping_onboarding::Model> for ClientScrapingOnboardingKey {
    fn from(model: client_scraping_onboarding::Model) -> Self {
        Self {
            client_id: model.client_id,
            provider: model.provider,
            service_type: model.service_type,
        }
    }
}

/// Tagged union over the three onboarding variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OnboardingRecord {
    Group(GroupOnboardingKey),
    ClientRedirectUrl(ClientOnboardingKey),
    ClientScraping(ClientScrapingOnboardingKey),
}

/// A flat record carrying neither a group id nor a client id cannot be
/// assigned to any variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record has neither group nor client id (provider {provider}, service type {service_type})")]
pub struct UnclassifiableRecord {
    pub provider: String,
    pub service_type: ServiceType,
}

impl OnboardingRecord {
    /// Partition rule for flat records: a group id wins, then a redirect
    /// URL id, otherwise the record is client-scoped scraping.
    pub fn from_flat(flat: FlatOnboardingRecord) -> Result<Self, UnclassifiableRecord> {
        if let Some(group_id) = flat.group_id {
            return Ok(OnboardingRecord::Group(GroupOnboardingKey {
                group_id,
                provider: flat.provider,
                service_type: flat.service_type,
            }));
        }

        let Some(client_id) = flat.client_id else {
            return Err(UnclassifiableRecord {
                provider: flat.provider,
                service_type: flat.service_type,
            });
        };

        match flat.redirect_url_id {
            Some(redirect_url_id) => Ok(OnboardingRecord::ClientRedirectUrl(ClientOnboardingKey {
                client_id,
                redirect_url_id,
                provider: flat.provider,
                service_type: flat.service_type,
            })),
            None => Ok(OnboardingRecord::ClientScraping(ClientScrapingOnboardingKey {
                client_id,
                provider: flat.provider,
                service_type: flat.service_type,
            })),
        }
    }

    /// Subject identifier used to route events to a consumer partition so
    /// changes for one group/client stay ordered.
    pub fn partition_key(&self) -> Uuid {
        match self {
            OnboardingRecord::Group(key) => key.group_id,
            OnboardingRecord::ClientRedirectUrl(key) => key.client_id,
            OnboardingRecord::ClientScraping(key) => key.client_id,
        }
    }
}

/// Unified read-model record produced by the onboarding view. Group rows
/// are not expanded into per-client facts; the group-membership join is the
/// caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OnboardingFact {
    /// Set for client-scoped rows; `None` for group-level rows.
    pub client_id: Option<Uuid>,
    /// Set for group-level rows only.
    pub group_id: Option<Uuid>,
    pub provider: String,
    pub service_type: ServiceType,
    /// Set only for redirect-URL-scoped client rows; absence means the
    /// onboarding is not endpoint-restricted.
    pub redirect_url_id: Option<Uuid>,
}

impl From<group_onboarding::Model> for OnboardingFact {
    fn from(model: group_onboarding::Model) -> Self {
        Self {
            client_id: None,
            group_id: Some(model.group_id),
            provider: model.provider,
            service_type: model.service_type,
            redirect_url_id: None,
        }
    }
}

impl From<client_onboarding::Model> for OnboardingFact {
    fn from(model: client_onboarding::Model) -> Self {
        Self {
            client_id: Some(model.client_id),
            group_id: None,
            provider: model.provider,
            service_type: model.service_type,
            redirect_url_id: Some(model.redirect_url_id),
        }
    }
}

impl From<client_scraping_onboarding::Model> for OnboardingFact {
    fn from(model: client_scraping_onboarding::Model) -> Self {
        Self {
            client_id: Some(model.client_id),
            group_id: None,
            provider: model.provider,
            service_type: model.service_type,
            redirect_url_id: None,
        }
    }
}

/// Full key contents of the three store partitions at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreKeys {
    pub group: BTreeSet<GroupOnboardingKey>,
    pub client: BTreeSet<ClientOnboardingKey>,
    pub client_scraping: BTreeSet<ClientScrapingOnboardingKey>,
}

/// Removed/added key pairs for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantDiff<K: Ord> {
    pub removed: Vec<K>,
    pub added: Vec<K>,
}

impl<K: Ord> Default for VariantDiff<K> {
    fn default() -> Self {
        Self {
            removed: Vec::new(),
            added: Vec::new(),
        }
    }
}

impl<K: Ord + Clone> VariantDiff<K> {
    pub fn between(before: &BTreeSet<K>, after: &BTreeSet<K>) -> Self {
        Self {
            removed: before.difference(after).cloned().collect(),
            added: after.difference(before).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Outcome of one reconciliation pass: per-variant removed/added keys.
/// Pure value object; the caller decides how to surface it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub group: VariantDiff<GroupOnboardingKey>,
    pub client: VariantDiff<ClientOnboardingKey>,
    pub client_scraping: VariantDiff<ClientScrapingOnboardingKey>,
}

impl DiffReport {
    pub fn between(before: &StoreKeys, after: &StoreKeys) -> Self {
        Self {
            group: VariantDiff::between(&before.group, &after.group),
            client: VariantDiff::between(&before.client, &after.client),
            client_scraping: VariantDiff::between(&before.client_scraping, &after.client_scraping),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty() && self.client.is_empty() && self.client_scraping.is_empty()
    }

    pub fn removed_count(&self) -> usize {
        self.group.removed.len() + self.client.removed.len() + self.client_scraping.removed.len()
    }

    pub fn added_count(&self) -> usize {
        self.group.added.len() + self.client.added.len() + self.client_scraping.added.len()
    }
}
