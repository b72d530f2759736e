//! # Reference Validation
//!
//! Pure partitioning and validation of snapshot records. The validator is
//! handed its membership sets by the caller (one point-in-time load per
//! reconciliation run) and never queries anything itself, which keeps every
//! decision in this module a plain function of its inputs.

use std::collections::BTreeSet;
use std::fmt;

use crate::records::{
    ClientOnboardingKey, ClientScrapingOnboardingKey, FlatOnboardingRecord, GroupOnboardingKey,
    OnboardingRecord, UnclassifiableRecord,
};
use crate::repositories::ReferenceSets;

/// Snapshot records bucketed into the three variants, deduplicated by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedSnapshot {
    pub groups: BTreeSet<GroupOnboardingKey>,
    pub clients: BTreeSet<ClientOnboardingKey>,
    pub scraping: BTreeSet<ClientScrapingOnboardingKey>,
}

/// Bucket every flat record into its variant. Records carrying neither a
/// group nor a client id cannot be classified and are returned separately
/// for per-record logging.
pub fn partition_snapshot(
    records: Vec<FlatOnboardingRecord>,
) -> (PartitionedSnapshot, Vec<UnclassifiableRecord>) {
    let mut partitioned = PartitionedSnapshot::default();
    let mut unclassifiable = Vec::new();

    for flat in records {
        match OnboardingRecord::from_flat(flat) {
            Ok(OnboardingRecord::Group(key)) => {
                partitioned.groups.insert(key);
            }
            Ok(OnboardingRecord::ClientRedirectUrl(key)) => {
                partitioned.clients.insert(key);
            }
            Ok(OnboardingRecord::ClientScraping(key)) => {
                partitioned.scraping.insert(key);
            }
            Err(rejected) => unclassifiable.push(rejected),
        }
    }

    (partitioned, unclassifiable)
}

/// Why a record was dropped during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnknownGroup,
    UnknownOrDeletedClient,
    UnknownRedirectUrl,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DropReason::UnknownGroup => "group does not exist",
            DropReason::UnknownOrDeletedClient => "client does not exist or is deleted",
            DropReason::UnknownRedirectUrl => "redirect URL is not registered to this client",
        };
        f.write_str(text)
    }
}

/// A record that failed reference validation, with its full key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub record: OnboardingRecord,
    pub reason: DropReason,
}

/// Validation result: the surviving keys per variant plus every dropped
/// record. Dropping never aborts the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub groups: BTreeSet<GroupOnboardingKey>,
    pub clients: BTreeSet<ClientOnboardingKey>,
    pub scraping: BTreeSet<ClientScrapingOnboardingKey>,
    pub dropped: Vec<DroppedRecord>,
}

/// Check every partitioned record against the reference sets.
pub fn validate(snapshot: PartitionedSnapshot, refs: &ReferenceSets) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for key in snapshot.groups {
        if refs.knows_group(key.group_id) {
            outcome.groups.insert(key);
        } else {
            outcome.dropped.push(DroppedRecord {
                record: OnboardingRecord::Group(key),
                reason: DropReason::UnknownGroup,
            });
        }
    }

    for key in snapshot.clients {
        if refs.knows_redirect_url(key.client_id, key.redirect_url_id) {
            outcome.clients.insert(key);
        } else {
            outcome.dropped.push(DroppedRecord {
                record: OnboardingRecord::ClientRedirectUrl(key),
                reason: DropReason::UnknownRedirectUrl,
            });
        }
    }

    for key in snapshot.scraping {
        if refs.knows_client(key.client_id) {
            outcome.scraping.insert(key);
        } else {
            outcome.dropped.push(DroppedRecord {
                record: OnboardingRecord::ClientScraping(key),
                reason: DropReason::UnknownOrDeletedClient,
            });
        }
    }

    outcome
}
