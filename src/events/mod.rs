//! # Incremental Onboarding Events
//!
//! Wire types and parsing for the incremental add/remove event stream. The
//! operation tag travels out-of-band next to a flat payload; both are
//! turned into an [`OnboardingChange`] here, at the ingestion boundary, so
//! the rest of the system never re-derives the record variant.

pub mod consumer;

use serde::Serialize;
use thiserror::Error;

use crate::records::{
    ClientOnboardingKey, ClientScrapingOnboardingKey, FlatOnboardingRecord, GroupOnboardingKey,
    OnboardingRecord,
};

pub use consumer::{ApplyOutcome, ConsumerConfig, EventConsumer, SubmitError};

/// Closed set of operation tags accepted from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationTag {
    GroupAdd,
    GroupRemove,
    ClientAdd,
    ClientRemove,
}

impl OperationTag {
    /// Match a normalized tag token against the closed enumeration.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "GROUP_ADD" => Some(OperationTag::GroupAdd),
            "GROUP_REMOVE" => Some(OperationTag::GroupRemove),
            "CLIENT_ADD" => Some(OperationTag::ClientAdd),
            "CLIENT_REMOVE" => Some(OperationTag::ClientRemove),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationTag::GroupAdd => "GROUP_ADD",
            OperationTag::GroupRemove => "GROUP_REMOVE",
            OperationTag::ClientAdd => "CLIENT_ADD",
            OperationTag::ClientRemove => "CLIENT_REMOVE",
        }
    }
}

/// Strip one layer of surrounding double quotes from a raw tag token.
///
/// A transitional bug in the upstream producer emits the tag as a JSON
/// string literal (`"\"CLIENT_ADD\""`). Exactly one layer is removed;
/// anything beyond that is treated as an unknown tag by the caller.
pub fn normalize_operation_tag(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Whether a change adds or removes an onboarding record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Remove,
}

/// One parsed onboarding mutation ready to apply to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingChange {
    pub op: Operation,
    pub record: OnboardingRecord,
}

/// Per-message parse failures. Each one is fatal to that message only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("unrecognized operation tag '{0}'")]
    UnknownTag(String),
    #[error("group event carries no group id (neither groupId nor the legacy clientId field)")]
    MissingGroupId,
    #[error("client event carries no client id")]
    MissingClientId,
}

/// Turn a raw tag plus flat payload into an [`OnboardingChange`].
pub fn parse_event(
    raw_tag: &str,
    payload: FlatOnboardingRecord,
) -> Result<OnboardingChange, EventParseError> {
    let tag = OperationTag::parse(normalize_operation_tag(raw_tag))
        .ok_or_else(|| EventParseError::UnknownTag(raw_tag.to_string()))?;

    let op = match tag {
        OperationTag::GroupAdd | OperationTag::ClientAdd => Operation::Add,
        OperationTag::GroupRemove | OperationTag::ClientRemove => Operation::Remove,
    };

    let record = match tag {
        OperationTag::GroupAdd | OperationTag::GroupRemove => {
            // Legacy producers still put the group id in the clientId wire
            // field for group-level events.
            let group_id = payload
                .group_id
                .or(payload.client_id)
                .ok_or(EventParseError::MissingGroupId)?;
            OnboardingRecord::Group(GroupOnboardingKey {
                group_id,
                provider: payload.provider,
                service_type: payload.service_type,
            })
        }
        OperationTag::ClientAdd | OperationTag::ClientRemove => {
            let client_id = payload.client_id.ok_or(EventParseError::MissingClientId)?;
            match payload.redirect_url_id {
                Some(redirect_url_id) => {
                    OnboardingRecord::ClientRedirectUrl(ClientOnboardingKey {
                        client_id,
                        redirect_url_id,
                        provider: payload.provider,
                        service_type: payload.service_type,
                    })
                }
                None => OnboardingRecord::ClientScraping(ClientScrapingOnboardingKey {
                    client_id,
                    provider: payload.provider,
                    service_type: payload.service_type,
                }),
            }
        }
    };

    Ok(OnboardingChange { op, record })
}
