//! # Provider Directory Client
//!
//! Thin HTTP client for the authoritative provider directory. One GET per
//! reconciliation, no internal retries; retry policy, if any, belongs to
//! the caller.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::records::FlatOnboardingRecord;

/// Errors surfaced by the snapshot fetch. Any of them aborts the
/// reconciliation run before the store is touched.
#[derive(Debug, Error)]
pub enum SnapshotFetchError {
    #[error("invalid providers base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to build snapshot http client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("snapshot request failed: {0}")]
    Request(reqwest::Error),
    #[error("snapshot endpoint returned status {status}")]
    UnexpectedStatus { status: StatusCode },
    #[error("snapshot body could not be decoded: {0}")]
    Decode(reqwest::Error),
}

/// Client for the upstream provider directory
pub struct ProviderDirectoryClient {
    client: Client,
    base_url: String,
}

impl ProviderDirectoryClient {
    /// Create a new client for the given base URL. The timeout covers the
    /// whole request; expiry counts as fetch failure.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SnapshotFetchError> {
        Url::parse(base_url).map_err(|source| SnapshotFetchError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SnapshotFetchError::ClientBuild)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full snapshot of onboarding facts from the authoritative
    /// upstream. Non-200 responses and undecodable bodies are total fetch
    /// failures.
    pub async fn fetch_all_onboarded_providers(
        &self,
    ) -> Result<Vec<FlatOnboardingRecord>, SnapshotFetchError> {
        let url = format!("{}/all-onboarded-providers", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(SnapshotFetchError::Request)?;

        if response.status() != StatusCode::OK {
            return Err(SnapshotFetchError::UnexpectedStatus {
                status: response.status(),
            });
        }

        response
            .json::<Vec<FlatOnboardingRecord>>()
            .await
            .map_err(SnapshotFetchError::Decode)
    }
}
