//! # Change Notification
//!
//! Emits a "recompute dependent derived state" signal whenever the
//! onboarding store mutates. The site-enablement feature consumes the
//! signal; this service only guarantees delivery semantics (one signal per
//! successful incremental apply, one per committed reconciliation).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use url::Url;

/// What caused the store mutation behind a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTrigger {
    IncrementalEvent,
    Reconciliation,
}

/// Sink for store-change signals.
///
/// Implementations must absorb their own failures: a lost signal is logged,
/// never propagated into the write path that produced it.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify(&self, trigger: ChangeTrigger);
}

/// Notifier that posts the change signal to a configured webhook
pub struct WebhookChangeNotifier {
    client: Client,
    webhook_url: String,
}

impl WebhookChangeNotifier {
    /// Create a new webhook notifier
    pub fn new(webhook_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            webhook_url,
        }
    }

    /// Validate webhook URL according to security and reliability constraints:
    /// - Must be HTTPS
    /// - Length must be reasonable (<= 2048 chars)
    fn validate_webhook_url(&self) -> bool {
        if self.webhook_url.len() > 2048 {
            warn!(
                "Webhook URL exceeds maximum length: target={} length={}",
                self.redacted_target(),
                self.webhook_url.len()
            );
            return false;
        }

        if !self.webhook_url.to_lowercase().starts_with("https://") {
            warn!("Rejected non-HTTPS webhook URL: {}", self.redacted_target());
            return false;
        }

        true
    }

    fn redacted_target(&self) -> String {
        Url::parse(&self.webhook_url)
            .ok()
            .map(|parsed| {
                let scheme = parsed.scheme();
                let host = parsed.host_str().unwrap_or("unknown");
                format!("{}://{}", scheme, host)
            })
            .unwrap_or_else(|| "[invalid-url]".to_string())
    }

    fn build_payload(trigger: ChangeTrigger) -> serde_json::Value {
        json!({
            "event": "onboarded_providers_changed",
            "trigger": trigger,
            "occurred_at": Utc::now(),
        })
    }
}

#[async_trait]
impl ChangeNotifier for WebhookChangeNotifier {
    async fn notify(&self, trigger: ChangeTrigger) {
        if !self.validate_webhook_url() {
            return;
        }

        let payload = Self::build_payload(trigger);

        let max_retries = 3;
        let mut delay = Duration::from_secs(1);

        for attempt in 1..=max_retries {
            match self
                .client
                .post(&self.webhook_url)
                .json(&payload)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    info!(
                        "Sent change signal to {} (attempt {})",
                        self.redacted_target(),
                        attempt
                    );
                    return;
                }
                Ok(response) => {
                    warn!(
                        "Webhook returned status {} for change signal (attempt {})",
                        response.status(),
                        attempt
                    );
                }
                Err(e) => {
                    error!(
                        "Failed to send change signal to {} (attempt {}): {}",
                        self.redacted_target(),
                        attempt,
                        e
                    );
                }
            }

            if attempt < max_retries {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        error!(
            "Dropping change signal after {} attempts to {}",
            max_retries,
            self.redacted_target()
        );
    }
}

/// Log-only notifier used when no webhook is configured
pub struct LogChangeNotifier;

#[async_trait]
impl ChangeNotifier for LogChangeNotifier {
    async fn notify(&self, trigger: ChangeTrigger) {
        debug!(?trigger, "onboarding store changed; derived state should be recomputed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_payload_shape() {
        let payload = WebhookChangeNotifier::build_payload(ChangeTrigger::Reconciliation);
        assert_eq!(payload["event"], "onboarded_providers_changed");
        assert_eq!(payload["trigger"], "reconciliation");
        assert!(payload["occurred_at"].is_string());
    }

    #[test]
    fn test_non_https_webhook_rejected() {
        let notifier = WebhookChangeNotifier::new(
            "http://internal.example.com/hooks/onboarding".to_string(),
            Duration::from_secs(5),
        );
        assert!(!notifier.validate_webhook_url());

        let notifier = WebhookChangeNotifier::new(
            "https://internal.example.com/hooks/onboarding".to_string(),
            Duration::from_secs(5),
        );
        assert!(notifier.validate_webhook_url());
    }

    #[test]
    fn test_redacted_target_hides_path() {
        let notifier = WebhookChangeNotifier::new(
            "https://hooks.example.com/secret/path?token=abc".to_string(),
            Duration::from_secs(5),
        );
        assert_eq!(notifier.redacted_target(), "https://hooks.example.com");
    }
}
