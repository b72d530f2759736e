//! # Provider Onboarding Main Entry Point
//!
//! This is the main entry point for the Provider Onboarding service.

use std::sync::Arc;
use std::time::Duration;

use migration::MigratorTrait;
use tokio_util::sync::CancellationToken;

use onboarding::config::ConfigLoader;
use onboarding::db::init_pool;
use onboarding::events::{ConsumerConfig, EventConsumer};
use onboarding::notifier::{ChangeNotifier, LogChangeNotifier, WebhookChangeNotifier};
use onboarding::provider_client::ProviderDirectoryClient;
use onboarding::reconciler::SnapshotReconciler;
use onboarding::server::{AppState, run_server};
use onboarding::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config = ConfigLoader::new().load()?;

    telemetry::init_tracing(&config)?;

    // Log the loaded configuration (secrets redacted)
    println!("Loaded configuration for profile: {}", config.profile);
    if let Ok(redacted_json) = config.redacted_json() {
        println!("Configuration: {}", redacted_json);
    }

    let db = init_pool(&config).await?;
    migration::Migrator::up(&db, None).await?;

    let notifier: Arc<dyn ChangeNotifier> = match &config.notifier_webhook_url {
        Some(url) => Arc::new(WebhookChangeNotifier::new(
            url.clone(),
            Duration::from_secs(config.notifier_timeout_seconds),
        )),
        None => Arc::new(LogChangeNotifier),
    };

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });
    }

    let consumer = EventConsumer::start(
        db.clone(),
        Arc::clone(&notifier),
        ConsumerConfig {
            partitions: config.event_partitions,
            queue_depth: config.event_queue_depth,
        },
        shutdown.clone(),
    );

    let directory = ProviderDirectoryClient::new(
        &config.providers_base_url,
        Duration::from_secs(config.snapshot_timeout_seconds),
    )?;
    let reconciler = SnapshotReconciler::new(
        db.clone(),
        directory,
        Arc::clone(&notifier),
        Duration::from_secs(config.reconcile_timeout_seconds),
    );

    let state = AppState {
        config: Arc::new(config),
        db,
        consumer: Arc::new(consumer),
        reconciler: Arc::new(reconciler),
    };

    run_server(state).await
}
