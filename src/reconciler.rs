//! # Snapshot Reconciler
//!
//! Full resynchronization of the onboarding store against the authoritative
//! provider directory: fetch snapshot, partition, validate references,
//! replace all rows inside one transaction and diff the before/after key
//! sets. The upstream snapshot is the sole authority for steady state;
//! incremental events are a low-latency preview that the next pass may
//! overwrite.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, TransactionTrait};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::error::RepositoryError;
use crate::notifier::{ChangeNotifier, ChangeTrigger};
use crate::provider_client::{ProviderDirectoryClient, SnapshotFetchError};
use crate::records::DiffReport;
use crate::repositories::{OnboardingRepository, ReferenceRepository};
use crate::validator::{partition_snapshot, validate};

/// Errors surfaced by one reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("a reconciliation run is already in progress")]
    AlreadyRunning,
    #[error("snapshot fetch failed: {0}")]
    Snapshot(#[from] SnapshotFetchError),
    #[error("reconciliation timed out after {0:?}")]
    TimedOut(Duration),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Orchestrator for full store resynchronization
pub struct SnapshotReconciler {
    db: DatabaseConnection,
    directory: ProviderDirectoryClient,
    notifier: Arc<dyn ChangeNotifier>,
    run_timeout: Duration,
    run_lock: Arc<Mutex<()>>,
}

impl SnapshotReconciler {
    /// Create a new reconciler. `run_timeout` boxes the whole run, snapshot
    /// fetch and transaction included.
    pub fn new(
        db: DatabaseConnection,
        directory: ProviderDirectoryClient,
        notifier: Arc<dyn ChangeNotifier>,
        run_timeout: Duration,
    ) -> Self {
        Self {
            db,
            directory,
            notifier,
            run_timeout,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Acquire the single-flight permit, failing fast when a run is already
    /// in progress. Two concurrent replace-all transactions would race on
    /// delete/insert ordering and corrupt the diff.
    pub fn try_acquire(&self) -> Result<OwnedMutexGuard<()>, ReconcileError> {
        Arc::clone(&self.run_lock)
            .try_lock_owned()
            .map_err(|_| ReconcileError::AlreadyRunning)
    }

    /// Run one reconciliation pass. With `dry_run` the computed diff is
    /// returned as if committed, but the transaction is rolled back and the
    /// store keeps its previous state.
    pub async fn reconcile(&self, dry_run: bool) -> Result<DiffReport, ReconcileError> {
        let guard = self.try_acquire()?;
        self.run_guarded(guard, dry_run).await
    }

    /// Run with a permit obtained from [`Self::try_acquire`]. Lets callers
    /// reject concurrent triggers synchronously before spawning the run.
    pub async fn run_guarded(
        &self,
        _guard: OwnedMutexGuard<()>,
        dry_run: bool,
    ) -> Result<DiffReport, ReconcileError> {
        let started = std::time::Instant::now();

        let result = match timeout(self.run_timeout, self.run(dry_run)).await {
            Ok(result) => result,
            // The in-flight transaction is dropped here, which rolls it
            // back; the store keeps its pre-run state.
            Err(_) => Err(ReconcileError::TimedOut(self.run_timeout)),
        };

        histogram!("onboarding_reconcile_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1_000.0);
        match &result {
            Ok(report) => {
                counter!("onboarding_reconcile_runs_total", "outcome" => "ok").increment(1);
                info!(
                    dry_run,
                    removed = report.removed_count(),
                    added = report.added_count(),
                    "reconciliation finished"
                );
            }
            Err(err) => {
                counter!("onboarding_reconcile_runs_total", "outcome" => "error").increment(1);
                warn!(dry_run, error = %err, "reconciliation failed; store unchanged");
            }
        }

        result
    }

    #[instrument(skip(self))]
    async fn run(&self, dry_run: bool) -> Result<DiffReport, ReconcileError> {
        let snapshot = self.directory.fetch_all_onboarded_providers().await?;
        info!(records = snapshot.len(), "fetched onboarding snapshot");

        let (partitioned, unclassifiable) = partition_snapshot(snapshot);
        for rejected in &unclassifiable {
            warn!(
                target: "dead_letter",
                record = %rejected,
                "dropping unclassifiable snapshot record"
            );
        }

        // One point-in-time reference load; every record in this run is
        // judged against the same registry state.
        let refs = ReferenceRepository::new(&self.db).load_sets().await?;
        let outcome = validate(partitioned, &refs);
        for dropped in &outcome.dropped {
            warn!(
                target: "dead_letter",
                record = ?dropped.record,
                reason = %dropped.reason,
                "dropping snapshot record failing reference validation"
            );
            counter!("onboarding_reconcile_records_dropped_total").increment(1);
        }

        let txn = self.db.begin().await?;
        let repo = OnboardingRepository::new(&txn);

        let before = repo.all_keys().await?;
        repo.delete_all().await?;

        let created_at = Utc::now().into();
        repo.insert_groups(&outcome.groups, created_at).await?;
        repo.insert_clients(&outcome.clients, created_at).await?;
        repo.insert_client_scrapings(&outcome.scraping, created_at)
            .await?;
        let after = repo.all_keys().await?;

        let report = DiffReport::between(&before, &after);

        // Single exit point: the dry-run flag decides commit vs rollback.
        // Every error path above drops the transaction, which also rolls
        // back, so dry-run, error and cancellation share one undo path.
        if dry_run {
            txn.rollback().await?;
            info!(
                removed = report.removed_count(),
                added = report.added_count(),
                "dry-run reconciliation rolled back"
            );
        } else {
            txn.commit().await?;
            self.notifier.notify(ChangeTrigger::Reconciliation).await;
        }

        Ok(report)
    }
}
