//! # Incremental Update Consumer
//!
//! Bounded pool of worker tasks applying parsed onboarding changes to the
//! store. Changes are routed to a partition by hashing the subject id, so
//! ordering is guaranteed within a partition only. Every successful apply
//! emits exactly one change signal, idempotent no-ops included; failed
//! applies are logged, counted and dropped so one bad message never blocks
//! the stream.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use metrics::counter;
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::RepositoryError;
use crate::notifier::{ChangeNotifier, ChangeTrigger};
use crate::records::OnboardingRecord;
use crate::repositories::OnboardingRepository;

use super::{OnboardingChange, Operation};

/// Configuration for the event consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Number of stream partitions, each served by one worker task
    pub partitions: usize,
    /// Bounded queue depth per partition
    pub queue_depth: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            queue_depth: 256,
        }
    }
}

/// Errors returned when enqueueing an event for processing.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("event queue for partition {partition} is full")]
    QueueFull { partition: usize },
    #[error("event consumer is shut down")]
    Closed,
}

/// Outcome of one idempotent apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    AlreadyOnboarded,
    Removed,
    NotOnboarded,
}

/// Partitioned consumer for the incremental event stream
pub struct EventConsumer {
    senders: Vec<mpsc::Sender<OnboardingChange>>,
    workers: Vec<JoinHandle<()>>,
}

impl EventConsumer {
    /// Spawn the worker pool and return the consumer handle.
    pub fn start(
        db: DatabaseConnection,
        notifier: Arc<dyn ChangeNotifier>,
        config: ConsumerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let partitions = config.partitions.max(1);
        let queue_depth = config.queue_depth.max(1);

        let mut senders = Vec::with_capacity(partitions);
        let mut workers = Vec::with_capacity(partitions);

        for partition in 0..partitions {
            let (tx, rx) = mpsc::channel(queue_depth);
            senders.push(tx);
            workers.push(tokio::spawn(Self::worker_loop(
                partition,
                rx,
                db.clone(),
                Arc::clone(&notifier),
                shutdown.clone(),
            )));
        }

        info!(partitions, queue_depth, "started onboarding event consumer");

        Self { senders, workers }
    }

    /// Enqueue a change without waiting. Saturated partitions reject the
    /// event so backpressure is visible at the ingestion surface.
    pub fn try_submit(&self, change: OnboardingChange) -> Result<(), SubmitError> {
        let partition = self.partition_for(&change.record);
        self.senders[partition]
            .try_send(change)
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull { partition },
                mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
            })
    }

    /// Wait for all workers to drain and stop. Intended for shutdown paths
    /// and tests; the cancellation token passed to [`Self::start`] must be
    /// triggered first, or senders dropped.
    pub async fn join(self) {
        drop(self.senders);
        for worker in self.workers {
            let _ = worker.await;
        }
    }

    fn partition_for(&self, record: &OnboardingRecord) -> usize {
        let mut hasher = DefaultHasher::new();
        record.partition_key().hash(&mut hasher);
        (hasher.finish() % self.senders.len() as u64) as usize
    }

    async fn worker_loop(
        partition: usize,
        mut rx: mpsc::Receiver<OnboardingChange>,
        db: DatabaseConnection,
        notifier: Arc<dyn ChangeNotifier>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(partition, "event worker shutting down");
                    break;
                }
                received = rx.recv() => {
                    let Some(change) = received else {
                        break;
                    };
                    Self::process(&db, notifier.as_ref(), partition, change).await;
                }
            }
        }
    }

    async fn process(
        db: &DatabaseConnection,
        notifier: &dyn ChangeNotifier,
        partition: usize,
        change: OnboardingChange,
    ) {
        match apply_change(db, &change).await {
            Ok(outcome) => {
                counter!("onboarding_events_applied_total").increment(1);
                debug!(partition, ?outcome, "applied onboarding event");
                // Downstream derived state may depend on timing, so the
                // signal fires for idempotent no-ops as well.
                notifier.notify(ChangeTrigger::IncrementalEvent).await;
            }
            Err(err) => {
                counter!("onboarding_events_dead_lettered_total").increment(1);
                error!(
                    target: "dead_letter",
                    partition,
                    error = %err,
                    change = ?change,
                    "dropping onboarding event"
                );
            }
        }
    }
}

/// Apply one parsed change to the store. Adds are idempotent upserts,
/// removes of absent keys are silent no-ops. Referential violations surface
/// as database errors from the persistence boundary and are handled by the
/// caller.
pub async fn apply_change(
    db: &DatabaseConnection,
    change: &OnboardingChange,
) -> Result<ApplyOutcome, RepositoryError> {
    let repo = OnboardingRepository::new(db);

    let outcome = match (&change.op, &change.record) {
        (Operation::Add, OnboardingRecord::Group(key)) => {
            if repo.upsert_group(key).await? {
                ApplyOutcome::Inserted
            } else {
                ApplyOutcome::AlreadyOnboarded
            }
        }
        (Operation::Remove, OnboardingRecord::Group(key)) => {
            if repo.delete_group(key).await? {
                ApplyOutcome::Removed
            } else {
                ApplyOutcome::NotOnboarded
            }
        }
        (Operation::Add, OnboardingRecord::ClientRedirectUrl(key)) => {
            if repo.upsert_client(key).await? {
                ApplyOutcome::Inserted
            } else {
                ApplyOutcome::AlreadyOnboarded
            }
        }
        (Operation::Remove, OnboardingRecord::ClientRedirectUrl(key)) => {
            if repo.delete_client(key).await? {
                ApplyOutcome::Removed
            } else {
                ApplyOutcome::NotOnboarded
            }
        }
        (Operation::Add, OnboardingRecord::ClientScraping(key)) => {
            if repo.upsert_client_scraping(key).await? {
                ApplyOutcome::Inserted
            } else {
                ApplyOutcome::AlreadyOnboarded
            }
        }
        (Operation::Remove, OnboardingRecord::ClientScraping(key)) => {
            if repo.delete_client_scraping(key).await? {
                ApplyOutcome::Removed
            } else {
                ApplyOutcome::NotOnboarded
            }
        }
    };

    Ok(outcome)
}
