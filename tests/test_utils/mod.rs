//! Test utilities for database testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations applied, seeding the read-only reference registries, and
//! a recording change notifier for asserting signal delivery.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use uuid::Uuid;

use onboarding::models::{client, client_group, redirect_url};
use onboarding::notifier::{ChangeNotifier, ChangeTrigger};

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool is capped at one connection: each in-memory SQLite connection
/// is its own database, so every session must share the one that ran the
/// migrations.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1);

    let db = Database::connect(opt).await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Inserts a client row, returning its id.
#[allow(dead_code)]
pub async fn create_client(db: &DatabaseConnection, client_id: Option<Uuid>) -> Result<Uuid> {
    let id = client_id.unwrap_or_else(Uuid::new_v4);

    client::ActiveModel {
        id: Set(id),
        name: Set(Some("Test Client".to_string())),
        deleted_at: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(id)
}

/// Inserts a soft-deleted client row, returning its id.
#[allow(dead_code)]
pub async fn create_deleted_client(db: &DatabaseConnection) -> Result<Uuid> {
    let id = Uuid::new_v4();

    client::ActiveModel {
        id: Set(id),
        name: Set(Some("Departed Client".to_string())),
        deleted_at: Set(Some(Utc::now().into())),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(id)
}

/// Inserts a client group row, returning its id.
#[allow(dead_code)]
pub async fn create_group(db: &DatabaseConnection, group_id: Option<Uuid>) -> Result<Uuid> {
    let id = group_id.unwrap_or_else(Uuid::new_v4);

    client_group::ActiveModel {
        id: Set(id),
        name: Set("Test Group".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(id)
}

/// Registers a redirect URL for a client, returning the redirect URL id.
#[allow(dead_code)]
pub async fn create_redirect_url(db: &DatabaseConnection, client_id: Uuid) -> Result<Uuid> {
    let id = Uuid::new_v4();

    redirect_url::ActiveModel {
        id: Set(id),
        client_id: Set(client_id),
        url: Set("https://app.example.com/callback".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(id)
}

/// Change notifier test double that records every trigger it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    triggers: Mutex<Vec<ChangeTrigger>>,
}

impl RecordingNotifier {
    #[allow(dead_code)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[allow(dead_code)]
    pub fn count(&self) -> usize {
        self.triggers.lock().unwrap().len()
    }

    #[allow(dead_code)]
    pub fn triggers(&self) -> Vec<ChangeTrigger> {
        self.triggers.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeNotifier for RecordingNotifier {
    async fn notify(&self, trigger: ChangeTrigger) {
        self.triggers.lock().unwrap().push(trigger);
    }
}

/// Polls `condition` until it returns true or the timeout elapses.
#[allow(dead_code)]
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
