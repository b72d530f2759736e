//! Integration tests for the snapshot reconciler against an in-memory
//! store and a mocked provider directory.

mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use onboarding::models::ServiceType;
use onboarding::notifier::{ChangeNotifier, ChangeTrigger};
use onboarding::provider_client::ProviderDirectoryClient;
use onboarding::reconciler::{ReconcileError, SnapshotReconciler};
use onboarding::records::GroupOnboardingKey;
use onboarding::repositories::OnboardingRepository;

use test_utils::{
    RecordingNotifier, create_client, create_deleted_client, create_group, create_redirect_url,
    setup_test_db,
};

fn build_reconciler(
    db: &DatabaseConnection,
    base_url: &str,
    notifier: Arc<RecordingNotifier>,
) -> SnapshotReconciler {
    let directory =
        ProviderDirectoryClient::new(base_url, Duration::from_secs(5)).expect("valid base url");
    SnapshotReconciler::new(
        db.clone(),
        directory,
        notifier as Arc<dyn ChangeNotifier>,
        Duration::from_secs(30),
    )
}

fn group_key(group_id: Uuid, provider: &str) -> GroupOnboardingKey {
    GroupOnboardingKey {
        group_id,
        provider: provider.to_string(),
        service_type: ServiceType::Ais,
    }
}

fn group_snapshot_record(group_id: Uuid, provider: &str) -> serde_json::Value {
    json!({
        "groupId": group_id,
        "clientId": null,
        "endpointId": null,
        "provider": provider,
        "serviceType": "AIS",
    })
}

async fn mount_snapshot(server: &MockServer, records: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/all-onboarded-providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_diff_correctness_on_replace() {
    let db = setup_test_db().await.unwrap();
    let group_id = create_group(&db, None).await.unwrap();

    // Store starts with keys {A, B}.
    let repo = OnboardingRepository::new(&db);
    let key_a = group_key(group_id, "A");
    let key_b = group_key(group_id, "B");
    assert!(repo.upsert_group(&key_a).await.unwrap());
    assert!(repo.upsert_group(&key_b).await.unwrap());

    // Snapshot yields {B, C}.
    let mock_server = MockServer::start().await;
    mount_snapshot(
        &mock_server,
        json!([
            group_snapshot_record(group_id, "B"),
            group_snapshot_record(group_id, "C"),
        ]),
    )
    .await;

    let notifier = RecordingNotifier::new();
    let reconciler = build_reconciler(&db, &mock_server.uri(), Arc::clone(&notifier));

    let report = reconciler.reconcile(false).await.unwrap();

    assert_eq!(report.group.removed, vec![key_a]);
    assert_eq!(report.group.added, vec![group_key(group_id, "C")]);
    assert!(report.client.is_empty());
    assert!(report.client_scraping.is_empty());

    let keys = repo.all_keys().await.unwrap();
    assert_eq!(keys.group.len(), 2);
    assert!(keys.group.contains(&key_b));
    assert!(keys.group.contains(&group_key(group_id, "C")));

    // One signal for the whole committed run.
    assert_eq!(notifier.triggers(), vec![ChangeTrigger::Reconciliation]);
}

#[tokio::test]
async fn test_dry_run_returns_diff_without_mutating() {
    let db = setup_test_db().await.unwrap();
    let group_id = create_group(&db, None).await.unwrap();

    let repo = OnboardingRepository::new(&db);
    let key_a = group_key(group_id, "A");
    repo.upsert_group(&key_a).await.unwrap();

    let mock_server = MockServer::start().await;
    mount_snapshot(
        &mock_server,
        json!([group_snapshot_record(group_id, "B")]),
    )
    .await;

    let notifier = RecordingNotifier::new();
    let reconciler = build_reconciler(&db, &mock_server.uri(), Arc::clone(&notifier));

    let dry_report = reconciler.reconcile(true).await.unwrap();

    // The dry-run diff matches what a commit would do.
    assert_eq!(dry_report.group.removed, vec![key_a.clone()]);
    assert_eq!(dry_report.group.added, vec![group_key(group_id, "B")]);

    // But the store still holds its previous state and no signal fired.
    let keys = repo.all_keys().await.unwrap();
    assert_eq!(keys.group.len(), 1);
    assert!(keys.group.contains(&key_a));
    assert_eq!(notifier.count(), 0);

    // A subsequent wet run produces the identical diff.
    let wet_report = reconciler.reconcile(false).await.unwrap();
    assert_eq!(wet_report, dry_report);

    let keys = repo.all_keys().await.unwrap();
    assert_eq!(keys.group.len(), 1);
    assert!(keys.group.contains(&group_key(group_id, "B")));
}

#[tokio::test]
async fn test_referential_filtering_drops_invalid_records() {
    let db = setup_test_db().await.unwrap();

    let client_a = create_client(&db, None).await.unwrap();
    let client_b = create_client(&db, None).await.unwrap();
    let redirect_url_of_a = create_redirect_url(&db, client_a).await.unwrap();
    let deleted_client = create_deleted_client(&db).await.unwrap();

    let mock_server = MockServer::start().await;
    mount_snapshot(
        &mock_server,
        json!([
            // Group does not exist.
            group_snapshot_record(Uuid::new_v4(), "GHOST"),
            // Redirect URL belongs to client A, not client B.
            {
                "groupId": null,
                "clientId": client_b,
                "endpointId": redirect_url_of_a,
                "provider": "MONZO",
                "serviceType": "AIS",
            },
            // Soft-deleted client fails scraping validation.
            {
                "groupId": null,
                "clientId": deleted_client,
                "endpointId": null,
                "provider": "SCRAPER",
                "serviceType": "AIS",
            },
            // The one valid record.
            {
                "groupId": null,
                "clientId": client_a,
                "endpointId": redirect_url_of_a,
                "provider": "MONZO",
                "serviceType": "AIS",
            },
        ]),
    )
    .await;

    let notifier = RecordingNotifier::new();
    let reconciler = build_reconciler(&db, &mock_server.uri(), Arc::clone(&notifier));

    let report = reconciler.reconcile(false).await.unwrap();
    assert_eq!(report.added_count(), 1);

    let repo = OnboardingRepository::new(&db);
    let keys = repo.all_keys().await.unwrap();
    assert!(keys.group.is_empty());
    assert!(keys.client_scraping.is_empty());
    assert_eq!(keys.client.len(), 1);
    let surviving = keys.client.iter().next().unwrap();
    assert_eq!(surviving.client_id, client_a);
    assert_eq!(surviving.redirect_url_id, redirect_url_of_a);
}

#[tokio::test]
async fn test_fetch_failure_leaves_store_untouched() {
    let db = setup_test_db().await.unwrap();
    let group_id = create_group(&db, None).await.unwrap();

    let repo = OnboardingRepository::new(&db);
    let key = group_key(group_id, "A");
    repo.upsert_group(&key).await.unwrap();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all-onboarded-providers"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let notifier = RecordingNotifier::new();
    let reconciler = build_reconciler(&db, &mock_server.uri(), Arc::clone(&notifier));

    let result = reconciler.reconcile(false).await;
    assert!(matches!(result, Err(ReconcileError::Snapshot(_))));

    let keys = repo.all_keys().await.unwrap();
    assert_eq!(keys.group.len(), 1);
    assert!(keys.group.contains(&key));
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_undecodable_body_is_fetch_failure() {
    let db = setup_test_db().await.unwrap();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all-onboarded-providers"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&mock_server)
        .await;

    let notifier = RecordingNotifier::new();
    let reconciler = build_reconciler(&db, &mock_server.uri(), notifier);

    let result = reconciler.reconcile(false).await;
    assert!(matches!(result, Err(ReconcileError::Snapshot(_))));
}

#[tokio::test]
async fn test_single_flight_rejects_concurrent_run() {
    let db = setup_test_db().await.unwrap();

    let mock_server = MockServer::start().await;
    mount_snapshot(&mock_server, json!([])).await;

    let notifier = RecordingNotifier::new();
    let reconciler = build_reconciler(&db, &mock_server.uri(), notifier);

    let _held = reconciler.try_acquire().unwrap();

    let result = reconciler.reconcile(false).await;
    assert!(matches!(result, Err(ReconcileError::AlreadyRunning)));
}

#[tokio::test]
async fn test_empty_snapshot_clears_store() {
    let db = setup_test_db().await.unwrap();
    let group_id = create_group(&db, None).await.unwrap();

    let repo = OnboardingRepository::new(&db);
    let key = group_key(group_id, "A");
    repo.upsert_group(&key).await.unwrap();

    let mock_server = MockServer::start().await;
    mount_snapshot(&mock_server, json!([])).await;

    let notifier = RecordingNotifier::new();
    let reconciler = build_reconciler(&db, &mock_server.uri(), Arc::clone(&notifier));

    let report = reconciler.reconcile(false).await.unwrap();
    assert_eq!(report.group.removed, vec![key]);
    assert_eq!(report.added_count(), 0);

    let keys = repo.all_keys().await.unwrap();
    assert!(keys.group.is_empty());
}
