//! Integration tests driving the HTTP surface end to end: health probes,
//! operator auth, event ingestion and the reconciliation trigger.

mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result as AnyhowResult};
use reqwest::StatusCode;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use onboarding::config::AppConfig;
use onboarding::events::{ConsumerConfig, EventConsumer};
use onboarding::handlers::events::OPERATION_HEADER;
use onboarding::models::ServiceType;
use onboarding::notifier::ChangeNotifier;
use onboarding::provider_client::ProviderDirectoryClient;
use onboarding::reconciler::SnapshotReconciler;
use onboarding::records::GroupOnboardingKey;
use onboarding::repositories::OnboardingRepository;
use onboarding::server::{AppState, create_app};

use test_utils::{RecordingNotifier, create_client, create_group, setup_test_db};

const OPERATOR_TOKEN: &str = "test-operator-token";

struct TestApp {
    server_url: String,
    db: DatabaseConnection,
    reconciler: Arc<SnapshotReconciler>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    consumer_shutdown: CancellationToken,
    join_handle: Option<JoinHandle<AnyhowResult<()>>>,
}

impl TestApp {
    async fn shutdown(mut self) -> AnyhowResult<()> {
        self.consumer_shutdown.cancel();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.join_handle.take() {
            handle.await.context("server task join failed")??;
        }
        Ok(())
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.consumer_shutdown.cancel();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Spawns the full application against an in-memory store, bound to an
/// ephemeral port.
async fn spawn_test_app(providers_base_url: &str) -> TestApp {
    let db = setup_test_db().await.unwrap();

    let config = AppConfig {
        operator_tokens: vec![OPERATOR_TOKEN.to_string()],
        ..AppConfig::default()
    };

    let notifier = RecordingNotifier::new();
    let consumer_shutdown = CancellationToken::new();
    let consumer = EventConsumer::start(
        db.clone(),
        Arc::clone(&notifier) as Arc<dyn ChangeNotifier>,
        ConsumerConfig {
            partitions: 2,
            queue_depth: 16,
        },
        consumer_shutdown.clone(),
    );

    let directory = ProviderDirectoryClient::new(providers_base_url, Duration::from_secs(5))
        .expect("valid providers base url");
    let reconciler = Arc::new(SnapshotReconciler::new(
        db.clone(),
        directory,
        notifier as Arc<dyn ChangeNotifier>,
        Duration::from_secs(30),
    ));

    let state = AppState {
        config: Arc::new(config),
        db: db.clone(),
        consumer: Arc::new(consumer),
        reconciler: Arc::clone(&reconciler),
    };
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_url = format!("http://{}", addr);

    let (ready_tx, ready_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let join_handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let _ = ready_tx.send(());

        server.await.context("axum server error")
    });

    ready_rx.await.expect("server task to signal readiness");

    TestApp {
        server_url,
        db,
        reconciler,
        shutdown_tx: Some(shutdown_tx),
        consumer_shutdown,
        join_handle: Some(join_handle),
    }
}

fn authed(request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    request.header("Authorization", format!("Bearer {}", OPERATOR_TOKEN))
}

#[tokio::test]
async fn test_public_endpoints_require_no_auth() {
    let app = spawn_test_app("http://localhost:9090/providers").await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/", app.server_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["service"], "provider-onboarding");

    let response = client
        .get(format!("{}/healthz", app.server_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .get(format!("{}/readyz", app.server_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_protected_endpoints_reject_bad_tokens() {
    let app = spawn_test_app("http://localhost:9090/providers").await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/onboardings", app.server_url);

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/problem+json"
    );

    let response = client
        .get(&url)
        .header("Authorization", "Bearer wrong-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = authed(client.get(&url)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["onboardings"], json!([]));

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_event_ingestion_round_trip() {
    let app = spawn_test_app("http://localhost:9090/providers").await;
    let client_id = create_client(&app.db, None).await.unwrap();
    let client = reqwest::Client::new();

    // Tag arrives in the legacy quoted form; the consumer treats it like
    // the plain tag.
    let response = authed(client.post(format!("{}/api/v1/events", app.server_url)))
        .header(OPERATION_HEADER, "\"CLIENT_ADD\"")
        .json(&json!({
            "groupId": null,
            "clientId": client_id,
            "endpointId": null,
            "provider": "BUDGET_INSIGHT",
            "serviceType": "AIS",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // The apply is asynchronous; poll the read API until the fact lands.
    let url = format!(
        "{}/api/v1/clients/{}/onboardings",
        app.server_url, client_id
    );
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let facts = loop {
        let body: Value = authed(client.get(&url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let facts = body["onboardings"].as_array().unwrap().clone();
        if !facts.is_empty() {
            break facts;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "event never became visible through the view"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0]["client_id"], json!(client_id));
    assert_eq!(facts[0]["provider"], "BUDGET_INSIGHT");
    assert_eq!(facts[0]["service_type"], "AIS");
    assert_eq!(facts[0]["redirect_url_id"], Value::Null);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_events_rejected() {
    let app = spawn_test_app("http://localhost:9090/providers").await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/events", app.server_url);
    let payload = json!({
        "groupId": null,
        "clientId": Uuid::new_v4(),
        "endpointId": null,
        "provider": "MONZO",
        "serviceType": "AIS",
    });

    // Unknown operation tag.
    let response = authed(client.post(&url))
        .header(OPERATION_HEADER, "CLIENT_UPSERT")
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_FAILED");

    // Missing operation header.
    let response = authed(client.post(&url))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reconcile_trigger_defaults_to_dry_run() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all-onboarded-providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = spawn_test_app(&mock_server.uri()).await;
    let group_id = create_group(&app.db, None).await.unwrap();

    let repo = OnboardingRepository::new(&app.db);
    let key = GroupOnboardingKey {
        group_id,
        provider: "NATWEST".to_string(),
        service_type: ServiceType::Ais,
    };
    repo.upsert_group(&key).await.unwrap();

    let client = reqwest::Client::new();
    let response = authed(client.post(format!(
        "{}/api/v1/admin/reconciliations",
        app.server_url
    )))
    .json(&json!({}))
    .send()
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["dry_run"], json!(true));

    // Wait for the spawned run to release the single-flight permit.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(guard) = app.reconciler.try_acquire() {
            drop(guard);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "reconciliation run never finished"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Dry run against an empty snapshot: the store keeps its row.
    let keys = repo.all_keys().await.unwrap();
    assert_eq!(keys.group.len(), 1);
    assert!(keys.group.contains(&key));

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reconcile_trigger_conflicts_while_running() {
    let app = spawn_test_app("http://localhost:9090/providers").await;

    let _held = app.reconciler.try_acquire().unwrap();

    let client = reqwest::Client::new();
    let response = authed(client.post(format!(
        "{}/api/v1/admin/reconciliations",
        app.server_url
    )))
    .json(&json!({ "dry_run": false }))
    .send()
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "CONFLICT");

    app.shutdown().await.unwrap();
}
