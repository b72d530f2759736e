//! # Server Configuration
//!
//! This module contains the server setup and configuration for the Provider
//! Onboarding service.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::auth;
use crate::config::AppConfig;
use crate::events::EventConsumer;
use crate::handlers;
use crate::reconciler::SnapshotReconciler;
use crate::telemetry::{self, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub consumer: Arc<EventConsumer>,
    pub reconciler: Arc<SnapshotReconciler>,
}

/// Middleware assigning each request a correlation id, made available to
/// handlers and error responses through task-local storage.
async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let context = TraceContext {
        trace_id: format!("req-{}", Uuid::new_v4()),
    };
    request.extensions_mut().insert(context.clone());
    telemetry::with_trace_context(context, next.run(request)).await
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/v1/onboardings",
            get(handlers::onboardings::list_onboardings),
        )
        .route(
            "/api/v1/clients/{client_id}/onboardings",
            get(handlers::onboardings::list_client_onboardings),
        )
        .route(
            "/api/v1/admin/reconciliations",
            post(handlers::admin::trigger_reconciliation),
        )
        .route("/api/v1/events", post(handlers::events::ingest_event))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .merge(protected)
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given application state
pub async fn run_server(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = state
        .config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = state.config.profile.clone();

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Server listening on: {}", addr);
    println!("Running in profile: {}", profile);

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::onboardings::list_onboardings,
        crate::handlers::onboardings::list_client_onboardings,
        crate::handlers::admin::trigger_reconciliation,
        crate::handlers::events::ingest_event,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::ServiceType,
            crate::handlers::HealthStatus,
            crate::error::ApiError,
            crate::records::OnboardingFact,
            crate::records::FlatOnboardingRecord,
            crate::handlers::onboardings::OnboardingFactsResponse,
            crate::handlers::admin::ReconcileRequestDto,
            crate::handlers::admin::ReconcileAcceptedDto,
            crate::handlers::events::EventAcceptResponse,
        )
    ),
    info(
        title = "Provider Onboarding API",
        description = "API for tracking which external data providers each client or client group may use",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
