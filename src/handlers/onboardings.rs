//! # Onboarding View Handlers
//!
//! Read endpoints over the unified onboarding view, consumed by the
//! site-enablement feature and operators.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::OperatorAuth;
use crate::error::ApiError;
use crate::records::OnboardingFact;
use crate::server::AppState;
use crate::view::OnboardingView;

/// Response payload listing onboarding facts
#[derive(Debug, Serialize, ToSchema)]
pub struct OnboardingFactsResponse {
    /// The unified onboarding facts
    pub onboardings: Vec<OnboardingFact>,
}

/// Optional provider filter for client-scoped queries
#[derive(Debug, Deserialize, IntoParams)]
pub struct ProviderFilter {
    /// Provider code to filter by (e.g., "MONZO")
    pub provider: Option<String>,
}

/// List every onboarding fact across all three variants
#[utoipa::path(
    get,
    path = "/api/v1/onboardings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All onboarding facts", body = OnboardingFactsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "onboardings"
)]
pub async fn list_onboardings(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
) -> Result<Json<OnboardingFactsResponse>, ApiError> {
    let facts = OnboardingView::new(&state.db).all().await?;
    Ok(Json(OnboardingFactsResponse { onboardings: facts }))
}

/// List onboarding facts for one client, optionally filtered by provider.
/// Group-level onboardings are not expanded here; resolving group
/// membership is the caller's concern.
#[utoipa::path(
    get,
    path = "/api/v1/clients/{client_id}/onboardings",
    security(("bearer_auth" = [])),
    params(
        ("client_id" = Uuid, Path, description = "Client identifier"),
        ProviderFilter
    ),
    responses(
        (status = 200, description = "Client onboarding facts", body = OnboardingFactsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "onboardings"
)]
pub async fn list_client_onboardings(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(client_id): Path<Uuid>,
    Query(filter): Query<ProviderFilter>,
) -> Result<Json<OnboardingFactsResponse>, ApiError> {
    let view = OnboardingView::new(&state.db);

    let facts = match filter.provider.as_deref() {
        Some(provider) => view.for_client_and_provider(client_id, provider).await?,
        None => view.for_client(client_id).await?,
    };

    Ok(Json(OnboardingFactsResponse { onboardings: facts }))
}
