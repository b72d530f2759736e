//! # Administrative Handlers
//!
//! Operator-triggered reconciliation. The endpoint returns as soon as the
//! run is accepted; the diff report is observable through logs only.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::OperatorAuth;
use crate::error::{ApiError, ErrorType};
use crate::reconciler::ReconcileError;
use crate::server::AppState;

/// Request payload for triggering a reconciliation
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReconcileRequestDto {
    /// Compute the diff without committing it. Defaults to true so an
    /// accidental trigger never mutates the store.
    pub dry_run: Option<bool>,
}

/// Response payload for an accepted reconciliation trigger
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileAcceptedDto {
    /// Acceptance status
    pub status: String,
    /// Whether the accepted run is a dry run
    pub dry_run: bool,
}

/// Trigger one reconciliation run
#[utoipa::path(
    post,
    path = "/api/v1/admin/reconciliations",
    security(("bearer_auth" = [])),
    request_body = ReconcileRequestDto,
    responses(
        (status = 202, description = "Reconciliation accepted", body = ReconcileAcceptedDto),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 409, description = "A reconciliation is already running", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn trigger_reconciliation(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    body: Option<Json<ReconcileRequestDto>>,
) -> Result<(StatusCode, Json<ReconcileAcceptedDto>), ApiError> {
    let dry_run = body
        .map(|Json(request)| request.dry_run.unwrap_or(true))
        .unwrap_or(true);

    let guard = state.reconciler.try_acquire().map_err(|err| match err {
        ReconcileError::AlreadyRunning => ApiError::from(ErrorType::Conflict),
        other => {
            error!(error = %other, "failed to start reconciliation");
            ApiError::from(ErrorType::InternalServerError)
        }
    })?;

    let reconciler = state.reconciler.clone();
    tokio::spawn(async move {
        match reconciler.run_guarded(guard, dry_run).await {
            Ok(report) => match serde_json::to_string(&report) {
                Ok(diff_json) => {
                    info!(dry_run, diff = %diff_json, "reconciliation diff report");
                }
                Err(err) => {
                    error!(error = %err, "failed to serialize diff report");
                }
            },
            Err(err) => {
                error!(dry_run, error = %err, "reconciliation run failed");
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ReconcileAcceptedDto {
            status: "accepted".to_string(),
            dry_run,
        }),
    ))
}
