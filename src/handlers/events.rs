//! # Event Ingestion Handlers
//!
//! HTTP surface for the incremental onboarding event stream. The operation
//! tag travels out-of-band in a header; the flat payload is the request
//! body. Accepted events are applied asynchronously by the partitioned
//! consumer.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use metrics::counter;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::auth::OperatorAuth;
use crate::error::{ApiError, ErrorType, validation_error};
use crate::events::{SubmitError, parse_event};
use crate::records::FlatOnboardingRecord;
use crate::server::AppState;

/// Header carrying the raw operation tag.
pub const OPERATION_HEADER: &str = "X-Onboarding-Operation";

/// Event accept response
#[derive(Debug, Serialize, ToSchema)]
pub struct EventAcceptResponse {
    /// Acceptance status
    pub status: String,
}

/// Ingest one incremental onboarding event
#[utoipa::path(
    post,
    path = "/api/v1/events",
    security(("bearer_auth" = [])),
    request_body = FlatOnboardingRecord,
    params(
        ("X-Onboarding-Operation" = String, Header, description = "Operation tag, one of GROUP_ADD, GROUP_REMOVE, CLIENT_ADD, CLIENT_REMOVE; may arrive wrapped in one layer of quotes")
    ),
    responses(
        (status = 202, description = "Event accepted", body = EventAcceptResponse),
        (status = 400, description = "Malformed event", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 503, description = "Event queue saturated", body = ApiError)
    ),
    tag = "events"
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    headers: HeaderMap,
    Json(payload): Json<FlatOnboardingRecord>,
) -> Result<(StatusCode, Json<EventAcceptResponse>), ApiError> {
    let raw_tag = headers
        .get(OPERATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            validation_error(
                "Missing operation tag",
                serde_json::json!({
                    "X-Onboarding-Operation": "Required header is missing or not valid UTF-8"
                }),
            )
        })?;

    let change = parse_event(raw_tag, payload).map_err(|err| {
        counter!("onboarding_events_rejected_total").increment(1);
        warn!(target: "dead_letter", error = %err, "rejected malformed onboarding event");
        validation_error(
            "Malformed onboarding event",
            serde_json::json!({ "reason": err.to_string() }),
        )
    })?;

    state.consumer.try_submit(change).map_err(|err| match err {
        SubmitError::QueueFull { partition } => {
            warn!(partition, "event queue saturated, rejecting event");
            ApiError::from(ErrorType::ServiceUnavailable)
        }
        SubmitError::Closed => ApiError::from(ErrorType::ServiceUnavailable),
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EventAcceptResponse {
            status: "accepted".to_string(),
        }),
    ))
}
