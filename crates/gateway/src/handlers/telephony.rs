//! Telephony handlers
//!
//! Thin HTTP layer over the vendor collaborator. Every call and SMS is
//! also logged as a communication row against the referenced lead or
//! client so the activity timeline stays complete.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::ApiResponse;
use crate::AppState;
use policydesk_common::{
    auth::AuthContext,
    db::{NewCommunication, Repository},
    errors::{AppError, Result},
    telephony::TelephonyClient,
};

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceCallRequest {
    #[validate(length(min = 1))]
    pub from: String,

    #[validate(length(min = 1))]
    pub to: String,

    pub lead_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendSmsRequest {
    #[validate(length(min = 1))]
    pub from: String,

    #[validate(length(min = 1))]
    pub to: String,

    #[validate(length(min = 1, max = 1000))]
    pub text: String,

    pub lead_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct HangupRequest {
    pub call_id: String,
}

fn telephony(state: &AppState) -> Result<&TelephonyClient> {
    state.telephony.as_ref().ok_or_else(|| AppError::Configuration {
        message: "Telephony is not configured".to_string(),
    })
}

/// Log a call or SMS on the activity timeline. Logging failures are
/// reported but never fail the already-completed vendor action.
async fn log_communication(
    state: &AppState,
    auth: &AuthContext,
    lead_id: Option<Uuid>,
    client_id: Option<Uuid>,
    comm_type: &str,
    status: &str,
    content: Option<String>,
) {
    if lead_id.is_none() && client_id.is_none() {
        return;
    }

    let repo = Repository::new(state.db.clone());
    let result = repo
        .create_communication(
            auth.workspace_id,
            auth.user_id,
            NewCommunication {
                lead_id,
                client_id,
                comm_type: comm_type.to_string(),
                direction: "outbound".to_string(),
                status: status.to_string(),
                subject: None,
                content,
                duration_secs: None,
                ai_summary: None,
                ai_sentiment: None,
            },
        )
        .await;

    if let Err(e) = result {
        tracing::error!(error = %e, "Failed to log telephony communication");
    }
}

/// Whether the caller holds a usable vendor authorization
pub async fn authorized(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let client = telephony(&state)?;
    let authenticated = client.is_authenticated(auth.user_id).await?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "authenticated": authenticated
    }))))
}

/// Place a ring-out call
pub async fn place_call(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<PlaceCallRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    request.validate()?;

    let client = telephony(&state)?;
    let call = client
        .place_call(auth.user_id, &request.from, &request.to)
        .await?;

    log_communication(
        &state,
        &auth,
        request.lead_id,
        request.client_id,
        "call",
        "initiated",
        Some(format!("Outbound call to {}", request.to)),
    )
    .await;

    tracing::info!(
        call_id = %call.id,
        user_id = %auth.user_id,
        "Ring-out call placed"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(serde_json::json!({ "call": call }))),
    ))
}

/// Send an SMS
pub async fn send_sms(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<SendSmsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    request.validate()?;

    let client = telephony(&state)?;
    let message = client
        .send_sms(auth.user_id, &request.from, &request.to, &request.text)
        .await?;

    log_communication(
        &state,
        &auth,
        request.lead_id,
        request.client_id,
        "sms",
        "sent",
        Some(request.text),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(serde_json::json!({ "message": message }))),
    ))
}

/// Cancel an in-progress ring-out call
pub async fn hangup(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<HangupRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    if request.call_id.trim().is_empty() {
        return Err(AppError::field_validation("call_id", "Must not be empty"));
    }

    let client = telephony(&state)?;
    client.end_call(auth.user_id, &request.call_id).await?;

    Ok(Json(ApiResponse::ok(serde_json::json!({ "ended": true }))))
}

/// Drop the caller's stored vendor tokens
pub async fn disconnect(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let client = telephony(&state)?;
    client.disconnect(auth.user_id).await?;

    tracing::info!(user_id = %auth.user_id, "Telephony tokens cleared");

    Ok(Json(ApiResponse::ok(serde_json::json!({ "disconnected": true }))))
}
