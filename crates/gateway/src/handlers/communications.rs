//! Communication log handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::{ensure_one_of, ApiResponse, ListResponse};
use crate::AppState;
use policydesk_common::{
    auth::AuthContext,
    db::models::{Communication, COMM_DIRECTIONS, COMM_TYPES},
    db::{CommunicationFilter, NewCommunication, Repository},
    errors::{AppError, Result},
    metrics::record_entity_op,
    pagination::{PageMeta, PageRequest},
};

#[derive(Debug, Deserialize)]
pub struct ListCommunicationsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub lead_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub comm_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommunicationRequest {
    pub lead_id: Option<Uuid>,
    pub client_id: Option<Uuid>,

    #[serde(rename = "type")]
    pub comm_type: String,

    pub direction: String,

    /// Free-form workflow status ("completed", "initiated", ...)
    #[validate(length(min = 1, max = 50))]
    pub status: String,

    #[validate(length(max = 500))]
    pub subject: Option<String>,

    pub content: Option<String>,

    #[validate(range(min = 0))]
    pub duration_secs: Option<i32>,

    pub ai_summary: Option<String>,
    pub ai_sentiment: Option<String>,
}

/// List communications with filters and pagination
pub async fn list_communications(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListCommunicationsQuery>,
) -> Result<Json<ListResponse<Communication>>> {
    let repo = Repository::new(state.db.clone());
    let page = PageRequest::new(query.page, query.limit);

    let filter = CommunicationFilter {
        lead_id: query.lead_id,
        client_id: query.client_id,
        comm_type: query.comm_type,
        status: query.status,
    };

    let (communications, total) = repo
        .list_communications(auth.workspace_id, &filter, &page)
        .await?;

    Ok(Json(ListResponse::ok(
        communications,
        PageMeta::new(&page, total),
    )))
}

/// A communication hangs off exactly one parent: a lead or a client,
/// never both and never neither.
fn ensure_single_parent(lead_id: Option<Uuid>, client_id: Option<Uuid>) -> Result<()> {
    match (lead_id, client_id) {
        (Some(_), Some(_)) => Err(AppError::validation(
            "A communication must reference either a lead_id or a client_id, not both",
        )),
        (None, None) => Err(AppError::validation(
            "A communication must reference a lead_id or a client_id",
        )),
        _ => Ok(()),
    }
}

/// Log a communication against a lead or client
pub async fn create_communication(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateCommunicationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Communication>>)> {
    request.validate()?;
    ensure_one_of("type", &request.comm_type, COMM_TYPES)?;
    ensure_one_of("direction", &request.direction, COMM_DIRECTIONS)?;

    ensure_single_parent(request.lead_id, request.client_id)?;

    let repo = Repository::new(state.db.clone());

    // Referenced parents must exist in the caller's workspace
    if let Some(lead_id) = request.lead_id {
        repo.find_lead(auth.workspace_id, lead_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "lead",
                id: lead_id.to_string(),
            })?;
    }
    if let Some(client_id) = request.client_id {
        repo.find_client(auth.workspace_id, client_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "client",
                id: client_id.to_string(),
            })?;
    }

    let communication = repo
        .create_communication(
            auth.workspace_id,
            auth.user_id,
            NewCommunication {
                lead_id: request.lead_id,
                client_id: request.client_id,
                comm_type: request.comm_type,
                direction: request.direction,
                status: request.status,
                subject: request.subject,
                content: request.content,
                duration_secs: request.duration_secs,
                ai_summary: request.ai_summary,
                ai_sentiment: request.ai_sentiment,
            },
        )
        .await?;

    record_entity_op("communication", "create");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(communication))))
}

/// Get a communication by ID
pub async fn get_communication(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Communication>>> {
    let repo = Repository::new(state.db.clone());

    let communication = repo
        .find_communication(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "communication",
            id: id.to_string(),
        })?;

    Ok(Json(ApiResponse::ok(communication)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_reference_requires_exactly_one() {
        let lead = Some(Uuid::new_v4());
        let client = Some(Uuid::new_v4());

        assert!(ensure_single_parent(lead, None).is_ok());
        assert!(ensure_single_parent(None, client).is_ok());
        assert!(ensure_single_parent(None, None).is_err());
        assert!(ensure_single_parent(lead, client).is_err());
    }
}
