//! Client management handlers

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
    access::{require_access, RecordAccess},
    auth::AuthContext,
    db::models::{Client, CLIENT_TYPES},
    db::{AddressInput, ClientDetail, ClientFilter, ClientPatch, NewClient, Repository},
    errors::{AppError, Result},
    metrics::record_entity_op,
    pagination::{PageMeta, PageRequest, SortDir},
};

#[derive(Debug, Deserialize)]
pub struct ListClientsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub client_type: Option<String>,
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub order: SortDir,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    /// "Individual" or "Business"
    pub client_type: String,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 30))]
    pub phone_number: Option<String>,

    pub referred_by: Option<String>,
    pub date_of_birth: Option<chrono::NaiveDate>,

    /// Lead this client was converted from
    pub lead_id: Option<Uuid>,

    pub assigned_to: Option<Uuid>,
    pub address: Option<AddressInput>,
    pub mailing_address: Option<AddressInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    pub client_type: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 30))]
    pub phone_number: Option<String>,

    pub referred_by: Option<String>,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub address: Option<AddressInput>,
    pub mailing_address: Option<AddressInput>,
}

/// List clients with filters and pagination
pub async fn list_clients(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<ListResponse<Client>>> {
    let repo = Repository::new(state.db.clone());
    let page = PageRequest::new(query.page, query.limit);

    let filter = ClientFilter {
        search: query.search,
        client_type: query.client_type,
        assigned_to: query.assigned_to,
    };

    let (clients, total) = repo
        .list_clients(auth.workspace_id, &filter, query.order, &page)
        .await?;

    Ok(Json(ListResponse::ok(clients, PageMeta::new(&page, total))))
}

/// Create a new client, optionally converting from a lead
pub async fn create_client(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Client>>)> {
    request.validate()?;
    ensure_one_of("client_type", &request.client_type, CLIENT_TYPES)?;

    let repo = Repository::new(state.db.clone());

    // A converted lead must exist in the caller's workspace
    if let Some(lead_id) = request.lead_id {
        repo.find_lead(auth.workspace_id, lead_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "lead",
                id: lead_id.to_string(),
            })?;
    }

    let client = repo
        .create_client(
            auth.workspace_id,
            auth.user_id,
            NewClient {
                client_type: request.client_type,
                name: request.name,
                email: request.email,
                phone_number: request.phone_number,
                referred_by: request.referred_by,
                date_of_birth: request.date_of_birth,
                lead_id: request.lead_id,
                assigned_to: request.assigned_to.or(Some(auth.user_id)),
                address: request.address,
                mailing_address: request.mailing_address,
            },
        )
        .await?;

    record_entity_op("client", "create");
    tracing::info!(
        client_id = %client.id,
        workspace_id = %auth.workspace_id,
        "Client created"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(client))))
}

/// Get a client with its addresses and recent communications
pub async fn get_client(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ClientDetail>>> {
    let repo = Repository::new(state.db.clone());

    let detail = repo
        .find_client_detail(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "client",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(detail.client.created_by, detail.client.assigned_to),
    )?;

    Ok(Json(ApiResponse::ok(detail)))
}

/// Update a client, upserting any nested address payloads
pub async fn update_client(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<ApiResponse<Client>>> {
    request.validate()?;

    if let Some(ref client_type) = request.client_type {
        ensure_one_of("client_type", client_type, CLIENT_TYPES)?;
    }

    let repo = Repository::new(state.db.clone());

    let existing = repo
        .find_client(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "client",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(existing.created_by, existing.assigned_to),
    )?;

    let client = repo
        .update_client(
            auth.workspace_id,
            id,
            ClientPatch {
                client_type: request.client_type,
                name: request.name,
                email: request.email,
                phone_number: request.phone_number,
                referred_by: request.referred_by,
                date_of_birth: request.date_of_birth,
                assigned_to: request.assigned_to,
                address: request.address,
                mailing_address: request.mailing_address,
            },
        )
        .await?;

    record_entity_op("client", "update");

    Ok(Json(ApiResponse::ok(client)))
}

/// Delete a client
pub async fn delete_client(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let repo = Repository::new(state.db.clone());

    let existing = repo
        .find_client(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "client",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(existing.created_by, existing.assigned_to),
    )?;

    repo.delete_client(auth.workspace_id, id).await?;

    record_entity_op("client", "delete");
    tracing::info!(client_id = %id, workspace_id = %auth.workspace_id, "Client deleted");

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}
