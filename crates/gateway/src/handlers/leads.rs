//! Lead management handlers

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
    db::models::{Lead, INSURANCE_TYPES},
    db::{
        AddressInput, LeadBulkPatch, LeadDetail, LeadFilter, LeadPatch, LeadSort, NewLead,
        Repository,
    },
    errors::{AppError, Result},
    metrics::record_entity_op,
    pagination::{PageMeta, PageRequest, SortDir},
};

#[derive(Debug, Deserialize)]
pub struct ListLeadsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub pipeline_id: Option<i32>,
    pub status_id: Option<i32>,
    pub insurance_type: Option<String>,
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub sort: LeadSort,
    #[serde(default)]
    pub order: SortDir,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLeadRequest {
    pub pipeline_id: i32,

    /// Defaults to the pipeline's intake status when omitted
    pub status_id: Option<i32>,

    /// Defaults to "Auto" when omitted
    pub insurance_type: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100))]
    pub last_name: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    pub source: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub current_carrier: Option<String>,

    #[validate(range(min = 0.0))]
    pub premium: Option<f64>,

    #[validate(range(min = 0.0))]
    pub auto_premium: Option<f64>,

    #[validate(range(min = 0.0))]
    pub home_premium: Option<f64>,

    #[validate(range(min = 0.0))]
    pub specialty_premium: Option<f64>,

    pub additional_insureds: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLeadRequest {
    pub status_id: Option<i32>,
    pub insurance_type: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    pub source: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub current_carrier: Option<String>,

    #[validate(range(min = 0.0))]
    pub premium: Option<f64>,

    #[validate(range(min = 0.0))]
    pub auto_premium: Option<f64>,

    #[validate(range(min = 0.0))]
    pub home_premium: Option<f64>,

    #[validate(range(min = 0.0))]
    pub specialty_premium: Option<f64>,

    pub additional_insureds: Option<serde_json::Value>,

    /// Nested address payload; upserted against the lead's current
    /// physical address
    pub address: Option<AddressInput>,

    /// Nested mailing address payload
    pub mailing_address: Option<AddressInput>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateLeadsRequest {
    pub ids: Vec<Uuid>,
    pub status_id: Option<i32>,
    pub assigned_to: Option<Uuid>,
}

/// Resolve and verify the status for a lead write. A status from another
/// pipeline is rejected; an omitted status falls back to the pipeline's
/// intake status.
async fn resolve_status(
    repo: &Repository,
    workspace_id: Uuid,
    pipeline_id: i32,
    status_id: Option<i32>,
) -> Result<i32> {
    let pipeline = repo
        .find_pipeline(workspace_id, pipeline_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "pipeline",
            id: pipeline_id.to_string(),
        })?;

    match status_id {
        Some(id) => {
            let status = repo
                .find_pipeline_status(id)
                .await?
                .filter(|s| s.pipeline_id == pipeline.id)
                .ok_or_else(|| {
                    AppError::field_validation(
                        "status_id",
                        format!("Status {} does not belong to pipeline {}", id, pipeline.id),
                    )
                })?;
            Ok(status.id)
        }
        None => {
            let status = repo
                .first_pipeline_status(pipeline.id)
                .await?
                .ok_or_else(|| {
                    AppError::field_validation("pipeline_id", "Pipeline has no statuses")
                })?;
            Ok(status.id)
        }
    }
}

/// List leads with filters and pagination
pub async fn list_leads(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListLeadsQuery>,
) -> Result<Json<ListResponse<Lead>>> {
    let repo = Repository::new(state.db.clone());
    let page = PageRequest::new(query.page, query.limit);

    let filter = LeadFilter {
        search: query.search,
        pipeline_id: query.pipeline_id,
        status_id: query.status_id,
        insurance_type: query.insurance_type,
        assigned_to: query.assigned_to,
    };

    let (leads, total) = repo
        .list_leads(auth.workspace_id, &filter, query.sort, query.order, &page)
        .await?;

    Ok(Json(ListResponse::ok(leads, PageMeta::new(&page, total))))
}

/// Create a new lead
pub async fn create_lead(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Lead>>)> {
    request.validate()?;

    let insurance_type = request
        .insurance_type
        .unwrap_or_else(|| "Auto".to_string());
    ensure_one_of("insurance_type", &insurance_type, INSURANCE_TYPES)?;

    let repo = Repository::new(state.db.clone());
    let status_id = resolve_status(
        &repo,
        auth.workspace_id,
        request.pipeline_id,
        request.status_id,
    )
    .await?;

    let lead = repo
        .create_lead(
            auth.workspace_id,
            auth.user_id,
            NewLead {
                pipeline_id: request.pipeline_id,
                status_id,
                insurance_type,
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                phone: request.phone,
                source: request.source,
                import_file_name: None,
                assigned_to: request.assigned_to,
                notes: request.notes,
                current_carrier: request.current_carrier,
                premium: request.premium,
                auto_premium: request.auto_premium,
                home_premium: request.home_premium,
                specialty_premium: request.specialty_premium,
                additional_insureds: request.additional_insureds,
            },
        )
        .await?;

    record_entity_op("lead", "create");
    tracing::info!(
        lead_id = %lead.id,
        workspace_id = %auth.workspace_id,
        pipeline_id = lead.pipeline_id,
        "Lead created"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(lead))))
}

/// Get a lead with its addresses and recent communications
pub async fn get_lead(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LeadDetail>>> {
    let repo = Repository::new(state.db.clone());

    let detail = repo
        .find_lead_detail(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "lead",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(detail.lead.created_by, detail.lead.assigned_to),
    )?;

    Ok(Json(ApiResponse::ok(detail)))
}

/// Update a lead, upserting any nested address payloads
pub async fn update_lead(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLeadRequest>,
) -> Result<Json<ApiResponse<Lead>>> {
    request.validate()?;

    if let Some(ref insurance_type) = request.insurance_type {
        ensure_one_of("insurance_type", insurance_type, INSURANCE_TYPES)?;
    }

    let repo = Repository::new(state.db.clone());

    let existing = repo
        .find_lead(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "lead",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(existing.created_by, existing.assigned_to),
    )?;

    // Status moves stay within the lead's own pipeline
    let status_id = match request.status_id {
        Some(status_id) => Some(
            resolve_status(
                &repo,
                auth.workspace_id,
                existing.pipeline_id,
                Some(status_id),
            )
            .await?,
        ),
        None => None,
    };

    let lead = repo
        .update_lead(
            auth.workspace_id,
            id,
            LeadPatch {
                status_id,
                insurance_type: request.insurance_type,
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                phone: request.phone,
                source: request.source,
                assigned_to: request.assigned_to,
                notes: request.notes,
                current_carrier: request.current_carrier,
                premium: request.premium,
                auto_premium: request.auto_premium,
                home_premium: request.home_premium,
                specialty_premium: request.specialty_premium,
                additional_insureds: request.additional_insureds,
                address: request.address,
                mailing_address: request.mailing_address,
            },
        )
        .await?;

    record_entity_op("lead", "update");

    Ok(Json(ApiResponse::ok(lead)))
}

/// Delete a lead. Restricted to admins and managers; the normal flow
/// closes a lead by moving it to a final pipeline status.
pub async fn delete_lead(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    if !auth.role.is_privileged() {
        return Err(AppError::Forbidden {
            message: "Only admins and managers can delete leads".to_string(),
        });
    }

    let repo = Repository::new(state.db.clone());
    let deleted = repo.delete_lead(auth.workspace_id, id).await?;
    if !deleted {
        return Err(AppError::NotFound {
            entity: "lead",
            id: id.to_string(),
        });
    }

    record_entity_op("lead", "delete");
    tracing::info!(lead_id = %id, workspace_id = %auth.workspace_id, "Lead deleted");

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}

/// Apply one patch to a batch of leads
pub async fn bulk_update_leads(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<BulkUpdateLeadsRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    if request.ids.is_empty() {
        return Err(AppError::validation("ids must not be empty"));
    }
    if request.status_id.is_none() && request.assigned_to.is_none() {
        return Err(AppError::validation(
            "At least one of status_id or assigned_to is required",
        ));
    }

    let repo = Repository::new(state.db.clone());

    // Bulk status moves are only valid when every lead shares the target
    // pipeline; the simple check is that the status itself exists.
    if let Some(status_id) = request.status_id {
        repo.find_pipeline_status(status_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "pipeline status",
                id: status_id.to_string(),
            })?;
    }

    let updated = repo
        .bulk_update_leads(
            auth.workspace_id,
            &request.ids,
            LeadBulkPatch {
                status_id: request.status_id,
                assigned_to: request.assigned_to,
            },
        )
        .await?;

    record_entity_op("lead", "update");
    tracing::info!(
        updated,
        requested = request.ids.len(),
        workspace_id = %auth.workspace_id,
        "Bulk lead update"
    );

    Ok(Json(ApiResponse::ok(serde_json::json!({ "updated": updated }))))
}
