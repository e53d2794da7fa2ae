//! Opportunity management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::{ApiResponse, ListResponse};
use crate::AppState;
use policydesk_common::{
    access::{require_access, RecordAccess},
    auth::AuthContext,
    db::models::{Opportunity, BUSINESS_STAGES, PERSONAL_STAGES},
    db::{NewOpportunity, OpportunityFilter, OpportunityPatch, Repository},
    errors::{AppError, Result},
    metrics::record_entity_op,
    pagination::{PageMeta, PageRequest, SortDir},
};

#[derive(Debug, Deserialize)]
pub struct ListOpportunitiesQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub stage: Option<String>,
    pub contact_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub order: SortDir,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOpportunityRequest {
    pub contact_id: Option<Uuid>,
    pub account_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(range(min = 0.0))]
    pub amount: f64,

    pub stage: String,

    #[validate(range(min = 0, max = 100))]
    pub probability: i32,

    pub close_date: Option<chrono::NaiveDate>,
    pub coverage_details: Option<serde_json::Value>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOpportunityRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(range(min = 0.0))]
    pub amount: Option<f64>,

    pub stage: Option<String>,

    #[validate(range(min = 0, max = 100))]
    pub probability: Option<i32>,

    pub close_date: Option<chrono::NaiveDate>,
    pub coverage_details: Option<serde_json::Value>,
    pub owner_id: Option<Uuid>,
}

/// Personal and business pipelines share most stages; a stage is valid if
/// either line of business uses it.
fn validate_stage(stage: &str) -> Result<()> {
    if PERSONAL_STAGES.contains(&stage) || BUSINESS_STAGES.contains(&stage) {
        Ok(())
    } else {
        Err(AppError::field_validation(
            "stage",
            format!("Unknown opportunity stage: {}", stage),
        ))
    }
}

/// List opportunities with filters and pagination
pub async fn list_opportunities(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListOpportunitiesQuery>,
) -> Result<Json<ListResponse<Opportunity>>> {
    let repo = Repository::new(state.db.clone());
    let page = PageRequest::new(query.page, query.limit);

    let filter = OpportunityFilter {
        search: query.search,
        stage: query.stage,
        contact_id: query.contact_id,
        account_id: query.account_id,
        owner_id: query.owner_id,
    };

    let (opportunities, total) = repo
        .list_opportunities(auth.workspace_id, &filter, query.order, &page)
        .await?;

    Ok(Json(ListResponse::ok(
        opportunities,
        PageMeta::new(&page, total),
    )))
}

/// Create a new opportunity
pub async fn create_opportunity(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateOpportunityRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Opportunity>>)> {
    request.validate()?;
    validate_stage(&request.stage)?;

    let repo = Repository::new(state.db.clone());

    // Linked contact must exist in the caller's workspace
    if let Some(contact_id) = request.contact_id {
        repo.find_contact(auth.workspace_id, contact_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "contact",
                id: contact_id.to_string(),
            })?;
    }

    let opportunity = repo
        .create_opportunity(
            auth.workspace_id,
            auth.user_id,
            NewOpportunity {
                contact_id: request.contact_id,
                account_id: request.account_id,
                name: request.name,
                amount: request.amount,
                stage: request.stage,
                probability: request.probability,
                close_date: request.close_date,
                coverage_details: request.coverage_details,
                owner_id: request.owner_id.or(Some(auth.user_id)),
            },
        )
        .await?;

    record_entity_op("opportunity", "create");
    tracing::info!(
        opportunity_id = %opportunity.id,
        workspace_id = %auth.workspace_id,
        "Opportunity created"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(opportunity))))
}

/// Get an opportunity by ID
pub async fn get_opportunity(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Opportunity>>> {
    let repo = Repository::new(state.db.clone());

    let opportunity = repo
        .find_opportunity(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "opportunity",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(opportunity.created_by, opportunity.owner_id),
    )?;

    Ok(Json(ApiResponse::ok(opportunity)))
}

/// Update an opportunity
pub async fn update_opportunity(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOpportunityRequest>,
) -> Result<Json<ApiResponse<Opportunity>>> {
    request.validate()?;

    if let Some(ref stage) = request.stage {
        validate_stage(stage)?;
    }

    let repo = Repository::new(state.db.clone());

    let existing = repo
        .find_opportunity(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "opportunity",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(existing.created_by, existing.owner_id),
    )?;

    let opportunity = repo
        .update_opportunity(
            auth.workspace_id,
            id,
            OpportunityPatch {
                name: request.name,
                amount: request.amount,
                stage: request.stage,
                probability: request.probability,
                close_date: request.close_date,
                coverage_details: request.coverage_details,
                owner_id: request.owner_id,
            },
        )
        .await?;

    record_entity_op("opportunity", "update");

    Ok(Json(ApiResponse::ok(opportunity)))
}

/// Delete an opportunity
pub async fn delete_opportunity(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let repo = Repository::new(state.db.clone());

    let existing = repo
        .find_opportunity(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "opportunity",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(existing.created_by, existing.owner_id),
    )?;

    repo.delete_opportunity(auth.workspace_id, id).await?;

    record_entity_op("opportunity", "delete");

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_validation_accepts_both_lines() {
        assert!(validate_stage("intake").is_ok());
        assert!(validate_stage("underwriting").is_ok());
        assert!(validate_stage("won").is_err());
    }
}
