//! Quote management handlers

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
    db::models::{Quote, CONTRACT_TERMS},
    db::{NewQuote, QuoteFilter, QuotePatch, Repository},
    errors::{AppError, Result},
    metrics::record_entity_op,
    pagination::{PageMeta, PageRequest, SortDir},
};

#[derive(Debug, Deserialize)]
pub struct ListQuotesQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub lead_id: Option<Uuid>,
    pub carrier: Option<String>,
    #[serde(default)]
    pub order: SortDir,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuoteRequest {
    pub lead_id: Uuid,

    #[validate(length(min = 1, max = 200))]
    pub carrier: String,

    #[validate(range(min = 0.0))]
    pub paid_in_full_amount: Option<f64>,

    #[validate(range(min = 0.0))]
    pub monthly_payment_amount: Option<f64>,

    #[validate(range(min = 0.0))]
    pub down_payment_amount: Option<f64>,

    /// "6mo" or "12mo"
    pub contract_term: String,

    pub coverage_limits: Option<serde_json::Value>,
    pub deductibles: Option<serde_json::Value>,
    pub competitor_comparisons: Option<serde_json::Value>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub ai_score: Option<f64>,

    pub ai_notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuoteRequest {
    #[validate(length(min = 1, max = 200))]
    pub carrier: Option<String>,

    #[validate(range(min = 0.0))]
    pub paid_in_full_amount: Option<f64>,

    #[validate(range(min = 0.0))]
    pub monthly_payment_amount: Option<f64>,

    #[validate(range(min = 0.0))]
    pub down_payment_amount: Option<f64>,

    pub contract_term: Option<String>,
    pub coverage_limits: Option<serde_json::Value>,
    pub deductibles: Option<serde_json::Value>,
    pub competitor_comparisons: Option<serde_json::Value>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub ai_score: Option<f64>,

    pub ai_notes: Option<String>,
}

/// List quotes with filters and pagination
pub async fn list_quotes(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListQuotesQuery>,
) -> Result<Json<ListResponse<Quote>>> {
    let repo = Repository::new(state.db.clone());
    let page = PageRequest::new(query.page, query.limit);

    let filter = QuoteFilter {
        lead_id: query.lead_id,
        carrier: query.carrier,
    };

    let (quotes, total) = repo
        .list_quotes(auth.workspace_id, &filter, query.order, &page)
        .await?;

    Ok(Json(ListResponse::ok(quotes, PageMeta::new(&page, total))))
}

/// Create a new quote against a lead
pub async fn create_quote(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Quote>>)> {
    request.validate()?;
    ensure_one_of("contract_term", &request.contract_term, CONTRACT_TERMS)?;

    let repo = Repository::new(state.db.clone());

    // Quotes inherit access from their lead
    let lead = repo
        .find_lead(auth.workspace_id, request.lead_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "lead",
            id: request.lead_id.to_string(),
        })?;
    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(lead.created_by, lead.assigned_to),
    )?;

    let quote = repo
        .create_quote(
            auth.workspace_id,
            auth.user_id,
            NewQuote {
                lead_id: request.lead_id,
                carrier: request.carrier,
                paid_in_full_amount: request.paid_in_full_amount,
                monthly_payment_amount: request.monthly_payment_amount,
                down_payment_amount: request.down_payment_amount,
                contract_term: request.contract_term,
                coverage_limits: request.coverage_limits,
                deductibles: request.deductibles,
                competitor_comparisons: request.competitor_comparisons,
                ai_score: request.ai_score,
                ai_notes: request.ai_notes,
            },
        )
        .await?;

    record_entity_op("quote", "create");
    tracing::info!(
        quote_id = %quote.id,
        lead_id = %quote.lead_id,
        workspace_id = %auth.workspace_id,
        "Quote created"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(quote))))
}

/// Access to a quote follows its parent lead
async fn require_quote_access(
    repo: &Repository,
    auth: &AuthContext,
    quote: &Quote,
) -> Result<()> {
    let lead = repo.find_lead(auth.workspace_id, quote.lead_id).await?;
    let record = match lead {
        Some(lead) => RecordAccess::new(lead.created_by, lead.assigned_to),
        // Orphaned quote: fall back to the quote's own creator
        None => RecordAccess::new(quote.created_by, None),
    };
    require_access(auth.user_id, auth.role, &record)
}

/// Get a quote by ID
pub async fn get_quote(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Quote>>> {
    let repo = Repository::new(state.db.clone());

    let quote = repo
        .find_quote(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "quote",
            id: id.to_string(),
        })?;

    require_quote_access(&repo, &auth, &quote).await?;

    Ok(Json(ApiResponse::ok(quote)))
}

/// Update a quote
pub async fn update_quote(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateQuoteRequest>,
) -> Result<Json<ApiResponse<Quote>>> {
    request.validate()?;

    if let Some(ref term) = request.contract_term {
        ensure_one_of("contract_term", term, CONTRACT_TERMS)?;
    }

    let repo = Repository::new(state.db.clone());

    let existing = repo
        .find_quote(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "quote",
            id: id.to_string(),
        })?;

    require_quote_access(&repo, &auth, &existing).await?;

    let quote = repo
        .update_quote(
            auth.workspace_id,
            id,
            QuotePatch {
                carrier: request.carrier,
                paid_in_full_amount: request.paid_in_full_amount,
                monthly_payment_amount: request.monthly_payment_amount,
                down_payment_amount: request.down_payment_amount,
                contract_term: request.contract_term,
                coverage_limits: request.coverage_limits,
                deductibles: request.deductibles,
                competitor_comparisons: request.competitor_comparisons,
                ai_score: request.ai_score,
                ai_notes: request.ai_notes,
            },
        )
        .await?;

    record_entity_op("quote", "update");

    Ok(Json(ApiResponse::ok(quote)))
}

/// Delete a quote
pub async fn delete_quote(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let repo = Repository::new(state.db.clone());

    let existing = repo
        .find_quote(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "quote",
            id: id.to_string(),
        })?;

    require_quote_access(&repo, &auth, &existing).await?;

    repo.delete_quote(auth.workspace_id, id).await?;

    record_entity_op("quote", "delete");

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}
