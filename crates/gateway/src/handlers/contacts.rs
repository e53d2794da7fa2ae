//! Contact management handlers

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
    db::models::{Contact, LIFECYCLE_STAGES},
    db::{ContactBulkPatch, ContactFilter, ContactPatch, ContactSort, NewContact, Repository},
    errors::{AppError, Result},
    metrics::record_entity_op,
    pagination::{PageMeta, PageRequest, SortDir},
};

#[derive(Debug, Deserialize)]
pub struct ListContactsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub lifecycle_stage: Option<String>,
    pub account_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub sort: ContactSort,
    #[serde(default)]
    pub order: SortDir,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100))]
    pub last_name: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    #[validate(length(max = 30))]
    pub mobile_phone: Option<String>,

    /// Defaults to "lead" when omitted
    pub lifecycle_stage: Option<String>,

    #[validate(length(max = 200))]
    pub job_title: Option<String>,

    #[validate(length(max = 200))]
    pub occupation: Option<String>,

    pub account_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub lead_source: Option<String>,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub custom_fields: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    #[validate(length(max = 30))]
    pub mobile_phone: Option<String>,

    pub lifecycle_stage: Option<String>,

    #[validate(length(max = 200))]
    pub job_title: Option<String>,

    #[validate(length(max = 200))]
    pub occupation: Option<String>,

    pub account_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub lead_source: Option<String>,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub custom_fields: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateContactsRequest {
    pub ids: Vec<Uuid>,
    pub lifecycle_stage: Option<String>,
    pub owner_id: Option<Uuid>,
}

/// List contacts with filters and pagination
pub async fn list_contacts(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListContactsQuery>,
) -> Result<Json<ListResponse<Contact>>> {
    let repo = Repository::new(state.db.clone());
    let page = PageRequest::new(query.page, query.limit);

    let filter = ContactFilter {
        search: query.search,
        lifecycle_stage: query.lifecycle_stage,
        account_id: query.account_id,
        owner_id: query.owner_id,
    };

    let (contacts, total) = repo
        .list_contacts(auth.workspace_id, &filter, query.sort, query.order, &page)
        .await?;

    Ok(Json(ListResponse::ok(contacts, PageMeta::new(&page, total))))
}

/// Create a new contact
pub async fn create_contact(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Contact>>)> {
    request.validate()?;

    let lifecycle_stage = request.lifecycle_stage.unwrap_or_else(|| "lead".to_string());
    ensure_one_of("lifecycle_stage", &lifecycle_stage, LIFECYCLE_STAGES)?;

    let repo = Repository::new(state.db.clone());
    let contact = repo
        .create_contact(
            auth.workspace_id,
            auth.user_id,
            NewContact {
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                phone: request.phone,
                mobile_phone: request.mobile_phone,
                lifecycle_stage,
                job_title: request.job_title,
                occupation: request.occupation,
                account_id: request.account_id,
                owner_id: request.owner_id.or(Some(auth.user_id)),
                lead_source: request.lead_source,
                date_of_birth: request.date_of_birth,
                custom_fields: request.custom_fields,
            },
        )
        .await?;

    record_entity_op("contact", "create");
    tracing::info!(
        contact_id = %contact.id,
        workspace_id = %auth.workspace_id,
        "Contact created"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(contact))))
}

/// Get a contact by ID
pub async fn get_contact(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Contact>>> {
    let repo = Repository::new(state.db.clone());

    let contact = repo
        .find_contact(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "contact",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(contact.created_by, contact.owner_id),
    )?;

    Ok(Json(ApiResponse::ok(contact)))
}

/// Update a contact
pub async fn update_contact(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateContactRequest>,
) -> Result<Json<ApiResponse<Contact>>> {
    request.validate()?;

    if let Some(ref stage) = request.lifecycle_stage {
        ensure_one_of("lifecycle_stage", stage, LIFECYCLE_STAGES)?;
    }

    let repo = Repository::new(state.db.clone());

    let existing = repo
        .find_contact(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "contact",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(existing.created_by, existing.owner_id),
    )?;

    let contact = repo
        .update_contact(
            auth.workspace_id,
            id,
            ContactPatch {
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                phone: request.phone,
                mobile_phone: request.mobile_phone,
                lifecycle_stage: request.lifecycle_stage,
                job_title: request.job_title,
                occupation: request.occupation,
                account_id: request.account_id,
                owner_id: request.owner_id,
                lead_source: request.lead_source,
                date_of_birth: request.date_of_birth,
                custom_fields: request.custom_fields,
            },
        )
        .await?;

    record_entity_op("contact", "update");

    Ok(Json(ApiResponse::ok(contact)))
}

/// Delete a contact
pub async fn delete_contact(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let repo = Repository::new(state.db.clone());

    let existing = repo
        .find_contact(auth.workspace_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "contact",
            id: id.to_string(),
        })?;

    require_access(
        auth.user_id,
        auth.role,
        &RecordAccess::new(existing.created_by, existing.owner_id),
    )?;

    repo.delete_contact(auth.workspace_id, id).await?;

    record_entity_op("contact", "delete");
    tracing::info!(contact_id = %id, workspace_id = %auth.workspace_id, "Contact deleted");

    Ok(Json(ApiResponse::ok(serde_json::json!({ "deleted": true }))))
}

/// Apply one patch to a batch of contacts
pub async fn bulk_update_contacts(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<BulkUpdateContactsRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    if request.ids.is_empty() {
        return Err(AppError::validation("ids must not be empty"));
    }
    if request.lifecycle_stage.is_none() && request.owner_id.is_none() {
        return Err(AppError::validation(
            "At least one of lifecycle_stage or owner_id is required",
        ));
    }
    if let Some(ref stage) = request.lifecycle_stage {
        ensure_one_of("lifecycle_stage", stage, LIFECYCLE_STAGES)?;
    }

    let repo = Repository::new(state.db.clone());
    let updated = repo
        .bulk_update_contacts(
            auth.workspace_id,
            &request.ids,
            ContactBulkPatch {
                lifecycle_stage: request.lifecycle_stage,
                owner_id: request.owner_id,
            },
        )
        .await?;

    record_entity_op("contact", "update");
    tracing::info!(
        updated,
        requested = request.ids.len(),
        workspace_id = %auth.workspace_id,
        "Bulk contact update"
    );

    Ok(Json(ApiResponse::ok(serde_json::json!({ "updated": updated }))))
}
