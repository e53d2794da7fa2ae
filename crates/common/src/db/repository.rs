//! Repository pattern for database operations
//!
//! All data access goes through here: per-entity CRUD, filtered and
//! paginated lists, bulk updates, the address upsert workflow, and the
//! telephony token store. Every query that touches tenant data filters by
//! `workspace_id`, so a cross-workspace id behaves exactly like a missing
//! row.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::pagination::{PageRequest, SortDir};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of resolving an owner's address reference.
///
/// `Missing` marks a dangling reference: the owner points at an address row
/// that no longer exists. The upsert workflow branches on this tag and
/// creates a replacement instead of failing the owning update.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressResolution {
    Found(Address),
    Missing,
    None,
}

impl AddressResolution {
    pub fn of(reference: Option<Uuid>, found: Option<Address>) -> Self {
        match (reference, found) {
            (None, _) => AddressResolution::None,
            (Some(_), Some(addr)) => AddressResolution::Found(addr),
            (Some(_), None) => AddressResolution::Missing,
        }
    }
}

/// Nested address payload accepted on client/lead updates
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddressInput {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

// ============================================================================
// Input types
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile_phone: Option<String>,
    pub lifecycle_stage: String,
    pub job_title: Option<String>,
    pub occupation: Option<String>,
    pub account_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub lead_source: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub custom_fields: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile_phone: Option<String>,
    pub lifecycle_stage: Option<String>,
    pub job_title: Option<String>,
    pub occupation: Option<String>,
    pub account_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub lead_source: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub custom_fields: Option<serde_json::Value>,
}

/// Single patch applied to a batch of contact ids
#[derive(Debug, Clone, Default)]
pub struct ContactBulkPatch {
    pub lifecycle_stage: Option<String>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub search: Option<String>,
    pub lifecycle_stage: Option<String>,
    pub account_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactSort {
    FirstName,
    LastName,
    #[default]
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub pipeline_id: i32,
    pub status_id: i32,
    pub insurance_type: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub import_file_name: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub current_carrier: Option<String>,
    pub premium: Option<f64>,
    pub auto_premium: Option<f64>,
    pub home_premium: Option<f64>,
    pub specialty_premium: Option<f64>,
    pub additional_insureds: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct LeadPatch {
    pub status_id: Option<i32>,
    pub insurance_type: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub current_carrier: Option<String>,
    pub premium: Option<f64>,
    pub auto_premium: Option<f64>,
    pub home_premium: Option<f64>,
    pub specialty_premium: Option<f64>,
    pub additional_insureds: Option<serde_json::Value>,
    pub address: Option<AddressInput>,
    pub mailing_address: Option<AddressInput>,
}

#[derive(Debug, Clone, Default)]
pub struct LeadBulkPatch {
    pub status_id: Option<i32>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub search: Option<String>,
    pub pipeline_id: Option<i32>,
    pub status_id: Option<i32>,
    pub insurance_type: Option<String>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadSort {
    FirstName,
    LastName,
    Premium,
    #[default]
    CreatedAt,
    UpdatedAt,
}

/// Lead joined with its directly related records
#[derive(Debug, Clone, Serialize)]
pub struct LeadDetail {
    #[serde(flatten)]
    pub lead: Lead,
    pub address: Option<Address>,
    pub mailing_address: Option<Address>,
    pub recent_communications: Vec<Communication>,
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub client_type: String,
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub referred_by: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub lead_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub address: Option<AddressInput>,
    pub mailing_address: Option<AddressInput>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub client_type: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub referred_by: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    pub address: Option<AddressInput>,
    pub mailing_address: Option<AddressInput>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub search: Option<String>,
    pub client_type: Option<String>,
    pub assigned_to: Option<Uuid>,
}

/// Client joined with its addresses and recent activity
#[derive(Debug, Clone, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub address: Option<Address>,
    pub mailing_address: Option<Address>,
    pub recent_communications: Vec<Communication>,
}

#[derive(Debug, Clone, Default)]
pub struct NewOpportunity {
    pub contact_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub name: String,
    pub amount: f64,
    pub stage: String,
    pub probability: i32,
    pub close_date: Option<NaiveDate>,
    pub coverage_details: Option<serde_json::Value>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct OpportunityPatch {
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub stage: Option<String>,
    pub probability: Option<i32>,
    pub close_date: Option<NaiveDate>,
    pub coverage_details: Option<serde_json::Value>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
    pub search: Option<String>,
    pub stage: Option<String>,
    pub contact_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct NewQuote {
    pub lead_id: Uuid,
    pub carrier: String,
    pub paid_in_full_amount: Option<f64>,
    pub monthly_payment_amount: Option<f64>,
    pub down_payment_amount: Option<f64>,
    pub contract_term: String,
    pub coverage_limits: Option<serde_json::Value>,
    pub deductibles: Option<serde_json::Value>,
    pub competitor_comparisons: Option<serde_json::Value>,
    pub ai_score: Option<f64>,
    pub ai_notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QuotePatch {
    pub carrier: Option<String>,
    pub paid_in_full_amount: Option<f64>,
    pub monthly_payment_amount: Option<f64>,
    pub down_payment_amount: Option<f64>,
    pub contract_term: Option<String>,
    pub coverage_limits: Option<serde_json::Value>,
    pub deductibles: Option<serde_json::Value>,
    pub competitor_comparisons: Option<serde_json::Value>,
    pub ai_score: Option<f64>,
    pub ai_notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QuoteFilter {
    pub lead_id: Option<Uuid>,
    pub carrier: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCommunication {
    pub lead_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub comm_type: String,
    pub direction: String,
    pub status: String,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub duration_secs: Option<i32>,
    pub ai_summary: Option<String>,
    pub ai_sentiment: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CommunicationFilter {
    pub lead_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub comm_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub bucket: String,
    pub path: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub entity_type: String,
    pub entity_id: Uuid,
}

// ============================================================================
// Repository
// ============================================================================

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

fn order(dir: SortDir) -> Order {
    match dir {
        SortDir::Asc => Order::Asc,
        SortDir::Desc => Order::Desc,
    }
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User / Pipeline Operations
    // ========================================================================

    pub async fn find_user(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .filter(UserColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_pipeline(&self, workspace_id: Uuid, id: i32) -> Result<Option<Pipeline>> {
        PipelineEntity::find_by_id(id)
            .filter(PipelineColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Intake status: the pipeline's first status by display order
    pub async fn first_pipeline_status(&self, pipeline_id: i32) -> Result<Option<PipelineStatus>> {
        PipelineStatusEntity::find()
            .filter(PipelineStatusColumn::PipelineId.eq(pipeline_id))
            .order_by_asc(PipelineStatusColumn::DisplayOrder)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_pipeline_status(&self, id: i32) -> Result<Option<PipelineStatus>> {
        PipelineStatusEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Contact Operations
    // ========================================================================

    pub async fn create_contact(
        &self,
        workspace_id: Uuid,
        created_by: Uuid,
        input: NewContact,
    ) -> Result<Contact> {
        let now = Utc::now();

        let contact = ContactActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            email: Set(input.email),
            phone: Set(input.phone),
            mobile_phone: Set(input.mobile_phone),
            lifecycle_stage: Set(input.lifecycle_stage),
            job_title: Set(input.job_title),
            occupation: Set(input.occupation),
            account_id: Set(input.account_id),
            owner_id: Set(input.owner_id),
            lead_source: Set(input.lead_source),
            address_id: Set(None),
            date_of_birth: Set(input.date_of_birth),
            custom_fields: Set(input.custom_fields.unwrap_or_else(|| serde_json::json!({}))),
            last_contact_at: Set(None),
            next_contact_at: Set(None),
            created_by: Set(Some(created_by)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        contact.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn find_contact(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<Contact>> {
        ContactEntity::find_by_id(id)
            .filter(ContactColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_contacts(
        &self,
        workspace_id: Uuid,
        filter: &ContactFilter,
        sort: ContactSort,
        dir: SortDir,
        page: &PageRequest,
    ) -> Result<(Vec<Contact>, u64)> {
        let mut query = ContactEntity::find().filter(ContactColumn::WorkspaceId.eq(workspace_id));

        if let Some(ref term) = filter.search {
            let pat = format!("%{}%", term);
            query = query.filter(
                Condition::any()
                    .add(Expr::col(ContactColumn::FirstName).ilike(pat.clone()))
                    .add(Expr::col(ContactColumn::LastName).ilike(pat.clone()))
                    .add(Expr::col(ContactColumn::Email).ilike(pat.clone()))
                    .add(Expr::col(ContactColumn::Phone).ilike(pat)),
            );
        }
        if let Some(ref stage) = filter.lifecycle_stage {
            query = query.filter(ContactColumn::LifecycleStage.eq(stage.clone()));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(ContactColumn::AccountId.eq(account_id));
        }
        if let Some(owner_id) = filter.owner_id {
            query = query.filter(ContactColumn::OwnerId.eq(owner_id));
        }

        let sort_col = match sort {
            ContactSort::FirstName => ContactColumn::FirstName,
            ContactSort::LastName => ContactColumn::LastName,
            ContactSort::CreatedAt => ContactColumn::CreatedAt,
            ContactSort::UpdatedAt => ContactColumn::UpdatedAt,
        };

        let paginator = query
            .order_by(sort_col, order(dir))
            .paginate(self.read_conn(), page.limit());

        let total = paginator.num_items().await?;
        let contacts = paginator.fetch_page(page.page() - 1).await?;

        Ok((contacts, total))
    }

    pub async fn update_contact(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Contact> {
        let existing = self
            .find_contact(workspace_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "contact",
                id: id.to_string(),
            })?;

        let mut am = ContactActiveModel {
            id: Set(existing.id),
            ..Default::default()
        };

        if let Some(v) = patch.first_name {
            am.first_name = Set(v);
        }
        if let Some(v) = patch.last_name {
            am.last_name = Set(v);
        }
        if let Some(v) = patch.email {
            am.email = Set(Some(v));
        }
        if let Some(v) = patch.phone {
            am.phone = Set(Some(v));
        }
        if let Some(v) = patch.mobile_phone {
            am.mobile_phone = Set(Some(v));
        }
        if let Some(v) = patch.lifecycle_stage {
            am.lifecycle_stage = Set(v);
        }
        if let Some(v) = patch.job_title {
            am.job_title = Set(Some(v));
        }
        if let Some(v) = patch.occupation {
            am.occupation = Set(Some(v));
        }
        if let Some(v) = patch.account_id {
            am.account_id = Set(Some(v));
        }
        if let Some(v) = patch.owner_id {
            am.owner_id = Set(Some(v));
        }
        if let Some(v) = patch.lead_source {
            am.lead_source = Set(Some(v));
        }
        if let Some(v) = patch.date_of_birth {
            am.date_of_birth = Set(Some(v));
        }
        if let Some(v) = patch.custom_fields {
            am.custom_fields = Set(v);
        }
        am.updated_at = Set(Utc::now().into());

        am.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_contact(&self, workspace_id: Uuid, id: Uuid) -> Result<bool> {
        let result = ContactEntity::delete_many()
            .filter(ContactColumn::Id.eq(id))
            .filter(ContactColumn::WorkspaceId.eq(workspace_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Apply one patch to every listed contact inside the workspace. Ids
    /// from other workspaces are silently excluded by the filter.
    pub async fn bulk_update_contacts(
        &self,
        workspace_id: Uuid,
        ids: &[Uuid],
        patch: ContactBulkPatch,
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut am = <ContactActiveModel as Default>::default();
        if let Some(stage) = patch.lifecycle_stage {
            am.lifecycle_stage = Set(stage);
        }
        if let Some(owner) = patch.owner_id {
            am.owner_id = Set(Some(owner));
        }
        am.updated_at = Set(Utc::now().into());

        let result = ContactEntity::update_many()
            .set(am)
            .filter(ContactColumn::WorkspaceId.eq(workspace_id))
            .filter(ContactColumn::Id.is_in(ids.to_vec()))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    // ========================================================================
    // Lead Operations
    // ========================================================================

    pub async fn create_lead(
        &self,
        workspace_id: Uuid,
        created_by: Uuid,
        input: NewLead,
    ) -> Result<Lead> {
        let now = Utc::now();
        let lead = lead_active_model(workspace_id, Some(created_by), input, now);
        lead.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Batch insert for CSV import. Returns the number of rows inserted.
    pub async fn insert_leads(
        &self,
        workspace_id: Uuid,
        created_by: Uuid,
        inputs: Vec<NewLead>,
    ) -> Result<u64> {
        if inputs.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let models: Vec<LeadActiveModel> = inputs
            .into_iter()
            .map(|input| lead_active_model(workspace_id, Some(created_by), input, now))
            .collect();

        let inserted = LeadEntity::insert_many(models)
            .exec_without_returning(self.write_conn())
            .await?;

        Ok(inserted)
    }

    pub async fn find_lead(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<Lead>> {
        LeadEntity::find_by_id(id)
            .filter(LeadColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Lead joined with addresses and recent communications
    pub async fn find_lead_detail(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> Result<Option<LeadDetail>> {
        let Some(lead) = self.find_lead(workspace_id, id).await? else {
            return Ok(None);
        };

        let address = match lead.address_id {
            Some(addr_id) => self.find_address(addr_id).await?,
            None => None,
        };
        let mailing_address = match lead.mailing_address_id {
            Some(addr_id) => self.find_address(addr_id).await?,
            None => None,
        };
        let recent_communications = self.recent_communications_for_lead(workspace_id, id).await?;

        Ok(Some(LeadDetail {
            lead,
            address,
            mailing_address,
            recent_communications,
        }))
    }

    pub async fn list_leads(
        &self,
        workspace_id: Uuid,
        filter: &LeadFilter,
        sort: LeadSort,
        dir: SortDir,
        page: &PageRequest,
    ) -> Result<(Vec<Lead>, u64)> {
        let mut query = LeadEntity::find().filter(LeadColumn::WorkspaceId.eq(workspace_id));

        if let Some(ref term) = filter.search {
            let pat = format!("%{}%", term);
            query = query.filter(
                Condition::any()
                    .add(Expr::col(LeadColumn::FirstName).ilike(pat.clone()))
                    .add(Expr::col(LeadColumn::LastName).ilike(pat.clone()))
                    .add(Expr::col(LeadColumn::Email).ilike(pat.clone()))
                    .add(Expr::col(LeadColumn::Phone).ilike(pat)),
            );
        }
        if let Some(pipeline_id) = filter.pipeline_id {
            query = query.filter(LeadColumn::PipelineId.eq(pipeline_id));
        }
        if let Some(status_id) = filter.status_id {
            query = query.filter(LeadColumn::StatusId.eq(status_id));
        }
        if let Some(ref insurance_type) = filter.insurance_type {
            query = query.filter(LeadColumn::InsuranceType.eq(insurance_type.clone()));
        }
        if let Some(assigned_to) = filter.assigned_to {
            query = query.filter(LeadColumn::AssignedTo.eq(assigned_to));
        }

        let sort_col = match sort {
            LeadSort::FirstName => LeadColumn::FirstName,
            LeadSort::LastName => LeadColumn::LastName,
            LeadSort::Premium => LeadColumn::Premium,
            LeadSort::CreatedAt => LeadColumn::CreatedAt,
            LeadSort::UpdatedAt => LeadColumn::UpdatedAt,
        };

        let paginator = query
            .order_by(sort_col, order(dir))
            .paginate(self.read_conn(), page.limit());

        let total = paginator.num_items().await?;
        let leads = paginator.fetch_page(page.page() - 1).await?;

        Ok((leads, total))
    }

    /// Update a lead, upserting nested address payloads first. A dangling
    /// address reference is replaced, never fatal (see
    /// [`AddressResolution`]). The address write and the lead write are two
    /// sequential statements, not one transaction; a crash between them
    /// leaves an unlinked address that the next update self-heals.
    pub async fn update_lead(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        patch: LeadPatch,
    ) -> Result<Lead> {
        let existing = self
            .find_lead(workspace_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "lead",
                id: id.to_string(),
            })?;

        let address_id = match patch.address {
            Some(ref input) => Some(
                self.upsert_owned_address(existing.address_id, input, "Physical")
                    .await?,
            ),
            None => existing.address_id,
        };
        let mailing_address_id = match patch.mailing_address {
            Some(ref input) => Some(
                self.upsert_owned_address(existing.mailing_address_id, input, "Mailing")
                    .await?,
            ),
            None => existing.mailing_address_id,
        };

        let mut am = LeadActiveModel {
            id: Set(existing.id),
            ..Default::default()
        };

        if let Some(v) = patch.status_id {
            am.status_id = Set(v);
        }
        if let Some(v) = patch.insurance_type {
            am.insurance_type = Set(v);
        }
        if let Some(v) = patch.first_name {
            am.first_name = Set(v);
        }
        if let Some(v) = patch.last_name {
            am.last_name = Set(v);
        }
        if let Some(v) = patch.email {
            am.email = Set(Some(v));
        }
        if let Some(v) = patch.phone {
            am.phone = Set(Some(v));
        }
        if let Some(v) = patch.source {
            am.source = Set(Some(v));
        }
        if let Some(v) = patch.assigned_to {
            am.assigned_to = Set(Some(v));
        }
        if let Some(v) = patch.notes {
            am.notes = Set(Some(v));
        }
        if let Some(v) = patch.current_carrier {
            am.current_carrier = Set(Some(v));
        }
        if let Some(v) = patch.premium {
            am.premium = Set(Some(v));
        }
        if let Some(v) = patch.auto_premium {
            am.auto_premium = Set(Some(v));
        }
        if let Some(v) = patch.home_premium {
            am.home_premium = Set(Some(v));
        }
        if let Some(v) = patch.specialty_premium {
            am.specialty_premium = Set(Some(v));
        }
        if let Some(v) = patch.additional_insureds {
            am.additional_insureds = Set(v);
        }
        am.address_id = Set(address_id);
        am.mailing_address_id = Set(mailing_address_id);
        am.updated_at = Set(Utc::now().into());

        am.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_lead(&self, workspace_id: Uuid, id: Uuid) -> Result<bool> {
        let result = LeadEntity::delete_many()
            .filter(LeadColumn::Id.eq(id))
            .filter(LeadColumn::WorkspaceId.eq(workspace_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn bulk_update_leads(
        &self,
        workspace_id: Uuid,
        ids: &[Uuid],
        patch: LeadBulkPatch,
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut am = <LeadActiveModel as Default>::default();
        if let Some(status_id) = patch.status_id {
            am.status_id = Set(status_id);
        }
        if let Some(assigned_to) = patch.assigned_to {
            am.assigned_to = Set(Some(assigned_to));
        }
        am.updated_at = Set(Utc::now().into());

        let result = LeadEntity::update_many()
            .set(am)
            .filter(LeadColumn::WorkspaceId.eq(workspace_id))
            .filter(LeadColumn::Id.is_in(ids.to_vec()))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    // ========================================================================
    // Address Operations
    // ========================================================================

    pub async fn find_address(&self, id: Uuid) -> Result<Option<Address>> {
        AddressEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Resolve an owner's address reference to a tagged outcome
    pub async fn resolve_address(&self, reference: Option<Uuid>) -> Result<AddressResolution> {
        let found = match reference {
            Some(id) => self.find_address(id).await?,
            None => None,
        };
        Ok(AddressResolution::of(reference, found))
    }

    pub async fn create_address(
        &self,
        input: &AddressInput,
        address_type: &str,
    ) -> Result<Address> {
        let now = Utc::now();
        let address = AddressActiveModel {
            id: Set(Uuid::new_v4()),
            street: Set(input.street.clone()),
            city: Set(input.city.clone()),
            state: Set(input.state.clone()),
            zip_code: Set(input.zip_code.clone()),
            address_type: Set(address_type.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        address.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn update_address(&self, id: Uuid, input: &AddressInput) -> Result<Address> {
        let am = AddressActiveModel {
            id: Set(id),
            street: Set(input.street.clone()),
            city: Set(input.city.clone()),
            state: Set(input.state.clone()),
            zip_code: Set(input.zip_code.clone()),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        am.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Two-level fallback: update the referenced address in place; if the
    /// reference dangles or is absent, create a new address and hand back
    /// its id for the owner to rewire.
    pub async fn upsert_owned_address(
        &self,
        reference: Option<Uuid>,
        input: &AddressInput,
        address_type: &str,
    ) -> Result<Uuid> {
        match self.resolve_address(reference).await? {
            AddressResolution::Found(existing) => {
                self.update_address(existing.id, input).await?;
                Ok(existing.id)
            }
            AddressResolution::Missing => {
                tracing::warn!(
                    reference = ?reference,
                    "Dangling address reference, creating replacement"
                );
                let created = self.create_address(input, address_type).await?;
                Ok(created.id)
            }
            AddressResolution::None => {
                let created = self.create_address(input, address_type).await?;
                Ok(created.id)
            }
        }
    }

    // ========================================================================
    // Client Operations
    // ========================================================================

    pub async fn create_client(
        &self,
        workspace_id: Uuid,
        created_by: Uuid,
        input: NewClient,
    ) -> Result<Client> {
        let address_id = match input.address {
            Some(ref addr) => Some(self.create_address(addr, "Physical").await?.id),
            None => None,
        };
        let mailing_address_id = match input.mailing_address {
            Some(ref addr) => Some(self.create_address(addr, "Mailing").await?.id),
            None => None,
        };

        let now = Utc::now();
        let client = ClientActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            client_type: Set(input.client_type),
            name: Set(input.name),
            email: Set(input.email),
            phone_number: Set(input.phone_number),
            address_id: Set(address_id),
            mailing_address_id: Set(mailing_address_id),
            referred_by: Set(input.referred_by),
            date_of_birth: Set(input.date_of_birth),
            lead_id: Set(input.lead_id),
            assigned_to: Set(input.assigned_to),
            created_by: Set(Some(created_by)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        client.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn find_client(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<Client>> {
        ClientEntity::find_by_id(id)
            .filter(ClientColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_client_detail(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ClientDetail>> {
        let Some(client) = self.find_client(workspace_id, id).await? else {
            return Ok(None);
        };

        let address = match client.address_id {
            Some(addr_id) => self.find_address(addr_id).await?,
            None => None,
        };
        let mailing_address = match client.mailing_address_id {
            Some(addr_id) => self.find_address(addr_id).await?,
            None => None,
        };
        let recent_communications = self
            .recent_communications_for_client(workspace_id, id)
            .await?;

        Ok(Some(ClientDetail {
            client,
            address,
            mailing_address,
            recent_communications,
        }))
    }

    pub async fn list_clients(
        &self,
        workspace_id: Uuid,
        filter: &ClientFilter,
        dir: SortDir,
        page: &PageRequest,
    ) -> Result<(Vec<Client>, u64)> {
        let mut query = ClientEntity::find().filter(ClientColumn::WorkspaceId.eq(workspace_id));

        if let Some(ref term) = filter.search {
            let pat = format!("%{}%", term);
            query = query.filter(
                Condition::any()
                    .add(Expr::col(ClientColumn::Name).ilike(pat.clone()))
                    .add(Expr::col(ClientColumn::Email).ilike(pat.clone()))
                    .add(Expr::col(ClientColumn::PhoneNumber).ilike(pat)),
            );
        }
        if let Some(ref client_type) = filter.client_type {
            query = query.filter(ClientColumn::ClientType.eq(client_type.clone()));
        }
        if let Some(assigned_to) = filter.assigned_to {
            query = query.filter(ClientColumn::AssignedTo.eq(assigned_to));
        }

        let paginator = query
            .order_by(ClientColumn::CreatedAt, order(dir))
            .paginate(self.read_conn(), page.limit());

        let total = paginator.num_items().await?;
        let clients = paginator.fetch_page(page.page() - 1).await?;

        Ok((clients, total))
    }

    /// Client update with the address upsert workflow (same contract as
    /// [`Repository::update_lead`])
    pub async fn update_client(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        patch: ClientPatch,
    ) -> Result<Client> {
        let existing = self
            .find_client(workspace_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "client",
                id: id.to_string(),
            })?;

        let address_id = match patch.address {
            Some(ref input) => Some(
                self.upsert_owned_address(existing.address_id, input, "Physical")
                    .await?,
            ),
            None => existing.address_id,
        };
        let mailing_address_id = match patch.mailing_address {
            Some(ref input) => Some(
                self.upsert_owned_address(existing.mailing_address_id, input, "Mailing")
                    .await?,
            ),
            None => existing.mailing_address_id,
        };

        let mut am = ClientActiveModel {
            id: Set(existing.id),
            ..Default::default()
        };

        if let Some(v) = patch.client_type {
            am.client_type = Set(v);
        }
        if let Some(v) = patch.name {
            am.name = Set(v);
        }
        if let Some(v) = patch.email {
            am.email = Set(Some(v));
        }
        if let Some(v) = patch.phone_number {
            am.phone_number = Set(Some(v));
        }
        if let Some(v) = patch.referred_by {
            am.referred_by = Set(Some(v));
        }
        if let Some(v) = patch.date_of_birth {
            am.date_of_birth = Set(Some(v));
        }
        if let Some(v) = patch.assigned_to {
            am.assigned_to = Set(Some(v));
        }
        am.address_id = Set(address_id);
        am.mailing_address_id = Set(mailing_address_id);
        am.updated_at = Set(Utc::now().into());

        am.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_client(&self, workspace_id: Uuid, id: Uuid) -> Result<bool> {
        let result = ClientEntity::delete_many()
            .filter(ClientColumn::Id.eq(id))
            .filter(ClientColumn::WorkspaceId.eq(workspace_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Opportunity Operations
    // ========================================================================

    pub async fn create_opportunity(
        &self,
        workspace_id: Uuid,
        created_by: Uuid,
        input: NewOpportunity,
    ) -> Result<Opportunity> {
        let now = Utc::now();
        let opportunity = OpportunityActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            contact_id: Set(input.contact_id),
            account_id: Set(input.account_id),
            name: Set(input.name),
            amount: Set(input.amount),
            stage: Set(input.stage),
            probability: Set(input.probability),
            close_date: Set(input.close_date),
            coverage_details: Set(input
                .coverage_details
                .unwrap_or_else(|| serde_json::json!({}))),
            owner_id: Set(input.owner_id),
            created_by: Set(Some(created_by)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        opportunity.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn find_opportunity(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Opportunity>> {
        OpportunityEntity::find_by_id(id)
            .filter(OpportunityColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_opportunities(
        &self,
        workspace_id: Uuid,
        filter: &OpportunityFilter,
        dir: SortDir,
        page: &PageRequest,
    ) -> Result<(Vec<Opportunity>, u64)> {
        let mut query =
            OpportunityEntity::find().filter(OpportunityColumn::WorkspaceId.eq(workspace_id));

        if let Some(ref term) = filter.search {
            let pat = format!("%{}%", term);
            query = query.filter(Expr::col(OpportunityColumn::Name).ilike(pat));
        }
        if let Some(ref stage) = filter.stage {
            query = query.filter(OpportunityColumn::Stage.eq(stage.clone()));
        }
        if let Some(contact_id) = filter.contact_id {
            query = query.filter(OpportunityColumn::ContactId.eq(contact_id));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(OpportunityColumn::AccountId.eq(account_id));
        }
        if let Some(owner_id) = filter.owner_id {
            query = query.filter(OpportunityColumn::OwnerId.eq(owner_id));
        }

        let paginator = query
            .order_by(OpportunityColumn::CreatedAt, order(dir))
            .paginate(self.read_conn(), page.limit());

        let total = paginator.num_items().await?;
        let opportunities = paginator.fetch_page(page.page() - 1).await?;

        Ok((opportunities, total))
    }

    pub async fn update_opportunity(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        patch: OpportunityPatch,
    ) -> Result<Opportunity> {
        let existing = self
            .find_opportunity(workspace_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "opportunity",
                id: id.to_string(),
            })?;

        let mut am = OpportunityActiveModel {
            id: Set(existing.id),
            ..Default::default()
        };

        if let Some(v) = patch.name {
            am.name = Set(v);
        }
        if let Some(v) = patch.amount {
            am.amount = Set(v);
        }
        if let Some(v) = patch.stage {
            am.stage = Set(v);
        }
        if let Some(v) = patch.probability {
            am.probability = Set(v);
        }
        if let Some(v) = patch.close_date {
            am.close_date = Set(Some(v));
        }
        if let Some(v) = patch.coverage_details {
            am.coverage_details = Set(v);
        }
        if let Some(v) = patch.owner_id {
            am.owner_id = Set(Some(v));
        }
        am.updated_at = Set(Utc::now().into());

        am.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_opportunity(&self, workspace_id: Uuid, id: Uuid) -> Result<bool> {
        let result = OpportunityEntity::delete_many()
            .filter(OpportunityColumn::Id.eq(id))
            .filter(OpportunityColumn::WorkspaceId.eq(workspace_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Quote Operations
    // ========================================================================

    pub async fn create_quote(
        &self,
        workspace_id: Uuid,
        created_by: Uuid,
        input: NewQuote,
    ) -> Result<Quote> {
        let now = Utc::now();
        let quote = QuoteActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            lead_id: Set(input.lead_id),
            carrier: Set(input.carrier),
            paid_in_full_amount: Set(input.paid_in_full_amount),
            monthly_payment_amount: Set(input.monthly_payment_amount),
            down_payment_amount: Set(input.down_payment_amount),
            contract_term: Set(input.contract_term),
            coverage_limits: Set(input.coverage_limits.unwrap_or_else(|| serde_json::json!({}))),
            deductibles: Set(input.deductibles.unwrap_or_else(|| serde_json::json!({}))),
            competitor_comparisons: Set(input.competitor_comparisons),
            ai_score: Set(input.ai_score),
            ai_notes: Set(input.ai_notes),
            created_by: Set(Some(created_by)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        quote.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn find_quote(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<Quote>> {
        QuoteEntity::find_by_id(id)
            .filter(QuoteColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_quotes(
        &self,
        workspace_id: Uuid,
        filter: &QuoteFilter,
        dir: SortDir,
        page: &PageRequest,
    ) -> Result<(Vec<Quote>, u64)> {
        let mut query = QuoteEntity::find().filter(QuoteColumn::WorkspaceId.eq(workspace_id));

        if let Some(lead_id) = filter.lead_id {
            query = query.filter(QuoteColumn::LeadId.eq(lead_id));
        }
        if let Some(ref carrier) = filter.carrier {
            query = query.filter(QuoteColumn::Carrier.eq(carrier.clone()));
        }

        let paginator = query
            .order_by(QuoteColumn::CreatedAt, order(dir))
            .paginate(self.read_conn(), page.limit());

        let total = paginator.num_items().await?;
        let quotes = paginator.fetch_page(page.page() - 1).await?;

        Ok((quotes, total))
    }

    pub async fn update_quote(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        patch: QuotePatch,
    ) -> Result<Quote> {
        let existing = self
            .find_quote(workspace_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "quote",
                id: id.to_string(),
            })?;

        let mut am = QuoteActiveModel {
            id: Set(existing.id),
            ..Default::default()
        };

        if let Some(v) = patch.carrier {
            am.carrier = Set(v);
        }
        if let Some(v) = patch.paid_in_full_amount {
            am.paid_in_full_amount = Set(Some(v));
        }
        if let Some(v) = patch.monthly_payment_amount {
            am.monthly_payment_amount = Set(Some(v));
        }
        if let Some(v) = patch.down_payment_amount {
            am.down_payment_amount = Set(Some(v));
        }
        if let Some(v) = patch.contract_term {
            am.contract_term = Set(v);
        }
        if let Some(v) = patch.coverage_limits {
            am.coverage_limits = Set(v);
        }
        if let Some(v) = patch.deductibles {
            am.deductibles = Set(v);
        }
        if let Some(v) = patch.competitor_comparisons {
            am.competitor_comparisons = Set(Some(v));
        }
        if let Some(v) = patch.ai_score {
            am.ai_score = Set(Some(v));
        }
        if let Some(v) = patch.ai_notes {
            am.ai_notes = Set(Some(v));
        }
        am.updated_at = Set(Utc::now().into());

        am.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_quote(&self, workspace_id: Uuid, id: Uuid) -> Result<bool> {
        let result = QuoteEntity::delete_many()
            .filter(QuoteColumn::Id.eq(id))
            .filter(QuoteColumn::WorkspaceId.eq(workspace_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Communication Operations
    // ========================================================================

    pub async fn create_communication(
        &self,
        workspace_id: Uuid,
        created_by: Uuid,
        input: NewCommunication,
    ) -> Result<Communication> {
        let now = Utc::now();
        let communication = CommunicationActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            lead_id: Set(input.lead_id),
            client_id: Set(input.client_id),
            comm_type: Set(input.comm_type),
            direction: Set(input.direction),
            status: Set(input.status),
            subject: Set(input.subject),
            content: Set(input.content),
            duration_secs: Set(input.duration_secs),
            ai_summary: Set(input.ai_summary),
            ai_sentiment: Set(input.ai_sentiment),
            created_by: Set(Some(created_by)),
            created_at: Set(now.into()),
            completed_at: Set(None),
        };

        communication.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn find_communication(
        &self,
        workspace_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Communication>> {
        CommunicationEntity::find_by_id(id)
            .filter(CommunicationColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_communications(
        &self,
        workspace_id: Uuid,
        filter: &CommunicationFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Communication>, u64)> {
        let mut query =
            CommunicationEntity::find().filter(CommunicationColumn::WorkspaceId.eq(workspace_id));

        if let Some(lead_id) = filter.lead_id {
            query = query.filter(CommunicationColumn::LeadId.eq(lead_id));
        }
        if let Some(client_id) = filter.client_id {
            query = query.filter(CommunicationColumn::ClientId.eq(client_id));
        }
        if let Some(ref comm_type) = filter.comm_type {
            query = query.filter(CommunicationColumn::CommType.eq(comm_type.clone()));
        }
        if let Some(ref status) = filter.status {
            query = query.filter(CommunicationColumn::Status.eq(status.clone()));
        }

        let paginator = query
            .order_by_desc(CommunicationColumn::CreatedAt)
            .paginate(self.read_conn(), page.limit());

        let total = paginator.num_items().await?;
        let communications = paginator.fetch_page(page.page() - 1).await?;

        Ok((communications, total))
    }

    async fn recent_communications_for_lead(
        &self,
        workspace_id: Uuid,
        lead_id: Uuid,
    ) -> Result<Vec<Communication>> {
        CommunicationEntity::find()
            .filter(CommunicationColumn::WorkspaceId.eq(workspace_id))
            .filter(CommunicationColumn::LeadId.eq(lead_id))
            .order_by_desc(CommunicationColumn::CreatedAt)
            .limit(10)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn recent_communications_for_client(
        &self,
        workspace_id: Uuid,
        client_id: Uuid,
    ) -> Result<Vec<Communication>> {
        CommunicationEntity::find()
            .filter(CommunicationColumn::WorkspaceId.eq(workspace_id))
            .filter(CommunicationColumn::ClientId.eq(client_id))
            .order_by_desc(CommunicationColumn::CreatedAt)
            .limit(10)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    pub async fn create_document(
        &self,
        workspace_id: Uuid,
        uploaded_by: Uuid,
        input: NewDocument,
    ) -> Result<Document> {
        let now = Utc::now();
        let document = DocumentActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            bucket: Set(input.bucket),
            path: Set(input.path),
            file_name: Set(input.file_name),
            content_type: Set(input.content_type),
            size_bytes: Set(input.size_bytes),
            entity_type: Set(input.entity_type),
            entity_id: Set(input.entity_id),
            uploaded_by: Set(uploaded_by),
            created_at: Set(now.into()),
        };

        document.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn find_document(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<Document>> {
        DocumentEntity::find_by_id(id)
            .filter(DocumentColumn::WorkspaceId.eq(workspace_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn list_documents_for_entity(
        &self,
        workspace_id: Uuid,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<Document>> {
        DocumentEntity::find()
            .filter(DocumentColumn::WorkspaceId.eq(workspace_id))
            .filter(DocumentColumn::EntityType.eq(entity_type))
            .filter(DocumentColumn::EntityId.eq(entity_id))
            .order_by_desc(DocumentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Telephony Token Store
    // ========================================================================

    pub async fn find_telephony_token(&self, user_id: Uuid) -> Result<Option<TelephonyToken>> {
        TelephonyTokenEntity::find()
            .filter(TelephonyTokenColumn::UserId.eq(user_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Upsert the token row for a user
    pub async fn save_telephony_token(
        &self,
        user_id: Uuid,
        access_token: String,
        refresh_token: String,
        access_expires_at: chrono::DateTime<Utc>,
        refresh_expires_at: chrono::DateTime<Utc>,
    ) -> Result<TelephonyToken> {
        let now = Utc::now();

        match self.find_telephony_token(user_id).await? {
            Some(existing) => {
                let am = TelephonyTokenActiveModel {
                    id: Set(existing.id),
                    access_token: Set(access_token),
                    refresh_token: Set(refresh_token),
                    access_expires_at: Set(access_expires_at.into()),
                    refresh_expires_at: Set(refresh_expires_at.into()),
                    updated_at: Set(now.into()),
                    ..Default::default()
                };
                am.update(self.write_conn()).await.map_err(Into::into)
            }
            None => {
                let am = TelephonyTokenActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    access_token: Set(access_token),
                    refresh_token: Set(refresh_token),
                    access_expires_at: Set(access_expires_at.into()),
                    refresh_expires_at: Set(refresh_expires_at.into()),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                am.insert(self.write_conn()).await.map_err(Into::into)
            }
        }
    }

    pub async fn delete_telephony_token(&self, user_id: Uuid) -> Result<bool> {
        let result = TelephonyTokenEntity::delete_many()
            .filter(TelephonyTokenColumn::UserId.eq(user_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

/// Build a lead active model from validated input
fn lead_active_model(
    workspace_id: Uuid,
    created_by: Option<Uuid>,
    input: NewLead,
    now: chrono::DateTime<Utc>,
) -> LeadActiveModel {
    LeadActiveModel {
        id: Set(Uuid::new_v4()),
        workspace_id: Set(workspace_id),
        pipeline_id: Set(input.pipeline_id),
        status_id: Set(input.status_id),
        insurance_type: Set(input.insurance_type),
        first_name: Set(input.first_name),
        last_name: Set(input.last_name),
        email: Set(input.email),
        phone: Set(input.phone),
        source: Set(input.source),
        import_file_name: Set(input.import_file_name),
        assigned_to: Set(input.assigned_to),
        created_by: Set(created_by),
        notes: Set(input.notes),
        current_carrier: Set(input.current_carrier),
        premium: Set(input.premium),
        auto_premium: Set(input.auto_premium),
        home_premium: Set(input.home_premium),
        specialty_premium: Set(input.specialty_premium),
        additional_insureds: Set(input
            .additional_insureds
            .unwrap_or_else(|| serde_json::json!([]))),
        address_id: Set(None),
        mailing_address_id: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_address() -> Address {
        let now = Utc::now();
        Address {
            id: Uuid::new_v4(),
            street: "100 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip_code: "62701".into(),
            address_type: "Physical".into(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn test_address_resolution_none() {
        assert_eq!(AddressResolution::of(None, None), AddressResolution::None);
        // A row without a reference never resolves Found, whatever the fetch says
        assert_eq!(
            AddressResolution::of(None, Some(sample_address())),
            AddressResolution::None
        );
    }

    #[test]
    fn test_address_resolution_missing() {
        assert_eq!(
            AddressResolution::of(Some(Uuid::new_v4()), None),
            AddressResolution::Missing
        );
    }

    #[test]
    fn test_address_resolution_found() {
        let addr = sample_address();
        let resolved = AddressResolution::of(Some(addr.id), Some(addr.clone()));
        assert_eq!(resolved, AddressResolution::Found(addr));
    }
}
