//! Contact entity
//!
//! A person (or org contact) with a lifecycle stage. The stage enumeration
//! is fixed: lead -> opportunity_contact -> customer -> churned.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contacts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub workspace_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub first_name: String,

    #[sea_orm(column_type = "Text")]
    pub last_name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub phone: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub mobile_phone: Option<String>,

    /// One of: lead, opportunity_contact, customer, churned
    #[sea_orm(column_type = "Text")]
    pub lifecycle_stage: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub job_title: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub occupation: Option<String>,

    /// B2B link to an account
    pub account_id: Option<Uuid>,

    pub owner_id: Option<Uuid>,

    #[sea_orm(column_type = "Text", nullable)]
    pub lead_source: Option<String>,

    pub address_id: Option<Uuid>,

    pub date_of_birth: Option<Date>,

    /// Extensible attributes as JSONB
    #[sea_orm(column_type = "JsonBinary")]
    pub custom_fields: serde_json::Value,

    pub last_contact_at: Option<DateTimeWithTimeZone>,

    pub next_contact_at: Option<DateTimeWithTimeZone>,

    pub created_by: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::workspace::Entity",
        from = "Column::WorkspaceId",
        to = "super::workspace::Column::Id"
    )]
    Workspace,

    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,

    #[sea_orm(has_many = "super::opportunity::Entity")]
    Opportunities,
}

impl Related<super::workspace::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workspace.def()
    }
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Allowed lifecycle stages
pub const LIFECYCLE_STAGES: &[&str] = &["lead", "opportunity_contact", "customer", "churned"];
