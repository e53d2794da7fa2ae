//! Lead entity
//!
//! A prospective sale. Created on intake (manual or CSV import) in the
//! pipeline's first status; closed by moving to a final status rather than
//! by deletion in the normal flow.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub workspace_id: Uuid,

    pub pipeline_id: i32,

    pub status_id: i32,

    /// One of: Auto, Home, Specialty, Commercial, Liability
    #[sea_orm(column_type = "Text")]
    pub insurance_type: String,

    #[sea_orm(column_type = "Text")]
    pub first_name: String,

    #[sea_orm(column_type = "Text")]
    pub last_name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub phone: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub source: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub import_file_name: Option<String>,

    pub assigned_to: Option<Uuid>,

    pub created_by: Option<Uuid>,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub current_carrier: Option<String>,

    pub premium: Option<f64>,

    pub auto_premium: Option<f64>,

    pub home_premium: Option<f64>,

    pub specialty_premium: Option<f64>,

    /// Additional insureds (drivers, co-applicants) as a JSONB array
    #[sea_orm(column_type = "JsonBinary")]
    pub additional_insureds: serde_json::Value,

    pub address_id: Option<Uuid>,

    pub mailing_address_id: Option<Uuid>,

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
        belongs_to = "super::pipeline::Entity",
        from = "Column::PipelineId",
        to = "super::pipeline::Column::Id"
    )]
    Pipeline,

    #[sea_orm(
        belongs_to = "super::pipeline_status::Entity",
        from = "Column::StatusId",
        to = "super::pipeline_status::Column::Id"
    )]
    Status,

    #[sea_orm(has_many = "super::quote::Entity")]
    Quotes,

    #[sea_orm(has_many = "super::communication::Entity")]
    Communications,
}

impl Related<super::workspace::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workspace.def()
    }
}

impl Related<super::pipeline::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pipeline.def()
    }
}

impl Related<super::quote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Allowed insurance types
pub const INSURANCE_TYPES: &[&str] = &["Auto", "Home", "Specialty", "Commercial", "Liability"];
