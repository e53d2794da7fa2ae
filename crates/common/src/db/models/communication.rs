//! Communication entity
//!
//! A logged interaction (call/SMS/email/note) tied to exactly one of a
//! lead or a client.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "communications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub workspace_id: Uuid,

    pub lead_id: Option<Uuid>,

    pub client_id: Option<Uuid>,

    /// One of: call, sms, email, note
    #[sea_orm(column_type = "Text")]
    pub comm_type: String,

    /// One of: inbound, outbound
    #[sea_orm(column_type = "Text")]
    pub direction: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub subject: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    pub duration_secs: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub ai_summary: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub ai_sentiment: Option<String>,

    pub created_by: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id"
    )]
    Lead,

    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Allowed communication types
pub const COMM_TYPES: &[&str] = &["call", "sms", "email", "note"];

/// Allowed directions
pub const COMM_DIRECTIONS: &[&str] = &["inbound", "outbound"];
