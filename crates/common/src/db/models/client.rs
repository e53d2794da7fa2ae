//! Client entity
//!
//! A converted lead. Linked to up to two addresses (physical, mailing)
//! through FK slots on this row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub workspace_id: Uuid,

    /// One of: Individual, Business
    #[sea_orm(column_type = "Text")]
    pub client_type: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub phone_number: Option<String>,

    pub address_id: Option<Uuid>,

    pub mailing_address_id: Option<Uuid>,

    #[sea_orm(column_type = "Text", nullable)]
    pub referred_by: Option<String>,

    pub date_of_birth: Option<Date>,

    /// Lead this client was converted from
    pub lead_id: Option<Uuid>,

    pub assigned_to: Option<Uuid>,

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

    #[sea_orm(has_many = "super::communication::Entity")]
    Communications,
}

impl Related<super::workspace::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workspace.def()
    }
}

impl Related<super::communication::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Communications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Allowed client types
pub const CLIENT_TYPES: &[&str] = &["Individual", "Business"];
