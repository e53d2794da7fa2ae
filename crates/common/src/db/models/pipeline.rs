//! Pipeline entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pipelines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub workspace_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// One of: Personal, Business
    #[sea_orm(column_type = "Text")]
    pub lead_type: String,

    pub is_default: bool,

    pub display_order: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::pipeline_status::Entity")]
    Statuses,

    #[sea_orm(has_many = "super::lead::Entity")]
    Leads,
}

impl Related<super::pipeline_status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Statuses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
