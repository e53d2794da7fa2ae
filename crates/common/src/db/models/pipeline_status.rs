//! Pipeline status entity
//!
//! An ordered status set per pipeline; the lowest display_order is the
//! intake status for new leads.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pipeline_statuses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub pipeline_id: i32,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Final statuses (Sold, Lost, Hibernated) close the lead
    pub is_final: bool,

    pub display_order: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pipeline::Entity",
        from = "Column::PipelineId",
        to = "super::pipeline::Column::Id"
    )]
    Pipeline,
}

impl Related<super::pipeline::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pipeline.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
