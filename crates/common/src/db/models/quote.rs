//! Quote entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub workspace_id: Uuid,

    pub lead_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub carrier: String,

    pub paid_in_full_amount: Option<f64>,

    pub monthly_payment_amount: Option<f64>,

    pub down_payment_amount: Option<f64>,

    /// One of: 6mo, 12mo
    #[sea_orm(column_type = "Text")]
    pub contract_term: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub coverage_limits: serde_json::Value,

    #[sea_orm(column_type = "JsonBinary")]
    pub deductibles: serde_json::Value,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub competitor_comparisons: Option<serde_json::Value>,

    /// Advisory only; never gates any workflow
    pub ai_score: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub ai_notes: Option<String>,

    pub created_by: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id"
    )]
    Lead,
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Allowed contract terms
pub const CONTRACT_TERMS: &[&str] = &["6mo", "12mo"];
