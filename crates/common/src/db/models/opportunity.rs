//! Opportunity entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "opportunities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub workspace_id: Uuid,

    /// Associated person; an opportunity links a contact or an account
    pub contact_id: Option<Uuid>,

    pub account_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    pub amount: f64,

    /// Stage must belong to the allowed set for its pipeline type
    #[sea_orm(column_type = "Text")]
    pub stage: String,

    /// Win probability, 0-100
    pub probability: i32,

    pub close_date: Option<Date>,

    /// Structured premium/coverage breakdown
    #[sea_orm(column_type = "JsonBinary")]
    pub coverage_details: serde_json::Value,

    pub owner_id: Option<Uuid>,

    pub created_by: Option<Uuid>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contact::Entity",
        from = "Column::ContactId",
        to = "super::contact::Column::Id"
    )]
    Contact,

    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contact.def()
    }
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Allowed stages for personal-lines opportunities
pub const PERSONAL_STAGES: &[&str] = &["intake", "quoted", "negotiation", "bound", "lost"];

/// Allowed stages for business-lines opportunities
pub const BUSINESS_STAGES: &[&str] = &[
    "intake",
    "underwriting",
    "quoted",
    "negotiation",
    "bound",
    "lost",
];
