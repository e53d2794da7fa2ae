//! Telephony OAuth token entity
//!
//! The persisted token store for the telephony collaborator, keyed by
//! user. Tokens are read and written per request and never cached in
//! process memory across requests.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "telephony_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub access_token: String,

    #[sea_orm(column_type = "Text")]
    pub refresh_token: String,

    pub access_expires_at: DateTimeWithTimeZone,

    pub refresh_expires_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
