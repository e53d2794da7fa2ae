//! Document metadata entity
//!
//! One row per uploaded file; the bytes live under the storage root.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub workspace_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub bucket: String,

    /// Path relative to the storage root
    #[sea_orm(column_type = "Text")]
    pub path: String,

    #[sea_orm(column_type = "Text")]
    pub file_name: String,

    #[sea_orm(column_type = "Text")]
    pub content_type: String,

    pub size_bytes: i64,

    /// One of: lead, client, quote, user
    #[sea_orm(column_type = "Text")]
    pub entity_type: String,

    pub entity_id: Uuid,

    pub uploaded_by: Uuid,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Entity kinds a document may attach to
pub const DOCUMENT_ENTITY_TYPES: &[&str] = &["lead", "client", "quote", "user"];
