//! Workspace (tenant) entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workspaces")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub name: String,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    Users,

    #[sea_orm(has_many = "super::contact::Entity")]
    Contacts,

    #[sea_orm(has_many = "super::lead::Entity")]
    Leads,

    #[sea_orm(has_many = "super::client::Entity")]
    Clients,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contacts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use sea_orm::Related;

    // `has_many` on the workspace side needs the reverse `Related` impl on
    // every child entity; this fails to compile if one goes missing.
    fn assert_links_back<E: Related<super::Entity>>() {}

    #[test]
    fn child_entities_link_back_to_workspace() {
        assert_links_back::<super::super::user::Entity>();
        assert_links_back::<super::super::contact::Entity>();
        assert_links_back::<super::super::lead::Entity>();
        assert_links_back::<super::super::client::Entity>();
    }
}
