//! Language lookup entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "languages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "String(StringLen::N(200))")]
    pub name: String,

    /// Lower-cased name; carries the case-insensitive uniqueness constraint
    #[sea_orm(column_type = "String(StringLen::N(200))", unique)]
    #[serde(skip_serializing)]
    pub name_key: String,
}

/// Key used for case-insensitive comparison of language names
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::book::Entity")]
    Books,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Books.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
