//! Film entity (standalone film catalog)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "films")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub title: String,

    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub director: String,

    pub year: i32,

    #[sea_orm(column_type = "Text")]
    pub synopsis: String,

    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub category: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
