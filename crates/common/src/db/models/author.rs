//! Author entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "authors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub first_name: String,

    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub last_name: String,

    /// Lower-cased first name, matched by search
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub first_name_key: String,

    /// Lower-cased last name, matched by search
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub last_name_key: String,

    pub year_of_birth: Option<i32>,

    pub year_of_death: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub biography: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub photo_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub website_url: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// "F. Last", the short form used in book listings
    pub fn short_name(&self) -> String {
        match self.first_name.chars().next() {
            Some(initial) => format!("{}. {}", initial, self.last_name),
            None => self.last_name.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::book::Entity")]
    Books,

    #[sea_orm(has_many = "super::book_saga::Entity")]
    Sagas,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Books.def()
    }
}

impl Related<super::book_saga::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sagas.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
