//! Book entity (the work, not a physical copy)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "String(StringLen::N(200))")]
    pub title: String,

    /// Lower-cased title, matched by search
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub title_key: String,

    pub author_id: Uuid,

    pub saga_id: Option<Uuid>,

    pub saga_volume: Option<i32>,

    pub publish_date: Option<Date>,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    #[sea_orm(column_type = "String(StringLen::N(13))", nullable)]
    pub isbn: Option<String>,

    pub language_id: Option<Uuid>,

    #[sea_orm(column_type = "Text", nullable)]
    pub cover_url: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Title with the saga position appended, e.g. "The Hobbit (Middle-earth, #1)"
    pub fn display_title(&self, saga_name: Option<&str>) -> String {
        match (saga_name, self.saga_volume) {
            (Some(name), Some(volume)) => format!("{} ({}, #{})", self.title, name, volume),
            _ => self.title.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::author::Entity",
        from = "Column::AuthorId",
        to = "super::author::Column::Id",
        on_delete = "Restrict"
    )]
    Author,

    #[sea_orm(
        belongs_to = "super::book_saga::Entity",
        from = "Column::SagaId",
        to = "super::book_saga::Column::Id",
        on_delete = "Restrict"
    )]
    Saga,

    #[sea_orm(
        belongs_to = "super::language::Entity",
        from = "Column::LanguageId",
        to = "super::language::Column::Id",
        on_delete = "SetNull"
    )]
    Language,

    #[sea_orm(has_many = "super::book_genre::Entity")]
    BookGenres,

    #[sea_orm(has_many = "super::user_book_relation::Entity")]
    Readers,
}

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::book_saga::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Saga.def()
    }
}

impl Related<super::language::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Language.def()
    }
}

impl Related<super::genre::Entity> for Entity {
    fn to() -> RelationDef {
        super::book_genre::Relation::Genre.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::book_genre::Relation::Book.def().rev())
    }
}

impl Related<super::user_book_relation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Readers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
