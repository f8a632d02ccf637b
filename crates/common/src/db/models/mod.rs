//! SeaORM entity models
//!
//! Database entities for the Bookshelf catalog

mod author;
mod book;
mod book_genre;
mod book_saga;
mod film;
mod genre;
mod language;
mod user;
mod user_book_relation;

pub use author::{
    Entity as AuthorEntity,
    Model as Author,
    ActiveModel as AuthorActiveModel,
    Column as AuthorColumn,
};

pub use book_saga::{
    Entity as SagaEntity,
    Model as Saga,
    ActiveModel as SagaActiveModel,
    Column as SagaColumn,
};

pub use book::{
    Entity as BookEntity,
    Model as Book,
    ActiveModel as BookActiveModel,
    Column as BookColumn,
};

pub use book_genre::{
    Entity as BookGenreEntity,
    Model as BookGenre,
    ActiveModel as BookGenreActiveModel,
    Column as BookGenreColumn,
};

pub use genre::{
    Entity as GenreEntity,
    Model as Genre,
    ActiveModel as GenreActiveModel,
    Column as GenreColumn,
};

pub use language::{
    Entity as LanguageEntity,
    Model as Language,
    ActiveModel as LanguageActiveModel,
    Column as LanguageColumn,
    name_key as language_name_key,
};

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use user_book_relation::{
    Entity as RelationEntity,
    Model as UserBookRelation,
    ActiveModel as RelationActiveModel,
    Column as RelationColumn,
    ReadingStatus,
};

pub use film::{
    Entity as FilmEntity,
    Model as Film,
    ActiveModel as FilmActiveModel,
    Column as FilmColumn,
};
