//! Schema bootstrap
//!
//! Tables come straight from the entity definitions; composite unique
//! constraints are added as indexes. Every statement is idempotent so the
//! gateway can run it on each start.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityName, EntityTrait, Schema};
use tracing::{debug, info};

/// Create all tables and indexes that do not exist yet
pub async fn create_schema(conn: &DatabaseConnection) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    // Parents before children so foreign keys resolve on every backend
    create_table(conn, &schema, UserEntity).await?;
    create_table(conn, &schema, AuthorEntity).await?;
    create_table(conn, &schema, GenreEntity).await?;
    create_table(conn, &schema, LanguageEntity).await?;
    create_table(conn, &schema, SagaEntity).await?;
    create_table(conn, &schema, BookEntity).await?;
    create_table(conn, &schema, BookGenreEntity).await?;
    create_table(conn, &schema, RelationEntity).await?;
    create_table(conn, &schema, FilmEntity).await?;

    for index in unique_indexes() {
        conn.execute(backend.build(&index)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

async fn create_table<E>(conn: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let backend = conn.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();

    debug!(table = %entity.table_name(), "Creating table");
    conn.execute(backend.build(&stmt)).await?;
    Ok(())
}

fn unique_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("uq_book_sagas_name_author")
            .table(SagaEntity)
            .col(SagaColumn::Name)
            .col(SagaColumn::AuthorId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_books_title_author")
            .table(BookEntity)
            .col(BookColumn::Title)
            .col(BookColumn::AuthorId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_books_saga_volume")
            .table(BookEntity)
            .col(BookColumn::SagaId)
            .col(BookColumn::SagaVolume)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_user_book_relations_user_book")
            .table(RelationEntity)
            .col(RelationColumn::UserId)
            .col(RelationColumn::BookId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::DbPool;

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let pool = DbPool::new(&DatabaseConfig::in_memory()).await.unwrap();
        create_schema(pool.write()).await.unwrap();
        pool.ping().await.unwrap();
    }
}
