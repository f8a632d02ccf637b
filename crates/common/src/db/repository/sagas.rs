use super::{BookSummary, Page, PageRequest, Repository};
use crate::catalog::{saga_rollup, search_key, RatingSummary, SagaDraft, SagaRollup};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

const DUPLICATE_SAGA: &str = "Book saga with this Name and Author already exists.";

/// Saga page: books in volume order, rating, and the caller's progress
#[derive(Debug, Clone, Serialize)]
pub struct SagaDetail {
    pub saga: Saga,
    pub author: String,
    pub books: Vec<BookSummary>,
    pub rating: RatingSummary,
    /// Present when the request is made by a signed-in user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<SagaRollup>,
}

impl Repository {
    // ========================================================================
    // Saga Operations
    // ========================================================================

    /// Create a new saga
    pub async fn create_saga(&self, draft: &SagaDraft) -> Result<Saga> {
        draft.clean()?;
        self.get_author(draft.author_id).await?;
        let name = draft.name.trim().to_string();
        self.ensure_unique_saga(&name, draft.author_id, None).await?;

        let now = chrono::Utc::now();
        let saga = SagaActiveModel {
            id: Set(Uuid::new_v4()),
            name_key: Set(search_key(&name)),
            name: Set(name),
            author_id: Set(draft.author_id),
            description: Set(draft.description.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let saga = saga
            .insert(self.write_conn())
            .await
            .map_err(|e| AppError::from_db(e, DUPLICATE_SAGA))?;
        info!(saga_id = %saga.id, name = %saga.name, "Saga created");
        Ok(saga)
    }

    /// Find saga by ID
    pub async fn find_saga_by_id(&self, id: Uuid) -> Result<Option<Saga>> {
        SagaEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find saga by ID, failing when it does not exist
    pub async fn get_saga(&self, id: Uuid) -> Result<Saga> {
        self.find_saga_by_id(id)
            .await?
            .ok_or_else(|| AppError::SagaNotFound { id: id.to_string() })
    }

    /// List sagas ordered by name
    pub async fn list_sagas(&self, request: PageRequest) -> Result<Page<Saga>> {
        let paginator = SagaEntity::find()
            .order_by_asc(SagaColumn::Name)
            .paginate(self.read_conn(), request.per_page);

        let counts = paginator.num_items_and_pages().await?;
        let index = request.index(counts.number_of_pages)?;
        let sagas = paginator.fetch_page(index).await?;

        Ok(Page::new(sagas, request, counts.number_of_items, counts.number_of_pages))
    }

    /// Saga with its books by volume; `viewer` adds their reading progress
    pub async fn saga_detail(&self, id: Uuid, viewer: Option<Uuid>) -> Result<SagaDetail> {
        let saga = self.get_saga(id).await?;
        let author = self.get_author(saga.author_id).await?;

        let books = BookEntity::find()
            .filter(BookColumn::SagaId.eq(id))
            .order_by_asc(BookColumn::SagaVolume)
            .all(self.read_conn())
            .await?;
        let book_ids: Vec<Uuid> = books.iter().map(|b| b.id).collect();

        let progress = match viewer {
            Some(user_id) => Some(self.saga_progress(user_id, &book_ids).await?),
            None => None,
        };

        Ok(SagaDetail {
            saga,
            author: author.full_name(),
            rating: self.rating_summary(book_ids).await?,
            books: self.summarize_books(books).await?,
            progress,
        })
    }

    /// Reading status of a user across the given saga books
    async fn saga_progress(&self, user_id: Uuid, book_ids: &[Uuid]) -> Result<SagaRollup> {
        let statuses: HashMap<Uuid, ReadingStatus> = if book_ids.is_empty() {
            HashMap::new()
        } else {
            RelationEntity::find()
                .filter(RelationColumn::UserId.eq(user_id))
                .filter(RelationColumn::BookId.is_in(book_ids.to_vec()))
                .all(self.read_conn())
                .await?
                .into_iter()
                .map(|r| (r.book_id, r.reading_status()))
                .collect()
        };

        let per_book: Vec<Option<ReadingStatus>> =
            book_ids.iter().map(|id| statuses.get(id).copied()).collect();
        Ok(saga_rollup(&per_book))
    }

    /// Replace every field of a saga
    pub async fn update_saga(&self, id: Uuid, draft: &SagaDraft) -> Result<Saga> {
        draft.clean()?;
        let existing = self.get_saga(id).await?;
        self.get_author(draft.author_id).await?;
        let name = draft.name.trim().to_string();
        self.ensure_unique_saga(&name, draft.author_id, Some(id)).await?;

        if draft.author_id != existing.author_id {
            let books = BookEntity::find()
                .filter(BookColumn::SagaId.eq(id))
                .count(self.read_conn())
                .await?;
            if books > 0 {
                return Err(AppError::validation(
                    "author_id",
                    "Saga author must be the same as the book author",
                ));
            }
        }

        let mut saga: SagaActiveModel = existing.into();
        saga.name_key = Set(search_key(&name));
        saga.name = Set(name);
        saga.author_id = Set(draft.author_id);
        saga.description = Set(draft.description.clone());
        saga.updated_at = Set(chrono::Utc::now().into());

        saga.update(self.write_conn())
            .await
            .map_err(|e| AppError::from_db(e, DUPLICATE_SAGA))
    }

    /// Delete a saga; refused while books belong to it
    pub async fn delete_saga(&self, id: Uuid) -> Result<()> {
        self.get_saga(id).await?;

        let books = BookEntity::find()
            .filter(BookColumn::SagaId.eq(id))
            .count(self.read_conn())
            .await?;
        if books > 0 {
            return Err(AppError::Protected {
                resource_type: "saga".to_string(),
                message: format!("{} book(s) still belong to the saga", books),
            });
        }

        SagaEntity::delete_by_id(id).exec(self.write_conn()).await?;
        info!(saga_id = %id, "Saga deleted");
        Ok(())
    }

    async fn ensure_unique_saga(&self, name: &str, author_id: Uuid, except: Option<Uuid>) -> Result<()> {
        let mut query = SagaEntity::find()
            .filter(SagaColumn::Name.eq(name))
            .filter(SagaColumn::AuthorId.eq(author_id));
        if let Some(id) = except {
            query = query.filter(SagaColumn::Id.ne(id));
        }

        if query.count(self.read_conn()).await? > 0 {
            return Err(AppError::Duplicate { message: DUPLICATE_SAGA.to_string() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::errors::ErrorCode;

    #[tokio::test]
    async fn test_duplicate_saga_for_same_author() {
        let repo = repo().await;
        let writer = author(&repo, "Brandon", "Sanderson").await;
        let other = author(&repo, "Robert", "Jordan").await;
        saga(&repo, "Cosmere", writer.id).await;

        let draft = SagaDraft { name: "Cosmere".into(), author_id: writer.id, description: None };
        let err = repo.create_saga(&draft).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateEntry);

        // Same name, different author
        let draft = SagaDraft { name: "Cosmere".into(), author_id: other.id, description: None };
        repo.create_saga(&draft).await.unwrap();
    }

    #[tokio::test]
    async fn test_saga_for_unknown_author() {
        let repo = repo().await;
        let draft = SagaDraft { name: "Orphan".into(), author_id: Uuid::new_v4(), description: None };
        let err = repo.create_saga(&draft).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthorNotFound);
    }

    #[tokio::test]
    async fn test_saga_detail_orders_by_volume() {
        let repo = repo().await;
        let writer = author(&repo, "Robin", "Hobb").await;
        let farseer = saga(&repo, "Farseer", writer.id).await;
        saga_book(&repo, "Assassin's Quest", &farseer, 3).await;
        saga_book(&repo, "Assassin's Apprentice", &farseer, 1).await;
        saga_book(&repo, "Royal Assassin", &farseer, 2).await;

        let detail = repo.saga_detail(farseer.id, None).await.unwrap();
        let volumes: Vec<Option<i32>> = detail.books.iter().map(|b| b.saga_volume).collect();
        assert_eq!(volumes, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(detail.author, "Robin Hobb");
        assert!(detail.progress.is_none());
    }

    #[tokio::test]
    async fn test_saga_progress_for_viewer() {
        let repo = repo().await;
        let writer = author(&repo, "Robin", "Hobb").await;
        let farseer = saga(&repo, "Farseer", writer.id).await;
        let one = saga_book(&repo, "Assassin's Apprentice", &farseer, 1).await;
        let two = saga_book(&repo, "Royal Assassin", &farseer, 2).await;
        let reader = user(&repo, "reader").await;

        let detail = repo.saga_detail(farseer.id, Some(reader.id)).await.unwrap();
        assert_eq!(detail.progress.unwrap().status, None);

        mark(&repo, &reader, &one, ReadingStatus::Reading).await;
        mark(&repo, &reader, &two, ReadingStatus::Reading).await;
        let detail = repo.saga_detail(farseer.id, Some(reader.id)).await.unwrap();
        assert_eq!(detail.progress.unwrap().status, Some(ReadingStatus::Reading));

        mark(&repo, &reader, &one, ReadingStatus::Read).await;
        mark(&repo, &reader, &two, ReadingStatus::Read).await;
        let detail = repo.saga_detail(farseer.id, Some(reader.id)).await.unwrap();
        let progress = detail.progress.unwrap();
        assert_eq!(progress.status, Some(ReadingStatus::Read));
        assert_eq!(progress.score, 6);
    }

    #[tokio::test]
    async fn test_delete_saga_with_books_is_refused() {
        let repo = repo().await;
        let writer = author(&repo, "Robin", "Hobb").await;
        let farseer = saga(&repo, "Farseer", writer.id).await;
        saga_book(&repo, "Assassin's Apprentice", &farseer, 1).await;

        let err = repo.delete_saga(farseer.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProtectedReference);

        let empty = saga(&repo, "Tawny Man", writer.id).await;
        repo.delete_saga(empty.id).await.unwrap();
        assert!(repo.find_saga_by_id(empty.id).await.unwrap().is_none());
    }
}
