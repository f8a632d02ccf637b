use super::{BookSummary, Page, PageRequest, Repository};
use crate::catalog::{current_year, search_key, AuthorDraft, RatingSummary};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Author page: the author with their books, sagas and rating
#[derive(Debug, Clone, Serialize)]
pub struct AuthorDetail {
    pub author: Author,
    pub full_name: String,
    pub books: Vec<BookSummary>,
    pub sagas: Vec<Saga>,
    pub rating: RatingSummary,
}

impl Repository {
    // ========================================================================
    // Author Operations
    // ========================================================================

    /// Create a new author
    pub async fn create_author(&self, draft: &AuthorDraft) -> Result<Author> {
        draft.clean(current_year())?;
        let now = chrono::Utc::now();

        let author = AuthorActiveModel {
            id: Set(Uuid::new_v4()),
            first_name: Set(draft.first_name.trim().to_string()),
            last_name: Set(draft.last_name.trim().to_string()),
            first_name_key: Set(search_key(&draft.first_name)),
            last_name_key: Set(search_key(&draft.last_name)),
            year_of_birth: Set(draft.year_of_birth),
            year_of_death: Set(draft.year_of_death),
            biography: Set(draft.biography.clone()),
            photo_url: Set(draft.photo_url.clone()),
            website_url: Set(draft.website_url.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let author = author.insert(self.write_conn()).await?;
        info!(author_id = %author.id, name = %author.full_name(), "Author created");
        Ok(author)
    }

    /// Find author by ID
    pub async fn find_author_by_id(&self, id: Uuid) -> Result<Option<Author>> {
        AuthorEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find author by ID, failing when it does not exist
    pub async fn get_author(&self, id: Uuid) -> Result<Author> {
        self.find_author_by_id(id)
            .await?
            .ok_or_else(|| AppError::AuthorNotFound { id: id.to_string() })
    }

    /// List authors ordered by last then first name
    pub async fn list_authors(&self, request: PageRequest) -> Result<Page<Author>> {
        let paginator = AuthorEntity::find()
            .order_by_asc(AuthorColumn::LastName)
            .order_by_asc(AuthorColumn::FirstName)
            .paginate(self.read_conn(), request.per_page);

        let counts = paginator.num_items_and_pages().await?;
        let index = request.index(counts.number_of_pages)?;
        let authors = paginator.fetch_page(index).await?;

        Ok(Page::new(authors, request, counts.number_of_items, counts.number_of_pages))
    }

    /// Author with books, sagas and the rating over all their books
    pub async fn author_detail(&self, id: Uuid) -> Result<AuthorDetail> {
        let author = self.get_author(id).await?;

        let books = BookEntity::find()
            .filter(BookColumn::AuthorId.eq(id))
            .order_by_asc(BookColumn::PublishDate)
            .order_by_asc(BookColumn::Title)
            .all(self.read_conn())
            .await?;
        let book_ids = books.iter().map(|b| b.id).collect();

        let sagas = SagaEntity::find()
            .filter(SagaColumn::AuthorId.eq(id))
            .order_by_asc(SagaColumn::Name)
            .all(self.read_conn())
            .await?;

        Ok(AuthorDetail {
            full_name: author.full_name(),
            author,
            rating: self.rating_summary(book_ids).await?,
            books: self.summarize_books(books).await?,
            sagas,
        })
    }

    /// Replace every field of an author
    pub async fn update_author(&self, id: Uuid, draft: &AuthorDraft) -> Result<Author> {
        draft.clean(current_year())?;
        let existing = self.get_author(id).await?;

        let mut author: AuthorActiveModel = existing.into();
        author.first_name = Set(draft.first_name.trim().to_string());
        author.last_name = Set(draft.last_name.trim().to_string());
        author.first_name_key = Set(search_key(&draft.first_name));
        author.last_name_key = Set(search_key(&draft.last_name));
        author.year_of_birth = Set(draft.year_of_birth);
        author.year_of_death = Set(draft.year_of_death);
        author.biography = Set(draft.biography.clone());
        author.photo_url = Set(draft.photo_url.clone());
        author.website_url = Set(draft.website_url.clone());
        author.updated_at = Set(chrono::Utc::now().into());

        author.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete an author and their sagas; refused while books remain
    pub async fn delete_author(&self, id: Uuid) -> Result<()> {
        self.get_author(id).await?;

        let txn = self.write_conn().begin().await?;

        let books = BookEntity::find()
            .filter(BookColumn::AuthorId.eq(id))
            .count(&txn)
            .await?;
        if books > 0 {
            return Err(AppError::Protected {
                resource_type: "author".to_string(),
                message: format!("the author still has {} book(s)", books),
            });
        }

        SagaEntity::delete_many()
            .filter(SagaColumn::AuthorId.eq(id))
            .exec(&txn)
            .await?;
        AuthorEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(author_id = %id, "Author deleted");
        Ok(())
    }
}
