use super::{BookSummary, Page, PageRequest, Repository};
use crate::catalog::{search_key, today, BookDraft, RatingSummary};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::info;
use uuid::Uuid;

const DUPLICATE_TITLE: &str = "Book with this Title and Author already exists.";
const DUPLICATE_VOLUME: &str = "Book with this Saga and Saga volume already exists.";

/// Map a failed book write, naming the unique constraint that was hit
fn book_write_error(err: DbErr) -> AppError {
    let message = match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("saga_volume") => {
            DUPLICATE_VOLUME
        }
        _ => DUPLICATE_TITLE,
    };
    AppError::from_db(err, message)
}

/// Optional narrowing of the book list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookFilter {
    pub genre_id: Option<Uuid>,
    pub language_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
}

/// Another reader's opinion of a book
#[derive(Debug, Clone, Serialize)]
pub struct ReaderEntry {
    pub username: String,
    pub status: ReadingStatus,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub review_date: Option<DateTimeWithTimeZone>,
}

/// Book page
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub display_title: String,
    pub author: Author,
    pub saga: Option<Saga>,
    pub genres: Vec<Genre>,
    pub language: Option<Language>,
    pub rating: RatingSummary,
    pub reviews: Vec<ReaderEntry>,
    /// The signed-in viewer's own relation to the book
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_relation: Option<UserBookRelation>,
}

impl Repository {
    // ========================================================================
    // Book Operations
    // ========================================================================

    /// Create a new book with its genres
    pub async fn create_book(&self, draft: &BookDraft) -> Result<Book> {
        let saga = self.check_book_references(draft).await?;
        draft.clean(today(), saga.as_ref())?;
        let title = draft.title.trim().to_string();
        self.ensure_unique_book(&title, draft, None).await?;

        let now = chrono::Utc::now();
        let book = BookActiveModel {
            id: Set(Uuid::new_v4()),
            title_key: Set(search_key(&title)),
            title: Set(title),
            author_id: Set(draft.author_id),
            saga_id: Set(draft.saga_id),
            saga_volume: Set(draft.saga_volume),
            publish_date: Set(draft.publish_date),
            summary: Set(draft.summary.clone()),
            isbn: Set(draft.isbn.clone()),
            language_id: Set(draft.language_id),
            cover_url: Set(draft.cover_url.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let txn = self.write_conn().begin().await?;
        let book = book
            .insert(&txn)
            .await
            .map_err(book_write_error)?;
        replace_genres(&txn, book.id, &draft.genre_ids).await?;
        txn.commit().await?;

        info!(book_id = %book.id, title = %book.title, "Book created");
        Ok(book)
    }

    /// Find book by ID
    pub async fn find_book_by_id(&self, id: Uuid) -> Result<Option<Book>> {
        BookEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find book by ID, failing when it does not exist
    pub async fn get_book(&self, id: Uuid) -> Result<Book> {
        self.find_book_by_id(id)
            .await?
            .ok_or_else(|| AppError::BookNotFound { id: id.to_string() })
    }

    /// List books ordered by title
    pub async fn list_books(
        &self,
        filter: &BookFilter,
        request: PageRequest,
    ) -> Result<Page<BookSummary>> {
        let mut query = BookEntity::find();
        if let Some(author_id) = filter.author_id {
            query = query.filter(BookColumn::AuthorId.eq(author_id));
        }
        if let Some(language_id) = filter.language_id {
            query = query.filter(BookColumn::LanguageId.eq(language_id));
        }
        if let Some(genre_id) = filter.genre_id {
            query = query.filter(
                BookColumn::Id.in_subquery(
                    Query::select()
                        .column(BookGenreColumn::BookId)
                        .from(BookGenreEntity)
                        .and_where(BookGenreColumn::GenreId.eq(genre_id))
                        .to_owned(),
                ),
            );
        }

        let paginator = query
            .order_by_asc(BookColumn::Title)
            .order_by_asc(BookColumn::AuthorId)
            .paginate(self.read_conn(), request.per_page);

        let counts = paginator.num_items_and_pages().await?;
        let index = request.index(counts.number_of_pages)?;
        let books = paginator.fetch_page(index).await?;
        let items = self.summarize_books(books).await?;

        Ok(Page::new(items, request, counts.number_of_items, counts.number_of_pages))
    }

    /// Book with its references, ratings and reviews
    pub async fn book_detail(&self, id: Uuid, viewer: Option<Uuid>) -> Result<BookDetail> {
        let conn = self.read_conn();
        let book = self.get_book(id).await?;
        let author = self.get_author(book.author_id).await?;
        let saga = match book.saga_id {
            Some(saga_id) => self.find_saga_by_id(saga_id).await?,
            None => None,
        };
        let language = match book.language_id {
            Some(language_id) => LanguageEntity::find_by_id(language_id).one(conn).await?,
            None => None,
        };
        let genres = book
            .find_related(GenreEntity)
            .order_by_asc(GenreColumn::Name)
            .all(conn)
            .await?;

        let relations = RelationEntity::find()
            .filter(RelationColumn::BookId.eq(id))
            .order_by_desc(RelationColumn::ReviewDate)
            .all(conn)
            .await?;
        let rating = RatingSummary::from_relations(&relations);
        let my_relation = viewer.and_then(|user_id| {
            relations.iter().find(|r| r.user_id == user_id).cloned()
        });

        let reviewed: Vec<&UserBookRelation> = relations
            .iter()
            .filter(|r| r.review.is_some() || r.rating.is_some())
            .collect();
        let usernames: HashMap<Uuid, String> = if reviewed.is_empty() {
            HashMap::new()
        } else {
            UserEntity::find()
                .filter(UserColumn::Id.is_in(reviewed.iter().map(|r| r.user_id).collect::<Vec<_>>()))
                .all(conn)
                .await?
                .into_iter()
                .map(|u| (u.id, u.username))
                .collect()
        };
        let reviews = reviewed
            .into_iter()
            .map(|r| ReaderEntry {
                username: usernames.get(&r.user_id).cloned().unwrap_or_default(),
                status: r.reading_status(),
                rating: r.rating,
                review: r.review.clone(),
                review_date: r.review_date,
            })
            .collect();

        Ok(BookDetail {
            display_title: book.display_title(saga.as_ref().map(|s| s.name.as_str())),
            book,
            author,
            saga,
            genres,
            language,
            rating,
            reviews,
            my_relation,
        })
    }

    /// Replace every field of a book, genres included
    pub async fn update_book(&self, id: Uuid, draft: &BookDraft) -> Result<Book> {
        let existing = self.get_book(id).await?;
        let saga = self.check_book_references(draft).await?;
        draft.clean(today(), saga.as_ref())?;
        let title = draft.title.trim().to_string();
        self.ensure_unique_book(&title, draft, Some(id)).await?;

        let mut book: BookActiveModel = existing.into();
        book.title_key = Set(search_key(&title));
        book.title = Set(title);
        book.author_id = Set(draft.author_id);
        book.saga_id = Set(draft.saga_id);
        book.saga_volume = Set(draft.saga_volume);
        book.publish_date = Set(draft.publish_date);
        book.summary = Set(draft.summary.clone());
        book.isbn = Set(draft.isbn.clone());
        book.language_id = Set(draft.language_id);
        book.cover_url = Set(draft.cover_url.clone());
        book.updated_at = Set(chrono::Utc::now().into());

        let txn = self.write_conn().begin().await?;
        let book = book
            .update(&txn)
            .await
            .map_err(book_write_error)?;
        replace_genres(&txn, id, &draft.genre_ids).await?;
        txn.commit().await?;

        Ok(book)
    }

    /// Delete a book with its genre links and reader relations
    pub async fn delete_book(&self, id: Uuid) -> Result<()> {
        self.get_book(id).await?;

        let txn = self.write_conn().begin().await?;
        BookGenreEntity::delete_many()
            .filter(BookGenreColumn::BookId.eq(id))
            .exec(&txn)
            .await?;
        RelationEntity::delete_many()
            .filter(RelationColumn::BookId.eq(id))
            .exec(&txn)
            .await?;
        BookEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(book_id = %id, "Book deleted");
        Ok(())
    }

    /// Resolve the records a book draft points at; returns the saga, if any
    async fn check_book_references(&self, draft: &BookDraft) -> Result<Option<Saga>> {
        let conn = self.read_conn();
        self.get_author(draft.author_id).await?;

        let saga = match draft.saga_id {
            Some(saga_id) => Some(self.get_saga(saga_id).await?),
            None => None,
        };

        if let Some(language_id) = draft.language_id {
            if LanguageEntity::find_by_id(language_id).one(conn).await?.is_none() {
                return Err(AppError::validation("language_id", "Select a valid language"));
            }
        }

        let genre_ids: BTreeSet<Uuid> = draft.genre_ids.iter().copied().collect();
        if !genre_ids.is_empty() {
            let found = GenreEntity::find()
                .filter(GenreColumn::Id.is_in(genre_ids.iter().copied().collect::<Vec<_>>()))
                .count(conn)
                .await?;
            if found != genre_ids.len() as u64 {
                return Err(AppError::validation("genre_ids", "Select a valid genre"));
            }
        }

        Ok(saga)
    }

    async fn ensure_unique_book(&self, title: &str, draft: &BookDraft, except: Option<Uuid>) -> Result<()> {
        let conn = self.read_conn();

        let mut same_title = BookEntity::find()
            .filter(BookColumn::Title.eq(title))
            .filter(BookColumn::AuthorId.eq(draft.author_id));
        if let Some(id) = except {
            same_title = same_title.filter(BookColumn::Id.ne(id));
        }
        if same_title.count(conn).await? > 0 {
            return Err(AppError::Duplicate { message: DUPLICATE_TITLE.to_string() });
        }

        if let (Some(saga_id), Some(volume)) = (draft.saga_id, draft.saga_volume) {
            let mut same_volume = BookEntity::find()
                .filter(BookColumn::SagaId.eq(saga_id))
                .filter(BookColumn::SagaVolume.eq(volume));
            if let Some(id) = except {
                same_volume = same_volume.filter(BookColumn::Id.ne(id));
            }
            if same_volume.count(conn).await? > 0 {
                return Err(AppError::Duplicate { message: DUPLICATE_VOLUME.to_string() });
            }
        }

        Ok(())
    }
}

/// Make the genre links of a book exactly `genre_ids`
async fn replace_genres<C: ConnectionTrait>(conn: &C, book_id: Uuid, genre_ids: &[Uuid]) -> Result<()> {
    BookGenreEntity::delete_many()
        .filter(BookGenreColumn::BookId.eq(book_id))
        .exec(conn)
        .await?;

    let unique: BTreeSet<Uuid> = genre_ids.iter().copied().collect();
    if unique.is_empty() {
        return Ok(());
    }

    let links = unique.into_iter().map(|genre_id| BookGenreActiveModel {
        book_id: Set(book_id),
        genre_id: Set(genre_id),
    });
    BookGenreEntity::insert_many(links).exec(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::catalog::{GenreDraft, LanguageDraft};
    use crate::errors::ErrorCode;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_write_error_names_failed_constraint() {
        let repo = repo().await;
        let writer = author(&repo, "Ursula", "Le Guin").await;
        let earthsea = saga(&repo, "Earthsea", writer.id).await;
        let existing = saga_book(&repo, "A Wizard of Earthsea", &earthsea, 1).await;

        let mut same_volume: BookActiveModel = existing.clone().into();
        same_volume.id = Set(Uuid::new_v4());
        same_volume.title = Set("The Tombs of Atuan".into());
        same_volume.title_key = Set(search_key("The Tombs of Atuan"));
        let err = book_write_error(same_volume.insert(repo.write_conn()).await.unwrap_err());
        assert_eq!(err.code(), ErrorCode::DuplicateEntry);
        assert!(err.to_string().ends_with(DUPLICATE_VOLUME));

        let mut same_title: BookActiveModel = existing.into();
        same_title.id = Set(Uuid::new_v4());
        same_title.saga_id = Set(None);
        same_title.saga_volume = Set(None);
        let err = book_write_error(same_title.insert(repo.write_conn()).await.unwrap_err());
        assert_eq!(err.code(), ErrorCode::DuplicateEntry);
        assert!(err.to_string().ends_with(DUPLICATE_TITLE));
    }

    #[tokio::test]
    async fn test_duplicate_title_for_author() {
        let repo = repo().await;
        let writer = author(&repo, "Ursula", "Le Guin").await;
        book(&repo, "The Dispossessed", writer.id).await;

        let err = repo
            .create_book(&book_draft("The Dispossessed", writer.id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateEntry);
    }

    #[tokio::test]
    async fn test_duplicate_saga_volume() {
        let repo = repo().await;
        let writer = author(&repo, "Ursula", "Le Guin").await;
        let earthsea = saga(&repo, "Earthsea", writer.id).await;
        saga_book(&repo, "A Wizard of Earthsea", &earthsea, 1).await;

        let mut draft = book_draft("The Tombs of Atuan", writer.id);
        draft.saga_id = Some(earthsea.id);
        draft.saga_volume = Some(1);
        let err = repo.create_book(&draft).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateEntry);
        assert!(err.to_string().contains("Saga volume"));
    }

    #[tokio::test]
    async fn test_saga_of_other_author_is_rejected() {
        let repo = repo().await;
        let writer = author(&repo, "Ursula", "Le Guin").await;
        let other = author(&repo, "Robin", "Hobb").await;
        let farseer = saga(&repo, "Farseer", other.id).await;

        let mut draft = book_draft("Tehanu", writer.id);
        draft.saga_id = Some(farseer.id);
        draft.saga_volume = Some(4);
        let err = repo.create_book(&draft).await.unwrap_err();
        assert_eq!(err.field(), Some("saga_id"));
    }

    #[tokio::test]
    async fn test_saga_without_volume_is_rejected() {
        let repo = repo().await;
        let writer = author(&repo, "Ursula", "Le Guin").await;
        let earthsea = saga(&repo, "Earthsea", writer.id).await;

        let mut draft = book_draft("Tehanu", writer.id);
        draft.saga_id = Some(earthsea.id);
        let err = repo.create_book(&draft).await.unwrap_err();
        assert_eq!(err.field(), Some("saga_volume"));
    }

    #[tokio::test]
    async fn test_book_detail_with_genres_and_language() {
        let repo = repo().await;
        let writer = author(&repo, "Ursula", "Le Guin").await;
        let fantasy = repo.create_genre(&GenreDraft { name: "Fantasy".into() }).await.unwrap();
        let classic = repo.create_genre(&GenreDraft { name: "Classic".into() }).await.unwrap();
        let english = repo
            .create_language(&LanguageDraft { name: "English".into() })
            .await
            .unwrap();

        let mut draft = book_draft("A Wizard of Earthsea", writer.id);
        draft.genre_ids = vec![fantasy.id, classic.id, fantasy.id];
        draft.language_id = Some(english.id);
        draft.publish_date = NaiveDate::from_ymd_opt(1968, 11, 1);
        draft.isbn = Some("9780547773742".into());
        let created = repo.create_book(&draft).await.unwrap();

        let reader = user(&repo, "reader").await;
        repo.review(reader.id, created.id, "A classic").await.unwrap();

        let detail = repo.book_detail(created.id, Some(reader.id)).await.unwrap();
        let genres: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(genres, vec!["Classic", "Fantasy"]);
        assert_eq!(detail.language.unwrap().name, "English");
        assert_eq!(detail.reviews.len(), 1);
        assert_eq!(detail.reviews[0].username, "reader");
        assert_eq!(detail.rating.reviews, 1);
        assert!(detail.my_relation.is_some());
    }

    #[tokio::test]
    async fn test_unknown_genre_is_rejected() {
        let repo = repo().await;
        let writer = author(&repo, "Ursula", "Le Guin").await;
        let mut draft = book_draft("Lavinia", writer.id);
        draft.genre_ids = vec![Uuid::new_v4()];
        let err = repo.create_book(&draft).await.unwrap_err();
        assert_eq!(err.field(), Some("genre_ids"));
    }

    #[tokio::test]
    async fn test_filter_books_by_genre() {
        let repo = repo().await;
        let writer = author(&repo, "Ursula", "Le Guin").await;
        let scifi = repo.create_genre(&GenreDraft { name: "Science fiction".into() }).await.unwrap();

        let mut draft = book_draft("The Dispossessed", writer.id);
        draft.genre_ids = vec![scifi.id];
        repo.create_book(&draft).await.unwrap();
        book(&repo, "Tehanu", writer.id).await;

        let filter = BookFilter { genre_id: Some(scifi.id), ..BookFilter::default() };
        let page = repo.list_books(&filter, PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "The Dispossessed");
    }

    #[tokio::test]
    async fn test_update_book_replaces_genres() {
        let repo = repo().await;
        let writer = author(&repo, "Ursula", "Le Guin").await;
        let fantasy = repo.create_genre(&GenreDraft { name: "Fantasy".into() }).await.unwrap();
        let mut draft = book_draft("Tehanu", writer.id);
        draft.genre_ids = vec![fantasy.id];
        let created = repo.create_book(&draft).await.unwrap();

        draft.title = "Tehanu: The Last Book of Earthsea".into();
        draft.genre_ids = vec![];
        let updated = repo.update_book(created.id, &draft).await.unwrap();
        assert_eq!(updated.title, "Tehanu: The Last Book of Earthsea");

        let detail = repo.book_detail(created.id, None).await.unwrap();
        assert!(detail.genres.is_empty());
    }

    #[tokio::test]
    async fn test_delete_book_removes_relations() {
        let repo = repo().await;
        let writer = author(&repo, "Ursula", "Le Guin").await;
        let target = book(&repo, "Tehanu", writer.id).await;
        let reader = user(&repo, "reader").await;
        mark(&repo, &reader, &target, ReadingStatus::ToRead).await;

        repo.delete_book(target.id).await.unwrap();
        assert!(repo.find_book_by_id(target.id).await.unwrap().is_none());
        assert!(repo.find_relation(reader.id, target.id).await.unwrap().is_none());
    }
}
