use super::{BookSummary, Page, PageRequest, Repository};
use crate::catalog::{today, RatingDraft, ReviewDraft};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// Outcome of a status, rating or review change
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub relation: UserBookRelation,
    /// The relation did not exist before this change
    pub created: bool,
}

/// Row of the "my books" list
#[derive(Debug, Clone, Serialize)]
pub struct MyBookEntry {
    pub relation: UserBookRelation,
    pub book: BookSummary,
}

/// Reading and read dates after moving to `status`
fn status_dates(
    status: ReadingStatus,
    reading_date: Option<NaiveDate>,
    read_date: Option<NaiveDate>,
    today: NaiveDate,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match status {
        ReadingStatus::Reading => (reading_date.or(Some(today)), read_date),
        ReadingStatus::Read => (reading_date, Some(today)),
        ReadingStatus::ToRead => (None, None),
    }
}

fn relation_not_found(book_id: Uuid) -> AppError {
    AppError::NotFound {
        resource_type: "reading status".to_string(),
        id: book_id.to_string(),
    }
}

impl Repository {
    // ========================================================================
    // Reading Status Operations
    // ========================================================================

    /// Find the relation of a user to a book
    pub async fn find_relation(&self, user_id: Uuid, book_id: Uuid) -> Result<Option<UserBookRelation>> {
        RelationEntity::find()
            .filter(RelationColumn::UserId.eq(user_id))
            .filter(RelationColumn::BookId.eq(book_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Set the reading status of a book, creating the relation when needed
    pub async fn set_status(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        status: ReadingStatus,
    ) -> Result<StatusChange> {
        self.get_user(user_id).await?;
        self.get_book(book_id).await?;
        let today = today();
        let now = chrono::Utc::now();

        let change = match self.find_relation(user_id, book_id).await? {
            Some(existing) => {
                let (reading_date, read_date) =
                    status_dates(status, existing.reading_date, existing.read_date, today);
                let mut relation: RelationActiveModel = existing.into();
                relation.status = Set(status.into());
                relation.reading_date = Set(reading_date);
                relation.read_date = Set(read_date);
                relation.updated_at = Set(now.into());
                StatusChange {
                    relation: relation.update(self.write_conn()).await?,
                    created: false,
                }
            }
            None => {
                let (reading_date, read_date) = status_dates(status, None, None, today);
                StatusChange {
                    relation: self
                        .insert_relation(user_id, book_id, status, reading_date, read_date)
                        .await?,
                    created: true,
                }
            }
        };

        info!(
            user_id = %user_id,
            book_id = %book_id,
            status = %status,
            created = change.created,
            "Reading status changed"
        );
        Ok(change)
    }

    /// Forget everything a user recorded about a book
    pub async fn remove_status(&self, user_id: Uuid, book_id: Uuid) -> Result<()> {
        let result = RelationEntity::delete_many()
            .filter(RelationColumn::UserId.eq(user_id))
            .filter(RelationColumn::BookId.eq(book_id))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(relation_not_found(book_id));
        }
        Ok(())
    }

    /// Rate a book from 1 to 5
    pub async fn rate(&self, user_id: Uuid, book_id: Uuid, rating: i32) -> Result<StatusChange> {
        let rating = RatingDraft { rating }.clean()?;
        let (existing, created) = self.relation_for_opinion(user_id, book_id).await?;

        let mut relation: RelationActiveModel = existing.into();
        relation.rating = Set(Some(rating));
        relation.updated_at = Set(chrono::Utc::now().into());

        Ok(StatusChange {
            relation: relation.update(self.write_conn()).await?,
            created,
        })
    }

    /// Remove the rating, keeping the rest of the relation
    pub async fn clear_rating(&self, user_id: Uuid, book_id: Uuid) -> Result<UserBookRelation> {
        let existing = self
            .find_relation(user_id, book_id)
            .await?
            .ok_or_else(|| relation_not_found(book_id))?;

        let mut relation: RelationActiveModel = existing.into();
        relation.rating = Set(None);
        relation.updated_at = Set(chrono::Utc::now().into());
        relation.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Write or replace the review of a book
    pub async fn review(&self, user_id: Uuid, book_id: Uuid, text: &str) -> Result<StatusChange> {
        let text = ReviewDraft { review: text.to_string() }.clean()?;
        let (existing, created) = self.relation_for_opinion(user_id, book_id).await?;
        let now = chrono::Utc::now();

        let mut relation: RelationActiveModel = existing.into();
        relation.review = Set(Some(text));
        relation.review_date = Set(Some(now.into()));
        relation.updated_at = Set(now.into());

        Ok(StatusChange {
            relation: relation.update(self.write_conn()).await?,
            created,
        })
    }

    /// Remove the review, keeping the rest of the relation
    pub async fn clear_review(&self, user_id: Uuid, book_id: Uuid) -> Result<UserBookRelation> {
        let existing = self
            .find_relation(user_id, book_id)
            .await?
            .ok_or_else(|| relation_not_found(book_id))?;

        let mut relation: RelationActiveModel = existing.into();
        relation.review = Set(None);
        relation.review_date = Set(None);
        relation.updated_at = Set(chrono::Utc::now().into());
        relation.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Books of a user, most recently touched first
    pub async fn my_books(
        &self,
        user_id: Uuid,
        status: Option<ReadingStatus>,
        request: PageRequest,
    ) -> Result<Page<MyBookEntry>> {
        let mut query = RelationEntity::find().filter(RelationColumn::UserId.eq(user_id));
        if let Some(status) = status {
            query = query.filter(RelationColumn::Status.eq(status.as_str()));
        }

        let paginator = query
            .order_by_desc(RelationColumn::UpdatedAt)
            .paginate(self.read_conn(), request.per_page);

        let counts = paginator.num_items_and_pages().await?;
        let index = request.index(counts.number_of_pages)?;
        let relations = paginator.fetch_page(index).await?;

        let book_ids: Vec<Uuid> = relations.iter().map(|r| r.book_id).collect();
        let books = if book_ids.is_empty() {
            Vec::new()
        } else {
            BookEntity::find()
                .filter(BookColumn::Id.is_in(book_ids))
                .all(self.read_conn())
                .await?
        };
        let mut summaries: HashMap<Uuid, BookSummary> = self
            .summarize_books(books)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let items = relations
            .into_iter()
            .filter_map(|relation| {
                summaries
                    .remove(&relation.book_id)
                    .map(|book| MyBookEntry { relation, book })
            })
            .collect();

        Ok(Page::new(items, request, counts.number_of_items, counts.number_of_pages))
    }

    /// Relation that a rating or review attaches to; a book without one is
    /// taken as read today
    async fn relation_for_opinion(&self, user_id: Uuid, book_id: Uuid) -> Result<(UserBookRelation, bool)> {
        self.get_user(user_id).await?;
        self.get_book(book_id).await?;

        match self.find_relation(user_id, book_id).await? {
            Some(existing) => Ok((existing, false)),
            None => {
                let relation = self
                    .insert_relation(user_id, book_id, ReadingStatus::Read, None, Some(today()))
                    .await?;
                Ok((relation, true))
            }
        }
    }

    async fn insert_relation(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        status: ReadingStatus,
        reading_date: Option<NaiveDate>,
        read_date: Option<NaiveDate>,
    ) -> Result<UserBookRelation> {
        let now = chrono::Utc::now();
        let relation = RelationActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            book_id: Set(book_id),
            status: Set(status.into()),
            reading_date: Set(reading_date),
            read_date: Set(read_date),
            rating: Set(None),
            review: Set(None),
            review_date: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        relation
            .insert(self.write_conn())
            .await
            .map_err(|e| AppError::from_db(e, "User book relation with this User and Book already exists."))
    }
}
