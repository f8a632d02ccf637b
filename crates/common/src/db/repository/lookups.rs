use super::{Page, PageRequest, Repository};
use crate::catalog::{GenreDraft, LanguageDraft};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

const DUPLICATE_LANGUAGE: &str = "Language with this name already exists.";

fn not_found(resource_type: &str, id: Uuid) -> AppError {
    AppError::NotFound {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
    }
}

impl Repository {
    // ========================================================================
    // Genre Operations
    // ========================================================================

    pub async fn create_genre(&self, draft: &GenreDraft) -> Result<Genre> {
        draft.clean()?;
        let genre = GenreActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(draft.name.trim().to_string()),
        };
        genre.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn get_genre(&self, id: Uuid) -> Result<Genre> {
        GenreEntity::find_by_id(id)
            .one(self.read_conn())
            .await?
            .ok_or_else(|| not_found("genre", id))
    }

    pub async fn list_genres(&self, request: PageRequest) -> Result<Page<Genre>> {
        let paginator = GenreEntity::find()
            .order_by_asc(GenreColumn::Name)
            .paginate(self.read_conn(), request.per_page);

        let counts = paginator.num_items_and_pages().await?;
        let index = request.index(counts.number_of_pages)?;
        let genres = paginator.fetch_page(index).await?;

        Ok(Page::new(genres, request, counts.number_of_items, counts.number_of_pages))
    }

    pub async fn update_genre(&self, id: Uuid, draft: &GenreDraft) -> Result<Genre> {
        draft.clean()?;
        let mut genre: GenreActiveModel = self.get_genre(id).await?.into();
        genre.name = Set(draft.name.trim().to_string());
        genre.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a genre; books lose the genre but are kept
    pub async fn delete_genre(&self, id: Uuid) -> Result<()> {
        self.get_genre(id).await?;

        let txn = self.write_conn().begin().await?;
        BookGenreEntity::delete_many()
            .filter(BookGenreColumn::GenreId.eq(id))
            .exec(&txn)
            .await?;
        GenreEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(genre_id = %id, "Genre deleted");
        Ok(())
    }

    // ========================================================================
    // Language Operations
    // ========================================================================

    pub async fn create_language(&self, draft: &LanguageDraft) -> Result<Language> {
        draft.clean()?;
        let key = language_name_key(&draft.name);
        self.ensure_unique_language(&key, None).await?;

        let language = LanguageActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(draft.name.trim().to_string()),
            name_key: Set(key),
        };
        language
            .insert(self.write_conn())
            .await
            .map_err(|e| AppError::from_db(e, DUPLICATE_LANGUAGE))
    }

    pub async fn get_language(&self, id: Uuid) -> Result<Language> {
        LanguageEntity::find_by_id(id)
            .one(self.read_conn())
            .await?
            .ok_or_else(|| not_found("language", id))
    }

    pub async fn list_languages(&self, request: PageRequest) -> Result<Page<Language>> {
        let paginator = LanguageEntity::find()
            .order_by_asc(LanguageColumn::Name)
            .paginate(self.read_conn(), request.per_page);

        let counts = paginator.num_items_and_pages().await?;
        let index = request.index(counts.number_of_pages)?;
        let languages = paginator.fetch_page(index).await?;

        Ok(Page::new(languages, request, counts.number_of_items, counts.number_of_pages))
    }

    pub async fn update_language(&self, id: Uuid, draft: &LanguageDraft) -> Result<Language> {
        draft.clean()?;
        let existing = self.get_language(id).await?;
        let key = language_name_key(&draft.name);
        self.ensure_unique_language(&key, Some(id)).await?;

        let mut language: LanguageActiveModel = existing.into();
        language.name = Set(draft.name.trim().to_string());
        language.name_key = Set(key);
        language
            .update(self.write_conn())
            .await
            .map_err(|e| AppError::from_db(e, DUPLICATE_LANGUAGE))
    }

    /// Delete a language; its books keep existing without one
    pub async fn delete_language(&self, id: Uuid) -> Result<()> {
        self.get_language(id).await?;

        let txn = self.write_conn().begin().await?;
        BookEntity::update_many()
            .col_expr(BookColumn::LanguageId, Expr::value(Option::<Uuid>::None))
            .filter(BookColumn::LanguageId.eq(id))
            .exec(&txn)
            .await?;
        LanguageEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(language_id = %id, "Language deleted");
        Ok(())
    }

    async fn ensure_unique_language(&self, key: &str, except: Option<Uuid>) -> Result<()> {
        let mut query = LanguageEntity::find().filter(LanguageColumn::NameKey.eq(key));
        if let Some(id) = except {
            query = query.filter(LanguageColumn::Id.ne(id));
        }
        if query.count(self.read_conn()).await? > 0 {
            return Err(AppError::Duplicate { message: DUPLICATE_LANGUAGE.to_string() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::errors::ErrorCode;

    fn language(name: &str) -> LanguageDraft {
        LanguageDraft { name: name.into() }
    }

    #[tokio::test]
    async fn test_language_unique_ignoring_case() {
        let repo = repo().await;
        let english = repo.create_language(&language("English")).await.unwrap();

        let err = repo.create_language(&language("english")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateEntry);
        let err = repo.create_language(&language(" ENGLISH ")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateEntry);

        // Renaming to a different case of itself is fine
        let renamed = repo.update_language(english.id, &language("ENGLISH")).await.unwrap();
        assert_eq!(renamed.name, "ENGLISH");
    }

    #[tokio::test]
    async fn test_delete_language_keeps_books() {
        let repo = repo().await;
        let writer = author(&repo, "Jules", "Verne").await;
        let french = repo.create_language(&language("French")).await.unwrap();
        let mut draft = book_draft("Vingt mille lieues sous les mers", writer.id);
        draft.language_id = Some(french.id);
        let created = repo.create_book(&draft).await.unwrap();

        repo.delete_language(french.id).await.unwrap();
        let kept = repo.get_book(created.id).await.unwrap();
        assert_eq!(kept.language_id, None);
    }

    #[tokio::test]
    async fn test_delete_genre_keeps_books() {
        let repo = repo().await;
        let writer = author(&repo, "Jules", "Verne").await;
        let adventure = repo.create_genre(&GenreDraft { name: "Adventure".into() }).await.unwrap();
        let mut draft = book_draft("Around the World in Eighty Days", writer.id);
        draft.genre_ids = vec![adventure.id];
        let created = repo.create_book(&draft).await.unwrap();

        repo.delete_genre(adventure.id).await.unwrap();
        let detail = repo.book_detail(created.id, None).await.unwrap();
        assert!(detail.genres.is_empty());

        let err = repo.get_genre(adventure.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_genres_are_listed_by_name() {
        let repo = repo().await;
        for name in ["Horror", "Fantasy", "Poetry"] {
            repo.create_genre(&GenreDraft { name: name.into() }).await.unwrap();
        }
        let page = repo.list_genres(PageRequest::new(1, 10)).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Fantasy", "Horror", "Poetry"]);
    }
}
