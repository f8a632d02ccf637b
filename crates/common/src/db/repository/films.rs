use super::{Page, PageRequest, Repository};
use crate::catalog::{current_year, FilmDraft};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set};
use tracing::info;
use uuid::Uuid;

impl Repository {
    // ========================================================================
    // Film Operations
    // ========================================================================

    pub async fn create_film(&self, draft: &FilmDraft) -> Result<Film> {
        draft.clean(current_year())?;
        let film = FilmActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(draft.title.trim().to_string()),
            director: Set(draft.director.trim().to_string()),
            year: Set(draft.year),
            synopsis: Set(draft.synopsis.clone()),
            category: Set(draft.category.trim().to_string()),
        };

        let film = film.insert(self.write_conn()).await?;
        info!(film_id = %film.id, title = %film.title, "Film created");
        Ok(film)
    }

    pub async fn get_film(&self, id: Uuid) -> Result<Film> {
        FilmEntity::find_by_id(id)
            .one(self.read_conn())
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "film".to_string(),
                id: id.to_string(),
            })
    }

    pub async fn list_films(&self, request: PageRequest) -> Result<Page<Film>> {
        let paginator = FilmEntity::find()
            .order_by_asc(FilmColumn::Title)
            .paginate(self.read_conn(), request.per_page);

        let counts = paginator.num_items_and_pages().await?;
        let index = request.index(counts.number_of_pages)?;
        let films = paginator.fetch_page(index).await?;

        Ok(Page::new(films, request, counts.number_of_items, counts.number_of_pages))
    }

    pub async fn update_film(&self, id: Uuid, draft: &FilmDraft) -> Result<Film> {
        draft.clean(current_year())?;
        let mut film: FilmActiveModel = self.get_film(id).await?.into();
        film.title = Set(draft.title.trim().to_string());
        film.director = Set(draft.director.trim().to_string());
        film.year = Set(draft.year);
        film.synopsis = Set(draft.synopsis.clone());
        film.category = Set(draft.category.trim().to_string());
        film.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_film(&self, id: Uuid) -> Result<()> {
        self.get_film(id).await?;
        FilmEntity::delete_by_id(id).exec(self.write_conn()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    fn film(title: &str, year: i32) -> FilmDraft {
        FilmDraft {
            title: title.into(),
            director: "Agnès Varda".into(),
            year,
            synopsis: String::new(),
            category: "Drama".into(),
        }
    }

    #[tokio::test]
    async fn test_film_crud() {
        let repo = repo().await;
        let created = repo.create_film(&film("Cléo from 5 to 7", 1962)).await.unwrap();
        repo.create_film(&film("Vagabond", 1985)).await.unwrap();

        let page = repo.list_films(PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].title, "Cléo from 5 to 7");

        let updated = repo.update_film(created.id, &film("Cleo from 5 to 7", 1962)).await.unwrap();
        assert_eq!(updated.title, "Cleo from 5 to 7");

        repo.delete_film(created.id).await.unwrap();
        assert!(repo.get_film(created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_film() {
        let repo = repo().await;
        let mut draft = film("Untitled", 2001);
        draft.category = String::new();
        let err = repo.create_film(&draft).await.unwrap_err();
        assert_eq!(err.field(), Some("category"));
    }
}
