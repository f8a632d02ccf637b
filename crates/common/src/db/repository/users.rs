use super::Repository;
use crate::catalog::ProfileDraft;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

impl Repository {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user account; the password must already be hashed
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> Result<User> {
        let taken = UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .count(self.read_conn())
            .await?;
        if taken > 0 {
            return Err(AppError::Duplicate { message: DUPLICATE_USERNAME.to_string() });
        }

        let now = chrono::Utc::now();
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            email: Set(email.trim().to_string()),
            first_name: Set(first_name.trim().to_string()),
            last_name: Set(last_name.trim().to_string()),
            password_hash: Set(password_hash.to_string()),
            is_staff: Set(is_staff),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let user = user
            .insert(self.write_conn())
            .await
            .map_err(|e| AppError::from_db(e, DUPLICATE_USERNAME))?;
        info!(user_id = %user.id, username = %user.username, is_staff, "User registered");
        Ok(user)
    }

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by ID, failing when it does not exist
    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        self.find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound { id: id.to_string() })
    }

    /// Find user by username (exact match)
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Update email and names
    pub async fn update_profile(&self, id: Uuid, draft: &ProfileDraft) -> Result<User> {
        draft.clean()?;
        let mut user: UserActiveModel = self.get_user(id).await?.into();
        user.email = Set(draft.email.trim().to_string());
        user.first_name = Set(draft.first_name.trim().to_string());
        user.last_name = Set(draft.last_name.trim().to_string());
        user.updated_at = Set(chrono::Utc::now().into());
        user.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Store a new password hash
    pub async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<User> {
        let mut user: UserActiveModel = self.get_user(id).await?.into();
        user.password_hash = Set(password_hash.to_string());
        user.updated_at = Set(chrono::Utc::now().into());
        user.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete an account with everything it recorded about books
    pub async fn delete_user(&self, id: Uuid) -> Result<()> {
        self.get_user(id).await?;

        let txn = self.write_conn().begin().await?;
        RelationEntity::delete_many()
            .filter(RelationColumn::UserId.eq(id))
            .exec(&txn)
            .await?;
        UserEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::errors::ErrorCode;

    #[tokio::test]
    async fn test_username_is_unique() {
        let repo = repo().await;
        user(&repo, "reader").await;
        let err = repo
            .create_user("reader", "other@example.com", "Other", "Reader", "hash", false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateEntry);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let repo = repo().await;
        let reader = user(&repo, "reader").await;
        let draft = ProfileDraft {
            email: "new@example.com".into(),
            first_name: "New".into(),
            last_name: "Name".into(),
        };
        let updated = repo.update_profile(reader.id, &draft).await.unwrap();
        assert_eq!(updated.email, "new@example.com");

        let found = repo.find_user_by_username("reader").await.unwrap().unwrap();
        assert_eq!(found.first_name, "New");
    }

    #[tokio::test]
    async fn test_delete_user_removes_relations() {
        let repo = repo().await;
        let writer = author(&repo, "Ann", "Leckie").await;
        let target = book(&repo, "Translation State", writer.id).await;
        let reader = user(&repo, "reader").await;
        mark(&repo, &reader, &target, ReadingStatus::Read).await;

        repo.delete_user(reader.id).await.unwrap();
        assert!(repo.find_user_by_id(reader.id).await.unwrap().is_none());
        assert!(repo.find_relation(reader.id, target.id).await.unwrap().is_none());
        assert!(repo.find_book_by_id(target.id).await.unwrap().is_some());
    }
}
