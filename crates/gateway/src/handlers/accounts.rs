//! Account handlers: registration, login, profile and password

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::repository;
use crate::AppState;
use bookshelf_common::{
    auth::{hash_password, scopes_for, verify_password, AuthContext},
    catalog::{PasswordChangeDraft, ProfileDraft, RegistrationDraft},
    db::models::User,
    errors::{AppError, Result},
    metrics,
};

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token issued on registration and login
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

fn issue_token(state: &AppState, user: User) -> Result<TokenResponse> {
    let token = state
        .jwt
        .generate_token(user.id, &user.username, scopes_for(user.is_staff))?;
    Ok(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expiration_secs(),
        user,
    })
}

/// Create an account and sign it in
pub async fn register(
    State(state): State<AppState>,
    Json(draft): Json<RegistrationDraft>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    draft.clean(state.config.auth.min_password_length)?;
    let username = draft.username.trim();
    let is_staff = state.config.is_staff_username(username);

    let password_hash = hash_password(&draft.password)?;
    let user = repository(&state)
        .create_user(
            username,
            &draft.email,
            &draft.first_name,
            &draft.last_name,
            &password_hash,
            is_staff,
        )
        .await?;
    metrics::record_registration(is_staff);

    Ok((StatusCode::CREATED, Json(issue_token(&state, user)?)))
}

/// Exchange username and password for a token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let user = match repository(&state)
        .find_user_by_username(request.username.trim())
        .await?
    {
        Some(user) => user,
        None => {
            metrics::record_login(false);
            return Err(AppError::InvalidCredentials {
                message: "This user name does not exist.".to_string(),
                field: "username".to_string(),
            });
        }
    };

    if !verify_password(&request.password, &user.password_hash) {
        metrics::record_login(false);
        return Err(AppError::InvalidCredentials {
            message: "The password is not correct.".to_string(),
            field: "password".to_string(),
        });
    }

    metrics::record_login(true);
    info!(user_id = %user.id, "User signed in");
    Ok(Json(issue_token(&state, user)?))
}

pub async fn get_profile(State(state): State<AppState>, auth: AuthContext) -> Result<Json<User>> {
    Ok(Json(repository(&state).get_user(auth.user_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(draft): Json<ProfileDraft>,
) -> Result<Json<User>> {
    Ok(Json(repository(&state).update_profile(auth.user_id, &draft).await?))
}

/// Delete the caller's account
pub async fn delete_account(State(state): State<AppState>, auth: AuthContext) -> Result<StatusCode> {
    repository(&state).delete_user(auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change the caller's password; the old one must be supplied
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(draft): Json<PasswordChangeDraft>,
) -> Result<StatusCode> {
    let repo = repository(&state);
    let user = repo.get_user(auth.user_id).await?;

    if !verify_password(&draft.old_password, &user.password_hash) {
        return Err(AppError::validation(
            "old_password",
            "Your old password was entered incorrectly. Please enter it again.",
        ));
    }
    draft.clean(state.config.auth.min_password_length)?;

    let password_hash = hash_password(&draft.new_password)?;
    repo.set_password_hash(user.id, &password_hash).await?;
    info!(user_id = %user.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}
