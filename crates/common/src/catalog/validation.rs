//! Input drafts and their validation
//!
//! Every draft exposes `clean`, which applies the field rules declared with
//! `validator` plus the cross-field rules that need a reference date or a
//! related record. The first violation is returned as
//! `AppError::Validation`. Uniqueness rules are checked by the repository.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::db::models::{ReadingStatus, Saga};
use crate::errors::{AppError, Result};

pub const AUTHOR_NAME_MAX: usize = 100;
pub const TITLE_MAX: usize = 200;
pub const SAGA_NAME_MAX: usize = 200;
pub const LOOKUP_NAME_MAX: usize = 200;
pub const SUMMARY_MAX: usize = 1000;
pub const ISBN_LEN: usize = 13;
pub const REVIEW_MAX: usize = 2000;
pub const USERNAME_MAX: usize = 150;
pub const FILM_TEXT_MAX: usize = 255;
pub const FILM_CATEGORY_MAX: usize = 100;

/// Non-empty text no longer than `max` characters
fn check_text(field: &str, label: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, format!("{} cannot be empty", label)));
    }
    if value.chars().count() > max {
        return Err(AppError::validation(
            field,
            format!("{} is too long, maximum length is {} characters", label, max),
        ));
    }
    Ok(())
}

fn check_year(field: &str, label: &str, year: Option<i32>, current_year: i32) -> Result<()> {
    match year {
        Some(y) if y > current_year => Err(AppError::validation(
            field,
            format!("{} cannot be in the future", label),
        )),
        Some(y) if y < 0 => Err(AppError::validation(
            field,
            format!("{} cannot be negative", label),
        )),
        _ => Ok(()),
    }
}

/// Author create/update input
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AuthorDraft {
    pub first_name: String,
    pub last_name: String,
    pub year_of_birth: Option<i32>,
    pub year_of_death: Option<i32>,
    #[validate(length(max = 5000, message = "Biography is too long, maximum length is 5000 characters"))]
    pub biography: Option<String>,
    #[validate(url(message = "Photo must be a valid URL"))]
    pub photo_url: Option<String>,
    #[validate(url(message = "Website must be a valid URL"))]
    pub website_url: Option<String>,
}

impl AuthorDraft {
    pub fn clean(&self, current_year: i32) -> Result<()> {
        check_year("year_of_birth", "Year of birth", self.year_of_birth, current_year)?;
        check_year("year_of_death", "Year of death", self.year_of_death, current_year)?;
        if let (Some(birth), Some(death)) = (self.year_of_birth, self.year_of_death) {
            if birth > death {
                return Err(AppError::validation(
                    "year_of_birth",
                    "Year of birth cannot be after year of death",
                ));
            }
        }
        check_text("first_name", "First name", &self.first_name, AUTHOR_NAME_MAX)?;
        check_text("last_name", "Last name", &self.last_name, AUTHOR_NAME_MAX)?;
        self.validate()?;
        Ok(())
    }
}

/// Saga create/update input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SagaDraft {
    pub name: String,
    pub author_id: Uuid,
    #[validate(length(max = 5000, message = "Description is too long, maximum length is 5000 characters"))]
    pub description: Option<String>,
}

impl SagaDraft {
    pub fn clean(&self) -> Result<()> {
        check_text("name", "Saga name", &self.name, SAGA_NAME_MAX)?;
        self.validate()?;
        Ok(())
    }
}

/// Book create/update input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookDraft {
    pub title: String,
    pub author_id: Uuid,
    pub saga_id: Option<Uuid>,
    pub saga_volume: Option<i32>,
    pub publish_date: Option<NaiveDate>,
    #[validate(length(max = 1000, message = "Summary is too long, maximum length is 1000 characters"))]
    pub summary: Option<String>,
    pub isbn: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<Uuid>,
    pub language_id: Option<Uuid>,
    #[validate(url(message = "Cover must be a valid URL"))]
    pub cover_url: Option<String>,
}

impl BookDraft {
    /// `saga` is the record behind `saga_id`, when one is set
    pub fn clean(&self, today: NaiveDate, saga: Option<&Saga>) -> Result<()> {
        match (self.saga_id, self.saga_volume) {
            (Some(_), None) => {
                return Err(AppError::validation(
                    "saga_volume",
                    "Saga volume cannot be empty if saga is set",
                ))
            }
            (None, Some(_)) => {
                return Err(AppError::validation(
                    "saga_id",
                    "Saga cannot be empty if saga volume is set",
                ))
            }
            (Some(_), Some(volume)) if volume < 1 => {
                return Err(AppError::validation(
                    "saga_volume",
                    "Saga volume must be a positive number",
                ))
            }
            _ => {}
        }
        check_text("title", "Title", &self.title, TITLE_MAX)?;
        if let Some(date) = self.publish_date {
            if date > today {
                return Err(AppError::validation(
                    "publish_date",
                    "Publish date cannot be in the future",
                ));
            }
        }
        if let Some(saga) = saga {
            if saga.author_id != self.author_id {
                return Err(AppError::validation(
                    "saga_id",
                    "Saga author must be the same as the book author",
                ));
            }
        }
        if let Some(ref isbn) = self.isbn {
            let len = isbn.chars().count();
            if len != ISBN_LEN {
                return Err(AppError::validation(
                    "isbn",
                    format!("ISBN must have {} characters, current length is {}", ISBN_LEN, len),
                ));
            }
        }
        self.validate()?;
        Ok(())
    }
}

/// Genre create/update input
#[derive(Debug, Clone, Deserialize)]
pub struct GenreDraft {
    pub name: String,
}

impl GenreDraft {
    pub fn clean(&self) -> Result<()> {
        check_text("name", "Genre", &self.name, LOOKUP_NAME_MAX)
    }
}

/// Language create/update input
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageDraft {
    pub name: String,
}

impl LanguageDraft {
    pub fn clean(&self) -> Result<()> {
        check_text("name", "Language", &self.name, LOOKUP_NAME_MAX)
    }
}

/// Film create/update input
#[derive(Debug, Clone, Deserialize)]
pub struct FilmDraft {
    pub title: String,
    pub director: String,
    pub year: i32,
    #[serde(default)]
    pub synopsis: String,
    pub category: String,
}

impl FilmDraft {
    pub fn clean(&self, current_year: i32) -> Result<()> {
        check_text("title", "Title", &self.title, FILM_TEXT_MAX)?;
        check_text("director", "Director", &self.director, FILM_TEXT_MAX)?;
        check_text("category", "Category", &self.category, FILM_CATEGORY_MAX)?;
        // Films can be announced before release
        check_year("year", "Year", Some(self.year), current_year + 5)
    }
}

/// Reading status change
#[derive(Debug, Clone, Deserialize)]
pub struct StatusDraft {
    pub status: String,
}

impl StatusDraft {
    pub fn clean(&self) -> Result<ReadingStatus> {
        self.status
            .parse()
            .map_err(|message: String| AppError::validation("status", message))
    }
}

/// Rating of a book
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RatingDraft {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
}

impl RatingDraft {
    pub fn clean(&self) -> Result<i32> {
        self.validate()?;
        Ok(self.rating)
    }
}

/// Written review of a book
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDraft {
    pub review: String,
}

impl ReviewDraft {
    pub fn clean(&self) -> Result<String> {
        check_text("review", "Review", &self.review, REVIEW_MAX)?;
        Ok(self.review.trim().to_string())
    }
}

fn check_username(username: &str) -> Result<()> {
    check_text("username", "Username", username, USERNAME_MAX)?;
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        return Err(AppError::validation(
            "username",
            "Username may contain only letters, numbers, and @/./+/-/_ characters",
        ));
    }
    Ok(())
}

fn check_password(field: &str, password: &str, confirm: &str, min_length: usize) -> Result<()> {
    if password != confirm {
        return Err(AppError::validation(field, "Passwords do not match"));
    }
    if password.chars().count() < min_length {
        return Err(AppError::validation(
            field,
            format!(
                "This password is too short. It must contain at least {} characters.",
                min_length
            ),
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation(field, "This password is entirely numeric."));
    }
    Ok(())
}

/// Account registration input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegistrationDraft {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl RegistrationDraft {
    pub fn clean(&self, min_password_length: usize) -> Result<()> {
        check_username(&self.username)?;
        check_text("first_name", "First name", &self.first_name, AUTHOR_NAME_MAX)?;
        check_text("last_name", "Last name", &self.last_name, AUTHOR_NAME_MAX)?;
        self.validate()?;
        check_password("password", &self.password, &self.password_confirm, min_password_length)
    }
}

/// Profile update input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileDraft {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl ProfileDraft {
    pub fn clean(&self) -> Result<()> {
        check_text("first_name", "First name", &self.first_name, AUTHOR_NAME_MAX)?;
        check_text("last_name", "Last name", &self.last_name, AUTHOR_NAME_MAX)?;
        self.validate()?;
        Ok(())
    }
}

/// Password change input
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChangeDraft {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

impl PasswordChangeDraft {
    pub fn clean(&self, min_password_length: usize) -> Result<()> {
        check_password(
            "new_password",
            &self.new_password,
            &self.new_password_confirm,
            min_password_length,
        )
    }
}
