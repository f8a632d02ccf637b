//! Catalog domain rules
//!
//! Everything here is independent of the database: input drafts and their
//! validation, rating arithmetic, the saga reading-status rollup and the
//! keyword search terms. The repository applies these rules around its
//! queries.

pub mod rating;
pub mod rollup;
pub mod search;
pub mod validation;

pub use rating::{average_rating, RatingSummary};
pub use rollup::{saga_rollup, SagaRollup};
pub use search::{search_key, SearchTerms};
pub use validation::{
    AuthorDraft, BookDraft, FilmDraft, GenreDraft, LanguageDraft, PasswordChangeDraft,
    ProfileDraft, RatingDraft, RegistrationDraft, ReviewDraft, SagaDraft, StatusDraft,
};

use chrono::{Datelike, NaiveDate, Utc};

/// Today's date (UTC), the reference for "not in the future" rules
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The current calendar year (UTC)
pub fn current_year() -> i32 {
    today().year()
}
