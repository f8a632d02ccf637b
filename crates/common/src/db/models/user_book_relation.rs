//! Per-user reading status, rating and review of a book

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reading status of a book for one user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    Read,
    Reading,
    ToRead,
}

impl ReadingStatus {
    pub const ALL: [ReadingStatus; 3] = [
        ReadingStatus::Read,
        ReadingStatus::Reading,
        ReadingStatus::ToRead,
    ];

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::Read => "read",
            ReadingStatus::Reading => "reading",
            ReadingStatus::ToRead => "to_read",
        }
    }

    /// Weight of the status in the saga rollup
    pub fn score(&self) -> u32 {
        match self {
            ReadingStatus::Read => 3,
            ReadingStatus::Reading => 2,
            ReadingStatus::ToRead => 1,
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(ReadingStatus::Read),
            "reading" => Ok(ReadingStatus::Reading),
            "to_read" => Ok(ReadingStatus::ToRead),
            other => Err(format!(
                "Invalid status '{}', must be 'read', 'reading' or 'to_read'",
                other
            )),
        }
    }
}

impl From<ReadingStatus> for String {
    fn from(status: ReadingStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_book_relations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub book_id: Uuid,

    #[sea_orm(column_type = "String(StringLen::N(16))")]
    pub status: String,

    pub reading_date: Option<Date>,

    pub read_date: Option<Date>,

    pub rating: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub review: Option<String>,

    pub review_date: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the status as an enum; unknown stored values read as "to read"
    pub fn reading_status(&self) -> ReadingStatus {
        self.status.parse().unwrap_or(ReadingStatus::ToRead)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id",
        on_delete = "Cascade"
    )]
    Book,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        for status in ReadingStatus::ALL {
            assert_eq!(status.as_str().parse::<ReadingStatus>(), Ok(status));
        }
        assert!("finished".parse::<ReadingStatus>().is_err());
    }

    #[test]
    fn test_status_scores() {
        assert_eq!(ReadingStatus::Read.score(), 3);
        assert_eq!(ReadingStatus::Reading.score(), 2);
        assert_eq!(ReadingStatus::ToRead.score(), 1);
    }
}
