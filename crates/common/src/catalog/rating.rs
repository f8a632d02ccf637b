//! Rating aggregation
//!
//! Averages are computed live from the per-user relations, never stored.

use serde::Serialize;

use crate::db::models::UserBookRelation;

/// Arithmetic mean of the given ratings; `None` when there are none
pub fn average_rating(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    Some(sum as f64 / ratings.len() as f64)
}

/// Rating and review counts for a book, an author or a saga
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub ratings: u64,
    pub reviews: u64,
}

impl RatingSummary {
    /// Summarize a set of relations
    pub fn from_relations<'a, I>(relations: I) -> Self
    where
        I: IntoIterator<Item = &'a UserBookRelation>,
    {
        let mut ratings = Vec::new();
        let mut reviews = 0u64;

        for relation in relations {
            if let Some(rating) = relation.rating {
                ratings.push(rating);
            }
            if relation.review.as_deref().is_some_and(|r| !r.trim().is_empty()) {
                reviews += 1;
            }
        }

        Self {
            average: average_rating(&ratings),
            ratings: ratings.len() as u64,
            reviews,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn relation(rating: Option<i32>, review: Option<&str>) -> UserBookRelation {
        let now = Utc::now().into();
        UserBookRelation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            status: "read".to_string(),
            reading_date: None,
            read_date: None,
            rating,
            review: review.map(String::from),
            review_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_average_of_nothing_is_none() {
        assert_eq!(average_rating(&[]), None);
    }

    #[test]
    fn test_average_is_arithmetic_mean() {
        assert_eq!(average_rating(&[5]), Some(5.0));
        assert_eq!(average_rating(&[1, 2]), Some(1.5));
        assert_eq!(average_rating(&[4, 4, 5]), Some(13.0 / 3.0));
    }

    #[test]
    fn test_summary_skips_unrated_relations() {
        let relations = vec![
            relation(Some(4), Some("Great")),
            relation(None, None),
            relation(Some(2), Some("  ")),
        ];
        let summary = RatingSummary::from_relations(&relations);
        assert_eq!(summary.average, Some(3.0));
        assert_eq!(summary.ratings, 2);
        assert_eq!(summary.reviews, 1);
    }

    #[test]
    fn test_summary_without_ratings() {
        let relations = vec![relation(None, Some("No stars, just words"))];
        let summary = RatingSummary::from_relations(&relations);
        assert_eq!(summary.average, None);
        assert_eq!(summary.ratings, 0);
        assert_eq!(summary.reviews, 1);
    }
}
