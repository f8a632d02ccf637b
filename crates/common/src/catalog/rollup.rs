//! Saga-wide reading status for one user
//!
//! Each book of the saga scores read=3, reading=2, to read=1, untracked=0.
//! The saga is read only when every book is read, reading as soon as any
//! book has been started, and to read when the only marks are "to read".

use serde::Serialize;

use crate::db::models::ReadingStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SagaRollup {
    pub status: Option<ReadingStatus>,
    pub score: u32,
    pub possible_score: u32,
    pub books: usize,
    pub read: usize,
    pub reading: usize,
    pub to_read: usize,
}

/// Roll the per-book statuses of a saga up into one status
pub fn saga_rollup(statuses: &[Option<ReadingStatus>]) -> SagaRollup {
    let mut rollup = SagaRollup {
        books: statuses.len(),
        possible_score: ReadingStatus::Read.score() * statuses.len() as u32,
        ..SagaRollup::default()
    };

    for status in statuses.iter().flatten() {
        rollup.score += status.score();
        match status {
            ReadingStatus::Read => rollup.read += 1,
            ReadingStatus::Reading => rollup.reading += 1,
            ReadingStatus::ToRead => rollup.to_read += 1,
        }
    }

    rollup.status = if rollup.score == 0 {
        None
    } else if rollup.score == rollup.possible_score {
        Some(ReadingStatus::Read)
    } else if rollup.read + rollup.reading > 0 {
        Some(ReadingStatus::Reading)
    } else {
        Some(ReadingStatus::ToRead)
    };

    rollup
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReadingStatus::*;

    #[test]
    fn test_empty_saga_has_no_status() {
        let rollup = saga_rollup(&[]);
        assert_eq!(rollup.status, None);
        assert_eq!(rollup.possible_score, 0);
    }

    #[test]
    fn test_untracked_saga_has_no_status() {
        assert_eq!(saga_rollup(&[None, None]).status, None);
    }

    #[test]
    fn test_all_read_is_read() {
        let rollup = saga_rollup(&[Some(Read), Some(Read), Some(Read)]);
        assert_eq!(rollup.status, Some(Read));
        assert_eq!(rollup.score, 9);
        assert_eq!(rollup.read, 3);
    }

    #[test]
    fn test_all_reading_is_reading() {
        // The score of an all-reading saga exceeds 2/3 of the maximum; it must
        // still not count as read.
        let rollup = saga_rollup(&[Some(Reading), Some(Reading), Some(Reading)]);
        assert_eq!(rollup.status, Some(Reading));
    }

    #[test]
    fn test_partially_read_is_reading() {
        assert_eq!(saga_rollup(&[Some(Read), None, None]).status, Some(Reading));
        assert_eq!(saga_rollup(&[Some(Read), Some(ToRead)]).status, Some(Reading));
    }

    #[test]
    fn test_only_planned_is_to_read() {
        let rollup = saga_rollup(&[Some(ToRead), None, Some(ToRead)]);
        assert_eq!(rollup.status, Some(ToRead));
        assert_eq!(rollup.to_read, 2);
        assert_eq!(rollup.score, 2);
    }
}
