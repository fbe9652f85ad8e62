use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::roadmap::Streak;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub streak: u32,
    pub last_used: NaiveDate,
}

impl StreakRecord {
    pub fn advance(record: Option<Self>, today: NaiveDate) -> Self {
        let streak = match record {
            Some(record) if record.last_used == today => record.streak.max(1),
            Some(record) if record.last_used.succ_opt() == Some(today) => record.streak + 1,
            _ => 1,
        };
        Self {
            streak,
            last_used: today,
        }
    }
}

impl From<StreakRecord> for Streak {
    fn from(record: StreakRecord) -> Self {
        Self {
            streak: record.streak,
            last_used: Some(record.last_used.format("%Y-%m-%d").to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn first_visit_starts_at_one() {
        assert_eq!(StreakRecord::advance(None, day(4)).streak, 1);
    }

    #[test]
    fn same_day_keeps_and_next_day_increments() {
        let record = StreakRecord {
            streak: 4,
            last_used: day(4),
        };
        assert_eq!(StreakRecord::advance(Some(record), day(4)).streak, 4);
        assert_eq!(StreakRecord::advance(Some(record), day(5)).streak, 5);
    }

    #[test]
    fn gap_resets() {
        let record = StreakRecord {
            streak: 9,
            last_used: day(1),
        };
        let advanced = StreakRecord::advance(Some(record), day(4));
        assert_eq!(advanced.streak, 1);
        assert_eq!(advanced.last_used, day(4));
        assert_eq!(Streak::from(advanced).last_used.as_deref(), Some("2024-03-04"));
    }
}
