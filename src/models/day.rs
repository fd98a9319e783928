use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Canonical weekday vocabulary used by the standardizer, the reconciler and
/// persistence. Ordering is Monday-first and is the only session sort order
/// in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    /// Zero-based position in the Monday-first week.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|d| *d == self).unwrap_or(0)
    }

    /// Days strictly after `self` in the same week. Empty for Sunday.
    pub fn remaining_after(self) -> Vec<DayOfWeek> {
        Self::ALL[self.index() + 1..].to_vec()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Mon => "mon",
            DayOfWeek::Tue => "tue",
            DayOfWeek::Wed => "wed",
            DayOfWeek::Thu => "thu",
            DayOfWeek::Fri => "fri",
            DayOfWeek::Sat => "sat",
            DayOfWeek::Sun => "sun",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Mon,
            Weekday::Tue => DayOfWeek::Tue,
            Weekday::Wed => DayOfWeek::Wed,
            Weekday::Thu => DayOfWeek::Thu,
            Weekday::Fri => DayOfWeek::Fri,
            Weekday::Sat => DayOfWeek::Sat,
            Weekday::Sun => DayOfWeek::Sun,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_monday_first() {
        assert_eq!(DayOfWeek::Mon.index(), 0);
        assert_eq!(DayOfWeek::Sun.index(), 6);
        let mut sorted = vec![DayOfWeek::Sun, DayOfWeek::Wed, DayOfWeek::Mon];
        sorted.sort_by_key(|d| d.index());
        assert_eq!(sorted, vec![DayOfWeek::Mon, DayOfWeek::Wed, DayOfWeek::Sun]);
    }

    #[test]
    fn remaining_after_excludes_current_day() {
        assert_eq!(
            DayOfWeek::Thu.remaining_after(),
            vec![DayOfWeek::Fri, DayOfWeek::Sat, DayOfWeek::Sun]
        );
        assert!(DayOfWeek::Sun.remaining_after().is_empty());
    }

    #[test]
    fn serializes_as_lowercase_abbreviation() {
        assert_eq!(serde_json::to_string(&DayOfWeek::Tue).unwrap(), "\"tue\"");
        let day: DayOfWeek = serde_json::from_str("\"sat\"").unwrap();
        assert_eq!(day, DayOfWeek::Sat);
    }
}
