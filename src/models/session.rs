use serde::{Deserialize, Serialize};

use super::day::DayOfWeek;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    #[serde(rename = "easy run")]
    Easy,
    #[serde(rename = "long run")]
    Long,
    #[serde(rename = "speed workout")]
    Speed,
    #[serde(rename = "moderate run")]
    Moderate,
    #[serde(rename = "rest day")]
    Rest,
}

/// One day's prescribed workout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSession {
    pub day: DayOfWeek,
    pub session_type: SessionType,
    /// Distance in miles. Zero is only meaningful for rest days.
    pub distance: f64,
    /// Coaching rationale for the session.
    pub notes: String,
    /// True only for sessions backed by confirmed past activity.
    pub completed: bool,
}

impl TrainingSession {
    pub fn rest_day(day: DayOfWeek) -> Self {
        Self {
            day,
            session_type: SessionType::Rest,
            distance: 0.0,
            notes: "Rest day, take it easy!".to_string(),
            completed: false,
        }
    }
}

/// The canonical schedule object persisted and shown to the athlete. A
/// standardized week holds exactly 7 sessions, one per weekday, Monday-first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingWeek {
    pub sessions: Vec<TrainingSession>,
}

impl TrainingWeek {
    pub fn new(sessions: Vec<TrainingSession>) -> Self {
        Self { sessions }
    }

    pub fn total_mileage(&self) -> f64 {
        self.sessions.iter().map(|s| s.distance).sum()
    }

    pub fn completed_mileage(&self) -> f64 {
        self.sessions
            .iter()
            .filter(|s| s.completed)
            .map(|s| s.distance)
            .sum()
    }

    /// Percentage of prescribed mileage already run. None until the week has
    /// any prescribed mileage at all.
    pub fn progress_pct(&self) -> Option<f64> {
        let total = self.total_mileage();
        if total > 0.0 {
            Some(self.completed_mileage() / total * 100.0)
        } else {
            None
        }
    }
}
