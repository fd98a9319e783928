use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::day::DayOfWeek;
use super::session::SessionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceDistance {
    #[serde(rename = "5K")]
    FiveKilometer,
    #[serde(rename = "10K")]
    TenKilometer,
    #[serde(rename = "Half Marathon")]
    HalfMarathon,
    #[serde(rename = "Marathon")]
    Marathon,
    #[serde(rename = "Ultra Marathon")]
    UltraMarathon,
}

/// A day/session-type pairing the athlete would like their week shaped
/// around. Purely advisory context for generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdealSession {
    pub day: DayOfWeek,
    pub session_type: SessionType,
}

/// Athlete-supplied coaching preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub race_distance: Option<RaceDistance>,
    #[serde(default)]
    pub race_date: Option<NaiveDate>,
    #[serde(default)]
    pub ideal_training_week: Vec<IdealSession>,
}

impl Preferences {
    /// An active race goal selects the plan-derived target strategy.
    pub fn race_goal(&self) -> Option<(RaceDistance, NaiveDate)> {
        match (self.race_distance, self.race_date) {
            (Some(distance), Some(date)) => Some((distance, date)),
            _ => None,
        }
    }
}

/// One athlete as stored. `athlete_id` is the activity source's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Athlete {
    pub athlete_id: i64,
    pub email: Option<String>,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
}
