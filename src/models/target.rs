use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Prescribed weekly volume and long-run distance, as produced by the
/// generative service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MileageTarget {
    /// Where the athlete is trending in terms of volume and why this target.
    pub rationale: String,
    pub total_volume: f64,
    pub long_run: f64,
}

/// Database row for a mileage target, keyed by (athlete, year, week).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MileageTargetRow {
    pub athlete_id: i64,
    pub year: i32,
    pub week_of_year: i32,
    pub rationale: String,
    pub total_volume: f64,
    pub long_run: f64,
    pub created_at: DateTime<Utc>,
}

impl MileageTargetRow {
    pub fn target(&self) -> MileageTarget {
        MileageTarget {
            rationale: self.rationale.clone(),
            total_volume: self.total_volume,
            long_run: self.long_run,
        }
    }
}

/// One Monday-aligned week between now and a race date, capped at the race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub week_number: u32,
    pub weeks_until_race: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekType {
    Build,
    Peak,
    Taper,
    Race,
}

impl WeekType {
    pub fn as_str(self) -> &'static str {
        match self {
            WeekType::Build => "build",
            WeekType::Peak => "peak",
            WeekType::Taper => "taper",
            WeekType::Race => "race",
        }
    }
}

/// One prescribed week of a multi-week plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlanWeek {
    pub week_start_date: NaiveDate,
    pub week_number: u32,
    pub weeks_until_race: i64,
    pub week_type: WeekType,
    /// How this week contributes to the race goal.
    pub notes: String,
    pub total_distance: f64,
    pub long_run_distance: f64,
}

/// A full multi-week plan from now to the race date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub weeks: Vec<TrainingPlanWeek>,
}

impl TrainingPlan {
    /// The first upcoming week's prescription, used as this week's target.
    pub fn first_week_target(&self) -> Option<MileageTarget> {
        self.weeks.first().map(|week| MileageTarget {
            rationale: week.notes.clone(),
            total_volume: week.total_distance,
            long_run: week.long_run_distance,
        })
    }
}
