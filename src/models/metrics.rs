use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::day::DayOfWeek;

/// One calendar date's aggregated activity. Zero-activity dates are present
/// as placeholders with `activity_count == 0` and no pace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMetric {
    pub date: NaiveDate,
    pub day_of_week: DayOfWeek,
    pub week_of_year: u32,
    pub year: i32,
    pub distance_in_miles: f64,
    pub elevation_gain_in_feet: f64,
    pub moving_time_in_minutes: f64,
    pub pace_minutes_per_mile: Option<f64>,
    pub activity_count: u32,
}

impl DailyMetric {
    /// An empty placeholder metric for a date with no recorded activity.
    pub fn placeholder(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            date,
            day_of_week: DayOfWeek::from(date.weekday()),
            week_of_year: iso.week(),
            year: iso.year(),
            distance_in_miles: 0.0,
            elevation_gain_in_feet: 0.0,
            moving_time_in_minutes: 0.0,
            pace_minutes_per_mile: None,
            activity_count: 0,
        }
    }
}

/// One ISO week's rollup of daily metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekSummary {
    pub year: i32,
    pub week_of_year: u32,
    pub week_start_date: NaiveDate,
    pub total_distance: f64,
    pub longest_run: f64,
}
