use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use tracing::debug;

use crate::clients::activity_source::ActivitySource;
use crate::error::PipelineError;
use crate::models::{
    DailyMetric, DayOfWeek, RawActivity, WeekSummary, FEET_PER_METER, METERS_PER_MILE,
};

/// Aggregates raw activities into a dense daily metrics series and rolls
/// that series into weekly summaries.
pub struct MetricsService {
    source: Arc<dyn ActivitySource>,
    /// Athlete-local timezone, used to bound the window and bucket by date.
    local_offset: FixedOffset,
}

impl MetricsService {
    pub fn new(source: Arc<dyn ActivitySource>, utc_offset_hours: i32) -> Self {
        let local_offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        Self {
            source,
            local_offset,
        }
    }

    pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.local_offset).date_naive()
    }

    /// Daily running metrics for the trailing `num_weeks`, one entry per
    /// date ending today, zero-activity dates included.
    pub async fn daily_metrics(
        &self,
        athlete_id: i64,
        num_weeks: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<DailyMetric>, PipelineError> {
        let end = self.local_today(now);
        let start = end - Duration::weeks(num_weeks);
        let after = now - Duration::weeks(num_weeks) - Duration::days(1);

        let activities = self.source.list_activities(athlete_id, after, now).await?;
        let runs: Vec<RawActivity> = activities.into_iter().filter(|a| a.is_run()).collect();
        debug!(athlete_id, runs = runs.len(), "aggregating daily metrics");

        Ok(aggregate_daily_metrics(&runs, start, end))
    }

    /// Weekly rollups over the trailing `num_weeks`, leading partial week
    /// excluded.
    pub async fn weekly_summaries(
        &self,
        athlete_id: i64,
        num_weeks: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<WeekSummary>, PipelineError> {
        let daily = self.daily_metrics(athlete_id, num_weeks, now).await?;
        Ok(rollup_weekly(&daily))
    }
}

/// Bucket activities by local calendar date, synthesize placeholders for
/// every uncovered date in `[start, end]`, and sum each date's totals.
/// The result is dense: exactly one entry per date, ascending.
pub fn aggregate_daily_metrics(
    activities: &[RawActivity],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DailyMetric> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&RawActivity>> = BTreeMap::new();
    for activity in activities {
        let date = activity.start_date_local.date();
        if date >= start && date <= end {
            by_date.entry(date).or_default().push(activity);
        }
    }

    let mut results = Vec::new();
    let mut date = start;
    while date <= end {
        let metric = match by_date.get(&date) {
            Some(day_activities) => {
                let distance_meters: f64 =
                    day_activities.iter().map(|a| a.distance_meters).sum();
                let elevation_meters: f64 =
                    day_activities.iter().map(|a| a.elevation_gain_meters).sum();
                let moving_seconds: f64 =
                    day_activities.iter().map(|a| a.moving_time_seconds).sum();

                let distance_in_miles = distance_meters / METERS_PER_MILE;
                let moving_time_in_minutes = moving_seconds / 60.0;
                let pace_minutes_per_mile = if distance_in_miles > 0.0 {
                    Some(moving_time_in_minutes / distance_in_miles)
                } else {
                    None
                };

                let iso = date.iso_week();
                DailyMetric {
                    date,
                    day_of_week: DayOfWeek::from(date.weekday()),
                    week_of_year: iso.week(),
                    year: iso.year(),
                    distance_in_miles,
                    elevation_gain_in_feet: elevation_meters * FEET_PER_METER,
                    moving_time_in_minutes,
                    pace_minutes_per_mile,
                    activity_count: day_activities.len() as u32,
                }
            }
            None => DailyMetric::placeholder(date),
        };
        results.push(metric);
        date += Duration::days(1);
    }

    results
}

/// Roll a daily series into per-ISO-week sums and maxes. The earliest
/// (year, week) present is dropped: it can only be a partial week relative
/// to the requested window, even when the window boundary splits a week.
pub fn rollup_weekly(daily: &[DailyMetric]) -> Vec<WeekSummary> {
    let mut weeks: BTreeMap<(i32, u32), WeekSummary> = BTreeMap::new();
    for metric in daily {
        let entry = weeks
            .entry((metric.year, metric.week_of_year))
            .or_insert_with(|| WeekSummary {
                year: metric.year,
                week_of_year: metric.week_of_year,
                week_start_date: metric.date,
                total_distance: 0.0,
                longest_run: 0.0,
            });
        entry.total_distance += metric.distance_in_miles;
        entry.longest_run = entry.longest_run.max(metric.distance_in_miles);
        entry.week_start_date = entry.week_start_date.min(metric.date);
    }

    let mut summaries: Vec<WeekSummary> = weeks.into_values().collect();
    if !summaries.is_empty() {
        summaries.remove(0);
    }
    summaries
}
