use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::de::DeserializeOwned;
use statrs::statistics::{Data, OrderStatistics};
use tracing::info;

use crate::clients::generative::{generate_structured, GenerateError, GenerativeClient};
use crate::clients::store::TrainingStore;
use crate::error::PipelineError;
use crate::models::{
    Athlete, MileageTarget, MileageTargetRow, Preferences, TrainingPlan, WeekRange, WeekSummary,
};
use crate::services::pipeline::Trigger;
use crate::services::prompts;

/// Derives the week's prescribed volume and long-run distance, either
/// directly from trailing weekly summaries or by extracting the first week
/// of a race plan. Targets are computed once per (athlete, year, week) and
/// reused by every mid-week reconciliation of that week.
pub struct TargetService {
    llm: Arc<dyn GenerativeClient>,
    store: Arc<dyn TrainingStore>,
    schema_retries: u32,
}

impl TargetService {
    pub fn new(
        llm: Arc<dyn GenerativeClient>,
        store: Arc<dyn TrainingStore>,
        schema_retries: u32,
    ) -> Self {
        Self {
            llm,
            store,
            schema_retries: schema_retries.max(1),
        }
    }

    /// Fetch the persisted target for the week this trigger plans, or
    /// generate and persist one.
    pub async fn get_or_create(
        &self,
        athlete: &Athlete,
        summaries: &[WeekSummary],
        today: NaiveDate,
        trigger: Trigger,
    ) -> Result<MileageTarget, PipelineError> {
        let anchor = planned_week_anchor(today, trigger);
        let iso = anchor.iso_week();

        if let Some(row) = self
            .store
            .get_mileage_target(athlete.athlete_id, iso.year(), iso.week() as i32)
            .await?
        {
            return Ok(row.target());
        }

        // A mid-week miss must not feed the in-flight partial week into the
        // direct strategy: only completed weeks ground the target.
        let completed_summaries: Vec<WeekSummary> = match trigger {
            Trigger::NewWeek => summaries.to_vec(),
            Trigger::MidWeek => {
                let current = today.iso_week();
                summaries
                    .iter()
                    .filter(|w| (w.year, w.week_of_year) != (current.year(), current.week()))
                    .cloned()
                    .collect()
            }
        };

        let target = match athlete.preferences.race_goal() {
            Some((distance, race_date)) if race_date > today => {
                self.plan_derived_target(athlete, &completed_summaries, today, race_date, distance)
                    .await?
            }
            _ => {
                self.direct_target(&athlete.preferences, &completed_summaries, today)
                    .await?
            }
        };

        self.store
            .upsert_mileage_target(&MileageTargetRow {
                athlete_id: athlete.athlete_id,
                year: iso.year(),
                week_of_year: iso.week() as i32,
                rationale: target.rationale.clone(),
                total_volume: target.total_volume,
                long_run: target.long_run,
                created_at: Utc::now(),
            })
            .await?;

        info!(
            athlete_id = athlete.athlete_id,
            year = iso.year(),
            week = iso.week(),
            total_volume = target.total_volume,
            "persisted mileage target"
        );
        Ok(target)
    }

    /// Direct strategy: prescribe from the trailing completed weeks. The
    /// trailing summary must describe a complete week, so the in-flight
    /// week may never appear in `summaries`.
    pub async fn direct_target(
        &self,
        preferences: &Preferences,
        summaries: &[WeekSummary],
        today: NaiveDate,
    ) -> Result<MileageTarget, PipelineError> {
        if summaries.is_empty() {
            return Err(PipelineError::precondition(
                "direct target strategy requires at least one completed weekly summary",
            ));
        }
        let current = today.iso_week();
        if summaries
            .iter()
            .any(|w| (w.year, w.week_of_year) == (current.year(), current.week()))
            && today.weekday() != Weekday::Sun
        {
            return Err(PipelineError::precondition(
                "direct target strategy invoked mid-week on an incomplete trailing week",
            ));
        }

        let prompt = prompts::mileage_target_prompt(preferences, summaries);
        self.structured_with_retries::<MileageTarget>(
            &prompt,
            prompts::TARGET_SCHEMA_HINT,
            |target| {
                if target.total_volume < 0.0 || target.long_run < 0.0 {
                    Err("negative mileage prescription".to_string())
                } else {
                    Ok(())
                }
            },
        )
        .await
    }

    /// Plan-derived strategy: generate a full multi-week plan to the race,
    /// persist it, and use its first week as this week's target.
    async fn plan_derived_target(
        &self,
        athlete: &Athlete,
        summaries: &[WeekSummary],
        today: NaiveDate,
        race_date: NaiveDate,
        race_distance: crate::models::RaceDistance,
    ) -> Result<MileageTarget, PipelineError> {
        let week_ranges = week_ranges_to_race(today, race_date);
        if week_ranges.is_empty() {
            return Err(PipelineError::precondition(
                "race date leaves no full week to plan",
            ));
        }

        let mut sorted = summaries.to_vec();
        sorted.sort_by_key(|w| w.week_start_date);
        let mileages: Vec<f64> = sorted.iter().map(|w| w.total_distance).collect();
        let stats_52w = mileage_stats(&mileages);
        let stats_16w = mileage_stats(&mileages[mileages.len().saturating_sub(16)..]);

        let distance_label = serde_json::to_value(race_distance)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "race".to_string());

        let prompt = prompts::training_plan_prompt(
            &distance_label,
            race_date,
            today,
            &stats_52w,
            &stats_16w,
            &week_ranges,
        );

        let plan = self
            .structured_with_retries::<TrainingPlan>(&prompt, prompts::PLAN_SCHEMA_HINT, |plan| {
                if plan.weeks.is_empty() {
                    Err("plan contained no weeks".to_string())
                } else {
                    Ok(())
                }
            })
            .await?;

        self.store
            .insert_training_plan(athlete.athlete_id, &plan)
            .await?;

        Ok(plan
            .first_week_target()
            .expect("validated plan has at least one week"))
    }

    /// One structured call with the shared schema retry budget. A response
    /// failing `validate` counts as a schema failure.
    async fn structured_with_retries<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema_hint: &str,
        validate: impl Fn(&T) -> Result<(), String>,
    ) -> Result<T, PipelineError> {
        let mut last_error = None;
        for _ in 0..self.schema_retries {
            match generate_structured::<T>(self.llm.as_ref(), prompt, schema_hint).await {
                Ok(value) => match validate(&value) {
                    Ok(()) => return Ok(value),
                    Err(reason) => last_error = Some(GenerateError::Schema(reason)),
                },
                Err(error) => last_error = Some(error),
            }
        }
        Err(PipelineError::Generation {
            attempts: self.schema_retries,
            source: last_error.expect("at least one attempt recorded"),
        })
    }
}

/// The calendar week a trigger plans for: a Sunday-night fresh generation
/// targets the week starting tomorrow, every other invocation targets the
/// week containing today.
pub fn planned_week_anchor(today: NaiveDate, trigger: Trigger) -> NaiveDate {
    match trigger {
        Trigger::NewWeek if today.weekday() == Weekday::Sun => today + Duration::days(1),
        _ => today,
    }
}

/// Monday-aligned week ranges from today through the race date, each week
/// capped at the race. A Monday `today` starts the first range today.
pub fn week_ranges_to_race(today: NaiveDate, race_date: NaiveDate) -> Vec<WeekRange> {
    let days_until_monday = (7 - today.weekday().num_days_from_monday() as i64) % 7;
    let mut current = today + Duration::days(days_until_monday);

    let mut ranges = Vec::new();
    let mut week_number = 1u32;
    while current <= race_date {
        ranges.push(WeekRange {
            start_date: current,
            end_date: (current + Duration::days(6)).min(race_date),
            week_number,
            weeks_until_race: (race_date - current).num_days() / 7,
        });
        current += Duration::days(7);
        week_number += 1;
    }
    ranges
}

/// LLM-friendly description of a weekly mileage distribution.
pub fn mileage_stats(weekly_mileages: &[f64]) -> String {
    if weekly_mileages.is_empty() {
        return "No training history.".to_string();
    }

    let total: f64 = weekly_mileages.iter().sum();
    let mean = total / weekly_mileages.len() as f64;
    let max = weekly_mileages.iter().cloned().fold(f64::MIN, f64::max);
    let mut data = Data::new(weekly_mileages.to_vec());

    format!(
        "Total miles: {total:.1}\n\
         Avg miles per week: {mean:.1}\n\
         Median weekly mileage: {:.1}\n\
         75%ile of weekly mileage: {:.1}\n\
         90%ile of weekly mileage: {:.1}\n\
         Max weekly mileage: {max:.1}",
        data.median(),
        data.percentile(75),
        data.percentile(90),
    )
}
