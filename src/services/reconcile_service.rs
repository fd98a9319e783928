use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use crate::clients::generative::{GenerateError, GenerativeClient};
use crate::error::PipelineError;
use crate::models::{
    Athlete, DailyMetric, DayOfWeek, MileageTarget, SessionType, TrainingSession, TrainingWeek,
};
use crate::services::pipeline::Trigger;
use crate::services::prompts;
use crate::services::schedule_service::{
    force_incomplete, standardize_week, ScheduleService, SegmentRequest,
};

/// How many trailing days of activity are shown to the synthesizer as
/// generation context.
const RECENT_DAYS_CONTEXT: usize = 14;

/// Splits an in-flight week into a confirmed segment and a regenerated
/// future segment, then merges them into one standardized week. A fresh
/// Sunday-night generation is the degenerate case where the confirmed
/// segment is empty and all seven days are regenerated.
pub struct ReconcileService {
    llm: Arc<dyn GenerativeClient>,
    schedule: ScheduleService,
    notes_retries: u32,
}

impl ReconcileService {
    pub fn new(
        llm: Arc<dyn GenerativeClient>,
        schedule: ScheduleService,
        notes_retries: u32,
    ) -> Self {
        Self {
            llm,
            schedule,
            notes_retries: notes_retries.max(1),
        }
    }

    /// Weekday symbols still open for planning, from `today`'s perspective.
    /// Sunday is the week boundary: a new-week trigger replans all seven
    /// days, a mid-week trigger has nothing left to plan.
    pub fn remaining_days(today: DayOfWeek, trigger: Trigger) -> Vec<DayOfWeek> {
        if today == DayOfWeek::Sun {
            return match trigger {
                Trigger::NewWeek => DayOfWeek::ALL.to_vec(),
                Trigger::MidWeek => Vec::new(),
            };
        }
        today.remaining_after()
    }

    /// Build the athlete's full week for this trigger: confirmed sessions
    /// for elapsed days, freshly synthesized sessions for the rest.
    ///
    /// `daily` must be the dense series ending today.
    pub async fn reconcile(
        &self,
        athlete: &Athlete,
        daily: &[DailyMetric],
        target: &MileageTarget,
        trigger: Trigger,
    ) -> Result<TrainingWeek, PipelineError> {
        let today = daily
            .last()
            .ok_or_else(|| PipelineError::precondition("daily metrics series is empty"))?;

        let rest_of_week = Self::remaining_days(today.day_of_week, trigger);
        let this_week = if rest_of_week.len() == 7 {
            &[][..]
        } else {
            let elapsed = 7 - rest_of_week.len();
            &daily[daily.len().saturating_sub(elapsed)..]
        };

        let completed = self.confirmed_sessions(daily, this_week, target).await?;
        let miles_completed: f64 = this_week.iter().map(|m| m.distance_in_miles).sum();
        let miles_remaining = target.total_volume - miles_completed;

        info!(
            athlete_id = athlete.athlete_id,
            miles_completed,
            miles_remaining,
            remaining_days = rest_of_week.len(),
            "reconciling week"
        );

        let recent_days = &daily[daily.len().saturating_sub(RECENT_DAYS_CONTEXT)..];
        let future = self
            .schedule
            .generate_segment(&SegmentRequest {
                preferences: &athlete.preferences,
                target,
                recent_days,
                days: &rest_of_week,
                miles_completed,
                miles_remaining,
            })
            .await?;
        let future = force_incomplete(future);

        // The confirmed record always wins a weekday collision.
        let confirmed_days: HashSet<DayOfWeek> = completed.iter().map(|s| s.day).collect();
        let mut sessions = completed;
        sessions.extend(
            future
                .sessions
                .into_iter()
                .filter(|s| !confirmed_days.contains(&s.day)),
        );

        Ok(standardize_week(TrainingWeek::new(sessions)))
    }

    /// One completed session per elapsed day, each carrying a coach-authored
    /// narrative of that day's performance against the trailing 7 days.
    async fn confirmed_sessions(
        &self,
        daily: &[DailyMetric],
        this_week: &[DailyMetric],
        target: &MileageTarget,
    ) -> Result<Vec<TrainingSession>, PipelineError> {
        let mut sessions = Vec::with_capacity(this_week.len());
        for day in this_week {
            let past_7_days: Vec<DailyMetric> = daily
                .iter()
                .filter(|m| m.date < day.date && m.date > day.date - Duration::days(7))
                .cloned()
                .collect();
            let notes = self.coaches_notes(day, &past_7_days).await?;
            sessions.push(TrainingSession {
                day: day.day_of_week,
                session_type: classify_confirmed(day, target),
                distance: day.distance_in_miles,
                notes,
                completed: true,
            });
        }
        Ok(sessions)
    }

    async fn coaches_notes(
        &self,
        day: &DailyMetric,
        past_7_days: &[DailyMetric],
    ) -> Result<String, PipelineError> {
        let prompt = prompts::coaches_notes_prompt(day, past_7_days);
        let mut last_error: Option<GenerateError> = None;
        for _ in 0..self.notes_retries {
            match self.llm.complete(&prompt).await {
                Ok(notes) => return Ok(notes),
                Err(error) => last_error = Some(error),
            }
        }
        Err(PipelineError::Generation {
            attempts: self.notes_retries,
            source: last_error.expect("at least one attempt recorded"),
        })
    }
}

/// Label a confirmed day by what the athlete actually ran.
fn classify_confirmed(day: &DailyMetric, target: &MileageTarget) -> SessionType {
    if day.distance_in_miles == 0.0 {
        SessionType::Rest
    } else if target.long_run > 0.0 && day.distance_in_miles >= 0.85 * target.long_run {
        SessionType::Long
    } else {
        SessionType::Easy
    }
}
