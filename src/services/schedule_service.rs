use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::generative::{generate_structured, GenerateError, GenerativeClient};
use crate::config::ConvergencePolicy;
use crate::error::PipelineError;
use crate::models::{
    DailyMetric, DayOfWeek, MileageTarget, Preferences, TrainingSession, TrainingWeek,
};
use crate::services::prompts;

/// Everything the synthesizer needs to draft one week segment. For a fresh
/// week, `days` is all seven and `miles_completed` is zero; mid-week it is
/// the remaining days and the confirmed mileage so far.
pub struct SegmentRequest<'a> {
    pub preferences: &'a Preferences,
    pub target: &'a MileageTarget,
    pub recent_days: &'a [DailyMetric],
    pub days: &'a [DayOfWeek],
    pub miles_completed: f64,
    pub miles_remaining: f64,
}

/// Drives the draft/validate/regenerate convergence loop against the
/// generative service.
pub struct ScheduleService {
    llm: Arc<dyn GenerativeClient>,
    policy: ConvergencePolicy,
}

impl ScheduleService {
    pub fn new(llm: Arc<dyn GenerativeClient>, policy: ConvergencePolicy) -> Self {
        Self {
            llm,
            policy: policy.clamped(),
        }
    }

    /// Generate sessions covering exactly `request.days`, converging on the
    /// remaining-mileage target. Exhausting the regeneration budget is not
    /// an error: the best-seen attempt is returned.
    pub async fn generate_segment(
        &self,
        request: &SegmentRequest<'_>,
    ) -> Result<TrainingWeek, PipelineError> {
        if request.days.is_empty() {
            return Ok(TrainingWeek::default());
        }

        // An overshot week leaves a negative remainder; plan against zero
        // rather than rejecting the request (remaining days go light or rest).
        let segment_target = request.miles_remaining.max(0.0);

        let base_prompt = prompts::draft_week_prompt(
            request.preferences,
            request.target,
            request.recent_days,
            request.days,
            request.miles_completed,
            request.miles_remaining,
        );

        let mut best: Option<(TrainingWeek, f64)> = None;
        let mut previous: Option<TrainingWeek> = None;

        for attempt in 1..=self.policy.max_attempts {
            let prompt = match &previous {
                None => base_prompt.clone(),
                Some(prev) => prompts::retry_week_prompt(
                    &base_prompt,
                    &prev.sessions,
                    prev.total_mileage(),
                    segment_target,
                ),
            };

            let draft = self.request_draft(&prompt, request.days).await?;
            let actual = draft.total_mileage();
            let difference = (actual - segment_target).abs();

            if best.as_ref().map_or(true, |(_, best_diff)| difference < *best_diff) {
                best = Some((draft.clone(), difference));
            }

            if self.within_tolerance(actual, segment_target) {
                info!(attempt, actual, segment_target, "draft accepted");
                return Ok(draft);
            }

            info!(
                attempt,
                max_attempts = self.policy.max_attempts,
                actual,
                segment_target,
                difference,
                "draft rejected, regenerating"
            );
            previous = Some(draft);
        }

        let (week, difference) = best.expect("loop ran at least once");
        warn!(
            difference,
            segment_target, "retry budget exhausted, using best-seen draft"
        );
        Ok(week)
    }

    /// Accept when within the relative tolerance of the target, or within
    /// the absolute tolerance in miles.
    fn within_tolerance(&self, actual: f64, target: f64) -> bool {
        if (actual - target).abs() <= self.policy.absolute_tolerance_miles {
            return true;
        }
        target > 0.0 && (actual - target).abs() < self.policy.relative_tolerance * target
    }

    /// One structured draft request with its own schema retry budget.
    async fn request_draft(
        &self,
        prompt: &str,
        days: &[DayOfWeek],
    ) -> Result<TrainingWeek, PipelineError> {
        let mut last_error = None;
        for _ in 0..self.policy.schema_retries {
            let result = generate_structured::<TrainingWeek>(
                self.llm.as_ref(),
                prompt,
                prompts::WEEK_SCHEMA_HINT,
            )
            .await;
            match result {
                Ok(draft) => match restrict_to_days(draft, days) {
                    Ok(draft) => return Ok(draft),
                    Err(reason) => last_error = Some(GenerateError::Schema(reason)),
                },
                Err(error) => last_error = Some(error),
            }
        }
        Err(PipelineError::Generation {
            attempts: self.policy.schema_retries,
            source: last_error.expect("at least one attempt recorded"),
        })
    }
}

/// Drop sessions outside the requested days and duplicate weekdays (first
/// occurrence wins). A draft covering none of the requested days is a
/// schema-level failure.
fn restrict_to_days(week: TrainingWeek, days: &[DayOfWeek]) -> Result<TrainingWeek, String> {
    let allowed: HashSet<DayOfWeek> = days.iter().copied().collect();
    let mut seen = HashSet::new();
    let sessions: Vec<TrainingSession> = week
        .sessions
        .into_iter()
        .filter(|s| allowed.contains(&s.day) && seen.insert(s.day))
        .collect();

    if sessions.is_empty() && !days.is_empty() {
        return Err("draft covered none of the requested days".to_string());
    }
    Ok(TrainingWeek::new(sessions))
}

/// Normalize a session collection into exactly one entry per weekday:
/// duplicates dropped (first wins), omissions filled with rest days, sorted
/// Monday-first. Every downstream consumer relies on this shape.
pub fn standardize_week(week: TrainingWeek) -> TrainingWeek {
    let mut seen = HashSet::new();
    let mut sessions: Vec<TrainingSession> = week
        .sessions
        .into_iter()
        .filter(|s| seen.insert(s.day))
        .collect();

    for day in DayOfWeek::ALL {
        if !seen.contains(&day) {
            sessions.push(TrainingSession::rest_day(day));
        }
    }

    sessions.sort_by_key(|s| s.day.index());
    TrainingWeek::new(sessions)
}

/// Future sessions must never claim completion for days that have not
/// happened yet.
pub fn force_incomplete(week: TrainingWeek) -> TrainingWeek {
    TrainingWeek::new(
        week.sessions
            .into_iter()
            .map(|mut session| {
                session.completed = false;
                session
            })
            .collect(),
    )
}
