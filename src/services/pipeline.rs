use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::clients::notifier::Notifier;
use crate::clients::store::TrainingStore;
use crate::error::PipelineError;
use crate::models::{Athlete, DayOfWeek, TrainingWeek};
use crate::services::metrics_service::{rollup_weekly, MetricsService};
use crate::services::reconcile_service::ReconcileService;
use crate::services::target_service::TargetService;

/// History window fed to target setting and generation context.
const HISTORY_WEEKS: i64 = 52;

/// What kind of schedule refresh is being run. Sunday evening opens the
/// next week; every other evening reconciles the week in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    NewWeek,
    MidWeek,
}

impl Trigger {
    fn as_str(self) -> &'static str {
        match self {
            Trigger::NewWeek => "new_week",
            Trigger::MidWeek => "mid_week",
        }
    }
}

/// End-to-end refresh of one athlete's training week, plus the evening
/// sweep that runs it across every athlete on record.
pub struct TrainingPipeline {
    store: Arc<dyn TrainingStore>,
    notifier: Arc<dyn Notifier>,
    metrics: MetricsService,
    targets: TargetService,
    reconciler: ReconcileService,
    sweep_concurrency: usize,
}

impl TrainingPipeline {
    pub fn new(
        store: Arc<dyn TrainingStore>,
        notifier: Arc<dyn Notifier>,
        metrics: MetricsService,
        targets: TargetService,
        reconciler: ReconcileService,
        sweep_concurrency: usize,
    ) -> Self {
        Self {
            store,
            notifier,
            metrics,
            targets,
            reconciler,
            sweep_concurrency,
        }
    }

    /// Aggregate, target, reconcile, persist. The returned week is the one
    /// just stored.
    pub async fn update_training_week(
        &self,
        athlete: &Athlete,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> Result<TrainingWeek, PipelineError> {
        info!(
            athlete_id = athlete.athlete_id,
            trigger = trigger.as_str(),
            "updating training week"
        );

        let daily = self
            .metrics
            .daily_metrics(athlete.athlete_id, HISTORY_WEEKS, now)
            .await?;
        let summaries = rollup_weekly(&daily);
        let today = self.metrics.local_today(now);

        let target = self
            .targets
            .get_or_create(athlete, &summaries, today, trigger)
            .await?;
        let week = self
            .reconciler
            .reconcile(athlete, &daily, &target, trigger)
            .await?;

        self.store
            .upsert_training_week(athlete.athlete_id, &week)
            .await?;

        // Notification failures never fail the refresh itself.
        if let Err(e) = self.notifier.week_updated(athlete, &week).await {
            warn!(
                athlete_id = athlete.athlete_id,
                error = %e,
                "week-updated notification failed"
            );
        }

        Ok(week)
    }

    /// The evening sweep. Sunday opens a new week for everyone; other
    /// evenings reconcile, skipping athletes already refreshed today.
    pub async fn run_sweep(&self, now: DateTime<Utc>) {
        let today = self.metrics.local_today(now);
        let trigger = if DayOfWeek::from(today.weekday()) == DayOfWeek::Sun {
            Trigger::NewWeek
        } else {
            Trigger::MidWeek
        };

        let athletes = match self.store.list_athletes().await {
            Ok(athletes) => athletes,
            Err(e) => {
                error!(error = %e, "sweep aborted, could not list athletes");
                self.raise_alert("Training sweep aborted", &e.to_string())
                    .await;
                return;
            }
        };
        info!(
            athletes = athletes.len(),
            trigger = trigger.as_str(),
            "starting evening sweep"
        );

        stream::iter(athletes)
            .for_each_concurrent(self.sweep_concurrency, |athlete| async move {
                if let Err(e) = self.sweep_one(&athlete, trigger, now).await {
                    error!(
                        athlete_id = athlete.athlete_id,
                        error = %e,
                        "sweep failed for athlete"
                    );
                    self.raise_alert(
                        &format!("Training sweep failed for athlete {}", athlete.athlete_id),
                        &e.to_string(),
                    )
                    .await;
                }
            })
            .await;
    }

    async fn sweep_one(
        &self,
        athlete: &Athlete,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        if trigger == Trigger::MidWeek {
            let last = self.store.last_week_update(athlete.athlete_id).await?;
            let today = self.metrics.local_today(now);
            if last.is_some_and(|at| self.metrics.local_today(at) == today) {
                info!(
                    athlete_id = athlete.athlete_id,
                    "already refreshed today, skipping"
                );
                return Ok(());
            }
        }
        self.update_training_week(athlete, trigger, now).await?;
        Ok(())
    }

    async fn raise_alert(&self, subject: &str, body: &str) {
        if let Err(e) = self.notifier.alert(subject, body).await {
            warn!(error = %e, "alert email failed");
        }
    }
}
