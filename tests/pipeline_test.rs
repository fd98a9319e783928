mod common;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use pretty_assertions::assert_eq;

use common::{
    athlete, draft_json, run_activity, target_json, FixedActivities, InMemoryStore,
    RecordingNotifier, ScriptedLlm,
};
use run_coach::clients::activity_source::ActivitySource;
use run_coach::config::ConvergencePolicy;
use run_coach::models::{
    DayOfWeek, MileageTargetRow, Preferences, RaceDistance, RawActivity, SessionType, TrainingWeek,
};
use run_coach::services::{
    MetricsService, ReconcileService, ScheduleService, TargetService, TrainingPipeline, Trigger,
};

fn pipeline(
    llm: Arc<ScriptedLlm>,
    store: Arc<InMemoryStore>,
    source: Arc<dyn ActivitySource>,
    notifier: Arc<RecordingNotifier>,
) -> TrainingPipeline {
    let metrics = MetricsService::new(source, 0);
    let targets = TargetService::new(llm.clone(), store.clone(), 3);
    let schedule = ScheduleService::new(llm.clone(), ConvergencePolicy::default());
    let reconciler = ReconcileService::new(llm, schedule, 3);
    TrainingPipeline::new(store, notifier, metrics, targets, reconciler, 1)
}

/// Eight complete weeks of Tue/Sat runs, the last full week ending
/// Saturday 2024-06-08.
fn history() -> Vec<RawActivity> {
    let mut runs = Vec::new();
    let first_tuesday: NaiveDate = "2024-04-16".parse().unwrap();
    for week in 0..8 {
        let tuesday = first_tuesday + Duration::weeks(week);
        runs.push(run_activity(&tuesday.to_string(), 5.0));
        runs.push(run_activity(&(tuesday + Duration::days(4)).to_string(), 10.0));
    }
    runs
}

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

#[tokio::test]
async fn midweek_update_keeps_confirmed_days_and_replans_the_rest() {
    let mut activities = history();
    activities.push(run_activity("2024-06-10", 5.0));
    activities.push(run_activity("2024-06-11", 6.0));

    let llm = Arc::new(ScriptedLlm::new(vec![
        target_json(45.0, 14.0),
        // Trimmed to Thu..Sun: three 68/6-mile runs plus Friday rest, 34 mi.
        draft_json(68.0),
    ]));
    let store = Arc::new(InMemoryStore::new(vec![athlete(1)]));
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = pipeline(
        llm.clone(),
        store.clone(),
        Arc::new(FixedActivities::new(activities)),
        notifier.clone(),
    );

    // Wednesday evening.
    let week = pipeline
        .update_training_week(&athlete(1), Trigger::MidWeek, utc("2024-06-12T23:00:00Z"))
        .await
        .unwrap();

    assert_eq!(week.sessions.len(), 7);
    let days: HashSet<DayOfWeek> = week.sessions.iter().map(|s| s.day).collect();
    assert_eq!(days.len(), 7);

    let completed: Vec<_> = week.sessions.iter().filter(|s| s.completed).collect();
    assert_eq!(
        completed.iter().map(|s| s.day).collect::<Vec<_>>(),
        vec![DayOfWeek::Mon, DayOfWeek::Tue, DayOfWeek::Wed]
    );
    // No run logged today, so today reads as a completed rest day.
    assert_eq!(completed[2].session_type, SessionType::Rest);
    assert!((week.completed_mileage() - 11.0).abs() < 0.01);
    assert!((week.total_mileage() - 45.0).abs() < 0.01);

    assert_eq!(store.stored_weeks(1).len(), 1);
    let row = store.stored_target(1, 2024, 24).expect("target persisted");
    assert_eq!(row.total_volume, 45.0);
    assert_eq!(notifier.week_updates(), vec![1]);
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn persisted_target_is_reused_across_refreshes_of_the_same_week() {
    let mut activities = history();
    activities.push(run_activity("2024-06-10", 5.0));

    // Tuesday leaves Wed..Sun open, four of them running days: the trimmed
    // 60-mile draft covers the 40 miles still owed.
    let llm = Arc::new(ScriptedLlm::new(vec![draft_json(60.0)]));
    let store = Arc::new(InMemoryStore::new(vec![athlete(1)]));
    store.seed_target(MileageTargetRow {
        athlete_id: 1,
        year: 2024,
        week_of_year: 24,
        rationale: "hold steady".to_string(),
        total_volume: 45.0,
        long_run: 14.0,
        created_at: Utc::now(),
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = pipeline(
        llm.clone(),
        store.clone(),
        Arc::new(FixedActivities::new(activities)),
        notifier,
    );

    pipeline
        .update_training_week(&athlete(1), Trigger::MidWeek, utc("2024-06-11T23:00:00Z"))
        .await
        .unwrap();

    // Only the draft hit the generative service; the target came from the
    // store.
    assert_eq!(llm.call_count(), 1);
    let row = store.stored_target(1, 2024, 24).unwrap();
    assert_eq!(row.rationale, "hold steady");
}

#[tokio::test]
async fn sunday_new_week_plans_all_seven_days_for_the_next_week() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        target_json(42.0, 13.0),
        draft_json(42.0),
    ]));
    let store = Arc::new(InMemoryStore::new(vec![athlete(1)]));
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = pipeline(
        llm.clone(),
        store.clone(),
        Arc::new(FixedActivities::new(history())),
        notifier,
    );

    // Sunday evening.
    let week = pipeline
        .update_training_week(&athlete(1), Trigger::NewWeek, utc("2024-06-16T23:00:00Z"))
        .await
        .unwrap();

    assert_eq!(week.sessions.len(), 7);
    assert!(week.sessions.iter().all(|s| !s.completed));
    assert!((week.total_mileage() - 42.0).abs() < 0.01);

    // A Sunday-night fresh generation targets next week's ISO slot.
    assert!(store.stored_target(1, 2024, 25).is_some());
    assert!(store.stored_target(1, 2024, 24).is_none());
}

#[tokio::test]
async fn race_goal_switches_to_the_plan_derived_target() {
    let mut racer = athlete(1);
    racer.preferences = Preferences {
        race_distance: Some(RaceDistance::Marathon),
        race_date: Some("2024-09-15".parse().unwrap()),
        ideal_training_week: Vec::new(),
    };

    let plan = serde_json::json!({
        "weeks": [
            {
                "week_start_date": "2024-06-17",
                "week_number": 1,
                "weeks_until_race": 12,
                "week_type": "build",
                "notes": "base building toward the marathon",
                "total_distance": 40.0,
                "long_run_distance": 12.0
            },
            {
                "week_start_date": "2024-06-24",
                "week_number": 2,
                "weeks_until_race": 11,
                "week_type": "build",
                "notes": "extend the long run",
                "total_distance": 43.0,
                "long_run_distance": 14.0
            }
        ]
    });
    let llm = Arc::new(ScriptedLlm::new(vec![plan, draft_json(40.0)]));
    let store = Arc::new(InMemoryStore::new(vec![racer.clone()]));
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = pipeline(
        llm.clone(),
        store.clone(),
        Arc::new(FixedActivities::new(history())),
        notifier,
    );

    pipeline
        .update_training_week(&racer, Trigger::NewWeek, utc("2024-06-16T23:00:00Z"))
        .await
        .unwrap();

    // The plan was persisted and its first week became this week's target.
    assert_eq!(store.stored_plans(1).len(), 1);
    let row = store.stored_target(1, 2024, 25).unwrap();
    assert_eq!(row.total_volume, 40.0);
    assert_eq!(row.long_run, 12.0);
}

#[tokio::test]
async fn midweek_sweep_skips_refreshed_athletes_and_alerts_on_failures() {
    let athletes = vec![athlete(1), athlete(2), athlete(3)];
    let llm = Arc::new(ScriptedLlm::new(vec![
        target_json(45.0, 14.0),
        draft_json(68.0),
    ]));
    let store = Arc::new(InMemoryStore::new(athletes));
    // Athlete 3 was already refreshed earlier today.
    store.seed_week(3, TrainingWeek::default(), utc("2024-06-12T02:00:00Z"));

    let mut activities = history();
    activities.push(run_activity("2024-06-10", 5.0));
    activities.push(run_activity("2024-06-11", 6.0));
    let source = Arc::new(FixedActivities::new(activities).failing_for(2));

    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = pipeline(llm.clone(), store.clone(), source, notifier.clone());

    // Wednesday evening sweep.
    pipeline.run_sweep(utc("2024-06-12T23:00:00Z")).await;

    assert_eq!(notifier.week_updates(), vec![1]);
    assert_eq!(store.stored_weeks(1).len(), 1);
    assert!(store.stored_weeks(2).is_empty());
    // Seeded row only; no second refresh.
    assert_eq!(store.stored_weeks(3).len(), 1);

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("athlete 2"));
}

#[tokio::test]
async fn sunday_sweep_replans_even_athletes_refreshed_today() {
    let athletes = vec![athlete(1), athlete(2)];
    let llm = Arc::new(ScriptedLlm::new(vec![
        target_json(42.0, 13.0),
        draft_json(42.0),
        target_json(38.0, 12.0),
        draft_json(38.0),
    ]));
    let store = Arc::new(InMemoryStore::new(athletes));
    store.seed_week(2, TrainingWeek::default(), utc("2024-06-16T02:00:00Z"));

    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = pipeline(
        llm.clone(),
        store.clone(),
        Arc::new(FixedActivities::new(history())),
        notifier.clone(),
    );

    pipeline.run_sweep(utc("2024-06-16T23:00:00Z")).await;

    // New-week night: the already-refreshed-today skip does not apply.
    assert_eq!(notifier.week_updates(), vec![1, 2]);
    assert_eq!(store.stored_weeks(1).len(), 1);
    assert_eq!(store.stored_weeks(2).len(), 2);
}
