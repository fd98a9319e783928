#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use run_coach::clients::activity_source::{ActivitySource, SourceError};
use run_coach::clients::generative::{GenerateError, GenerativeClient};
use run_coach::clients::notifier::{Notifier, NotifyError};
use run_coach::clients::store::{StoreError, TrainingStore};
use run_coach::models::{
    Athlete, DayOfWeek, MileageTargetRow, Preferences, RawActivity, Sport, TrainingPlan,
    TrainingWeek,
};

pub fn athlete(athlete_id: i64) -> Athlete {
    Athlete {
        athlete_id,
        email: Some(format!("runner{athlete_id}@example.com")),
        preferences: Preferences::default(),
        created_at: Utc::now(),
    }
}

pub fn run_activity(date: &str, miles: f64) -> RawActivity {
    let date: NaiveDate = date.parse().unwrap();
    RawActivity {
        start_date_local: date.and_time(NaiveTime::from_hms_opt(7, 0, 0).unwrap()),
        distance_meters: miles * 1609.34,
        elevation_gain_meters: 50.0,
        moving_time_seconds: miles * 9.0 * 60.0,
        sport: Sport::Run,
    }
}

/// Activity source returning a fixed history, with optional per-athlete
/// failure injection.
pub struct FixedActivities {
    activities: Vec<RawActivity>,
    failing_athletes: Vec<i64>,
}

impl FixedActivities {
    pub fn new(activities: Vec<RawActivity>) -> Self {
        Self {
            activities,
            failing_athletes: Vec::new(),
        }
    }

    pub fn failing_for(mut self, athlete_id: i64) -> Self {
        self.failing_athletes.push(athlete_id);
        self
    }
}

#[async_trait]
impl ActivitySource for FixedActivities {
    async fn list_activities(
        &self,
        athlete_id: i64,
        _after: DateTime<Utc>,
        _before: DateTime<Utc>,
    ) -> Result<Vec<RawActivity>, SourceError> {
        if self.failing_athletes.contains(&athlete_id) {
            return Err(SourceError::Transport("injected failure".to_string()));
        }
        Ok(self.activities.clone())
    }
}

/// Generative client that replays a fixed sequence of JSON bodies for
/// structured calls and a canned string for narrative calls.
pub struct ScriptedLlm {
    responses: Mutex<Vec<serde_json::Value>>,
    calls: Mutex<u32>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<serde_json::Value>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl GenerativeClient for ScriptedLlm {
    async fn complete(&self, _message: &str) -> Result<String, GenerateError> {
        Ok("Nice work out there.".to_string())
    }

    async fn complete_json(&self, _message: &str) -> Result<serde_json::Value, GenerateError> {
        *self.calls.lock().unwrap() += 1;
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(GenerateError::Transport("script exhausted".to_string()));
        }
        Ok(responses.remove(0))
    }
}

pub fn target_json(total_volume: f64, long_run: f64) -> serde_json::Value {
    serde_json::json!({
        "rationale": "steady block, hold the volume",
        "total_volume": total_volume,
        "long_run": long_run,
    })
}

/// A full-week draft whose six running days sum to `total` miles (Friday
/// is a rest day).
pub fn draft_json(total: f64) -> serde_json::Value {
    let per_day = total / 6.0;
    let sessions: Vec<serde_json::Value> = DayOfWeek::ALL
        .iter()
        .map(|day| {
            let (session_type, distance) = if *day == DayOfWeek::Fri {
                ("rest day", 0.0)
            } else {
                ("easy run", per_day)
            };
            serde_json::json!({
                "day": day.as_str(),
                "session_type": session_type,
                "distance": distance,
                "notes": "steady",
                "completed": false,
            })
        })
        .collect();
    serde_json::json!({ "sessions": sessions })
}

#[derive(Default)]
struct StoreState {
    athletes: Vec<Athlete>,
    weeks: HashMap<i64, Vec<(TrainingWeek, DateTime<Utc>)>>,
    targets: HashMap<(i64, i32, i32), MileageTargetRow>,
    plans: Vec<(i64, TrainingPlan)>,
}

/// Store fake mirroring the Postgres store's most-recent-wins semantics.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new(athletes: Vec<Athlete>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                athletes,
                ..Default::default()
            }),
        }
    }

    pub fn seed_week(&self, athlete_id: i64, week: TrainingWeek, at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state.weeks.entry(athlete_id).or_default().push((week, at));
    }

    pub fn seed_target(&self, row: MileageTargetRow) {
        let mut state = self.state.lock().unwrap();
        state
            .targets
            .insert((row.athlete_id, row.year, row.week_of_year), row);
    }

    pub fn stored_weeks(&self, athlete_id: i64) -> Vec<TrainingWeek> {
        let state = self.state.lock().unwrap();
        state
            .weeks
            .get(&athlete_id)
            .map(|rows| rows.iter().map(|(week, _)| week.clone()).collect())
            .unwrap_or_default()
    }

    pub fn stored_target(&self, athlete_id: i64, year: i32, week: i32) -> Option<MileageTargetRow> {
        let state = self.state.lock().unwrap();
        state.targets.get(&(athlete_id, year, week)).cloned()
    }

    pub fn stored_plans(&self, athlete_id: i64) -> Vec<TrainingPlan> {
        let state = self.state.lock().unwrap();
        state
            .plans
            .iter()
            .filter(|(id, _)| *id == athlete_id)
            .map(|(_, plan)| plan.clone())
            .collect()
    }
}

#[async_trait]
impl TrainingStore for InMemoryStore {
    async fn list_athletes(&self) -> Result<Vec<Athlete>, StoreError> {
        Ok(self.state.lock().unwrap().athletes.clone())
    }

    async fn upsert_training_week(
        &self,
        athlete_id: i64,
        week: &TrainingWeek,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state
            .weeks
            .entry(athlete_id)
            .or_default()
            .push((week.clone(), Utc::now()));
        Ok(())
    }

    async fn last_week_update(
        &self,
        athlete_id: i64,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .weeks
            .get(&athlete_id)
            .and_then(|rows| rows.last())
            .map(|(_, at)| *at))
    }

    async fn get_mileage_target(
        &self,
        athlete_id: i64,
        year: i32,
        week_of_year: i32,
    ) -> Result<Option<MileageTargetRow>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.targets.get(&(athlete_id, year, week_of_year)).cloned())
    }

    async fn upsert_mileage_target(&self, row: &MileageTargetRow) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state
            .targets
            .insert((row.athlete_id, row.year, row.week_of_year), row.clone());
        Ok(())
    }

    async fn insert_training_plan(
        &self,
        athlete_id: i64,
        plan: &TrainingPlan,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.plans.push((athlete_id, plan.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct NotifierLog {
    pub week_updates: Vec<i64>,
    pub alerts: Vec<String>,
}

/// Notifier fake recording every delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    log: Mutex<NotifierLog>,
}

impl RecordingNotifier {
    pub fn week_updates(&self) -> Vec<i64> {
        self.log.lock().unwrap().week_updates.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.log.lock().unwrap().alerts.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn week_updated(
        &self,
        athlete: &Athlete,
        _week: &TrainingWeek,
    ) -> Result<(), NotifyError> {
        self.log.lock().unwrap().week_updates.push(athlete.athlete_id);
        Ok(())
    }

    async fn alert(&self, subject: &str, _body: &str) -> Result<(), NotifyError> {
        self.log.lock().unwrap().alerts.push(subject.to_string());
        Ok(())
    }
}
