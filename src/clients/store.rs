use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::activity_source::{AccessTokens, SourceError};
use crate::models::{
    Athlete, MileageTargetRow, Preferences, TrainingPlan, TrainingWeek,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored row is malformed: {0}")]
    Malformed(String),
}

/// Keyed upsert/read persistence for schedules and targets. No
/// transactional multi-row guarantees; most-recent-wins per athlete.
#[async_trait]
pub trait TrainingStore: Send + Sync {
    async fn list_athletes(&self) -> Result<Vec<Athlete>, StoreError>;

    async fn upsert_training_week(
        &self,
        athlete_id: i64,
        week: &TrainingWeek,
    ) -> Result<(), StoreError>;

    /// When the athlete's week was last written, used by the evening sweep
    /// to skip athletes already refreshed today.
    async fn last_week_update(
        &self,
        athlete_id: i64,
    ) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn get_mileage_target(
        &self,
        athlete_id: i64,
        year: i32,
        week_of_year: i32,
    ) -> Result<Option<MileageTargetRow>, StoreError>;

    async fn upsert_mileage_target(&self, row: &MileageTargetRow) -> Result<(), StoreError>;

    async fn insert_training_plan(
        &self,
        athlete_id: i64,
        plan: &TrainingPlan,
    ) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl TrainingStore for PostgresStore {
    async fn list_athletes(&self) -> Result<Vec<Athlete>, StoreError> {
        let rows = sqlx::query(
            "SELECT athlete_id, email, preferences, created_at FROM athlete ORDER BY athlete_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let preferences: String = row.try_get("preferences")?;
                let preferences: Preferences = serde_json::from_str(&preferences)
                    .map_err(|e| StoreError::Malformed(e.to_string()))?;
                Ok(Athlete {
                    athlete_id: row.try_get("athlete_id")?,
                    email: row.try_get("email")?,
                    preferences,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn upsert_training_week(
        &self,
        athlete_id: i64,
        week: &TrainingWeek,
    ) -> Result<(), StoreError> {
        let sessions = serde_json::to_string(week)
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        sqlx::query(
            "INSERT INTO training_week (athlete_id, sessions, created_at)
             VALUES ($1, $2, $3)",
        )
        .bind(athlete_id)
        .bind(sessions)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn last_week_update(
        &self,
        athlete_id: i64,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row = sqlx::query(
            "SELECT created_at FROM training_week
             WHERE athlete_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(athlete_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| row.try_get("created_at")).transpose().map_err(Into::into)
    }

    async fn get_mileage_target(
        &self,
        athlete_id: i64,
        year: i32,
        week_of_year: i32,
    ) -> Result<Option<MileageTargetRow>, StoreError> {
        let row = sqlx::query_as::<_, MileageTargetRow>(
            "SELECT athlete_id, year, week_of_year, rationale, total_volume, long_run, created_at
             FROM mileage_target
             WHERE athlete_id = $1 AND year = $2 AND week_of_year = $3",
        )
        .bind(athlete_id)
        .bind(year)
        .bind(week_of_year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_mileage_target(&self, row: &MileageTargetRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO mileage_target
                 (athlete_id, year, week_of_year, rationale, total_volume, long_run, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (athlete_id, year, week_of_year) DO UPDATE SET
                 rationale = EXCLUDED.rationale,
                 total_volume = EXCLUDED.total_volume,
                 long_run = EXCLUDED.long_run",
        )
        .bind(row.athlete_id)
        .bind(row.year)
        .bind(row.week_of_year)
        .bind(&row.rationale)
        .bind(row.total_volume)
        .bind(row.long_run)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_training_plan(
        &self,
        athlete_id: i64,
        plan: &TrainingPlan,
    ) -> Result<(), StoreError> {
        for week in &plan.weeks {
            sqlx::query(
                "INSERT INTO training_plan_week
                     (athlete_id, week_start_date, week_number, weeks_until_race,
                      week_type, notes, total_distance, long_run_distance, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (athlete_id, week_start_date) DO UPDATE SET
                     week_number = EXCLUDED.week_number,
                     weeks_until_race = EXCLUDED.weeks_until_race,
                     week_type = EXCLUDED.week_type,
                     notes = EXCLUDED.notes,
                     total_distance = EXCLUDED.total_distance,
                     long_run_distance = EXCLUDED.long_run_distance",
            )
            .bind(athlete_id)
            .bind(week.week_start_date)
            .bind(week.week_number as i32)
            .bind(week.weeks_until_race)
            .bind(week.week_type.as_str())
            .bind(&week.notes)
            .bind(week.total_distance)
            .bind(week.long_run_distance)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AccessTokens for PostgresStore {
    async fn access_token(&self, athlete_id: i64) -> Result<String, SourceError> {
        let row = sqlx::query("SELECT access_token FROM athlete_auth WHERE athlete_id = $1")
            .bind(athlete_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        match row {
            Some(row) => row
                .try_get("access_token")
                .map_err(|e| SourceError::Malformed(e.to_string())),
            None => Err(SourceError::MissingCredentials(athlete_id)),
        }
    }
}
