use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::models::{RawActivity, Sport};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("activity source transport failure: {0}")]
    Transport(String),
    #[error("activity source returned malformed data: {0}")]
    Malformed(String),
    #[error("no credentials for athlete {0}")]
    MissingCredentials(i64),
}

/// Read side of the activity provider. The pipeline only ever asks for a
/// window of raw activities and filters by sport itself.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn list_activities(
        &self,
        athlete_id: i64,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<RawActivity>, SourceError>;
}

/// Per-athlete API credential lookup, implemented by the store. Token
/// refresh is handled upstream of this crate.
#[async_trait]
pub trait AccessTokens: Send + Sync {
    async fn access_token(&self, athlete_id: i64) -> Result<String, SourceError>;
}

/// Strava v3 activities client.
pub struct StravaSource {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn AccessTokens>,
}

#[derive(Debug, Deserialize)]
struct StravaActivity {
    /// Strava reports athlete-local wall time with a spurious `Z` suffix,
    /// so this parses as UTC and the offset is dropped.
    start_date_local: DateTime<Utc>,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    total_elevation_gain: f64,
    #[serde(default)]
    moving_time: f64,
    #[serde(default = "default_sport_type")]
    sport_type: String,
}

fn default_sport_type() -> String {
    "Other".to_string()
}

impl StravaActivity {
    fn into_raw(self) -> RawActivity {
        let sport = match self.sport_type.as_str() {
            "Run" | "TrailRun" | "VirtualRun" => Sport::Run,
            "Ride" | "VirtualRide" | "GravelRide" => Sport::Ride,
            "Swim" => Sport::Swim,
            _ => Sport::Other,
        };
        RawActivity {
            start_date_local: self.start_date_local.naive_utc(),
            distance_meters: self.distance,
            elevation_gain_meters: self.total_elevation_gain,
            moving_time_seconds: self.moving_time,
            sport,
        }
    }
}

impl StravaSource {
    const PER_PAGE: usize = 200;

    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn AccessTokens>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }
}

#[async_trait]
impl ActivitySource for StravaSource {
    async fn list_activities(
        &self,
        athlete_id: i64,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<RawActivity>, SourceError> {
        let token = self.tokens.access_token(athlete_id).await?;
        let mut activities = Vec::new();
        let mut page = 1usize;

        loop {
            let response = self
                .http
                .get(format!("{}/athlete/activities", self.base_url))
                .bearer_auth(&token)
                .query(&[
                    ("after", after.timestamp().to_string()),
                    ("before", before.timestamp().to_string()),
                    ("per_page", Self::PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await
                .map_err(|e| SourceError::Transport(e.to_string()))?;

            if !response.status().is_success() {
                return Err(SourceError::Transport(format!(
                    "status {} listing activities for athlete {athlete_id}",
                    response.status()
                )));
            }

            let batch: Vec<StravaActivity> = response
                .json()
                .await
                .map_err(|e| SourceError::Malformed(e.to_string()))?;

            let batch_len = batch.len();
            activities.extend(batch.into_iter().map(StravaActivity::into_raw));

            if batch_len < Self::PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!(athlete_id, count = activities.len(), "fetched activities");
        Ok(activities)
    }
}
