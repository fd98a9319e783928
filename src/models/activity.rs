use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const METERS_PER_MILE: f64 = 1609.34;
pub const FEET_PER_METER: f64 = 3.28084;

/// Activity discipline as reported by the activity source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sport {
    Run,
    Ride,
    Swim,
    #[serde(other)]
    Other,
}

/// One raw activity record from the activity source, in source units
/// (meters and seconds). Aggregation converts to miles/feet/minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawActivity {
    pub start_date_local: NaiveDateTime,
    pub distance_meters: f64,
    pub elevation_gain_meters: f64,
    pub moving_time_seconds: f64,
    pub sport: Sport,
}

impl RawActivity {
    pub fn is_run(&self) -> bool {
        self.sport == Sport::Run
    }
}
