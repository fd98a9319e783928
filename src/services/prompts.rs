//! Prompt builders for the generative coaching calls. Each structured call
//! pairs a prompt with a schema hint describing the JSON shape expected
//! back.

use crate::models::{
    DailyMetric, DayOfWeek, MileageTarget, Preferences, TrainingSession, WeekRange, WeekSummary,
};

pub const COACH_ROLE: &str = "You are a talented running coach with years of experience. \
You have been hired by an athlete to help them improve their running.";

pub const TARGET_SCHEMA_HINT: &str = "Fields: rationale (string, where the athlete is trending \
in terms of volume and why this target), total_volume (number, miles for next week), \
long_run (number, miles for next week's longest run).";

pub const PLAN_SCHEMA_HINT: &str = "Fields: weeks (array). Each week has week_start_date \
(YYYY-MM-DD), week_number (integer), weeks_until_race (integer), week_type (one of \
\"build\", \"peak\", \"taper\", \"race\"), notes (string, how the week serves the race goal), \
total_distance (number, miles), long_run_distance (number, miles).";

pub const WEEK_SCHEMA_HINT: &str = "Fields: sessions (array). Each session has day (one of \
\"mon\", \"tue\", \"wed\", \"thu\", \"fri\", \"sat\", \"sun\"), session_type (one of \"easy run\", \
\"long run\", \"speed workout\", \"moderate run\", \"rest day\"), distance (number, miles), \
notes (string, detailed yet concise coaching notes), completed (boolean, always false).";

fn describe_summaries(summaries: &[WeekSummary]) -> String {
    summaries
        .iter()
        .map(|week| {
            format!(
                "week {} of {} (starting {}): {:.1} miles total, longest run {:.1} miles",
                week.week_of_year, week.year, week.week_start_date,
                week.total_distance, week.longest_run
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_days(daily: &[DailyMetric]) -> String {
    daily
        .iter()
        .map(|day| match day.pace_minutes_per_mile {
            Some(pace) => format!(
                "{} {}: {:.1} miles at {:.1} min/mile, {:.0} ft of climbing",
                day.day_of_week, day.date, day.distance_in_miles, pace,
                day.elevation_gain_in_feet
            ),
            None => format!("{} {}: no running", day.day_of_week, day.date),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_preferences(preferences: &Preferences) -> String {
    if preferences.ideal_training_week.is_empty() {
        "No stated preferences.".to_string()
    } else {
        let days = preferences
            .ideal_training_week
            .iter()
            .map(|s| format!("{}: {:?}", s.day, s.session_type))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Ideal week layout: {days}")
    }
}

/// Direct target strategy prompt: prescribe next week's volume from the
/// trailing completed weekly summaries.
pub fn mileage_target_prompt(preferences: &Preferences, summaries: &[WeekSummary]) -> String {
    format!(
        "{COACH_ROLE}\n\n\
         Your athlete has provided the following preferences: {}\n\n\
         Here is a summary of the athlete's training for the past {} weeks, \
         earliest to most recent:\n{}\n\n\
         Prescribe training volume for the upcoming week. Be conservative when \
         increasing volume, it's important that the goals are very achievable.",
        describe_preferences(preferences),
        summaries.len(),
        describe_summaries(summaries),
    )
}

/// Plan-derived strategy prompt: a full multi-week plan from now to race day.
pub fn training_plan_prompt(
    race_distance: &str,
    race_date: chrono::NaiveDate,
    today: chrono::NaiveDate,
    mileage_stats_52w: &str,
    mileage_stats_16w: &str,
    week_ranges: &[WeekRange],
) -> String {
    let ranges = week_ranges
        .iter()
        .map(|range| {
            format!(
                "week {} ({} to {}), {} weeks until race",
                range.week_number, range.start_date, range.end_date, range.weeks_until_race
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Best practices for distance running training plans\n\
         1. Simple is better than complex.\n\
         2. Peak with 6-4 weeks until the race and begin tapering at 3 weeks out; \
         peaking too early leaves the athlete short of maximal fitness on race day.\n\
         3. If the athlete is behind schedule, delay the peak as needed.\n\
         4. Athletes expect to be challenged relative to their last block.\n\n\
         {COACH_ROLE}\n\n\
         Your client is training for a {race_distance} on {race_date} (today is {today}).\n\n\
         Your client's mileage stats over the past 52 weeks:\n{mileage_stats_52w}\n\
         Your client's mileage stats over the past 16 weeks:\n{mileage_stats_16w}\n\
         Generate a training plan covering exactly these weeks:\n{ranges}"
    )
}

/// Initial draft prompt for a whole or partial week against a target.
pub fn draft_week_prompt(
    preferences: &Preferences,
    target: &MileageTarget,
    recent_days: &[DailyMetric],
    days: &[DayOfWeek],
    miles_completed: f64,
    miles_remaining: f64,
) -> String {
    let day_list = days
        .iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{COACH_ROLE}\n\n\
         Your athlete has provided the following preferences: {}\n\n\
         Here are the athlete's last {} days of activity:\n{}\n\n\
         This week's coaching target: {:.1} miles total with a {:.1} mile long run. \
         Coach's thoughts: {}\n\
         The athlete has run {miles_completed:.1} miles so far this week and has \
         {miles_remaining:.1} miles left to hit the target.\n\n\
         Build out training for exactly these {} remaining days: {day_list}. \
         Distribute volume and intensity evenly. You must adhere to the mileage \
         target and long run range.",
        describe_preferences(preferences),
        recent_days.len(),
        describe_days(recent_days),
        target.total_volume,
        target.long_run,
        target.rationale,
        days.len(),
    )
}

/// Corrective retry prompt carrying the rejected draft and its shortfall.
pub fn retry_week_prompt(
    base_prompt: &str,
    previous: &[TrainingSession],
    actual_mileage: f64,
    target_mileage: f64,
) -> String {
    let previous_sessions = previous
        .iter()
        .map(|s| format!("{}: {:?}, {:.1} miles", s.day, s.session_type, s.distance))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{base_prompt}\n\n\
         The previous schedule you generated totaled {actual_mileage:.1} miles, which \
         did not meet the target of {target_mileage:.1} miles. For inspiration, here is \
         that schedule:\n{previous_sessions}\n\n\
         Please regenerate, adjusting volume so the total comes closer to the target \
         while still balancing intensity across the days. Try not to alter the long \
         run distance if possible."
    )
}

/// Narrative note for one confirmed day in the context of its trailing week.
pub fn coaches_notes_prompt(day: &DailyMetric, past_7_days: &[DailyMetric]) -> String {
    format!(
        "{COACH_ROLE}\n\n\
         Here is your athlete's activity over the trailing 7 days:\n{}\n\n\
         Here is the day of interest ({}):\n{}\n\n\
         Write brief coach's notes on this day's performance in context. \
         2-3 sentences, addressed to the athlete.",
        describe_days(past_7_days),
        day.day_of_week,
        describe_days(std::slice::from_ref(day)),
    )
}
