//! Typed personal data records, one per source file.
//!
//! Numeric fields use the widest type the data generator can produce;
//! sleep durations are fractional hours.

use serde::{Deserialize, Serialize};

/// The user's profile (`user_profile.json`, a single object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub birth_year: i32,
    pub gender: String,
    pub country: String,
    #[serde(default)]
    pub health_goals: Vec<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    pub reminder_time: String,
    pub units: String,
}

/// One day of wearable data (`wearable.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearableEntry {
    pub date: String,
    pub avg_heart_rate: u32,
    pub steps_taken: u64,
    pub sleep_duration_hrs: f64,
    pub mood: String,
}

/// One chatbot exchange (`chat_history.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub timestamp: String,
    pub user_msg: String,
    pub bot_reply: String,
}

/// One visited place (`location_data.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub place: String,
    pub time: String,
}

/// One logged meal (`custom_collection.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub day: String,
    pub meal: String,
    pub cals: u32,
    #[serde(default)]
    pub note: String,
}

// ============================================================================
// Tests
// ============================================================================
