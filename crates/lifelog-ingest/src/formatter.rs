//! Record formatters: raw JSON records to natural-language sentences.
//!
//! Each formatter owns one source file and one collection tag. Sentences
//! read like short diary entries so that embedding similarity tracks what
//! a user would ask about.

use lifelog_core::{Error, Result};
use serde::de::DeserializeOwned;

use crate::records::{ChatEntry, LocationEntry, MealEntry, UserProfile, WearableEntry};

/// Collection tag for the user profile.
pub const USER_PROFILE: &str = "user_profile";
/// Collection tag for wearable data.
pub const WEARABLE: &str = "wearable";
/// Collection tag for chat history.
pub const CHAT_HISTORY: &str = "chat_history";
/// Collection tag for visited places.
pub const LOCATION_DATA: &str = "location_data";
/// Collection tag for the meal log.
pub const CUSTOM_COLLECTION: &str = "custom_collection";

/// Turns one source file's JSON into indexable sentences.
pub trait RecordFormatter: Send + Sync {
    /// Collection tag attached to every produced document.
    fn collection(&self) -> &str;

    /// Source file name, relative to the data directory.
    fn file_name(&self) -> &str;

    /// Render the parsed file contents as sentences, in record order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the JSON does not have the record shape.
    fn format(&self, value: &serde_json::Value) -> Result<Vec<String>>;
}

/// The five formatters for the standard data directory layout.
pub fn default_formatters() -> Vec<Box<dyn RecordFormatter>> {
    vec![
        Box::new(ProfileFormatter),
        Box::new(WearableFormatter),
        Box::new(ChatFormatter),
        Box::new(LocationFormatter),
        Box::new(MealFormatter),
    ]
}

fn parse<T: DeserializeOwned>(value: &serde_json::Value, file_name: &str) -> Result<T> {
    T::deserialize(value).map_err(|e| Error::parse(format!("{file_name}: {e}")))
}

// ============================================================================
// Formatters
// ============================================================================

/// `user_profile.json` → one paragraph.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileFormatter;

impl RecordFormatter for ProfileFormatter {
    fn collection(&self) -> &str {
        USER_PROFILE
    }

    fn file_name(&self) -> &str {
        "user_profile.json"
    }

    fn format(&self, value: &serde_json::Value) -> Result<Vec<String>> {
        let p: UserProfile = parse(value, self.file_name())?;
        Ok(vec![format!(
            "{} was born in {} in the year {} and uses {} units.\n\
             They identify as {} and prefer reminders around {}.\n\
             Health goals: {}. They like: {}.",
            p.name,
            p.country,
            p.birth_year,
            p.units,
            p.gender,
            p.reminder_time,
            p.health_goals.join(", "),
            p.likes.join(", ")
        )])
    }
}

/// `wearable.json` → one sentence per day.
#[derive(Debug, Clone, Copy, Default)]
pub struct WearableFormatter;

impl RecordFormatter for WearableFormatter {
    fn collection(&self) -> &str {
        WEARABLE
    }

    fn file_name(&self) -> &str {
        "wearable.json"
    }

    fn format(&self, value: &serde_json::Value) -> Result<Vec<String>> {
        let entries: Vec<WearableEntry> = parse(value, self.file_name())?;
        Ok(entries
            .iter()
            .map(|e| {
                // `{:?}` keeps the trailing ".0" on whole hours.
                format!(
                    "On {}, average heart rate was {} bpm, steps taken: {}, sleep: {:?} hours, mood: {}.",
                    e.date, e.avg_heart_rate, e.steps_taken, e.sleep_duration_hrs, e.mood
                )
            })
            .collect())
    }
}

/// `chat_history.json` → one sentence per exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatFormatter;

impl RecordFormatter for ChatFormatter {
    fn collection(&self) -> &str {
        CHAT_HISTORY
    }

    fn file_name(&self) -> &str {
        "chat_history.json"
    }

    fn format(&self, value: &serde_json::Value) -> Result<Vec<String>> {
        let entries: Vec<ChatEntry> = parse(value, self.file_name())?;
        Ok(entries
            .iter()
            .map(|e| {
                format!(
                    "User asked: '{}' → Bot replied: '{}' (at {}).",
                    e.user_msg, e.bot_reply, e.timestamp
                )
            })
            .collect())
    }
}

/// `location_data.json` → one sentence per visit.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationFormatter;

impl RecordFormatter for LocationFormatter {
    fn collection(&self) -> &str {
        LOCATION_DATA
    }

    fn file_name(&self) -> &str {
        "location_data.json"
    }

    fn format(&self, value: &serde_json::Value) -> Result<Vec<String>> {
        let entries: Vec<LocationEntry> = parse(value, self.file_name())?;
        Ok(entries
            .iter()
            .map(|e| format!("Visited {} at {}.", e.place, e.time))
            .collect())
    }
}

/// `custom_collection.json` → one sentence per meal.
#[derive(Debug, Clone, Copy, Default)]
pub struct MealFormatter;

impl RecordFormatter for MealFormatter {
    fn collection(&self) -> &str {
        CUSTOM_COLLECTION
    }

    fn file_name(&self) -> &str {
        "custom_collection.json"
    }

    fn format(&self, value: &serde_json::Value) -> Result<Vec<String>> {
        let entries: Vec<MealEntry> = parse(value, self.file_name())?;
        Ok(entries
            .iter()
            .map(|e| {
                format!(
                    "On {}, had {} (~{} calories): {}.",
                    e.day, e.meal, e.cals, e.note
                )
            })
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
