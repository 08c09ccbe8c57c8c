//! Record ingestion for Lifelog.
//!
//! Turns the raw personal data directory (profile, wearable days, chat
//! exchanges, visited places, meals) into tagged [`Document`]s ready for
//! [`Retriever::build`].
//!
//! [`Document`]: lifelog_vector::Document
//! [`Retriever::build`]: lifelog_vector::Retriever::build
//!
//! # Modules
//!
//! - [`records`]: Typed source records
//! - [`formatter`]: Record → sentence formatting, one formatter per file
//! - [`splitter`]: Recursive character chunking
//! - [`loader`]: Directory loading
//! - [`config`]: Ingestion settings

pub mod config;
pub mod formatter;
pub mod loader;
pub mod records;
pub mod splitter;

pub use config::IngestConfig;
pub use formatter::{
    CHAT_HISTORY, CUSTOM_COLLECTION, ChatFormatter, LOCATION_DATA, LocationFormatter,
    MealFormatter, ProfileFormatter, RecordFormatter, USER_PROFILE, WEARABLE, WearableFormatter,
    default_formatters,
};
pub use loader::CorpusLoader;
pub use records::{ChatEntry, LocationEntry, MealEntry, UserProfile, WearableEntry};
pub use splitter::{DEFAULT_SEPARATORS, TextSplitter};
