//! Per-document metadata aligned by position with the vector index.
//!
//! Entry `i` of the [`MetadataStore`] describes vector `i` of the
//! [`FlatL2Index`](crate::FlatL2Index) and text `i` of the snapshot.
//! Collection names are normalized once, on the way in, so that the
//! filter predicate is a plain set lookup.

use std::collections::{BTreeMap, BTreeSet};

use lifelog_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Collection assigned to documents that carry no tag.
pub const UNKNOWN_COLLECTION: &str = "unknown";

/// Normalize a collection tag: trimmed, lowercase, `"unknown"` when blank.
pub fn normalize_collection(tag: Option<&str>) -> String {
    match tag.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_lowercase(),
        _ => UNKNOWN_COLLECTION.to_string(),
    }
}

fn default_collection_name() -> String {
    UNKNOWN_COLLECTION.to_string()
}

fn deserialize_collection_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_collection(raw.as_deref()))
}

// ============================================================================
// MetadataEntry
// ============================================================================

/// Metadata stored alongside one indexed vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Lowercase collection name.
    #[serde(
        default = "default_collection_name",
        deserialize_with = "deserialize_collection_name"
    )]
    pub collection_name: String,
}

impl MetadataEntry {
    /// Create an entry, normalizing the collection name.
    pub fn new(collection_name: impl AsRef<str>) -> Self {
        Self {
            collection_name: normalize_collection(Some(collection_name.as_ref())),
        }
    }
}

impl Default for MetadataEntry {
    fn default() -> Self {
        Self {
            collection_name: default_collection_name(),
        }
    }
}

// ============================================================================
// CollectionFilter
// ============================================================================

/// A set of collection names a search result must belong to.
///
/// An empty filter passes every entry. Names are normalized however the
/// filter is built, including when it is deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CollectionFilter {
    collections: BTreeSet<String>,
}

impl CollectionFilter {
    /// A filter that passes everything.
    pub fn any() -> Self {
        Self::default()
    }

    /// True when no collections were given.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// True when `collection_name` passes the filter.
    pub fn matches(&self, collection_name: &str) -> bool {
        self.collections.is_empty() || self.collections.contains(collection_name)
    }

    /// The normalized collection names.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for CollectionFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let collections = iter
            .into_iter()
            .filter(|s| !s.as_ref().trim().is_empty())
            .map(|s| normalize_collection(Some(s.as_ref())))
            .collect();
        Self { collections }
    }
}

impl From<CollectionFilter> for Vec<String> {
    fn from(filter: CollectionFilter) -> Self {
        filter.collections.into_iter().collect()
    }
}

impl From<&str> for CollectionFilter {
    fn from(value: &str) -> Self {
        std::iter::once(value).collect()
    }
}

impl From<String> for CollectionFilter {
    fn from(value: String) -> Self {
        std::iter::once(value).collect()
    }
}

impl From<Vec<&str>> for CollectionFilter {
    fn from(value: Vec<&str>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Vec<String>> for CollectionFilter {
    fn from(value: Vec<String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<&[&str]> for CollectionFilter {
    fn from(value: &[&str]) -> Self {
        value.iter().collect()
    }
}

impl<const N: usize> From<[&str; N]> for CollectionFilter {
    fn from(value: [&str; N]) -> Self {
        value.into_iter().collect()
    }
}

impl<T: Into<CollectionFilter>> From<Option<T>> for CollectionFilter {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

// ============================================================================
// MetadataStore
// ============================================================================

/// Position-aligned metadata for every indexed vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataStore {
    entries: Vec<MetadataEntry>,
}

impl MetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing, already ordered list of entries.
    pub fn from_entries(entries: Vec<MetadataEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry at the next position.
    pub fn push(&mut self, entry: MetadataEntry) {
        self.entries.push(entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `position >= len()`.
    pub fn get(&self, position: usize) -> Result<&MetadataEntry> {
        self.entries.get(position).ok_or(Error::IndexOutOfRange {
            index: position,
            len: self.entries.len(),
        })
    }

    /// Iterate entries in position order.
    pub fn iter(&self) -> impl Iterator<Item = &MetadataEntry> {
        self.entries.iter()
    }

    /// Number of entries per collection.
    pub fn collection_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.collection_name.clone()).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<MetadataEntry> for MetadataStore {
    fn from_iter<I: IntoIterator<Item = MetadataEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collection() {
        assert_eq!(normalize_collection(Some("Wearable")), "wearable");
        assert_eq!(normalize_collection(Some("  CHAT_History ")), "chat_history");
        assert_eq!(normalize_collection(Some("")), "unknown");
        assert_eq!(normalize_collection(Some("   ")), "unknown");
        assert_eq!(normalize_collection(None), "unknown");
    }

    #[test]
    fn test_metadata_entry_deserializes_missing_field_as_unknown() {
        let entry: MetadataEntry = serde_json::from_str("{}").unwrap();
        assert_eq!(entry.collection_name, "unknown");
    }

    #[test]
    fn test_metadata_entry_deserialize_normalizes() {
        let entry: MetadataEntry =
            serde_json::from_str(r#"{"collection_name":" Wearable "}"#).unwrap();
        assert_eq!(entry.collection_name, "wearable");

        let entry: MetadataEntry = serde_json::from_str(r#"{"collection_name":null}"#).unwrap();
        assert_eq!(entry.collection_name, "unknown");
    }

    #[test]
    fn test_metadata_entry_json_shape() {
        let json = serde_json::to_string(&MetadataEntry::new("Location_Data")).unwrap();
        assert_eq!(json, r#"{"collection_name":"location_data"}"#);
    }

    // ------------------------------------------------------------------------
    // CollectionFilter tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_filter_empty_passes_everything() {
        let filter = CollectionFilter::any();
        assert!(filter.is_empty());
        assert!(filter.matches("wearable"));
        assert!(filter.matches("unknown"));
    }

    #[test]
    fn test_filter_from_single_string_is_case_insensitive() {
        let filter = CollectionFilter::from("WEARABLE");
        assert!(filter.matches("wearable"));
        assert!(!filter.matches("chat_history"));
    }

    #[test]
    fn test_filter_from_many() {
        let filter = CollectionFilter::from(vec!["Wearable", "chat_history"]);
        assert!(filter.matches("wearable"));
        assert!(filter.matches("chat_history"));
        assert!(!filter.matches("location_data"));
        assert_eq!(filter.collections().count(), 2);
    }

    #[test]
    fn test_filter_from_array_and_slice() {
        let from_array = CollectionFilter::from(["a", "B"]);
        let slice: &[&str] = &["A", "b"];
        let from_slice = CollectionFilter::from(slice);
        assert_eq!(from_array, from_slice);
    }

    #[test]
    fn test_filter_from_option() {
        let none: Option<&str> = None;
        assert!(CollectionFilter::from(none).is_empty());
        assert!(CollectionFilter::from(Some("wearable")).matches("wearable"));
    }

    #[test]
    fn test_filter_ignores_blank_names() {
        let filter = CollectionFilter::from(vec!["", "  "]);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_serializes_as_list() {
        let filter = CollectionFilter::from(vec!["wearable", "chat_history"]);
        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(json, r#"["chat_history","wearable"]"#);
    }

    #[test]
    fn test_filter_deserialize_normalizes() {
        let filter: CollectionFilter =
            serde_json::from_str(r#"["Wearable", " CHAT_History", ""]"#).unwrap();
        assert!(filter.matches("wearable"));
        assert!(filter.matches("chat_history"));
        assert!(!filter.matches("Wearable"));
        assert_eq!(filter.collections().count(), 2);
    }

    // ------------------------------------------------------------------------
    // MetadataStore tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_store_get_in_range() {
        let mut store = MetadataStore::new();
        store.push(MetadataEntry::new("wearable"));
        store.push(MetadataEntry::new("chat_history"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().collection_name, "chat_history");
    }

    #[test]
    fn test_store_get_out_of_range() {
        let store = MetadataStore::from_entries(vec![MetadataEntry::new("wearable")]);
        let err = store.get(1).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 1, len: 1 }));
    }

    #[test]
    fn test_store_collection_counts() {
        let store = MetadataStore::from_entries(vec![
            MetadataEntry::new("wearable"),
            MetadataEntry::new("wearable"),
            MetadataEntry::new("chat_history"),
        ]);
        let counts = store.collection_counts();
        assert_eq!(counts.get("wearable"), Some(&2));
        assert_eq!(counts.get("chat_history"), Some(&1));
    }

    #[test]
    fn test_store_serializes_as_array() {
        let store = MetadataStore::from_entries(vec![MetadataEntry::new("wearable")]);
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"[{"collection_name":"wearable"}]"#);

        let back: MetadataStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
}
