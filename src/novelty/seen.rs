//! Permanent registry of every listing identity ever observed.
//!
//! Stored under its own key so replacing or clearing the dataset never
//! touches it. Entries are append-only: `first_seen` is written once and the
//! only way an entry disappears is an explicit [`SeenIndex::prune`].
//!
//! Entries that cannot be read are kept verbatim and written back on every
//! persist. If the stored index cannot be fetched at all, the index refuses
//! to persist for the rest of the run.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::error::BackendError;
use crate::model::parse_timestamp;
use crate::store::backend::Backend;

pub const SEEN_INDEX_KEY: &str = "real_estate_seen_index";

/// Width of the coarse price buckets kept alongside each identity.
pub const PRICE_BUCKET_SIZE: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeenIndexEntry {
    #[serde(deserialize_with = "first_seen_from_str")]
    pub first_seen: DateTime<Utc>,
    #[serde(default)]
    pub grouping_label: String,
    #[serde(default)]
    pub price_bucket: f64,
}

fn first_seen_from_str<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unreadable first_seen '{raw}'")))
}

/// Rounds a price down to its bucket. Unusable prices land in bucket 0.
pub fn price_bucket(price: f64) -> f64 {
    if price.is_finite() && price > 0.0 {
        (price / PRICE_BUCKET_SIZE).floor() * PRICE_BUCKET_SIZE
    } else {
        0.0
    }
}

pub struct SeenIndex {
    backend: Rc<dyn Backend>,
    entries: BTreeMap<String, SeenIndexEntry>,
    unreadable: Map<String, Value>,
    writable: bool,
}

impl SeenIndex {
    /// Load the index from the backend.
    ///
    /// A stored value that is not a json object starts empty. A backend read
    /// failure starts empty and read-only, so the stored index is never
    /// overwritten with a partial view.
    pub fn open(backend: Rc<dyn Backend>) -> Self {
        let mut index = SeenIndex {
            backend,
            entries: BTreeMap::new(),
            unreadable: Map::new(),
            writable: true,
        };

        match index.backend.get(SEEN_INDEX_KEY) {
            Ok(Some(raw)) => index.load(&raw),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "failed to read seen index, new listings will not be remembered this run");
                index.writable = false;
            }
        }

        debug!(
            entries = index.entries.len(),
            unreadable = index.unreadable.len(),
            "opened seen index"
        );
        index
    }

    fn load(&mut self, raw: &str) {
        let stored: Map<String, Value> = match serde_json::from_str(raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "seen index is corrupt, starting a fresh one");
                return;
            }
        };

        for (id, value) in stored {
            match SeenIndexEntry::deserialize(&value) {
                Ok(entry) => {
                    self.entries.insert(id, entry);
                }
                Err(e) => {
                    debug!(id = %id, error = %e, "keeping unreadable seen index entry as is");
                    self.unreadable.insert(id, value);
                }
            }
        }

        if !self.unreadable.is_empty() {
            warn!(unreadable = self.unreadable.len(), "seen index has unreadable entries");
        }
    }

    /// False when the stored index could not be read and nothing will be written.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Stored entries that could not be decoded; preserved across persists.
    pub fn unreadable_count(&self) -> usize {
        self.unreadable.len()
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn first_seen_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.entries.get(id).map(|e| e.first_seen)
    }

    pub fn get(&self, id: &str) -> Option<&SeenIndexEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in identity order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &SeenIndexEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Register `id` as first seen at `now` and persist.
    ///
    /// Returns false without writing anything when `id` is already known or blank.
    pub fn record_first_seen(
        &mut self,
        id: &str,
        grouping_label: &str,
        price_bucket: f64,
        now: DateTime<Utc>,
    ) -> Result<bool, BackendError> {
        if !self.insert(id, grouping_label, price_bucket, now) {
            return Ok(false);
        }

        if let Err(e) = self.persist() {
            self.entries.remove(id);
            return Err(e);
        }

        Ok(true)
    }

    /// In-memory insert used for batches; the caller persists once afterwards.
    pub(crate) fn insert(
        &mut self,
        id: &str,
        grouping_label: &str,
        price_bucket: f64,
        now: DateTime<Utc>,
    ) -> bool {
        if id.trim().is_empty() || self.entries.contains_key(id) {
            return false;
        }

        self.entries.insert(
            id.to_string(),
            SeenIndexEntry {
                first_seen: now,
                grouping_label: grouping_label.to_string(),
                price_bucket,
            },
        );
        true
    }

    pub fn persist(&self) -> Result<(), BackendError> {
        if !self.writable {
            return Err(BackendError::IndexUnreadable);
        }

        let mut stored = self.unreadable.clone();
        for (id, entry) in &self.entries {
            stored.insert(id.clone(), serde_json::to_value(entry)?);
        }

        let raw = serde_json::to_string(&stored)?;
        self.backend.put(SEEN_INDEX_KEY, &raw)
    }

    /// Delete entries first seen more than `max_age_months` before `now`.
    ///
    /// Entries exactly at the cutoff are kept. Returns how many were removed.
    pub fn prune(&mut self, max_age_months: u32, now: DateTime<Utc>) -> Result<usize, BackendError> {
        let Some(cutoff) = now.checked_sub_months(Months::new(max_age_months)) else {
            return Ok(0);
        };

        let (stale, kept): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(_, entry)| entry.first_seen < cutoff);
        self.entries = kept;

        if stale.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.persist() {
            self.entries.extend(stale);
            return Err(e);
        }

        info!(removed = stale.len(), remaining = self.entries.len(), "pruned seen index");
        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::MemoryBackend;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn fresh() -> (Rc<MemoryBackend>, SeenIndex) {
        let backend = Rc::new(MemoryBackend::new());
        let index = SeenIndex::open(backend.clone());
        (backend, index)
    }

    #[test]
    fn price_buckets_round_down() {
        assert_eq!(price_bucket(1_349_999.0), 1_300_000.0);
        assert_eq!(price_bucket(1_400_000.0), 1_400_000.0);
        assert_eq!(price_bucket(-5.0), 0.0);
        assert_eq!(price_bucket(f64::NAN), 0.0);
    }

    #[test]
    fn first_write_wins() {
        let (_, mut index) = fresh();

        assert!(index.record_first_seen("a", "Haifa", 1_300_000.0, at(2024, 1, 1)).unwrap());
        assert!(!index.record_first_seen("a", "Elsewhere", 9.0, at(2024, 6, 1)).unwrap());

        let entry = index.get("a").unwrap();
        assert_eq!(entry.first_seen, at(2024, 1, 1));
        assert_eq!(entry.grouping_label, "Haifa");
        assert_eq!(index.first_seen_at("a"), Some(at(2024, 1, 1)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn blank_identity_is_never_recorded() {
        let (_, mut index) = fresh();
        assert!(!index.record_first_seen(" ", "", 0.0, at(2024, 1, 1)).unwrap());
        assert!(index.is_empty());
    }

    #[test]
    fn survives_reopen() {
        let (backend, mut index) = fresh();
        index.record_first_seen("a", "Haifa", 0.0, at(2024, 1, 1)).unwrap();

        let reopened = SeenIndex::open(backend);
        assert!(reopened.has_seen("a"));
        assert_eq!(reopened.first_seen_at("a"), Some(at(2024, 1, 1)));
    }

    #[test]
    fn stored_shape_is_keyed_by_identity() {
        let (backend, mut index) = fresh();
        index.record_first_seen("a", "Haifa", 1_300_000.0, at(2024, 1, 1)).unwrap();

        let raw = backend.get(SEEN_INDEX_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["a"]["first_seen"], "2024-01-01T00:00:00Z");
        assert_eq!(value["a"]["grouping_label"], "Haifa");
        assert_eq!(value["a"]["price_bucket"], 1_300_000.0);
    }

    #[test]
    fn corrupt_index_starts_empty() {
        let backend = Rc::new(MemoryBackend::new());
        backend.put(SEEN_INDEX_KEY, "[not an index").unwrap();

        let index = SeenIndex::open(backend);
        assert!(index.is_empty());
    }

    #[test]
    fn unreadable_entries_are_kept_and_written_back() {
        let backend = Rc::new(MemoryBackend::new());
        backend
            .put(
                SEEN_INDEX_KEY,
                r#"{
                    "old": {"first_seen": "2024-01-01T00:00:00Z", "grouping_label": "Hadar", "price_bucket": 900000.0},
                    "naive": {"first_seen": "2024-02-01T00:00:00", "grouping_label": "", "price_bucket": 0.0},
                    "bad": {"grouping_label": "Carmel"}
                }"#,
            )
            .unwrap();

        let mut index = SeenIndex::open(backend.clone());
        assert!(index.is_writable());
        assert_eq!(index.len(), 2);
        assert_eq!(index.unreadable_count(), 1);
        assert_eq!(index.first_seen_at("naive"), Some(at(2024, 2, 1)));

        index.record_first_seen("new", "", 0.0, at(2024, 6, 1)).unwrap();

        let reopened = SeenIndex::open(backend.clone());
        assert_eq!(reopened.first_seen_at("old"), Some(at(2024, 1, 1)));
        assert!(reopened.has_seen("naive"));
        assert!(reopened.has_seen("new"));
        assert_eq!(reopened.unreadable_count(), 1);

        let raw: serde_json::Value = serde_json::from_str(&backend.get(SEEN_INDEX_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["bad"]["grouping_label"], "Carmel");
    }

    /// Reads fail; counts attempted writes.
    struct UnreachableBackend {
        puts: std::cell::Cell<usize>,
    }

    impl Backend for UnreachableBackend {
        fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
            Err(BackendError::DataDir("volume offline".to_string()))
        }

        fn put(&self, _key: &str, _value: &str) -> Result<(), BackendError> {
            self.puts.set(self.puts.get() + 1);
            Ok(())
        }

        fn remove(&self, _key: &str) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[test]
    fn read_failure_never_overwrites_the_stored_index() {
        let backend = Rc::new(UnreachableBackend { puts: std::cell::Cell::new(0) });
        let mut index = SeenIndex::open(backend.clone());

        assert!(!index.is_writable());
        assert!(index.is_empty());

        let result = index.record_first_seen("a", "", 0.0, at(2024, 1, 1));
        assert!(matches!(result, Err(BackendError::IndexUnreadable)));
        assert!(!index.has_seen("a"));
        assert!(matches!(index.persist(), Err(BackendError::IndexUnreadable)));
        assert_eq!(index.prune(1, at(2024, 6, 1)).unwrap(), 0);
        assert_eq!(backend.puts.get(), 0);
    }

    #[test]
    fn prune_removes_only_older_entries() {
        let (backend, mut index) = fresh();
        let now = at(2024, 12, 1);
        index.record_first_seen("old", "", 0.0, at(2023, 1, 1)).unwrap();
        index.record_first_seen("cutoff", "", 0.0, at(2024, 6, 1)).unwrap();
        index.record_first_seen("recent", "", 0.0, now - Duration::days(3)).unwrap();

        assert_eq!(index.prune(6, now).unwrap(), 1);
        assert!(!index.has_seen("old"));
        assert!(index.has_seen("cutoff"));
        assert!(index.has_seen("recent"));

        let reopened = SeenIndex::open(backend);
        assert_eq!(reopened.len(), 2);
    }

    #[test]
    fn prune_with_no_matches_is_a_no_op() {
        let (_, mut index) = fresh();
        assert_eq!(index.prune(1, at(2024, 1, 1)).unwrap(), 0);

        index.record_first_seen("a", "", 0.0, at(2024, 1, 1)).unwrap();
        assert_eq!(index.prune(12, at(2024, 2, 1)).unwrap(), 0);
        assert_eq!(index.len(), 1);
    }
}
