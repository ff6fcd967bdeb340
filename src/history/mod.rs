//! Bounded, persisted list of past generations.
//!
//! The list is kept most-recent-first and never holds more than `capacity`
//! records. Every mutation serializes the whole list and writes it under one
//! key; the in-memory list only changes once that write has succeeded.

pub mod record;
pub mod store;

use crate::defaults;
use crate::error::Result;
use crate::synthesis::voice::Voice;
use chrono::Local;
use record::AudioGenerationRecord;
use store::KeyValueStore;
use tracing::{debug, warn};

pub struct HistoryStore<S: KeyValueStore> {
    store: S,
    key: String,
    capacity: usize,
    records: Vec<AudioGenerationRecord>,
}

impl<S: KeyValueStore> HistoryStore<S> {
    /// Load the history from `store` under the default key and capacity.
    pub fn open(store: S) -> Self {
        Self::open_with(store, defaults::HISTORY_KEY, defaults::HISTORY_CAPACITY)
    }

    /// Load the history stored under `key`.
    ///
    /// Never fails: an unreadable or corrupt entry starts an empty history.
    /// A `capacity` of zero is raised to one so the newest record is always kept.
    pub fn open_with(store: S, key: &str, capacity: usize) -> Self {
        if capacity == 0 {
            warn!(key, "history capacity of zero raised to one");
        }
        let capacity = capacity.max(1);
        let mut records = match store.get(key) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<AudioGenerationRecord>>(&json) {
                Ok(records) => records,
                Err(e) => {
                    warn!(key, error = %e, "discarding corrupt history");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key, error = %e, "history unavailable, starting empty");
                Vec::new()
            }
        };
        records.truncate(capacity);
        debug!(key, count = records.len(), "history loaded");

        Self {
            store,
            key: key.to_string(),
            capacity,
            records,
        }
    }

    /// Records, most recent first.
    pub fn records(&self) -> &[AudioGenerationRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&AudioGenerationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a new generation created now and put it at the front.
    pub fn add(&mut self, text: &str, voice: Voice, audio: String) -> Result<AudioGenerationRecord> {
        let newest = self.records.first().map(|r| r.id.as_str());
        let record = AudioGenerationRecord::new(text, voice, audio, Local::now(), newest);
        self.insert(record.clone())?;
        Ok(record)
    }

    /// Put `record` at the front, evicting the oldest records past capacity.
    pub fn insert(&mut self, record: AudioGenerationRecord) -> Result<()> {
        let mut next = Vec::with_capacity(self.capacity.min(self.records.len() + 1));
        next.push(record);
        next.extend(self.records.iter().cloned());
        next.truncate(self.capacity);
        self.commit(next)
    }

    /// Remove the record with `id`. Returns `false` if there was none.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let next = self.records.iter().filter(|r| r.id != id).cloned().collect();
        self.commit(next)?;
        Ok(true)
    }

    /// Drop every record and remove the persisted entry.
    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(&self.key)?;
        debug!(key = %self.key, "history cleared");
        self.records.clear();
        Ok(())
    }

    fn commit(&mut self, next: Vec<AudioGenerationRecord>) -> Result<()> {
        let json = serde_json::to_string(&next)?;
        self.store.set(&self.key, &json)?;
        debug!(key = %self.key, count = next.len(), "history persisted");
        self.records = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn record(id: i64) -> AudioGenerationRecord {
        AudioGenerationRecord::new(
            &format!("clip {id}"),
            Voice::Kore,
            "AAEAAQ==".to_string(),
            Utc.timestamp_millis_opt(id).unwrap(),
            None,
        )
    }

    fn persisted(store: &MemoryStore) -> Vec<AudioGenerationRecord> {
        serde_json::from_str(&store.get(defaults::HISTORY_KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn opens_empty_when_nothing_stored() {
        let history = HistoryStore::open(MemoryStore::new());
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 20);
    }

    #[test]
    fn insert_puts_newest_first_and_persists() {
        let store = MemoryStore::new();
        let mut history = HistoryStore::open(store.clone());

        history.insert(record(1)).unwrap();
        history.insert(record(2)).unwrap();

        let ids: Vec<&str> = history.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(persisted(&store), history.records());
    }

    #[test]
    fn twenty_first_insert_evicts_oldest() {
        let store = MemoryStore::new();
        let mut history = HistoryStore::open(store.clone());
        for id in 1..=20 {
            history.insert(record(id)).unwrap();
        }
        assert_eq!(history.len(), 20);

        history.insert(record(21)).unwrap();

        assert_eq!(history.len(), 20);
        assert_eq!(history.records()[0].id, "21");
        assert!(history.get("1").is_none());
        assert!(history.get("2").is_some());
        assert_eq!(persisted(&store).len(), 20);
    }

    #[test]
    fn never_exceeds_custom_capacity() {
        let mut history = HistoryStore::open_with(MemoryStore::new(), "k", 3);
        for id in 0..10 {
            history.insert(record(id)).unwrap();
            assert!(history.len() <= 3);
        }
        let ids: Vec<&str> = history.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["9", "8", "7"]);
    }

    #[test]
    fn add_generates_unique_increasing_ids() {
        let mut history = HistoryStore::open(MemoryStore::new());
        let first = history.add("one", Voice::Puck, "AAAA".into()).unwrap();
        let second = history.add("two", Voice::Puck, "AAAA".into()).unwrap();

        let first_id: i64 = first.id.parse().unwrap();
        let second_id: i64 = second.id.parse().unwrap();
        assert!(second_id > first_id);
        assert_eq!(history.records()[0], second);
    }

    #[test]
    fn delete_removes_single_record() {
        let store = MemoryStore::new();
        let mut history = HistoryStore::open(store.clone());
        history.insert(record(1)).unwrap();
        history.insert(record(2)).unwrap();

        assert!(history.delete("1").unwrap());

        assert_eq!(history.len(), 1);
        assert!(history.get("1").is_none());
        assert_eq!(persisted(&store).len(), 1);
    }

    #[test]
    fn delete_unknown_id_returns_false() {
        let mut history = HistoryStore::open(MemoryStore::new());
        history.insert(record(1)).unwrap();
        assert!(!history.delete("nope").unwrap());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn clear_empties_and_persists() {
        let store = MemoryStore::new();
        let mut history = HistoryStore::open(store.clone());
        history.insert(record(1)).unwrap();

        history.clear().unwrap();

        assert!(history.is_empty());
        assert_eq!(store.get(defaults::HISTORY_KEY).unwrap(), None);
        assert!(HistoryStore::open(store).is_empty());
    }

    #[test]
    fn failed_clear_keeps_records() {
        let store = MemoryStore::new();
        let mut history = HistoryStore::open(store.clone());
        history.insert(record(1)).unwrap();

        let mut failing = HistoryStore::open(store.with_write_failure());
        assert_eq!(failing.len(), 1);
        assert!(failing.clear().is_err());
        assert_eq!(failing.len(), 1);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let store = MemoryStore::new();
        let mut history = HistoryStore::open_with(store.clone(), "k", 0);
        assert_eq!(history.capacity(), 1);

        let newest = record(2);
        history.insert(record(1)).unwrap();
        history.insert(newest.clone()).unwrap();

        assert_eq!(history.records(), &[newest]);
        assert!(store.get("k").unwrap().is_some());
    }

    #[test]
    fn reopen_restores_persisted_list() {
        let store = MemoryStore::new();
        {
            let mut history = HistoryStore::open(store.clone());
            history.insert(record(1)).unwrap();
            history.insert(record(2)).unwrap();
        }
        let history = HistoryStore::open(store);
        assert_eq!(history.len(), 2);
        assert_eq!(history.records()[0].id, "2");
    }

    #[test]
    fn corrupt_entry_fails_open() {
        let store = MemoryStore::new().with_entry(defaults::HISTORY_KEY, "{not json");
        let history = HistoryStore::open(store);
        assert!(history.is_empty());
    }

    #[test]
    fn oversized_stored_list_is_truncated() {
        let records: Vec<_> = (0..5).map(record).collect();
        let json = serde_json::to_string(&records).unwrap();
        let store = MemoryStore::new().with_entry("k", &json);

        let history = HistoryStore::open_with(store, "k", 2);
        assert_eq!(history.len(), 2);
        assert_eq!(history.records()[0].id, "0");
    }

    #[test]
    fn failed_write_leaves_list_unchanged() {
        let mut history = HistoryStore::open(MemoryStore::new().with_write_failure());

        assert!(history.insert(record(1)).is_err());
        assert!(history.is_empty());
        assert!(history.clear().is_err());
    }
}
