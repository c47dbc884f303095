//! Training summary store
//!
//! Bounded in-memory ring of training-completed callbacks. Entries are
//! opaque JSON apart from the required `status` field; each is stamped with
//! an arrival timestamp. Newest 100 are retained.

use fpo_common::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;

const DEFAULT_CAPACITY: usize = 100;

pub struct SummaryStore {
    entries: Mutex<VecDeque<serde_json::Value>>,
    capacity: usize,
}

impl SummaryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Validate, timestamp, and append a summary; oldest entries are evicted
    /// beyond capacity
    pub fn record(&self, summary: serde_json::Value) -> Result<()> {
        let mut summary = match summary {
            serde_json::Value::Object(map) => map,
            _ => {
                return Err(Error::InvalidInput(
                    "Training summary must be a JSON object".to_string(),
                ))
            }
        };
        if !summary.contains_key("status") {
            return Err(Error::InvalidInput(
                "Training summary is missing 'status'".to_string(),
            ));
        }

        summary.insert(
            "timestamp".to_string(),
            serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
        );

        let mut entries = self.entries.lock();
        entries.push_back(serde_json::Value::Object(summary));
        while entries.len() > self.capacity {
            entries.pop_front();
        }

        Ok(())
    }

    /// All retained summaries in insertion order
    pub fn all(&self) -> Vec<serde_json::Value> {
        self.entries.lock().iter().cloned().collect()
    }
}

impl Default for SummaryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_and_timestamps() {
        let store = SummaryStore::new();
        store.record(json!({"status": "completed", "loss": 0.03})).unwrap();

        let entries = store.all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["status"], "completed");
        assert!(entries[0]["timestamp"].is_string());
    }

    #[test]
    fn rejects_missing_status() {
        let store = SummaryStore::new();
        assert!(store.record(json!({"loss": 0.03})).is_err());
        assert!(store.record(json!("completed")).is_err());
        assert!(store.all().is_empty());
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let store = SummaryStore::with_capacity(3);
        for i in 0..5 {
            store.record(json!({"status": "completed", "run": i})).unwrap();
        }

        let entries = store.all();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["run"], 2);
        assert_eq!(entries[2]["run"], 4);
    }
}
