//! Bounded in-memory log of completed analyses.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analyzer::{AnalysisMode, AnalysisResult};

/// One completed analysis. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: AnalysisMode,
    pub text: String,
    pub result: AnalysisResult,
    pub timestamp: DateTime<Utc>,
}

struct Inner {
    entries: VecDeque<HistoryEntry>,
    next_id: u64,
}

/// Append-only ring of [`HistoryEntry`] values; the oldest entry is evicted
/// once `capacity` is exceeded.
pub struct HistoryStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl HistoryStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                next_id: 1,
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records an analysis and returns its id.
    pub fn append(&self, kind: AnalysisMode, text: &str, result: AnalysisResult) -> u64 {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        if self.capacity == 0 {
            return id;
        }
        while inner.entries.len() >= self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(HistoryEntry {
            id,
            kind,
            text: text.to_string(),
            result,
            timestamp: Utc::now(),
        });
        id
    }

    /// The most recent `limit` entries, oldest first.
    pub fn list(&self, limit: usize) -> Vec<HistoryEntry> {
        let inner = self.lock();
        let skip = inner.entries.len().saturating_sub(limit);
        inner.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry. Ids keep increasing after a clear.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::emotion::EmotionResult;
    use std::collections::BTreeMap;

    fn result() -> AnalysisResult {
        AnalysisResult::Emotion(EmotionResult {
            primary_emotion: "joy".into(),
            confidence: 0.9,
            all_emotions: BTreeMap::from([("joy".to_string(), 0.9), ("anger".to_string(), 0.1)]),
        })
    }

    fn filled(capacity: usize, n: usize) -> HistoryStore {
        let store = HistoryStore::with_capacity(capacity);
        for i in 0..n {
            store.append(AnalysisMode::Emotion, &format!("text {i}"), result());
        }
        store
    }

    #[test]
    fn keeps_insertion_order() {
        let store = filled(10, 3);
        let texts: Vec<_> = store.list(10).into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["text 0", "text 1", "text 2"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn list_returns_the_most_recent() {
        let store = filled(10, 5);
        let ids: Vec<_> = store.list(2).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert!(store.list(0).is_empty());
    }

    #[test]
    fn evicts_oldest_over_capacity() {
        let store = filled(3, 5);
        assert_eq!(store.len(), 3);
        let ids: Vec<_> = store.list(10).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn clear_empties_but_ids_keep_growing() {
        let store = filled(5, 2);
        store.clear();
        assert!(store.is_empty());
        let id = store.append(AnalysisMode::Sentiment, "again", result());
        assert_eq!(id, 3);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let store = filled(0, 2);
        assert!(store.is_empty());
    }

    #[test]
    fn entry_serialises_type_field() {
        let store = filled(1, 1);
        let json = serde_json::to_value(&store.list(1)[0]).unwrap();
        assert_eq!(json["type"], "emotion");
        assert_eq!(json["result"]["primary_emotion"], "joy");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
