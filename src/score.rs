use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Most recent entries kept in history.
pub const HISTORY_LIMIT: usize = 100;

/// Key under which the history list is stored.
pub const SCORES_KEY: &str = "rapidtype.scores";

/// Result of one completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub id: String,
    pub timestamp: DateTime<Local>,
    pub topic: String,
    pub wpm: u32,
    pub accuracy: u32,
    pub correct_words: usize,
    pub incorrect_words: usize,
    pub total_keystrokes: usize,
    /// Seconds.
    pub time_spent: u32,
}

/// Opaque id: creation time in millis plus random bits.
pub fn new_score_id(at: &DateTime<Local>) -> String {
    format!("{:x}-{:08x}", at.timestamp_millis(), rand::random::<u32>())
}

/// Insertion-ordered, capped at [`HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreHistory {
    entries: Vec<ScoreEntry>,
}

impl ScoreHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<ScoreEntry>) -> Self {
        let mut history = Self { entries };
        history.trim();
        history
    }

    pub fn push(&mut self, entry: ScoreEntry) {
        self.entries.push(entry);
        self.trim();
    }

    fn trim(&mut self) {
        if self.entries.len() > HISTORY_LIMIT {
            let excess = self.entries.len() - HISTORY_LIMIT;
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&ScoreEntry> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Newest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ScoreEntry> {
        self.entries.iter().rev().take(n)
    }

    /// Highest wpm first, ties broken by accuracy.
    pub fn best(&self, n: usize) -> Vec<&ScoreEntry> {
        self.entries
            .iter()
            .sorted_by(|a, b| b.wpm.cmp(&a.wpm).then(b.accuracy.cmp(&a.accuracy)))
            .take(n)
            .collect()
    }

    pub fn summary(&self) -> Option<HistorySummary> {
        if self.entries.is_empty() {
            return None;
        }
        let count = self.entries.len();
        let best_wpm = self.entries.iter().map(|e| e.wpm).max().unwrap_or(0);
        let avg_wpm = self.entries.iter().map(|e| e.wpm as f64).sum::<f64>() / count as f64;
        let avg_accuracy =
            self.entries.iter().map(|e| e.accuracy as f64).sum::<f64>() / count as f64;
        Some(HistorySummary {
            sessions: count,
            best_wpm,
            avg_wpm,
            avg_accuracy,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySummary {
    pub sessions: usize,
    pub best_wpm: u32,
    pub avg_wpm: f64,
    pub avg_accuracy: f64,
}

/// Persistence of score history.
pub trait ScoreStore {
    /// Persists `entry`, keeping only the most recent [`HISTORY_LIMIT`].
    fn append(&mut self, entry: ScoreEntry) -> Result<(), StorageError>;
    /// Current history; empty when nothing (or nothing readable) is stored.
    fn load_all(&self) -> Vec<ScoreEntry>;
    fn clear(&mut self) -> Result<(), StorageError>;
}

/// Stores the whole history as one JSON list under [`SCORES_KEY`].
#[derive(Debug)]
pub struct KvScoreStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> KvScoreStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn read(&self) -> ScoreHistory {
        let raw = match self.store.get(SCORES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ScoreHistory::new(),
            Err(e) => {
                warn!(error = %e, "could not read score history, starting empty");
                return ScoreHistory::new();
            }
        };
        match serde_json::from_str::<Vec<ScoreEntry>>(&raw) {
            Ok(entries) => ScoreHistory::from_entries(entries),
            Err(e) => {
                warn!(error = %e, "stored score history is malformed, starting empty");
                ScoreHistory::new()
            }
        }
    }
}

impl<S: KeyValueStore> ScoreStore for KvScoreStore<S> {
    fn append(&mut self, entry: ScoreEntry) -> Result<(), StorageError> {
        let mut history = self.read();
        debug!(id = %entry.id, wpm = entry.wpm, "persisting score");
        history.push(entry);
        let raw = serde_json::to_string(&history)?;
        self.store.set(SCORES_KEY, &raw)
    }

    fn load_all(&self) -> Vec<ScoreEntry> {
        self.read().entries
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.store.remove(SCORES_KEY)
    }
}
