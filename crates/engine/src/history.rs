//! Snapshot undo/redo history.
//!
//! A history holds deep copies of state, never references to it — the live
//! state stays with the caller, and every operation takes it explicitly so
//! the pre-mutation snapshot is always captured before the mutation lands.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Default cap on retained past snapshots. When exceeded, the oldest past
/// entry is dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A past/future stack of immutable snapshots.
///
/// `past` is ordered oldest first; `future` newest-undone first. Pushing a
/// new snapshot clears `future`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History<T> {
    past: Vec<T>,
    future: Vec<T>,
    limit: usize,
}

impl<T: Clone> History<T> {
    /// `limit` caps the past stack; 0 means unbounded.
    pub fn new(limit: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            limit,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Record the state as it is *before* an undoable mutation.
    pub fn push(&mut self, current: &T) {
        self.past.push(current.clone());
        self.future.clear();
        if self.limit > 0 && self.past.len() > self.limit {
            self.past.remove(0);
        }
    }

    /// Step back. Returns the snapshot the caller must restore, or `None`
    /// if there is nothing to undo (underflow is not an error).
    pub fn undo(&mut self, current: &T) -> Option<T> {
        let snapshot = self.past.pop()?;
        self.future.insert(0, current.clone());
        Some(snapshot)
    }

    /// Step forward again. Returns the snapshot to restore, or `None`.
    pub fn redo(&mut self, current: &T) -> Option<T> {
        if self.future.is_empty() {
            return None;
        }
        let snapshot = self.future.remove(0);
        self.past.push(current.clone());
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

/// Independent histories keyed by entity (one per field key). Removing a
/// key drops its history; keys never share snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedHistory<T> {
    entries: FxHashMap<String, History<T>>,
    limit: usize,
}

impl<T: Clone> KeyedHistory<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            limit,
        }
    }

    fn entry(&mut self, key: &str) -> &mut History<T> {
        let limit = self.limit;
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| History::new(limit))
    }

    pub fn push(&mut self, key: &str, current: &T) {
        self.entry(key).push(current);
    }

    pub fn undo(&mut self, key: &str, current: &T) -> Option<T> {
        self.entries.get_mut(key)?.undo(current)
    }

    pub fn redo(&mut self, key: &str, current: &T) -> Option<T> {
        self.entries.get_mut(key)?.redo(current)
    }

    pub fn can_undo(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|h| h.can_undo())
    }

    pub fn can_redo(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|h| h.can_redo())
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

impl<T: Clone> Default for KeyedHistory<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
