use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

const HISTORY_LIMIT: usize = 100;

/// Linear undo/redo over whole-state snapshots.
///
/// `record` is called with the state as it was *before* a mutation. Undo and
/// redo swap the caller's current state with the neighbouring snapshot, so a
/// restore is always exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History<T> {
    past: Vec<T>,
    /// Front is the next state to redo
    future: VecDeque<T>,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> History<T> {
    pub fn new() -> Self {
        History {
            past: Vec::new(),
            future: VecDeque::new(),
        }
    }

    /// Push the pre-mutation state. Clears the redo stack.
    pub fn record(&mut self, before: T) {
        self.past.push(before);
        if self.past.len() > HISTORY_LIMIT {
            self.past.drain(..self.past.len() - HISTORY_LIMIT);
        }
        self.future.clear();
    }

    /// Restore the most recent snapshot into `current`. Returns false if
    /// there was nothing to undo.
    pub fn undo(&mut self, current: &mut T) -> bool {
        let Some(previous) = self.past.pop() else {
            return false;
        };
        let replaced = std::mem::replace(current, previous);
        self.future.push_front(replaced);
        true
    }

    /// Re-apply the most recently undone state. Returns false if there was
    /// nothing to redo.
    pub fn redo(&mut self, current: &mut T) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let replaced = std::mem::replace(current, next);
        self.past.push(replaced);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.past.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_then_redo_restores_exactly() {
        let mut h = History::new();
        let mut state = vec![1];
        h.record(state.clone());
        state.push(2);
        h.record(state.clone());
        state.push(3);

        assert!(h.undo(&mut state));
        assert_eq!(state, vec![1, 2]);
        assert!(h.undo(&mut state));
        assert_eq!(state, vec![1]);
        assert!(h.redo(&mut state));
        assert_eq!(state, vec![1, 2]);
        assert!(h.redo(&mut state));
        assert_eq!(state, vec![1, 2, 3]);
        assert!(!h.redo(&mut state));
    }

    #[test]
    fn undo_on_empty_is_noop() {
        let mut h: History<u32> = History::new();
        let mut state = 7;
        assert!(!h.undo(&mut state));
        assert!(!h.redo(&mut state));
        assert_eq!(state, 7);
    }

    #[test]
    fn record_after_undo_discards_redo() {
        let mut h = History::new();
        let mut state = "a".to_string();
        h.record(state.clone());
        state = "b".into();
        h.undo(&mut state);
        assert!(h.can_redo());

        h.record(state.clone());
        state = "c".into();
        assert!(!h.can_redo());
        assert!(!h.redo(&mut state));
        assert_eq!(state, "c");
    }

    #[test]
    fn history_is_capped() {
        let mut h = History::new();
        for i in 0..=HISTORY_LIMIT {
            h.record(i);
        }
        assert_eq!(h.undo_len(), HISTORY_LIMIT);
        let mut state = 999;
        h.undo(&mut state);
        assert_eq!(state, HISTORY_LIMIT);
    }

    #[test]
    fn survives_serialization() {
        let mut h = History::new();
        let mut state = 1;
        h.record(0);
        h.undo(&mut state);
        let json = serde_json::to_string(&h).unwrap();
        let mut back: History<i32> = serde_json::from_str(&json).unwrap();
        assert!(back.redo(&mut state));
        assert_eq!(state, 1);
    }
}
