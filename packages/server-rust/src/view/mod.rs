//! Live paginated view over a map: a sliding window around a cursor key,
//! with preceding/following buffers, and a change stream that classifies
//! each update against the current window.
//!
//! This module owns windowing and change classification only; matching a
//! record against a query's filter/sort and keeping `set_source` fed with
//! the current matching set is the caller's job (the coordinator or query
//! service), the same separation `service/workers`'s dispatch functions
//! keep from the `CrdtMap` they operate on.

use topgun_core::messages::base::ChangeEventType;
use topgun_core::Value;

/// One entry in a view window, in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewEntry {
    pub key: String,
    pub value: Value,
}

/// A single change to report to a live view's subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeEventType,
    pub key: String,
    pub value: Option<Value>,
    pub previous_value: Option<Value>,
}

/// A paginated window over a sorted set of entries, anchored at a key
/// rather than an index so the window tracks its anchor correctly across
/// inserts and removes elsewhere in the source set.
pub struct DataFrameView {
    entries: Vec<ViewEntry>,
    anchor: Option<String>,
    preceding: usize,
    following: usize,
}

impl DataFrameView {
    #[must_use]
    pub fn new(preceding: usize, following: usize) -> Self {
        Self { entries: Vec::new(), anchor: None, preceding, following }
    }

    /// Replaces the full filtered, sorted dataset this view windows over.
    /// If no anchor is set yet, anchors at the first entry.
    pub fn set_source(&mut self, mut entries: Vec<ViewEntry>) {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        self.entries = entries;
        if self.anchor.is_none() {
            self.anchor = self.entries.first().map(|e| e.key.clone());
        }
    }

    /// Moves the window's anchor to `key`. Returns `false` (leaving the
    /// anchor unchanged) if `key` isn't in the current source set.
    pub fn seek(&mut self, key: &str) -> bool {
        if self.entries.iter().any(|e| e.key == key) {
            self.anchor = Some(key.to_string());
            true
        } else {
            false
        }
    }

    /// The entries currently in the window: up to `preceding` entries
    /// before the anchor, the anchor itself, and up to `following` after.
    #[must_use]
    pub fn window(&self) -> &[ViewEntry] {
        match self.window_range() {
            Some((start, end)) => &self.entries[start..end],
            None => &[],
        }
    }

    fn anchor_index(&self) -> Option<usize> {
        let anchor = self.anchor.as_ref()?;
        if self.entries.is_empty() {
            return None;
        }
        match self.entries.binary_search_by(|e| e.key.as_str().cmp(anchor.as_str())) {
            Ok(idx) => Some(idx),
            Err(idx) => Some(idx.min(self.entries.len() - 1)),
        }
    }

    fn window_range(&self) -> Option<(usize, usize)> {
        let idx = self.anchor_index()?;
        let start = idx.saturating_sub(self.preceding);
        let end = (idx + self.following + 1).min(self.entries.len());
        Some((start, end))
    }

    fn window_contains(&self, key: &str) -> bool {
        match self.window_range() {
            Some((start, end)) => self.entries[start..end].iter().any(|e| e.key == key),
            None => false,
        }
    }

    /// Applies a single key's change to the source set and, if the change
    /// is visible from the current window, returns the classified event:
    /// `ENTER` if the key newly appears in the window, `UPDATE` if it was
    /// already in the window and still is, `LEAVE` if it was in the window
    /// and now isn't (including removal). A change entirely outside the
    /// window (before and after) returns `None`.
    pub fn apply_change(&mut self, key: &str, new_value: Option<Value>) -> Option<ChangeEvent> {
        let was_in_window = self.window_contains(key);
        let previous_value = self.entries.iter().find(|e| e.key == key).map(|e| e.value.clone());

        match new_value {
            Some(value) => {
                match self.entries.binary_search_by(|e| e.key.as_str().cmp(key)) {
                    Ok(idx) => self.entries[idx].value = value.clone(),
                    Err(idx) => {
                        self.entries.insert(idx, ViewEntry { key: key.to_string(), value: value.clone() });
                    }
                }
                let is_in_window = self.window_contains(key);
                let kind = match (was_in_window, is_in_window) {
                    (false, true) => ChangeEventType::ENTER,
                    (true, true) => ChangeEventType::UPDATE,
                    (true, false) => ChangeEventType::LEAVE,
                    (false, false) => return None,
                };
                Some(ChangeEvent { kind, key: key.to_string(), value: Some(value), previous_value })
            }
            None => {
                if let Ok(idx) = self.entries.binary_search_by(|e| e.key.as_str().cmp(key)) {
                    self.entries.remove(idx);
                }
                if was_in_window {
                    Some(ChangeEvent {
                        kind: ChangeEventType::LEAVE,
                        key: key.to_string(),
                        value: None,
                        previous_value,
                    })
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(keys: &[&str]) -> Vec<ViewEntry> {
        keys.iter().map(|k| ViewEntry { key: (*k).to_string(), value: Value::Int(0) }).collect()
    }

    #[test]
    fn window_includes_preceding_and_following_around_anchor() {
        let mut view = DataFrameView::new(1, 1);
        view.set_source(entries(&["a", "b", "c", "d", "e"]));
        view.seek("c");
        let keys: Vec<&str> = view.window().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c", "d"]);
    }

    #[test]
    fn window_clamps_at_start_and_end_of_source() {
        let mut view = DataFrameView::new(2, 2);
        view.set_source(entries(&["a", "b", "c"]));
        view.seek("a");
        let keys: Vec<&str> = view.window().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn seek_to_missing_key_is_rejected() {
        let mut view = DataFrameView::new(1, 1);
        view.set_source(entries(&["a", "b"]));
        assert!(!view.seek("z"));
    }

    #[test]
    fn update_within_window_is_reported_as_update() {
        let mut view = DataFrameView::new(1, 1);
        view.set_source(entries(&["a", "b", "c"]));
        view.seek("b");
        let event = view.apply_change("b", Some(Value::Int(5))).unwrap();
        assert_eq!(event.kind, ChangeEventType::UPDATE);
        assert_eq!(event.value, Some(Value::Int(5)));
    }

    #[test]
    fn insert_adjacent_to_anchor_enters_the_window() {
        let mut view = DataFrameView::new(1, 1);
        view.set_source(entries(&["a", "c"]));
        view.seek("a");
        let event = view.apply_change("b", Some(Value::Int(1))).unwrap();
        assert_eq!(event.kind, ChangeEventType::ENTER);
    }

    #[test]
    fn change_outside_window_is_not_reported() {
        let mut view = DataFrameView::new(0, 0);
        view.set_source(entries(&["a", "b", "c"]));
        view.seek("a");
        assert!(view.apply_change("c", Some(Value::Int(9))).is_none());
    }

    #[test]
    fn removing_the_anchored_key_reports_leave() {
        let mut view = DataFrameView::new(1, 1);
        view.set_source(entries(&["a", "b", "c"]));
        view.seek("b");
        let event = view.apply_change("b", None).unwrap();
        assert_eq!(event.kind, ChangeEventType::LEAVE);
        assert_eq!(event.value, None);
        assert_eq!(event.previous_value, Some(Value::Int(0)));
        assert!(view.window().iter().all(|e| e.key != "b"));
    }
}
