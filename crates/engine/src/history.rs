//! Bounded, linear undo/redo log of full document snapshots.

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Snapshot stack with an index pointing at the current entry. Recording
/// prunes any redo branch; the capacity bound evicts the oldest entry and
/// shifts the index so relative position is stable.
#[derive(Debug)]
pub struct HistoryStack {
    entries: Vec<String>,
    index: usize,
    limit: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryStack {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: 0,
            limit: limit.max(2),
        }
    }

    /// Append a snapshot unless it equals the current entry.
    pub fn record(&mut self, snapshot: &str) {
        if self
            .entries
            .get(self.index)
            .is_some_and(|current| current == snapshot)
        {
            return;
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(snapshot.to_string());
        self.index = self.entries.len() - 1;

        if self.entries.len() > self.limit {
            self.entries.remove(0);
            self.index -= 1;
        }
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Step back and return the snapshot to restore, or `None` at the edge.
    pub fn undo(&mut self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index).map(String::as_str)
    }

    pub fn redo(&mut self) -> Option<&str> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_report_false() {
        let mut stack = HistoryStack::default();
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
        assert!(stack.undo().is_none());
        assert!(stack.redo().is_none());

        stack.record("<p>a</p>");
        // One entry: nothing to undo *to*.
        assert!(!stack.can_undo());

        stack.record("<p>b</p>");
        assert!(stack.can_undo());
        assert_eq!(stack.undo(), Some("<p>a</p>"));
        assert!(stack.can_redo());
        assert_eq!(stack.redo(), Some("<p>b</p>"));
        assert!(stack.redo().is_none());
    }

    #[test]
    fn duplicate_snapshots_are_suppressed() {
        let mut stack = HistoryStack::default();
        stack.record("<p>a</p>");
        stack.record("<p>a</p>");
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn recording_prunes_redo_branch() {
        let mut stack = HistoryStack::default();
        stack.record("a");
        stack.record("b");
        stack.record("c");
        stack.undo();
        stack.undo();
        stack.record("d");
        assert_eq!(stack.len(), 2);
        assert!(!stack.can_redo());
        assert_eq!(stack.undo(), Some("a"));
    }

    #[test]
    fn capacity_evicts_oldest_and_keeps_position() {
        let mut stack = HistoryStack::new(3);
        stack.record("a");
        stack.record("b");
        stack.record("c");
        stack.record("d");
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.undo(), Some("c"));
        assert_eq!(stack.undo(), Some("b"));
        assert!(stack.undo().is_none());
    }
}
