use std::collections::BTreeSet;

use tracing::trace;

use crate::identifier::ChildId;

/// Persisted child ids the user removed locally and the server still has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionTracker {
    pending: BTreeSet<String>,
}

impl DeletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Temporary ids are dropped on the floor: the row never reached the server.
    pub fn mark_deleted(&mut self, id: &ChildId) {
        match id {
            ChildId::Temporary(temp) => trace!("Dropping unsaved row {temp}"),
            ChildId::Persisted(real) => {
                if self.pending.insert(real.clone()) {
                    trace!("Marked {real} for deletion");
                }
            }
        }
    }

    /// Returns the pending set without clearing it. Clearing waits for the
    /// server to confirm, see [`DeletionTracker::confirm`].
    pub fn drain(&self) -> BTreeSet<String> {
        self.pending.clone()
    }

    /// Forgets ids the server has acknowledged. Ids marked after the request
    /// was built stay pending.
    pub fn confirm<'a>(&mut self, persisted: impl IntoIterator<Item = &'a String>) {
        for id in persisted {
            self.pending.remove(id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pending.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::TempIdAllocator;

    #[test]
    fn unsaved_rows_never_enter_the_set() {
        let allocator = TempIdAllocator::new();
        let mut tracker = DeletionTracker::new();

        tracker.mark_deleted(&allocator.allocate());
        tracker.mark_deleted(&allocator.allocate());

        assert!(tracker.is_empty());
        assert!(tracker.drain().is_empty());
    }

    #[test]
    fn repeated_marks_are_idempotent() {
        let mut tracker = DeletionTracker::new();
        let seven = ChildId::persisted("7");

        tracker.mark_deleted(&seven);
        tracker.mark_deleted(&seven);
        tracker.mark_deleted(&seven);

        assert_eq!(tracker.len(), 1);
        assert!(tracker.contains("7"));
    }

    #[test]
    fn drain_does_not_clear() {
        let mut tracker = DeletionTracker::new();
        tracker.mark_deleted(&ChildId::persisted("7"));

        let first = tracker.drain();
        let second = tracker.drain();
        assert_eq!(first, second);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn confirm_keeps_later_marks() {
        let mut tracker = DeletionTracker::new();
        tracker.mark_deleted(&ChildId::persisted("7"));
        let submitted = tracker.drain();

        tracker.mark_deleted(&ChildId::persisted("9"));
        tracker.confirm(&submitted);

        assert!(!tracker.contains("7"));
        assert!(tracker.contains("9"));
    }
}
