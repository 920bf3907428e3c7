use serde::Serialize;
use std::collections::HashSet;

use super::LedgerError;
use crate::model::UnitId;

/// Learner's current arrangement of puzzle steps.
///
/// Starts from the server's pre-shuffled order and changes only through
/// adjacent swaps, so it is always a permutation of the original ids. The
/// ledger has no notion of the correct order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OrderLedger {
    order: Vec<UnitId>,
}

impl OrderLedger {
    /// # Errors
    ///
    /// Returns `LedgerError::DuplicateStep` if an id appears twice.
    pub fn new(initial: Vec<UnitId>) -> Result<Self, LedgerError> {
        let mut seen = HashSet::with_capacity(initial.len());
        for id in &initial {
            if !seen.insert(id) {
                return Err(LedgerError::DuplicateStep(id.clone()));
            }
        }
        Ok(Self { order: initial })
    }

    #[must_use]
    pub fn order(&self) -> &[UnitId] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Swaps the step at `index` with the one above it. No-op at the top or out of range.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.order.len() {
            return false;
        }
        self.order.swap(index - 1, index);
        true
    }

    /// Swaps the step at `index` with the one below it. No-op at the bottom or out of range.
    pub fn move_down(&mut self, index: usize) -> bool {
        match index.checked_add(1) {
            Some(below) if below < self.order.len() => {
                self.order.swap(index, below);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<UnitId> {
        raw.iter().map(|s| UnitId::new(*s)).collect()
    }

    fn as_strs(ledger: &OrderLedger) -> Vec<&str> {
        ledger.order().iter().map(UnitId::as_str).collect()
    }

    #[test]
    fn moving_last_step_to_top() {
        let mut ledger = OrderLedger::new(ids(&["e", "d", "c", "b", "a"])).unwrap();

        assert!(ledger.move_up(4));
        assert_eq!(as_strs(&ledger), ["e", "d", "c", "a", "b"]);
        assert!(ledger.move_up(3));
        assert_eq!(as_strs(&ledger), ["e", "d", "a", "c", "b"]);
        assert!(ledger.move_up(2));
        assert_eq!(as_strs(&ledger), ["e", "a", "d", "c", "b"]);
        assert!(ledger.move_up(1));
        assert_eq!(as_strs(&ledger), ["a", "e", "d", "c", "b"]);
    }

    #[test]
    fn move_up_then_down_restores_order() {
        let original = ids(&["a", "b", "c", "d"]);
        for i in 1..original.len() {
            let mut ledger = OrderLedger::new(original.clone()).unwrap();
            ledger.move_up(i);
            ledger.move_down(i - 1);
            assert_eq!(ledger.order(), original.as_slice());
        }
    }

    #[test]
    fn boundaries_are_no_ops() {
        let mut ledger = OrderLedger::new(ids(&["a", "b", "c"])).unwrap();
        assert!(!ledger.move_up(0));
        assert!(!ledger.move_down(2));
        assert!(!ledger.move_up(7));
        assert!(!ledger.move_down(7));
        assert_eq!(as_strs(&ledger), ["a", "b", "c"]);
    }

    #[test]
    fn largest_index_is_a_no_op() {
        let mut ledger = OrderLedger::new(ids(&["a", "b"])).unwrap();
        assert!(!ledger.move_down(usize::MAX));
        assert!(!ledger.move_up(usize::MAX));
        assert_eq!(as_strs(&ledger), ["a", "b"]);

        let mut empty = OrderLedger::new(Vec::new()).unwrap();
        assert!(!empty.move_down(0));
        assert!(!empty.move_down(usize::MAX));
    }

    #[test]
    fn swaps_preserve_the_id_set() {
        let mut ledger = OrderLedger::new(ids(&["a", "b", "c", "d", "e"])).unwrap();
        for (i, up) in [(3, true), (0, false), (4, true), (2, false), (1, true)] {
            if up {
                ledger.move_up(i);
            } else {
                ledger.move_down(i);
            }
        }
        let mut sorted: Vec<_> = as_strs(&ledger);
        sorted.sort_unstable();
        assert_eq!(sorted, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn rejects_duplicate_steps() {
        let err = OrderLedger::new(ids(&["a", "b", "a"])).unwrap_err();
        assert_eq!(err, LedgerError::DuplicateStep(UnitId::new("a")));
    }
}
