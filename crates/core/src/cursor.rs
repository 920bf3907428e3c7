//! Position within an ordered unit sequence.
//!
//! The index is always clamped to `[0, len - 1]`; moves past either end are
//! no-ops rather than wrapping around.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationCursor {
    index: usize,
    len: usize,
}

impl NavigationCursor {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.len
    }

    /// Moves one unit forward. Returns `false` at the last unit.
    pub fn advance(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Moves one unit back. Returns `false` at the first unit.
    pub fn retreat(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Jumps to `index`, clamped to the last unit. Returns whether the position changed.
    pub fn jump_to(&mut self, index: usize) -> bool {
        let target = index.min(self.len.saturating_sub(1));
        let moved = target != self.index;
        self.index = target;
        moved
    }

    /// Re-bounds the cursor to a new length, keeping the position where possible.
    #[must_use]
    pub fn resized(self, len: usize) -> Self {
        let mut cursor = Self::new(len);
        cursor.jump_to(self.index);
        cursor
    }
}
