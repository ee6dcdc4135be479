use serde::{Deserialize, Serialize};

use crate::constants::{COMPARISON_CAPACITY, COMPARISON_PALETTE};

/// Result of a toggle, for callers that want to report what happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Selection was full; the id was not added.
    Ignored,
}

/// A discrete user action against the selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionAction {
    Toggle(String),
    Remove(String),
    Clear,
}

/// Bounded, ordered set of float ids chosen for comparison.
///
/// Position in `order` is the float's comparison slot and colour. Once full,
/// further additions are dropped rather than evicting the oldest entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    order: Vec<String>,
    capacity: usize,
}

impl Default for SelectionSet {
    fn default() -> Self {
        Self::new(COMPARISON_CAPACITY)
    }
}

impl SelectionSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Seed from ids in order, skipping duplicates and anything past capacity.
    pub fn from_ids<S: AsRef<str>>(capacity: usize, ids: impl IntoIterator<Item = S>) -> Self {
        let mut set = Self::new(capacity);
        for id in ids {
            let id = id.as_ref();
            if !set.contains(id) {
                set.toggle(id);
            }
        }
        set
    }

    pub fn toggle(&mut self, id: &str) -> ToggleOutcome {
        if let Some(pos) = self.position(id) {
            self.order.remove(pos);
            return ToggleOutcome::Removed;
        }
        if self.is_full() {
            tracing::debug!("selection full ({}), ignoring {id}", self.capacity);
            return ToggleOutcome::Ignored;
        }
        self.order.push(id.to_string());
        ToggleOutcome::Added
    }

    pub fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(pos) => {
                self.order.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    /// Pure transition: the selection after `action`.
    pub fn apply(&self, action: &SelectionAction) -> Self {
        let mut next = self.clone();
        match action {
            SelectionAction::Toggle(id) => {
                next.toggle(id);
            }
            SelectionAction::Remove(id) => {
                next.remove(id);
            }
            SelectionAction::Clear => next.clear(),
        }
        next
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Zero-based slot of `id`, which also indexes the colour palette.
    pub fn color_index_of(&self, id: &str) -> Option<usize> {
        self.position(id)
    }

    pub fn color_of(&self, id: &str) -> Option<&'static str> {
        self.position(id).map(palette_color)
    }

    /// Whether a checkbox for `id` should be enabled: already selected, or room left.
    pub fn can_toggle(&self, id: &str) -> bool {
        self.contains(id) || !self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.order.len() >= self.capacity
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|x| x == id)
    }
}

/// Palette colour for a slot; wraps if capacity was configured above the palette size.
pub fn palette_color(slot: usize) -> &'static str {
    COMPARISON_PALETTE[slot % COMPARISON_PALETTE.len()]
}
