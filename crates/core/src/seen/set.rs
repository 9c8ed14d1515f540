//! In-memory seen set.

use std::collections::HashSet;

/// Set of processed lot ids, iterated in the order they were claimed.
///
/// Grows monotonically; nothing is ever evicted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    ids: HashSet<String>,
    order: Vec<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, lot_id: &str) -> bool {
        self.ids.contains(lot_id)
    }

    /// Record `lot_id` as seen. Returns `false` if it was already present.
    pub fn claim(&mut self, lot_id: &str) -> bool {
        if self.ids.contains(lot_id) {
            return false;
        }
        self.ids.insert(lot_id.to_string());
        self.order.push(lot_id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SeenSet::new();
        for id in iter {
            let id = id.into();
            set.claim(&id);
        }
        set
    }
}
