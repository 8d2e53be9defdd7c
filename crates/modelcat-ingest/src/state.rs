//! Per-item processing state

use modelcat_domain::SourceKey;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Where a feed item is in the batch path
///
/// ```text
/// Pending → Skipped
/// Pending → Extracting → Validating → Accepted
///                ↓            ↓
///             Rejected     Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Fetched, not yet examined
    Pending,
    /// Already accepted earlier or in flight elsewhere
    Skipped,
    /// Upstream call in progress
    Extracting,
    /// Checking fields and writing the record
    Validating,
    /// Record created and acceptance recorded
    Accepted,
    /// Failed at some stage
    Rejected,
}

impl ItemState {
    /// Whether the state is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Skipped | ItemState::Accepted | ItemState::Rejected)
    }

    /// Whether `next` is a legal successor
    pub fn can_move_to(&self, next: ItemState) -> bool {
        use ItemState::*;
        matches!(
            (self, next),
            (Pending, Skipped)
                | (Pending, Extracting)
                | (Pending, Rejected)
                | (Extracting, Validating)
                | (Extracting, Rejected)
                | (Validating, Accepted)
                | (Validating, Rejected)
                | (Validating, Skipped)
        )
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemState::Pending => "pending",
            ItemState::Skipped => "skipped",
            ItemState::Extracting => "extracting",
            ItemState::Validating => "validating",
            ItemState::Accepted => "accepted",
            ItemState::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Tracks one item through its states
#[derive(Debug)]
pub struct ItemProgress {
    key: SourceKey,
    state: ItemState,
}

impl ItemProgress {
    /// Start tracking an item in `Pending`
    pub fn new(key: SourceKey) -> Self {
        Self {
            key,
            state: ItemState::Pending,
        }
    }

    /// Current state
    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Item key
    pub fn key(&self) -> &SourceKey {
        &self.key
    }

    /// Move to `next`; illegal moves are ignored and return false
    pub fn move_to(&mut self, next: ItemState) -> bool {
        if !self.state.can_move_to(next) {
            warn!("Ignoring illegal transition {} -> {} for {}", self.state, next, self.key);
            return false;
        }
        debug!("{}: {} -> {}", self.key, self.state, next);
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut progress = ItemProgress::new(SourceKey::new("a"));
        assert!(progress.move_to(ItemState::Extracting));
        assert!(progress.move_to(ItemState::Validating));
        assert!(progress.move_to(ItemState::Accepted));
        assert!(progress.state().is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [ItemState::Skipped, ItemState::Accepted, ItemState::Rejected] {
            for next in [
                ItemState::Pending,
                ItemState::Skipped,
                ItemState::Extracting,
                ItemState::Validating,
                ItemState::Accepted,
                ItemState::Rejected,
            ] {
                assert!(!terminal.can_move_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_illegal_move_keeps_state() {
        let mut progress = ItemProgress::new(SourceKey::new("a"));
        assert!(!progress.move_to(ItemState::Accepted));
        assert_eq!(progress.state(), ItemState::Pending);
    }
}
