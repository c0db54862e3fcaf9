use crate::memory::ValueMap;

use serde::{Deserialize, Serialize};

use std::collections::HashMap;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
/// Persistent state the engine reads and writes while stories play.
///
/// Three lifetimes of data live here:
///
/// *   `memories` last for one play session and are the general scratch
///     space stories communicate through (`mem_` namespace).
/// *   `groundhogs` persist across sessions and deaths (`hog_` namespace);
///     the host is responsible for saving and restoring them.
/// *   The story ledger records which stories have executed and in which
///     month they last did (`story_` namespace and the repeat gate).
///
/// Per-story `var_` values do *not* live here: they are scoped to a single
/// story execution and belong to the running [`Scene`][crate::run::Scene].
///
/// The store also carries the current game month, which the host advances;
/// ages, seasons and deterministic random seeds all derive from it.
pub struct MemoryStore {
    /// Session-scoped key-value memory (`mem_`).
    pub memories: ValueMap,
    /// Permanent key-value memory (`hog_`).
    pub groundhogs: ValueMap,
    /// Story id → month the story last executed.
    ledger: HashMap<String, i32>,
    /// Current game month, counted from the start of the game.
    pub month: i32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the given story has ever executed.
    pub fn has_story(&self, story_id: &str) -> bool {
        self.ledger.contains_key(&normalize(story_id))
    }

    /// The month a story last executed, or `None` if it never has.
    pub fn story_month(&self, story_id: &str) -> Option<i32> {
        self.ledger.get(&normalize(story_id)).copied()
    }

    /// Record that a story executed this month, or erase the record.
    ///
    /// Erasing exists for authored hackery (`~set story_x = false`) and
    /// debugging; ids need not belong to real stories.
    pub fn set_story(&mut self, story_id: &str, happened: bool) {
        let story_id = normalize(story_id);

        if happened {
            self.ledger.insert(story_id, self.month);
        } else {
            self.ledger.remove(&story_id);
        }
    }

    /// Record a story as having executed in a specific month.
    ///
    /// A month of zero or lower erases the record.
    pub fn set_story_month(&mut self, story_id: &str, month: i32) {
        let story_id = normalize(story_id);

        if month > 0 {
            self.ledger.insert(story_id, month);
        } else {
            self.ledger.remove(&story_id);
        }
    }

    /// Months since a story last executed: `0` for this month, `-1` for never.
    ///
    /// A story recorded in the future (possible when a host rewinds time for
    /// debugging) counts as this month.
    pub fn months_since_story(&self, story_id: &str) -> i32 {
        match self.story_month(story_id) {
            Some(month) => (self.month - month).max(0),
            None => -1,
        }
    }
}

fn normalize(story_id: &str) -> String {
    story_id.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stories_are_recorded_with_the_current_month() {
        let mut store = MemoryStore::new();
        store.month = 15;

        store.set_story("gardenIntro", true);

        assert!(store.has_story("gardenintro"));
        assert_eq!(store.story_month("GardenIntro"), Some(15));
    }

    #[test]
    fn unrecorded_stories_read_as_never_happened() {
        let store = MemoryStore::new();

        assert!(!store.has_story("missing"));
        assert_eq!(store.story_month("missing"), None);
        assert_eq!(store.months_since_story("missing"), -1);
    }

    #[test]
    fn months_since_story_counts_from_the_current_month() {
        let mut store = MemoryStore::new();
        store.month = 10;
        store.set_story("intro", true);

        store.month = 14;

        assert_eq!(store.months_since_story("intro"), 4);
    }

    #[test]
    fn stories_recorded_in_the_future_count_as_this_month() {
        let mut store = MemoryStore::new();
        store.month = 20;
        store.set_story("intro", true);

        store.month = 15;

        assert_eq!(store.months_since_story("intro"), 0);
    }

    #[test]
    fn setting_a_story_false_erases_it() {
        let mut store = MemoryStore::new();
        store.set_story("intro", true);

        store.set_story("intro", false);

        assert!(!store.has_story("intro"));
    }
}
