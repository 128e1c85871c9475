//! Keyed, grouped live collection driven by push deltas.
//!
//! Entries are indexed by ID and grouped by market. A group exists only while
//! it holds at least one entry.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::metrics;

/// An entity the reconciler can keep in a [`LiveCollection`].
pub trait LiveEntry: Clone {
    /// Entity label for logs and metrics.
    const ENTITY: &'static str;

    /// Stable unique ID.
    fn key(&self) -> &str;

    /// Parent grouping (market ID).
    fn group(&self) -> &str;

    /// False once the entry must leave the collection (terminal status or
    /// zero quantity).
    fn is_live(&self) -> bool;

    /// Copy mutable fields from `update`; identity fields stay untouched.
    fn absorb(&mut self, update: Self);
}

/// What a delta did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// New entry created from the payload.
    Inserted,
    /// Existing entry updated in place.
    Updated,
    /// Existing entry removed.
    Removed,
    /// Terminal delta for an unknown ID.
    Ignored,
}

impl DeltaOutcome {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeltaOutcome::Inserted => "inserted",
            DeltaOutcome::Updated => "updated",
            DeltaOutcome::Removed => "removed",
            DeltaOutcome::Ignored => "ignored",
        }
    }
}

/// Live entries grouped by market, in arrival order within a group.
#[derive(Debug, Clone)]
pub struct LiveCollection<T> {
    groups: BTreeMap<String, Vec<T>>,
    index: HashMap<String, String>,
}

impl<T> Default for LiveCollection<T> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: LiveEntry> LiveCollection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with a snapshot. Non-live entries are skipped;
    /// a repeated ID keeps the last occurrence. Returns the entry count.
    pub fn seed(&mut self, entries: impl IntoIterator<Item = T>) -> usize {
        self.clear();
        for entry in entries {
            self.merge(entry);
        }
        debug!(entity = T::ENTITY, count = self.len(), "Collection seeded");
        self.len()
    }

    /// Apply one delta. Last applied wins per ID.
    pub fn apply(&mut self, update: T) -> DeltaOutcome {
        let key = update.key().to_string();
        let outcome = self.merge(update);
        debug!(entity = T::ENTITY, key = %key, outcome = outcome.as_str(), "Delta applied");
        metrics::inc_delta_applied(T::ENTITY, outcome.as_str());
        outcome
    }

    fn merge(&mut self, update: T) -> DeltaOutcome {
        let Some(group) = self.index.get(update.key()).cloned() else {
            if !update.is_live() {
                return DeltaOutcome::Ignored;
            }
            self.index
                .insert(update.key().to_string(), update.group().to_string());
            self.groups
                .entry(update.group().to_string())
                .or_default()
                .push(update);
            return DeltaOutcome::Inserted;
        };

        if update.group() != group {
            debug!(
                entity = T::ENTITY,
                key = update.key(),
                stored = %group,
                received = update.group(),
                "Ignoring group change on existing entry"
            );
        }

        let Some(entries) = self.groups.get_mut(&group) else {
            // Index without a group: drop the stale index and start over.
            self.index.remove(update.key());
            return self.merge(update);
        };
        let Some(pos) = entries.iter().position(|e| e.key() == update.key()) else {
            self.index.remove(update.key());
            return self.merge(update);
        };

        if update.is_live() {
            entries[pos].absorb(update);
            return DeltaOutcome::Updated;
        }

        let removed = entries.remove(pos);
        if entries.is_empty() {
            self.groups.remove(&group);
        }
        self.index.remove(removed.key());
        DeltaOutcome::Removed
    }

    /// Entry by ID.
    pub fn get(&self, key: &str) -> Option<&T> {
        let group = self.index.get(key)?;
        self.groups.get(group)?.iter().find(|e| e.key() == key)
    }

    /// True if an entry with `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Entries of one group, if the group exists.
    pub fn group(&self, group: &str) -> Option<&[T]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    /// Groups in key order with their entries.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[T])> + '_ {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All entries, grouped.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.groups.values().flatten()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of non-empty groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: &'static str,
        group: &'static str,
        qty: u32,
    }

    impl LiveEntry for Item {
        const ENTITY: &'static str = "item";

        fn key(&self) -> &str {
            self.id
        }

        fn group(&self) -> &str {
            self.group
        }

        fn is_live(&self) -> bool {
            self.qty > 0
        }

        fn absorb(&mut self, update: Self) {
            self.qty = update.qty;
        }
    }

    fn item(id: &'static str, group: &'static str, qty: u32) -> Item {
        Item { id, group, qty }
    }

    #[test]
    fn insert_update_remove_cycle() {
        let mut c = LiveCollection::new();
        assert_eq!(c.apply(item("a", "m1", 5)), DeltaOutcome::Inserted);
        assert_eq!(c.apply(item("a", "m1", 3)), DeltaOutcome::Updated);
        assert_eq!(c.get("a").map(|i| i.qty), Some(3));
        assert_eq!(c.apply(item("a", "m1", 0)), DeltaOutcome::Removed);
        assert!(c.is_empty());
    }

    #[test]
    fn terminal_for_unknown_key_is_ignored() {
        let mut c: LiveCollection<Item> = LiveCollection::new();
        assert_eq!(c.apply(item("x", "m1", 0)), DeltaOutcome::Ignored);
        assert_eq!(c.apply(item("x", "m1", 0)), DeltaOutcome::Ignored);
        assert!(c.is_empty());
        assert_eq!(c.group_count(), 0);
    }

    #[test]
    fn removing_last_entry_drops_group() {
        let mut c = LiveCollection::new();
        c.apply(item("a", "m1", 1));
        c.apply(item("b", "m1", 1));
        c.apply(item("c", "m2", 1));

        c.apply(item("a", "m1", 0));
        assert_eq!(c.group("m1").map(<[Item]>::len), Some(1));

        c.apply(item("b", "m1", 0));
        assert!(c.group("m1").is_none());
        assert_eq!(c.group_count(), 1);
    }

    #[test]
    fn group_is_immutable_for_existing_entry() {
        let mut c = LiveCollection::new();
        c.apply(item("a", "m1", 1));
        assert_eq!(c.apply(item("a", "m2", 4)), DeltaOutcome::Updated);

        assert!(c.group("m2").is_none());
        assert_eq!(c.group("m1").unwrap()[0].qty, 4);
    }

    #[test]
    fn seed_replaces_and_skips_dead_entries() {
        let mut c = LiveCollection::new();
        c.apply(item("old", "m9", 1));

        let n = c.seed(vec![item("a", "m1", 1), item("b", "m1", 0), item("a", "m1", 7)]);
        assert_eq!(n, 1);
        assert!(!c.contains("old"));
        assert_eq!(c.get("a").map(|i| i.qty), Some(7));
    }

    #[test]
    fn iteration_keeps_arrival_order_within_group() {
        let mut c = LiveCollection::new();
        c.apply(item("z", "m1", 1));
        c.apply(item("a", "m1", 1));
        let ids: Vec<_> = c.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["z", "a"]);
    }
}
