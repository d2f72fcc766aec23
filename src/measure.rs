//! Entity Measure Store: the authoritative per-(queue, partition) table of
//! ideal share, preemption budget, and currently-marked total.
//!
//! Grounded on the teacher's `session/cache.rs` (a `HashMap`-backed store
//! with lazily-created entries and saturating counters) generalized from
//! per-session credit tracking to per-queue-partition preemption budgets.

use std::collections::HashMap;

use crate::resource::Resource;

/// One queue-partition's preemption bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMeasure {
    pub ideal: Resource,
    pub max_preemptable: Resource,
    pub total_marked_preempted: Resource,
    pub debtor: bool,
    dry_run: Option<(u64, Resource)>,
}

impl EntityMeasure {
    fn new() -> Self {
        Self {
            ideal: Resource::zero(),
            max_preemptable: Resource::zero(),
            total_marked_preempted: Resource::zero(),
            debtor: false,
            dry_run: None,
        }
    }

    /// Lazily clone `total_marked_preempted` into a per-timestamp shadow on
    /// first access; subsequent calls with the same `timestamp` read the
    /// shadow, so the selection engine can hypothetically accumulate
    /// admissions within one cycle without touching committed state.
    pub fn dry_run_snapshot(&mut self, timestamp: u64) -> Resource {
        match &self.dry_run {
            Some((ts, marked)) if *ts == timestamp => marked.clone(),
            _ => {
                let marked = self.total_marked_preempted.clone();
                self.dry_run = Some((timestamp, marked.clone()));
                marked
            }
        }
    }

    /// Overwrite the dry-run shadow for `timestamp` with an already-computed
    /// trial value (the selection engine calls this after deciding a
    /// candidate is admitted, rather than incrementing blindly, so that a
    /// candidate re-evaluated in a later cycle — see
    /// [`crate::selection::select`]'s already-marked handling — doesn't
    /// get double-counted).
    pub fn dry_run_set(&mut self, timestamp: u64, value: Resource) {
        self.dry_run = Some((timestamp, value));
    }

    pub fn add_marked(&mut self, delta: &Resource) {
        self.total_marked_preempted = self.total_marked_preempted.add(delta);
    }

    pub fn sub_marked(&mut self, delta: &Resource) {
        self.total_marked_preempted = self.total_marked_preempted.sub(delta);
        debug_assert!(
            self.total_marked_preempted.dims().iter().all(|&d| d >= 0),
            "totalMarkedPreempted went negative"
        );
    }
}

/// Outcome of a single [`EntityMeasureStore::update_partition`] call,
/// telling the coordinator whether a debtor-state transition occurred and
/// therefore whether a cascade unmark is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionUpdateOutcome {
    pub key: String,
    pub became_debtor: bool,
    pub became_creditor: bool,
}

/// Per-(queue, partition) measure table.
#[derive(Debug, Default)]
pub struct EntityMeasureStore {
    measures: HashMap<String, EntityMeasure>,
}

impl EntityMeasureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            measures: HashMap::with_capacity(capacity),
        }
    }

    pub fn key(queue: &str, partition: &str) -> String {
        format!("{queue}_{partition}")
    }

    pub fn get(&self, key: &str) -> Option<&EntityMeasure> {
        self.measures.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut EntityMeasure> {
        self.measures.get_mut(key)
    }

    pub fn get_or_create_mut(&mut self, key: &str) -> &mut EntityMeasure {
        self.measures.entry(key.to_string()).or_insert_with(EntityMeasure::new)
    }

    /// Apply a queue-partition update. Returns whether a debtor-state
    /// transition happened, so the coordinator can cascade-unmark through
    /// the Relationship Store (§4.1).
    #[tracing::instrument(skip(self, ideal, max_preempt), target = "measure_store")]
    pub fn update_partition(
        &mut self,
        queue: &str,
        partition: &str,
        ideal: Resource,
        max_preempt: Resource,
    ) -> PartitionUpdateOutcome {
        let key = Self::key(queue, partition);
        let was_debtor = self.measures.get(&key).map(|m| m.debtor).unwrap_or(false);

        let measure = self.get_or_create_mut(&key);
        measure.ideal = ideal;

        let is_positive = max_preempt.dims().iter().any(|&d| d > 0);
        if is_positive {
            measure.max_preemptable = max_preempt;
            measure.debtor = true;
        } else {
            measure.max_preemptable = max_preempt.negate();
            measure.debtor = false;
        }

        let became_debtor = !was_debtor && measure.debtor;
        let became_creditor = was_debtor && !measure.debtor;

        if became_debtor || became_creditor {
            tracing::debug!(target: "measure_store", queue, partition, became_debtor, became_creditor, "debtor state transition");
        }

        PartitionUpdateOutcome {
            key,
            became_debtor,
            became_creditor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_partition_marks_debtor_on_positive_budget() {
        let mut store = EntityMeasureStore::new();
        let outcome = store.update_partition("B", "P", Resource::new(4, 4), Resource::new(2, 2));
        assert!(outcome.became_debtor);
        assert!(!outcome.became_creditor);
        let m = store.get(&outcome.key).unwrap();
        assert!(m.debtor);
        assert_eq!(m.max_preemptable, Resource::new(2, 2));
    }

    #[test]
    fn update_partition_marks_creditor_on_nonpositive_budget() {
        let mut store = EntityMeasureStore::new();
        let outcome = store.update_partition("A", "P", Resource::new(4, 4), Resource::new(0, 0));
        assert!(!outcome.became_debtor);
        assert!(!outcome.became_creditor);
        let m = store.get(&outcome.key).unwrap();
        assert!(!m.debtor);
        assert_eq!(m.max_preemptable, Resource::zero());
    }

    #[test]
    fn transition_back_to_creditor_is_flagged() {
        let mut store = EntityMeasureStore::new();
        store.update_partition("B", "P", Resource::new(4, 4), Resource::new(2, 2));
        let outcome = store.update_partition("B", "P", Resource::new(4, 4), Resource::new(0, 0));
        assert!(outcome.became_creditor);
        assert!(!store.get(&outcome.key).unwrap().debtor);
    }

    #[test]
    fn dry_run_snapshot_is_stable_within_a_timestamp() {
        let mut measure = EntityMeasure::new();
        measure.add_marked(&Resource::new(1, 1));

        let first = measure.dry_run_snapshot(7);
        let trial = first.add(&Resource::new(2, 2));
        measure.dry_run_set(7, trial);
        let second = measure.dry_run_snapshot(7);

        assert_eq!(first, Resource::new(1, 1));
        assert_eq!(second, Resource::new(3, 3));
        // committed state is untouched by the hypothetical add
        assert_eq!(measure.total_marked_preempted, Resource::new(1, 1));
    }

    #[test]
    fn dry_run_snapshot_resets_on_new_timestamp() {
        let mut measure = EntityMeasure::new();
        measure.add_marked(&Resource::new(1, 1));
        measure.dry_run_set(7, Resource::new(3, 3));
        let reset = measure.dry_run_snapshot(8);
        assert_eq!(reset, Resource::new(1, 1));
    }
}
