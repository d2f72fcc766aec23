//! Cycle Coordinator: the outward-facing façade over the Measure Store,
//! Relationship Store, Selection Engine, and kill set, all guarded by one
//! process-wide readers-writer lock (§5).
//!
//! Grounded on the teacher's `scheduler/scheduler.rs` (`Scheduler::on_tick`
//! as the single mutating entry point orchestrating several stores) and
//! `session/store.rs` (`parking_lot::Mutex`-guarded multi-index store);
//! generalized to a `parking_lot::RwLock` per §5's explicit lock-crate
//! requirement.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::clock::Clock;
use crate::logger::warn_if_slow;
use crate::measure::EntityMeasureStore;
use crate::metrics::Counters;
use crate::queue_usage::{CsQueueNode, QueueUsageSnapshot};
use crate::relationship::{RelationshipStore, ToPreemptContainer};
use crate::resource::{DominantResourceCalculator, Resource, ResourceCalculator};
use crate::selection;
use crate::types::{
    classify, AttemptId, ContainerHandle, ContainerId, PreemptableQueuePartitionEntity, PreemptionType,
    ResourceName, ResourceRequirement,
};
use crate::config::PreemptionConfig;

struct CoordinatorState {
    measures: EntityMeasureStore,
    relationships: RelationshipStore,
    kill_set: HashSet<ContainerId>,
    queue_usage: QueueUsageSnapshot,
    selecting_containers: HashSet<ContainerId>,
    dry_run_counter: u64,
}

/// The public entry point the embedding scheduler drives from multiple
/// threads (§5). Every mutating method takes the write lock for its entire
/// duration; `can_queue_preempt` and `resources_marked_for` take only the
/// read lock.
pub struct Coordinator {
    state: RwLock<CoordinatorState>,
    calculator: Arc<dyn ResourceCalculator>,
    clock: Arc<dyn Clock>,
    config: PreemptionConfig,
    counters: Counters,
}

impl Coordinator {
    pub fn new(calculator: Arc<dyn ResourceCalculator>, clock: Arc<dyn Clock>, config: PreemptionConfig) -> Self {
        let state = CoordinatorState {
            measures: EntityMeasureStore::with_capacity(config.initial_measure_capacity),
            relationships: RelationshipStore::with_capacity(config.initial_demander_capacity),
            kill_set: HashSet::new(),
            queue_usage: QueueUsageSnapshot::default(),
            selecting_containers: HashSet::new(),
            dry_run_counter: 0,
        };
        Self {
            state: RwLock::new(state),
            calculator,
            clock,
            config,
            counters: Counters::default(),
        }
    }

    /// Construct with the default dominance rule, a real wall clock, and
    /// default configuration. Convenient for binaries that don't need to
    /// inject an alternate calculator or clock.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(DominantResourceCalculator),
            Arc::new(crate::clock::SystemClock),
            PreemptionConfig::default(),
        )
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Run one preemption cycle for `requirement` against `candidates`.
    /// Returns `true` iff the selection engine found an admissible subset
    /// satisfying `requirement.required`; in that case every admitted
    /// container is newly marked, re-marked, or (past the grace period)
    /// promoted to the kill set.
    #[tracing::instrument(skip(self, requirement, candidates), target = "coordinator", fields(candidates = candidates.len()))]
    pub fn try_preempt(&self, requirement: ResourceRequirement, candidates: &[ContainerHandle], partition: &str) -> bool {
        let now = self.clock.now_ms();
        let mut state = self.state.write();
        state.selecting_containers.clear();

        let demander_queue = requirement.application.queue.clone();
        let demander_user = requirement.application.user.clone();

        let filtered: Vec<ContainerHandle> = candidates
            .iter()
            .filter(|c| classify(&demander_queue, &demander_user, &c.queue, &c.user) == PreemptionType::DifferentQueue)
            .cloned()
            .collect();

        state.dry_run_counter += 1;
        let timestamp = state.dry_run_counter;

        let demanding_key = EntityMeasureStore::key(&demander_queue, partition);
        state.measures.get_or_create_mut(&demanding_key);

        let threshold = self.config.selection_scan_warn_threshold;
        let selected = warn_if_slow("selection_scan", threshold, || {
            let CoordinatorState { measures, relationships, selecting_containers, queue_usage, .. } = &mut *state;
            selection::select(
                &filtered,
                &requirement.required,
                queue_usage,
                measures,
                relationships,
                self.calculator.as_ref(),
                partition,
                timestamp,
                selecting_containers,
            )
        });

        let Some(selected) = selected else {
            self.counters.record_cycle(false);
            tracing::info!(target: "coordinator", partition, "cycle found no admissible candidates");
            return false;
        };

        let grace_ms = self.config.wait_before_kill_sec.saturating_mul(1000);

        for c in &selected {
            let container_key = EntityMeasureStore::key(&c.queue, partition);
            state.measures.get_or_create_mut(&container_key);

            let existing = state.relationships.get_mark(c.container_id).cloned();
            match existing {
                None => {
                    Self::apply_new_mark(&mut state, c, &requirement, &container_key, &demanding_key, now, now);
                    self.counters.record_mark_created();
                }
                Some(old) if old.requirement != requirement => {
                    Self::remove_and_subtract(&mut state, c.container_id);
                    Self::apply_new_mark(&mut state, c, &requirement, &container_key, &demanding_key, old.start_timestamp, now);
                    self.counters.record_mark_replaced();
                }
                Some(old) => {
                    if now.saturating_sub(old.start_timestamp) > grace_ms {
                        state.kill_set.insert(c.container_id);
                        self.counters.record_promoted_to_kill();
                        tracing::info!(target: "coordinator", container = %c.container_id, "container promoted to kill set");
                    }
                    if let Some(mark) = state.relationships.get_mark_mut(c.container_id) {
                        mark.last_listed_timestamp = now;
                    }
                }
            }
        }

        self.counters.record_cycle(true);
        true
    }

    fn apply_new_mark(
        state: &mut CoordinatorState,
        container: &ContainerHandle,
        requirement: &ResourceRequirement,
        container_key: &str,
        demanding_key: &str,
        start_timestamp: u64,
        now: u64,
    ) {
        if let Some(m) = state.measures.get_mut(container_key) {
            m.add_marked(&container.allocated);
        }
        if let Some(m) = state.measures.get_mut(demanding_key) {
            m.add_marked(&container.allocated);
        }
        state.relationships.add_mark(
            container.clone(),
            requirement.clone(),
            PreemptionType::DifferentQueue,
            container_key.to_string(),
            demanding_key.to_string(),
            start_timestamp,
            now,
        );
    }

    fn subtract_mark(state: &mut CoordinatorState, mark: &ToPreemptContainer) {
        if let Some(m) = state.measures.get_mut(&mark.container_queue_key) {
            m.sub_marked(&mark.container.allocated);
        }
        if let Some(m) = state.measures.get_mut(&mark.demanding_queue_key) {
            m.sub_marked(&mark.container.allocated);
        }
    }

    fn remove_and_subtract(state: &mut CoordinatorState, container_id: ContainerId) -> Option<ToPreemptContainer> {
        let mark = state.relationships.unmark_container(container_id)?;
        Self::subtract_mark(state, &mark);
        state.kill_set.remove(&container_id);
        Some(mark)
    }

    /// Atomically swap the kill set with an empty one, returning whatever
    /// had accumulated since the last pull.
    #[tracing::instrument(skip(self), target = "coordinator")]
    pub fn pull_containers_to_kill(&self) -> HashSet<ContainerId> {
        let mut state = self.state.write();
        std::mem::take(&mut state.kill_set)
    }

    /// Gate for the allocator: may `queue` at `partition` still absorb
    /// `demand` worth of reclaim? False for debtors (a debtor cannot also
    /// be a creditor) and for unknown queue-partitions.
    pub fn can_queue_preempt(&self, queue: &str, partition: &str, demand: &Resource) -> bool {
        let state = self.state.read();
        let key = EntityMeasureStore::key(queue, partition);
        let Some(measure) = state.measures.get(&key) else {
            return false;
        };
        if measure.debtor {
            return false;
        }
        let headroom = measure.max_preemptable.sub(&measure.total_marked_preempted);
        self.calculator.fits_in(demand, &headroom)
    }

    pub fn resources_marked_for(&self, attempt_id: AttemptId, priority: i32, resource_name: &ResourceName) -> Resource {
        let state = self.state.read();
        state.relationships.resources_marked_for(attempt_id, priority, resource_name)
    }

    /// Bulk-apply `update_partition` for each entity.
    ///
    /// Cascades through the Relationship Store per §4.1: on the
    /// non-debtor → debtor *transition*, every mark whose demander sits in
    /// this queue is unmarked. The non-debtor branch is swept on *every*
    /// call that lands there, not just on a creditor transition — §4.1
    /// says so explicitly ("on any call to this branch"), since a mark
    /// against this queue's own containers should never coexist with a
    /// non-debtor measure regardless of whether this update changed
    /// anything.
    #[tracing::instrument(skip(self, entities), target = "coordinator", fields(count = entities.len()))]
    pub fn update_partitions(&self, entities: &[PreemptableQueuePartitionEntity]) {
        let mut state = self.state.write();
        for e in entities {
            let outcome = state
                .measures
                .update_partition(&e.queue, &e.partition, e.ideal.clone(), e.preemptable.clone());
            let currently_debtor = state.measures.get(&outcome.key).map(|m| m.debtor).unwrap_or(false);

            if outcome.became_debtor {
                self.counters.record_debtor_transition();
                let ids: Vec<ContainerId> = state
                    .relationships
                    .marks_iter()
                    .filter(|(_, m)| m.requirement.application.queue == e.queue)
                    .map(|(id, _)| *id)
                    .collect();
                if !ids.is_empty() {
                    tracing::warn!(target: "coordinator", queue = %e.queue, count = ids.len(), "debtor transition cascaded unmark of demander marks");
                }
                for id in ids {
                    Self::remove_and_subtract(&mut state, id);
                }
            }

            if !currently_debtor {
                if outcome.became_creditor {
                    self.counters.record_creditor_transition();
                }
                let ids: Vec<ContainerId> = state
                    .relationships
                    .marks_iter()
                    .filter(|(_, m)| m.container.queue == e.queue)
                    .map(|(id, _)| *id)
                    .collect();
                if !ids.is_empty() {
                    tracing::warn!(target: "coordinator", queue = %e.queue, count = ids.len(), "non-debtor update cascaded unmark of container marks");
                }
                for id in ids {
                    Self::remove_and_subtract(&mut state, id);
                }
            }
        }
    }

    #[tracing::instrument(skip(self), target = "coordinator")]
    pub fn unmark_container(&self, container_id: ContainerId) {
        let mut state = self.state.write();
        if Self::remove_and_subtract(&mut state, container_id).is_some() {
            self.counters.record_unmark_container();
        }
    }

    #[tracing::instrument(skip(self), target = "coordinator")]
    pub fn unmark_demanding_app(&self, attempt_id: AttemptId) {
        let mut state = self.state.write();
        let removed = state.relationships.unmark_demanding_app(attempt_id);
        if !removed.is_empty() {
            self.counters.record_unmark_app();
        }
        for mark in &removed {
            Self::subtract_mark(&mut state, mark);
            state.kill_set.remove(&mark.container.container_id);
        }
    }

    /// Rebuild the leaf-queue resource-usage snapshot by BFS, replacing it
    /// wholesale.
    #[tracing::instrument(skip(self, root), target = "coordinator")]
    pub fn queue_refreshed(&self, root: &dyn CsQueueNode) {
        let threshold = self.config.selection_scan_warn_threshold;
        let snapshot = warn_if_slow("queue_refresh", threshold, || QueueUsageSnapshot::rebuild(root));
        let mut state = self.state.write();
        state.queue_usage = snapshot;
    }
}
