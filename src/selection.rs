//! Selection Engine: the dry-run algorithm that picks containers to mark
//! for preemption from an ordered candidate list, without exceeding a
//! queue-partition's preemption budget or its headroom over ideal.
//!
//! Grounded on `warpgrid-placement/src/placer.rs`'s `Preemption`/`RunningState`
//! candidate-scan shape (the closest pack analogue to this exact
//! dry-run-then-commit pattern) and the teacher's `planner/sizing.rs` for
//! the `#[instrument]` + saturating-arithmetic discipline.

use std::collections::HashSet;

use crate::measure::EntityMeasureStore;
use crate::queue_usage::QueueUsageSnapshot;
use crate::relationship::RelationshipStore;
use crate::resource::{Resource, ResourceCalculator};
use crate::types::{ContainerHandle, ContainerId};

/// Dry-run candidate scan. Returns the admitted subset once enough
/// aggregate resource (admitted or not) has been scanned to satisfy
/// `required`, or `None` if the whole candidate list is exhausted first.
///
/// A candidate already carrying a mark against the same queue-partition
/// measure has its own prior contribution subtracted out of the trial
/// before the admission predicate runs (`relationships` is consulted
/// read-only for this). Without that, a queue sitting exactly at its
/// preemption budget could never re-confirm its own existing marks on a
/// later cycle, and the grace-period promotion in
/// [`crate::coordinator::Coordinator::try_preempt`] would be unreachable.
#[tracing::instrument(skip_all, target = "selection", fields(candidates = candidates.len()))]
pub fn select(
    candidates: &[ContainerHandle],
    required: &Resource,
    queue_usage: &QueueUsageSnapshot,
    measures: &mut EntityMeasureStore,
    relationships: &RelationshipStore,
    calculator: &dyn ResourceCalculator,
    partition: &str,
    timestamp: u64,
    selecting_containers: &mut HashSet<ContainerId>,
) -> Option<Vec<ContainerHandle>> {
    let mut total_selected = Resource::zero();
    let mut selected = Vec::new();

    for c in candidates {
        if c.is_am_container || selecting_containers.contains(&c.container_id) {
            tracing::debug!(
                target: "selection",
                container = %c.container_id,
                "skipping candidate: am container or already selected this cycle"
            );
        } else {
            let key = EntityMeasureStore::key(&c.queue, partition);
            match measures.get_mut(&key) {
                None => {
                    tracing::debug!(target: "selection", container = %c.container_id, queue = %c.queue, "skipping candidate: no measure for queue-partition");
                }
                Some(measure) if !measure.debtor => {
                    tracing::debug!(target: "selection", container = %c.container_id, queue = %c.queue, "skipping candidate: queue is not a debtor");
                }
                Some(measure) => {
                    let marked_dry_run = measure.dry_run_snapshot(timestamp);
                    let already_marked_here = relationships
                        .get_mark(c.container_id)
                        .filter(|m| m.container_queue_key == key)
                        .map(|m| m.container.allocated.clone())
                        .unwrap_or_else(Resource::zero);
                    let effective_base = marked_dry_run.sub(&already_marked_here);

                    let used = queue_usage.used(&c.queue, partition);
                    let trial = effective_base.add(&c.allocated);

                    let budget_ok =
                        calculator.fits_in(&trial, &measure.max_preemptable) || effective_base.is_zero();
                    let headroom = used.sub(&measure.ideal);
                    let headroom_ok = calculator.fits_in(&trial, &headroom);

                    if budget_ok && headroom_ok {
                        measure.dry_run_set(timestamp, trial);
                        selecting_containers.insert(c.container_id);
                        selected.push(c.clone());
                    }
                }
            }
        }

        total_selected = total_selected.add(&c.allocated);
        if calculator.fits_in(required, &total_selected) {
            return Some(selected);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::DominantResourceCalculator;
    use crate::types::ContainerId as Cid;
    use uuid::Uuid;

    fn handle(queue: &str, allocated: Resource, is_am: bool) -> ContainerHandle {
        ContainerHandle {
            container_id: Cid(Uuid::new_v4()),
            queue: queue.to_string(),
            user: "bob".to_string(),
            allocated,
            is_am_container: is_am,
        }
    }

    fn debtor_fixture() -> (EntityMeasureStore, QueueUsageSnapshot) {
        let mut measures = EntityMeasureStore::new();
        measures.update_partition("B", "default", Resource::new(4, 4), Resource::new(2, 2));
        let usage = QueueUsageSnapshot::rebuild(&crate::queue_usage::tests_support::single_queue(
            "B",
            Resource::new(6, 6),
        ));
        (measures, usage)
    }

    #[test]
    fn selects_candidates_until_required_is_met() {
        let (mut measures, usage) = debtor_fixture();
        let calc = DominantResourceCalculator;
        let mut selecting = HashSet::new();
        let candidates = vec![handle("B", Resource::new(1, 1), false), handle("B", Resource::new(1, 1), false)];

        let selected = select(
            &candidates,
            &Resource::new(2, 2),
            &usage,
            &mut measures,
            &RelationshipStore::new(),
            &calc,
            "default",
            1,
            &mut selecting,
        )
        .expect("required should be satisfiable");

        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn am_container_is_never_selected_but_still_counts_toward_scan() {
        let (mut measures, usage) = debtor_fixture();
        let calc = DominantResourceCalculator;
        let mut selecting = HashSet::new();
        let candidates = vec![handle("B", Resource::new(2, 2), true), handle("B", Resource::new(2, 2), false)];

        let selected = select(
            &candidates,
            &Resource::new(2, 2),
            &usage,
            &mut measures,
            &RelationshipStore::new(),
            &calc,
            "default",
            1,
            &mut selecting,
        )
        .unwrap();

        assert_eq!(selected.len(), 1);
        assert!(!selected[0].is_am_container);
    }

    #[test]
    fn returns_none_when_candidates_cannot_satisfy_required() {
        let (mut measures, usage) = debtor_fixture();
        let calc = DominantResourceCalculator;
        let mut selecting = HashSet::new();
        let candidates = vec![handle("B", Resource::new(1, 1), false)];

        let selected = select(
            &candidates,
            &Resource::new(10, 10),
            &usage,
            &mut measures,
            &RelationshipStore::new(),
            &calc,
            "default",
            1,
            &mut selecting,
        );
        assert!(selected.is_none());
    }

    #[test]
    fn single_oversized_container_admitted_via_zero_marked_disjunct() {
        let mut measures = EntityMeasureStore::new();
        measures.update_partition("B", "default", Resource::new(4, 4), Resource::new(1, 1));
        let usage = QueueUsageSnapshot::rebuild(&crate::queue_usage::tests_support::single_queue(
            "B",
            Resource::new(10, 10),
        ));
        let calc = DominantResourceCalculator;
        let mut selecting = HashSet::new();
        let candidates = vec![handle("B", Resource::new(4, 4), false)];

        let selected = select(
            &candidates,
            &Resource::new(1, 1),
            &usage,
            &mut measures,
            &RelationshipStore::new(),
            &calc,
            "default",
            1,
            &mut selecting,
        )
        .expect("oversized-only candidate must still be admitted");
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn non_debtor_queue_never_contributes_candidates() {
        let mut measures = EntityMeasureStore::new();
        measures.update_partition("A", "default", Resource::new(4, 4), Resource::new(0, 0));
        let usage = QueueUsageSnapshot::rebuild(&crate::queue_usage::tests_support::single_queue(
            "A",
            Resource::new(4, 4),
        ));
        let calc = DominantResourceCalculator;
        let mut selecting = HashSet::new();
        let candidates = vec![handle("A", Resource::new(1, 1), false)];

        let selected = select(
            &candidates,
            &Resource::new(1, 1),
            &usage,
            &mut measures,
            &RelationshipStore::new(),
            &calc,
            "default",
            1,
            &mut selecting,
        );
        assert!(selected.is_none());
    }
}
