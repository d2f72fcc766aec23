use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility into the preemption core.
///
/// Cloning is cheap (each field is an `Arc<AtomicU64>`), matching the
/// teacher's `Counters` in `metrics/counters.rs`: the coordinator holds
/// one, the embedding application clones it out to wire into its own
/// metrics exporter. Reading or incrementing a counter never affects a
/// scheduling decision.
#[derive(Clone, Default)]
pub struct Counters {
    pub cycles_total: Arc<AtomicU64>,
    pub cycles_satisfied: Arc<AtomicU64>,
    pub cycles_unsatisfied: Arc<AtomicU64>,

    pub marks_created: Arc<AtomicU64>,
    pub marks_replaced: Arc<AtomicU64>,
    pub marks_promoted_to_kill: Arc<AtomicU64>,

    pub unmark_container_calls: Arc<AtomicU64>,
    pub unmark_app_calls: Arc<AtomicU64>,

    pub debtor_transitions: Arc<AtomicU64>,
    pub creditor_transitions: Arc<AtomicU64>,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, satisfied: bool) {
        Self::bump(&self.cycles_total);
        if satisfied {
            Self::bump(&self.cycles_satisfied);
        } else {
            Self::bump(&self.cycles_unsatisfied);
        }
    }

    pub fn record_mark_created(&self) {
        Self::bump(&self.marks_created);
    }

    pub fn record_mark_replaced(&self) {
        Self::bump(&self.marks_replaced);
    }

    pub fn record_promoted_to_kill(&self) {
        Self::bump(&self.marks_promoted_to_kill);
    }

    pub fn record_unmark_container(&self) {
        Self::bump(&self.unmark_container_calls);
    }

    pub fn record_unmark_app(&self) {
        Self::bump(&self.unmark_app_calls);
    }

    pub fn record_debtor_transition(&self) {
        Self::bump(&self.debtor_transitions);
    }

    pub fn record_creditor_transition(&self) {
        Self::bump(&self.creditor_transitions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn counters_increment_independently() {
        let c = Counters::default();
        c.record_cycle(true);
        c.record_cycle(false);
        c.record_mark_created();

        assert_eq!(c.cycles_total.load(Ordering::Relaxed), 2);
        assert_eq!(c.cycles_satisfied.load(Ordering::Relaxed), 1);
        assert_eq!(c.cycles_unsatisfied.load(Ordering::Relaxed), 1);
        assert_eq!(c.marks_created.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn clone_shares_the_same_counters() {
        let a = Counters::default();
        let b = a.clone();
        a.record_mark_created();
        assert_eq!(b.marks_created.load(Ordering::Relaxed), 1);
    }
}
