//! Cluster snapshot: per-leaf-queue resource usage, rebuilt by BFS over the
//! queue tree whenever the tree is refreshed.
//!
//! Grounded on the teacher's `market_view/mod.rs` (`Arc<RwLock<HashMap<...>>>`
//! keyed by pair id, replaced wholesale on refresh); reimplemented as a
//! plain owned map since the coordinator already holds this behind its own
//! `parking_lot::RwLock` (§5).

use std::collections::{HashMap, VecDeque};

use crate::resource::Resource;

/// Capability set the embedding scheduler's queue-tree node type must
/// expose for a BFS rebuild of the usage snapshot.
pub trait CsQueueNode {
    fn queue_name(&self) -> &str;
    fn partitions(&self) -> Vec<String>;
    fn used(&self, partition: &str) -> Resource;
    fn child_queues(&self) -> Vec<&dyn CsQueueNode>;
}

/// Snapshot of `used(partition)` per queue, as of the last `queueRefreshed`
/// call.
#[derive(Debug, Clone, Default)]
pub struct QueueUsageSnapshot {
    used: HashMap<String, HashMap<String, Resource>>,
}

impl QueueUsageSnapshot {
    pub fn used(&self, queue: &str, partition: &str) -> Resource {
        self.used
            .get(queue)
            .and_then(|by_partition| by_partition.get(partition))
            .cloned()
            .unwrap_or_else(Resource::zero)
    }

    /// Rebuild the whole snapshot by breadth-first traversal of the queue
    /// tree rooted at `root`. Replaces the map wholesale, matching
    /// `queueRefreshed`'s "replacing the map wholesale" semantics (§4.4).
    pub fn rebuild(root: &dyn CsQueueNode) -> Self {
        let mut used = HashMap::new();
        let mut queue: VecDeque<&dyn CsQueueNode> = VecDeque::new();
        queue.push_back(root);

        while let Some(node) = queue.pop_front() {
            let mut by_partition = HashMap::new();
            for partition in node.partitions() {
                let usage = node.used(&partition);
                by_partition.insert(partition, usage);
            }
            used.insert(node.queue_name().to_string(), by_partition);

            for child in node.child_queues() {
                queue.push_back(child);
            }
        }

        Self { used }
    }
}

/// Single-node queue tree fixture shared by this module's and the
/// selection engine's tests.
#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;

    pub struct SingleQueue {
        name: String,
        usage: Resource,
    }

    impl CsQueueNode for SingleQueue {
        fn queue_name(&self) -> &str {
            &self.name
        }
        fn partitions(&self) -> Vec<String> {
            vec!["default".to_string()]
        }
        fn used(&self, _partition: &str) -> Resource {
            self.usage.clone()
        }
        fn child_queues(&self) -> Vec<&dyn CsQueueNode> {
            vec![]
        }
    }

    pub fn single_queue(name: &str, usage: Resource) -> SingleQueue {
        SingleQueue {
            name: name.to_string(),
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeQueue {
        name: &'static str,
        usage: Resource,
        children: Vec<FakeQueue>,
    }

    impl CsQueueNode for FakeQueue {
        fn queue_name(&self) -> &str {
            self.name
        }
        fn partitions(&self) -> Vec<String> {
            vec!["default".to_string()]
        }
        fn used(&self, _partition: &str) -> Resource {
            self.usage.clone()
        }
        fn child_queues(&self) -> Vec<&dyn CsQueueNode> {
            self.children.iter().map(|c| c as &dyn CsQueueNode).collect()
        }
    }

    #[test]
    fn rebuild_visits_every_node_in_the_tree() {
        let root = FakeQueue {
            name: "root",
            usage: Resource::zero(),
            children: vec![
                FakeQueue { name: "A", usage: Resource::new(2, 2), children: vec![] },
                FakeQueue { name: "B", usage: Resource::new(6, 6), children: vec![] },
            ],
        };
        let snapshot = QueueUsageSnapshot::rebuild(&root);
        assert_eq!(snapshot.used("A", "default"), Resource::new(2, 2));
        assert_eq!(snapshot.used("B", "default"), Resource::new(6, 6));
        assert_eq!(snapshot.used("root", "default"), Resource::zero());
    }

    #[test]
    fn unknown_queue_or_partition_defaults_to_zero() {
        let snapshot = QueueUsageSnapshot::default();
        assert_eq!(snapshot.used("ghost", "default"), Resource::zero());
    }
}
