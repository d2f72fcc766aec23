//! Boundary types: the capability sets the embedding scheduler provides,
//! and the owned snapshots the preemption core stores internally.
//!
//! Grounded on the teacher's `RMContainer`/`SchedulerApplicationAttempt`-
//! shaped inputs being reduced to small `Clone` value types at the module
//! boundary (`scheduler/policy.rs`'s `EligibleHandle`, `session/model.rs`'s
//! `Session`): rather than holding a live reference or trait object to the
//! scheduler's own container/attempt types, the core snapshots the fields
//! it needs into `ContainerHandle` / `ApplicationHandle` once per cycle.

use std::fmt;

use uuid::Uuid;

use crate::resource::Resource;

/// Stable identifier for a running container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub Uuid);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container-{}", self.0)
    }
}

/// Stable identifier for a scheduler application attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(pub Uuid);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

/// Capability set the embedding scheduler's running-container type must
/// expose. The core never stores `&dyn RmContainer`; it snapshots these
/// fields into a [`ContainerHandle`] once, at candidate-scan time.
pub trait RmContainer {
    fn container_id(&self) -> ContainerId;
    fn queue(&self) -> &str;
    fn user(&self) -> &str;
    fn allocated_resource(&self) -> &Resource;
    fn is_am_container(&self) -> bool;
}

/// Owned snapshot of an [`RmContainer`], cheap to clone and store in a
/// mark record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub container_id: ContainerId,
    pub queue: String,
    pub user: String,
    pub allocated: Resource,
    pub is_am_container: bool,
}

impl<C: RmContainer + ?Sized> From<&C> for ContainerHandle {
    fn from(c: &C) -> Self {
        Self {
            container_id: c.container_id(),
            queue: c.queue().to_string(),
            user: c.user().to_string(),
            allocated: c.allocated_resource().clone(),
            is_am_container: c.is_am_container(),
        }
    }
}

/// Capability set the embedding scheduler's application-attempt type must
/// expose.
pub trait SchedulerApplicationAttempt {
    fn application_attempt_id(&self) -> AttemptId;
    fn queue(&self) -> &str;
    fn user(&self) -> &str;
}

/// Owned snapshot of a [`SchedulerApplicationAttempt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationHandle {
    pub attempt_id: AttemptId,
    pub queue: String,
    pub user: String,
}

impl<A: SchedulerApplicationAttempt + ?Sized> From<&A> for ApplicationHandle {
    fn from(a: &A) -> Self {
        Self {
            attempt_id: a.application_attempt_id(),
            queue: a.queue().to_string(),
            user: a.user().to_string(),
        }
    }
}

/// A resource name is either the wildcard `Any` bucket or a specific
/// node/rack label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceName {
    Any,
    Label(String),
}

impl ResourceName {
    pub fn is_any(&self) -> bool {
        matches!(self, ResourceName::Any)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceName::Any => write!(f, "*"),
            ResourceName::Label(l) => write!(f, "{l}"),
        }
    }
}

/// Input boundary object: what a demanding application is asking for.
/// Two requirements are equal iff all four fields are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequirement {
    pub application: ApplicationHandle,
    pub priority: i32,
    pub resource_name: ResourceName,
    pub required: Resource,
}

/// Periodic update fed in by the (external) policy that computes ideal and
/// preemptable amounts per queue-partition. Sign convention: a positive
/// `preemptable` marks the queue-partition as a debtor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreemptableQueuePartitionEntity {
    pub queue: String,
    pub partition: String,
    pub ideal: Resource,
    pub preemptable: Resource,
}

/// Classification of a (demander, candidate) pair. Only [`PreemptionType::DifferentQueue`]
/// is acted on by the coordinator; the other two variants are preserved as
/// the design hook for intra-queue preemption (never collapse this enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreemptionType {
    DifferentQueue,
    SameQueueDifferentUser,
    SameQueueSameUser,
}

/// Classify a candidate container against the demanding application.
pub fn classify(
    requester_queue: &str,
    requester_user: &str,
    candidate_queue: &str,
    candidate_user: &str,
) -> PreemptionType {
    if requester_queue != candidate_queue {
        PreemptionType::DifferentQueue
    } else if requester_user != candidate_user {
        PreemptionType::SameQueueDifferentUser
    } else {
        PreemptionType::SameQueueSameUser
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_different_queue() {
        assert_eq!(
            classify("A", "alice", "B", "bob"),
            PreemptionType::DifferentQueue
        );
        assert_eq!(
            classify("A", "alice", "B", "alice"),
            PreemptionType::DifferentQueue
        );
    }

    #[test]
    fn classify_same_queue_different_user() {
        assert_eq!(
            classify("A", "alice", "A", "bob"),
            PreemptionType::SameQueueDifferentUser
        );
    }

    #[test]
    fn classify_same_queue_same_user() {
        assert_eq!(
            classify("A", "alice", "A", "alice"),
            PreemptionType::SameQueueSameUser
        );
    }

    #[test]
    fn container_handle_snapshots_from_trait_impl() {
        struct Fake {
            id: ContainerId,
            allocated: Resource,
        }
        impl RmContainer for Fake {
            fn container_id(&self) -> ContainerId {
                self.id
            }
            fn queue(&self) -> &str {
                "B"
            }
            fn user(&self) -> &str {
                "bob"
            }
            fn allocated_resource(&self) -> &Resource {
                &self.allocated
            }
            fn is_am_container(&self) -> bool {
                false
            }
        }

        let fake = Fake {
            id: ContainerId(Uuid::nil()),
            allocated: Resource::new(1, 1),
        };
        let handle = ContainerHandle::from(&fake);
        assert_eq!(handle.queue, "B");
        assert_eq!(handle.allocated, Resource::new(1, 1));
        assert!(!handle.is_am_container);
    }
}
