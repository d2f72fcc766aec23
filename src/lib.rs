//! Preemption decision engine for a capacity-based cluster scheduler.
//!
//! Jobs belong to hierarchical queues, each queue holding a configured
//! capacity share per node partition. When one queue's demand exceeds its
//! share while another over-consumes, the scheduler reclaims resources by
//! marking containers on the over-using queue for eventual kill. This crate
//! is the decision core: it does not compute ideal/preemptable amounts,
//! order candidates, or deliver kill signals — those are external
//! collaborators fed in by the embedding scheduler.
//!
//! The four cooperating components, leaves-first:
//! - [`measure`] — the per-(queue, partition) debtor/creditor bookkeeping.
//! - [`relationship`] — the container-mark / demanding-app indices.
//! - [`selection`] — the dry-run candidate-scan algorithm.
//! - [`coordinator`] — the façade that ties the above together behind one
//!   readers-writer lock and exposes the kill-ready set.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logger;
pub mod measure;
pub mod metrics;
pub mod queue_usage;
pub mod relationship;
pub mod resource;
pub mod selection;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PreemptionConfig;
pub use coordinator::Coordinator;
pub use error::PreemptionError;
pub use resource::{DominantResourceCalculator, Resource, ResourceCalculator};
pub use types::{
    classify, ApplicationHandle, AttemptId, ContainerHandle, ContainerId, PreemptableQueuePartitionEntity,
    PreemptionType, ResourceName, ResourceRequirement, RmContainer, SchedulerApplicationAttempt,
};
