//! Relationship Store: the container-id → mark index and the
//! attempt-id → demanding-app index, kept mutually consistent.
//!
//! Grounded on the teacher's `session/model.rs` (several small structs
//! sharing one file, one owning collections of the other) and
//! `session/cache.rs`'s saturating `drr_add`/`drr_charge` pattern for the
//! symmetric add/subtract bookkeeping in [`DemandingApp`]'s resource
//! buckets.

use std::collections::{HashMap, HashSet};

use crate::resource::Resource;
use crate::types::{ApplicationHandle, AttemptId, ContainerHandle, ContainerId, PreemptionType, ResourceName, ResourceRequirement};

/// Mark record for one running container.
#[derive(Debug, Clone, PartialEq)]
pub struct ToPreemptContainer {
    pub container: ContainerHandle,
    pub requirement: ResourceRequirement,
    pub start_timestamp: u64,
    pub last_listed_timestamp: u64,
    pub preemption_type: PreemptionType,
    pub container_queue_key: String,
    pub demanding_queue_key: String,
}

/// One demanding application's aggregated preemption footprint.
#[derive(Debug, Clone)]
pub struct DemandingApp {
    pub attempt_id: AttemptId,
    pub application: ApplicationHandle,
    pub to_preempt_containers: HashSet<ContainerId>,
    to_preempt_resources: HashMap<i32, HashMap<ResourceName, Resource>>,
    container_to_specific_bucket: HashMap<ContainerId, ResourceName>,
}

impl DemandingApp {
    fn new(application: ApplicationHandle, attempt_id: AttemptId) -> Self {
        Self {
            attempt_id,
            application,
            to_preempt_containers: HashSet::new(),
            to_preempt_resources: HashMap::new(),
            container_to_specific_bucket: HashMap::new(),
        }
    }

    fn add_to_bucket(&mut self, priority: i32, resource_name: ResourceName, delta: &Resource) {
        let bucket = self
            .to_preempt_resources
            .entry(priority)
            .or_default()
            .entry(resource_name)
            .or_insert_with(Resource::zero);
        *bucket = bucket.add(delta);
    }

    fn sub_from_bucket(&mut self, priority: i32, resource_name: ResourceName, delta: &Resource) {
        if let Some(by_name) = self.to_preempt_resources.get_mut(&priority) {
            if let Some(bucket) = by_name.get_mut(&resource_name) {
                *bucket = bucket.sub(delta);
            }
        }
    }

    pub fn resources_marked_for(&self, priority: i32, resource_name: &ResourceName) -> Resource {
        self.to_preempt_resources
            .get(&priority)
            .and_then(|by_name| by_name.get(resource_name))
            .cloned()
            .unwrap_or_else(Resource::zero)
    }
}

/// The container-index / demander-index pair, kept consistent per §4.2.
#[derive(Debug, Default)]
pub struct RelationshipStore {
    marks: HashMap<ContainerId, ToPreemptContainer>,
    demanders: HashMap<AttemptId, DemandingApp>,
}

impl RelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            marks: HashMap::new(),
            demanders: HashMap::with_capacity(capacity),
        }
    }

    pub fn get_mark(&self, container_id: ContainerId) -> Option<&ToPreemptContainer> {
        self.marks.get(&container_id)
    }

    pub fn get_mark_mut(&mut self, container_id: ContainerId) -> Option<&mut ToPreemptContainer> {
        self.marks.get_mut(&container_id)
    }

    pub fn marks_iter(&self) -> impl Iterator<Item = (&ContainerId, &ToPreemptContainer)> {
        self.marks.iter()
    }

    /// Insert a fresh or replacement mark (I4, I6, I7). Callers decide
    /// `start_timestamp` (either `now`, for a new mark, or the inherited
    /// value of a replaced one).
    #[tracing::instrument(skip(self, container, requirement), target = "relationship_store")]
    pub fn add_mark(
        &mut self,
        container: ContainerHandle,
        requirement: ResourceRequirement,
        preemption_type: PreemptionType,
        container_queue_key: String,
        demanding_queue_key: String,
        start_timestamp: u64,
        now_ms: u64,
    ) {
        let container_id = container.container_id;
        let attempt_id = requirement.application.attempt_id;
        let priority = requirement.priority;
        let resource_name = requirement.resource_name.clone();
        let allocated = container.allocated.clone();

        let demander = self
            .demanders
            .entry(attempt_id)
            .or_insert_with(|| DemandingApp::new(requirement.application.clone(), attempt_id));
        demander.to_preempt_containers.insert(container_id);
        demander.add_to_bucket(priority, ResourceName::Any, &allocated);
        if !resource_name.is_any() {
            demander.add_to_bucket(priority, resource_name.clone(), &allocated);
            demander.container_to_specific_bucket.insert(container_id, resource_name);
        }

        self.marks.insert(
            container_id,
            ToPreemptContainer {
                container,
                requirement,
                start_timestamp,
                last_listed_timestamp: now_ms,
                preemption_type,
                container_queue_key,
                demanding_queue_key,
            },
        );
    }

    /// Remove one mark. Idempotent: an unknown id is a silent no-op (§4.2
    /// failure semantics). Returns the removed mark so the caller (the
    /// coordinator) can subtract its allocated resource from the two
    /// back-pointed measures.
    #[tracing::instrument(skip(self), target = "relationship_store")]
    pub fn unmark_container(&mut self, container_id: ContainerId) -> Option<ToPreemptContainer> {
        let mark = self.marks.remove(&container_id)?;
        let attempt_id = mark.requirement.application.attempt_id;
        if let Some(demander) = self.demanders.get_mut(&attempt_id) {
            demander.to_preempt_containers.remove(&container_id);
            let priority = mark.requirement.priority;
            let allocated = &mark.container.allocated;
            demander.sub_from_bucket(priority, ResourceName::Any, allocated);
            if let Some(specific) = demander.container_to_specific_bucket.remove(&container_id) {
                demander.sub_from_bucket(priority, specific, allocated);
            }
        }
        Some(mark)
    }

    /// Remove a demanding app and every mark it owns. Idempotent on an
    /// unknown attempt id.
    #[tracing::instrument(skip(self), target = "relationship_store")]
    pub fn unmark_demanding_app(&mut self, attempt_id: AttemptId) -> Vec<ToPreemptContainer> {
        let Some(demander) = self.demanders.remove(&attempt_id) else {
            return Vec::new();
        };
        demander
            .to_preempt_containers
            .iter()
            .filter_map(|id| self.marks.remove(id))
            .collect()
    }

    pub fn resources_marked_for(&self, attempt_id: AttemptId, priority: i32, resource_name: &ResourceName) -> Resource {
        self.demanders
            .get(&attempt_id)
            .map(|d| d.resources_marked_for(priority, resource_name))
            .unwrap_or_else(Resource::zero)
    }
}
