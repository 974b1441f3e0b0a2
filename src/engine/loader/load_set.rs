use super::{Payload, ResourceId};
use crate::engine::errors::ResourceFetchFailure;
use std::collections::{BTreeMap, BTreeSet};

/// Aggregate outcome of loading a set of resources.
///
/// Every requested resource lands in exactly one of `succeeded` or `failed`.
/// The set is *settled* once all of them have landed, whatever the outcome:
/// a fully failed set is still a valid, displayable result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadSet {
    requested: BTreeSet<ResourceId>,
    succeeded: BTreeSet<ResourceId>,
    failed: BTreeSet<ResourceId>,
    payloads: BTreeMap<ResourceId, Payload>,
    failures: BTreeMap<ResourceId, ResourceFetchFailure>,
}

impl LoadSet {
    /// New, unsettled set. Duplicate ids collapse.
    pub fn new(requested: impl IntoIterator<Item = ResourceId>) -> Self {
        Self {
            requested: requested.into_iter().collect(),
            ..Default::default()
        }
    }

    /// A set that requested nothing. It is settled from the start.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> &BTreeSet<ResourceId> {
        &self.requested
    }

    pub fn succeeded(&self) -> &BTreeSet<ResourceId> {
        &self.succeeded
    }

    pub fn failed(&self) -> &BTreeSet<ResourceId> {
        &self.failed
    }

    pub fn is_settled(&self) -> bool {
        self.succeeded.len() + self.failed.len() == self.requested.len()
    }

    pub fn payload(&self, id: &ResourceId) -> Option<&Payload> {
        self.payloads.get(id)
    }

    pub fn failure(&self, id: &ResourceId) -> Option<&ResourceFetchFailure> {
        self.failures.get(id)
    }

    pub fn is_pending(&self, id: &ResourceId) -> bool {
        self.requested.contains(id) && !self.succeeded.contains(id) && !self.failed.contains(id)
    }

    /// Record a success. Returns false for unknown or already recorded ids.
    pub fn record_success(&mut self, id: ResourceId, payload: Payload) -> bool {
        if !self.is_pending(&id) {
            return false;
        }
        self.payloads.insert(id.clone(), payload);
        self.succeeded.insert(id);
        true
    }

    /// Record a failure. Returns false for unknown or already recorded ids.
    pub fn record_failure(&mut self, id: ResourceId, failure: ResourceFetchFailure) -> bool {
        if !self.is_pending(&id) {
            return false;
        }
        self.failures.insert(id.clone(), failure);
        self.failed.insert(id);
        true
    }
}
