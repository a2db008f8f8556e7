//! Stateless Trackers
//!
//! Stateless trackers don't have any state, so make no
//! distinction between a usage scope and a full tracker.

use std::sync::Arc;

use crate::{resource::Trackable, track::ResourceMetadata};

/// Stores all resource state within a command buffer.
#[derive(Debug)]
pub(crate) struct StatelessTracker<T: Trackable> {
    metadata: ResourceMetadata<Arc<T>>,
}

impl<T: Trackable> StatelessTracker<T> {
    pub fn new() -> Self {
        Self {
            metadata: ResourceMetadata::new(),
        }
    }

    /// Returns a list of all resources tracked.
    pub fn used_resources(&self) -> impl Iterator<Item = Arc<T>> + '_ {
        self.metadata.owned_resources()
    }

    /// Inserts a single resource into the resource tracker.
    ///
    /// If the resource already exists in the tracker, it will be overwritten.
    pub fn insert_single(&mut self, resource: Arc<T>) -> &Arc<T> {
        let index = resource.tracker_index().as_usize();
        self.metadata.insert(index, resource)
    }
}
