//! Buffer Trackers
//!
//! Buffers are represented by a single state for the whole resource,
//! a 16 bit bitflag of buffer usages. Because there is only ever
//! one subresource, they have no selector.

use std::sync::Arc;

use super::{invalid_resource_state, ResourceMetadata, UsageConflict};
use crate::{
    resource::{Buffer, Labeled, Trackable},
    track::BufferUses,
};

/// Stores all the buffers that a bind group stores.
#[derive(Debug, Default)]
pub(crate) struct BufferBindGroupState {
    buffers: Vec<(Arc<Buffer>, BufferUses)>,
}

impl BufferBindGroupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a list of all buffers tracked. May contain duplicates.
    pub fn used_buffers(&self) -> impl Iterator<Item = &Arc<Buffer>> + '_ {
        self.buffers.iter().map(|(buffer, _)| buffer)
    }

    /// Adds the given resource with the given state.
    pub fn insert_single(&mut self, buffer: Arc<Buffer>, state: BufferUses) {
        self.buffers.push((buffer, state));
    }
}

/// Stores all buffer state within a single usage scope.
#[derive(Debug)]
pub(crate) struct BufferUsageScope {
    state: Vec<BufferUses>,
    metadata: ResourceMetadata<Arc<Buffer>>,
}

impl BufferUsageScope {
    pub fn new() -> Self {
        Self {
            state: Vec::new(),
            metadata: ResourceMetadata::new(),
        }
    }

    /// Returns true if the scope uses no buffer.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Returns a list of all buffers tracked.
    pub fn used_resources(&self) -> impl Iterator<Item = Arc<Buffer>> + '_ {
        self.metadata.owned_resources()
    }

    /// Returns the accumulated usage of the given buffer, if it is tracked.
    pub fn usage_of(&self, buffer: &Buffer) -> Option<BufferUses> {
        let index = buffer.tracker_index().as_usize();
        self.metadata
            .contains(index)
            .then(|| self.state[index])
    }

    /// Merge a single state into the UsageScope.
    ///
    /// If the resulting state is invalid, returns a usage
    /// conflict with the details of the invalid state.
    pub fn merge_single(
        &mut self,
        buffer: &Arc<Buffer>,
        new_state: BufferUses,
    ) -> Result<(), UsageConflict> {
        let index = buffer.tracker_index().as_usize();
        if index >= self.state.len() {
            self.state.resize(index + 1, BufferUses::empty());
        }

        let current_state = if self.metadata.contains(index) {
            self.state[index]
        } else {
            BufferUses::empty()
        };
        let merged_state = current_state | new_state;

        if invalid_resource_state(merged_state) {
            return Err(UsageConflict::from_buffer(
                buffer.error_ident(),
                current_state,
                new_state,
            ));
        }

        log::trace!("\tbuf {index}: merge {current_state:?} + {new_state:?}");

        self.state[index] = merged_state;
        if !self.metadata.contains(index) {
            self.metadata.insert(index, buffer.clone());
        }

        Ok(())
    }

    /// Merge every buffer of a bind group into the scope.
    ///
    /// Every use is merged, including uses a pipeline never reads through.
    pub fn merge_bind_group(&mut self, bind_group: &BufferBindGroupState) -> Result<(), UsageConflict> {
        for &(ref buffer, state) in bind_group.buffers.iter() {
            self.merge_single(buffer, state)?;
        }

        Ok(())
    }

    /// Merge the states of another usage scope into this one.
    pub fn merge_usage_scope(&mut self, scope: &Self) -> Result<(), UsageConflict> {
        for index in scope.metadata.owned_indices() {
            if let Some(buffer) = scope.metadata.get_resource(index) {
                self.merge_single(buffer, scope.state[index])?;
            }
        }

        Ok(())
    }
}
