/*! Resource Usage Trackers

These structures are responsible for keeping track of how resources are used
within a synchronization scope, detecting usages that conflict, and keeping
the used resources alive until the trackers die.

## General Architecture

Trackers store resource state in flat vectors indexed by a per-type
[`TrackerIndex`]. Tracker indices are handed out densely by a
[`SharedTrackerIndexAllocator`] owned by the device and recycled when the
resource dies, so the vectors stay small even when ids are not.

Trackers do not always contain every resource. A bit vector records which
resources a tracker owns, so iterating a sparse tracker skips empty blocks
of 64 indices with a single comparison.

## Use Case

Trackers are split into three use cases: Bind Group, Usage Scope, and the
full per-command-buffer Tracker.

Bind Group states are just a list of resources and how they are used.
Textures are used via a view (a selector and aspects) and a usage type.
Buffers by just a usage type.

Usage Scope trackers represent a single usage scope: a whole render pass,
a single compute dispatch, or a single encoder-level command. When a use is
added to a usage scope it is merged with all other uses of that resource in
that scope. If there is a usage conflict, merging fails and an error is
reported.

The full Tracker remembers every buffer and texture a command buffer touched,
so queue submission can reject command buffers using destroyed or mapped
resources.

## Merge rule

The uses of one resource (or texture subresource) within a scope are OR-ed
together. The result is valid if it contains no exclusive use, or if it is
exactly one use:

```text
any(inclusive) XOR one(exclusive)
```

Buffers are tracked as a whole. Textures are tracked per mip level, per
aspect plane and per array layer range.
*/

mod buffer;
mod layers;
mod metadata;
mod stateless;
mod texture;

use crate::{conv, resource::ResourceErrorIdent};

use parking_lot::Mutex;
use thiserror::Error;

use std::{fmt, ops, sync::Arc};

pub(crate) use buffer::{BufferBindGroupState, BufferUsageScope};
use metadata::ResourceMetadata;
pub(crate) use stateless::StatelessTracker;
pub(crate) use texture::{TextureBindGroupState, TextureSelector, TextureUsageScope};

/// A dense index for a resource within its type's trackers.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct TrackerIndex(u32);

impl TrackerIndex {
    pub(crate) fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// wgv-core keeps track of resources in trackers indexed by
/// `TrackerIndex`, not by `Id`, so that the tables stay dense even though
/// ids of several devices share one registry.
#[derive(Debug)]
struct TrackerIndexAllocator {
    unused: Vec<TrackerIndex>,
    next_index: TrackerIndex,
}

impl TrackerIndexAllocator {
    fn alloc(&mut self) -> TrackerIndex {
        if let Some(index) = self.unused.pop() {
            return index;
        }

        let index = self.next_index;
        self.next_index.0 += 1;

        index
    }

    fn free(&mut self, index: TrackerIndex) {
        self.unused.push(index);
    }
}

#[derive(Debug)]
pub(crate) struct SharedTrackerIndexAllocator {
    inner: Mutex<TrackerIndexAllocator>,
}

impl SharedTrackerIndexAllocator {
    pub(crate) fn new() -> Self {
        SharedTrackerIndexAllocator {
            inner: Mutex::new(TrackerIndexAllocator {
                unused: Vec::new(),
                next_index: TrackerIndex(0),
            }),
        }
    }

    pub(crate) fn alloc(&self) -> TrackerIndex {
        self.inner.lock().alloc()
    }

    pub(crate) fn free(&self, index: TrackerIndex) {
        self.inner.lock().free(index);
    }
}

#[derive(Debug)]
pub(crate) struct TrackerIndexAllocators {
    pub buffers: Arc<SharedTrackerIndexAllocator>,
    pub textures: Arc<SharedTrackerIndexAllocator>,
}

impl TrackerIndexAllocators {
    pub(crate) fn new() -> Self {
        TrackerIndexAllocators {
            buffers: Arc::new(SharedTrackerIndexAllocator::new()),
            textures: Arc::new(SharedTrackerIndexAllocator::new()),
        }
    }
}

bitflags::bitflags! {
    /// Similar to `wgt::BufferUsages` but for internal use.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BufferUses: u16 {
        /// The argument to a read-only mapping.
        const MAP_READ = 1 << 0;
        /// The argument to a write-only mapping.
        const MAP_WRITE = 1 << 1;
        /// The source of a hardware copy.
        const COPY_SRC = 1 << 2;
        /// The destination of a hardware copy.
        const COPY_DST = 1 << 3;
        /// The index buffer used for drawing.
        const INDEX = 1 << 4;
        /// A vertex buffer used for drawing.
        const VERTEX = 1 << 5;
        /// A uniform buffer bound in a bind group.
        const UNIFORM = 1 << 6;
        /// A read-only storage buffer used in a bind group.
        const STORAGE_READ_ONLY = 1 << 7;
        /// A read-write buffer used in a bind group.
        const STORAGE_READ_WRITE = 1 << 8;
        /// The indirect or count buffer in an indirect draw or dispatch.
        const INDIRECT = 1 << 9;

        /// The combination of states that a buffer may be in _at the same time_.
        const INCLUSIVE = Self::MAP_READ.bits() | Self::COPY_SRC.bits() |
            Self::INDEX.bits() | Self::VERTEX.bits() | Self::UNIFORM.bits() |
            Self::STORAGE_READ_ONLY.bits() | Self::INDIRECT.bits();
        /// The combination of states that a buffer must exclusively be in.
        const EXCLUSIVE = Self::MAP_WRITE.bits() | Self::COPY_DST.bits() | Self::STORAGE_READ_WRITE.bits();
    }
}

bitflags::bitflags! {
    /// Similar to `wgt::TextureUsages` but for internal use.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TextureUses: u16 {
        /// The source of a hardware copy.
        const COPY_SRC = 1 << 0;
        /// The destination of a hardware copy.
        const COPY_DST = 1 << 1;
        /// Read-only sampled or fetched resource.
        const RESOURCE = 1 << 2;
        /// The color target of a renderpass.
        const COLOR_TARGET = 1 << 3;
        /// Read-only depth stencil usage.
        const DEPTH_STENCIL_READ = 1 << 4;
        /// Read-write depth stencil usage
        const DEPTH_STENCIL_WRITE = 1 << 5;
        /// Read-only storage texture usage.
        const STORAGE_READ_ONLY = 1 << 6;
        /// Write-only storage texture usage.
        const STORAGE_WRITE_ONLY = 1 << 7;
        /// Read-write storage texture usage.
        const STORAGE_READ_WRITE = 1 << 8;

        /// The combination of states that a texture may be in _at the same time_.
        const INCLUSIVE = Self::COPY_SRC.bits() | Self::RESOURCE.bits() |
            Self::DEPTH_STENCIL_READ.bits() | Self::STORAGE_READ_ONLY.bits();
        /// The combination of states that a texture must exclusively be in.
        const EXCLUSIVE = Self::COPY_DST.bits() | Self::COLOR_TARGET.bits() |
            Self::DEPTH_STENCIL_WRITE.bits() | Self::STORAGE_WRITE_ONLY.bits() |
            Self::STORAGE_READ_WRITE.bits();
    }
}

/// The uses that a resource or subresource can be in.
pub(crate) trait ResourceUses:
    fmt::Debug + ops::BitAnd<Output = Self> + ops::BitOr<Output = Self> + PartialEq + Sized + Copy
{
    /// All flags that are exclusive.
    const EXCLUSIVE: Self;

    /// Turn the resource into a pile of bits.
    fn raw_bits(self) -> u16;
    /// Returns true if any of the uses are exclusive.
    fn any_exclusive(self) -> bool;
}

impl ResourceUses for BufferUses {
    const EXCLUSIVE: Self = Self::EXCLUSIVE;

    fn raw_bits(self) -> u16 {
        self.bits()
    }

    fn any_exclusive(self) -> bool {
        self.intersects(Self::EXCLUSIVE)
    }
}

impl ResourceUses for TextureUses {
    const EXCLUSIVE: Self = Self::EXCLUSIVE;

    fn raw_bits(self) -> u16 {
        self.bits()
    }

    fn any_exclusive(self) -> bool {
        self.intersects(Self::EXCLUSIVE)
    }
}

/// Returns true if the given states violates the usage scope rule
/// of any(inclusive) XOR one(exclusive)
fn invalid_resource_state<T: ResourceUses>(state: T) -> bool {
    // Is power of two also means "is one bit set". We check for this as if
    // we're in any exclusive state, we must only be in a single state.
    state.any_exclusive() && !conv::is_power_of_two_u16(state.raw_bits())
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum UsageConflict {
    #[error("Attempted to use {res} with {invalid_use}.")]
    Buffer {
        res: ResourceErrorIdent,
        invalid_use: InvalidUse<BufferUses>,
    },
    #[error(
        "Attempted to use {res} (mips {mip_levels:?} layers {array_layers:?}) with {invalid_use}."
    )]
    Texture {
        res: ResourceErrorIdent,
        mip_levels: ops::Range<u32>,
        array_layers: ops::Range<u32>,
        invalid_use: InvalidUse<TextureUses>,
    },
}

impl UsageConflict {
    fn from_buffer(res: ResourceErrorIdent, current_state: BufferUses, new_state: BufferUses) -> Self {
        Self::Buffer {
            res,
            invalid_use: InvalidUse {
                current_state,
                new_state,
            },
        }
    }

    fn from_texture(
        res: ResourceErrorIdent,
        selector: TextureSelector,
        current_state: TextureUses,
        new_state: TextureUses,
    ) -> Self {
        Self::Texture {
            res,
            mip_levels: selector.mips,
            array_layers: selector.layers,
            invalid_use: InvalidUse {
                current_state,
                new_state,
            },
        }
    }
}

/// Pretty print helper that shows helpful descriptions of a conflicting usage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidUse<T> {
    current_state: T,
    new_state: T,
}

impl<T: ResourceUses> fmt::Display for InvalidUse<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current_state;
        let new = self.new_state;

        let current_exclusive = current & T::EXCLUSIVE;
        let new_exclusive = new & T::EXCLUSIVE;

        let exclusive = current_exclusive | new_exclusive;

        // The text starts with "attempted to use X resource with {self}"
        write!(
            f,
            "conflicting usages. Current usage {current:?} and new usage {new:?}. \
            {exclusive:?} is an exclusive usage and cannot be used with any other \
            usages within the usage scope (renderpass or compute dispatch)"
        )
    }
}

/// All the usages that a bind group contains. The uses are not deduplicated in any way
/// and may include conflicting uses. Conflicts only matter once the bind group is
/// merged into a usage scope.
#[derive(Debug, Default)]
pub(crate) struct BindGroupStates {
    pub buffers: BufferBindGroupState,
    pub views: TextureBindGroupState,
}

impl BindGroupStates {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A usage scope tracker. Only needs to store stateful resources as stateless
/// resources cannot possibly have a usage conflict.
#[derive(Debug)]
pub(crate) struct UsageScope {
    pub buffers: BufferUsageScope,
    pub textures: TextureUsageScope,
}

impl UsageScope {
    pub fn new() -> Self {
        Self {
            buffers: BufferUsageScope::new(),
            textures: TextureUsageScope::new(),
        }
    }

    /// Merge the inner contents of a bind group into the usage scope.
    ///
    /// Only stateful things are merged in here, all other resources are owned
    /// indirectly by the bind group.
    pub fn merge_bind_group(&mut self, bind_group: &BindGroupStates) -> Result<(), UsageConflict> {
        self.buffers.merge_bind_group(&bind_group.buffers)?;
        self.textures.merge_bind_group(&bind_group.views)?;

        Ok(())
    }

    /// Merge every usage of another scope, such as the one a render bundle
    /// recorded, into this one.
    pub fn merge_usage_scope(&mut self, scope: &Self) -> Result<(), UsageConflict> {
        self.buffers.merge_usage_scope(&scope.buffers)?;
        self.textures.merge_usage_scope(&scope.textures)?;

        Ok(())
    }
}

/// Every buffer and texture a command buffer touched.
#[derive(Debug)]
pub(crate) struct Tracker {
    pub buffers: StatelessTracker<crate::resource::Buffer>,
    pub textures: StatelessTracker<crate::resource::Texture>,
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            buffers: StatelessTracker::new(),
            textures: StatelessTracker::new(),
        }
    }

    /// Adopt every resource of a finished usage scope.
    pub fn add_from_scope(&mut self, scope: &UsageScope) {
        for buffer in scope.buffers.used_resources() {
            self.buffers.insert_single(buffer);
        }
        for texture in scope.textures.used_resources() {
            self.textures.insert_single(texture);
        }
    }
}
