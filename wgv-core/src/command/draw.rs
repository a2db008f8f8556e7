/*! Draw structures - shared between render passes and bundles.
!*/

use std::sync::Arc;

use thiserror::Error;
use wgt::{BufferAddress, BufferSize, Color};

use crate::{
    binding_model::{BindError, BindGroup, LateMinBufferBindingSizeMismatch},
    command::{bind::BinderError, RenderBundle},
    device::{DeviceError, MissingFeatures, RenderPassCompatibilityError},
    error::{ErrorType, WebGpuError},
    pipeline::RenderPipeline,
    resource::{
        Buffer, DestroyedResourceError, InvalidResourceError, Labeled, MissingBufferUsageError,
        ResourceErrorIdent,
    },
    track::UsageConflict,
};

/// Error validating a draw call.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum DrawError {
    #[error("Render pipeline must be set")]
    MissingPipeline,
    #[error("Each current vertex buffer layout must have a bound buffer. The layout of {pipeline} requires a buffer in slot {index}")]
    MissingVertexBuffer {
        pipeline: ResourceErrorIdent,
        index: u32,
    },
    #[error("Index buffer must be set")]
    MissingIndexBuffer,
    #[error(transparent)]
    IncompatibleBindGroup(#[from] BinderError),
    #[error("Vertex {last_vertex} extends beyond limit {vertex_limit} imposed by the buffer in slot {slot}. Did you bind the correct `Vertex` step-rate vertex buffer?")]
    VertexBeyondLimit {
        last_vertex: u64,
        vertex_limit: u64,
        slot: u32,
    },
    #[error("Instance {last_instance} extends beyond limit {instance_limit} imposed by the buffer in slot {slot}. Did you bind the correct `Instance` step-rate vertex buffer?")]
    InstanceBeyondLimit {
        last_instance: u64,
        instance_limit: u64,
        slot: u32,
    },
    #[error("Index {last_index} extends beyond limit {index_limit}. Did you bind the correct index buffer?")]
    IndexBeyondLimit { last_index: u64, index_limit: u64 },
    #[error(
        "Pipeline index format ({pipeline:?}) and buffer index format ({buffer:?}) do not match"
    )]
    UnmatchedIndexFormats {
        pipeline: wgt::IndexFormat,
        buffer: wgt::IndexFormat,
    },
    #[error(transparent)]
    BindingSizeTooSmall(#[from] LateMinBufferBindingSizeMismatch),
}

impl WebGpuError for DrawError {
    fn webgpu_error_type(&self) -> ErrorType {
        ErrorType::Validation
    }
}

/// Error encountered when encoding a render command.
/// This is the shared error set between render bundles and passes.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum RenderCommandError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    InvalidResource(#[from] InvalidResourceError),
    #[error(transparent)]
    DestroyedResource(#[from] DestroyedResourceError),
    #[error(transparent)]
    MissingFeatures(#[from] MissingFeatures),
    #[error("Bind group index {index} is greater than the device's requested `max_bind_groups` limit {max}")]
    BindGroupIndexOutOfRange { index: u32, max: u32 },
    #[error("Vertex buffer index {index} is greater than the device's requested `max_vertex_buffers` limit {max}")]
    VertexBufferIndexOutOfRange { index: u32, max: u32 },
    #[error("An unset vertex buffer slot {slot} must have offset 0 and no size, got offset {offset} and size {size:?}")]
    UnsetVertexBufferRange {
        slot: u32,
        offset: BufferAddress,
        size: Option<BufferSize>,
    },
    #[error("Offset {offset} of the {buffer} must be a multiple of {alignment}")]
    UnalignedBufferOffset {
        buffer: ResourceErrorIdent,
        offset: BufferAddress,
        alignment: BufferAddress,
    },
    #[error("Range {offset}+{size:?} overruns the {buffer} of size {buffer_size}")]
    BufferRangeOutOfBounds {
        buffer: ResourceErrorIdent,
        offset: BufferAddress,
        size: Option<BufferSize>,
        buffer_size: BufferAddress,
    },
    #[error(transparent)]
    IncompatiblePipelineTargets(#[from] RenderPassCompatibilityError),
    #[error("{0} writes to depth, while the pass has read-only depth access")]
    IncompatibleDepthAccess(ResourceErrorIdent),
    #[error("{0} writes to stencil, while the pass has read-only stencil access")]
    IncompatibleStencilAccess(ResourceErrorIdent),
    #[error(transparent)]
    UsageConflict(#[from] UsageConflict),
    #[error(transparent)]
    MissingBufferUsage(#[from] MissingBufferUsageError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error("Viewport {rect:?} is not contained in the {width}x{height} attachments, or has a negative size")]
    InvalidViewportRect { rect: Rect<f32>, width: u32, height: u32 },
    #[error("Viewport depth range {min}..{max} is not within 0..1")]
    InvalidViewportDepth { min: f32, max: f32 },
    #[error("Scissor {rect:?} is not contained in the {width}x{height} attachments")]
    InvalidScissorRect { rect: Rect<u32>, width: u32, height: u32 },
    #[error("Indirect buffer offset {0:?} is not a multiple of 4")]
    UnalignedIndirectBufferOffset(BufferAddress),
    #[error("Indirect draw uses bytes {offset}..{end_offset} {} which overruns indirect buffer of size {buffer_size}",
        count.map_or_else(String::new, |v| format!("(using count {v})")))]
    IndirectBufferOverrun {
        count: Option<u32>,
        offset: u64,
        end_offset: u64,
        buffer_size: u64,
    },
    #[error("Indirect draw uses bytes {begin_count_offset}..{end_count_offset} which overruns indirect buffer of size {count_buffer_size}")]
    IndirectCountBufferOverrun {
        begin_count_offset: u64,
        end_count_offset: u64,
        count_buffer_size: u64,
    },
}

impl WebGpuError for RenderCommandError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Device(e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect<T> {
    pub x: T,
    pub y: T,
    pub w: T,
    pub h: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrawKind {
    Draw,
    DrawIndirect,
    MultiDrawIndirect,
    MultiDrawIndirectCount,
}

/// A render command with every id resolved.
#[doc(hidden)]
#[derive(Clone, Debug)]
pub enum RenderCommand {
    SetBindGroup {
        index: u32,
        num_dynamic_offsets: usize,
        bind_group: Arc<BindGroup>,
    },
    SetPipeline(Arc<RenderPipeline>),
    SetIndexBuffer {
        buffer: Arc<Buffer>,
        index_format: wgt::IndexFormat,
        offset: BufferAddress,
        size: Option<BufferSize>,
    },
    SetVertexBuffer {
        slot: u32,
        /// `None` unsets the slot.
        buffer: Option<Arc<Buffer>>,
        offset: BufferAddress,
        size: Option<BufferSize>,
    },
    SetBlendConstant(Color),
    SetStencilReference(u32),
    SetViewport {
        rect: Rect<f32>,
        depth_min: f32,
        depth_max: f32,
    },
    SetScissor(Rect<u32>),
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    },
    DrawIndirect {
        buffer: Arc<Buffer>,
        offset: BufferAddress,
        /// Above 1 for the multi-draw flavors.
        count: u32,
        indexed: bool,
    },
    MultiDrawIndirectCount {
        buffer: Arc<Buffer>,
        offset: BufferAddress,
        count_buffer: Arc<Buffer>,
        count_buffer_offset: BufferAddress,
        max_count: u32,
        indexed: bool,
    },
    PushDebugGroup {
        len: usize,
    },
    PopDebugGroup,
    InsertDebugMarker {
        len: usize,
    },
    ExecuteBundle(Arc<RenderBundle>),
}

/// Size in bytes of one set of indirect draw arguments.
pub(super) fn indirect_args_stride(indexed: bool) -> u64 {
    if indexed {
        std::mem::size_of::<wgt::DrawIndexedIndirectArgs>() as u64
    } else {
        std::mem::size_of::<wgt::DrawIndirectArgs>() as u64
    }
}

/// Validates the range `count` sets of draw arguments occupy in `buffer`.
///
/// The end offset is computed with checked arithmetic, so an offset close to
/// `u64::MAX` is rejected rather than wrapping.
pub(super) fn check_indirect_buffer(
    buffer: &Buffer,
    offset: BufferAddress,
    count: u32,
    indexed: bool,
) -> Result<(), RenderCommandError> {
    buffer.check_destroyed()?;
    buffer.check_usage(wgt::BufferUsages::INDIRECT)?;

    if offset % wgt::INDIRECT_OFFSET_ALIGNMENT != 0 {
        return Err(RenderCommandError::UnalignedIndirectBufferOffset(offset));
    }

    let end_offset = indirect_args_stride(indexed)
        .checked_mul(count as u64)
        .and_then(|size| offset.checked_add(size));
    match end_offset {
        Some(end_offset) if end_offset <= buffer.size => Ok(()),
        _ => Err(RenderCommandError::IndirectBufferOverrun {
            count: (count != 1).then_some(count),
            offset,
            end_offset: end_offset.unwrap_or(u64::MAX),
            buffer_size: buffer.size,
        }),
    }
}

/// Validates `size` bytes (or the rest of the buffer) at `offset`, returning
/// the number of bytes bound.
pub(super) fn check_buffer_range(
    buffer: &Buffer,
    offset: BufferAddress,
    size: Option<BufferSize>,
) -> Result<BufferAddress, RenderCommandError> {
    let out_of_bounds = || RenderCommandError::BufferRangeOutOfBounds {
        buffer: buffer.error_ident(),
        offset,
        size,
        buffer_size: buffer.size,
    };
    match size {
        Some(size) => match offset.checked_add(size.get()) {
            Some(end) if end <= buffer.size => Ok(size.get()),
            _ => Err(out_of_bounds()),
        },
        None => buffer.size.checked_sub(offset).ok_or_else(out_of_bounds),
    }
}
