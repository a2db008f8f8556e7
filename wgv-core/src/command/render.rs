use std::{borrow::Cow, fmt, sync::Arc};

use arrayvec::ArrayVec;
use thiserror::Error;
use wgt::{BufferAddress, BufferSize, Color, DynamicOffset, IndexFormat, TextureFormat};

use crate::{
    binding_model::BindGroup,
    command::{
        bind::Binder,
        draw::{check_buffer_range, check_indirect_buffer},
        BasePass, ColorAttachmentError, CommandBuffer, CommandEncoderError, DebugGroupError,
        DebugScope, DebugStrings, DrawError, DrawKind, MapPassErr, PassErrorScope, Rect,
        RenderBundle, RenderCommand, RenderCommandError,
    },
    device::{
        AttachmentData, Device, DeviceError, RenderPassCompatibilityCheckType, RenderPassContext,
    },
    error::{ErrorType, WebGpuError},
    global::Global,
    id,
    pipeline::{PipelineFlags, RenderPipeline, VertexStep},
    resource::{
        Buffer, DestroyedResourceError, FormatAspects, InvalidResourceError, Labeled,
        ParentDevice, TextureView, TextureViewNotRenderableReason,
    },
    track::{BufferUses, TextureUses, Tracker, UsageConflict, UsageScope},
    Label,
};

/// Operations to perform on one aspect of the depth/stencil attachment.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassChannel<V> {
    /// Must be `None` when the aspect is read-only or absent from the format,
    /// and set otherwise.
    pub load_op: Option<wgt::LoadOp<V>>,
    /// Same rules as `load_op`.
    pub store_op: Option<wgt::StoreOp>,
    /// The aspect is only read during the pass.
    pub read_only: bool,
}

/// Describes a color attachment to a render pass.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderPassColorAttachment {
    /// The view to use as an attachment.
    pub view: id::TextureViewId,
    /// The view that will receive the resolved output if multisampling is used.
    pub resolve_target: Option<id::TextureViewId>,
    pub load_op: wgt::LoadOp<Color>,
    pub store_op: wgt::StoreOp,
}

#[derive(Debug)]
struct ArcRenderPassColorAttachment {
    view: Arc<TextureView>,
    resolve_target: Option<Arc<TextureView>>,
}

/// Describes a depth/stencil attachment to a render pass.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderPassDepthStencilAttachment {
    /// The view to use as an attachment.
    pub view: id::TextureViewId,
    /// What operations will be performed on the depth part of the attachment.
    pub depth: PassChannel<f32>,
    /// What operations will be performed on the stencil part of the attachment.
    pub stencil: PassChannel<u32>,
}

#[derive(Debug)]
struct ArcRenderPassDepthStencilAttachment {
    view: Arc<TextureView>,
    depth: PassChannel<f32>,
    stencil: PassChannel<u32>,
}

/// Describes the attachments of a render pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPassDescriptor<'a> {
    pub label: Label<'a>,
    /// The color attachments of the render pass.
    pub color_attachments: Cow<'a, [Option<RenderPassColorAttachment>]>,
    /// The depth and stencil attachment of the render pass, if any.
    pub depth_stencil_attachment: Option<&'a RenderPassDepthStencilAttachment>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentErrorLocation {
    Color { index: usize, resolve: bool },
    Depth,
}

impl fmt::Display for AttachmentErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            AttachmentErrorLocation::Color {
                index,
                resolve: false,
            } => write!(f, "color attachment at index {index}'s texture view"),
            AttachmentErrorLocation::Color {
                index,
                resolve: true,
            } => write!(
                f,
                "color attachment at index {index}'s resolve texture view"
            ),
            AttachmentErrorLocation::Depth => write!(f, "depth attachment's texture view"),
        }
    }
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum AttachmentOpsError {
    #[error("The {aspect} aspect is read-only, so its load and store ops must not be set")]
    OpsOnReadOnly { aspect: &'static str },
    #[error("The {aspect} aspect is written, so its load and store ops must be set")]
    MissingOps { aspect: &'static str },
    #[error("Format {format:?} has no {aspect} aspect, so its load and store ops must not be set")]
    OpsOnMissingAspect {
        aspect: &'static str,
        format: TextureFormat,
    },
}

/// Error encountered when performing a render pass.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum RenderPassErrorInner {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("Parent encoder is invalid")]
    InvalidParentEncoder,
    #[error(transparent)]
    InvalidResource(#[from] InvalidResourceError),
    #[error(transparent)]
    DestroyedResource(#[from] DestroyedResourceError),
    #[error(transparent)]
    ColorAttachment(#[from] ColorAttachmentError),
    #[error("Render pass has no attachments")]
    MissingAttachments,
    #[error("The format of the {location} ({format:?}) is not a color format")]
    InvalidColorAttachmentFormat {
        location: AttachmentErrorLocation,
        format: TextureFormat,
    },
    #[error("The format of the {location} ({format:?}) is not a depth-stencil format")]
    InvalidDepthStencilAttachmentFormat {
        location: AttachmentErrorLocation,
        format: TextureFormat,
    },
    #[error("The {location} is not renderable: {reason}")]
    TextureViewIsNotRenderable {
        location: AttachmentErrorLocation,
        #[source]
        reason: TextureViewNotRenderableReason,
    },
    #[error("Attachments have differing sizes: the {expected_location} has extent {expected_extent:?} but is followed by the {actual_location} which has {actual_extent:?}")]
    AttachmentsDimensionMismatch {
        expected_location: AttachmentErrorLocation,
        expected_extent: wgt::Extent3d,
        actual_location: AttachmentErrorLocation,
        actual_extent: wgt::Extent3d,
    },
    #[error("Attachments have differing sample counts: the {expected_location} has count {expected_samples:?} but is followed by the {actual_location} which has count {actual_samples:?}")]
    AttachmentSampleCountMismatch {
        expected_location: AttachmentErrorLocation,
        expected_samples: u32,
        actual_location: AttachmentErrorLocation,
        actual_samples: u32,
    },
    #[error("The resolve source, {location}, must be multi-sampled (has {src} samples) while the resolve destination must not be multisampled (has {dst} samples)")]
    InvalidResolveSampleCounts {
        location: AttachmentErrorLocation,
        src: u32,
        dst: u32,
    },
    #[error(
        "Resource source, {location}, format ({src:?}) must match the resolve destination format ({dst:?})"
    )]
    MismatchedResolveTextureFormat {
        location: AttachmentErrorLocation,
        src: TextureFormat,
        dst: TextureFormat,
    },
    #[error("The {location} aliases a subresource of another attachment of the pass")]
    AttachmentAliasing { location: AttachmentErrorLocation },
    #[error(transparent)]
    AttachmentOps(#[from] AttachmentOpsError),
    #[error("Render bundle has incompatible read-only flags: bundle has flags depth = {bundle_depth} and stencil = {bundle_stencil}, while the pass has flags depth = {pass_depth} and stencil = {pass_stencil}. Read-only renderpasses are only compatible with read-only bundles for that aspect.")]
    IncompatibleBundleReadOnlyDepthStencil {
        pass_depth: bool,
        pass_stencil: bool,
        bundle_depth: bool,
        bundle_stencil: bool,
    },
    #[error(transparent)]
    UsageConflict(#[from] UsageConflict),
    #[error(transparent)]
    RenderCommand(#[from] RenderCommandError),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    DebugGroup(#[from] DebugGroupError),
}

/// Error encountered when performing a render pass.
#[derive(Clone, Debug, Error)]
#[error("{scope}")]
pub struct RenderPassError {
    pub scope: PassErrorScope,
    #[source]
    pub(super) inner: RenderPassErrorInner,
}

impl WebGpuError for RenderPassError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self.inner {
            RenderPassErrorInner::Device(ref e) => e.webgpu_error_type(),
            RenderPassErrorInner::RenderCommand(ref e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

impl<T, E> MapPassErr<T, RenderPassError> for Result<T, E>
where
    E: Into<RenderPassErrorInner>,
{
    fn map_pass_err(self, scope: PassErrorScope) -> Result<T, RenderPassError> {
        self.map_err(|inner| RenderPassError {
            scope,
            inner: inner.into(),
        })
    }
}

/// The index buffer currently set.
#[derive(Debug, Default)]
struct IndexState {
    format: Option<IndexFormat>,
    limit: u64,
}

impl IndexState {
    fn update(&mut self, format: IndexFormat, bound_size: BufferAddress) {
        self.format = Some(format);
        self.limit = bound_size / format.byte_size();
    }
}

/// How many vertices and instances the bound vertex buffers can feed the
/// current pipeline.
#[derive(Debug)]
struct VertexLimits {
    vertex_limit: u64,
    vertex_limit_slot: u32,
    instance_limit: u64,
    instance_limit_slot: u32,
}

impl VertexLimits {
    fn new(steps: &[VertexStep], bound_sizes: &[Option<BufferAddress>]) -> Self {
        let mut limits = VertexLimits {
            vertex_limit: u64::MAX,
            vertex_limit_slot: 0,
            instance_limit: u64::MAX,
            instance_limit_slot: 0,
        };

        for (slot, (step, size)) in steps.iter().zip(bound_sizes).enumerate() {
            let Some(size) = *size else {
                continue;
            };
            // A slot without attributes reads nothing.
            let limit = if step.last_stride == 0 {
                u64::MAX
            } else if size < step.last_stride {
                0
            } else if step.stride == 0 {
                u64::MAX
            } else {
                (size - step.last_stride) / step.stride + 1
            };

            match step.mode {
                wgt::VertexStepMode::Vertex => {
                    if limit < limits.vertex_limit {
                        limits.vertex_limit = limit;
                        limits.vertex_limit_slot = slot as u32;
                    }
                }
                wgt::VertexStepMode::Instance => {
                    if limit < limits.instance_limit {
                        limits.instance_limit = limit;
                        limits.instance_limit_slot = slot as u32;
                    }
                }
            }
        }

        limits
    }

    fn validate_vertex_limit(&self, first_vertex: u32, vertex_count: u32) -> Result<(), DrawError> {
        let last_vertex = first_vertex as u64 + vertex_count as u64;
        if last_vertex > self.vertex_limit {
            return Err(DrawError::VertexBeyondLimit {
                last_vertex,
                vertex_limit: self.vertex_limit,
                slot: self.vertex_limit_slot,
            });
        }
        Ok(())
    }

    fn validate_instance_limit(
        &self,
        first_instance: u32,
        instance_count: u32,
    ) -> Result<(), DrawError> {
        let last_instance = first_instance as u64 + instance_count as u64;
        if last_instance > self.instance_limit {
            return Err(DrawError::InstanceBeyondLimit {
                last_instance,
                instance_limit: self.instance_limit,
                slot: self.instance_limit_slot,
            });
        }
        Ok(())
    }
}

/// Pipeline, bindings and buffers set while walking the commands of a render
/// pass or bundle. Every resource bound is merged into `scope`.
#[derive(Debug)]
pub(super) struct DrawState<'a> {
    device: &'a Arc<Device>,
    context: &'a RenderPassContext,
    is_depth_read_only: bool,
    is_stencil_read_only: bool,
    scope: &'a mut UsageScope,
    binder: Binder,
    pipeline: Option<Arc<RenderPipeline>>,
    index: IndexState,
    vertex_sizes: [Option<BufferAddress>; wgt::MAX_VERTEX_BUFFERS],
}

impl<'a> DrawState<'a> {
    pub(super) fn new(
        device: &'a Arc<Device>,
        context: &'a RenderPassContext,
        is_depth_read_only: bool,
        is_stencil_read_only: bool,
        scope: &'a mut UsageScope,
    ) -> Self {
        Self {
            device,
            context,
            is_depth_read_only,
            is_stencil_read_only,
            scope,
            binder: Binder::new(),
            pipeline: None,
            index: IndexState::default(),
            vertex_sizes: Default::default(),
        }
    }

    /// Forgets the pipeline and every binding, as executing a bundle does.
    fn reset(&mut self) {
        self.binder.reset();
        self.pipeline = None;
        self.index = IndexState::default();
        self.vertex_sizes = Default::default();
    }

    pub(super) fn set_bind_group(
        &mut self,
        index: u32,
        bind_group: &Arc<BindGroup>,
        offsets: &[DynamicOffset],
    ) -> Result<(), RenderCommandError> {
        let max = self
            .device
            .limits
            .max_bind_groups
            .min(wgt::MAX_BIND_GROUPS as u32);
        if index >= max {
            return Err(RenderCommandError::BindGroupIndexOutOfRange { index, max });
        }
        bind_group.check_destroyed()?;
        bind_group.validate_dynamic_bindings(index, offsets)?;
        // Pass-wide, even if the group is replaced before any draw.
        self.scope.merge_bind_group(&bind_group.used)?;
        self.binder.assign_group(index as usize, bind_group);
        Ok(())
    }

    pub(super) fn set_pipeline(
        &mut self,
        pipeline: Arc<RenderPipeline>,
    ) -> Result<(), RenderCommandError> {
        self.context.check_compatible(
            &pipeline.pass_context,
            pipeline.error_ident(),
            RenderPassCompatibilityCheckType::RenderPipeline,
        )?;

        if pipeline.flags.contains(PipelineFlags::WRITES_DEPTH) && self.is_depth_read_only {
            return Err(RenderCommandError::IncompatibleDepthAccess(
                pipeline.error_ident(),
            ));
        }
        if pipeline.flags.contains(PipelineFlags::WRITES_STENCIL) && self.is_stencil_read_only {
            return Err(RenderCommandError::IncompatibleStencilAccess(
                pipeline.error_ident(),
            ));
        }

        self.binder.change_pipeline_layout(&pipeline.layout);
        self.pipeline = Some(pipeline);
        Ok(())
    }

    pub(super) fn set_index_buffer(
        &mut self,
        buffer: &Arc<Buffer>,
        index_format: IndexFormat,
        offset: BufferAddress,
        size: Option<BufferSize>,
    ) -> Result<(), RenderCommandError> {
        buffer.check_destroyed()?;
        buffer.check_usage(wgt::BufferUsages::INDEX)?;

        if offset % index_format.byte_size() != 0 {
            return Err(RenderCommandError::UnalignedBufferOffset {
                buffer: buffer.error_ident(),
                offset,
                alignment: index_format.byte_size(),
            });
        }
        let bound_size = check_buffer_range(buffer, offset, size)?;

        self.scope.buffers.merge_single(buffer, BufferUses::INDEX)?;
        self.index.update(index_format, bound_size);
        Ok(())
    }

    pub(super) fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: Option<&Arc<Buffer>>,
        offset: BufferAddress,
        size: Option<BufferSize>,
    ) -> Result<(), RenderCommandError> {
        let max = self
            .device
            .limits
            .max_vertex_buffers
            .min(wgt::MAX_VERTEX_BUFFERS as u32);
        if slot >= max {
            return Err(RenderCommandError::VertexBufferIndexOutOfRange { index: slot, max });
        }

        let Some(buffer) = buffer else {
            if offset != 0 || size.is_some() {
                return Err(RenderCommandError::UnsetVertexBufferRange { slot, offset, size });
            }
            self.vertex_sizes[slot as usize] = None;
            return Ok(());
        };

        buffer.check_destroyed()?;
        buffer.check_usage(wgt::BufferUsages::VERTEX)?;

        if offset % wgt::VERTEX_STRIDE_ALIGNMENT != 0 {
            return Err(RenderCommandError::UnalignedBufferOffset {
                buffer: buffer.error_ident(),
                offset,
                alignment: wgt::VERTEX_STRIDE_ALIGNMENT,
            });
        }
        let bound_size = check_buffer_range(buffer, offset, size)?;

        self.scope.buffers.merge_single(buffer, BufferUses::VERTEX)?;
        self.vertex_sizes[slot as usize] = Some(bound_size);
        Ok(())
    }

    fn is_ready(&self, indexed: bool) -> Result<&Arc<RenderPipeline>, DrawError> {
        let pipeline = self.pipeline.as_ref().ok_or(DrawError::MissingPipeline)?;

        self.binder.check_compatibility(&**pipeline)?;
        self.binder
            .check_late_buffer_bindings(&pipeline.late_sized_buffer_groups)?;

        for slot in 0..pipeline.vertex_steps.len() {
            if self.vertex_sizes.get(slot).copied().flatten().is_none() {
                return Err(DrawError::MissingVertexBuffer {
                    pipeline: pipeline.error_ident(),
                    index: slot as u32,
                });
            }
        }

        if indexed {
            let buffer_format = self.index.format.ok_or(DrawError::MissingIndexBuffer)?;
            if let Some(pipeline_format) = pipeline.strip_index_format {
                if pipeline_format != buffer_format {
                    return Err(DrawError::UnmatchedIndexFormats {
                        pipeline: pipeline_format,
                        buffer: buffer_format,
                    });
                }
            }
        }

        Ok(pipeline)
    }

    fn vertex_limits(&self, pipeline: &RenderPipeline) -> VertexLimits {
        VertexLimits::new(&pipeline.vertex_steps, &self.vertex_sizes)
    }

    pub(super) fn draw(
        &self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<(), DrawError> {
        let pipeline = self.is_ready(false)?;
        let limits = self.vertex_limits(pipeline);
        limits.validate_vertex_limit(first_vertex, vertex_count)?;
        limits.validate_instance_limit(first_instance, instance_count)?;
        Ok(())
    }

    pub(super) fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        first_instance: u32,
    ) -> Result<(), DrawError> {
        let pipeline = self.is_ready(true)?;

        let last_index = first_index as u64 + index_count as u64;
        if last_index > self.index.limit {
            return Err(DrawError::IndexBeyondLimit {
                last_index,
                index_limit: self.index.limit,
            });
        }

        self.vertex_limits(pipeline)
            .validate_instance_limit(first_instance, instance_count)?;
        Ok(())
    }

    pub(super) fn draw_indirect<E>(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: BufferAddress,
        count: u32,
        indexed: bool,
    ) -> Result<(), E>
    where
        E: From<DrawError> + From<RenderCommandError>,
    {
        if count != 1 {
            self.device
                .require_features(wgt::Features::MULTI_DRAW_INDIRECT)
                .map_err(RenderCommandError::from)?;
        }

        self.is_ready(indexed)?;
        check_indirect_buffer(buffer, offset, count, indexed)?;

        self.scope
            .buffers
            .merge_single(buffer, BufferUses::INDIRECT)
            .map_err(RenderCommandError::from)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn multi_draw_indirect_count<E>(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: BufferAddress,
        count_buffer: &Arc<Buffer>,
        count_buffer_offset: BufferAddress,
        max_count: u32,
        indexed: bool,
    ) -> Result<(), E>
    where
        E: From<DrawError> + From<RenderCommandError>,
    {
        self.device
            .require_features(wgt::Features::MULTI_DRAW_INDIRECT_COUNT)
            .map_err(RenderCommandError::from)?;

        self.is_ready(indexed)?;
        check_indirect_buffer(buffer, offset, max_count, indexed)?;

        count_buffer
            .check_destroyed()
            .map_err(RenderCommandError::from)?;
        count_buffer
            .check_usage(wgt::BufferUsages::INDIRECT)
            .map_err(RenderCommandError::from)?;
        if count_buffer_offset % wgt::INDIRECT_OFFSET_ALIGNMENT != 0 {
            return Err(
                RenderCommandError::UnalignedIndirectBufferOffset(count_buffer_offset).into(),
            );
        }
        let count_size = std::mem::size_of::<u32>() as u64;
        match count_buffer_offset.checked_add(count_size) {
            Some(end) if end <= count_buffer.size => {}
            end => {
                return Err(RenderCommandError::IndirectCountBufferOverrun {
                    begin_count_offset: count_buffer_offset,
                    end_count_offset: end.unwrap_or(u64::MAX),
                    count_buffer_size: count_buffer.size,
                }
                .into())
            }
        }

        for indirect in [buffer, count_buffer] {
            self.scope
                .buffers
                .merge_single(indirect, BufferUses::INDIRECT)
                .map_err(RenderCommandError::from)?;
        }
        Ok(())
    }

    fn execute_bundle(&mut self, bundle: &Arc<RenderBundle>) -> Result<(), RenderPassErrorInner> {
        self.context
            .check_compatible(
                &bundle.context,
                bundle.error_ident(),
                RenderPassCompatibilityCheckType::RenderBundle,
            )
            .map_err(RenderCommandError::from)?;

        if (self.is_depth_read_only && !bundle.is_depth_read_only)
            || (self.is_stencil_read_only && !bundle.is_stencil_read_only)
        {
            return Err(RenderPassErrorInner::IncompatibleBundleReadOnlyDepthStencil {
                pass_depth: self.is_depth_read_only,
                pass_stencil: self.is_stencil_read_only,
                bundle_depth: bundle.is_depth_read_only,
                bundle_stencil: bundle.is_stencil_read_only,
            });
        }

        bundle.check_destroyed()?;
        self.scope.merge_usage_scope(&bundle.used)?;

        // Bundles leave nothing bound behind them.
        self.reset();
        Ok(())
    }
}

/// What the attachments of a render pass resolved to.
#[derive(Debug)]
struct RenderPassInfo {
    context: RenderPassContext,
    extent: wgt::Extent3d,
    is_depth_read_only: bool,
    is_stencil_read_only: bool,
    /// The pass-wide usage scope, starting with the attachments.
    scope: UsageScope,
}

fn views_overlap(a: &TextureView, b: &TextureView) -> bool {
    Arc::ptr_eq(&a.parent, &b.parent)
        && a.selector.mips.start < b.selector.mips.end
        && b.selector.mips.start < a.selector.mips.end
        && a.selector.layers.start < b.selector.layers.end
        && b.selector.layers.start < a.selector.layers.end
        && a.format_aspects.intersects(b.format_aspects)
}

fn check_channel_ops<V>(
    channel: &PassChannel<V>,
    aspect: &'static str,
    present: bool,
    format: TextureFormat,
) -> Result<(), AttachmentOpsError> {
    let has_ops = channel.load_op.is_some() || channel.store_op.is_some();
    if !present {
        if has_ops {
            return Err(AttachmentOpsError::OpsOnMissingAspect { aspect, format });
        }
    } else if channel.read_only {
        if has_ops {
            return Err(AttachmentOpsError::OpsOnReadOnly { aspect });
        }
    } else if channel.load_op.is_none() || channel.store_op.is_none() {
        return Err(AttachmentOpsError::MissingOps { aspect });
    }
    Ok(())
}

impl RenderPassInfo {
    fn start(
        device: &Arc<Device>,
        color_attachments: &[Option<ArcRenderPassColorAttachment>],
        depth_stencil_attachment: Option<&ArcRenderPassDepthStencilAttachment>,
    ) -> Result<Self, RenderPassErrorInner> {
        let mut extent: Option<(wgt::Extent3d, AttachmentErrorLocation)> = None;
        let mut samples: Option<(u32, AttachmentErrorLocation)> = None;
        let mut attachment_views: Vec<(&Arc<TextureView>, AttachmentErrorLocation)> = Vec::new();

        let mut add_view = |view: &TextureView,
                            location: AttachmentErrorLocation,
                            counts_samples: bool|
         -> Result<(), RenderPassErrorInner> {
            view.same_device(device)?;
            view.check_destroyed()?;

            let render_extent = view
                .render_extent
                .map_err(|reason| RenderPassErrorInner::TextureViewIsNotRenderable {
                    location,
                    reason,
                })?;
            match extent {
                Some((expected_extent, expected_location)) if expected_extent != render_extent => {
                    return Err(RenderPassErrorInner::AttachmentsDimensionMismatch {
                        expected_location,
                        expected_extent,
                        actual_location: location,
                        actual_extent: render_extent,
                    });
                }
                Some(_) => {}
                None => extent = Some((render_extent, location)),
            }

            if counts_samples {
                match samples {
                    Some((expected_samples, expected_location))
                        if expected_samples != view.samples =>
                    {
                        return Err(RenderPassErrorInner::AttachmentSampleCountMismatch {
                            expected_location,
                            expected_samples,
                            actual_location: location,
                            actual_samples: view.samples,
                        });
                    }
                    Some(_) => {}
                    None => samples = Some((view.samples, location)),
                }
            }
            Ok(())
        };

        let mut is_depth_read_only = true;
        let mut is_stencil_read_only = true;
        let mut depth_stencil_format = None;

        if let Some(at) = depth_stencil_attachment {
            let location = AttachmentErrorLocation::Depth;
            let format = at.view.desc.format;
            if !format.is_depth_stencil_format() {
                return Err(RenderPassErrorInner::InvalidDepthStencilAttachmentFormat {
                    location,
                    format,
                });
            }
            add_view(&at.view, location, true)?;

            let has_depth = at.view.format_aspects.contains(FormatAspects::DEPTH);
            let has_stencil = at.view.format_aspects.contains(FormatAspects::STENCIL);
            check_channel_ops(&at.depth, "depth", has_depth, format)?;
            check_channel_ops(&at.stencil, "stencil", has_stencil, format)?;

            is_depth_read_only = !has_depth || at.depth.read_only;
            is_stencil_read_only = !has_stencil || at.stencil.read_only;
            depth_stencil_format = Some(format);
            attachment_views.push((&at.view, location));
        }

        let mut colors = ArrayVec::<Option<TextureFormat>, { wgt::MAX_COLOR_ATTACHMENTS }>::new();
        for (index, attachment) in color_attachments.iter().enumerate() {
            let Some(at) = attachment.as_ref() else {
                colors.push(None);
                continue;
            };
            let location = AttachmentErrorLocation::Color {
                index,
                resolve: false,
            };
            let format = at.view.desc.format;
            if !at.view.format_aspects.contains(FormatAspects::COLOR)
                || !format.is_color_renderable()
            {
                return Err(RenderPassErrorInner::InvalidColorAttachmentFormat { location, format });
            }
            add_view(&at.view, location, true)?;
            attachment_views.push((&at.view, location));
            colors.push(Some(format));

            if let Some(resolve_target) = at.resolve_target.as_ref() {
                let resolve_location = AttachmentErrorLocation::Color {
                    index,
                    resolve: true,
                };
                add_view(resolve_target, resolve_location, false)?;
                if at.view.samples == 1 || resolve_target.samples != 1 {
                    return Err(RenderPassErrorInner::InvalidResolveSampleCounts {
                        location,
                        src: at.view.samples,
                        dst: resolve_target.samples,
                    });
                }
                if resolve_target.desc.format != format {
                    return Err(RenderPassErrorInner::MismatchedResolveTextureFormat {
                        location,
                        src: format,
                        dst: resolve_target.desc.format,
                    });
                }
                attachment_views.push((resolve_target, resolve_location));
            }
        }

        let (Some((extent, _)), Some((sample_count, _))) = (extent, samples) else {
            return Err(RenderPassErrorInner::MissingAttachments);
        };

        for (i, &(view, location)) in attachment_views.iter().enumerate() {
            if attachment_views[..i]
                .iter()
                .any(|&(other, _)| views_overlap(view, other))
            {
                return Err(RenderPassErrorInner::AttachmentAliasing { location });
            }
        }

        let mut scope = UsageScope::new();
        if let Some(at) = depth_stencil_attachment {
            let planes = [
                (FormatAspects::DEPTH, is_depth_read_only),
                (FormatAspects::STENCIL, is_stencil_read_only),
            ];
            for (aspect, read_only) in planes {
                if !at.view.format_aspects.contains(aspect) {
                    continue;
                }
                let usage = if read_only {
                    TextureUses::DEPTH_STENCIL_READ
                } else {
                    TextureUses::DEPTH_STENCIL_WRITE
                };
                scope
                    .textures
                    .merge_single(&at.view.parent, &at.view.selector, aspect, usage)?;
            }
        }
        for at in color_attachments.iter().flatten() {
            scope.textures.merge_view(&at.view, TextureUses::COLOR_TARGET)?;
            if let Some(resolve_target) = at.resolve_target.as_ref() {
                scope
                    .textures
                    .merge_view(resolve_target, TextureUses::COLOR_TARGET)?;
            }
        }

        Ok(RenderPassInfo {
            context: RenderPassContext {
                attachments: AttachmentData {
                    colors,
                    depth_stencil: depth_stencil_format,
                },
                sample_count,
            },
            extent,
            is_depth_read_only,
            is_stencil_read_only,
            scope,
        })
    }
}

/// A render pass being recorded.
///
/// The attachments are validated when the pass begins, the commands when it
/// ends.
#[derive(Debug)]
pub struct RenderPass {
    base: BasePass<RenderCommand, RenderPassError>,
    /// The encoder this pass locked, `None` if the pass could not begin.
    parent: Option<Arc<CommandBuffer>>,
    /// `None` if the attachments were invalid.
    info: Option<RenderPassInfo>,
}

impl RenderPass {
    pub fn label(&self) -> Option<&str> {
        self.base.label.as_deref()
    }

    fn record<F>(&mut self, scope: PassErrorScope, f: F) -> Result<(), RenderPassError>
    where
        F: FnOnce(
            &Arc<Device>,
            &mut BasePass<RenderCommand, RenderPassError>,
        ) -> Result<(), RenderPassErrorInner>,
    {
        if self.base.error.is_some() {
            return Ok(());
        }
        let Some(device) = self.parent.as_ref().map(|parent| parent.device.clone()) else {
            return Ok(());
        };
        if let Err(inner) = f(&device, &mut self.base) {
            let error = RenderPassError { scope, inner };
            self.base.store_error(error.clone());
            return Err(error);
        }
        Ok(())
    }

    fn push(&mut self, scope: PassErrorScope, command: RenderCommand) -> Result<(), RenderPassError> {
        self.record(scope, |_, base| {
            base.commands.push(command);
            Ok(())
        })
    }
}

fn check_viewport(
    rect: &Rect<f32>,
    depth_min: f32,
    depth_max: f32,
    extent: &wgt::Extent3d,
) -> Result<(), RenderCommandError> {
    let contained = rect.w >= 0.0
        && rect.h >= 0.0
        && rect.x >= 0.0
        && rect.y >= 0.0
        && rect.x + rect.w <= extent.width as f32
        && rect.y + rect.h <= extent.height as f32;
    if !contained {
        return Err(RenderCommandError::InvalidViewportRect {
            rect: *rect,
            width: extent.width,
            height: extent.height,
        });
    }
    if !(0.0..=1.0).contains(&depth_min)
        || !(0.0..=1.0).contains(&depth_max)
        || depth_min > depth_max
    {
        return Err(RenderCommandError::InvalidViewportDepth {
            min: depth_min,
            max: depth_max,
        });
    }
    Ok(())
}

fn check_scissor(rect: &Rect<u32>, extent: &wgt::Extent3d) -> Result<(), RenderCommandError> {
    let fits = |start: u32, size: u32, max: u32| start.checked_add(size).map_or(false, |end| end <= max);
    if !fits(rect.x, rect.w, extent.width) || !fits(rect.y, rect.h, extent.height) {
        return Err(RenderCommandError::InvalidScissorRect {
            rect: *rect,
            width: extent.width,
            height: extent.height,
        });
    }
    Ok(())
}

fn indirect_scope(count: u32, indexed: bool) -> PassErrorScope {
    PassErrorScope::Draw {
        kind: if count == 1 {
            DrawKind::DrawIndirect
        } else {
            DrawKind::MultiDrawIndirect
        },
        indexed,
    }
}

/// Walks a recorded render pass once, validating every command against the
/// pass attachments.
fn validate_render_pass(
    device: &Arc<Device>,
    tracker: &mut Tracker,
    base: BasePass<RenderCommand, RenderPassError>,
    info: RenderPassInfo,
) -> Result<(), RenderPassError> {
    log::trace!("Validating render pass {:?}", base.label);

    let RenderPassInfo {
        context,
        extent,
        is_depth_read_only,
        is_stencil_read_only,
        mut scope,
    } = info;

    let mut state = DrawState::new(
        device,
        &context,
        is_depth_read_only,
        is_stencil_read_only,
        &mut scope,
    );
    let mut debug_scope = DebugScope::default();
    let mut dynamic_offsets = base.dynamic_offsets.as_slice();
    let mut strings = DebugStrings {
        data: &base.string_data,
    };

    for command in base.commands {
        match command {
            RenderCommand::SetBindGroup {
                index,
                num_dynamic_offsets,
                bind_group,
            } => {
                let scope = PassErrorScope::SetBindGroup { index };
                let (offsets, rest) =
                    dynamic_offsets.split_at(num_dynamic_offsets.min(dynamic_offsets.len()));
                dynamic_offsets = rest;
                state
                    .set_bind_group(index, &bind_group, offsets)
                    .map_pass_err(scope)?;
            }
            RenderCommand::SetPipeline(pipeline) => {
                state
                    .set_pipeline(pipeline)
                    .map_pass_err(PassErrorScope::SetPipelineRender)?;
            }
            RenderCommand::SetIndexBuffer {
                buffer,
                index_format,
                offset,
                size,
            } => {
                state
                    .set_index_buffer(&buffer, index_format, offset, size)
                    .map_pass_err(PassErrorScope::SetIndexBuffer)?;
            }
            RenderCommand::SetVertexBuffer {
                slot,
                buffer,
                offset,
                size,
            } => {
                state
                    .set_vertex_buffer(slot, buffer.as_ref(), offset, size)
                    .map_pass_err(PassErrorScope::SetVertexBuffer { slot })?;
            }
            RenderCommand::SetBlendConstant(_) | RenderCommand::SetStencilReference(_) => {}
            RenderCommand::SetViewport {
                rect,
                depth_min,
                depth_max,
            } => {
                check_viewport(&rect, depth_min, depth_max, &extent)
                    .map_pass_err(PassErrorScope::SetViewport)?;
            }
            RenderCommand::SetScissor(rect) => {
                check_scissor(&rect, &extent).map_pass_err(PassErrorScope::SetScissorRect)?;
            }
            RenderCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => {
                let scope = PassErrorScope::Draw {
                    kind: DrawKind::Draw,
                    indexed: false,
                };
                state
                    .draw(vertex_count, instance_count, first_vertex, first_instance)
                    .map_pass_err(scope)?;
            }
            RenderCommand::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                base_vertex: _,
                first_instance,
            } => {
                let scope = PassErrorScope::Draw {
                    kind: DrawKind::Draw,
                    indexed: true,
                };
                state
                    .draw_indexed(index_count, instance_count, first_index, first_instance)
                    .map_pass_err(scope)?;
            }
            RenderCommand::DrawIndirect {
                buffer,
                offset,
                count,
                indexed,
            } => {
                let scope = indirect_scope(count, indexed);
                state
                    .draw_indirect::<RenderPassErrorInner>(&buffer, offset, count, indexed)
                    .map_pass_err(scope)?;
            }
            RenderCommand::MultiDrawIndirectCount {
                buffer,
                offset,
                count_buffer,
                count_buffer_offset,
                max_count,
                indexed,
            } => {
                let scope = PassErrorScope::Draw {
                    kind: DrawKind::MultiDrawIndirectCount,
                    indexed,
                };
                state
                    .multi_draw_indirect_count::<RenderPassErrorInner>(
                        &buffer,
                        offset,
                        &count_buffer,
                        count_buffer_offset,
                        max_count,
                        indexed,
                    )
                    .map_pass_err(scope)?;
            }
            RenderCommand::PushDebugGroup { len } => {
                debug_scope.push(strings.next(len));
            }
            RenderCommand::PopDebugGroup => {
                debug_scope
                    .pop()
                    .map_pass_err(PassErrorScope::PopDebugGroup)?;
            }
            RenderCommand::InsertDebugMarker { len } => {
                let _ = strings.next(len);
            }
            RenderCommand::ExecuteBundle(bundle) => {
                state
                    .execute_bundle(&bundle)
                    .map_pass_err(PassErrorScope::ExecuteBundle)?;
            }
        }
    }

    debug_scope.finish().map_pass_err(PassErrorScope::Pass)?;

    drop(state);
    tracker.add_from_scope(&scope);
    Ok(())
}

impl Global {
    fn resolve_render_pass_attachments(
        &self,
        device: &Arc<Device>,
        desc: &RenderPassDescriptor,
    ) -> Result<RenderPassInfo, RenderPassErrorInner> {
        let max = (device.limits.max_color_attachments as usize).min(wgt::MAX_COLOR_ATTACHMENTS);
        if desc.color_attachments.len() > max {
            return Err(ColorAttachmentError::TooMany {
                given: desc.color_attachments.len(),
                limit: max,
            }
            .into());
        }

        let mut colors = Vec::with_capacity(desc.color_attachments.len());
        for attachment in desc.color_attachments.iter() {
            let Some(at) = attachment.as_ref() else {
                colors.push(None);
                continue;
            };
            let view = self.hub.texture_views.get(at.view).get()?;
            let resolve_target = match at.resolve_target {
                Some(id) => Some(self.hub.texture_views.get(id).get()?),
                None => None,
            };
            colors.push(Some(ArcRenderPassColorAttachment {
                view,
                resolve_target,
            }));
        }

        let depth_stencil = match desc.depth_stencil_attachment {
            Some(at) => Some(ArcRenderPassDepthStencilAttachment {
                view: self.hub.texture_views.get(at.view).get()?,
                depth: at.depth.clone(),
                stencil: at.stencil.clone(),
            }),
            None => None,
        };

        RenderPassInfo::start(device, &colors, depth_stencil.as_ref())
    }

    pub fn command_encoder_begin_render_pass(
        &self,
        encoder_id: id::CommandEncoderId,
        desc: &RenderPassDescriptor,
    ) -> (RenderPass, Option<CommandEncoderError>) {
        api_log!("CommandEncoder::begin_render_pass {encoder_id:?}");

        let cmd_buf = self.command_encoder(encoder_id);
        let locked = cmd_buf.data.lock().lock_encoder();
        if let Err(error) = locked {
            if let CommandEncoderError::NotRecording = error {
                cmd_buf.device.handle_error(
                    "CommandEncoder::begin_render_pass",
                    desc.label.as_deref().unwrap_or_default().to_owned(),
                    error.clone(),
                );
            }
            let pass_error = RenderPassError {
                scope: PassErrorScope::Pass,
                inner: RenderPassErrorInner::InvalidParentEncoder,
            };
            let pass = RenderPass {
                base: BasePass::new_invalid(&desc.label, pass_error),
                parent: None,
                info: None,
            };
            return (pass, Some(error));
        }

        let pass = match self.resolve_render_pass_attachments(&cmd_buf.device, desc) {
            Ok(info) => RenderPass {
                base: BasePass::new(&desc.label),
                parent: Some(cmd_buf),
                info: Some(info),
            },
            Err(inner) => RenderPass {
                base: BasePass::new_invalid(
                    &desc.label,
                    RenderPassError {
                        scope: PassErrorScope::Pass,
                        inner,
                    },
                ),
                parent: Some(cmd_buf),
                info: None,
            },
        };
        (pass, None)
    }

    /// Ends the pass, validating everything it recorded.
    ///
    /// A failure invalidates the parent encoder; `command_encoder_finish`
    /// reports it.
    pub fn render_pass_end(&self, pass: RenderPass) -> Result<(), RenderPassError> {
        api_log!("RenderPass::end {:?}", pass.label());

        let RenderPass { base, parent, info } = pass;
        let Some(cmd_buf) = parent else {
            return match base.error {
                Some(error) => Err(error),
                None => Ok(()),
            };
        };

        let mut data = cmd_buf.data.lock();
        if !data.unlock_encoder() {
            // The encoder failed while the pass was open.
            return Ok(());
        }

        let result = match (base.error.clone(), info) {
            (Some(error), _) => Err(error),
            (None, Some(info)) => validate_render_pass(&cmd_buf.device, &mut data.trackers, base, info),
            (None, None) => Err(RenderPassError {
                scope: PassErrorScope::Pass,
                inner: RenderPassErrorInner::InvalidParentEncoder,
            }),
        };
        if let Err(ref error) = result {
            data.invalidate(error.clone().into());
        }
        result
    }

    pub fn render_pass_set_bind_group(
        &self,
        pass: &mut RenderPass,
        index: u32,
        bind_group_id: id::BindGroupId,
        offsets: &[DynamicOffset],
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::set_bind_group {index} {bind_group_id:?}");

        pass.record(PassErrorScope::SetBindGroup { index }, |device, base| {
            let bind_group = self.hub.bind_groups.get(bind_group_id).get()?;
            bind_group.same_device(device)?;
            base.dynamic_offsets.extend_from_slice(offsets);
            base.commands.push(RenderCommand::SetBindGroup {
                index,
                num_dynamic_offsets: offsets.len(),
                bind_group,
            });
            Ok(())
        })
    }

    pub fn render_pass_set_pipeline(
        &self,
        pass: &mut RenderPass,
        pipeline_id: id::RenderPipelineId,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::set_pipeline {pipeline_id:?}");

        pass.record(PassErrorScope::SetPipelineRender, |device, base| {
            let pipeline = self.hub.render_pipelines.get(pipeline_id).get()?;
            pipeline.same_device(device)?;
            base.commands.push(RenderCommand::SetPipeline(pipeline));
            Ok(())
        })
    }

    pub fn render_pass_set_index_buffer(
        &self,
        pass: &mut RenderPass,
        buffer_id: id::BufferId,
        index_format: IndexFormat,
        offset: BufferAddress,
        size: Option<BufferSize>,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::set_index_buffer {buffer_id:?}");

        pass.record(PassErrorScope::SetIndexBuffer, |device, base| {
            let buffer = self.hub.buffers.get(buffer_id).get()?;
            buffer.same_device(device)?;
            base.commands.push(RenderCommand::SetIndexBuffer {
                buffer,
                index_format,
                offset,
                size,
            });
            Ok(())
        })
    }

    /// Sets or, with `buffer_id: None`, unsets a vertex buffer slot.
    pub fn render_pass_set_vertex_buffer(
        &self,
        pass: &mut RenderPass,
        slot: u32,
        buffer_id: Option<id::BufferId>,
        offset: BufferAddress,
        size: Option<BufferSize>,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::set_vertex_buffer {slot} {buffer_id:?}");

        pass.record(PassErrorScope::SetVertexBuffer { slot }, |device, base| {
            let buffer = match buffer_id {
                Some(id) => {
                    let buffer = self.hub.buffers.get(id).get()?;
                    buffer.same_device(device)?;
                    Some(buffer)
                }
                None => None,
            };
            base.commands.push(RenderCommand::SetVertexBuffer {
                slot,
                buffer,
                offset,
                size,
            });
            Ok(())
        })
    }

    pub fn render_pass_set_blend_constant(
        &self,
        pass: &mut RenderPass,
        color: Color,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::set_blend_constant");

        pass.push(PassErrorScope::Pass, RenderCommand::SetBlendConstant(color))
    }

    pub fn render_pass_set_stencil_reference(
        &self,
        pass: &mut RenderPass,
        value: u32,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::set_stencil_reference {value}");

        pass.push(PassErrorScope::Pass, RenderCommand::SetStencilReference(value))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render_pass_set_viewport(
        &self,
        pass: &mut RenderPass,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        depth_min: f32,
        depth_max: f32,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::set_viewport {x} {y} {w} {h}");

        pass.push(
            PassErrorScope::SetViewport,
            RenderCommand::SetViewport {
                rect: Rect { x, y, w, h },
                depth_min,
                depth_max,
            },
        )
    }

    pub fn render_pass_set_scissor_rect(
        &self,
        pass: &mut RenderPass,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::set_scissor_rect {x} {y} {w} {h}");

        pass.push(
            PassErrorScope::SetScissorRect,
            RenderCommand::SetScissor(Rect { x, y, w, h }),
        )
    }

    pub fn render_pass_draw(
        &self,
        pass: &mut RenderPass,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::draw {vertex_count} {instance_count} {first_vertex} {first_instance}");

        pass.push(
            PassErrorScope::Draw {
                kind: DrawKind::Draw,
                indexed: false,
            },
            RenderCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            },
        )
    }

    pub fn render_pass_draw_indexed(
        &self,
        pass: &mut RenderPass,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::draw_indexed {index_count} {instance_count} {first_index} {base_vertex} {first_instance}");

        pass.push(
            PassErrorScope::Draw {
                kind: DrawKind::Draw,
                indexed: true,
            },
            RenderCommand::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                base_vertex,
                first_instance,
            },
        )
    }

    fn render_pass_draw_indirect_impl(
        &self,
        pass: &mut RenderPass,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        count: u32,
        indexed: bool,
    ) -> Result<(), RenderPassError> {
        pass.record(indirect_scope(count, indexed), |device, base| {
            let buffer = self.hub.buffers.get(buffer_id).get()?;
            buffer.same_device(device)?;
            base.commands.push(RenderCommand::DrawIndirect {
                buffer,
                offset,
                count,
                indexed,
            });
            Ok(())
        })
    }

    pub fn render_pass_draw_indirect(
        &self,
        pass: &mut RenderPass,
        buffer_id: id::BufferId,
        offset: BufferAddress,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::draw_indirect {buffer_id:?} {offset}");

        self.render_pass_draw_indirect_impl(pass, buffer_id, offset, 1, false)
    }

    pub fn render_pass_draw_indexed_indirect(
        &self,
        pass: &mut RenderPass,
        buffer_id: id::BufferId,
        offset: BufferAddress,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::draw_indexed_indirect {buffer_id:?} {offset}");

        self.render_pass_draw_indirect_impl(pass, buffer_id, offset, 1, true)
    }

    pub fn render_pass_multi_draw_indirect(
        &self,
        pass: &mut RenderPass,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        count: u32,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::multi_draw_indirect {buffer_id:?} {offset} {count}");

        self.render_pass_draw_indirect_impl(pass, buffer_id, offset, count, false)
    }

    pub fn render_pass_multi_draw_indexed_indirect(
        &self,
        pass: &mut RenderPass,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        count: u32,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::multi_draw_indexed_indirect {buffer_id:?} {offset} {count}");

        self.render_pass_draw_indirect_impl(pass, buffer_id, offset, count, true)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render_pass_multi_draw_indirect_count(
        &self,
        pass: &mut RenderPass,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        count_buffer_id: id::BufferId,
        count_buffer_offset: BufferAddress,
        max_count: u32,
        indexed: bool,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::multi_draw_indirect_count {buffer_id:?} {count_buffer_id:?} {max_count}");

        let scope = PassErrorScope::Draw {
            kind: DrawKind::MultiDrawIndirectCount,
            indexed,
        };
        pass.record(scope, |device, base| {
            let buffer = self.hub.buffers.get(buffer_id).get()?;
            buffer.same_device(device)?;
            let count_buffer = self.hub.buffers.get(count_buffer_id).get()?;
            count_buffer.same_device(device)?;
            base.commands.push(RenderCommand::MultiDrawIndirectCount {
                buffer,
                offset,
                count_buffer,
                count_buffer_offset,
                max_count,
                indexed,
            });
            Ok(())
        })
    }

    pub fn render_pass_push_debug_group(
        &self,
        pass: &mut RenderPass,
        label: &str,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::push_debug_group {label}");

        pass.record(PassErrorScope::PushDebugGroup, |_, base| {
            let len = base.push_debug_string(label);
            base.commands.push(RenderCommand::PushDebugGroup { len });
            Ok(())
        })
    }

    pub fn render_pass_pop_debug_group(&self, pass: &mut RenderPass) -> Result<(), RenderPassError> {
        api_log!("RenderPass::pop_debug_group");

        pass.push(PassErrorScope::PopDebugGroup, RenderCommand::PopDebugGroup)
    }

    pub fn render_pass_insert_debug_marker(
        &self,
        pass: &mut RenderPass,
        label: &str,
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::insert_debug_marker {label}");

        pass.record(PassErrorScope::InsertDebugMarker, |_, base| {
            let len = base.push_debug_string(label);
            base.commands.push(RenderCommand::InsertDebugMarker { len });
            Ok(())
        })
    }

    pub fn render_pass_execute_bundles(
        &self,
        pass: &mut RenderPass,
        render_bundle_ids: &[id::RenderBundleId],
    ) -> Result<(), RenderPassError> {
        api_log!("RenderPass::execute_bundles {render_bundle_ids:?}");

        pass.record(PassErrorScope::ExecuteBundle, |device, base| {
            for &bundle_id in render_bundle_ids {
                let bundle = self.hub.render_bundles.get(bundle_id).get()?;
                bundle.same_device(device)?;
                base.commands.push(RenderCommand::ExecuteBundle(bundle));
            }
            Ok(())
        })
    }
}
