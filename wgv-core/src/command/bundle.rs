/*! Render Bundles

A render bundle is a prerecorded sequence of commands that can be replayed
in any render pass whose attachments match the ones the bundle was encoded
for.

Bundle commands are recorded into a [`RenderBundleEncoder`] exactly like
pass commands. [`Global::render_bundle_encoder_finish`] walks them once with
the same draw-time checks a render pass applies, collecting every resource
the bundle uses into its own usage scope. Executing the bundle in a pass then
only has to check attachment compatibility and merge that scope.

Executing a bundle leaves the pass with no pipeline, bind groups or vertex
and index buffers set.
!*/

use std::{borrow::Cow, sync::Arc};

use arrayvec::ArrayVec;
use thiserror::Error;
use wgt::{BufferAddress, BufferSize, DynamicOffset, IndexFormat, TextureFormat};

use crate::{
    command::{
        render::DrawState, BasePass, ColorAttachmentError, DebugGroupError, DebugScope,
        DebugStrings, DrawError, DrawKind, MapPassErr, PassErrorScope, RenderCommand,
        RenderCommandError,
    },
    conv,
    device::{AttachmentData, Device, DeviceError, RenderPassContext},
    error::{ErrorType, WebGpuError},
    global::Global,
    id,
    resource::{DestroyedResourceError, Fallible, Labeled, ParentDevice},
    track::UsageScope,
    Label, LabelHelpers,
};

/// Describes a [`RenderBundleEncoder`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderBundleEncoderDescriptor<'a> {
    /// Debug label of the render bundle encoder.
    ///
    /// This will show up in graphics debuggers for easy identification.
    pub label: Label<'a>,
    /// The formats of the color attachments that this render bundle is capable
    /// to rendering to.
    ///
    /// This must match the formats of the color attachments in the
    /// renderpass this render bundle is executed in.
    pub color_formats: Cow<'a, [Option<TextureFormat>]>,
    /// Information about the depth attachment that this render bundle is
    /// capable to rendering to.
    ///
    /// The format must match the format of the depth attachments in the
    /// renderpass this render bundle is executed in.
    pub depth_stencil: Option<wgt::RenderBundleDepthStencil>,
    /// Sample count this render bundle is capable of rendering to.
    ///
    /// This must match the pipelines and the renderpasses it is used in.
    pub sample_count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderBundleDescriptor<'a> {
    pub label: Label<'a>,
}

#[derive(Debug)]
pub struct RenderBundleEncoder {
    base: BasePass<RenderCommand, RenderBundleError>,
    device: Arc<Device>,
    context: RenderPassContext,
    is_depth_read_only: bool,
    is_stencil_read_only: bool,
}

impl RenderBundleEncoder {
    fn new(
        desc: &RenderBundleEncoderDescriptor,
        device: &Arc<Device>,
    ) -> Result<Self, CreateRenderBundleError> {
        device.check_is_valid()?;

        let max_color_attachments =
            (device.limits.max_color_attachments as usize).min(wgt::MAX_COLOR_ATTACHMENTS);
        if desc.color_formats.len() > max_color_attachments {
            return Err(ColorAttachmentError::TooMany {
                given: desc.color_formats.len(),
                limit: max_color_attachments,
            }
            .into());
        }
        for (index, format) in desc.color_formats.iter().enumerate() {
            if let Some(format) = *format {
                if !format.is_color_renderable() {
                    return Err(CreateRenderBundleError::InvalidColorFormat { index, format });
                }
            }
        }

        let (is_depth_read_only, is_stencil_read_only) = match desc.depth_stencil {
            Some(ds) => {
                if !ds.format.is_depth_stencil_format() {
                    return Err(CreateRenderBundleError::InvalidDepthStencilFormat(ds.format));
                }
                (
                    !ds.format.has_depth_aspect() || ds.depth_read_only,
                    !ds.format.has_stencil_aspect() || ds.stencil_read_only,
                )
            }
            // There's no depth/stencil attachment, so these values just don't
            // matter. Choose the most accommodating value, to simplify
            // validation.
            None => (true, true),
        };

        if desc.color_formats.iter().all(Option::is_none) && desc.depth_stencil.is_none() {
            return Err(CreateRenderBundleError::MissingAttachments);
        }

        if !conv::is_valid_sample_count(desc.sample_count) {
            return Err(CreateRenderBundleError::InvalidSampleCount(desc.sample_count));
        }

        Ok(Self {
            base: BasePass::new(&desc.label),
            device: device.clone(),
            context: RenderPassContext {
                attachments: AttachmentData {
                    colors: desc.color_formats.iter().copied().collect(),
                    depth_stencil: desc.depth_stencil.map(|ds| ds.format),
                },
                sample_count: desc.sample_count,
            },
            is_depth_read_only,
            is_stencil_read_only,
        })
    }

    /// An encoder whose creation failed. Finishing it yields an invalid bundle.
    fn new_invalid(desc: &RenderBundleEncoderDescriptor, device: &Arc<Device>) -> Self {
        Self {
            base: BasePass::new_invalid(
                &desc.label,
                RenderBundleError {
                    scope: PassErrorScope::Bundle,
                    inner: RenderBundleErrorInner::InvalidEncoder,
                },
            ),
            device: device.clone(),
            context: RenderPassContext {
                attachments: AttachmentData {
                    colors: ArrayVec::new(),
                    depth_stencil: None,
                },
                sample_count: 1,
            },
            is_depth_read_only: true,
            is_stencil_read_only: true,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.base.label.as_deref()
    }

    fn record<F>(&mut self, scope: PassErrorScope, f: F) -> Result<(), RenderBundleError>
    where
        F: FnOnce(
            &Arc<Device>,
            &mut BasePass<RenderCommand, RenderBundleError>,
        ) -> Result<(), RenderBundleErrorInner>,
    {
        if self.base.error.is_some() {
            return Ok(());
        }
        if let Err(inner) = f(&self.device, &mut self.base) {
            let error = RenderBundleError { scope, inner };
            self.base.store_error(error.clone());
            return Err(error);
        }
        Ok(())
    }

    /// Validates every recorded command, producing the bundle.
    fn finish(self, desc: &RenderBundleDescriptor) -> Result<RenderBundle, RenderBundleError> {
        let RenderBundleEncoder {
            base,
            device,
            context,
            is_depth_read_only,
            is_stencil_read_only,
        } = self;

        if let Some(error) = base.error {
            return Err(error);
        }
        device
            .check_is_valid()
            .map_pass_err(PassErrorScope::Bundle)?;

        let mut used = UsageScope::new();
        let mut state = DrawState::new(
            &device,
            &context,
            is_depth_read_only,
            is_stencil_read_only,
            &mut used,
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
                    let scope = PassErrorScope::Draw {
                        kind: DrawKind::DrawIndirect,
                        indexed,
                    };
                    state
                        .draw_indirect::<RenderBundleErrorInner>(&buffer, offset, count, indexed)
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
                RenderCommand::SetBlendConstant(_)
                | RenderCommand::SetStencilReference(_)
                | RenderCommand::SetViewport { .. }
                | RenderCommand::SetScissor(_)
                | RenderCommand::MultiDrawIndirectCount { .. }
                | RenderCommand::ExecuteBundle(_) => {
                    unreachable!("{command:?} cannot be recorded in a render bundle")
                }
            }
        }

        debug_scope.finish().map_pass_err(PassErrorScope::Bundle)?;
        drop(state);

        Ok(RenderBundle {
            device,
            used,
            context,
            is_depth_read_only,
            is_stencil_read_only,
            label: desc.label.to_string(),
        })
    }
}

/// Error type returned from `RenderBundleEncoder::new` if the sample count is invalid.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CreateRenderBundleError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    ColorAttachment(#[from] ColorAttachmentError),
    #[error("Format {format:?} of color target {index} is not color-renderable")]
    InvalidColorFormat { index: usize, format: TextureFormat },
    #[error("Format {0:?} is not a depth-stencil format")]
    InvalidDepthStencilFormat(TextureFormat),
    #[error("Invalid number of samples {0}")]
    InvalidSampleCount(u32),
    #[error("A render bundle needs at least one color or depth-stencil format")]
    MissingAttachments,
}

impl WebGpuError for CreateRenderBundleError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Device(e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

/// A finished render bundle: its attachment context and every resource its
/// commands use.
pub struct RenderBundle {
    pub(crate) device: Arc<Device>,
    pub(super) used: UsageScope,
    pub(super) context: RenderPassContext,
    pub(super) is_depth_read_only: bool,
    pub(super) is_stencil_read_only: bool,
    /// The `label` from the descriptor used to create the resource.
    label: String,
}

impl std::fmt::Debug for RenderBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBundle")
            .field("label", &self.label())
            .field("context", &self.context)
            .finish()
    }
}

impl Drop for RenderBundle {
    fn drop(&mut self) {
        resource_log!("Drop {}", self.error_ident());
    }
}

crate::resource_traits!(RenderBundle);

impl RenderBundle {
    /// Fails if any buffer or texture the bundle uses was destroyed since it
    /// was finished.
    pub(super) fn check_destroyed(&self) -> Result<(), DestroyedResourceError> {
        for buffer in self.used.buffers.used_resources() {
            buffer.check_destroyed()?;
        }
        for texture in self.used.textures.used_resources() {
            texture.check_destroyed()?;
        }
        Ok(())
    }
}

/// Error encountered when finishing recording a render bundle.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum RenderBundleErrorInner {
    #[error("Render bundle encoder is invalid")]
    InvalidEncoder,
    #[error(transparent)]
    RenderCommand(RenderCommandError),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    DebugGroup(#[from] DebugGroupError),
}

impl<T> From<T> for RenderBundleErrorInner
where
    T: Into<RenderCommandError>,
{
    fn from(t: T) -> Self {
        Self::RenderCommand(t.into())
    }
}

/// Error encountered when finishing recording a render bundle.
#[derive(Clone, Debug, Error)]
#[error("{scope}")]
pub struct RenderBundleError {
    pub scope: PassErrorScope,
    #[source]
    inner: RenderBundleErrorInner,
}

impl WebGpuError for RenderBundleError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self.inner {
            RenderBundleErrorInner::RenderCommand(ref e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

impl<T, E> MapPassErr<T, RenderBundleError> for Result<T, E>
where
    E: Into<RenderBundleErrorInner>,
{
    fn map_pass_err(self, scope: PassErrorScope) -> Result<T, RenderBundleError> {
        self.map_err(|inner| RenderBundleError {
            scope,
            inner: inner.into(),
        })
    }
}

impl Global {
    pub fn device_create_render_bundle_encoder(
        &self,
        device_id: id::DeviceId,
        desc: &RenderBundleEncoderDescriptor,
    ) -> (RenderBundleEncoder, Option<CreateRenderBundleError>) {
        api_log!("Device::create_render_bundle_encoder");

        let device = self.hub.devices.get(device_id);
        match RenderBundleEncoder::new(desc, &device) {
            Ok(encoder) => (encoder, None),
            Err(error) => {
                device.handle_error(
                    "Device::create_render_bundle_encoder",
                    desc.label.to_string(),
                    error.clone(),
                );
                (RenderBundleEncoder::new_invalid(desc, &device), Some(error))
            }
        }
    }

    pub fn render_bundle_encoder_finish(
        &self,
        bundle_encoder: RenderBundleEncoder,
        desc: &RenderBundleDescriptor,
    ) -> (id::RenderBundleId, Option<RenderBundleError>) {
        api_log!("RenderBundleEncoder::finish {:?}", bundle_encoder.label());

        let fid = self.hub.render_bundles.prepare();
        let device = bundle_encoder.device.clone();

        match bundle_encoder.finish(desc) {
            Ok(bundle) => {
                let bundle = Arc::new(bundle);
                resource_log!("Created {}", bundle.error_ident());
                (fid.assign(Fallible::Valid(bundle)), None)
            }
            Err(error) => {
                device.handle_error(
                    "RenderBundleEncoder::finish",
                    desc.label.to_string(),
                    error.clone(),
                );
                let id = fid.assign_invalid(&desc.label);
                (id, Some(error))
            }
        }
    }

    pub fn render_bundle_drop(&self, render_bundle_id: id::RenderBundleId) {
        api_log!("RenderBundle::drop {render_bundle_id:?}");

        let _bundle = self.hub.render_bundles.remove(render_bundle_id);
    }

    pub fn render_bundle_set_bind_group(
        &self,
        bundle: &mut RenderBundleEncoder,
        index: u32,
        bind_group_id: id::BindGroupId,
        offsets: &[DynamicOffset],
    ) -> Result<(), RenderBundleError> {
        api_log!("RenderBundle::set_bind_group {index} {bind_group_id:?}");

        bundle.record(PassErrorScope::SetBindGroup { index }, |device, base| {
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

    pub fn render_bundle_set_pipeline(
        &self,
        bundle: &mut RenderBundleEncoder,
        pipeline_id: id::RenderPipelineId,
    ) -> Result<(), RenderBundleError> {
        api_log!("RenderBundle::set_pipeline {pipeline_id:?}");

        bundle.record(PassErrorScope::SetPipelineRender, |device, base| {
            let pipeline = self.hub.render_pipelines.get(pipeline_id).get()?;
            pipeline.same_device(device)?;
            base.commands.push(RenderCommand::SetPipeline(pipeline));
            Ok(())
        })
    }

    pub fn render_bundle_set_index_buffer(
        &self,
        bundle: &mut RenderBundleEncoder,
        buffer_id: id::BufferId,
        index_format: IndexFormat,
        offset: BufferAddress,
        size: Option<BufferSize>,
    ) -> Result<(), RenderBundleError> {
        api_log!("RenderBundle::set_index_buffer {buffer_id:?}");

        bundle.record(PassErrorScope::SetIndexBuffer, |device, base| {
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

    pub fn render_bundle_set_vertex_buffer(
        &self,
        bundle: &mut RenderBundleEncoder,
        slot: u32,
        buffer_id: Option<id::BufferId>,
        offset: BufferAddress,
        size: Option<BufferSize>,
    ) -> Result<(), RenderBundleError> {
        api_log!("RenderBundle::set_vertex_buffer {slot} {buffer_id:?}");

        bundle.record(PassErrorScope::SetVertexBuffer { slot }, |device, base| {
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

    pub fn render_bundle_draw(
        &self,
        bundle: &mut RenderBundleEncoder,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<(), RenderBundleError> {
        let scope = PassErrorScope::Draw {
            kind: DrawKind::Draw,
            indexed: false,
        };
        bundle.record(scope, |_, base| {
            base.commands.push(RenderCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            });
            Ok(())
        })
    }

    pub fn render_bundle_draw_indexed(
        &self,
        bundle: &mut RenderBundleEncoder,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<(), RenderBundleError> {
        let scope = PassErrorScope::Draw {
            kind: DrawKind::Draw,
            indexed: true,
        };
        bundle.record(scope, |_, base| {
            base.commands.push(RenderCommand::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                base_vertex,
                first_instance,
            });
            Ok(())
        })
    }

    /// Records `draw_indirect`, or `draw_indexed_indirect` when `indexed`.
    pub fn render_bundle_draw_indirect(
        &self,
        bundle: &mut RenderBundleEncoder,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        indexed: bool,
    ) -> Result<(), RenderBundleError> {
        api_log!("RenderBundle::draw_indirect {buffer_id:?} {offset}");

        let scope = PassErrorScope::Draw {
            kind: DrawKind::DrawIndirect,
            indexed,
        };
        bundle.record(scope, |device, base| {
            let buffer = self.hub.buffers.get(buffer_id).get()?;
            buffer.same_device(device)?;
            base.commands.push(RenderCommand::DrawIndirect {
                buffer,
                offset,
                count: 1,
                indexed,
            });
            Ok(())
        })
    }

    pub fn render_bundle_push_debug_group(
        &self,
        bundle: &mut RenderBundleEncoder,
        label: &str,
    ) -> Result<(), RenderBundleError> {
        bundle.record(PassErrorScope::PushDebugGroup, |_, base| {
            let len = base.push_debug_string(label);
            base.commands.push(RenderCommand::PushDebugGroup { len });
            Ok(())
        })
    }

    pub fn render_bundle_pop_debug_group(
        &self,
        bundle: &mut RenderBundleEncoder,
    ) -> Result<(), RenderBundleError> {
        bundle.record(PassErrorScope::PopDebugGroup, |_, base| {
            base.commands.push(RenderCommand::PopDebugGroup);
            Ok(())
        })
    }

    pub fn render_bundle_insert_debug_marker(
        &self,
        bundle: &mut RenderBundleEncoder,
        label: &str,
    ) -> Result<(), RenderBundleError> {
        bundle.record(PassErrorScope::InsertDebugMarker, |_, base| {
            let len = base.push_debug_string(label);
            base.commands.push(RenderCommand::InsertDebugMarker { len });
            Ok(())
        })
    }
}
