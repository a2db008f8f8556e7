use std::sync::Arc;

use thiserror::Error;
use wgt::{BufferAddress, DynamicOffset};

use crate::{
    binding_model::{BindError, BindGroup, LateMinBufferBindingSizeMismatch},
    command::{
        bind::{Binder, BinderError},
        BasePass, CommandBuffer, CommandEncoderError, DebugGroupError, DebugScope, DebugStrings,
        MapPassErr, PassErrorScope,
    },
    device::{Device, DeviceError},
    error::{ErrorType, WebGpuError},
    global::Global,
    id,
    pipeline::ComputePipeline,
    resource::{
        Buffer, DestroyedResourceError, InvalidResourceError, MissingBufferUsageError,
        ParentDevice,
    },
    track::{BufferUses, Tracker, UsageConflict, UsageScope},
    Label,
};

#[doc(hidden)]
#[derive(Clone, Debug)]
pub enum ComputeCommand {
    SetBindGroup {
        index: u32,
        num_dynamic_offsets: usize,
        bind_group: Arc<BindGroup>,
    },
    SetPipeline(Arc<ComputePipeline>),
    Dispatch([u32; 3]),
    DispatchIndirect {
        buffer: Arc<Buffer>,
        offset: BufferAddress,
    },
    PushDebugGroup {
        len: usize,
    },
    PopDebugGroup,
    InsertDebugMarker {
        len: usize,
    },
}

#[derive(Clone, Debug, Default)]
pub struct ComputePassDescriptor<'a> {
    pub label: Label<'a>,
}

/// A compute pass being recorded.
///
/// Commands are only resolved while recording; the whole pass is validated
/// by [`Global::compute_pass_end`].
#[derive(Debug)]
pub struct ComputePass {
    base: BasePass<ComputeCommand, ComputePassError>,
    /// The encoder this pass locked, `None` if the pass could not begin.
    parent: Option<Arc<CommandBuffer>>,
}

impl ComputePass {
    fn new(parent: Arc<CommandBuffer>, desc: &ComputePassDescriptor) -> Self {
        Self {
            base: BasePass::new(&desc.label),
            parent: Some(parent),
        }
    }

    fn new_invalid(desc: &ComputePassDescriptor, error: ComputePassError) -> Self {
        Self {
            base: BasePass::new_invalid(&desc.label, error),
            parent: None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.base.label.as_deref()
    }

    /// Runs `f` unless the pass already failed. A failure is kept and later
    /// commands are dropped.
    fn record<F>(&mut self, scope: PassErrorScope, f: F) -> Result<(), ComputePassError>
    where
        F: FnOnce(
            &Arc<Device>,
            &mut BasePass<ComputeCommand, ComputePassError>,
        ) -> Result<(), ComputePassErrorInner>,
    {
        if self.base.error.is_some() {
            return Ok(());
        }
        let Some(device) = self.parent.as_ref().map(|parent| parent.device.clone()) else {
            return Ok(());
        };
        if let Err(inner) = f(&device, &mut self.base) {
            let error = ComputePassError { scope, inner };
            self.base.store_error(error.clone());
            return Err(error);
        }
        Ok(())
    }
}

/// Error validating a dispatch call.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("Compute pipeline must be set")]
    MissingPipeline,
    #[error(transparent)]
    IncompatibleBindGroup(#[from] BinderError),
    #[error(
        "Each current dispatch group size dimension ({current:?}) must be less or equal to {limit}"
    )]
    InvalidGroupSize { current: [u32; 3], limit: u32 },
    #[error(transparent)]
    BindingSizeTooSmall(#[from] LateMinBufferBindingSizeMismatch),
}

/// Error encountered when performing a compute pass.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ComputePassErrorInner {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("Parent encoder is invalid")]
    InvalidParentEncoder,
    #[error(transparent)]
    InvalidResource(#[from] InvalidResourceError),
    #[error(transparent)]
    DestroyedResource(#[from] DestroyedResourceError),
    #[error("Bind group index {index} is greater than the device's requested `max_bind_groups` limit {max}")]
    BindGroupIndexOutOfRange { index: u32, max: u32 },
    #[error("Indirect buffer offset {0:?} is not a multiple of 4")]
    UnalignedIndirectBufferOffset(BufferAddress),
    #[error("Indirect buffer uses bytes {offset}..{end_offset} which overruns indirect buffer of size {buffer_size}")]
    IndirectBufferOverrun {
        offset: u64,
        end_offset: u64,
        buffer_size: u64,
    },
    #[error(transparent)]
    UsageConflict(#[from] UsageConflict),
    #[error(transparent)]
    MissingBufferUsage(#[from] MissingBufferUsageError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    DebugGroup(#[from] DebugGroupError),
}

/// Error encountered when performing a compute pass, stored for later reporting
/// when encoding ends.
#[derive(Clone, Debug, Error)]
#[error("{scope}")]
pub struct ComputePassError {
    pub scope: PassErrorScope,
    #[source]
    pub(super) inner: ComputePassErrorInner,
}

impl WebGpuError for ComputePassError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self.inner {
            ComputePassErrorInner::Device(ref e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

impl<T, E> MapPassErr<T, ComputePassError> for Result<T, E>
where
    E: Into<ComputePassErrorInner>,
{
    fn map_pass_err(self, scope: PassErrorScope) -> Result<T, ComputePassError> {
        self.map_err(|inner| ComputePassError {
            scope,
            inner: inner.into(),
        })
    }
}

struct State<'a> {
    device: &'a Arc<Device>,
    binder: Binder,
    pipeline: Option<Arc<ComputePipeline>>,
    debug_scope: DebugScope,
    tracker: &'a mut Tracker,
}

impl<'a> State<'a> {
    fn is_ready(&self) -> Result<(), DispatchError> {
        let pipeline = self.pipeline.as_ref().ok_or(DispatchError::MissingPipeline)?;
        self.binder.check_compatibility(&**pipeline)?;
        self.binder
            .check_late_buffer_bindings(&pipeline.late_sized_buffer_groups)?;
        Ok(())
    }

    /// Every dispatch is its own usage scope: the bind groups set at this
    /// point, plus the indirect buffer if any.
    fn flush_states(&mut self, indirect: Option<&Arc<Buffer>>) -> Result<(), UsageConflict> {
        let mut scope = UsageScope::new();
        for bind_group in self.binder.bound_groups() {
            scope.merge_bind_group(&bind_group.used)?;
        }
        if let Some(buffer) = indirect {
            scope.buffers.merge_single(buffer, BufferUses::INDIRECT)?;
        }
        self.tracker.add_from_scope(&scope);
        Ok(())
    }
}

fn set_bind_group(
    state: &mut State,
    index: u32,
    bind_group: &Arc<BindGroup>,
    offsets: &[DynamicOffset],
) -> Result<(), ComputePassErrorInner> {
    let max = state
        .device
        .limits
        .max_bind_groups
        .min(wgt::MAX_BIND_GROUPS as u32);
    if index >= max {
        return Err(ComputePassErrorInner::BindGroupIndexOutOfRange { index, max });
    }
    bind_group.check_destroyed()?;
    bind_group.validate_dynamic_bindings(index, offsets)?;
    state.binder.assign_group(index as usize, bind_group);
    Ok(())
}

fn dispatch_indirect(
    state: &mut State,
    buffer: &Arc<Buffer>,
    offset: BufferAddress,
) -> Result<(), ComputePassErrorInner> {
    buffer.check_destroyed()?;
    buffer.check_usage(wgt::BufferUsages::INDIRECT)?;

    if offset % wgt::INDIRECT_OFFSET_ALIGNMENT != 0 {
        return Err(ComputePassErrorInner::UnalignedIndirectBufferOffset(offset));
    }

    let args_size = std::mem::size_of::<wgt::DispatchIndirectArgs>() as u64;
    match offset.checked_add(args_size) {
        Some(end_offset) if end_offset <= buffer.size => {}
        end_offset => {
            return Err(ComputePassErrorInner::IndirectBufferOverrun {
                offset,
                end_offset: end_offset.unwrap_or(u64::MAX),
                buffer_size: buffer.size,
            })
        }
    }

    state.is_ready()?;
    state.flush_states(Some(buffer))?;
    Ok(())
}

/// Walks a recorded compute pass once, validating every command.
fn validate_compute_pass(
    device: &Arc<Device>,
    tracker: &mut Tracker,
    base: BasePass<ComputeCommand, ComputePassError>,
) -> Result<(), ComputePassError> {
    log::trace!("Validating compute pass {:?}", base.label);

    let mut state = State {
        device,
        binder: Binder::new(),
        pipeline: None,
        debug_scope: DebugScope::default(),
        tracker,
    };
    let mut dynamic_offsets = base.dynamic_offsets.as_slice();
    let mut strings = DebugStrings {
        data: &base.string_data,
    };

    for command in base.commands {
        match command {
            ComputeCommand::SetBindGroup {
                index,
                num_dynamic_offsets,
                bind_group,
            } => {
                let scope = PassErrorScope::SetBindGroup { index };
                let (offsets, rest) =
                    dynamic_offsets.split_at(num_dynamic_offsets.min(dynamic_offsets.len()));
                dynamic_offsets = rest;
                set_bind_group(&mut state, index, &bind_group, offsets).map_pass_err(scope)?;
            }
            ComputeCommand::SetPipeline(pipeline) => {
                state.binder.change_pipeline_layout(&pipeline.layout);
                state.pipeline = Some(pipeline);
            }
            ComputeCommand::Dispatch(groups) => {
                let scope = PassErrorScope::Dispatch { indirect: false };
                state.is_ready().map_pass_err(scope)?;
                let limit = device.limits.max_compute_workgroups_per_dimension;
                if groups.iter().any(|&group| group > limit) {
                    return Err(DispatchError::InvalidGroupSize {
                        current: groups,
                        limit,
                    })
                    .map_pass_err(scope);
                }
                state.flush_states(None).map_pass_err(scope)?;
            }
            ComputeCommand::DispatchIndirect { buffer, offset } => {
                let scope = PassErrorScope::Dispatch { indirect: true };
                dispatch_indirect(&mut state, &buffer, offset).map_pass_err(scope)?;
            }
            ComputeCommand::PushDebugGroup { len } => {
                let label = strings.next(len);
                state.debug_scope.push(label);
            }
            ComputeCommand::PopDebugGroup => {
                let scope = PassErrorScope::PopDebugGroup;
                state.debug_scope.pop().map_pass_err(scope)?;
            }
            ComputeCommand::InsertDebugMarker { len } => {
                let _ = strings.next(len);
            }
        }
    }

    state.debug_scope.finish().map_pass_err(PassErrorScope::Pass)
}

impl Global {
    pub fn command_encoder_begin_compute_pass(
        &self,
        encoder_id: id::CommandEncoderId,
        desc: &ComputePassDescriptor,
    ) -> (ComputePass, Option<CommandEncoderError>) {
        api_log!("CommandEncoder::begin_compute_pass {encoder_id:?}");

        let cmd_buf = self.command_encoder(encoder_id);
        let locked = cmd_buf.data.lock().lock_encoder();
        match locked {
            Ok(()) => (ComputePass::new(cmd_buf, desc), None),
            Err(error) => {
                if let CommandEncoderError::NotRecording = error {
                    cmd_buf.device.handle_error(
                        "CommandEncoder::begin_compute_pass",
                        desc.label.as_deref().unwrap_or_default().to_owned(),
                        error.clone(),
                    );
                }
                let pass_error = ComputePassError {
                    scope: PassErrorScope::Pass,
                    inner: ComputePassErrorInner::InvalidParentEncoder,
                };
                (ComputePass::new_invalid(desc, pass_error), Some(error))
            }
        }
    }

    /// Ends the pass, validating everything it recorded.
    ///
    /// A failure invalidates the parent encoder; `command_encoder_finish`
    /// reports it.
    pub fn compute_pass_end(&self, pass: ComputePass) -> Result<(), ComputePassError> {
        api_log!("ComputePass::end {:?}", pass.label());

        let ComputePass { base, parent } = pass;
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

        let result = if let Some(error) = base.error.clone() {
            Err(error)
        } else {
            validate_compute_pass(&cmd_buf.device, &mut data.trackers, base)
        };
        if let Err(ref error) = result {
            data.invalidate(error.clone().into());
        }
        result
    }

    pub fn compute_pass_set_bind_group(
        &self,
        pass: &mut ComputePass,
        index: u32,
        bind_group_id: id::BindGroupId,
        offsets: &[DynamicOffset],
    ) -> Result<(), ComputePassError> {
        api_log!("ComputePass::set_bind_group {index} {bind_group_id:?}");

        pass.record(PassErrorScope::SetBindGroup { index }, |device, base| {
            let bind_group = self.hub.bind_groups.get(bind_group_id).get()?;
            bind_group.same_device(device)?;
            base.dynamic_offsets.extend_from_slice(offsets);
            base.commands.push(ComputeCommand::SetBindGroup {
                index,
                num_dynamic_offsets: offsets.len(),
                bind_group,
            });
            Ok(())
        })
    }

    pub fn compute_pass_set_pipeline(
        &self,
        pass: &mut ComputePass,
        pipeline_id: id::ComputePipelineId,
    ) -> Result<(), ComputePassError> {
        api_log!("ComputePass::set_pipeline {pipeline_id:?}");

        pass.record(PassErrorScope::SetPipelineCompute, |device, base| {
            let pipeline = self.hub.compute_pipelines.get(pipeline_id).get()?;
            pipeline.same_device(device)?;
            base.commands.push(ComputeCommand::SetPipeline(pipeline));
            Ok(())
        })
    }

    pub fn compute_pass_dispatch_workgroups(
        &self,
        pass: &mut ComputePass,
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    ) -> Result<(), ComputePassError> {
        api_log!("ComputePass::dispatch {groups_x} {groups_y} {groups_z}");

        pass.record(PassErrorScope::Dispatch { indirect: false }, |_, base| {
            base.commands
                .push(ComputeCommand::Dispatch([groups_x, groups_y, groups_z]));
            Ok(())
        })
    }

    pub fn compute_pass_dispatch_workgroups_indirect(
        &self,
        pass: &mut ComputePass,
        buffer_id: id::BufferId,
        offset: BufferAddress,
    ) -> Result<(), ComputePassError> {
        api_log!("ComputePass::dispatch_indirect {buffer_id:?} {offset}");

        pass.record(PassErrorScope::Dispatch { indirect: true }, |device, base| {
            let buffer = self.hub.buffers.get(buffer_id).get()?;
            buffer.same_device(device)?;
            base.commands
                .push(ComputeCommand::DispatchIndirect { buffer, offset });
            Ok(())
        })
    }

    pub fn compute_pass_push_debug_group(
        &self,
        pass: &mut ComputePass,
        label: &str,
    ) -> Result<(), ComputePassError> {
        api_log!("ComputePass::push_debug_group {label}");

        pass.record(PassErrorScope::PushDebugGroup, |_, base| {
            let len = base.push_debug_string(label);
            base.commands.push(ComputeCommand::PushDebugGroup { len });
            Ok(())
        })
    }

    pub fn compute_pass_pop_debug_group(
        &self,
        pass: &mut ComputePass,
    ) -> Result<(), ComputePassError> {
        api_log!("ComputePass::pop_debug_group");

        pass.record(PassErrorScope::PopDebugGroup, |_, base| {
            base.commands.push(ComputeCommand::PopDebugGroup);
            Ok(())
        })
    }

    pub fn compute_pass_insert_debug_marker(
        &self,
        pass: &mut ComputePass,
        label: &str,
    ) -> Result<(), ComputePassError> {
        api_log!("ComputePass::insert_debug_marker {label}");

        pass.record(PassErrorScope::InsertDebugMarker, |_, base| {
            let len = base.push_debug_string(label);
            base.commands.push(ComputeCommand::InsertDebugMarker { len });
            Ok(())
        })
    }
}
