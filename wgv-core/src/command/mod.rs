mod bind;
mod bundle;
mod clear;
mod compute;
mod draw;
mod render;
mod transfer;

pub use self::{bundle::*, clear::*, compute::*, draw::*, render::*, transfer::*};

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;

use crate::{
    device::{Device, DeviceError},
    error::{ErrorType, WebGpuError},
    global::Global,
    id,
    resource::{DestroyedResourceError, InvalidResourceError, Labeled},
    track::Tracker,
    Label, LabelHelpers,
};

#[derive(Clone, Debug)]
pub(crate) enum CommandEncoderStatus {
    /// Ready to record commands.
    Recording,
    /// A pass borrows the encoder until it ends.
    Locked,
    /// `finish` succeeded; the command buffer may be submitted once.
    Finished,
    /// The command buffer went through a queue submission.
    Submitted,
    /// A recorded command was invalid. `finish` reports the stored error.
    Error(CommandEncoderError),
}

#[derive(Debug)]
pub(crate) struct CommandBufferMutable {
    pub(crate) status: CommandEncoderStatus,
    /// Every resource a successfully recorded command touched.
    pub(crate) trackers: Tracker,
    debug_scope_depth: u32,
}

impl CommandBufferMutable {
    /// Moves a recording encoder into the locked state for the duration of a pass.
    fn lock_encoder(&mut self) -> Result<(), CommandEncoderError> {
        match self.status {
            CommandEncoderStatus::Recording => {
                self.status = CommandEncoderStatus::Locked;
                Ok(())
            }
            CommandEncoderStatus::Locked => {
                self.invalidate(CommandEncoderError::Locked);
                Err(CommandEncoderError::Locked)
            }
            CommandEncoderStatus::Finished | CommandEncoderStatus::Submitted => {
                Err(CommandEncoderError::NotRecording)
            }
            CommandEncoderStatus::Error(ref e) => Err(e.clone()),
        }
    }

    /// Returns `false` if the encoder failed while the pass was open, in which
    /// case the pass is not validated.
    fn unlock_encoder(&mut self) -> bool {
        match self.status {
            CommandEncoderStatus::Locked => {
                self.status = CommandEncoderStatus::Recording;
                true
            }
            _ => false,
        }
    }

    fn invalidate(&mut self, error: CommandEncoderError) {
        if !matches!(self.status, CommandEncoderStatus::Error(_)) {
            self.status = CommandEncoderStatus::Error(error);
        }
    }
}

/// A command encoder, and the command buffer it turns into once finished.
///
/// Encoders and command buffers share an id index.
pub struct CommandBuffer {
    pub(crate) device: Arc<Device>,
    /// The `label` from the descriptor used to create the resource.
    label: String,
    pub(crate) data: Mutex<CommandBufferMutable>,
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("label", &self.label())
            .finish()
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        resource_log!("Drop {}", self.error_ident());
    }
}

crate::resource_traits!(CommandBuffer);

impl CommandBuffer {
    pub(crate) fn new(device: &Arc<Device>, label: &Label) -> Self {
        // Encoders created on a lost device are born invalid.
        let status = match device.check_is_valid() {
            Ok(()) => CommandEncoderStatus::Recording,
            Err(e) => CommandEncoderStatus::Error(e.into()),
        };
        CommandBuffer {
            device: device.clone(),
            label: label.to_string(),
            data: Mutex::new(CommandBufferMutable {
                status,
                trackers: Tracker::new(),
                debug_scope_depth: 0,
            }),
        }
    }

    /// Runs `f` on a recording encoder.
    ///
    /// A failure invalidates the encoder, and is reported when the encoder is
    /// finished. Recording on a finished encoder is reported right away.
    fn record<F>(&self, fn_ident: &'static str, f: F) -> Result<(), CommandEncoderError>
    where
        F: FnOnce(&mut CommandBufferMutable) -> Result<(), CommandEncoderError>,
    {
        let mut data = self.data.lock();
        let result = match data.status {
            CommandEncoderStatus::Recording => f(&mut data),
            CommandEncoderStatus::Locked => Err(CommandEncoderError::Locked),
            CommandEncoderStatus::Finished | CommandEncoderStatus::Submitted => {
                drop(data);
                let error = CommandEncoderError::NotRecording;
                self.device
                    .handle_error(fn_ident, self.label.clone(), error.clone());
                return Err(error);
            }
            CommandEncoderStatus::Error(ref e) => return Err(e.clone()),
        };
        if let Err(ref e) = result {
            data.invalidate(e.clone());
        }
        result
    }

    pub(crate) fn lock_data(&self) -> MutexGuard<'_, CommandBufferMutable> {
        self.data.lock()
    }
}

/// A stream of commands for a render pass, compute pass or render bundle.
///
/// This also contains side tables referred to by certain commands,
/// like dynamic offsets for [`SetBindGroup`] or string data for
/// [`InsertDebugMarker`]. Ids are resolved when a command is recorded;
/// everything else is validated when the pass ends.
///
/// [`SetBindGroup`]: RenderCommand::SetBindGroup
/// [`InsertDebugMarker`]: RenderCommand::InsertDebugMarker
#[doc(hidden)]
#[derive(Debug)]
pub struct BasePass<C, E> {
    pub label: Option<String>,

    /// The first error hit while recording. Later commands are dropped.
    pub error: Option<E>,

    /// The stream of commands.
    pub commands: Vec<C>,

    /// Dynamic offsets consumed by [`SetBindGroup`] commands in `commands`.
    ///
    /// Each successive `SetBindGroup` consumes the next
    /// [`num_dynamic_offsets`] values from this list.
    ///
    /// [`SetBindGroup`]: RenderCommand::SetBindGroup
    /// [`num_dynamic_offsets`]: RenderCommand::SetBindGroup::num_dynamic_offsets
    pub dynamic_offsets: Vec<wgt::DynamicOffset>,

    /// Strings used by debug instructions.
    ///
    /// Each successive [`PushDebugGroup`] or [`InsertDebugMarker`]
    /// instruction consumes the next `len` bytes from this vector.
    ///
    /// [`PushDebugGroup`]: RenderCommand::PushDebugGroup
    /// [`InsertDebugMarker`]: RenderCommand::InsertDebugMarker
    pub string_data: Vec<u8>,
}

impl<C, E> BasePass<C, E> {
    fn new(label: &Label) -> Self {
        Self {
            label: label.as_ref().map(|cow| cow.to_string()),
            error: None,
            commands: Vec::new(),
            dynamic_offsets: Vec::new(),
            string_data: Vec::new(),
        }
    }

    fn new_invalid(label: &Label, error: E) -> Self {
        Self {
            error: Some(error),
            ..Self::new(label)
        }
    }

    /// Keeps the first recording error.
    fn store_error(&mut self, error: E) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn push_debug_string(&mut self, label: &str) -> usize {
        let bytes = label.as_bytes();
        self.string_data.extend_from_slice(bytes);
        bytes.len()
    }
}

/// Reads the strings of debug commands back from a pass, in order.
struct DebugStrings<'a> {
    data: &'a [u8],
}

impl<'a> DebugStrings<'a> {
    fn next(&mut self, len: usize) -> &'a str {
        let len = len.min(self.data.len());
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        // The bytes were pushed from a `&str`.
        std::str::from_utf8(head).unwrap_or("")
    }
}

/// Tracks the debug group nesting of one encoder, pass or bundle.
#[derive(Debug, Default)]
struct DebugScope {
    depth: u32,
}

impl DebugScope {
    fn push(&mut self, label: &str) {
        log::trace!("push debug group {label:?} at depth {}", self.depth);
        self.depth += 1;
    }

    fn pop(&mut self) -> Result<(), DebugGroupError> {
        if self.depth == 0 {
            return Err(DebugGroupError::InvalidPop);
        }
        self.depth -= 1;
        Ok(())
    }

    fn finish(&self) -> Result<(), DebugGroupError> {
        if self.depth != 0 {
            return Err(DebugGroupError::MissingPop { count: self.depth });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum DebugGroupError {
    #[error("Cannot pop debug group, because number of pushed debug groups is zero")]
    InvalidPop,
    #[error("A debug group was not popped before the encoder was finished ({count} still open)")]
    MissingPop { count: u32 },
}

impl WebGpuError for DebugGroupError {
    fn webgpu_error_type(&self) -> ErrorType {
        ErrorType::Validation
    }
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ColorAttachmentError {
    #[error("Too many color attachments: {given}, limit is {limit}")]
    TooMany { given: usize, limit: usize },
}

impl WebGpuError for ColorAttachmentError {
    fn webgpu_error_type(&self) -> ErrorType {
        ErrorType::Validation
    }
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CommandEncoderError {
    #[error("Command encoder is invalid")]
    Invalid,
    #[error("Command encoder must be active")]
    NotRecording,
    #[error("Command encoder is locked by a previously created render/compute pass. Before recording any new commands, the pass must be ended.")]
    Locked,
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    InvalidResource(#[from] InvalidResourceError),
    #[error(transparent)]
    DestroyedResource(#[from] DestroyedResourceError),
    #[error(transparent)]
    DebugGroup(#[from] DebugGroupError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Clear(#[from] ClearError),
    #[error(transparent)]
    ComputePass(#[from] ComputePassError),
    #[error(transparent)]
    RenderPass(#[from] RenderPassError),
}

impl WebGpuError for CommandEncoderError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Device(e) => e.webgpu_error_type(),
            Self::ComputePass(e) => e.webgpu_error_type(),
            Self::RenderPass(e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

pub(crate) trait MapPassErr<T, O> {
    fn map_pass_err(self, scope: PassErrorScope) -> Result<T, O>;
}

/// The command of a pass an error is attributed to.
#[derive(Clone, Copy, Debug, Error)]
pub enum PassErrorScope {
    #[error("In a bundle parameter")]
    Bundle,
    #[error("In a pass parameter")]
    Pass,
    #[error("In a set_bind_group command")]
    SetBindGroup { index: u32 },
    #[error("In a set_pipeline command")]
    SetPipelineRender,
    #[error("In a set_pipeline command")]
    SetPipelineCompute,
    #[error("In a set_vertex_buffer command")]
    SetVertexBuffer { slot: u32 },
    #[error("In a set_index_buffer command")]
    SetIndexBuffer,
    #[error("In a set_viewport command")]
    SetViewport,
    #[error("In a set_scissor_rect command")]
    SetScissorRect,
    #[error("In a draw command, kind: {kind:?}, indexed: {indexed}")]
    Draw { kind: DrawKind, indexed: bool },
    #[error("In a execute_bundle command")]
    ExecuteBundle,
    #[error("In a dispatch command, indirect:{indirect}")]
    Dispatch { indirect: bool },
    #[error("In a push_debug_group command")]
    PushDebugGroup,
    #[error("In a pop_debug_group command")]
    PopDebugGroup,
    #[error("In a insert_debug_marker command")]
    InsertDebugMarker,
}

impl Global {
    fn command_encoder(&self, encoder_id: id::CommandEncoderId) -> Arc<CommandBuffer> {
        self.hub
            .command_buffers
            .get(encoder_id.into_command_buffer_id())
    }

    pub fn command_encoder_finish(
        &self,
        encoder_id: id::CommandEncoderId,
        desc: &wgt::CommandBufferDescriptor<Label>,
    ) -> (id::CommandBufferId, Option<CommandEncoderError>) {
        api_log!("CommandEncoder::finish {encoder_id:?}");

        let cmd_buf = self.command_encoder(encoder_id);

        let error = {
            let mut data = cmd_buf.data.lock();
            match data.status {
                CommandEncoderStatus::Recording => {
                    let depth = data.debug_scope_depth;
                    match (DebugScope { depth }).finish() {
                        Ok(()) => {
                            data.status = CommandEncoderStatus::Finished;
                            log::trace!("Command buffer {encoder_id:?} finished");
                            None
                        }
                        Err(e) => {
                            let e = CommandEncoderError::from(e);
                            data.invalidate(e.clone());
                            Some(e)
                        }
                    }
                }
                CommandEncoderStatus::Locked => {
                    data.invalidate(CommandEncoderError::Locked);
                    Some(CommandEncoderError::Locked)
                }
                CommandEncoderStatus::Finished | CommandEncoderStatus::Submitted => {
                    Some(CommandEncoderError::NotRecording)
                }
                CommandEncoderStatus::Error(ref e) => Some(e.clone()),
            }
        };

        if let Some(ref e) = error {
            let label = desc.label.to_string();
            cmd_buf.device.handle_error(
                "CommandEncoder::finish",
                if label.is_empty() { cmd_buf.label.clone() } else { label },
                e.clone(),
            );
        }

        (encoder_id.into_command_buffer_id(), error)
    }

    pub fn command_encoder_push_debug_group(
        &self,
        encoder_id: id::CommandEncoderId,
        label: &str,
    ) -> Result<(), CommandEncoderError> {
        api_log!("CommandEncoder::push_debug_group {label}");

        let cmd_buf = self.command_encoder(encoder_id);
        cmd_buf.record("CommandEncoder::push_debug_group", |data| {
            let mut scope = DebugScope {
                depth: data.debug_scope_depth,
            };
            scope.push(label);
            data.debug_scope_depth = scope.depth;
            Ok(())
        })
    }

    pub fn command_encoder_insert_debug_marker(
        &self,
        encoder_id: id::CommandEncoderId,
        label: &str,
    ) -> Result<(), CommandEncoderError> {
        api_log!("CommandEncoder::insert_debug_marker {label}");

        let cmd_buf = self.command_encoder(encoder_id);
        cmd_buf.record("CommandEncoder::insert_debug_marker", |_| Ok(()))
    }

    pub fn command_encoder_pop_debug_group(
        &self,
        encoder_id: id::CommandEncoderId,
    ) -> Result<(), CommandEncoderError> {
        api_log!("CommandEncoder::pop_debug_group");

        let cmd_buf = self.command_encoder(encoder_id);
        cmd_buf.record("CommandEncoder::pop_debug_group", |data| {
            let mut scope = DebugScope {
                depth: data.debug_scope_depth,
            };
            scope.pop()?;
            data.debug_scope_depth = scope.depth;
            Ok(())
        })
    }
}
