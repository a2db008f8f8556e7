use std::sync::Arc;

use thiserror::Error;

use crate::{
    command::{CommandBuffer, CommandEncoderStatus},
    device::{Device, DeviceError},
    error::{ErrorType, WebGpuError},
    global::Global,
    id,
    resource::{DestroyedResourceError, Labeled, ParentDevice, ResourceErrorIdent},
};

/// The queue of a device. Submission is where command buffers meet the
/// current state of the resources they use.
pub struct Queue {
    pub(crate) device: Arc<Device>,
    /// The `label` from the descriptor used to create the resource.
    pub(crate) label: String,
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue").field("label", &self.label).finish()
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        resource_log!("Drop {}", self.error_ident());
    }
}

crate::resource_traits!(Queue);

impl Queue {
    pub(crate) fn new(device: Arc<Device>) -> Self {
        Self {
            label: device.label.clone(),
            device,
        }
    }
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum QueueSubmitError {
    #[error(transparent)]
    Queue(#[from] DeviceError),
    #[error(transparent)]
    DestroyedResource(#[from] DestroyedResourceError),
    #[error("{0} is still mapped")]
    BufferStillMapped(ResourceErrorIdent),
    #[error("{0} is not finished")]
    CommandBufferNotFinished(ResourceErrorIdent),
    #[error("{0} was already submitted")]
    CommandBufferAlreadySubmitted(ResourceErrorIdent),
    #[error("{0} is invalid")]
    InvalidCommandBuffer(ResourceErrorIdent),
}

impl WebGpuError for QueueSubmitError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Queue(e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

/// Checks that a finished command buffer may run against the current
/// state of everything it uses.
fn validate_command_buffer(
    queue: &Queue,
    cmd_buf: &CommandBuffer,
    status: &CommandEncoderStatus,
) -> Result<(), QueueSubmitError> {
    cmd_buf.same_device_as(queue)?;

    match *status {
        CommandEncoderStatus::Finished => {}
        CommandEncoderStatus::Submitted => {
            return Err(QueueSubmitError::CommandBufferAlreadySubmitted(
                cmd_buf.error_ident(),
            ))
        }
        CommandEncoderStatus::Recording | CommandEncoderStatus::Locked => {
            return Err(QueueSubmitError::CommandBufferNotFinished(
                cmd_buf.error_ident(),
            ))
        }
        CommandEncoderStatus::Error(_) => {
            return Err(QueueSubmitError::InvalidCommandBuffer(
                cmd_buf.error_ident(),
            ))
        }
    }
    Ok(())
}

impl Global {
    /// Submits command buffers to the queue.
    ///
    /// Nothing is executed; the submission validates each command buffer
    /// against the resources it uses, then retires it. A failure submits
    /// none of the command buffers.
    pub fn queue_submit(
        &self,
        queue_id: id::QueueId,
        command_buffer_ids: &[id::CommandBufferId],
    ) -> Result<(), QueueSubmitError> {
        api_log!("Queue::submit {queue_id:?}");

        let queue = self.hub.queues.get(queue_id);
        let result = self.submit(&queue, command_buffer_ids);
        if let Err(ref e) = result {
            queue
                .device
                .handle_error("Queue::submit", queue.label.clone(), e.clone());
        }
        result
    }

    fn submit(
        &self,
        queue: &Arc<Queue>,
        command_buffer_ids: &[id::CommandBufferId],
    ) -> Result<(), QueueSubmitError> {
        queue.device.check_is_valid()?;

        let command_buffers = command_buffer_ids
            .iter()
            .map(|&id| self.hub.command_buffers.get(id))
            .collect::<Vec<_>>();

        // The same command buffer may appear twice in one submission.
        for (i, cmd_buf) in command_buffers.iter().enumerate() {
            if command_buffers[..i]
                .iter()
                .any(|other| Arc::ptr_eq(other, cmd_buf))
            {
                return Err(QueueSubmitError::CommandBufferAlreadySubmitted(
                    cmd_buf.error_ident(),
                ));
            }
        }

        for cmd_buf in command_buffers.iter() {
            let data = cmd_buf.lock_data();
            validate_command_buffer(queue, cmd_buf, &data.status)?;

            for buffer in data.trackers.buffers.used_resources() {
                buffer.check_destroyed()?;
                if buffer.is_mapped() {
                    return Err(QueueSubmitError::BufferStillMapped(buffer.error_ident()));
                }
            }
            for texture in data.trackers.textures.used_resources() {
                texture.check_destroyed()?;
            }
        }

        for cmd_buf in command_buffers.iter() {
            let mut data = cmd_buf.lock_data();
            data.status = CommandEncoderStatus::Submitted;
            // Submitted command buffers no longer keep their resources alive.
            data.trackers = crate::track::Tracker::new();
        }

        log::trace!(
            "Queue::submit validated {} command buffer(s)",
            command_buffers.len()
        );
        Ok(())
    }

    pub fn queue_drop(&self, queue_id: id::QueueId) {
        api_log!("Queue::drop {queue_id:?}");

        self.hub.queues.remove(queue_id);
    }
}
