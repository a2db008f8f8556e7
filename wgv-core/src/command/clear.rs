use thiserror::Error;
use wgt::{BufferAddress, BufferSize};

use crate::{
    command::CommandEncoderError,
    error::{ErrorType, WebGpuError},
    global::Global,
    id::{BufferId, CommandEncoderId},
    resource::{MissingBufferUsageError, ParentDevice},
};

/// Error encountered while attempting a clear.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ClearError {
    #[error("Buffer clear size {0:?} is not a multiple of `COPY_BUFFER_ALIGNMENT`")]
    UnalignedFillSize(BufferAddress),
    #[error("Buffer offset {0:?} is not a multiple of `COPY_BUFFER_ALIGNMENT`")]
    UnalignedBufferOffset(BufferAddress),
    #[error("Clear of {start_offset}..{end_offset} would end up overrunning the bounds of the buffer of size {buffer_size}")]
    BufferOverrun {
        start_offset: BufferAddress,
        end_offset: BufferAddress,
        buffer_size: BufferAddress,
    },
    #[error(transparent)]
    MissingBufferUsage(#[from] MissingBufferUsageError),
}

impl WebGpuError for ClearError {
    fn webgpu_error_type(&self) -> ErrorType {
        ErrorType::Validation
    }
}

impl Global {
    /// Clears `size` bytes at `offset`, or the rest of the buffer if `size`
    /// is `None`.
    pub fn command_encoder_clear_buffer(
        &self,
        command_encoder_id: CommandEncoderId,
        dst: BufferId,
        offset: BufferAddress,
        size: Option<BufferSize>,
    ) -> Result<(), CommandEncoderError> {
        api_log!("CommandEncoder::clear_buffer {dst:?}");

        let cmd_buf = self.command_encoder(command_encoder_id);
        cmd_buf.record("CommandEncoder::clear_buffer", |data| {
            let device = &cmd_buf.device;
            device.check_is_valid()?;

            let dst_buffer = self.hub.buffers.get(dst).get()?;
            dst_buffer.same_device(device)?;
            dst_buffer.check_destroyed()?;
            dst_buffer
                .check_usage(wgt::BufferUsages::COPY_DST)
                .map_err(ClearError::from)?;

            // Check if offset & size are valid.
            if offset % wgt::COPY_BUFFER_ALIGNMENT != 0 {
                return Err(ClearError::UnalignedBufferOffset(offset).into());
            }
            let size = match size {
                Some(size) => size.get(),
                None => dst_buffer.size.saturating_sub(offset),
            };
            if size % wgt::COPY_BUFFER_ALIGNMENT != 0 {
                return Err(ClearError::UnalignedFillSize(size).into());
            }
            let end_offset = offset.checked_add(size);
            match end_offset {
                Some(end) if end <= dst_buffer.size => {}
                _ => {
                    return Err(ClearError::BufferOverrun {
                        start_offset: offset,
                        end_offset: end_offset.unwrap_or(BufferAddress::MAX),
                        buffer_size: dst_buffer.size,
                    }
                    .into())
                }
            }

            if size == 0 {
                log::trace!("Ignoring clear_buffer of size 0");
            }

            data.trackers.buffers.insert_single(dst_buffer);
            Ok(())
        })
    }
}
