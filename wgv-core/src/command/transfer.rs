use thiserror::Error;
use wgt::BufferAddress;

use crate::{
    error::{ErrorType, WebGpuError},
    global::Global,
    id::{BufferId, CommandEncoderId},
    resource::{Labeled, MissingBufferUsageError, ParentDevice, ResourceErrorIdent},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CopySide {
    Source,
    Destination,
}

/// Error encountered while attempting a data transfer.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum TransferError {
    #[error(transparent)]
    MissingBufferUsage(#[from] MissingBufferUsageError),
    #[error("Copy of {start_offset}..{end_offset} would end up overrunning the bounds of the {side:?} buffer of size {buffer_size}")]
    BufferOverrun {
        start_offset: BufferAddress,
        end_offset: BufferAddress,
        buffer_size: BufferAddress,
        side: CopySide,
    },
    #[error("Copy size {0} does not respect `COPY_BUFFER_ALIGNMENT`")]
    UnalignedCopySize(BufferAddress),
    #[error("Buffer offset {0} is not aligned to block size or `COPY_BUFFER_ALIGNMENT`")]
    UnalignedBufferOffset(BufferAddress),
    #[error("Copying within {buffer} from {src_offset} to {dst_offset} with size {size} overlaps itself")]
    OverlappingCopy {
        buffer: ResourceErrorIdent,
        src_offset: BufferAddress,
        dst_offset: BufferAddress,
        size: BufferAddress,
    },
}

impl WebGpuError for TransferError {
    fn webgpu_error_type(&self) -> ErrorType {
        ErrorType::Validation
    }
}

/// Checks `offset..offset + size` against a buffer of `buffer_size` bytes,
/// without overflowing.
fn check_copy_range(
    offset: BufferAddress,
    size: BufferAddress,
    buffer_size: BufferAddress,
    side: CopySide,
) -> Result<(), TransferError> {
    match offset.checked_add(size) {
        Some(end) if end <= buffer_size => Ok(()),
        end => Err(TransferError::BufferOverrun {
            start_offset: offset,
            end_offset: end.unwrap_or(BufferAddress::MAX),
            buffer_size,
            side,
        }),
    }
}

impl Global {
    pub fn command_encoder_copy_buffer_to_buffer(
        &self,
        command_encoder_id: CommandEncoderId,
        source: BufferId,
        source_offset: BufferAddress,
        destination: BufferId,
        destination_offset: BufferAddress,
        size: BufferAddress,
    ) -> Result<(), super::CommandEncoderError> {
        api_log!(
            "CommandEncoder::copy_buffer_to_buffer {source:?} -> {destination:?} {size:?}bytes"
        );

        let cmd_buf = self.command_encoder(command_encoder_id);
        cmd_buf.record("CommandEncoder::copy_buffer_to_buffer", |data| {
            let device = &cmd_buf.device;
            device.check_is_valid()?;

            let src_buffer = self.hub.buffers.get(source).get()?;
            src_buffer.same_device(device)?;
            src_buffer.check_destroyed()?;
            src_buffer
                .check_usage(wgt::BufferUsages::COPY_SRC)
                .map_err(TransferError::from)?;

            let dst_buffer = self.hub.buffers.get(destination).get()?;
            dst_buffer.same_device(device)?;
            dst_buffer.check_destroyed()?;
            dst_buffer
                .check_usage(wgt::BufferUsages::COPY_DST)
                .map_err(TransferError::from)?;

            if size % wgt::COPY_BUFFER_ALIGNMENT != 0 {
                return Err(TransferError::UnalignedCopySize(size).into());
            }
            if source_offset % wgt::COPY_BUFFER_ALIGNMENT != 0 {
                return Err(TransferError::UnalignedBufferOffset(source_offset).into());
            }
            if destination_offset % wgt::COPY_BUFFER_ALIGNMENT != 0 {
                return Err(TransferError::UnalignedBufferOffset(destination_offset).into());
            }

            check_copy_range(source_offset, size, src_buffer.size, CopySide::Source)?;
            check_copy_range(
                destination_offset,
                size,
                dst_buffer.size,
                CopySide::Destination,
            )?;

            // Both ranges are in bounds, so the sums cannot overflow.
            if std::sync::Arc::ptr_eq(&src_buffer, &dst_buffer)
                && source_offset < destination_offset + size
                && destination_offset < source_offset + size
            {
                return Err(TransferError::OverlappingCopy {
                    buffer: src_buffer.error_ident(),
                    src_offset: source_offset,
                    dst_offset: destination_offset,
                    size,
                }
                .into());
            }

            if size == 0 {
                log::trace!("Ignoring copy_buffer_to_buffer of size 0");
            }

            data.trackers.buffers.insert_single(src_buffer);
            data.trackers.buffers.insert_single(dst_buffer);
            Ok(())
        })
    }
}
