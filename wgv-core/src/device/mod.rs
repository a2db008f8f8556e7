use crate::{
    error::{ErrorType, WebGpuError},
    resource::{BufferAccessResult, BufferMapOperation, ResourceErrorIdent},
};

use arrayvec::ArrayVec;
use thiserror::Error;
use wgt::{TextureFormat, MAX_COLOR_ATTACHMENTS};

use std::fmt;

pub(crate) mod bgl;
pub mod global;
pub mod queue;
pub mod resource;

pub use resource::Device;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostMap {
    Read,
    Write,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub(crate) struct AttachmentData<T> {
    pub colors: ArrayVec<Option<T>, MAX_COLOR_ATTACHMENTS>,
    pub depth_stencil: Option<T>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum RenderPassCompatibilityCheckType {
    RenderPipeline,
    RenderBundle,
}

/// The attachment formats and sample count a render pass, pipeline or bundle
/// was built for.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub(crate) struct RenderPassContext {
    pub attachments: AttachmentData<TextureFormat>,
    pub sample_count: u32,
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum RenderPassCompatibilityError {
    #[error(
        "Incompatible color attachments at indices {indices:?}: the {res} uses attachments with formats {expected:?} but the {ty:?} uses attachments with formats {actual:?}",
    )]
    IncompatibleColorAttachment {
        indices: Vec<usize>,
        expected: Vec<Option<TextureFormat>>,
        actual: Vec<Option<TextureFormat>>,
        res: ResourceErrorIdent,
        ty: RenderPassCompatibilityCheckType,
    },
    #[error(
        "Incompatible depth-stencil attachment format: the {res} uses an attachment with format {expected:?} but the {ty:?} uses an attachment with format {actual:?}",
    )]
    IncompatibleDepthStencilAttachment {
        expected: Option<TextureFormat>,
        actual: Option<TextureFormat>,
        res: ResourceErrorIdent,
        ty: RenderPassCompatibilityCheckType,
    },
    #[error(
        "Incompatible sample count: the {res} uses {expected} but the {ty:?} uses {actual}",
    )]
    IncompatibleSampleCount {
        expected: u32,
        actual: u32,
        res: ResourceErrorIdent,
        ty: RenderPassCompatibilityCheckType,
    },
}

impl WebGpuError for RenderPassCompatibilityError {
    fn webgpu_error_type(&self) -> ErrorType {
        ErrorType::Validation
    }
}

fn trim_colors(colors: &[Option<TextureFormat>]) -> &[Option<TextureFormat>] {
    let len = colors.iter().rposition(Option::is_some).map_or(0, |idx| idx + 1);
    &colors[..len]
}

impl RenderPassContext {
    // Assumes the renderpass only contains one subpass
    pub(crate) fn check_compatible(
        &self,
        other: &Self,
        res: ResourceErrorIdent,
        ty: RenderPassCompatibilityCheckType,
    ) -> Result<(), RenderPassCompatibilityError> {
        // Trailing empty color slots do not count.
        let expected = trim_colors(&self.attachments.colors);
        let actual = trim_colors(&other.attachments.colors);
        if expected != actual {
            let indices = (0..expected.len().max(actual.len()))
                .filter(|&idx| expected.get(idx).copied().flatten() != actual.get(idx).copied().flatten())
                .collect();
            return Err(RenderPassCompatibilityError::IncompatibleColorAttachment {
                indices,
                expected: expected.to_vec(),
                actual: actual.to_vec(),
                res,
                ty,
            });
        }
        if self.attachments.depth_stencil != other.attachments.depth_stencil {
            return Err(
                RenderPassCompatibilityError::IncompatibleDepthStencilAttachment {
                    expected: self.attachments.depth_stencil,
                    actual: other.attachments.depth_stencil,
                    res,
                    ty,
                },
            );
        }
        if self.sample_count != other.sample_count {
            return Err(RenderPassCompatibilityError::IncompatibleSampleCount {
                expected: self.sample_count,
                actual: other.sample_count,
                res,
                ty,
            });
        }
        Ok(())
    }
}

pub type BufferMapPendingClosure = (BufferMapOperation, BufferAccessResult);

/// Fires the given map callbacks in order.
///
/// Must be called without holding any lock, since a callback may call back
/// into the buffer it was registered on.
pub(crate) fn fire_map_callbacks<I: IntoIterator<Item = BufferMapPendingClosure>>(callbacks: I) {
    for (operation, status) in callbacks {
        if let Some(callback) = operation.callback {
            callback(status);
        }
    }
}

pub type DeviceLostCallback = Box<dyn FnOnce(wgt::DeviceLostReason, String) + Send + 'static>;

pub struct DeviceLostClosure {
    pub callback: DeviceLostCallback,
}

impl fmt::Debug for DeviceLostClosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLostClosure").finish_non_exhaustive()
    }
}

impl DeviceLostClosure {
    pub(crate) fn call(self, reason: wgt::DeviceLostReason, message: String) {
        (self.callback)(reason, message)
    }
}

#[derive(Clone, Debug, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceMismatch {
    pub(super) res: ResourceErrorIdent,
    pub(super) res_device: ResourceErrorIdent,
    pub(super) target: Option<ResourceErrorIdent>,
    pub(super) target_device: ResourceErrorIdent,
}

impl fmt::Display for DeviceMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "{} of {} doesn't match {}",
            self.res_device, self.res, self.target_device
        )?;
        if let Some(target) = self.target.as_ref() {
            write!(f, " of {target}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum DeviceError {
    #[error("Parent device is lost")]
    Lost,
    #[error("Not enough memory left.")]
    OutOfMemory,
    #[error(transparent)]
    DeviceMismatch(#[from] Box<DeviceMismatch>),
}

impl WebGpuError for DeviceError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Lost => ErrorType::DeviceLost,
            Self::OutOfMemory => ErrorType::OutOfMemory,
            Self::DeviceMismatch(_) => ErrorType::Validation,
        }
    }
}

#[derive(Clone, Debug, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("Features {0:?} are required but not enabled on the device")]
pub struct MissingFeatures(pub wgt::Features);

impl WebGpuError for MissingFeatures {
    fn webgpu_error_type(&self) -> ErrorType {
        ErrorType::Validation
    }
}

#[derive(Clone, Debug, Error)]
#[error("Limit '{name}' value {requested} is better than allowed {allowed}")]
pub struct FailedLimit {
    name: &'static str,
    requested: u64,
    allowed: u64,
}

pub(crate) fn check_limits(requested: &wgt::Limits, allowed: &wgt::Limits) -> Vec<FailedLimit> {
    requested
        .violations(allowed)
        .into_iter()
        .map(|(name, requested, allowed)| FailedLimit {
            name,
            requested,
            allowed,
        })
        .collect()
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum RequestDeviceError {
    #[error(transparent)]
    LimitsExceeded(#[from] FailedLimit),
    #[error("Unsupported features were requested: {0:?}")]
    UnsupportedFeature(wgt::Features),
}

impl WebGpuError for RequestDeviceError {
    fn webgpu_error_type(&self) -> ErrorType {
        ErrorType::Validation
    }
}

#[test]
fn test_check_limits() {
    let requested = wgt::Limits {
        max_bind_groups: 16,
        ..wgt::Limits::default()
    };
    let failed = check_limits(&requested, &wgt::Limits::supported());
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].name, "max_bind_groups");
    assert!(check_limits(&wgt::Limits::default(), &wgt::Limits::supported()).is_empty());
}
