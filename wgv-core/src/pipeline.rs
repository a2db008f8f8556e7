use crate::{
    binding_model::{CreateBindGroupLayoutError, CreatePipelineLayoutError, PipelineLayout},
    command::ColorAttachmentError,
    device::{Device, DeviceError, RenderPassContext},
    error::{ErrorType, WebGpuError},
    id::{PipelineLayoutId, ShaderModuleId},
    resource::{InvalidResourceError, Labeled},
    validation, Label,
};

use arrayvec::ArrayVec;
use thiserror::Error;

use std::{borrow::Cow, sync::Arc};

/// Minimum sizes of the unsized buffer bindings in one group, checked
/// when a draw or dispatch happens.
#[derive(Debug, Default)]
pub(crate) struct LateSizedBufferGroup {
    /// Binding index and the structure size the shader needs there, for every
    /// buffer binding whose layout entry has no `min_binding_size`.
    pub(crate) shader_sizes: Vec<(u32, wgt::BufferAddress)>,
}

/// Describes a shader module.
///
/// Shaders are never compiled: the module is described by the resources and
/// vertex inputs each of its entry points uses.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShaderModuleDescriptor<'a> {
    pub label: Label<'a>,
    pub interface: validation::ShaderInterface,
}

#[derive(Debug)]
pub struct ShaderModule {
    pub(crate) device: Arc<Device>,
    pub(crate) interface: validation::ShaderInterface,
    /// Label from the creating descriptor.
    pub(crate) label: String,
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        resource_log!("Drop {}", self.error_ident());
    }
}

crate::resource_traits!(ShaderModule);

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CreateShaderModuleError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("Entry point '{0}' is declared more than once")]
    DuplicateEntryPoint(String),
    #[error("Shader global binding {bind} uses group {group}, which exceeds the max_bind_groups limit of {limit}")]
    InvalidGroupIndex { bind: u32, group: u32, limit: u32 },
}

impl WebGpuError for CreateShaderModuleError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Device(e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

/// One shader stage of a pipeline.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgrammableStageDescriptor<'a> {
    /// Module holding the stage's interface.
    pub module: ShaderModuleId,
    /// `None` picks the module's only entry point for the stage.
    pub entry_point: Option<Cow<'a, str>>,
}

/// A [`ProgrammableStageDescriptor`] with its module resolved.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedProgrammableStageDescriptor<'a> {
    pub module: Arc<ShaderModule>,
    pub entry_point: Option<Cow<'a, str>>,
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ImplicitLayoutError {
    #[error(transparent)]
    BindGroup(#[from] CreateBindGroupLayoutError),
    #[error(transparent)]
    Pipeline(#[from] CreatePipelineLayoutError),
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComputePipelineDescriptor<'a> {
    pub label: Label<'a>,
    /// `None` derives a layout from the shader interface.
    ///
    /// Without one, a layout is derived from the shader.
    pub layout: Option<PipelineLayoutId>,
    pub stage: ProgrammableStageDescriptor<'a>,
}

#[derive(Clone, Debug)]
pub(crate) struct ResolvedComputePipelineDescriptor<'a> {
    pub label: Label<'a>,
    pub layout: Option<Arc<PipelineLayout>>,
    pub stage: ResolvedProgrammableStageDescriptor<'a>,
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CreateComputePipelineError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    InvalidResource(#[from] InvalidResourceError),
    #[error("Unable to derive an implicit layout")]
    Implicit(#[from] ImplicitLayoutError),
    #[error("Error matching shader requirements against the pipeline")]
    Stage(#[from] validation::StageError),
}

impl WebGpuError for CreateComputePipelineError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Device(e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

#[derive(Debug)]
pub struct ComputePipeline {
    pub(crate) layout: Arc<PipelineLayout>,
    pub(crate) device: Arc<Device>,
    pub(crate) _shader_module: Arc<ShaderModule>,
    pub(crate) late_sized_buffer_groups: ArrayVec<LateSizedBufferGroup, { wgt::MAX_BIND_GROUPS }>,
    /// Label from the creating descriptor.
    pub(crate) label: String,
}

impl Drop for ComputePipeline {
    fn drop(&mut self) {
        resource_log!("Drop {}", self.error_ident());
    }
}

crate::resource_traits!(ComputePipeline);

/// Layout of one vertex buffer slot.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexBufferLayout<'a> {
    pub array_stride: wgt::BufferAddress,
    pub step_mode: wgt::VertexStepMode,
    pub attributes: Cow<'a, [wgt::VertexAttribute]>,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexState<'a> {
    pub stage: ProgrammableStageDescriptor<'a>,
    /// Indexed by vertex buffer slot.
    pub buffers: Cow<'a, [VertexBufferLayout<'a>]>,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FragmentState<'a> {
    pub stage: ProgrammableStageDescriptor<'a>,
    /// Indexed by color attachment; `None` leaves the slot unused.
    pub targets: Cow<'a, [Option<wgt::ColorTargetState>]>,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderPipelineDescriptor<'a> {
    pub label: Label<'a>,
    /// `None` derives a layout from the shader interface.
    pub layout: Option<PipelineLayoutId>,
    pub vertex: VertexState<'a>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub primitive: wgt::PrimitiveState,
    #[cfg_attr(feature = "serde", serde(default))]
    pub depth_stencil: Option<wgt::DepthStencilState>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub multisample: wgt::MultisampleState,
    /// `None` makes a depth-only pipeline.
    pub fragment: Option<FragmentState<'a>>,
}

#[derive(Clone, Debug)]
pub(crate) struct ResolvedVertexState<'a> {
    pub stage: ResolvedProgrammableStageDescriptor<'a>,
    pub buffers: Cow<'a, [VertexBufferLayout<'a>]>,
}

#[derive(Clone, Debug)]
pub(crate) struct ResolvedFragmentState<'a> {
    pub stage: ResolvedProgrammableStageDescriptor<'a>,
    pub targets: Cow<'a, [Option<wgt::ColorTargetState>]>,
}

#[derive(Clone, Debug)]
pub(crate) struct ResolvedRenderPipelineDescriptor<'a> {
    pub label: Label<'a>,
    pub layout: Option<Arc<PipelineLayout>>,
    pub vertex: ResolvedVertexState<'a>,
    pub primitive: wgt::PrimitiveState,
    pub depth_stencil: Option<wgt::DepthStencilState>,
    pub multisample: wgt::MultisampleState,
    pub fragment: Option<ResolvedFragmentState<'a>>,
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ColorStateError {
    #[error("Format {0:?} is not renderable")]
    FormatNotRenderable(wgt::TextureFormat),
    #[error("Format {0:?} does not have a color aspect")]
    FormatNotColor(wgt::TextureFormat),
    #[error("Sample count {0} is not supported by format {1:?}")]
    InvalidSampleCount(u32, wgt::TextureFormat),
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum DepthStencilStateError {
    #[error("Format {0:?} is not a depth or stencil format")]
    FormatNotRenderable(wgt::TextureFormat),
    #[error("Format {0:?} does not have a depth aspect, but depth test/write is enabled")]
    FormatNotDepth(wgt::TextureFormat),
    #[error("Format {0:?} does not have a stencil aspect, but stencil write is enabled")]
    FormatNotStencil(wgt::TextureFormat),
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CreateRenderPipelineError {
    #[error(transparent)]
    ColorAttachment(#[from] ColorAttachmentError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    InvalidResource(#[from] InvalidResourceError),
    #[error("Unable to derive an implicit layout")]
    Implicit(#[from] ImplicitLayoutError),
    #[error("Color state [{0}] is invalid")]
    ColorState(u8, #[source] ColorStateError),
    #[error("Depth/stencil state is invalid")]
    DepthStencilState(#[from] DepthStencilStateError),
    #[error("Invalid sample count {0}")]
    InvalidSampleCount(u32),
    #[error("The number of vertex buffers {given} exceeds the limit {limit}")]
    TooManyVertexBuffers { given: u32, limit: u32 },
    #[error("The total number of vertex attributes {given} exceeds the limit {limit}")]
    TooManyVertexAttributes { given: u32, limit: u32 },
    #[error("Vertex buffer {index} stride {given} exceeds the limit {limit}")]
    VertexStrideTooLarge { index: u32, given: u32, limit: u32 },
    #[error("Vertex buffer {index} stride {stride} does not respect `VERTEX_STRIDE_ALIGNMENT`")]
    UnalignedVertexStride {
        index: u32,
        stride: wgt::BufferAddress,
    },
    #[error("Vertex attribute at location {location} has invalid offset {offset}")]
    InvalidVertexAttributeOffset {
        location: wgt::ShaderLocation,
        offset: wgt::BufferAddress,
    },
    #[error("Two or more vertex attributes were assigned to the same location in the shader: {0}")]
    ShaderLocationClash(u32),
    #[error("Strip index format was not set to None but to {strip_index_format:?} while using the non-strip topology {topology:?}")]
    StripIndexFormatForNonStripTopology {
        strip_index_format: Option<wgt::IndexFormat>,
        topology: wgt::PrimitiveTopology,
    },
    #[error("Fragment output at location {location} has no color target")]
    MissingColorTarget { location: wgt::ShaderLocation },
    #[error("Pipeline has neither color targets nor a depth/stencil state")]
    NoTargetSpecified,
    #[error("Error matching {stage:?} shader requirements against the pipeline")]
    Stage {
        stage: wgt::ShaderStages,
        #[source]
        error: validation::StageError,
    },
}

impl WebGpuError for CreateRenderPipelineError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Device(e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct PipelineFlags: u32 {
        const WRITES_DEPTH = 1 << 0;
        const WRITES_STENCIL = 1 << 1;
    }
}

/// How a vertex buffer slot is stepped through and how much of it a single
/// step reads.
#[derive(Clone, Copy, Debug)]
pub struct VertexStep {
    pub stride: wgt::BufferAddress,

    /// The byte size required to fit the last vertex in the stream.
    pub last_stride: wgt::BufferAddress,

    pub mode: wgt::VertexStepMode,
}

impl Default for VertexStep {
    fn default() -> Self {
        Self {
            stride: 0,
            last_stride: 0,
            mode: wgt::VertexStepMode::Vertex,
        }
    }
}

#[derive(Debug)]
pub struct RenderPipeline {
    pub(crate) device: Arc<Device>,
    pub(crate) layout: Arc<PipelineLayout>,
    pub(crate) _shader_modules: ArrayVec<Arc<ShaderModule>, 2>,
    pub(crate) pass_context: RenderPassContext,
    pub(crate) flags: PipelineFlags,
    pub(crate) strip_index_format: Option<wgt::IndexFormat>,
    pub(crate) vertex_steps: Vec<VertexStep>,
    pub(crate) late_sized_buffer_groups: ArrayVec<LateSizedBufferGroup, { wgt::MAX_BIND_GROUPS }>,
    /// Label from the creating descriptor.
    pub(crate) label: String,
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        resource_log!("Drop {}", self.error_ident());
    }
}

crate::resource_traits!(RenderPipeline);
