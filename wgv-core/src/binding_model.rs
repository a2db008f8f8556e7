use crate::{
    device::{bgl, Device, DeviceError, MissingFeatures},
    error::{ErrorType, WebGpuError},
    id::{BindGroupLayoutId, BufferId, SamplerId, TextureViewId},
    resource::{
        Buffer, DestroyedResourceError, InvalidResourceError, Labeled,
        MissingBufferUsageError, MissingTextureUsageError, ResourceErrorIdent, Sampler,
        TextureView,
    },
    track::BindGroupStates,
    FastHashMap, Label,
};

use arrayvec::ArrayVec;
use thiserror::Error;

use std::{borrow::Cow, num::NonZeroU32, ops::Range, sync::Arc};

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum BindGroupLayoutEntryError {
    #[error("Entry declares none of buffer, sampler, texture, storage texture, external texture or static sampler")]
    NoBindingKind,
    #[error("Entry declares more than one of buffer, sampler, texture, storage texture, external texture or static sampler")]
    MultipleBindingKinds,
    #[error("Arrays of bindings are only supported for sampled textures")]
    ArrayUnsupported,
    #[error("Cube dimension is not expected for storage textures")]
    StorageTextureCube,
    #[error("Format {0:?} can't be used for storage textures")]
    StorageTextureFormat(wgt::TextureFormat),
    #[error("Format {0:?} doesn't support read-write storage access")]
    StorageTextureReadWrite(wgt::TextureFormat),
    #[error("Writable storage bindings can't be visible to the vertex stage")]
    StorageBindingVertexWritable,
    #[error("Multisampled texture bindings must not use a filterable float sample type")]
    SampleTypeFloatFilterableBindingMultisampled,
    #[error("Multisampled texture bindings must have a 2D view dimension, got {0:?}")]
    Non2DMultisampled(wgt::TextureViewDimension),
    #[error(transparent)]
    MissingFeatures(#[from] MissingFeatures),
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CreateBindGroupLayoutError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("Conflicting binding at index {0}")]
    ConflictBinding(u32),
    #[error("Binding {binding} entry is invalid")]
    Entry {
        binding: u32,
        #[source]
        error: BindGroupLayoutEntryError,
    },
    #[error(transparent)]
    TooManyBindings(BindingTypeMaxCountError),
    #[error("Binding index {binding} is greater than the maximum number {maximum}")]
    InvalidBindingIndex { binding: u32, maximum: u32 },
    #[error("Invalid visibility {0:?}")]
    InvalidVisibility(wgt::ShaderStages),
    #[error("Static sampler of binding {binding} is invalid")]
    InvalidStaticSampler {
        binding: u32,
        #[source]
        error: InvalidResourceError,
    },
}

impl WebGpuError for CreateBindGroupLayoutError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Device(e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CreateBindGroupError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    DestroyedResource(#[from] DestroyedResourceError),
    #[error(transparent)]
    InvalidResource(#[from] InvalidResourceError),
    #[error("Binding {0} has none of buffer, sampler, texture view or external texture set")]
    NoResource(u32),
    #[error("Binding {0} has more than one of buffer, sampler, texture view or external texture set")]
    MultipleResources(u32),
    #[error("Unable to find a corresponding declaration for the given binding {0}")]
    MissingBindingDeclaration(u32),
    #[error("Binding {0} declared by the layout has no resource")]
    MissingBinding(u32),
    #[error("Binding {0} is set more than once")]
    DuplicateBinding(u32),
    #[error("Binding {0} is a static sampler of the layout and can't be set")]
    StaticSamplerBinding(u32),
    #[error(
        "The bound resource of binding {binding} doesn't match the layout type {actual:?}, expected {expected}"
    )]
    WrongBindingType {
        // Index of the binding
        binding: u32,
        // The type given to the function
        actual: wgt::BindingType,
        // Human-readable description of expected types
        expected: &'static str,
    },
    #[error(transparent)]
    MissingBufferUsage(#[from] MissingBufferUsageError),
    #[error(transparent)]
    MissingTextureUsage(#[from] MissingTextureUsageError),
    #[error("Buffer offset {0} does not respect `{1}` alignment {2}")]
    UnalignedBufferOffset(wgt::BufferAddress, &'static str, u32),
    #[error(
        "Buffer binding {binding} range {given} exceeds `max_*_buffer_binding_size` limit {limit}"
    )]
    BufferRangeTooLarge {
        binding: u32,
        given: u64,
        limit: u64,
    },
    #[error("Binding range of {buffer} at offset {offset} with size {size:?} overruns the buffer size {buffer_size}")]
    BindingRangeTooLarge {
        buffer: ResourceErrorIdent,
        offset: wgt::BufferAddress,
        size: Option<wgt::BufferSize>,
        buffer_size: u64,
    },
    #[error("Binding size of {0} is zero")]
    BindingZeroSize(ResourceErrorIdent),
    #[error("Storage buffer binding {binding} size {size} is not a multiple of 4")]
    UnalignedStorageBindingSize { binding: u32, size: u64 },
    #[error("Binding size {actual} of {buffer} is less than minimum {min}")]
    BindingSizeTooSmall {
        buffer: ResourceErrorIdent,
        actual: u64,
        min: u64,
    },
    #[error("Sampler binding {binding} expects comparison = {layout_cmp}, but given a sampler with comparison = {sampler_cmp}")]
    WrongSamplerComparison {
        binding: u32,
        layout_cmp: bool,
        sampler_cmp: bool,
    },
    #[error("Sampler binding {binding} expects filtering = {layout_flt}, but given a sampler with filtering = {sampler_flt}")]
    WrongSamplerFiltering {
        binding: u32,
        layout_flt: bool,
        sampler_flt: bool,
    },
    #[error("Bound texture views can not have both depth and stencil aspects enabled")]
    DepthStencilAspect,
    #[error("Texture binding {binding} expects multisampled = {layout_multisampled}, but given a view with samples = {view_samples}")]
    InvalidTextureMultisample {
        binding: u32,
        layout_multisampled: bool,
        view_samples: u32,
    },
    #[error("Texture binding {binding} expects sample type = {layout_sample_type:?}, but given a view with format = {view_format:?}")]
    InvalidTextureSampleType {
        binding: u32,
        layout_sample_type: wgt::TextureSampleType,
        view_format: wgt::TextureFormat,
    },
    #[error("Texture binding {binding} expects dimension = {layout_dimension:?}, but given a view with dimension = {view_dimension:?}")]
    InvalidTextureDimension {
        binding: u32,
        layout_dimension: wgt::TextureViewDimension,
        view_dimension: wgt::TextureViewDimension,
    },
    #[error("Storage texture binding {binding} expects format = {layout_format:?}, but given a view with format = {view_format:?}")]
    InvalidStorageTextureFormat {
        binding: u32,
        layout_format: wgt::TextureFormat,
        view_format: wgt::TextureFormat,
    },
    #[error("Storage texture bindings must have a single mip level, but given a view with mip_level_count = {mip_level_count:?} at binding {binding}")]
    InvalidStorageTextureMipLevelCount { binding: u32, mip_level_count: u32 },
    #[error("External texture binding {binding} requires a single-sampled 2D view of a float format")]
    InvalidExternalTexture { binding: u32 },
}

impl WebGpuError for CreateBindGroupError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Device(e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

#[derive(Clone, Debug)]
pub enum BindingZone {
    Stage(wgt::ShaderStages),
    Pipeline,
}

impl std::fmt::Display for BindingZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Stage(stage) => write!(f, "Stage {stage:?}"),
            Self::Pipeline => write!(f, "Whole pipeline"),
        }
    }
}

#[derive(Clone, Debug, Error)]
#[error("Too many bindings of type {kind:?} in {zone}, limit is {limit}, count was {count}")]
pub struct BindingTypeMaxCountError {
    pub kind: BindingTypeMaxCountErrorKind,
    pub zone: BindingZone,
    pub limit: u32,
    pub count: u32,
}

#[derive(Clone, Debug)]
pub enum BindingTypeMaxCountErrorKind {
    DynamicUniformBuffers,
    DynamicStorageBuffers,
    SampledTextures,
    Samplers,
    StorageBuffers,
    StorageTextures,
    UniformBuffers,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct PerStageBindingTypeCounter {
    vertex: u32,
    fragment: u32,
    compute: u32,
}

impl PerStageBindingTypeCounter {
    pub(crate) fn add(&mut self, stage: wgt::ShaderStages, count: u32) {
        if stage.contains(wgt::ShaderStages::VERTEX) {
            self.vertex += count;
        }
        if stage.contains(wgt::ShaderStages::FRAGMENT) {
            self.fragment += count;
        }
        if stage.contains(wgt::ShaderStages::COMPUTE) {
            self.compute += count;
        }
    }

    pub(crate) fn max(&self) -> (BindingZone, u32) {
        let max_value = self.vertex.max(self.fragment.max(self.compute));
        let mut stage = wgt::ShaderStages::NONE;
        if max_value == self.vertex {
            stage |= wgt::ShaderStages::VERTEX
        }
        if max_value == self.fragment {
            stage |= wgt::ShaderStages::FRAGMENT
        }
        if max_value == self.compute {
            stage |= wgt::ShaderStages::COMPUTE
        }
        (BindingZone::Stage(stage), max_value)
    }

    /// Bindings of every bind group of a pipeline layout add up.
    pub(crate) fn merge(&mut self, other: &Self) {
        self.vertex += other.vertex;
        self.fragment += other.fragment;
        self.compute += other.compute;
    }

    pub(crate) fn validate(
        &self,
        limit: u32,
        kind: BindingTypeMaxCountErrorKind,
    ) -> Result<(), BindingTypeMaxCountError> {
        let (zone, count) = self.max();
        if limit < count {
            Err(BindingTypeMaxCountError {
                kind,
                zone,
                limit,
                count,
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct BindingTypeMaxCountValidator {
    dynamic_uniform_buffers: u32,
    dynamic_storage_buffers: u32,
    sampled_textures: PerStageBindingTypeCounter,
    samplers: PerStageBindingTypeCounter,
    storage_buffers: PerStageBindingTypeCounter,
    storage_textures: PerStageBindingTypeCounter,
    uniform_buffers: PerStageBindingTypeCounter,
}

impl BindingTypeMaxCountValidator {
    pub(crate) fn add_binding(&mut self, binding: &ResolvedBindGroupLayoutEntry) {
        let count = binding.array_len();
        match binding.ty {
            wgt::BindingType::Buffer {
                ty: wgt::BufferBindingType::Uniform,
                has_dynamic_offset,
                ..
            } => {
                self.uniform_buffers.add(binding.visibility, count);
                if has_dynamic_offset {
                    self.dynamic_uniform_buffers += count;
                }
            }
            wgt::BindingType::Buffer {
                ty: wgt::BufferBindingType::Storage { .. },
                has_dynamic_offset,
                ..
            } => {
                self.storage_buffers.add(binding.visibility, count);
                if has_dynamic_offset {
                    self.dynamic_storage_buffers += count;
                }
            }
            wgt::BindingType::Sampler { .. } => {
                self.samplers.add(binding.visibility, count);
            }
            wgt::BindingType::Texture { .. } => {
                self.sampled_textures.add(binding.visibility, count);
            }
            wgt::BindingType::StorageTexture { .. } => {
                self.storage_textures.add(binding.visibility, count);
            }
            // An external texture is backed by up to four planes, a sampler and
            // a uniform buffer of conversion parameters.
            wgt::BindingType::ExternalTexture => {
                self.sampled_textures.add(binding.visibility, count * 4);
                self.samplers.add(binding.visibility, count);
                self.uniform_buffers.add(binding.visibility, count);
            }
        }
    }

    pub(crate) fn merge(&mut self, other: &Self) {
        self.dynamic_uniform_buffers += other.dynamic_uniform_buffers;
        self.dynamic_storage_buffers += other.dynamic_storage_buffers;
        self.sampled_textures.merge(&other.sampled_textures);
        self.samplers.merge(&other.samplers);
        self.storage_buffers.merge(&other.storage_buffers);
        self.storage_textures.merge(&other.storage_textures);
        self.uniform_buffers.merge(&other.uniform_buffers);
    }

    pub(crate) fn validate(&self, limits: &wgt::Limits) -> Result<(), BindingTypeMaxCountError> {
        if limits.max_dynamic_uniform_buffers_per_pipeline_layout < self.dynamic_uniform_buffers {
            return Err(BindingTypeMaxCountError {
                kind: BindingTypeMaxCountErrorKind::DynamicUniformBuffers,
                zone: BindingZone::Pipeline,
                limit: limits.max_dynamic_uniform_buffers_per_pipeline_layout,
                count: self.dynamic_uniform_buffers,
            });
        }
        if limits.max_dynamic_storage_buffers_per_pipeline_layout < self.dynamic_storage_buffers {
            return Err(BindingTypeMaxCountError {
                kind: BindingTypeMaxCountErrorKind::DynamicStorageBuffers,
                zone: BindingZone::Pipeline,
                limit: limits.max_dynamic_storage_buffers_per_pipeline_layout,
                count: self.dynamic_storage_buffers,
            });
        }
        self.sampled_textures.validate(
            limits.max_sampled_textures_per_shader_stage,
            BindingTypeMaxCountErrorKind::SampledTextures,
        )?;
        self.samplers.validate(
            limits.max_samplers_per_shader_stage,
            BindingTypeMaxCountErrorKind::Samplers,
        )?;
        self.storage_buffers.validate(
            limits.max_storage_buffers_per_shader_stage,
            BindingTypeMaxCountErrorKind::StorageBuffers,
        )?;
        self.storage_textures.validate(
            limits.max_storage_textures_per_shader_stage,
            BindingTypeMaxCountErrorKind::StorageTextures,
        )?;
        self.uniform_buffers.validate(
            limits.max_uniform_buffers_per_shader_stage,
            BindingTypeMaxCountErrorKind::UniformBuffers,
        )?;
        Ok(())
    }
}

/// Layout of a buffer binding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferBindingLayout {
    pub ty: wgt::BufferBindingType,
    pub has_dynamic_offset: bool,
    pub min_binding_size: Option<wgt::BufferSize>,
}

/// Layout of a sampler binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplerBindingLayout {
    pub ty: wgt::SamplerBindingType,
}

impl Default for SamplerBindingLayout {
    fn default() -> Self {
        Self {
            ty: wgt::SamplerBindingType::Filtering,
        }
    }
}

/// Layout of a sampled texture binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureBindingLayout {
    pub sample_type: wgt::TextureSampleType,
    pub view_dimension: wgt::TextureViewDimension,
    pub multisampled: bool,
}

impl Default for TextureBindingLayout {
    fn default() -> Self {
        Self {
            sample_type: wgt::TextureSampleType::default(),
            view_dimension: wgt::TextureViewDimension::D2,
            multisampled: false,
        }
    }
}

/// Layout of a storage texture binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StorageTextureBindingLayout {
    pub access: wgt::StorageTextureAccess,
    pub format: wgt::TextureFormat,
    pub view_dimension: wgt::TextureViewDimension,
}

/// Layout of an external texture binding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExternalTextureBindingLayout {}

/// Describes a single binding inside a bind group layout.
///
/// Exactly one of the kind members must be set.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BindGroupLayoutEntry {
    /// Binding index. Must match shader index and be unique inside a BindGroupLayout.
    pub binding: u32,
    /// Which shader stages can see this binding.
    pub visibility: wgt::ShaderStages,
    pub buffer: Option<BufferBindingLayout>,
    pub sampler: Option<SamplerBindingLayout>,
    pub texture: Option<TextureBindingLayout>,
    pub storage_texture: Option<StorageTextureBindingLayout>,
    pub external_texture: Option<ExternalTextureBindingLayout>,
    /// A sampler bound by the layout itself. Bind groups never set it.
    pub static_sampler: Option<SamplerId>,
    /// Number of consecutive binding slots this entry covers. `0` and `1`
    /// both declare a single binding.
    pub binding_array_size: u32,
}

impl Default for BindGroupLayoutEntry {
    fn default() -> Self {
        Self {
            binding: 0,
            visibility: wgt::ShaderStages::NONE,
            buffer: None,
            sampler: None,
            texture: None,
            storage_texture: None,
            external_texture: None,
            static_sampler: None,
            binding_array_size: 0,
        }
    }
}

impl BindGroupLayoutEntry {
    fn kind_count(&self) -> usize {
        [
            self.buffer.is_some(),
            self.sampler.is_some(),
            self.texture.is_some(),
            self.storage_texture.is_some(),
            self.external_texture.is_some(),
            self.static_sampler.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count()
    }
}

/// A bind group layout entry with its binding kind resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedBindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: wgt::ShaderStages,
    pub ty: wgt::BindingType,
    /// Number of array elements, `None` for a plain binding.
    pub count: Option<NonZeroU32>,
    /// The binding is a sampler owned by the layout.
    pub static_sampler: bool,
}

impl ResolvedBindGroupLayoutEntry {
    pub fn array_len(&self) -> u32 {
        self.count.map_or(1, NonZeroU32::get)
    }
}

/// Resolves and checks one user-facing entry.
///
/// `static_sampler` is the sampler the entry's `static_sampler` id refers to.
pub(crate) fn resolve_layout_entry(
    entry: &BindGroupLayoutEntry,
    static_sampler: Option<&Sampler>,
    features: wgt::Features,
) -> Result<ResolvedBindGroupLayoutEntry, BindGroupLayoutEntryError> {
    use BindGroupLayoutEntryError as Error;

    match entry.kind_count() {
        0 => return Err(Error::NoBindingKind),
        1 => {}
        _ => return Err(Error::MultipleBindingKinds),
    }

    let ty = if let Some(buffer) = entry.buffer {
        if buffer.ty == (wgt::BufferBindingType::Storage { read_only: false })
            && entry.visibility.contains(wgt::ShaderStages::VERTEX)
        {
            return Err(Error::StorageBindingVertexWritable);
        }
        wgt::BindingType::Buffer {
            ty: buffer.ty,
            has_dynamic_offset: buffer.has_dynamic_offset,
            min_binding_size: buffer.min_binding_size,
        }
    } else if let Some(sampler) = entry.sampler {
        wgt::BindingType::Sampler(sampler.ty)
    } else if let Some(texture) = entry.texture {
        if texture.multisampled {
            if texture.view_dimension != wgt::TextureViewDimension::D2 {
                return Err(Error::Non2DMultisampled(texture.view_dimension));
            }
            if let wgt::TextureSampleType::Float { filterable: true } = texture.sample_type {
                return Err(Error::SampleTypeFloatFilterableBindingMultisampled);
            }
        }
        wgt::BindingType::Texture {
            sample_type: texture.sample_type,
            view_dimension: texture.view_dimension,
            multisampled: texture.multisampled,
        }
    } else if let Some(storage) = entry.storage_texture {
        match storage.view_dimension {
            wgt::TextureViewDimension::Cube | wgt::TextureViewDimension::CubeArray => {
                return Err(Error::StorageTextureCube)
            }
            _ => {}
        }
        if !storage.format.is_storage_capable() {
            return Err(Error::StorageTextureFormat(storage.format));
        }
        match storage.access {
            wgt::StorageTextureAccess::ReadOnly => {}
            wgt::StorageTextureAccess::WriteOnly | wgt::StorageTextureAccess::ReadWrite => {
                if entry.visibility.contains(wgt::ShaderStages::VERTEX) {
                    return Err(Error::StorageBindingVertexWritable);
                }
            }
        }
        if storage.access == wgt::StorageTextureAccess::ReadWrite
            && !storage.format.is_storage_read_write_capable()
        {
            return Err(Error::StorageTextureReadWrite(storage.format));
        }
        wgt::BindingType::StorageTexture {
            access: storage.access,
            format: storage.format,
            view_dimension: storage.view_dimension,
        }
    } else if entry.external_texture.is_some() {
        wgt::BindingType::ExternalTexture
    } else {
        if !features.contains(wgt::Features::STATIC_SAMPLERS) {
            return Err(MissingFeatures(wgt::Features::STATIC_SAMPLERS).into());
        }
        wgt::BindingType::Sampler(sampler_binding_type(static_sampler))
    };

    let count = match entry.binding_array_size {
        0 | 1 => None,
        n => {
            if !matches!(ty, wgt::BindingType::Texture { .. }) {
                return Err(Error::ArrayUnsupported);
            }
            NonZeroU32::new(n)
        }
    };

    Ok(ResolvedBindGroupLayoutEntry {
        binding: entry.binding,
        visibility: entry.visibility,
        ty,
        count,
        static_sampler: entry.static_sampler.is_some(),
    })
}

/// The layout sampler type a sampler satisfies most narrowly.
fn sampler_binding_type(sampler: Option<&Sampler>) -> wgt::SamplerBindingType {
    match sampler {
        Some(sampler) if sampler.comparison => wgt::SamplerBindingType::Comparison,
        Some(sampler) if !sampler.filtering => wgt::SamplerBindingType::NonFiltering,
        _ => wgt::SamplerBindingType::Filtering,
    }
}

/// Returns true if a binding declared as `assigned` can stand in for one
/// declared as `expected`.
///
/// Buffers must match exactly. Float textures match regardless of
/// filterability, and filtering samplers match non-filtering ones; whether the
/// two are used together correctly is decided by the sampler checks of bind
/// group creation.
pub(crate) fn binding_types_compatible(
    assigned: &wgt::BindingType,
    expected: &wgt::BindingType,
) -> bool {
    use wgt::BindingType as Bt;

    match (*assigned, *expected) {
        (
            Bt::Buffer {
                ty: assigned_ty,
                has_dynamic_offset: assigned_dynamic,
                min_binding_size: assigned_min,
            },
            Bt::Buffer {
                ty: expected_ty,
                has_dynamic_offset: expected_dynamic,
                min_binding_size: expected_min,
            },
        ) => {
            assigned_ty == expected_ty
                && assigned_dynamic == expected_dynamic
                && assigned_min >= expected_min
        }
        (Bt::Sampler(assigned), Bt::Sampler(expected)) => {
            sampler_bucket_compatible(assigned, expected)
        }
        (
            Bt::Texture {
                sample_type: assigned_sample,
                view_dimension: assigned_dim,
                multisampled: assigned_ms,
            },
            Bt::Texture {
                sample_type: expected_sample,
                view_dimension: expected_dim,
                multisampled: expected_ms,
            },
        ) => {
            sample_type_bucket_compatible(assigned_sample, expected_sample)
                && assigned_dim == expected_dim
                && assigned_ms == expected_ms
        }
        (assigned @ Bt::StorageTexture { .. }, expected @ Bt::StorageTexture { .. }) => {
            assigned == expected
        }
        (Bt::ExternalTexture, Bt::ExternalTexture) => true,
        _ => false,
    }
}

pub(crate) fn sampler_bucket_compatible(
    assigned: wgt::SamplerBindingType,
    expected: wgt::SamplerBindingType,
) -> bool {
    use wgt::SamplerBindingType as Sbt;

    match (assigned, expected) {
        (Sbt::Comparison, Sbt::Comparison) => true,
        (Sbt::Comparison, _) | (_, Sbt::Comparison) => false,
        _ => true,
    }
}

pub(crate) fn sample_type_bucket_compatible(
    assigned: wgt::TextureSampleType,
    expected: wgt::TextureSampleType,
) -> bool {
    use wgt::TextureSampleType as Tst;

    match (assigned, expected) {
        (Tst::Float { .. }, Tst::Float { .. }) => true,
        (assigned, expected) => assigned == expected,
    }
}

/// Describes a [`BindGroupLayout`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindGroupLayoutDescriptor<'a> {
    /// Debug label of the bind group layout.
    ///
    /// This will show up in graphics debuggers for easy identification.
    pub label: Label<'a>,
    /// Array of entries in this BindGroupLayout
    pub entries: Cow<'a, [BindGroupLayoutEntry]>,
}

/// Bind group layout.
#[derive(Debug)]
pub struct BindGroupLayout {
    pub(crate) device: Arc<Device>,
    pub(crate) entries: bgl::EntryMap,
    /// Samplers bound by the layout, by binding.
    pub(crate) static_samplers: FastHashMap<u32, Arc<Sampler>>,
    pub(crate) origin: bgl::Origin,
    pub(crate) binding_count_validator: BindingTypeMaxCountValidator,
    /// The `label` from the descriptor used to create the resource.
    pub(crate) label: String,
}

impl Drop for BindGroupLayout {
    fn drop(&mut self) {
        resource_log!("Drop {}", self.error_ident());
    }
}

crate::resource_traits!(BindGroupLayout);

impl BindGroupLayout {
    /// Number of dynamic offsets a bind group of this layout takes.
    pub(crate) fn dynamic_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.ty.has_dynamic_offset())
            .count()
    }

    /// Returns the differences that make a bind group of this layout unusable
    /// where `expected` is required. Identical layouts are always compatible.
    pub(crate) fn compatibility_diff(self: &Arc<Self>, expected: &Arc<Self>) -> Vec<String> {
        if Arc::ptr_eq(self, expected) {
            return Vec::new();
        }
        self.entries.compatibility_diff(&expected.entries)
    }
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum CreatePipelineLayoutError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    InvalidResource(#[from] InvalidResourceError),
    #[error(
        "Bind group layout count {actual} exceeds device bind group limit {max}"
    )]
    TooManyGroups { actual: usize, max: usize },
    #[error(transparent)]
    TooManyBindings(BindingTypeMaxCountError),
}

impl WebGpuError for CreatePipelineLayoutError {
    fn webgpu_error_type(&self) -> ErrorType {
        match self {
            Self::Device(e) => e.webgpu_error_type(),
            _ => ErrorType::Validation,
        }
    }
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum GetBindGroupLayoutError {
    #[error(transparent)]
    InvalidResource(#[from] InvalidResourceError),
    #[error("Invalid group index {0}")]
    InvalidGroupIndex(u32),
}

impl WebGpuError for GetBindGroupLayoutError {
    fn webgpu_error_type(&self) -> ErrorType {
        ErrorType::Validation
    }
}

/// Describes a pipeline layout.
///
/// A `PipelineLayoutDescriptor` can be used to create a pipeline layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineLayoutDescriptor<'a> {
    /// Debug label of the pipeline layout.
    ///
    /// This will show up in graphics debuggers for easy identification.
    pub label: Label<'a>,
    /// Bind groups that this pipeline uses. The first entry will provide all the bindings for
    /// "set = 0", second entry will provide all the bindings for "set = 1" etc.
    ///
    /// An empty slot is never checked against the bind group set at that index.
    pub bind_group_layouts: Cow<'a, [Option<BindGroupLayoutId>]>,
}

#[derive(Debug)]
pub struct PipelineLayout {
    pub(crate) device: Arc<Device>,
    /// The `label` from the descriptor used to create the resource.
    pub(crate) label: String,
    pub(crate) bind_group_layouts: ArrayVec<Option<Arc<BindGroupLayout>>, { wgt::MAX_BIND_GROUPS }>,
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        resource_log!("Drop {}", self.error_ident());
    }
}

impl PipelineLayout {
    /// Returns the layout of group `index` if it constrains bind groups.
    ///
    /// Empty layouts and empty slots accept any bind group.
    pub(crate) fn group_layout(&self, index: usize) -> Option<&Arc<BindGroupLayout>> {
        self.bind_group_layouts
            .get(index)
            .and_then(Option::as_ref)
            .filter(|bgl| !bgl.entries.is_empty())
    }

    /// Entry maps of every slot, `None` for empty slots.
    pub(crate) fn get_bind_group_layouts(&self) -> ArrayVec<Option<&bgl::EntryMap>, { wgt::MAX_BIND_GROUPS }> {
        self.bind_group_layouts
            .iter()
            .map(|bgl| bgl.as_ref().map(|bgl| &bgl.entries))
            .collect()
    }
}

crate::resource_traits!(PipelineLayout);

#[repr(C)]
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferBinding {
    pub buffer: BufferId,
    pub offset: wgt::BufferAddress,
    pub size: Option<wgt::BufferSize>,
}

#[derive(Clone, Debug)]
pub(crate) struct ResolvedBufferBinding {
    pub buffer: Arc<Buffer>,
    pub offset: wgt::BufferAddress,
    pub size: Option<wgt::BufferSize>,
}

/// A bind group entry: one binding number and the resource bound there.
///
/// Exactly one of the resource members must be set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BindGroupEntry {
    /// Slot for which binding provides resource. Corresponds to an entry of the same
    /// binding index in the [`BindGroupLayoutDescriptor`], or to an element of a
    /// binding array declared at a lower index.
    pub binding: u32,
    pub buffer: Option<BufferBinding>,
    pub sampler: Option<SamplerId>,
    pub texture_view: Option<TextureViewId>,
    pub external_texture: Option<TextureViewId>,
}

#[derive(Clone, Debug)]
pub(crate) enum ResolvedBindingResource {
    Buffer(ResolvedBufferBinding),
    Sampler(Arc<Sampler>),
    TextureView(Arc<TextureView>),
    ExternalTexture(Arc<TextureView>),
}

#[derive(Clone, Debug)]
pub(crate) struct ResolvedBindGroupEntry {
    pub binding: u32,
    pub resource: ResolvedBindingResource,
}

/// Describes a group of bindings and the resources to be bound.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindGroupDescriptor<'a> {
    /// Debug label of the bind group.
    ///
    /// This will show up in graphics debuggers for easy identification.
    pub label: Label<'a>,
    /// The [`BindGroupLayout`] that corresponds to this bind group.
    pub layout: BindGroupLayoutId,
    /// The resources to bind to this bind group.
    pub entries: Cow<'a, [BindGroupEntry]>,
}

#[derive(Clone, Debug)]
pub(crate) struct ResolvedBindGroupDescriptor<'a> {
    pub label: Label<'a>,
    pub layout: Arc<BindGroupLayout>,
    pub entries: Vec<ResolvedBindGroupEntry>,
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum BindError {
    #[error(
        "{bind_group} {group} expects {expected} dynamic offset{s0}. However {actual} dynamic offset{s1} were provided.",
        s0 = if *.expected >= 2 { "s" } else { "" },
        s1 = if *.actual >= 2 { "s" } else { "" },
    )]
    MismatchedDynamicOffsetCount {
        bind_group: ResourceErrorIdent,
        group: u32,
        actual: usize,
        expected: usize,
    },
    #[error(
        "Dynamic binding index {idx} (targeting {bind_group} {group}, binding {binding}) with value {offset}, does not respect `{limit_name}` alignment {alignment}"
    )]
    UnalignedDynamicBinding {
        bind_group: ResourceErrorIdent,
        idx: usize,
        group: u32,
        binding: u32,
        offset: u32,
        alignment: u32,
        limit_name: &'static str,
    },
    #[error(
        "Dynamic binding offset index {idx} with offset {offset} would overrun the buffer bound to {bind_group} {group} -> binding {binding}. \
         Buffer size is {buffer_size} bytes, the binding binds bytes {binding_range:?}, meaning the maximum the binding can be offset is {maximum_dynamic_offset} bytes",
    )]
    DynamicBindingOutOfBounds {
        bind_group: ResourceErrorIdent,
        idx: usize,
        group: u32,
        binding: u32,
        offset: u32,
        buffer_size: wgt::BufferAddress,
        binding_range: Range<wgt::BufferAddress>,
        maximum_dynamic_offset: wgt::BufferAddress,
    },
}

impl WebGpuError for BindError {
    fn webgpu_error_type(&self) -> ErrorType {
        ErrorType::Validation
    }
}

#[derive(Debug)]
pub(crate) struct BindGroupDynamicBindingData {
    /// The index of the binding.
    ///
    /// Used for more descriptive errors.
    pub(crate) binding_idx: u32,
    /// The size of the buffer.
    ///
    /// Used for more descriptive errors.
    pub(crate) buffer_size: wgt::BufferAddress,
    /// The range that the binding covers.
    ///
    /// Used for more descriptive errors.
    pub(crate) binding_range: Range<wgt::BufferAddress>,
    /// The maximum value the dynamic offset can have before running off the end of the buffer.
    pub(crate) maximum_dynamic_offset: wgt::BufferAddress,
    /// The binding type.
    pub(crate) binding_type: wgt::BufferBindingType,
}

/// Alignment required of a buffer binding's offset, with the name of the
/// rule it comes from.
///
/// Only uniform bindings with a dynamic offset follow the device limit.
pub(crate) fn buffer_offset_alignment(
    limits: &wgt::Limits,
    binding_type: wgt::BufferBindingType,
    has_dynamic_offset: bool,
) -> (u32, &'static str) {
    match binding_type {
        wgt::BufferBindingType::Uniform if has_dynamic_offset => (
            limits.min_uniform_buffer_offset_alignment,
            "min_uniform_buffer_offset_alignment",
        ),
        _ => (
            wgt::BUFFER_BINDING_ALIGNMENT as u32,
            "BUFFER_BINDING_ALIGNMENT",
        ),
    }
}

pub(crate) fn buffer_binding_type_max_size(
    limits: &wgt::Limits,
    binding_type: wgt::BufferBindingType,
) -> u64 {
    match binding_type {
        wgt::BufferBindingType::Uniform => limits.max_uniform_buffer_binding_size.into(),
        wgt::BufferBindingType::Storage { .. } => limits.max_storage_buffer_binding_size.into(),
    }
}

#[derive(Debug)]
pub struct BindGroup {
    pub(crate) device: Arc<Device>,
    pub(crate) layout: Arc<BindGroupLayout>,
    /// The `label` from the descriptor used to create the resource.
    pub(crate) label: String,
    pub(crate) used: BindGroupStates,
    pub(crate) dynamic_binding_info: Vec<BindGroupDynamicBindingData>,
    /// Actual binding sizes for buffers that don't have `min_binding_size`
    /// specified in BGL, keyed by binding.
    pub(crate) late_buffer_binding_sizes: FastHashMap<u32, wgt::BufferSize>,
}

impl Drop for BindGroup {
    fn drop(&mut self) {
        resource_log!("Drop {}", self.error_ident());
    }
}

impl BindGroup {
    /// Fails if any resource the bind group references was destroyed.
    pub(crate) fn check_destroyed(&self) -> Result<(), DestroyedResourceError> {
        for buffer in self.used.buffers.used_buffers() {
            buffer.check_destroyed()?;
        }
        for view in self.used.views.used_views() {
            view.check_destroyed()?;
        }
        Ok(())
    }

    pub(crate) fn validate_dynamic_bindings(
        &self,
        bind_group_index: u32,
        offsets: &[wgt::DynamicOffset],
    ) -> Result<(), BindError> {
        if self.dynamic_binding_info.len() != offsets.len() {
            return Err(BindError::MismatchedDynamicOffsetCount {
                bind_group: self.error_ident(),
                group: bind_group_index,
                expected: self.dynamic_binding_info.len(),
                actual: offsets.len(),
            });
        }

        for (idx, (info, &offset)) in self
            .dynamic_binding_info
            .iter()
            .zip(offsets.iter())
            .enumerate()
        {
            let (alignment, limit_name) =
                buffer_offset_alignment(&self.device.limits, info.binding_type, true);
            if offset as wgt::BufferAddress % alignment as u64 != 0 {
                return Err(BindError::UnalignedDynamicBinding {
                    bind_group: self.error_ident(),
                    group: bind_group_index,
                    binding: info.binding_idx,
                    idx,
                    offset,
                    alignment,
                    limit_name,
                });
            }

            if offset as wgt::BufferAddress > info.maximum_dynamic_offset {
                return Err(BindError::DynamicBindingOutOfBounds {
                    bind_group: self.error_ident(),
                    group: bind_group_index,
                    binding: info.binding_idx,
                    idx,
                    offset,
                    buffer_size: info.buffer_size,
                    binding_range: info.binding_range.clone(),
                    maximum_dynamic_offset: info.maximum_dynamic_offset,
                });
            }
        }

        Ok(())
    }
}

crate::resource_traits!(BindGroup);

#[derive(Clone, Debug, Error)]
#[error("Late buffer binding {binding} of group {group_index}: the bound size {bound_size} is less than the shader's minimum size {shader_size}")]
pub struct LateMinBufferBindingSizeMismatch {
    pub group_index: u32,
    pub binding: u32,
    pub shader_size: wgt::BufferAddress,
    pub bound_size: wgt::BufferAddress,
}
