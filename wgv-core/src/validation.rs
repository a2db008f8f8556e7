//! Matching of shader interfaces against pipeline layouts and vertex state.
//!
//! Shader source is never parsed. A shader module is created from an explicit
//! [`ShaderInterface`] listing what every entry point binds, consumes and
//! writes, and pipelines are validated against that description.

use crate::{
    binding_model::{sample_type_bucket_compatible, ResolvedBindGroupLayoutEntry},
    device::bgl,
    FastHashMap,
};

use arrayvec::ArrayVec;
use indexmap::map::Entry;
use thiserror::Error;

use std::num::NonZeroU32;

/// Kind of value a shader reads from a sampled texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShaderSampleKind {
    /// `texture_2d<f32>` and friends.
    Float,
    /// `texture_depth_2d` and friends.
    Depth,
    Sint,
    Uint,
}

/// The type of a resource variable as declared by a shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShaderBindingType {
    Buffer {
        ty: wgt::BufferBindingType,
        /// Size of the buffer's structure, if known.
        min_binding_size: Option<wgt::BufferSize>,
    },
    Sampler {
        comparison: bool,
    },
    Texture {
        sample_kind: ShaderSampleKind,
        view_dimension: wgt::TextureViewDimension,
        multisampled: bool,
    },
    StorageTexture {
        access: wgt::StorageTextureAccess,
        format: wgt::TextureFormat,
        view_dimension: wgt::TextureViewDimension,
    },
    ExternalTexture,
}

/// A resource variable of a shader.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShaderBinding {
    pub group: u32,
    pub binding: u32,
    pub ty: ShaderBindingType,
    /// Element count of a `binding_array`, `None` for a plain variable.
    pub count: Option<NonZeroU32>,
}

/// Everything a pipeline needs to know about one entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryPoint {
    pub name: String,
    pub stage: wgt::ShaderStages,
    /// Resource variables statically used by the entry point.
    pub bindings: Vec<ShaderBinding>,
    /// Vertex inputs, for vertex entry points.
    pub inputs: Vec<(wgt::ShaderLocation, wgt::VertexFormat)>,
    /// Color target locations written, for fragment entry points.
    pub targets: Vec<wgt::ShaderLocation>,
}

/// Reflection of a whole shader module.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShaderInterface {
    pub entry_points: Vec<EntryPoint>,
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum BindingError {
    #[error("Binding is missing from the pipeline layout")]
    Missing,
    #[error("Visibility flags don't include the shader stage")]
    Invisible,
    #[error("Type on the shader side ({shader:?}) does not match the pipeline binding ({binding:?})")]
    WrongType {
        binding: wgt::BindingType,
        shader: ShaderBindingType,
    },
    #[error("Buffer structure size {0} is greater than the given `min_binding_size`")]
    WrongBufferSize(wgt::BufferSize),
    #[error("Comparison flag doesn't match the shader")]
    WrongSamplerComparison,
    #[error("Array of {layout:?} elements in the layout can't hold the shader's {shader:?}")]
    WrongArraySize {
        layout: Option<NonZeroU32>,
        shader: Option<NonZeroU32>,
    },
    #[error("Derived bind group layout type is not consistent between stages")]
    InconsistentlyDerivedType,
}

#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum InputError {
    #[error("Input is not provided by the vertex buffer layouts")]
    Missing,
    #[error("Input type {shader:?} is not compatible with the provided {provided:?}")]
    WrongType {
        shader: wgt::VertexFormat,
        provided: wgt::VertexFormat,
    },
}

/// Errors produced when validating a programmable stage of a pipeline.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum StageError {
    #[error("Unable to find entry point '{0}'")]
    MissingEntryPoint(String),
    #[error("No entry point for the {0:?} stage was found")]
    NoEntryPointFound(wgt::ShaderStages),
    #[error("Multiple entry points for the {0:?} stage were found, an entry point name is required")]
    MultipleEntryPointsFound(wgt::ShaderStages),
    #[error("Shader global binding {binding} in group {group} doesn't match the pipeline layout")]
    Binding {
        group: u32,
        binding: u32,
        #[source]
        error: BindingError,
    },
    #[error("Vertex input at location {location} doesn't match the vertex state")]
    Input {
        location: wgt::ShaderLocation,
        #[source]
        error: InputError,
    },
}

impl ShaderInterface {
    /// Finds the entry point a pipeline stage refers to.
    ///
    /// Without a name, the module must have exactly one entry point for `stage`.
    pub(crate) fn entry_point(
        &self,
        name: Option<&str>,
        stage: wgt::ShaderStages,
    ) -> Result<&EntryPoint, StageError> {
        match name {
            Some(name) => self
                .entry_points
                .iter()
                .find(|ep| ep.name == name && ep.stage == stage)
                .ok_or_else(|| StageError::MissingEntryPoint(name.to_string())),
            None => {
                let mut candidates = self.entry_points.iter().filter(|ep| ep.stage == stage);
                match (candidates.next(), candidates.next()) {
                    (Some(ep), None) => Ok(ep),
                    (None, _) => Err(StageError::NoEntryPointFound(stage)),
                    (Some(_), Some(_)) => Err(StageError::MultipleEntryPointsFound(stage)),
                }
            }
        }
    }
}

/// The bind group layouts shader bindings are checked against, or derived into.
#[derive(Debug)]
pub enum BindingLayoutSource<'a> {
    /// The binding layout is derived from the pipeline layout.
    ///
    /// This will be filled in by the shader binding validation, as it iterates the shader's interfaces.
    Derived(Box<ArrayVec<bgl::EntryMap, { wgt::MAX_BIND_GROUPS }>>),
    /// The binding layout is provided by the user in BindGroupLayoutDescriptor.
    ///
    /// This will be validated against the shader's interfaces.
    Provided(ArrayVec<Option<&'a bgl::EntryMap>, { wgt::MAX_BIND_GROUPS }>),
}

impl<'a> BindingLayoutSource<'a> {
    pub fn new_derived(limits: &wgt::Limits) -> Self {
        let mut array = ArrayVec::new();
        for _ in 0..(limits.max_bind_groups as usize).min(wgt::MAX_BIND_GROUPS) {
            array.push(Default::default());
        }
        BindingLayoutSource::Derived(Box::new(array))
    }
}

/// Checks a shader binding against a provided layout entry.
fn check_binding_use(
    shader: &ShaderBinding,
    entry: &ResolvedBindGroupLayoutEntry,
) -> Result<(), BindingError> {
    let wrong_type = || BindingError::WrongType {
        binding: entry.ty,
        shader: shader.ty,
    };

    match (shader.ty, entry.ty) {
        (
            ShaderBindingType::Buffer {
                ty,
                min_binding_size,
            },
            wgt::BindingType::Buffer {
                ty: layout_ty,
                min_binding_size: layout_min,
                ..
            },
        ) => {
            if ty != layout_ty {
                return Err(wrong_type());
            }
            if let (Some(size), Some(layout_min)) = (min_binding_size, layout_min) {
                if size > layout_min {
                    return Err(BindingError::WrongBufferSize(size));
                }
            }
        }
        (ShaderBindingType::Sampler { comparison }, wgt::BindingType::Sampler(ty)) => {
            if comparison != (ty == wgt::SamplerBindingType::Comparison) {
                return Err(BindingError::WrongSamplerComparison);
            }
        }
        (
            ShaderBindingType::Texture {
                sample_kind,
                view_dimension,
                multisampled,
            },
            wgt::BindingType::Texture {
                sample_type,
                view_dimension: layout_dimension,
                multisampled: layout_multisampled,
            },
        ) => {
            if !sample_type_bucket_compatible(sample_type, derive_sample_type(sample_kind))
                || view_dimension != layout_dimension
                || multisampled != layout_multisampled
            {
                return Err(wrong_type());
            }
        }
        (
            ShaderBindingType::StorageTexture {
                access,
                format,
                view_dimension,
            },
            wgt::BindingType::StorageTexture {
                access: layout_access,
                format: layout_format,
                view_dimension: layout_dimension,
            },
        ) => {
            if access != layout_access || format != layout_format || view_dimension != layout_dimension
            {
                return Err(wrong_type());
            }
        }
        (ShaderBindingType::ExternalTexture, wgt::BindingType::ExternalTexture) => {}
        _ => return Err(wrong_type()),
    }

    let layout_len = entry.count.map_or(1, NonZeroU32::get);
    let compatible_len = match shader.count {
        // A layout array can't stand in for a single variable.
        None => layout_len == 1,
        Some(shader_len) => layout_len >= shader_len.get(),
    };
    if !compatible_len {
        return Err(BindingError::WrongArraySize {
            layout: entry.count,
            shader: shader.count,
        });
    }

    Ok(())
}

fn derive_sample_type(kind: ShaderSampleKind) -> wgt::TextureSampleType {
    match kind {
        ShaderSampleKind::Float => wgt::TextureSampleType::Float { filterable: true },
        ShaderSampleKind::Depth => wgt::TextureSampleType::Depth,
        ShaderSampleKind::Sint => wgt::TextureSampleType::Sint,
        ShaderSampleKind::Uint => wgt::TextureSampleType::Uint,
    }
}

fn derive_binding_type(ty: ShaderBindingType) -> wgt::BindingType {
    match ty {
        ShaderBindingType::Buffer {
            ty,
            min_binding_size,
        } => wgt::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size,
        },
        ShaderBindingType::Sampler { comparison: true } => {
            wgt::BindingType::Sampler(wgt::SamplerBindingType::Comparison)
        }
        ShaderBindingType::Sampler { comparison: false } => {
            wgt::BindingType::Sampler(wgt::SamplerBindingType::Filtering)
        }
        ShaderBindingType::Texture {
            sample_kind,
            view_dimension,
            multisampled,
        } => wgt::BindingType::Texture {
            sample_type: match sample_kind {
                // Multisampled textures can't be filtered.
                ShaderSampleKind::Float if multisampled => {
                    wgt::TextureSampleType::Float { filterable: false }
                }
                kind => derive_sample_type(kind),
            },
            view_dimension,
            multisampled,
        },
        ShaderBindingType::StorageTexture {
            access,
            format,
            view_dimension,
        } => wgt::BindingType::StorageTexture {
            access,
            format,
            view_dimension,
        },
        ShaderBindingType::ExternalTexture => wgt::BindingType::ExternalTexture,
    }
}

/// Checks the resource bindings of one entry point.
///
/// With a [`BindingLayoutSource::Provided`] layout every binding must be
/// declared, visible to the stage and of a compatible type. With a derived
/// layout the bindings are added to it instead.
///
/// The structure sizes of buffer bindings are collected into
/// `shader_binding_sizes`, keyed by `(group, binding)`, so that late-sized
/// bindings can be checked when drawing.
pub(crate) fn check_stage(
    entry_point: &EntryPoint,
    layouts: &mut BindingLayoutSource<'_>,
    shader_binding_sizes: &mut FastHashMap<(u32, u32), wgt::BufferSize>,
) -> Result<(), StageError> {
    let stage_bit = entry_point.stage;

    for shader_binding in entry_point.bindings.iter() {
        let (group, binding) = (shader_binding.group, shader_binding.binding);

        if let ShaderBindingType::Buffer {
            min_binding_size: Some(size),
            ..
        } = shader_binding.ty
        {
            shader_binding_sizes
                .entry((group, binding))
                .and_modify(|s| *s = (*s).max(size))
                .or_insert(size);
        }

        let result = match *layouts {
            BindingLayoutSource::Provided(ref layouts) => layouts
                .get(group as usize)
                .and_then(|map| map.as_ref())
                .and_then(|map| map.get(binding))
                .ok_or(BindingError::Missing)
                .and_then(|entry| {
                    if entry.visibility.contains(stage_bit) {
                        Ok(entry)
                    } else {
                        Err(BindingError::Invisible)
                    }
                })
                .and_then(|entry| check_binding_use(shader_binding, entry)),
            BindingLayoutSource::Derived(ref mut layouts) => layouts
                .get_mut(group as usize)
                .ok_or(BindingError::Missing)
                .and_then(|set| {
                    let ty = derive_binding_type(shader_binding.ty);
                    match set.entry(binding) {
                        Entry::Occupied(e)
                            if e.get().ty != ty || e.get().count != shader_binding.count =>
                        {
                            Err(BindingError::InconsistentlyDerivedType)
                        }
                        Entry::Occupied(e) => {
                            e.into_mut().visibility |= stage_bit;
                            Ok(())
                        }
                        Entry::Vacant(e) => {
                            e.insert(ResolvedBindGroupLayoutEntry {
                                binding,
                                ty,
                                visibility: stage_bit,
                                count: shader_binding.count,
                                static_sampler: false,
                            });
                            Ok(())
                        }
                    }
                }),
        };
        if let Err(error) = result {
            return Err(StageError::Binding {
                group,
                binding,
                error,
            });
        }
    }

    Ok(())
}

/// Numeric class of the values a vertex format delivers to the shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NumericClass {
    Float,
    Uint,
    Sint,
}

fn vertex_format_class(format: wgt::VertexFormat) -> NumericClass {
    use wgt::VertexFormat as Vf;

    match format {
        Vf::Unorm8x4
        | Vf::Float16x4
        | Vf::Float32
        | Vf::Float32x2
        | Vf::Float32x3
        | Vf::Float32x4 => NumericClass::Float,
        Vf::Uint8x2 | Vf::Uint8x4 | Vf::Uint16x2 | Vf::Uint32 | Vf::Uint32x4 => NumericClass::Uint,
        Vf::Sint32 => NumericClass::Sint,
    }
}

/// Checks that every input of a vertex entry point is fed by an attribute of
/// the same numeric class.
pub(crate) fn check_vertex_inputs(
    entry_point: &EntryPoint,
    provided: &FastHashMap<wgt::ShaderLocation, wgt::VertexFormat>,
) -> Result<(), StageError> {
    for &(location, shader) in entry_point.inputs.iter() {
        let result = provided
            .get(&location)
            .ok_or(InputError::Missing)
            .and_then(|&provided| {
                if vertex_format_class(shader) == vertex_format_class(provided) {
                    Ok(())
                } else {
                    Err(InputError::WrongType { shader, provided })
                }
            });
        if let Err(error) = result {
            return Err(StageError::Input { location, error });
        }
    }
    Ok(())
}
