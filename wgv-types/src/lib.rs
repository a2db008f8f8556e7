/*! This library describes the API surface validated by `wgv-core`.
 *  Everything here is plain data: descriptors, flags, limits and formats.
 */

#![allow(
    // We don't use syntax sugar where it's not necessary.
    clippy::match_like_matches_macro,
)]
#![warn(missing_docs)]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

// Serializes the raw bits so that unknown bits survive a round trip and can
// be rejected by validation instead of by the deserializer.
macro_rules! impl_bitflags {
    ($name:ident) => {
        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.bits().serialize(serializer)
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<$name, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = <_ as serde::Deserialize<'de>>::deserialize(deserializer)?;
                Ok($name::from_bits_retain(value))
            }
        }

        impl $name {
            /// Returns true if the bitflags contains bits that are not part of
            /// the bitflags definition.
            pub fn contains_invalid_bits(&self) -> bool {
                let all = Self::all().bits();
                (self.bits() | all) != all
            }
        }
    };
}

/// Integral type used for buffer offsets.
pub type BufferAddress = u64;
/// Integral type used for buffer slice sizes.
pub type BufferSize = NonZeroU64;
/// Integral type used for binding locations in shaders.
pub type ShaderLocation = u32;
/// Integral type used for dynamic bind group offsets.
pub type DynamicOffset = u32;

/// Buffer-to-texture copies must have [`bytes_per_row`] aligned to this number.
///
/// Also the required alignment of buffer copy offsets and sizes.
///
/// [`bytes_per_row`]: https://gpuweb.github.io/gpuweb/#dom-gpuimagedatalayout-bytesperrow
pub const COPY_BUFFER_ALIGNMENT: BufferAddress = 4;
/// Alignment of the start of a mapped range.
pub const MAP_ALIGNMENT: BufferAddress = 8;
/// Vertex buffer strides have to be a multiple of this number.
pub const VERTEX_STRIDE_ALIGNMENT: BufferAddress = 4;
/// Offsets of buffer bindings have to be a multiple of this number, except
/// for dynamic uniform offsets, which follow
/// [`Limits::min_uniform_buffer_offset_alignment`].
pub const BUFFER_BINDING_ALIGNMENT: BufferAddress = 4;
/// Indirect buffer offsets have to be a multiple of this number.
pub const INDIRECT_OFFSET_ALIGNMENT: BufferAddress = 4;
/// Hard cap on the number of bind group slots of a pipeline layout.
pub const MAX_BIND_GROUPS: usize = 8;
/// Hard cap on the number of vertex buffer slots.
pub const MAX_VERTEX_BUFFERS: usize = 16;
/// Hard cap on the number of color attachments of a render pass.
pub const MAX_COLOR_ATTACHMENTS: usize = 8;
/// Binding numbers (including the whole range of a binding array) must be below this.
pub const MAX_BINDINGS_PER_BIND_GROUP: u32 = 1000;
/// Hard cap on the number of mip levels of a texture.
pub const MAX_MIP_LEVELS: u32 = 16;

bitflags::bitflags! {
    /// Features that are not guaranteed to be supported.
    ///
    /// They must be requested through [`DeviceDescriptor::required_features`]
    /// to be usable.
    #[repr(transparent)]
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Features: u64 {
        /// Allows `MAP_READ` and `MAP_WRITE` to be combined with any other buffer usage.
        const MAPPABLE_PRIMARY_BUFFERS = 1 << 0;
        /// Allows a bind group to provide fewer textures than a binding array declares.
        const PARTIALLY_BOUND_BINDING_ARRAY = 1 << 1;
        /// Allows `multi_draw_indirect` and `multi_draw_indexed_indirect`.
        const MULTI_DRAW_INDIRECT = 1 << 2;
        /// Allows the count-buffer flavors of multi-draw-indirect.
        const MULTI_DRAW_INDIRECT_COUNT = 1 << 3;
        /// Allows BC compressed texture formats.
        const TEXTURE_COMPRESSION_BC = 1 << 4;
        /// Allows `first_instance` in indirect draw arguments to be non-zero.
        const INDIRECT_FIRST_INSTANCE = 1 << 5;
        /// Allows bind group layouts to embed samplers that are bound implicitly.
        const STATIC_SAMPLERS = 1 << 6;
    }
}

impl_bitflags!(Features);

/// Numeric limits of a device.
///
/// Every limit corresponds to a WebGPU `GPUSupportedLimits` member and defaults
/// to the WebGPU default.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Limits {
    /// Maximum `size.width` of a 1D texture. Defaults to 8192.
    #[cfg_attr(feature = "serde", serde(rename = "maxTextureDimension1D"))]
    pub max_texture_dimension_1d: u32,
    /// Maximum `size.width` and `size.height` of a 2D texture. Defaults to 8192.
    #[cfg_attr(feature = "serde", serde(rename = "maxTextureDimension2D"))]
    pub max_texture_dimension_2d: u32,
    /// Maximum extent of a 3D texture in every dimension. Defaults to 2048.
    #[cfg_attr(feature = "serde", serde(rename = "maxTextureDimension3D"))]
    pub max_texture_dimension_3d: u32,
    /// Maximum `size.depth_or_array_layers` of a 2D texture. Defaults to 256.
    pub max_texture_array_layers: u32,
    /// Amount of bind groups that can be attached to a pipeline at the same time. Defaults to 4.
    pub max_bind_groups: u32,
    /// Maximum binding index allowed in `create_bind_group_layout`. Defaults to 1000.
    pub max_bindings_per_bind_group: u32,
    /// Amount of uniform buffer bindings that can be dynamic in a single pipeline. Defaults to 8.
    pub max_dynamic_uniform_buffers_per_pipeline_layout: u32,
    /// Amount of storage buffer bindings that can be dynamic in a single pipeline. Defaults to 4.
    pub max_dynamic_storage_buffers_per_pipeline_layout: u32,
    /// Amount of sampled textures visible in a single shader stage. Defaults to 16.
    pub max_sampled_textures_per_shader_stage: u32,
    /// Amount of samplers visible in a single shader stage. Defaults to 16.
    pub max_samplers_per_shader_stage: u32,
    /// Amount of storage buffers visible in a single shader stage. Defaults to 8.
    pub max_storage_buffers_per_shader_stage: u32,
    /// Amount of storage textures visible in a single shader stage. Defaults to 4.
    pub max_storage_textures_per_shader_stage: u32,
    /// Amount of uniform buffers visible in a single shader stage. Defaults to 12.
    pub max_uniform_buffers_per_shader_stage: u32,
    /// Maximum size in bytes of a binding to a uniform buffer. Defaults to 64 KiB.
    pub max_uniform_buffer_binding_size: u32,
    /// Maximum size in bytes of a binding to a storage buffer. Defaults to 128 MiB.
    pub max_storage_buffer_binding_size: u32,
    /// Maximum number of vertex buffer slots of a render pipeline. Defaults to 8.
    pub max_vertex_buffers: u32,
    /// Maximum size of a buffer. Defaults to 256 MiB.
    pub max_buffer_size: u64,
    /// Maximum number of vertex attributes, summed over all vertex buffers. Defaults to 16.
    pub max_vertex_attributes: u32,
    /// Maximum `array_stride` of a vertex buffer layout. Defaults to 2048.
    pub max_vertex_buffer_array_stride: u32,
    /// Required alignment of uniform buffer binding offsets and dynamic offsets. Defaults to 256.
    pub min_uniform_buffer_offset_alignment: u32,
    /// Required alignment of storage buffer binding offsets and dynamic offsets. Defaults to 256.
    pub min_storage_buffer_offset_alignment: u32,
    /// Maximum number of color attachments of a render pass or pipeline. Defaults to 8.
    pub max_color_attachments: u32,
    /// Maximum value of each dimension of a dispatch. Defaults to 65535.
    pub max_compute_workgroups_per_dimension: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_texture_dimension_1d: 8192,
            max_texture_dimension_2d: 8192,
            max_texture_dimension_3d: 2048,
            max_texture_array_layers: 256,
            max_bind_groups: 4,
            max_bindings_per_bind_group: 1000,
            max_dynamic_uniform_buffers_per_pipeline_layout: 8,
            max_dynamic_storage_buffers_per_pipeline_layout: 4,
            max_sampled_textures_per_shader_stage: 16,
            max_samplers_per_shader_stage: 16,
            max_storage_buffers_per_shader_stage: 8,
            max_storage_textures_per_shader_stage: 4,
            max_uniform_buffers_per_shader_stage: 12,
            max_uniform_buffer_binding_size: 64 << 10,
            max_storage_buffer_binding_size: 128 << 20,
            max_vertex_buffers: 8,
            max_buffer_size: 1 << 28,
            max_vertex_attributes: 16,
            max_vertex_buffer_array_stride: 2048,
            min_uniform_buffer_offset_alignment: 256,
            min_storage_buffer_offset_alignment: 256,
            max_color_attachments: 8,
            max_compute_workgroups_per_dimension: 65535,
        }
    }
}

impl Limits {
    /// The best limits the engine is able to validate against.
    ///
    /// Devices may request anything between [`Limits::default`] and these.
    pub fn supported() -> Self {
        Self {
            max_texture_dimension_1d: 16384,
            max_texture_dimension_2d: 16384,
            max_texture_dimension_3d: 2048,
            max_texture_array_layers: 2048,
            max_bind_groups: MAX_BIND_GROUPS as u32,
            max_bindings_per_bind_group: MAX_BINDINGS_PER_BIND_GROUP,
            max_dynamic_uniform_buffers_per_pipeline_layout: 16,
            max_dynamic_storage_buffers_per_pipeline_layout: 8,
            max_sampled_textures_per_shader_stage: 1_000_000,
            max_samplers_per_shader_stage: 1_000_000,
            max_storage_buffers_per_shader_stage: 1_000_000,
            max_storage_textures_per_shader_stage: 1_000_000,
            max_uniform_buffers_per_shader_stage: 1_000_000,
            max_uniform_buffer_binding_size: 1 << 30,
            max_storage_buffer_binding_size: 1 << 30,
            max_vertex_buffers: MAX_VERTEX_BUFFERS as u32,
            max_buffer_size: 1 << 40,
            max_vertex_attributes: 32,
            max_vertex_buffer_array_stride: 2048,
            min_uniform_buffer_offset_alignment: 32,
            min_storage_buffer_offset_alignment: 32,
            max_color_attachments: MAX_COLOR_ATTACHMENTS as u32,
            max_compute_workgroups_per_dimension: 65535,
        }
    }

    /// Whether a device with `allowed` limits can grant `self`.
    pub fn fits_within(&self, allowed: &Self) -> bool {
        self.violations(allowed).is_empty()
    }

    /// Every limit of `self` that is better than the one in `allowed`, as
    /// `(name, requested, allowed)` in declaration order.
    ///
    /// Alignments are better when smaller, everything else when larger.
    pub fn violations(&self, allowed: &Self) -> Vec<(&'static str, u64, u64)> {
        enum Bound {
            Max,
            Align,
        }

        macro_rules! table {
            ($($bound:ident $name:ident,)*) => {
                [$((
                    stringify!($name),
                    Bound::$bound,
                    u64::from(self.$name),
                    u64::from(allowed.$name),
                ),)*]
            };
        }

        let table = table! {
            Max max_texture_dimension_1d,
            Max max_texture_dimension_2d,
            Max max_texture_dimension_3d,
            Max max_texture_array_layers,
            Max max_bind_groups,
            Max max_bindings_per_bind_group,
            Max max_dynamic_uniform_buffers_per_pipeline_layout,
            Max max_dynamic_storage_buffers_per_pipeline_layout,
            Max max_sampled_textures_per_shader_stage,
            Max max_samplers_per_shader_stage,
            Max max_storage_buffers_per_shader_stage,
            Max max_storage_textures_per_shader_stage,
            Max max_uniform_buffers_per_shader_stage,
            Max max_uniform_buffer_binding_size,
            Max max_storage_buffer_binding_size,
            Max max_vertex_buffers,
            Max max_buffer_size,
            Max max_vertex_attributes,
            Max max_vertex_buffer_array_stride,
            Align min_uniform_buffer_offset_alignment,
            Align min_storage_buffer_offset_alignment,
            Max max_color_attachments,
            Max max_compute_workgroups_per_dimension,
        };

        table
            .into_iter()
            .filter(|(_, bound, requested, allowed)| match bound {
                Bound::Max => requested > allowed,
                Bound::Align => requested < allowed,
            })
            .map(|(name, _, requested, allowed)| (name, requested, allowed))
            .collect()
    }
}

/// Describes a device.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceDescriptor<L> {
    /// Debug label for the device.
    pub label: L,
    /// Features that the device should support.
    pub required_features: Features,
    /// Limits that the device should support.
    pub required_limits: Limits,
}

impl<L> DeviceDescriptor<L> {
    /// Takes a closure and maps the label of the device descriptor into another.
    pub fn map_label<K>(&self, fun: impl FnOnce(&L) -> K) -> DeviceDescriptor<K> {
        DeviceDescriptor {
            label: fun(&self.label),
            required_features: self.required_features,
            required_limits: self.required_limits.clone(),
        }
    }
}

/// Filter for error scopes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ErrorFilter {
    /// Catch only out-of-memory errors.
    OutOfMemory,
    /// Catch only validation errors.
    Validation,
    /// Catch only internal errors.
    Internal,
}

/// Reason the device-lost callback was invoked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceLostReason {
    /// The device was lost for a reason other than an explicit destroy.
    Unknown,
    /// The device was explicitly destroyed.
    Destroyed,
}

bitflags::bitflags! {
    /// Describes the shader stages that a binding will be visible from.
    #[repr(transparent)]
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        /// Binding is not visible from any shader stage.
        const NONE = 0;
        /// Binding is visible from the vertex shader of a render pipeline.
        const VERTEX = 1 << 0;
        /// Binding is visible from the fragment shader of a render pipeline.
        const FRAGMENT = 1 << 1;
        /// Binding is visible from the compute shader of a compute pipeline.
        const COMPUTE = 1 << 2;
        /// Binding is visible from the vertex and fragment shaders of a render pipeline.
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

impl_bitflags!(ShaderStages);

bitflags::bitflags! {
    /// Different ways that you can use a buffer.
    #[repr(transparent)]
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct BufferUsages: u32 {
        /// Allow a buffer to be mapped for reading.
        ///
        /// If [`Features::MAPPABLE_PRIMARY_BUFFERS`] isn't enabled, the only other usage a buffer
        /// may have is COPY_DST.
        const MAP_READ = 1 << 0;
        /// Allow a buffer to be mapped for writing.
        ///
        /// If [`Features::MAPPABLE_PRIMARY_BUFFERS`] isn't enabled, the only other usage a buffer
        /// may have is COPY_SRC.
        const MAP_WRITE = 1 << 1;
        /// Allow a buffer to be the source buffer of a copy.
        const COPY_SRC = 1 << 2;
        /// Allow a buffer to be the destination buffer of a copy or a clear.
        const COPY_DST = 1 << 3;
        /// Allow a buffer to be the index buffer in a draw operation.
        const INDEX = 1 << 4;
        /// Allow a buffer to be the vertex buffer in a draw operation.
        const VERTEX = 1 << 5;
        /// Allow a buffer to be a [`BufferBindingType::Uniform`] inside a bind group.
        const UNIFORM = 1 << 6;
        /// Allow a buffer to be a [`BufferBindingType::Storage`] inside a bind group.
        const STORAGE = 1 << 7;
        /// Allow a buffer to be the indirect buffer in an indirect draw or dispatch.
        const INDIRECT = 1 << 8;
        /// Allow a buffer to be the destination of a query resolve.
        const QUERY_RESOLVE = 1 << 9;
    }
}

impl_bitflags!(BufferUsages);

/// Describes a buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BufferDescriptor<L> {
    /// Debug label of a buffer.
    pub label: L,
    /// Size of a buffer.
    pub size: BufferAddress,
    /// Usages of a buffer.
    pub usage: BufferUsages,
    /// Allows a buffer to be mapped immediately after it is made.
    ///
    /// If this is `true`, [`size`](#structfield.size) must be a multiple of
    /// [`COPY_BUFFER_ALIGNMENT`].
    pub mapped_at_creation: bool,
}

impl<L> BufferDescriptor<L> {
    /// Takes a closure and maps the label of the buffer descriptor into another.
    pub fn map_label<K>(&self, fun: impl FnOnce(&L) -> K) -> BufferDescriptor<K> {
        BufferDescriptor {
            label: fun(&self.label),
            size: self.size,
            usage: self.usage,
            mapped_at_creation: self.mapped_at_creation,
        }
    }
}

/// Describes a command encoder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CommandEncoderDescriptor<L> {
    /// Debug label for the command encoder.
    pub label: L,
}

impl<L> CommandEncoderDescriptor<L> {
    /// Takes a closure and maps the label of the command encoder descriptor into another.
    pub fn map_label<K>(&self, fun: impl FnOnce(&L) -> K) -> CommandEncoderDescriptor<K> {
        CommandEncoderDescriptor {
            label: fun(&self.label),
        }
    }
}

/// Describes a command buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CommandBufferDescriptor<L> {
    /// Debug label of this command buffer.
    pub label: L,
}

bitflags::bitflags! {
    /// Different ways that you can use a texture.
    #[repr(transparent)]
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct TextureUsages: u32 {
        /// Allows a texture to be the source of a copy.
        const COPY_SRC = 1 << 0;
        /// Allows a texture to be the destination of a copy.
        const COPY_DST = 1 << 1;
        /// Allows a texture to be a [`BindingType::Texture`] in a bind group.
        const TEXTURE_BINDING = 1 << 2;
        /// Allows a texture to be a [`BindingType::StorageTexture`] in a bind group.
        const STORAGE_BINDING = 1 << 3;
        /// Allows a texture to be an output attachment of a render pass.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

impl_bitflags!(TextureUsages);

/// Dimensionality of a texture.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextureDimension {
    /// 1D texture
    D1,
    /// 2D texture
    #[default]
    D2,
    /// 3D texture
    D3,
}

/// Dimensions of a particular texture view.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextureViewDimension {
    /// A one dimensional texture. `texture_1d` in WGSL.
    D1,
    /// A two dimensional texture. `texture_2d` in WGSL.
    #[default]
    D2,
    /// A two dimensional array texture. `texture_2d_array` in WGSL.
    D2Array,
    /// A cubemap texture. `texture_cube` in WGSL.
    Cube,
    /// A cubemap array texture. `texture_cube_array` in WGSL.
    CubeArray,
    /// A three dimensional texture. `texture_3d` in WGSL.
    D3,
}

impl TextureViewDimension {
    /// Get the texture dimension required of this texture view dimension.
    pub fn compatible_texture_dimension(self) -> TextureDimension {
        match self {
            Self::D1 => TextureDimension::D1,
            Self::D2 | Self::D2Array | Self::Cube | Self::CubeArray => TextureDimension::D2,
            Self::D3 => TextureDimension::D3,
        }
    }
}

/// Kind of data the texture holds, for a view that only looks at part of it.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextureAspect {
    /// Depth, Stencil, and Color.
    #[default]
    All,
    /// Stencil.
    StencilOnly,
    /// Depth.
    DepthOnly,
}

/// Underlying texture data format.
///
/// Only the formats the engine knows how to validate are listed.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextureFormat {
    /// Red channel only. 8 bit integer per channel. [0, 255] converted to/from float [0, 1] in shader.
    R8Unorm,
    /// Red channel only. 8 bit integer per channel. Unsigned in shader.
    R8Uint,
    /// Red channel only. 8 bit integer per channel. Signed in shader.
    R8Sint,
    /// Red and green channels. 8 bit integer per channel. [0, 255] converted to/from float [0, 1] in shader.
    Rg8Unorm,
    /// Red channel only. 16 bit float per channel. Float in shader.
    R16Float,
    /// Red channel only. 32 bit integer per channel. Unsigned in shader.
    R32Uint,
    /// Red channel only. 32 bit integer per channel. Signed in shader.
    R32Sint,
    /// Red channel only. 32 bit float per channel. Float in shader, not filterable.
    R32Float,
    /// Red, green, blue, and alpha channels. 8 bit integer per channel. [0, 255] converted to/from float [0, 1] in shader.
    Rgba8Unorm,
    /// Red, green, blue, and alpha channels. 8 bit integer per channel. Srgb-color [0, 255] converted to/from linear-color float [0, 1] in shader.
    Rgba8UnormSrgb,
    /// Red, green, blue, and alpha channels. 8 bit integer per channel. Unsigned in shader.
    Rgba8Uint,
    /// Red, green, blue, and alpha channels. 8 bit integer per channel. Signed in shader.
    Rgba8Sint,
    /// Blue, green, red, and alpha channels. 8 bit integer per channel. [0, 255] converted to/from float [0, 1] in shader.
    Bgra8Unorm,
    /// Red, green, blue, and alpha channels. 16 bit float per channel. Float in shader.
    Rgba16Float,
    /// Red, green, blue, and alpha channels. 32 bit integer per channel. Unsigned in shader.
    Rgba32Uint,
    /// Red, green, blue, and alpha channels. 32 bit float per channel. Float in shader, not filterable.
    Rgba32Float,
    /// Stencil format with 8 bit integer stencil.
    Stencil8,
    /// Special depth format with 16 bit integer depth.
    Depth16Unorm,
    /// Special depth format with at least 24 bit integer depth.
    Depth24Plus,
    /// Special depth/stencil format with at least 24 bit integer depth and 8 bits integer stencil.
    Depth24PlusStencil8,
    /// Special depth format with 32 bit floating point depth.
    Depth32Float,
    /// 4x4 block compressed texture. 8 bytes per block. Requires [`Features::TEXTURE_COMPRESSION_BC`].
    Bc1RgbaUnorm,
    /// 4x4 block compressed texture. 16 bytes per block. Requires [`Features::TEXTURE_COMPRESSION_BC`].
    Bc3RgbaUnorm,
    /// 4x4 block compressed texture. 16 bytes per block. Requires [`Features::TEXTURE_COMPRESSION_BC`].
    Bc7RgbaUnorm,
}

impl TextureFormat {
    /// Returns the features required to use this format.
    pub fn required_features(&self) -> Features {
        if self.is_compressed() {
            Features::TEXTURE_COMPRESSION_BC
        } else {
            Features::empty()
        }
    }

    /// Returns `true` if `self` is a depth or stencil component of the given
    /// combined depth-stencil format
    pub fn is_depth_stencil_component(&self, combined_format: Self) -> bool {
        match (combined_format, *self) {
            (Self::Depth24PlusStencil8, Self::Depth24Plus | Self::Stencil8) => true,
            _ => false,
        }
    }

    /// Returns `true` if the format is a depth and/or stencil format
    pub fn is_depth_stencil_format(&self) -> bool {
        match *self {
            Self::Stencil8
            | Self::Depth16Unorm
            | Self::Depth24Plus
            | Self::Depth24PlusStencil8
            | Self::Depth32Float => true,
            _ => false,
        }
    }

    /// Returns `true` if the format is a combined depth-stencil format
    pub fn is_combined_depth_stencil_format(&self) -> bool {
        match *self {
            Self::Depth24PlusStencil8 => true,
            _ => false,
        }
    }

    /// Returns `true` if the format has a depth aspect
    pub fn has_depth_aspect(&self) -> bool {
        match *self {
            Self::Depth16Unorm
            | Self::Depth24Plus
            | Self::Depth24PlusStencil8
            | Self::Depth32Float => true,
            _ => false,
        }
    }

    /// Returns `true` if the format has a stencil aspect
    pub fn has_stencil_aspect(&self) -> bool {
        match *self {
            Self::Stencil8 | Self::Depth24PlusStencil8 => true,
            _ => false,
        }
    }

    /// Returns the dimension of a [block](https://gpuweb.github.io/gpuweb/#texel-block) of texels.
    ///
    /// Uncompressed formats have a block dimension of `(1, 1)`.
    pub fn block_dimensions(&self) -> (u32, u32) {
        match *self {
            Self::Bc1RgbaUnorm | Self::Bc3RgbaUnorm | Self::Bc7RgbaUnorm => (4, 4),
            _ => (1, 1),
        }
    }

    /// Returns `true` for compressed formats.
    pub fn is_compressed(&self) -> bool {
        self.block_dimensions() != (1, 1)
    }

    /// Returns `true` if the format can be used as a color render attachment.
    pub fn is_color_renderable(&self) -> bool {
        !self.is_compressed() && !self.is_depth_stencil_format()
    }

    /// Returns `true` if textures of this format may have a sample count above 1.
    pub fn is_multisample_capable(&self) -> bool {
        match *self {
            Self::Rgba32Uint | Self::Rgba32Float | Self::R32Uint | Self::R32Sint => false,
            Self::Bc1RgbaUnorm | Self::Bc3RgbaUnorm | Self::Bc7RgbaUnorm => false,
            _ => true,
        }
    }

    /// Returns `true` if the format may be used for storage textures.
    pub fn is_storage_capable(&self) -> bool {
        match *self {
            Self::R32Uint
            | Self::R32Sint
            | Self::R32Float
            | Self::Rgba8Unorm
            | Self::Rgba8Uint
            | Self::Rgba8Sint
            | Self::Rgba16Float
            | Self::Rgba32Uint
            | Self::Rgba32Float => true,
            _ => false,
        }
    }

    /// Returns `true` if the format supports `read_write` storage access.
    pub fn is_storage_read_write_capable(&self) -> bool {
        match *self {
            Self::R32Uint | Self::R32Sint | Self::R32Float => true,
            _ => false,
        }
    }

    /// Returns the sample type compatible with this format and aspect.
    ///
    /// Returns `None` only if this is a combined depth-stencil format and `TextureAspect::All`
    /// or no `aspect` was provided.
    pub fn sample_type(&self, aspect: Option<TextureAspect>) -> Option<TextureSampleType> {
        let float = TextureSampleType::Float { filterable: true };
        let unfilterable_float = TextureSampleType::Float { filterable: false };
        let depth = TextureSampleType::Depth;
        let uint = TextureSampleType::Uint;
        let sint = TextureSampleType::Sint;

        match *self {
            Self::R8Unorm
            | Self::Rg8Unorm
            | Self::R16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Rgba16Float
            | Self::Bc1RgbaUnorm
            | Self::Bc3RgbaUnorm
            | Self::Bc7RgbaUnorm => Some(float),

            Self::R32Float | Self::Rgba32Float => Some(unfilterable_float),

            Self::R8Uint | Self::R32Uint | Self::Rgba8Uint | Self::Rgba32Uint => Some(uint),
            Self::R8Sint | Self::R32Sint | Self::Rgba8Sint => Some(sint),

            Self::Stencil8 => Some(uint),
            Self::Depth16Unorm | Self::Depth24Plus | Self::Depth32Float => Some(depth),
            Self::Depth24PlusStencil8 => match aspect {
                None | Some(TextureAspect::All) => None,
                Some(TextureAspect::DepthOnly) => Some(depth),
                Some(TextureAspect::StencilOnly) => Some(uint),
            },
        }
    }
}

/// Extent of a texture related operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Extent3d {
    /// Width of the extent
    pub width: u32,
    /// Height of the extent
    pub height: u32,
    /// The depth of the extent or the number of array layers
    pub depth_or_array_layers: u32,
}

impl Default for Extent3d {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        }
    }
}

impl Extent3d {
    /// Calculates the maximum possible count of mipmaps.
    ///
    /// Treats the depth as part of the mipmaps. If calculating
    /// for a 2DArray texture, which does not mipmap depth, set depth to 1.
    pub fn max_mips(&self, dim: TextureDimension) -> u32 {
        match dim {
            TextureDimension::D1 => 1,
            TextureDimension::D2 => {
                let max_dim = self.width.max(self.height);
                32 - max_dim.leading_zeros()
            }
            TextureDimension::D3 => {
                let max_dim = self.width.max(self.height.max(self.depth_or_array_layers));
                32 - max_dim.leading_zeros()
            }
        }
    }

    /// Calculates the extent at a given mip level.
    pub fn mip_level_size(&self, level: u32, dim: TextureDimension) -> Self {
        Self {
            width: u32::max(1, self.width >> level),
            height: match dim {
                TextureDimension::D1 => 1,
                _ => u32::max(1, self.height >> level),
            },
            depth_or_array_layers: match dim {
                TextureDimension::D1 | TextureDimension::D2 => self.depth_or_array_layers,
                TextureDimension::D3 => u32::max(1, self.depth_or_array_layers >> level),
            },
        }
    }

    /// Returns the number of array layers of a texture of dimension `dim`.
    pub fn array_layer_count(&self, dim: TextureDimension) -> u32 {
        match dim {
            TextureDimension::D1 | TextureDimension::D3 => 1,
            TextureDimension::D2 => self.depth_or_array_layers,
        }
    }
}

/// Describes a texture.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextureDescriptor<L> {
    /// Debug label of the texture.
    pub label: L,
    /// Size of the texture. All components must be greater than zero.
    pub size: Extent3d,
    /// Mip count of texture.
    pub mip_level_count: u32,
    /// Sample count of texture. If this is not 1, texture must have [`BindingType::Texture::multisampled`] set to true.
    pub sample_count: u32,
    /// Dimensions of the texture.
    pub dimension: TextureDimension,
    /// Format of the texture.
    pub format: TextureFormat,
    /// Allowed usages of the texture.
    pub usage: TextureUsages,
}

impl<L> TextureDescriptor<L> {
    /// Takes a closure and maps the label of the texture descriptor into another.
    pub fn map_label<K>(&self, fun: impl FnOnce(&L) -> K) -> TextureDescriptor<K> {
        TextureDescriptor {
            label: fun(&self.label),
            size: self.size,
            mip_level_count: self.mip_level_count,
            sample_count: self.sample_count,
            dimension: self.dimension,
            format: self.format,
            usage: self.usage,
        }
    }

    /// Returns the number of array layers.
    pub fn array_layer_count(&self) -> u32 {
        self.size.array_layer_count(self.dimension)
    }
}

/// Subresource range within an image.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImageSubresourceRange {
    /// Aspect of the texture.
    pub aspect: TextureAspect,
    /// Base mip level.
    pub base_mip_level: u32,
    /// Mip level count. If `None`, all mips from the base are included.
    pub mip_level_count: Option<u32>,
    /// Base array layer.
    pub base_array_layer: u32,
    /// Layer count. If `None`, all layers from the base are included.
    pub array_layer_count: Option<u32>,
}

/// How edges should be handled in texture addressing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AddressMode {
    /// Clamp the value to the edge of the texture.
    #[default]
    ClampToEdge,
    /// Repeat the texture in a tiling fashion.
    Repeat,
    /// Repeat the texture, mirroring it every repeat.
    MirrorRepeat,
}

/// Texel mixing mode when sampling between texels.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FilterMode {
    /// Nearest neighbor sampling.
    #[default]
    Nearest,
    /// Linear Interpolation.
    Linear,
}

/// Comparison function used for depth and stencil operations.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CompareFunction {
    /// Function never passes
    Never,
    /// Function passes if new value less than existing value
    Less,
    /// Function passes if new value is equal to existing value.
    Equal,
    /// Function passes if new value is less than or equal to existing value
    LessEqual,
    /// Function passes if new value is greater than existing value
    Greater,
    /// Function passes if new value is not equal to existing value.
    NotEqual,
    /// Function passes if new value is greater than or equal to existing value
    GreaterEqual,
    /// Function always passes
    Always,
}

/// Specific type of a buffer binding.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BufferBindingType {
    /// A buffer for uniform values. `var<uniform>` in WGSL.
    #[default]
    Uniform,
    /// A storage buffer. `var<storage, read_write>` in WGSL,
    /// or `var<storage, read>` if `read_only` is set.
    Storage {
        /// If `true`, the buffer can only be read in the shader.
        read_only: bool,
    },
}

/// Specific type of a sample in a texture binding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextureSampleType {
    /// Sampling returns floats. `texture_2d<f32>` in WGSL.
    Float {
        /// If this is `false`, the texture can't be sampled with
        /// a filtering sampler.
        filterable: bool,
    },
    /// Sampling does the depth reference comparison. `texture_depth_2d` in WGSL.
    Depth,
    /// Sampling returns signed integers. `texture_2d<i32>` in WGSL.
    Sint,
    /// Sampling returns unsigned integers. `texture_2d<u32>` in WGSL.
    Uint,
}

impl Default for TextureSampleType {
    fn default() -> Self {
        Self::Float { filterable: true }
    }
}

/// Specific type of a storage texture binding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StorageTextureAccess {
    /// The texture can only be written in the shader.
    WriteOnly,
    /// The texture can only be read in the shader.
    ReadOnly,
    /// The texture can be both read and written in the shader.
    ReadWrite,
}

/// Specific type of a sampler binding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SamplerBindingType {
    /// The sampling result is produced based on more than a single color sample from a texture,
    /// e.g. when bilinear interpolation is enabled.
    Filtering,
    /// The sampling result is produced based on a single color sample from a texture.
    NonFiltering,
    /// Use as a comparison sampler instead of a normal sampler.
    Comparison,
}

/// Specific type of a binding, resolved from a bind group layout entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BindingType {
    /// A buffer binding.
    Buffer {
        /// Sub-type of the buffer binding.
        ty: BufferBindingType,
        /// Indicates that the binding has a dynamic offset.
        has_dynamic_offset: bool,
        /// Minimum size of the corresponding `BufferBinding` required to match this entry.
        /// If `None`, the check is performed at draw call time instead.
        min_binding_size: Option<BufferSize>,
    },
    /// A sampler that can be used to sample a texture.
    Sampler(SamplerBindingType),
    /// A texture binding.
    Texture {
        /// Sample type of the texture binding.
        sample_type: TextureSampleType,
        /// Dimension of the texture view that is going to be sampled.
        view_dimension: TextureViewDimension,
        /// True if the texture has a sample count greater than 1.
        multisampled: bool,
    },
    /// A storage texture.
    StorageTexture {
        /// Allowed access to this texture.
        access: StorageTextureAccess,
        /// Format of the texture.
        format: TextureFormat,
        /// Dimension of the texture view that is going to be accessed.
        view_dimension: TextureViewDimension,
    },
    /// An external texture (video frame) binding.
    ExternalTexture,
}

impl BindingType {
    /// Returns true for buffer bindings with dynamic offset enabled.
    pub fn has_dynamic_offset(&self) -> bool {
        match *self {
            Self::Buffer {
                has_dynamic_offset, ..
            } => has_dynamic_offset,
            _ => false,
        }
    }
}

/// Vertex Format for a [`VertexAttribute`] (input).
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VertexFormat {
    /// Two unsigned bytes (u8). `vec2<u32>` in shaders.
    Uint8x2,
    /// Four unsigned bytes (u8). `vec4<u32>` in shaders.
    Uint8x4,
    /// Four unsigned bytes (u8). [0, 255] converted to float [0, 1] `vec4<f32>` in shaders.
    Unorm8x4,
    /// Two unsigned shorts (u16). `vec2<u32>` in shaders.
    Uint16x2,
    /// Four half-precision floats (no Rust equiv). `vec4<f32>` in shaders.
    Float16x4,
    /// One single-precision float (f32). `f32` in shaders.
    Float32,
    /// Two single-precision floats (f32). `vec2<f32>` in shaders.
    Float32x2,
    /// Three single-precision floats (f32). `vec3<f32>` in shaders.
    Float32x3,
    /// Four single-precision floats (f32). `vec4<f32>` in shaders.
    Float32x4,
    /// One unsigned int (u32). `u32` in shaders.
    Uint32,
    /// Four unsigned ints (u32). `vec4<u32>` in shaders.
    Uint32x4,
    /// One signed int (i32). `i32` in shaders.
    Sint32,
}

impl VertexFormat {
    /// Returns the byte size of the format.
    pub const fn size(&self) -> u64 {
        match self {
            Self::Uint8x2 => 2,
            Self::Uint8x4 | Self::Unorm8x4 | Self::Uint16x2 => 4,
            Self::Float16x4 | Self::Float32x2 => 8,
            Self::Float32 | Self::Uint32 | Self::Sint32 => 4,
            Self::Float32x3 => 12,
            Self::Float32x4 | Self::Uint32x4 => 16,
        }
    }
}

/// Whether a vertex buffer is indexed by vertex or by instance.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VertexStepMode {
    /// Vertex data is advanced every vertex.
    #[default]
    Vertex,
    /// Vertex data is advanced every instance.
    Instance,
}

/// Vertex inputs (attributes) to shaders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexAttribute {
    /// Format of the input
    pub format: VertexFormat,
    /// Byte offset of the start of the input
    pub offset: BufferAddress,
    /// Location for this input. Must match the location in the shader.
    pub shader_location: ShaderLocation,
}

/// Format of indices used with pipeline.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IndexFormat {
    /// Indices are 16 bit unsigned integers.
    Uint16,
    /// Indices are 32 bit unsigned integers.
    #[default]
    Uint32,
}

impl IndexFormat {
    /// Returns the size in bytes of one index.
    pub const fn byte_size(&self) -> u64 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Primitive type the input mesh is composed of.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PrimitiveTopology {
    /// Vertex data is a list of points.
    PointList,
    /// Vertex data is a list of lines.
    LineList,
    /// Vertex data is a strip of lines.
    LineStrip,
    /// Vertex data is a list of triangles.
    #[default]
    TriangleList,
    /// Vertex data is a triangle strip.
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Returns true for strip topologies.
    pub fn is_strip(&self) -> bool {
        match *self {
            Self::PointList | Self::LineList | Self::TriangleList => false,
            Self::LineStrip | Self::TriangleStrip => true,
        }
    }
}

/// Describes the state of primitive assembly and rasterization in a render pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrimitiveState {
    /// The primitive topology used to interpret vertices.
    pub topology: PrimitiveTopology,
    /// When drawing strip topologies with indices, this is the required format for the index buffer.
    pub strip_index_format: Option<IndexFormat>,
}

/// Describes the multi-sampling state of a render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultisampleState {
    /// The number of samples calculated per pixel.
    pub count: u32,
}

impl Default for MultisampleState {
    fn default() -> Self {
        MultisampleState { count: 1 }
    }
}

/// Describes the color state of a render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorTargetState {
    /// The format of the target.
    pub format: TextureFormat,
}

impl From<TextureFormat> for ColorTargetState {
    fn from(format: TextureFormat) -> Self {
        Self { format }
    }
}

/// Describes the depth/stencil state in a render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DepthStencilState {
    /// Format of the depth/stencil buffer.
    pub format: TextureFormat,
    /// If disabled, depth will not be written to.
    pub depth_write_enabled: bool,
    /// Comparison function used to compare depth values in the depth test.
    pub depth_compare: CompareFunction,
    /// Stencil write mask. Zero means the stencil aspect is never written.
    pub stencil_write_mask: u32,
}

impl DepthStencilState {
    /// Returns true if the depth aspect is only read.
    pub fn is_depth_read_only(&self) -> bool {
        !self.depth_write_enabled
    }

    /// Returns true if the stencil aspect is only read.
    pub fn is_stencil_read_only(&self) -> bool {
        !self.format.has_stencil_aspect() || self.stencil_write_mask == 0
    }

    /// Returns true if the state doesn't mutate either depth or stencil of the target.
    pub fn is_read_only(&self) -> bool {
        self.is_depth_read_only() && self.is_stencil_read_only()
    }
}

/// Describes the depth/stencil attachment for render bundles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RenderBundleDepthStencil {
    /// Format of the attachment.
    pub format: TextureFormat,
    /// If the depth aspect of the depth stencil attachment is going to be written to.
    pub depth_read_only: bool,
    /// If the stencil aspect of the depth stencil attachment is going to be written to.
    pub stencil_read_only: bool,
}

/// Argument buffer layout for `draw_indirect` commands.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct DrawIndirectArgs {
    /// The number of vertices to draw.
    pub vertex_count: u32,
    /// The number of instances to draw.
    pub instance_count: u32,
    /// The Index of the first vertex to draw.
    pub first_vertex: u32,
    /// The instance ID of the first instance to draw.
    pub first_instance: u32,
}

/// Argument buffer layout for `draw_indexed_indirect` commands.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct DrawIndexedIndirectArgs {
    /// The number of indices to draw.
    pub index_count: u32,
    /// The number of instances to draw.
    pub instance_count: u32,
    /// The first index within the index buffer.
    pub first_index: u32,
    /// The value added to the vertex index before indexing into the vertex buffer.
    pub base_vertex: i32,
    /// The instance ID of the first instance to draw.
    pub first_instance: u32,
}

/// Argument buffer layout for `dispatch_indirect` commands.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct DispatchIndirectArgs {
    /// The number of work groups in X dimension.
    pub x: u32,
    /// The number of work groups in Y dimension.
    pub y: u32,
    /// The number of work groups in Z dimension.
    pub z: u32,
}

/// RGBA double precision color.
///
/// This is not to be used as a generic color type, only for specific API calls.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color {
    /// Red component of the color
    pub r: f64,
    /// Green component of the color
    pub g: f64,
    /// Blue component of the color
    pub b: f64,
    /// Alpha component of the color
    pub a: f64,
}

#[allow(missing_docs)]
impl Color {
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
}

/// Operation to perform to the output attachment at the start of a render pass.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LoadOp<V> {
    /// Loads the specified value for this attachment into the render pass.
    Clear(V),
    /// Loads the existing value for this attachment into the render pass.
    Load,
}

/// Operation to perform to the output attachment at the end of a render pass.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StoreOp {
    /// Stores the resulting value of the render pass for this attachment.
    #[default]
    Store,
    /// Discards the resulting value of the render pass for this attachment.
    Discard,
}
