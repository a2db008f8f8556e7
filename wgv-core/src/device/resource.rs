use crate::{
    binding_model::{
        self, BindGroup, BindGroupLayout, BindGroupLayoutEntry, BindingTypeMaxCountValidator,
        CreateBindGroupError, CreateBindGroupLayoutError, CreatePipelineLayoutError,
        PipelineLayout, ResolvedBindGroupDescriptor, ResolvedBindingResource,
        ResolvedBufferBinding,
    },
    conv,
    device::{
        bgl, BufferMapPendingClosure, DeviceError, DeviceLostClosure, MissingFeatures,
        RenderPassContext, AttachmentData,
    },
    error::{make_error, ErrorSink, WebGpuError},
    pipeline::{self, ImplicitLayoutError},
    resource::{
        self, Buffer, BufferMapState, CreateBufferError, CreateSamplerError, CreateTextureError,
        CreateTextureViewError, FormatAspects, Labeled, MapAbortReason, ParentDevice, Sampler,
        Texture, TextureView, TextureViewNotRenderableReason, TrackingData,
    },
    track::{BindGroupStates, TextureSelector, TextureUses, TrackerIndexAllocators},
    validation::{self, BindingLayoutSource},
    FastHashMap, FastHashSet, Label, LabelHelpers,
};

use arrayvec::ArrayVec;
use parking_lot::Mutex;

use std::{
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Structure describing a logical device. Some members are internally mutable,
/// stored behind mutexes.
///
/// A device validates everything created on it against its features and
/// limits, and owns the error sink every failure of those objects is reported
/// to.
pub struct Device {
    /// The `label` from the descriptor used to create the resource.
    pub(crate) label: String,
    pub(crate) features: wgt::Features,
    pub(crate) limits: wgt::Limits,
    valid: AtomicBool,
    pub(crate) error_sink: Mutex<ErrorSink>,
    pub(crate) tracker_indices: TrackerIndexAllocators,
    /// Buffers with a mapping waiting for the next poll.
    pub(crate) pending_maps: Mutex<Vec<Arc<Buffer>>>,
    pub(crate) device_lost_closure: Mutex<Option<DeviceLostClosure>>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("label", &self.label())
            .field("features", &self.features)
            .field("limits", &self.limits)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        resource_log!("Drop {}", self.error_ident());
    }
}

crate::resource_traits!(root Device);

/// Returns the format of a single aspect of a combined depth-stencil format.
fn aspect_specific_format(
    format: wgt::TextureFormat,
    aspect: wgt::TextureAspect,
) -> Option<wgt::TextureFormat> {
    match (format, aspect) {
        (wgt::TextureFormat::Depth24PlusStencil8, wgt::TextureAspect::DepthOnly) => {
            Some(wgt::TextureFormat::Depth24Plus)
        }
        (wgt::TextureFormat::Depth24PlusStencil8, wgt::TextureAspect::StencilOnly) => {
            Some(wgt::TextureFormat::Stencil8)
        }
        _ => None,
    }
}

impl Device {
    pub(crate) fn new(desc: &wgt::DeviceDescriptor<Label>) -> Self {
        Self {
            label: desc.label.to_string(),
            features: desc.required_features,
            limits: desc.required_limits.clone(),
            valid: AtomicBool::new(true),
            error_sink: Mutex::new(ErrorSink::new()),
            tracker_indices: TrackerIndexAllocators::new(),
            pending_maps: Mutex::new(Vec::new()),
            device_lost_closure: Mutex::new(None),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub(crate) fn check_is_valid(&self) -> Result<(), DeviceError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(DeviceError::Lost)
        }
    }

    pub(crate) fn require_features(&self, feature: wgt::Features) -> Result<(), MissingFeatures> {
        if self.features.contains(feature) {
            Ok(())
        } else {
            Err(MissingFeatures(feature))
        }
    }

    /// Reports an error to the device's error sink.
    ///
    /// Device-loss errors are dropped. The uncaptured-error handler runs
    /// after the sink is unlocked, so it may call back into the device.
    pub(crate) fn handle_error<E>(&self, fn_ident: &'static str, label: String, cause: E)
    where
        E: WebGpuError + Send + Sync,
    {
        let Some(error) = make_error(fn_ident, label, cause) else {
            return;
        };
        let uncaptured = self.error_sink.lock().handle_error(error);
        if let Some(uncaptured) = uncaptured {
            uncaptured.deliver();
        }
    }

    /// Marks the device as lost.
    ///
    /// Returns the aborted pending maps and the device-lost callback, to be
    /// fired by the caller once no lock is held. Losing a lost device
    /// returns nothing.
    pub(crate) fn lose(&self) -> (Vec<BufferMapPendingClosure>, Option<DeviceLostClosure>) {
        if !self.valid.swap(false, Ordering::AcqRel) {
            return (Vec::new(), None);
        }
        resource_log!("Lose {}", self.error_ident());

        let pending = mem::take(&mut *self.pending_maps.lock());
        let closures = pending
            .iter()
            .filter_map(|buffer| buffer.reset_map_state(MapAbortReason::DeviceLost))
            .collect();
        (closures, self.device_lost_closure.lock().take())
    }

    /// Resolves every mapping requested since the last poll.
    ///
    /// The pending list is taken by value, so maps requested from the
    /// returned callbacks wait for the next poll.
    pub(crate) fn poll(&self) -> Vec<BufferMapPendingClosure> {
        let pending = mem::take(&mut *self.pending_maps.lock());
        pending
            .iter()
            .filter_map(|buffer| buffer.resolve_pending_map())
            .collect()
    }

    pub(crate) fn create_buffer(
        self: &Arc<Self>,
        desc: &resource::BufferDescriptor,
    ) -> Result<Arc<Buffer>, CreateBufferError> {
        self.check_is_valid()?;

        if desc.usage.is_empty() || desc.usage.contains_invalid_bits() {
            return Err(CreateBufferError::InvalidUsage(desc.usage));
        }

        if !self
            .features
            .contains(wgt::Features::MAPPABLE_PRIMARY_BUFFERS)
        {
            use wgt::BufferUsages as Bu;
            let write_mismatch = desc.usage.contains(Bu::MAP_WRITE)
                && !(Bu::MAP_WRITE | Bu::COPY_SRC).contains(desc.usage);
            let read_mismatch = desc.usage.contains(Bu::MAP_READ)
                && !(Bu::MAP_READ | Bu::COPY_DST).contains(desc.usage);
            if write_mismatch || read_mismatch {
                return Err(CreateBufferError::UsageMismatch(desc.usage));
            }
        }

        if desc.size > self.limits.max_buffer_size {
            return Err(CreateBufferError::MaxBufferSize {
                requested: desc.size,
                maximum: self.limits.max_buffer_size,
            });
        }

        if desc.mapped_at_creation && desc.size % wgt::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(CreateBufferError::UnalignedSize);
        }

        let map_state = if desc.mapped_at_creation {
            BufferMapState::Init
        } else {
            BufferMapState::Idle
        };

        let buffer = Buffer {
            device: self.clone(),
            usage: desc.usage,
            size: desc.size,
            label: desc.label.to_string(),
            tracking_data: TrackingData::new(self.tracker_indices.buffers.clone()),
            destroyed: AtomicBool::new(false),
            map_state: Mutex::new(map_state),
        };

        Ok(Arc::new(buffer))
    }

    pub(crate) fn create_texture(
        self: &Arc<Self>,
        desc: &resource::TextureDescriptor,
    ) -> Result<Arc<Texture>, CreateTextureError> {
        use resource::TextureDimensionError as Tde;

        self.check_is_valid()?;

        if desc.usage.is_empty() || desc.usage.contains_invalid_bits() {
            return Err(CreateTextureError::InvalidUsage(desc.usage));
        }

        self.require_features(desc.format.required_features())
            .map_err(|error| CreateTextureError::MissingFeatures(desc.format, error))?;

        conv::check_texture_dimension_size(
            desc.dimension,
            desc.size,
            desc.sample_count,
            &self.limits,
        )?;

        if desc.dimension != wgt::TextureDimension::D2 {
            // Depth textures can only be 2D
            if desc.format.is_depth_stencil_format() {
                return Err(CreateTextureError::InvalidDepthDimension(
                    desc.dimension,
                    desc.format,
                ));
            }
            // Renderable textures can only be 2D
            if desc.usage.contains(wgt::TextureUsages::RENDER_ATTACHMENT) {
                return Err(CreateTextureError::InvalidDimensionUsages(
                    wgt::TextureUsages::RENDER_ATTACHMENT,
                    desc.dimension,
                ));
            }
            // Compressed textures can only be 2D
            if desc.format.is_compressed() {
                return Err(CreateTextureError::InvalidCompressedDimension(
                    desc.dimension,
                    desc.format,
                ));
            }
        }

        if desc.format.is_compressed() {
            let (block_width, block_height) = desc.format.block_dimensions();

            if desc.size.width % block_width != 0 {
                return Err(CreateTextureError::InvalidDimension(
                    Tde::NotMultipleOfBlockWidth {
                        width: desc.size.width,
                        block_width,
                        format: desc.format,
                    },
                ));
            }

            if desc.size.height % block_height != 0 {
                return Err(CreateTextureError::InvalidDimension(
                    Tde::NotMultipleOfBlockHeight {
                        height: desc.size.height,
                        block_height,
                        format: desc.format,
                    },
                ));
            }
        }

        if desc.sample_count > 1 {
            if desc.mip_level_count != 1 {
                return Err(CreateTextureError::InvalidMipLevelCount {
                    requested: desc.mip_level_count,
                    maximum: 1,
                });
            }

            if desc.size.depth_or_array_layers != 1 {
                return Err(CreateTextureError::InvalidDimension(
                    Tde::MultisampledDepthOrArrayLayer(desc.size.depth_or_array_layers),
                ));
            }

            if desc.usage.contains(wgt::TextureUsages::STORAGE_BINDING) {
                return Err(CreateTextureError::InvalidMultisampledStorageBinding);
            }

            if !desc.usage.contains(wgt::TextureUsages::RENDER_ATTACHMENT) {
                return Err(CreateTextureError::MultisampledNotRenderAttachment);
            }

            if !desc.format.is_multisample_capable() {
                return Err(CreateTextureError::InvalidMultisampledFormat(desc.format));
            }
        }

        let mips = desc.mip_level_count;
        let max_levels_allowed = desc.size.max_mips(desc.dimension).min(wgt::MAX_MIP_LEVELS);
        if mips == 0 || mips > max_levels_allowed {
            return Err(CreateTextureError::InvalidMipLevelCount {
                requested: mips,
                maximum: max_levels_allowed,
            });
        }

        let mut invalid_usages = wgt::TextureUsages::empty();
        if desc.usage.contains(wgt::TextureUsages::STORAGE_BINDING)
            && !desc.format.is_storage_capable()
        {
            invalid_usages |= wgt::TextureUsages::STORAGE_BINDING;
        }
        if desc.usage.contains(wgt::TextureUsages::RENDER_ATTACHMENT)
            && !(desc.format.is_color_renderable() || desc.format.is_depth_stencil_format())
        {
            invalid_usages |= wgt::TextureUsages::RENDER_ATTACHMENT;
        }
        if !invalid_usages.is_empty() {
            return Err(CreateTextureError::InvalidFormatUsages(
                invalid_usages,
                desc.format,
            ));
        }

        Ok(Arc::new(Texture::new(self, desc)))
    }

    pub(crate) fn create_texture_view(
        self: &Arc<Self>,
        texture: &Arc<Texture>,
        desc: &resource::TextureViewDescriptor,
    ) -> Result<Arc<TextureView>, CreateTextureViewError> {
        self.check_is_valid()?;
        texture.same_device(self)?;
        texture.check_destroyed()?;

        let resolved_format = desc.format.unwrap_or_else(|| {
            aspect_specific_format(texture.desc.format, desc.range.aspect)
                .unwrap_or(texture.desc.format)
        });
        let resolved_dimension = desc.dimension.unwrap_or(
            match (texture.desc.dimension, texture.desc.array_layer_count()) {
                (wgt::TextureDimension::D1, _) => wgt::TextureViewDimension::D1,
                (wgt::TextureDimension::D2, 1) => wgt::TextureViewDimension::D2,
                (wgt::TextureDimension::D2, _) => wgt::TextureViewDimension::D2Array,
                (wgt::TextureDimension::D3, _) => wgt::TextureViewDimension::D3,
            },
        );
        // Unset counts run to the end of the texture, except that single-layer
        // dimensions take one layer.
        let resolved_mip_level_count = desc.range.mip_level_count.unwrap_or_else(|| {
            texture
                .desc
                .mip_level_count
                .saturating_sub(desc.range.base_mip_level)
        });
        let resolved_array_layer_count =
            desc.range.array_layer_count.unwrap_or(match resolved_dimension {
                wgt::TextureViewDimension::D1
                | wgt::TextureViewDimension::D2
                | wgt::TextureViewDimension::D3 => 1,
                _ => texture
                    .desc
                    .array_layer_count()
                    .saturating_sub(desc.range.base_array_layer),
            });

        let aspects = FormatAspects::new(texture.desc.format, desc.range.aspect);
        if aspects.is_empty() {
            return Err(CreateTextureViewError::InvalidAspect {
                texture_format: texture.desc.format,
                requested_aspect: desc.range.aspect,
            });
        }

        let format_is_good = if desc.range.aspect == wgt::TextureAspect::All {
            texture.desc.format == resolved_format
        } else {
            Some(resolved_format)
                == aspect_specific_format(texture.desc.format, desc.range.aspect)
                || (texture.desc.format == resolved_format && aspects.is_one())
        };
        if !format_is_good {
            return Err(CreateTextureViewError::FormatReinterpretation {
                texture: texture.desc.format,
                view: resolved_format,
            });
        }

        // check if multisampled texture is seen as anything but 2D
        if texture.desc.sample_count > 1 && resolved_dimension != wgt::TextureViewDimension::D2 {
            return Err(
                CreateTextureViewError::InvalidMultisampledTextureViewDimension(
                    resolved_dimension,
                ),
            );
        }

        // check if the dimension is compatible with the texture
        if texture.desc.dimension != resolved_dimension.compatible_texture_dimension() {
            return Err(CreateTextureViewError::InvalidTextureViewDimension {
                view: resolved_dimension,
                texture: texture.desc.dimension,
            });
        }

        match resolved_dimension {
            wgt::TextureViewDimension::D1
            | wgt::TextureViewDimension::D2
            | wgt::TextureViewDimension::D3 => {
                if resolved_array_layer_count != 1 {
                    return Err(CreateTextureViewError::InvalidArrayLayerCount {
                        requested: resolved_array_layer_count,
                        dim: resolved_dimension,
                    });
                }
            }
            wgt::TextureViewDimension::Cube if resolved_array_layer_count != 6 => {
                return Err(CreateTextureViewError::InvalidCubemapTextureDepth {
                    depth: resolved_array_layer_count,
                });
            }
            wgt::TextureViewDimension::CubeArray if resolved_array_layer_count % 6 != 0 => {
                return Err(CreateTextureViewError::InvalidCubemapArrayTextureDepth {
                    depth: resolved_array_layer_count,
                });
            }
            wgt::TextureViewDimension::Cube | wgt::TextureViewDimension::CubeArray
                if texture.desc.size.width != texture.desc.size.height =>
            {
                return Err(CreateTextureViewError::InvalidCubeTextureViewSize);
            }
            _ => {}
        }

        if resolved_mip_level_count == 0 {
            return Err(CreateTextureViewError::ZeroMipLevelCount);
        }

        let mip_level_end = desc.range.base_mip_level as u64 + resolved_mip_level_count as u64;

        let level_end = texture.desc.mip_level_count;
        if mip_level_end > level_end as u64 {
            return Err(CreateTextureViewError::TooManyMipLevels {
                requested: mip_level_end,
                total: level_end,
            });
        }

        if resolved_array_layer_count == 0 {
            return Err(CreateTextureViewError::ZeroArrayLayerCount);
        }

        let array_layer_end =
            desc.range.base_array_layer as u64 + resolved_array_layer_count as u64;

        let layer_end = texture.desc.array_layer_count();
        if array_layer_end > layer_end as u64 {
            return Err(CreateTextureViewError::TooManyArrayLayers {
                requested: array_layer_end,
                total: layer_end,
            });
        };

        // Both ends fit in a u32 now.
        let mips = desc.range.base_mip_level..mip_level_end as u32;
        let layers = desc.range.base_array_layer..array_layer_end as u32;

        let render_extent = 'error: {
            if !texture
                .desc
                .usage
                .contains(wgt::TextureUsages::RENDER_ATTACHMENT)
            {
                break 'error Err(TextureViewNotRenderableReason::Usage(texture.desc.usage));
            }

            if resolved_dimension != wgt::TextureViewDimension::D2 {
                break 'error Err(TextureViewNotRenderableReason::Dimension(
                    resolved_dimension,
                ));
            }

            if resolved_mip_level_count != 1 {
                break 'error Err(TextureViewNotRenderableReason::MipLevelCount(
                    resolved_mip_level_count,
                ));
            }

            if resolved_array_layer_count != 1 {
                break 'error Err(TextureViewNotRenderableReason::ArrayLayerCount(
                    resolved_array_layer_count,
                ));
            }

            if aspects != texture.format_aspects {
                break 'error Err(TextureViewNotRenderableReason::Aspects(aspects));
            }

            if !(resolved_format.is_color_renderable() || resolved_format.is_depth_stencil_format())
            {
                break 'error Err(TextureViewNotRenderableReason::Format(resolved_format));
            }

            let mut extent = texture
                .desc
                .size
                .mip_level_size(desc.range.base_mip_level, texture.desc.dimension);
            extent.depth_or_array_layers = 1;
            Ok(extent)
        };

        let view = TextureView {
            parent: texture.clone(),
            device: self.clone(),
            desc: resource::ResolvedTextureViewDescriptor {
                format: resolved_format,
                dimension: resolved_dimension,
                range: wgt::ImageSubresourceRange {
                    aspect: desc.range.aspect,
                    base_mip_level: desc.range.base_mip_level,
                    mip_level_count: Some(resolved_mip_level_count),
                    base_array_layer: desc.range.base_array_layer,
                    array_layer_count: Some(resolved_array_layer_count),
                },
            },
            format_aspects: aspects,
            render_extent,
            samples: texture.desc.sample_count,
            selector: TextureSelector { mips, layers },
            label: desc.label.to_string(),
        };

        Ok(Arc::new(view))
    }

    pub(crate) fn create_sampler(
        self: &Arc<Self>,
        desc: &resource::SamplerDescriptor,
    ) -> Result<Arc<Sampler>, CreateSamplerError> {
        self.check_is_valid()?;

        if desc.lod_min_clamp < 0.0 {
            return Err(CreateSamplerError::InvalidLodMinClamp(desc.lod_min_clamp));
        }
        if desc.lod_max_clamp < desc.lod_min_clamp {
            return Err(CreateSamplerError::InvalidLodMaxClamp {
                lod_min_clamp: desc.lod_min_clamp,
                lod_max_clamp: desc.lod_max_clamp,
            });
        }

        if !(1..=16).contains(&desc.anisotropy_clamp) {
            return Err(CreateSamplerError::InvalidAnisotropy(desc.anisotropy_clamp));
        }

        if desc.anisotropy_clamp != 1 {
            let filters = [
                ("min_filter", desc.min_filter),
                ("mag_filter", desc.mag_filter),
                ("mipmap_filter", desc.mipmap_filter),
            ];
            if let Some(&(filter, mode)) = filters
                .iter()
                .find(|&&(_, mode)| mode != wgt::FilterMode::Linear)
            {
                return Err(CreateSamplerError::InvalidFilterModeWithAnisotropy {
                    filter,
                    mode,
                    anisotropy_clamp: desc.anisotropy_clamp,
                });
            }
        }

        let sampler = Sampler {
            device: self.clone(),
            label: desc.label.to_string(),
            comparison: desc.compare.is_some(),
            filtering: desc.min_filter == wgt::FilterMode::Linear
                || desc.mag_filter == wgt::FilterMode::Linear
                || desc.mipmap_filter == wgt::FilterMode::Linear,
        };

        Ok(Arc::new(sampler))
    }

    pub(crate) fn create_shader_module(
        self: &Arc<Self>,
        desc: &pipeline::ShaderModuleDescriptor,
    ) -> Result<Arc<pipeline::ShaderModule>, pipeline::CreateShaderModuleError> {
        self.check_is_valid()?;

        let mut names = FastHashSet::default();
        for ep in desc.interface.entry_points.iter() {
            if !names.insert(ep.name.as_str()) {
                return Err(pipeline::CreateShaderModuleError::DuplicateEntryPoint(
                    ep.name.clone(),
                ));
            }
            for binding in ep.bindings.iter() {
                if binding.group >= self.limits.max_bind_groups {
                    return Err(pipeline::CreateShaderModuleError::InvalidGroupIndex {
                        bind: binding.binding,
                        group: binding.group,
                        limit: self.limits.max_bind_groups,
                    });
                }
            }
        }

        let module = pipeline::ShaderModule {
            device: self.clone(),
            interface: desc.interface.clone(),
            label: desc.label.to_string(),
        };

        Ok(Arc::new(module))
    }

    /// Creates a bind group layout from user-facing entries.
    ///
    /// `static_samplers` holds the sampler of every entry that declares one,
    /// keyed by binding.
    pub(crate) fn create_bind_group_layout(
        self: &Arc<Self>,
        label: &Label,
        entries: &[BindGroupLayoutEntry],
        static_samplers: FastHashMap<u32, Arc<Sampler>>,
    ) -> Result<Arc<BindGroupLayout>, CreateBindGroupLayoutError> {
        self.check_is_valid()?;

        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries.iter() {
            if entry.visibility.contains_invalid_bits() {
                return Err(CreateBindGroupLayoutError::InvalidVisibility(
                    entry.visibility,
                ));
            }
            let sampler = static_samplers.get(&entry.binding);
            if let Some(sampler) = sampler {
                sampler.same_device(self)?;
            }
            let entry = binding_model::resolve_layout_entry(
                entry,
                sampler.map(|s| &**s),
                self.features,
            )
            .map_err(|error| CreateBindGroupLayoutError::Entry {
                binding: entry.binding,
                error,
            })?;
            resolved.push(entry);
        }

        let entry_map = bgl::EntryMap::from_entries(&self.limits, resolved)?;

        self.create_bind_group_layout_internal(
            label,
            entry_map,
            static_samplers,
            bgl::Origin::Pool,
        )
    }

    pub(crate) fn create_bind_group_layout_internal(
        self: &Arc<Self>,
        label: &Label,
        entry_map: bgl::EntryMap,
        static_samplers: FastHashMap<u32, Arc<Sampler>>,
        origin: bgl::Origin,
    ) -> Result<Arc<BindGroupLayout>, CreateBindGroupLayoutError> {
        let mut count_validator = BindingTypeMaxCountValidator::default();
        for entry in entry_map.values() {
            count_validator.add_binding(entry);
        }
        // If a single bind group layout violates limits, the pipeline layout is
        // definitely going to violate limits too, lets catch it now.
        count_validator
            .validate(&self.limits)
            .map_err(CreateBindGroupLayoutError::TooManyBindings)?;

        let bgl = BindGroupLayout {
            device: self.clone(),
            entries: entry_map,
            static_samplers,
            origin,
            binding_count_validator: count_validator,
            label: label.to_string(),
        };

        Ok(Arc::new(bgl))
    }

    fn create_buffer_binding(
        &self,
        bb: &ResolvedBufferBinding,
        binding: u32,
        decl: &binding_model::ResolvedBindGroupLayoutEntry,
        dynamic_binding_info: &mut Vec<binding_model::BindGroupDynamicBindingData>,
        late_buffer_binding_sizes: &mut FastHashMap<u32, wgt::BufferSize>,
        used: &mut BindGroupStates,
    ) -> Result<(), CreateBindGroupError> {
        use crate::binding_model::CreateBindGroupError as Error;

        let (binding_ty, dynamic, min_size) = match decl.ty {
            wgt::BindingType::Buffer {
                ty,
                has_dynamic_offset,
                min_binding_size,
            } => (ty, has_dynamic_offset, min_binding_size),
            _ => {
                return Err(Error::WrongBindingType {
                    binding,
                    actual: decl.ty,
                    expected: "UniformBuffer, StorageBuffer or ReadonlyStorageBuffer",
                })
            }
        };

        let buffer = &bb.buffer;
        buffer.same_device(self)?;
        buffer.check_destroyed()?;

        let pub_usage = match binding_ty {
            wgt::BufferBindingType::Uniform => wgt::BufferUsages::UNIFORM,
            wgt::BufferBindingType::Storage { .. } => wgt::BufferUsages::STORAGE,
        };
        buffer.check_usage(pub_usage)?;

        let (align, align_limit_name) =
            binding_model::buffer_offset_alignment(&self.limits, binding_ty, dynamic);
        if bb.offset % align as u64 != 0 {
            return Err(Error::UnalignedBufferOffset(
                bb.offset,
                align_limit_name,
                align,
            ));
        }

        let range_error = || Error::BindingRangeTooLarge {
            buffer: buffer.error_ident(),
            offset: bb.offset,
            size: bb.size,
            buffer_size: buffer.size,
        };
        let (bind_size, bind_end) = match bb.size {
            Some(size) => match bb.offset.checked_add(size.get()) {
                Some(end) if end <= buffer.size => (size.get(), end),
                _ => return Err(range_error()),
            },
            None => match buffer.size.checked_sub(bb.offset) {
                Some(size) => (size, buffer.size),
                None => return Err(range_error()),
            },
        };

        let Some(late_size) = wgt::BufferSize::new(bind_size) else {
            return Err(Error::BindingZeroSize(buffer.error_ident()));
        };

        if matches!(binding_ty, wgt::BufferBindingType::Storage { .. })
            && bind_size % wgt::COPY_BUFFER_ALIGNMENT != 0
        {
            return Err(Error::UnalignedStorageBindingSize {
                binding,
                size: bind_size,
            });
        }

        let range_limit = binding_model::buffer_binding_type_max_size(&self.limits, binding_ty);
        if bind_size > range_limit {
            return Err(Error::BufferRangeTooLarge {
                binding,
                given: bind_size,
                limit: range_limit,
            });
        }

        // Record binding info for validating dynamic offsets
        if dynamic {
            dynamic_binding_info.push(binding_model::BindGroupDynamicBindingData {
                binding_idx: binding,
                buffer_size: buffer.size,
                binding_range: bb.offset..bind_end,
                maximum_dynamic_offset: buffer.size - bind_end,
                binding_type: binding_ty,
            });
        }

        if let Some(non_zero) = min_size {
            let min_size = non_zero.get();
            if min_size > bind_size {
                return Err(Error::BindingSizeTooSmall {
                    buffer: buffer.error_ident(),
                    actual: bind_size,
                    min: min_size,
                });
            }
        } else {
            late_buffer_binding_sizes.insert(binding, late_size);
        }

        used.buffers
            .insert_single(buffer.clone(), conv::map_binding_buffer_uses(binding_ty));

        Ok(())
    }

    fn create_sampler_binding(
        &self,
        sampler: &Arc<Sampler>,
        binding: u32,
        decl: &binding_model::ResolvedBindGroupLayoutEntry,
    ) -> Result<(), CreateBindGroupError> {
        use crate::binding_model::CreateBindGroupError as Error;

        let wgt::BindingType::Sampler(ty) = decl.ty else {
            return Err(Error::WrongBindingType {
                binding,
                actual: decl.ty,
                expected: "Sampler",
            });
        };

        sampler.same_device(self)?;

        // Allowed sampler values for filtering and comparison
        let (allowed_filtering, allowed_comparison) = match ty {
            wgt::SamplerBindingType::Filtering => (None, false),
            wgt::SamplerBindingType::NonFiltering => (Some(false), false),
            wgt::SamplerBindingType::Comparison => (None, true),
        };

        if let Some(allowed_filtering) = allowed_filtering {
            if allowed_filtering != sampler.filtering {
                return Err(Error::WrongSamplerFiltering {
                    binding,
                    layout_flt: allowed_filtering,
                    sampler_flt: sampler.filtering,
                });
            }
        }

        if allowed_comparison != sampler.comparison {
            return Err(Error::WrongSamplerComparison {
                binding,
                layout_cmp: allowed_comparison,
                sampler_cmp: sampler.comparison,
            });
        }

        Ok(())
    }

    fn create_texture_binding(
        &self,
        view: &Arc<TextureView>,
        binding: u32,
        decl: &binding_model::ResolvedBindGroupLayoutEntry,
        used: &mut BindGroupStates,
    ) -> Result<(), CreateBindGroupError> {
        view.same_device(self)?;
        view.check_destroyed()?;

        let (pub_usage, internal_use) = Self::texture_use_parameters(binding, decl, view)?;
        view.check_usage(pub_usage)?;

        used.views.insert_single(view.clone(), internal_use);

        Ok(())
    }

    fn create_external_texture_binding(
        &self,
        view: &Arc<TextureView>,
        binding: u32,
        decl: &binding_model::ResolvedBindGroupLayoutEntry,
        used: &mut BindGroupStates,
    ) -> Result<(), CreateBindGroupError> {
        use crate::binding_model::CreateBindGroupError as Error;

        if decl.ty != wgt::BindingType::ExternalTexture {
            return Err(Error::WrongBindingType {
                binding,
                actual: decl.ty,
                expected: "ExternalTexture",
            });
        }

        view.same_device(self)?;
        view.check_destroyed()?;

        let is_float = matches!(
            view.desc.format.sample_type(Some(view.desc.range.aspect)),
            Some(wgt::TextureSampleType::Float { .. })
        );
        if view.desc.dimension != wgt::TextureViewDimension::D2 || view.samples != 1 || !is_float {
            return Err(Error::InvalidExternalTexture { binding });
        }

        view.check_usage(wgt::TextureUsages::TEXTURE_BINDING)?;
        used.views.insert_single(view.clone(), TextureUses::RESOURCE);

        Ok(())
    }

    /// Creates a bind group.
    ///
    /// The entries must each name exactly one resource; everything else about
    /// them is checked here against the layout.
    pub(crate) fn create_bind_group(
        self: &Arc<Self>,
        desc: ResolvedBindGroupDescriptor,
    ) -> Result<Arc<BindGroup>, CreateBindGroupError> {
        use crate::binding_model::CreateBindGroupError as Error;

        self.check_is_valid()?;
        let layout = desc.layout;
        layout.same_device(self)?;

        // Record binding info for dynamic offset validation
        let mut dynamic_binding_info = Vec::new();
        // Map of binding -> shader reflected size
        let mut late_buffer_binding_sizes = FastHashMap::default();
        let mut used = BindGroupStates::new();
        let mut bound = FastHashSet::default();

        for entry in desc.entries.iter() {
            let binding = entry.binding;
            // Find the corresponding declaration in the layout
            let (decl, _) = layout
                .entries
                .find_slot(binding)
                .ok_or(Error::MissingBindingDeclaration(binding))?;
            if decl.static_sampler {
                return Err(Error::StaticSamplerBinding(binding));
            }
            if !bound.insert(binding) {
                return Err(Error::DuplicateBinding(binding));
            }

            match entry.resource {
                ResolvedBindingResource::Buffer(ref bb) => self.create_buffer_binding(
                    bb,
                    binding,
                    decl,
                    &mut dynamic_binding_info,
                    &mut late_buffer_binding_sizes,
                    &mut used,
                )?,
                ResolvedBindingResource::Sampler(ref sampler) => {
                    self.create_sampler_binding(sampler, binding, decl)?
                }
                ResolvedBindingResource::TextureView(ref view) => {
                    self.create_texture_binding(view, binding, decl, &mut used)?
                }
                ResolvedBindingResource::ExternalTexture(ref view) => {
                    self.create_external_texture_binding(view, binding, decl, &mut used)?
                }
            }
        }

        // Every declared slot must be bound, except trailing elements of a
        // partially bound array.
        for decl in layout.entries.values() {
            if decl.static_sampler {
                continue;
            }
            let partial = self
                .features
                .contains(wgt::Features::PARTIALLY_BOUND_BINDING_ARRAY);
            for element in 0..decl.array_len() {
                let binding = decl.binding + element;
                if bound.contains(&binding) || (element > 0 && partial) {
                    continue;
                }
                return Err(Error::MissingBinding(binding));
            }
        }

        dynamic_binding_info.sort_by_key(|info| info.binding_idx);

        let bind_group = BindGroup {
            device: self.clone(),
            layout,
            label: desc.label.to_string(),
            used,
            dynamic_binding_info,
            late_buffer_binding_sizes,
        };

        Ok(Arc::new(bind_group))
    }

    fn texture_use_parameters(
        binding: u32,
        decl: &binding_model::ResolvedBindGroupLayoutEntry,
        view: &TextureView,
    ) -> Result<(wgt::TextureUsages, TextureUses), CreateBindGroupError> {
        use crate::binding_model::CreateBindGroupError as Error;
        if view.format_aspects.contains(FormatAspects::DEPTH_STENCIL) {
            return Err(Error::DepthStencilAspect);
        }
        match decl.ty {
            wgt::BindingType::Texture {
                sample_type,
                view_dimension,
                multisampled,
            } => {
                use wgt::TextureSampleType as Tst;
                if multisampled != (view.samples != 1) {
                    return Err(Error::InvalidTextureMultisample {
                        binding,
                        layout_multisampled: multisampled,
                        view_samples: view.samples,
                    });
                }
                let sample_type_error = || Error::InvalidTextureSampleType {
                    binding,
                    layout_sample_type: sample_type,
                    view_format: view.desc.format,
                };
                let compat_sample_type = view
                    .desc
                    .format
                    .sample_type(Some(view.desc.range.aspect))
                    .ok_or_else(sample_type_error)?;
                match (sample_type, compat_sample_type) {
                    (Tst::Uint, Tst::Uint) |
                    (Tst::Sint, Tst::Sint) |
                    (Tst::Depth, Tst::Depth) |
                    // if we expect non-filterable, accept anything float
                    (Tst::Float { filterable: false }, Tst::Float { .. }) |
                    // if we expect filterable, require it
                    (Tst::Float { filterable: true }, Tst::Float { filterable: true }) |
                    // if we expect non-filterable, also accept depth
                    (Tst::Float { filterable: false }, Tst::Depth) => {}
                    _ => return Err(sample_type_error()),
                }
                if view_dimension != view.desc.dimension {
                    return Err(Error::InvalidTextureDimension {
                        binding,
                        layout_dimension: view_dimension,
                        view_dimension: view.desc.dimension,
                    });
                }
                Ok((wgt::TextureUsages::TEXTURE_BINDING, TextureUses::RESOURCE))
            }
            wgt::BindingType::StorageTexture {
                access,
                format,
                view_dimension,
            } => {
                if format != view.desc.format {
                    return Err(Error::InvalidStorageTextureFormat {
                        binding,
                        layout_format: format,
                        view_format: view.desc.format,
                    });
                }
                if view_dimension != view.desc.dimension {
                    return Err(Error::InvalidTextureDimension {
                        binding,
                        layout_dimension: view_dimension,
                        view_dimension: view.desc.dimension,
                    });
                }

                let mip_level_count = view.selector.mips.end - view.selector.mips.start;
                if mip_level_count != 1 {
                    return Err(Error::InvalidStorageTextureMipLevelCount {
                        binding,
                        mip_level_count,
                    });
                }

                Ok((
                    wgt::TextureUsages::STORAGE_BINDING,
                    conv::map_storage_texture_uses(access),
                ))
            }
            _ => Err(Error::WrongBindingType {
                binding,
                actual: decl.ty,
                expected: "SampledTexture, ReadonlyStorageTexture or WriteonlyStorageTexture",
            }),
        }
    }

    pub(crate) fn create_pipeline_layout(
        self: &Arc<Self>,
        label: &Label,
        bind_group_layouts: Vec<Option<Arc<BindGroupLayout>>>,
    ) -> Result<Arc<PipelineLayout>, CreatePipelineLayoutError> {
        use crate::binding_model::CreatePipelineLayoutError as Error;

        self.check_is_valid()?;

        let bind_group_layouts_count = bind_group_layouts.len();
        let device_max_bind_groups = self.limits.max_bind_groups as usize;
        if bind_group_layouts_count > device_max_bind_groups {
            return Err(Error::TooManyGroups {
                actual: bind_group_layouts_count,
                max: device_max_bind_groups,
            });
        }

        let mut count_validator = BindingTypeMaxCountValidator::default();
        for bgl in bind_group_layouts.iter().flatten() {
            bgl.same_device(self)?;
            count_validator.merge(&bgl.binding_count_validator);
        }
        count_validator
            .validate(&self.limits)
            .map_err(Error::TooManyBindings)?;

        let layout = PipelineLayout {
            device: self.clone(),
            label: label.to_string(),
            bind_group_layouts: bind_group_layouts.into_iter().collect(),
        };

        Ok(Arc::new(layout))
    }

    /// Builds the layout of a pipeline created without one from the bindings
    /// its shaders use.
    pub(crate) fn derive_pipeline_layout(
        self: &Arc<Self>,
        mut derived_group_layouts: Box<ArrayVec<bgl::EntryMap, { wgt::MAX_BIND_GROUPS }>>,
    ) -> Result<Arc<PipelineLayout>, ImplicitLayoutError> {
        while derived_group_layouts
            .last()
            .map_or(false, |map| map.is_empty())
        {
            derived_group_layouts.pop();
        }

        let mut bind_group_layouts = Vec::with_capacity(derived_group_layouts.len());
        for mut entry_map in derived_group_layouts.into_iter() {
            entry_map.sort();
            let bgl = self.create_bind_group_layout_internal(
                &None,
                entry_map,
                FastHashMap::default(),
                bgl::Origin::Derived,
            )?;
            bind_group_layouts.push(Some(bgl));
        }

        Ok(self.create_pipeline_layout(&None, bind_group_layouts)?)
    }

    /// Collects, per group, the bindings whose size is only known to the shader.
    fn make_late_sized_buffer_groups(
        shader_binding_sizes: &FastHashMap<(u32, u32), wgt::BufferSize>,
        layout: &PipelineLayout,
    ) -> ArrayVec<pipeline::LateSizedBufferGroup, { wgt::MAX_BIND_GROUPS }> {
        // Given the shader-required binding sizes and the pipeline layout,
        // return the filtered list of them in the layout order,
        // removing those with given `min_binding_size`.
        layout
            .bind_group_layouts
            .iter()
            .enumerate()
            .map(|(group_index, bgl)| pipeline::LateSizedBufferGroup {
                shader_sizes: bgl
                    .iter()
                    .flat_map(|bgl| bgl.entries.values())
                    .filter_map(|entry| match entry.ty {
                        wgt::BindingType::Buffer {
                            min_binding_size: None,
                            ..
                        } => {
                            let key = (group_index as u32, entry.binding);
                            shader_binding_sizes
                                .get(&key)
                                .map(|size| (entry.binding, size.get()))
                        }
                        _ => None,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Picks the provided pipeline layout, or derives one from the bindings
    /// the stages used.
    fn resolve_pipeline_layout(
        self: &Arc<Self>,
        source: BindingLayoutSource<'_>,
        provided: Option<&Arc<PipelineLayout>>,
    ) -> Result<Arc<PipelineLayout>, ImplicitLayoutError> {
        let derived = match source {
            BindingLayoutSource::Derived(entries) => Some(entries),
            BindingLayoutSource::Provided(_) => None,
        };
        match (derived, provided) {
            (Some(entries), _) => self.derive_pipeline_layout(entries),
            (None, Some(layout)) => Ok(layout.clone()),
            (None, None) => unreachable!("a provided binding layout always has a pipeline layout"),
        }
    }

    pub(crate) fn create_compute_pipeline(
        self: &Arc<Self>,
        desc: pipeline::ResolvedComputePipelineDescriptor,
    ) -> Result<Arc<pipeline::ComputePipeline>, pipeline::CreateComputePipelineError> {
        self.check_is_valid()?;

        let shader_module = desc.stage.module;
        shader_module.same_device(self)?;

        // Get the pipeline layout from the desc if it is provided.
        let pipeline_layout = match desc.layout {
            Some(pipeline_layout) => {
                pipeline_layout.same_device(self)?;
                Some(pipeline_layout)
            }
            None => None,
        };

        let mut binding_layout_source = match pipeline_layout {
            Some(ref pipeline_layout) => {
                BindingLayoutSource::Provided(pipeline_layout.get_bind_group_layouts())
            }
            None => BindingLayoutSource::new_derived(&self.limits),
        };
        let mut shader_binding_sizes = FastHashMap::default();

        let entry_point = shader_module.interface.entry_point(
            desc.stage.entry_point.as_deref(),
            wgt::ShaderStages::COMPUTE,
        )?;
        validation::check_stage(
            entry_point,
            &mut binding_layout_source,
            &mut shader_binding_sizes,
        )?;

        let pipeline_layout = self.resolve_pipeline_layout(binding_layout_source, pipeline_layout.as_ref())?;

        let late_sized_buffer_groups =
            Self::make_late_sized_buffer_groups(&shader_binding_sizes, &pipeline_layout);

        let pipeline = pipeline::ComputePipeline {
            layout: pipeline_layout,
            device: self.clone(),
            _shader_module: shader_module,
            late_sized_buffer_groups,
            label: desc.label.to_string(),
        };

        Ok(Arc::new(pipeline))
    }

    pub(crate) fn create_render_pipeline(
        self: &Arc<Self>,
        desc: pipeline::ResolvedRenderPipelineDescriptor,
    ) -> Result<Arc<pipeline::RenderPipeline>, pipeline::CreateRenderPipelineError> {
        use crate::pipeline::{
            ColorStateError, CreateRenderPipelineError as Error, DepthStencilStateError,
        };

        self.check_is_valid()?;

        let color_targets = desc
            .fragment
            .as_ref()
            .map_or(&[][..], |fragment| &fragment.targets[..]);
        let depth_stencil_state = desc.depth_stencil.as_ref();

        if color_targets.iter().all(Option::is_none) && depth_stencil_state.is_none() {
            return Err(Error::NoTargetSpecified);
        }

        let mut io = FastHashMap::default();
        let mut total_attributes = 0;
        let mut vertex_steps = Vec::with_capacity(desc.vertex.buffers.len());
        for (i, vb_state) in desc.vertex.buffers.iter().enumerate() {
            let mut last_stride = 0;
            for attribute in vb_state.attributes.iter() {
                last_stride = last_stride.max(attribute.offset + attribute.format.size());
            }
            vertex_steps.push(pipeline::VertexStep {
                stride: vb_state.array_stride,
                last_stride,
                mode: vb_state.step_mode,
            });
            if vb_state.attributes.is_empty() {
                continue;
            }
            if vb_state.array_stride > self.limits.max_vertex_buffer_array_stride as u64 {
                return Err(Error::VertexStrideTooLarge {
                    index: i as u32,
                    given: vb_state.array_stride as u32,
                    limit: self.limits.max_vertex_buffer_array_stride,
                });
            }
            if vb_state.array_stride % wgt::VERTEX_STRIDE_ALIGNMENT != 0 {
                return Err(Error::UnalignedVertexStride {
                    index: i as u32,
                    stride: vb_state.array_stride,
                });
            }

            let max_stride = if vb_state.array_stride == 0 {
                self.limits.max_vertex_buffer_array_stride as u64
            } else {
                vb_state.array_stride
            };
            for attribute in vb_state.attributes.iter() {
                let attribute_end = attribute.offset + attribute.format.size();
                if attribute_end > max_stride
                    || attribute.offset % attribute.format.size().min(4) != 0
                {
                    return Err(Error::InvalidVertexAttributeOffset {
                        location: attribute.shader_location,
                        offset: attribute.offset,
                    });
                }
                if io
                    .insert(attribute.shader_location, attribute.format)
                    .is_some()
                {
                    return Err(Error::ShaderLocationClash(attribute.shader_location));
                }
            }
            total_attributes += vb_state.attributes.len();
        }

        if vertex_steps.len() > self.limits.max_vertex_buffers as usize {
            return Err(Error::TooManyVertexBuffers {
                given: vertex_steps.len() as u32,
                limit: self.limits.max_vertex_buffers,
            });
        }

        if total_attributes > self.limits.max_vertex_attributes as usize {
            return Err(Error::TooManyVertexAttributes {
                given: total_attributes as u32,
                limit: self.limits.max_vertex_attributes,
            });
        }

        if desc.primitive.strip_index_format.is_some() && !desc.primitive.topology.is_strip() {
            return Err(Error::StripIndexFormatForNonStripTopology {
                strip_index_format: desc.primitive.strip_index_format,
                topology: desc.primitive.topology,
            });
        }

        let samples = desc.multisample.count;
        if !conv::is_valid_sample_count(samples) {
            return Err(Error::InvalidSampleCount(samples));
        }

        let max_color_attachments = self.limits.max_color_attachments as usize;
        if color_targets.len() > max_color_attachments {
            return Err(Error::ColorAttachment(
                crate::command::ColorAttachmentError::TooMany {
                    given: color_targets.len(),
                    limit: max_color_attachments,
                },
            ));
        }

        for (i, cs) in color_targets.iter().enumerate() {
            let Some(cs) = cs.as_ref() else {
                continue;
            };
            let error = loop {
                if cs.format.is_depth_stencil_format() {
                    break Some(ColorStateError::FormatNotColor(cs.format));
                }
                if !cs.format.is_color_renderable() {
                    break Some(ColorStateError::FormatNotRenderable(cs.format));
                }
                if samples > 1 && !cs.format.is_multisample_capable() {
                    break Some(ColorStateError::InvalidSampleCount(samples, cs.format));
                }
                break None;
            };
            if let Some(e) = error {
                return Err(Error::ColorState(i as u8, e));
            }
        }

        if let Some(ds) = depth_stencil_state {
            let error = loop {
                let format = ds.format;
                if !format.is_depth_stencil_format() {
                    break Some(DepthStencilStateError::FormatNotRenderable(format));
                }
                if (ds.depth_write_enabled || ds.depth_compare != wgt::CompareFunction::Always)
                    && !format.has_depth_aspect()
                {
                    break Some(DepthStencilStateError::FormatNotDepth(format));
                }
                if ds.stencil_write_mask != 0 && !format.has_stencil_aspect() {
                    break Some(DepthStencilStateError::FormatNotStencil(format));
                }
                break None;
            };
            if let Some(e) = error {
                return Err(Error::DepthStencilState(e));
            }
        }

        let pipeline_layout = match desc.layout {
            Some(pipeline_layout) => {
                pipeline_layout.same_device(self)?;
                Some(pipeline_layout)
            }
            None => None,
        };

        let mut binding_layout_source = match pipeline_layout {
            Some(ref pipeline_layout) => {
                BindingLayoutSource::Provided(pipeline_layout.get_bind_group_layouts())
            }
            None => BindingLayoutSource::new_derived(&self.limits),
        };
        let mut shader_binding_sizes = FastHashMap::default();
        let mut shader_modules = ArrayVec::new();

        {
            let stage = wgt::ShaderStages::VERTEX;
            let vertex_module = &desc.vertex.stage.module;
            vertex_module.same_device(self)?;

            let entry_point = vertex_module
                .interface
                .entry_point(desc.vertex.stage.entry_point.as_deref(), stage)
                .map_err(|error| Error::Stage { stage, error })?;
            validation::check_stage(
                entry_point,
                &mut binding_layout_source,
                &mut shader_binding_sizes,
            )
            .map_err(|error| Error::Stage { stage, error })?;
            validation::check_vertex_inputs(entry_point, &io)
                .map_err(|error| Error::Stage { stage, error })?;

            shader_modules.push(vertex_module.clone());
        }

        if let Some(ref fragment) = desc.fragment {
            let stage = wgt::ShaderStages::FRAGMENT;
            let fragment_module = &fragment.stage.module;
            fragment_module.same_device(self)?;

            let entry_point = fragment_module
                .interface
                .entry_point(fragment.stage.entry_point.as_deref(), stage)
                .map_err(|error| Error::Stage { stage, error })?;
            validation::check_stage(
                entry_point,
                &mut binding_layout_source,
                &mut shader_binding_sizes,
            )
            .map_err(|error| Error::Stage { stage, error })?;

            for &location in entry_point.targets.iter() {
                if color_targets
                    .get(location as usize)
                    .and_then(Option::as_ref)
                    .is_none()
                {
                    return Err(Error::MissingColorTarget { location });
                }
            }

            shader_modules.push(fragment_module.clone());
        }

        let pipeline_layout = self.resolve_pipeline_layout(binding_layout_source, pipeline_layout.as_ref())?;

        let late_sized_buffer_groups =
            Self::make_late_sized_buffer_groups(&shader_binding_sizes, &pipeline_layout);

        let pass_context = RenderPassContext {
            attachments: AttachmentData {
                colors: color_targets
                    .iter()
                    .map(|state| state.as_ref().map(|s| s.format))
                    .collect(),
                depth_stencil: depth_stencil_state.map(|ds| ds.format),
            },
            sample_count: samples,
        };

        let mut flags = pipeline::PipelineFlags::empty();
        if let Some(ds) = depth_stencil_state {
            if !ds.is_depth_read_only() {
                flags |= pipeline::PipelineFlags::WRITES_DEPTH;
            }
            if !ds.is_stencil_read_only() {
                flags |= pipeline::PipelineFlags::WRITES_STENCIL;
            }
        }

        let pipeline = pipeline::RenderPipeline {
            device: self.clone(),
            layout: pipeline_layout,
            _shader_modules: shader_modules,
            pass_context,
            flags,
            strip_index_format: desc.primitive.strip_index_format,
            vertex_steps,
            late_sized_buffer_groups,
            label: desc.label.to_string(),
        };

        Ok(Arc::new(pipeline))
    }
}
