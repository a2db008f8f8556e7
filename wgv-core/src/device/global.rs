use std::{ops::Range, sync::Arc};

use wgt::{BufferAddress, DeviceLostReason};

use crate::{
    binding_model::{
        self, BindGroupEntry, CreateBindGroupError, CreateBindGroupLayoutError,
        GetBindGroupLayoutError, ResolvedBindGroupDescriptor, ResolvedBindGroupEntry,
        ResolvedBindingResource, ResolvedBufferBinding,
    },
    command::CommandBuffer,
    device::{
        check_limits, fire_map_callbacks, queue::Queue, Device, DeviceError, DeviceLostClosure,
        RequestDeviceError,
    },
    error::{Error, PopErrorScopeError, UncapturedErrorHandler},
    global::Global,
    id::{self, DeviceId, QueueId},
    pipeline::{
        self, CreateComputePipelineError, CreateRenderPipelineError,
        ResolvedComputePipelineDescriptor, ResolvedFragmentState,
        ResolvedProgrammableStageDescriptor, ResolvedRenderPipelineDescriptor,
        ResolvedVertexState,
    },
    resource::{
        self, BufferAccessError, BufferAccessResult, BufferMapOperation, CreateBufferError,
        CreateSamplerError, CreateTextureError, CreateTextureViewError, Fallible,
        MapAbortReason,
    },
    FastHashMap, Label, LabelHelpers,
};

impl Global {
    /// Creates a device and its queue.
    ///
    /// Fails if the descriptor asks for limits better than
    /// [`wgt::Limits::supported`] or for feature bits this crate doesn't know.
    pub fn create_device(
        &self,
        desc: &wgt::DeviceDescriptor<Label>,
    ) -> Result<(DeviceId, QueueId), RequestDeviceError> {
        if desc.required_features.contains_invalid_bits() {
            return Err(RequestDeviceError::UnsupportedFeature(
                desc.required_features.difference(wgt::Features::all()),
            ));
        }
        if let Some(failed) = check_limits(&desc.required_limits, &wgt::Limits::supported())
            .into_iter()
            .next()
        {
            return Err(failed.into());
        }

        let device = Arc::new(Device::new(desc));
        let queue = Arc::new(Queue::new(device.clone()));

        let device_id = self.hub.devices.prepare().assign(device);
        let queue_id = self.hub.queues.prepare().assign(queue);

        api_log!(
            "Global::create_device({:?}) -> {device_id:?}, {queue_id:?}",
            desc.label.as_deref().unwrap_or("")
        );
        Ok((device_id, queue_id))
    }

    pub fn device_features(&self, device_id: DeviceId) -> wgt::Features {
        self.hub.devices.get(device_id).features
    }

    pub fn device_limits(&self, device_id: DeviceId) -> wgt::Limits {
        self.hub.devices.get(device_id).limits.clone()
    }

    pub fn device_is_valid(&self, device_id: DeviceId) -> bool {
        self.hub.devices.get(device_id).is_valid()
    }

    pub fn device_push_error_scope(&self, device_id: DeviceId, filter: wgt::ErrorFilter) {
        api_log!("Device::push_error_scope {device_id:?} {filter:?}");

        let device = self.hub.devices.get(device_id);
        device.error_sink.lock().push_scope(filter);
    }

    /// Pops the innermost error scope, returning the first error it captured.
    pub fn device_pop_error_scope(
        &self,
        device_id: DeviceId,
    ) -> Result<Option<Error>, PopErrorScopeError> {
        api_log!("Device::pop_error_scope {device_id:?}");

        let device = self.hub.devices.get(device_id);
        let result = device.error_sink.lock().pop_scope();
        result
    }

    /// Installs the handler called with errors no scope captures. `None`
    /// restores logging them.
    pub fn device_on_uncaptured_error(
        &self,
        device_id: DeviceId,
        handler: Option<UncapturedErrorHandler>,
    ) {
        api_log!("Device::on_uncaptured_error {device_id:?}");

        let device = self.hub.devices.get(device_id);
        device.error_sink.lock().set_uncaptured_handler(handler);
    }

    // This closure will be called exactly once during "lose the device",
    // or right away if the device is already lost.
    pub fn device_set_device_lost_closure(
        &self,
        device_id: DeviceId,
        device_lost_closure: DeviceLostClosure,
    ) {
        let device = self.hub.devices.get(device_id);

        if !device.is_valid() {
            device_lost_closure.call(
                DeviceLostReason::Unknown,
                String::from("Device is already lost."),
            );
            return;
        }

        let replaced = device
            .device_lost_closure
            .lock()
            .replace(device_lost_closure);
        if replaced.is_some() {
            log::warn!("Replacing the device lost closure of {device_id:?}");
        }
    }

    /// Loses the device.
    ///
    /// Pending maps are aborted, and the device-lost closure is called with
    /// [`DeviceLostReason::Destroyed`]. Destroying a lost device does nothing.
    pub fn device_destroy(&self, device_id: DeviceId) {
        api_log!("Device::destroy {device_id:?}");

        let device = self.hub.devices.get(device_id);
        let (map_closures, lost_closure) = device.lose();
        drop(device);

        // No lock is held past this point.
        fire_map_callbacks(map_closures);
        if let Some(closure) = lost_closure {
            closure.call(
                DeviceLostReason::Destroyed,
                String::from("Device was destroyed."),
            );
        }
    }

    /// Resolves every pending map of the device and fires their callbacks.
    ///
    /// Returns `true` if no map is pending afterwards.
    pub fn device_poll(&self, device_id: DeviceId) -> bool {
        api_log!("Device::poll {device_id:?}");

        let device = self.hub.devices.get(device_id);
        let closures = device.poll();
        fire_map_callbacks(closures);

        let queue_empty = device.pending_maps.lock().is_empty();
        queue_empty
    }

    pub fn device_drop(&self, device_id: DeviceId) {
        api_log!("Device::drop {device_id:?}");

        let device = self.hub.devices.remove(device_id);
        let (map_closures, lost_closure) = device.lose();
        drop(device);

        fire_map_callbacks(map_closures);
        if let Some(closure) = lost_closure {
            closure.call(DeviceLostReason::Unknown, String::from("Device dropped."));
        }
    }

    pub fn device_create_buffer(
        &self,
        device_id: DeviceId,
        desc: &resource::BufferDescriptor,
    ) -> (id::BufferId, Option<CreateBufferError>) {
        let hub = &self.hub;
        let fid = hub.buffers.prepare();

        let device = self.hub.devices.get(device_id);
        let error = match device.create_buffer(desc) {
            Ok(buffer) => {
                let id = fid.assign(Fallible::Valid(buffer));
                api_log!(
                    "Device::create_buffer({:?}{}) -> {id:?}",
                    desc.label.as_deref().unwrap_or(""),
                    if desc.mapped_at_creation {
                        ", mapped_at_creation"
                    } else {
                        ""
                    }
                );
                return (id, None);
            }
            Err(e) => e,
        };

        device.handle_error("Device::create_buffer", desc.label.to_string(), error.clone());
        let id = fid.assign_invalid(&desc.label);
        (id, Some(error))
    }

    /// Destroys the buffer. Destroying it again does nothing.
    pub fn buffer_destroy(&self, buffer_id: id::BufferId) {
        api_log!("Buffer::destroy {buffer_id:?}");

        let Ok(buffer) = self.hub.buffers.get(buffer_id).get() else {
            return;
        };
        let closure = buffer.destroy();
        drop(buffer);
        fire_map_callbacks(closure);
    }

    pub fn buffer_drop(&self, buffer_id: id::BufferId) {
        api_log!("Buffer::drop {buffer_id:?}");

        let Ok(buffer) = self.hub.buffers.remove(buffer_id).get() else {
            return;
        };
        let closure = buffer.reset_map_state(MapAbortReason::Dropped);
        if closure.is_some() {
            log::warn!("{buffer_id:?} dropped with a pending map");
        }
        drop(buffer);
        fire_map_callbacks(closure);
    }

    /// Requests a mapping of `offset..offset + size` for the next poll.
    ///
    /// On failure the callback of `op` is called with the error before this
    /// returns, and the error is reported to the device.
    pub fn buffer_map_async(
        &self,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        size: Option<BufferAddress>,
        op: BufferMapOperation,
    ) -> BufferAccessResult {
        api_log!("Buffer::map_async {buffer_id:?} offset {offset:?} size {size:?} op: {op:?}");

        let hub = &self.hub;

        let (map_result, device) = match hub.buffers.get(buffer_id).get() {
            Ok(buffer) => (buffer.map_async(offset, size, op), Some(buffer.device.clone())),
            Err(e) => (Err((op, e.into())), None),
        };

        match map_result {
            Ok(()) => Ok(()),
            Err((mut operation, err)) => {
                if let Some(device) = device {
                    device.handle_error("Buffer::map_async", String::new(), err.clone());
                } else {
                    log::error!("Buffer::map_async error: {err}");
                }
                if let Some(callback) = operation.callback.take() {
                    callback(Err(err.clone()));
                }
                Err(err)
            }
        }
    }

    /// Returns the range of the buffer the caller may access.
    pub fn buffer_get_mapped_range(
        &self,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        size: Option<BufferAddress>,
    ) -> Result<Range<BufferAddress>, BufferAccessError> {
        api_log!("Buffer::get_mapped_range {buffer_id:?} offset {offset:?} size {size:?}");

        let buffer = self.hub.buffers.get(buffer_id).get()?;
        buffer.get_mapped_range(offset, size)
    }

    /// Unmaps the buffer, aborting a pending map. Unmapping an idle or
    /// destroyed buffer does nothing.
    pub fn buffer_unmap(&self, buffer_id: id::BufferId) -> BufferAccessResult {
        api_log!("Buffer::unmap {buffer_id:?}");

        let buffer = self.hub.buffers.get(buffer_id).get()?;
        let closure = buffer.unmap();
        drop(buffer);
        fire_map_callbacks(closure);
        Ok(())
    }

    pub fn device_create_texture(
        &self,
        device_id: DeviceId,
        desc: &resource::TextureDescriptor,
    ) -> (id::TextureId, Option<CreateTextureError>) {
        let hub = &self.hub;
        let fid = hub.textures.prepare();

        let device = self.hub.devices.get(device_id);
        let error = match device.create_texture(desc) {
            Ok(texture) => {
                let id = fid.assign(Fallible::Valid(texture));
                api_log!("Device::create_texture({desc:?}) -> {id:?}");
                return (id, None);
            }
            Err(e) => e,
        };

        device.handle_error("Device::create_texture", desc.label.to_string(), error.clone());
        let id = fid.assign_invalid(&desc.label);
        (id, Some(error))
    }

    /// Destroys the texture. Destroying it again does nothing.
    pub fn texture_destroy(&self, texture_id: id::TextureId) {
        api_log!("Texture::destroy {texture_id:?}");

        if let Ok(texture) = self.hub.textures.get(texture_id).get() {
            texture.destroy();
        }
    }

    pub fn texture_drop(&self, texture_id: id::TextureId) {
        api_log!("Texture::drop {texture_id:?}");

        self.hub.textures.remove(texture_id);
    }

    pub fn texture_create_view(
        &self,
        texture_id: id::TextureId,
        desc: &resource::TextureViewDescriptor,
    ) -> (id::TextureViewId, Option<CreateTextureViewError>) {
        let hub = &self.hub;
        let fid = hub.texture_views.prepare();

        let texture = match hub.textures.get(texture_id).get() {
            Ok(texture) => texture,
            Err(e) => {
                let error = CreateTextureViewError::from(e);
                log::error!("Texture::create_view error: {error}");
                let id = fid.assign_invalid(&desc.label);
                return (id, Some(error));
            }
        };
        let device = texture.device.clone();

        let error = match device.create_texture_view(&texture, desc) {
            Ok(view) => {
                let id = fid.assign(Fallible::Valid(view));
                api_log!("Texture::create_view({texture_id:?}) -> {id:?}");
                return (id, None);
            }
            Err(e) => e,
        };

        device.handle_error("Texture::create_view", desc.label.to_string(), error.clone());
        let id = fid.assign_invalid(&desc.label);
        (id, Some(error))
    }

    pub fn texture_view_drop(&self, texture_view_id: id::TextureViewId) {
        api_log!("TextureView::drop {texture_view_id:?}");

        self.hub.texture_views.remove(texture_view_id);
    }

    pub fn device_create_sampler(
        &self,
        device_id: DeviceId,
        desc: &resource::SamplerDescriptor,
    ) -> (id::SamplerId, Option<CreateSamplerError>) {
        let hub = &self.hub;
        let fid = hub.samplers.prepare();

        let device = self.hub.devices.get(device_id);
        let error = match device.create_sampler(desc) {
            Ok(sampler) => {
                let id = fid.assign(Fallible::Valid(sampler));
                api_log!("Device::create_sampler -> {id:?}");
                return (id, None);
            }
            Err(e) => e,
        };

        device.handle_error("Device::create_sampler", desc.label.to_string(), error.clone());
        let id = fid.assign_invalid(&desc.label);
        (id, Some(error))
    }

    pub fn sampler_drop(&self, sampler_id: id::SamplerId) {
        api_log!("Sampler::drop {sampler_id:?}");

        self.hub.samplers.remove(sampler_id);
    }

    pub fn device_create_shader_module(
        &self,
        device_id: DeviceId,
        desc: &pipeline::ShaderModuleDescriptor,
    ) -> (id::ShaderModuleId, Option<pipeline::CreateShaderModuleError>) {
        let hub = &self.hub;
        let fid = hub.shader_modules.prepare();

        let device = self.hub.devices.get(device_id);
        let error = match device.create_shader_module(desc) {
            Ok(shader) => {
                let id = fid.assign(Fallible::Valid(shader));
                api_log!("Device::create_shader_module -> {id:?}");
                return (id, None);
            }
            Err(e) => e,
        };

        device.handle_error(
            "Device::create_shader_module",
            desc.label.to_string(),
            error.clone(),
        );
        let id = fid.assign_invalid(&desc.label);
        (id, Some(error))
    }

    pub fn shader_module_drop(&self, shader_module_id: id::ShaderModuleId) {
        api_log!("ShaderModule::drop {shader_module_id:?}");

        self.hub.shader_modules.remove(shader_module_id);
    }

    pub fn device_create_bind_group_layout(
        &self,
        device_id: DeviceId,
        desc: &binding_model::BindGroupLayoutDescriptor,
    ) -> (id::BindGroupLayoutId, Option<CreateBindGroupLayoutError>) {
        let hub = &self.hub;
        let fid = hub.bind_group_layouts.prepare();

        let device = self.hub.devices.get(device_id);
        let error = 'error: {
            let mut static_samplers = FastHashMap::default();
            for entry in desc.entries.iter() {
                let Some(sampler_id) = entry.static_sampler else {
                    continue;
                };
                match hub.samplers.get(sampler_id).get() {
                    Ok(sampler) => {
                        static_samplers.insert(entry.binding, sampler);
                    }
                    Err(error) => {
                        break 'error CreateBindGroupLayoutError::InvalidStaticSampler {
                            binding: entry.binding,
                            error,
                        }
                    }
                }
            }

            let layout = match device.create_bind_group_layout(
                &desc.label,
                &desc.entries,
                static_samplers,
            ) {
                Ok(layout) => layout,
                Err(e) => break 'error e,
            };

            let id = fid.assign(Fallible::Valid(layout));
            api_log!("Device::create_bind_group_layout -> {id:?}");
            return (id, None);
        };

        device.handle_error(
            "Device::create_bind_group_layout",
            desc.label.to_string(),
            error.clone(),
        );
        let id = fid.assign_invalid(&desc.label);
        (id, Some(error))
    }

    pub fn bind_group_layout_drop(&self, bind_group_layout_id: id::BindGroupLayoutId) {
        api_log!("BindGroupLayout::drop {bind_group_layout_id:?}");

        self.hub.bind_group_layouts.remove(bind_group_layout_id);
    }

    pub fn device_create_pipeline_layout(
        &self,
        device_id: DeviceId,
        desc: &binding_model::PipelineLayoutDescriptor,
    ) -> (
        id::PipelineLayoutId,
        Option<binding_model::CreatePipelineLayoutError>,
    ) {
        let hub = &self.hub;
        let fid = hub.pipeline_layouts.prepare();

        let device = self.hub.devices.get(device_id);
        let error = 'error: {
            let bind_group_layouts = {
                let resolved: Result<Vec<_>, _> = desc
                    .bind_group_layouts
                    .iter()
                    .map(|slot| {
                        slot.map(|bgl_id| hub.bind_group_layouts.get(bgl_id).get())
                            .transpose()
                    })
                    .collect();
                match resolved {
                    Ok(layouts) => layouts,
                    Err(e) => break 'error e.into(),
                }
            };

            let layout = match device.create_pipeline_layout(&desc.label, bind_group_layouts) {
                Ok(layout) => layout,
                Err(e) => break 'error e,
            };

            let id = fid.assign(Fallible::Valid(layout));
            api_log!("Device::create_pipeline_layout -> {id:?}");
            return (id, None);
        };

        device.handle_error(
            "Device::create_pipeline_layout",
            desc.label.to_string(),
            error.clone(),
        );
        let id = fid.assign_invalid(&desc.label);
        (id, Some(error))
    }

    pub fn pipeline_layout_drop(&self, pipeline_layout_id: id::PipelineLayoutId) {
        api_log!("PipelineLayout::drop {pipeline_layout_id:?}");

        self.hub.pipeline_layouts.remove(pipeline_layout_id);
    }

    fn resolve_bind_group_entry(
        &self,
        entry: &BindGroupEntry,
    ) -> Result<ResolvedBindGroupEntry, CreateBindGroupError> {
        let hub = &self.hub;

        let set = [
            entry.buffer.is_some(),
            entry.sampler.is_some(),
            entry.texture_view.is_some(),
            entry.external_texture.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count();
        match set {
            0 => return Err(CreateBindGroupError::NoResource(entry.binding)),
            1 => {}
            _ => return Err(CreateBindGroupError::MultipleResources(entry.binding)),
        }

        let resource = if let Some(ref bb) = entry.buffer {
            ResolvedBindingResource::Buffer(ResolvedBufferBinding {
                buffer: hub.buffers.get(bb.buffer).get()?,
                offset: bb.offset,
                size: bb.size,
            })
        } else if let Some(sampler_id) = entry.sampler {
            ResolvedBindingResource::Sampler(hub.samplers.get(sampler_id).get()?)
        } else if let Some(view_id) = entry.texture_view {
            ResolvedBindingResource::TextureView(hub.texture_views.get(view_id).get()?)
        } else if let Some(view_id) = entry.external_texture {
            ResolvedBindingResource::ExternalTexture(hub.texture_views.get(view_id).get()?)
        } else {
            return Err(CreateBindGroupError::NoResource(entry.binding));
        };

        Ok(ResolvedBindGroupEntry {
            binding: entry.binding,
            resource,
        })
    }

    pub fn device_create_bind_group(
        &self,
        device_id: DeviceId,
        desc: &binding_model::BindGroupDescriptor,
    ) -> (id::BindGroupId, Option<CreateBindGroupError>) {
        let hub = &self.hub;
        let fid = hub.bind_groups.prepare();

        let device = self.hub.devices.get(device_id);
        let error = 'error: {
            let layout = match hub.bind_group_layouts.get(desc.layout).get() {
                Ok(layout) => layout,
                Err(e) => break 'error e.into(),
            };

            let entries = {
                let resolved: Result<Vec<_>, _> = desc
                    .entries
                    .iter()
                    .map(|entry| self.resolve_bind_group_entry(entry))
                    .collect();
                match resolved {
                    Ok(entries) => entries,
                    Err(e) => break 'error e,
                }
            };

            let desc = ResolvedBindGroupDescriptor {
                label: desc.label.clone(),
                layout,
                entries,
            };

            let bind_group = match device.create_bind_group(desc) {
                Ok(bind_group) => bind_group,
                Err(e) => break 'error e,
            };

            let id = fid.assign(Fallible::Valid(bind_group));
            api_log!("Device::create_bind_group -> {id:?}");
            return (id, None);
        };

        device.handle_error(
            "Device::create_bind_group",
            desc.label.to_string(),
            error.clone(),
        );
        let id = fid.assign_invalid(&desc.label);
        (id, Some(error))
    }

    pub fn bind_group_drop(&self, bind_group_id: id::BindGroupId) {
        api_log!("BindGroup::drop {bind_group_id:?}");

        self.hub.bind_groups.remove(bind_group_id);
    }

    fn resolve_stage<'a>(
        &self,
        stage: &pipeline::ProgrammableStageDescriptor<'a>,
    ) -> Result<ResolvedProgrammableStageDescriptor<'a>, resource::InvalidResourceError> {
        let module = self.hub.shader_modules.get(stage.module).get()?;
        Ok(ResolvedProgrammableStageDescriptor {
            module,
            entry_point: stage.entry_point.clone(),
        })
    }

    pub fn device_create_compute_pipeline(
        &self,
        device_id: DeviceId,
        desc: &pipeline::ComputePipelineDescriptor,
    ) -> (id::ComputePipelineId, Option<CreateComputePipelineError>) {
        let hub = &self.hub;
        let fid = hub.compute_pipelines.prepare();

        let device = self.hub.devices.get(device_id);
        let error = 'error: {
            let layout = desc
                .layout
                .map(|layout_id| hub.pipeline_layouts.get(layout_id).get())
                .transpose();
            let layout = match layout {
                Ok(layout) => layout,
                Err(e) => break 'error e.into(),
            };

            let stage = match self.resolve_stage(&desc.stage) {
                Ok(stage) => stage,
                Err(e) => break 'error e.into(),
            };

            let desc = ResolvedComputePipelineDescriptor {
                label: desc.label.clone(),
                layout,
                stage,
            };

            let pipeline = match device.create_compute_pipeline(desc) {
                Ok(pipeline) => pipeline,
                Err(e) => break 'error e,
            };

            let id = fid.assign(Fallible::Valid(pipeline));
            api_log!("Device::create_compute_pipeline -> {id:?}");
            return (id, None);
        };

        device.handle_error(
            "Device::create_compute_pipeline",
            desc.label.to_string(),
            error.clone(),
        );
        let id = fid.assign_invalid(&desc.label);
        (id, Some(error))
    }

    /// Returns the layout of group `index` of the pipeline's layout, which
    /// may have been derived from its shader.
    pub fn compute_pipeline_get_bind_group_layout(
        &self,
        pipeline_id: id::ComputePipelineId,
        index: u32,
    ) -> (id::BindGroupLayoutId, Option<GetBindGroupLayoutError>) {
        let hub = &self.hub;

        let fid = hub.bind_group_layouts.prepare();

        let error = 'error: {
            let pipeline = match hub.compute_pipelines.get(pipeline_id).get() {
                Ok(pipeline) => pipeline,
                Err(e) => break 'error e.into(),
            };
            let id = match pipeline.layout.bind_group_layouts.get(index as usize) {
                Some(Some(bgl)) => fid.assign(Fallible::Valid(bgl.clone())),
                _ => {
                    let error = GetBindGroupLayoutError::InvalidGroupIndex(index);
                    pipeline.device.handle_error(
                        "ComputePipeline::get_bind_group_layout",
                        pipeline.label.clone(),
                        error.clone(),
                    );
                    break 'error error;
                }
            };
            return (id, None);
        };

        let id = fid.assign_invalid(&None);
        (id, Some(error))
    }

    pub fn compute_pipeline_drop(&self, compute_pipeline_id: id::ComputePipelineId) {
        api_log!("ComputePipeline::drop {compute_pipeline_id:?}");

        self.hub.compute_pipelines.remove(compute_pipeline_id);
    }

    pub fn device_create_render_pipeline(
        &self,
        device_id: DeviceId,
        desc: &pipeline::RenderPipelineDescriptor,
    ) -> (id::RenderPipelineId, Option<CreateRenderPipelineError>) {
        let hub = &self.hub;
        let fid = hub.render_pipelines.prepare();

        let device = self.hub.devices.get(device_id);
        let error = 'error: {
            let layout = desc
                .layout
                .map(|layout_id| hub.pipeline_layouts.get(layout_id).get())
                .transpose();
            let layout = match layout {
                Ok(layout) => layout,
                Err(e) => break 'error e.into(),
            };

            let vertex = match self.resolve_stage(&desc.vertex.stage) {
                Ok(stage) => ResolvedVertexState {
                    stage,
                    buffers: desc.vertex.buffers.clone(),
                },
                Err(e) => break 'error e.into(),
            };

            let fragment = match desc.fragment {
                Some(ref fragment) => match self.resolve_stage(&fragment.stage) {
                    Ok(stage) => Some(ResolvedFragmentState {
                        stage,
                        targets: fragment.targets.clone(),
                    }),
                    Err(e) => break 'error e.into(),
                },
                None => None,
            };

            let desc = ResolvedRenderPipelineDescriptor {
                label: desc.label.clone(),
                layout,
                vertex,
                primitive: desc.primitive,
                depth_stencil: desc.depth_stencil.clone(),
                multisample: desc.multisample,
                fragment,
            };

            let pipeline = match device.create_render_pipeline(desc) {
                Ok(pipeline) => pipeline,
                Err(e) => break 'error e,
            };

            let id = fid.assign(Fallible::Valid(pipeline));
            api_log!("Device::create_render_pipeline -> {id:?}");
            return (id, None);
        };

        device.handle_error(
            "Device::create_render_pipeline",
            desc.label.to_string(),
            error.clone(),
        );
        let id = fid.assign_invalid(&desc.label);
        (id, Some(error))
    }

    /// Returns the layout of group `index` of the pipeline's layout, which
    /// may have been derived from its shaders.
    pub fn render_pipeline_get_bind_group_layout(
        &self,
        pipeline_id: id::RenderPipelineId,
        index: u32,
    ) -> (id::BindGroupLayoutId, Option<GetBindGroupLayoutError>) {
        let hub = &self.hub;

        let fid = hub.bind_group_layouts.prepare();

        let error = 'error: {
            let pipeline = match hub.render_pipelines.get(pipeline_id).get() {
                Ok(pipeline) => pipeline,
                Err(e) => break 'error e.into(),
            };
            let id = match pipeline.layout.bind_group_layouts.get(index as usize) {
                Some(Some(bgl)) => fid.assign(Fallible::Valid(bgl.clone())),
                _ => {
                    let error = GetBindGroupLayoutError::InvalidGroupIndex(index);
                    pipeline.device.handle_error(
                        "RenderPipeline::get_bind_group_layout",
                        pipeline.label.clone(),
                        error.clone(),
                    );
                    break 'error error;
                }
            };
            return (id, None);
        };

        let id = fid.assign_invalid(&None);
        (id, Some(error))
    }

    pub fn render_pipeline_drop(&self, render_pipeline_id: id::RenderPipelineId) {
        api_log!("RenderPipeline::drop {render_pipeline_id:?}");

        self.hub.render_pipelines.remove(render_pipeline_id);
    }

    pub fn device_create_command_encoder(
        &self,
        device_id: DeviceId,
        desc: &wgt::CommandEncoderDescriptor<Label>,
    ) -> (id::CommandEncoderId, Option<DeviceError>) {
        let hub = &self.hub;
        let fid = hub.command_buffers.prepare();

        let device = self.hub.devices.get(device_id);
        let error = device.check_is_valid().err();
        if let Some(ref e) = error {
            device.handle_error(
                "Device::create_command_encoder",
                desc.label.to_string(),
                e.clone(),
            );
        }

        let cmd_buf = CommandBuffer::new(&device, &desc.label);
        let id = fid.assign(Arc::new(cmd_buf)).into_command_encoder_id();
        api_log!("Device::create_command_encoder -> {id:?}");
        (id, error)
    }

    pub fn command_encoder_drop(&self, command_encoder_id: id::CommandEncoderId) {
        api_log!("CommandEncoder::drop {command_encoder_id:?}");

        self.hub
            .command_buffers
            .remove(command_encoder_id.into_command_buffer_id());
    }

    pub fn command_buffer_drop(&self, command_buffer_id: id::CommandBufferId) {
        api_log!("CommandBuffer::drop {command_buffer_id:?}");

        self.hub.command_buffers.remove(command_buffer_id);
    }
}
