use std::borrow::Cow;

use wgc::{
    command::{ComputePassDescriptor, RenderPassColorAttachment, RenderPassDescriptor},
    global::Global,
    id,
    pipeline::{
        ComputePipelineDescriptor, FragmentState, ProgrammableStageDescriptor,
        RenderPipelineDescriptor, ShaderModuleDescriptor, VertexBufferLayout, VertexState,
    },
    validation::{EntryPoint, ShaderBinding, ShaderInterface},
};

use crate::TestParameters;

const RENDER_TARGET_FORMAT: wgt::TextureFormat = wgt::TextureFormat::Rgba8Unorm;

/// A fresh engine with one device, created for a single test.
pub struct TestingContext {
    pub global: Global,
    pub device: id::DeviceId,
    pub queue: id::QueueId,
    pub device_features: wgt::Features,
    pub device_limits: wgt::Limits,
}

impl TestingContext {
    pub fn new(params: TestParameters) -> Self {
        // We don't actually care if it fails
        let _ = env_logger::try_init();

        let global = Global::new();
        let (device, queue) = global
            .create_device(&wgt::DeviceDescriptor {
                label: Some(Cow::Borrowed("test device")),
                required_features: params.required_features,
                required_limits: params.required_limits,
            })
            .expect("failed to create the test device");

        Self {
            device_features: global.device_features(device),
            device_limits: global.device_limits(device),
            global,
            device,
            queue,
        }
    }

    pub fn create_buffer(&self, size: wgt::BufferAddress, usage: wgt::BufferUsages) -> id::BufferId {
        let (buffer, _) = self.global.device_create_buffer(
            self.device,
            &wgt::BufferDescriptor {
                label: None,
                size,
                usage,
                mapped_at_creation: false,
            },
        );
        buffer
    }

    pub fn create_texture(
        &self,
        format: wgt::TextureFormat,
        usage: wgt::TextureUsages,
        width: u32,
        height: u32,
    ) -> id::TextureId {
        let (texture, _) = self.global.device_create_texture(
            self.device,
            &wgt::TextureDescriptor {
                label: None,
                size: wgt::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgt::TextureDimension::D2,
                format,
                usage,
            },
        );
        texture
    }

    /// A view of the whole texture.
    pub fn create_view(&self, texture: id::TextureId) -> id::TextureViewId {
        let (view, _) = self
            .global
            .texture_create_view(texture, &Default::default());
        view
    }

    /// A shader module with a single entry point named `main`.
    pub fn create_shader(&self, entry_point: EntryPoint) -> id::ShaderModuleId {
        let (module, _) = self.global.device_create_shader_module(
            self.device,
            &ShaderModuleDescriptor {
                label: None,
                interface: ShaderInterface {
                    entry_points: vec![entry_point],
                },
            },
        );
        module
    }

    /// A 4x4 `Rgba8Unorm` color attachment.
    pub fn create_render_target(&self) -> id::TextureViewId {
        let texture = self.create_texture(
            RENDER_TARGET_FORMAT,
            wgt::TextureUsages::RENDER_ATTACHMENT,
            4,
            4,
        );
        self.create_view(texture)
    }

    /// A compute pipeline with a derived layout.
    pub fn create_compute_pipeline(&self, bindings: Vec<ShaderBinding>) -> id::ComputePipelineId {
        let module = self.create_shader(compute_entry_point(bindings));
        let (pipeline, error) = self.global.device_create_compute_pipeline(
            self.device,
            &ComputePipelineDescriptor {
                label: None,
                layout: None,
                stage: ProgrammableStageDescriptor {
                    module,
                    entry_point: None,
                },
            },
        );
        assert!(error.is_none(), "{error:?}");
        pipeline
    }

    /// A render pipeline drawing to a single [`create_render_target`] attachment
    /// and reading every attribute of `buffers`.
    ///
    /// [`create_render_target`]: Self::create_render_target
    pub fn create_render_pipeline(&self, buffers: &[VertexBufferLayout]) -> id::RenderPipelineId {
        let inputs = buffers
            .iter()
            .flat_map(|buffer| buffer.attributes.iter())
            .map(|attribute| (attribute.shader_location, attribute.format))
            .collect();
        let (module, _) = self.global.device_create_shader_module(
            self.device,
            &ShaderModuleDescriptor {
                label: None,
                interface: ShaderInterface {
                    entry_points: vec![
                        EntryPoint {
                            name: "vs".to_string(),
                            stage: wgt::ShaderStages::VERTEX,
                            bindings: Vec::new(),
                            inputs,
                            targets: Vec::new(),
                        },
                        EntryPoint {
                            name: "fs".to_string(),
                            stage: wgt::ShaderStages::FRAGMENT,
                            bindings: Vec::new(),
                            inputs: Vec::new(),
                            targets: vec![0],
                        },
                    ],
                },
            },
        );
        let stage = ProgrammableStageDescriptor {
            module,
            entry_point: None,
        };
        let (pipeline, error) = self.global.device_create_render_pipeline(
            self.device,
            &RenderPipelineDescriptor {
                label: None,
                layout: None,
                vertex: VertexState {
                    stage: stage.clone(),
                    buffers: Cow::Borrowed(buffers),
                },
                primitive: Default::default(),
                depth_stencil: None,
                multisample: Default::default(),
                fragment: Some(FragmentState {
                    stage,
                    targets: Cow::Owned(vec![Some(RENDER_TARGET_FORMAT.into())]),
                }),
            },
        );
        assert!(error.is_none(), "{error:?}");
        pipeline
    }

    pub fn create_encoder(&self) -> id::CommandEncoderId {
        let (encoder, _) = self
            .global
            .device_create_command_encoder(self.device, &Default::default());
        encoder
    }

    pub fn finish(&self, encoder: id::CommandEncoderId) -> id::CommandBufferId {
        let (command_buffer, _) = self
            .global
            .command_encoder_finish(encoder, &Default::default());
        command_buffer
    }

    /// Records `record` into a compute pass of a new encoder and finishes it.
    pub fn encode_compute_pass(
        &self,
        record: impl FnOnce(&Global, &mut wgc::command::ComputePass),
    ) -> id::CommandBufferId {
        let encoder = self.create_encoder();
        let (mut pass, _) = self
            .global
            .command_encoder_begin_compute_pass(encoder, &ComputePassDescriptor { label: None });
        record(&self.global, &mut pass);
        let _ = self.global.compute_pass_end(pass);
        self.finish(encoder)
    }

    /// Records `record` into a render pass drawing to `view` and finishes it.
    pub fn encode_render_pass(
        &self,
        view: id::TextureViewId,
        record: impl FnOnce(&Global, &mut wgc::command::RenderPass),
    ) -> id::CommandBufferId {
        let encoder = self.create_encoder();
        let (mut pass, _) = self.global.command_encoder_begin_render_pass(
            encoder,
            &RenderPassDescriptor {
                label: None,
                color_attachments: Cow::Owned(vec![Some(color_attachment(view))]),
                depth_stencil_attachment: None,
            },
        );
        record(&self.global, &mut pass);
        let _ = self.global.render_pass_end(pass);
        self.finish(encoder)
    }
}

/// A color attachment that is cleared and stored.
pub fn color_attachment(view: id::TextureViewId) -> RenderPassColorAttachment {
    RenderPassColorAttachment {
        view,
        resolve_target: None,
        load_op: wgt::LoadOp::Clear(wgt::Color::TRANSPARENT),
        store_op: wgt::StoreOp::Store,
    }
}

/// A compute entry point named `main` using `bindings`.
pub fn compute_entry_point(bindings: Vec<ShaderBinding>) -> EntryPoint {
    EntryPoint {
        name: "main".to_string(),
        stage: wgt::ShaderStages::COMPUTE,
        bindings,
        inputs: Vec::new(),
        targets: Vec::new(),
    }
}
