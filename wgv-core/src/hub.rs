/*! Allocating resource ids, and tracking the resources they refer to.

The API uses identifiers of type [`Id<R>`] to refer to resources of type
`R`. For example, [`id::DeviceId`] is an alias for `Id<markers::Device>`, and
[`id::BufferId`] is an alias for `Id<markers::Buffer>`. `Id` implements
`Copy`, `Hash`, `Eq`, `Ord`, and of course `Debug`.

`Id`s also incorporate a generation number, for additional validation.

The resources to which identifiers refer are freed explicitly, with the
`*_drop` entry points of [`Global`]. Anything else holding an `Arc` to the
resource, such as a bind group referring to a buffer, keeps it alive.

## Error objects

Creating a resource always yields an id, even when creation fails. A failed
creation stores an invalid entry holding the label of the descriptor, and
every later use of that id fails with an [`InvalidResourceError`] naming that
label. Devices, queues and command encoders have no invalid entries: a lost
device, or an encoder that hit an error, remembers that state itself.

[`Id<R>`]: crate::id::Id
[`Global`]: crate::global::Global
[`InvalidResourceError`]: crate::resource::InvalidResourceError
*/

use std::sync::Arc;

use crate::{
    binding_model::{BindGroup, BindGroupLayout, PipelineLayout},
    command::{CommandBuffer, RenderBundle},
    device::{queue::Queue, Device},
    pipeline::{ComputePipeline, RenderPipeline, ShaderModule},
    registry::Registry,
    resource::{Buffer, Fallible, Sampler, Texture, TextureView},
};

pub use crate::registry::RegistryReport;

#[derive(Debug, PartialEq, Eq)]
pub struct HubReport {
    pub devices: RegistryReport,
    pub queues: RegistryReport,
    pub pipeline_layouts: RegistryReport,
    pub shader_modules: RegistryReport,
    pub bind_group_layouts: RegistryReport,
    pub bind_groups: RegistryReport,
    pub command_buffers: RegistryReport,
    pub render_bundles: RegistryReport,
    pub render_pipelines: RegistryReport,
    pub compute_pipelines: RegistryReport,
    pub buffers: RegistryReport,
    pub textures: RegistryReport,
    pub texture_views: RegistryReport,
    pub samplers: RegistryReport,
}

impl HubReport {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// All the resources of a [`Global`].
///
/// Every field is a [`Registry`] mapping ids to resources. Each registry is
/// locked on its own and only for the duration of a lookup, insertion or
/// removal, so no two registry locks are ever held at once.
///
/// [`Global`]: crate::global::Global
pub struct Hub {
    pub(crate) devices: Registry<Arc<Device>>,
    pub(crate) queues: Registry<Arc<Queue>>,
    pub(crate) pipeline_layouts: Registry<Fallible<PipelineLayout>>,
    pub(crate) shader_modules: Registry<Fallible<ShaderModule>>,
    pub(crate) bind_group_layouts: Registry<Fallible<BindGroupLayout>>,
    pub(crate) bind_groups: Registry<Fallible<BindGroup>>,
    pub(crate) command_buffers: Registry<Arc<CommandBuffer>>,
    pub(crate) render_bundles: Registry<Fallible<RenderBundle>>,
    pub(crate) render_pipelines: Registry<Fallible<RenderPipeline>>,
    pub(crate) compute_pipelines: Registry<Fallible<ComputePipeline>>,
    pub(crate) buffers: Registry<Fallible<Buffer>>,
    pub(crate) textures: Registry<Fallible<Texture>>,
    pub(crate) texture_views: Registry<Fallible<TextureView>>,
    pub(crate) samplers: Registry<Fallible<Sampler>>,
}

impl Hub {
    pub(crate) fn new() -> Self {
        Self {
            devices: Registry::new(),
            queues: Registry::new(),
            pipeline_layouts: Registry::new(),
            shader_modules: Registry::new(),
            bind_group_layouts: Registry::new(),
            bind_groups: Registry::new(),
            command_buffers: Registry::new(),
            render_bundles: Registry::new(),
            render_pipelines: Registry::new(),
            compute_pipelines: Registry::new(),
            buffers: Registry::new(),
            textures: Registry::new(),
            texture_views: Registry::new(),
            samplers: Registry::new(),
        }
    }

    pub fn generate_report(&self) -> HubReport {
        HubReport {
            devices: self.devices.generate_report(),
            queues: self.queues.generate_report(),
            pipeline_layouts: self.pipeline_layouts.generate_report(),
            shader_modules: self.shader_modules.generate_report(),
            bind_group_layouts: self.bind_group_layouts.generate_report(),
            bind_groups: self.bind_groups.generate_report(),
            command_buffers: self.command_buffers.generate_report(),
            render_bundles: self.render_bundles.generate_report(),
            render_pipelines: self.render_pipelines.generate_report(),
            compute_pipelines: self.compute_pipelines.generate_report(),
            buffers: self.buffers.generate_report(),
            textures: self.textures.generate_report(),
            texture_views: self.texture_views.generate_report(),
            samplers: self.samplers.generate_report(),
        }
    }
}
