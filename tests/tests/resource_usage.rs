//! Tests for conflicting resource usages inside a synchronization scope.

use std::borrow::Cow;

use wgc::{
    binding_model::{
        BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
        BufferBinding, BufferBindingLayout, PipelineLayoutDescriptor, TextureBindingLayout,
    },
    command::{PassChannel, RenderPassDepthStencilAttachment, RenderPassDescriptor},
    id,
    pipeline::{ComputePipelineDescriptor, ProgrammableStageDescriptor},
    resource::TextureViewDescriptor,
    validation::{ShaderBinding, ShaderBindingType},
};
use wgt::{
    BufferBindingType, BufferUsages as Bu, ShaderStages, TextureAspect, TextureFormat,
    TextureSampleType, TextureUsages as Tu,
};
use wgv_test::{compute_entry_point, fail, valid, TestParameters, TestingContext};

const CONFLICT: &str = "Attempted to use";

fn storage_layout(
    ctx: &TestingContext,
    visibility: ShaderStages,
    read_only: bool,
) -> id::BindGroupLayoutId {
    let (layout, _) = ctx.global.device_create_bind_group_layout(
        ctx.device,
        &BindGroupLayoutDescriptor {
            label: None,
            entries: Cow::Owned(vec![BindGroupLayoutEntry {
                binding: 0,
                visibility,
                buffer: Some(BufferBindingLayout {
                    ty: BufferBindingType::Storage { read_only },
                    ..Default::default()
                }),
                ..Default::default()
            }]),
        },
    );
    layout
}

fn bind_buffer(
    ctx: &TestingContext,
    layout: id::BindGroupLayoutId,
    buffer: id::BufferId,
) -> id::BindGroupId {
    let (bind_group, _) = ctx.global.device_create_bind_group(
        ctx.device,
        &BindGroupDescriptor {
            label: None,
            layout,
            entries: Cow::Owned(vec![BindGroupEntry {
                binding: 0,
                buffer: Some(BufferBinding {
                    buffer,
                    offset: 0,
                    size: None,
                }),
                ..Default::default()
            }]),
        },
    );
    bind_group
}

/// A compute pipeline with one storage buffer per group of `layouts`.
fn storage_pipeline(
    ctx: &TestingContext,
    layouts: &[(id::BindGroupLayoutId, bool)],
) -> id::ComputePipelineId {
    let bindings = layouts
        .iter()
        .enumerate()
        .map(|(group, &(_, read_only))| ShaderBinding {
            group: group as u32,
            binding: 0,
            ty: ShaderBindingType::Buffer {
                ty: BufferBindingType::Storage { read_only },
                min_binding_size: None,
            },
            count: None,
        })
        .collect();
    let module = ctx.create_shader(compute_entry_point(bindings));

    let (pipeline_layout, _) = ctx.global.device_create_pipeline_layout(
        ctx.device,
        &PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: layouts.iter().map(|&(layout, _)| Some(layout)).collect(),
        },
    );
    let (pipeline, error) = ctx.global.device_create_compute_pipeline(
        ctx.device,
        &ComputePipelineDescriptor {
            label: None,
            layout: Some(pipeline_layout),
            stage: ProgrammableStageDescriptor {
                module,
                entry_point: None,
            },
        },
    );
    assert!(error.is_none(), "{error:?}");
    pipeline
}

/// An 8x8 2D texture with `mip_level_count` mips.
fn create_texture(
    ctx: &TestingContext,
    format: TextureFormat,
    usage: Tu,
    mip_level_count: u32,
) -> id::TextureId {
    let (texture, _) = ctx.global.device_create_texture(
        ctx.device,
        &wgt::TextureDescriptor {
            label: None,
            size: wgt::Extent3d {
                width: 8,
                height: 8,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgt::TextureDimension::D2,
            format,
            usage,
        },
    );
    texture
}

fn create_view(
    ctx: &TestingContext,
    texture: id::TextureId,
    aspect: TextureAspect,
    mips: Option<(u32, u32)>,
) -> id::TextureViewId {
    let (base_mip_level, mip_level_count) = match mips {
        Some((base, count)) => (base, Some(count)),
        None => (0, None),
    };
    let (view, error) = ctx.global.texture_create_view(
        texture,
        &TextureViewDescriptor {
            range: wgt::ImageSubresourceRange {
                aspect,
                base_mip_level,
                mip_level_count,
                ..Default::default()
            },
            ..Default::default()
        },
    );
    assert!(error.is_none(), "{error:?}");
    view
}

/// A bind group sampling `view` from the fragment stage.
fn bind_sampled(
    ctx: &TestingContext,
    view: id::TextureViewId,
    sample_type: TextureSampleType,
) -> id::BindGroupId {
    let (layout, _) = ctx.global.device_create_bind_group_layout(
        ctx.device,
        &BindGroupLayoutDescriptor {
            label: None,
            entries: Cow::Owned(vec![BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                texture: Some(TextureBindingLayout {
                    sample_type,
                    ..Default::default()
                }),
                ..Default::default()
            }]),
        },
    );
    let (bind_group, error) = ctx.global.device_create_bind_group(
        ctx.device,
        &BindGroupDescriptor {
            label: None,
            layout,
            entries: Cow::Owned(vec![BindGroupEntry {
                binding: 0,
                texture_view: Some(view),
                ..Default::default()
            }]),
        },
    );
    assert!(error.is_none(), "{error:?}");
    bind_group
}

/// Begins a pass on the depth-stencil `attachment` alone, sets
/// `bind_group` and finishes the encoder.
fn encode_depth_pass(
    ctx: &TestingContext,
    attachment: &RenderPassDepthStencilAttachment,
    bind_group: id::BindGroupId,
) -> id::CommandBufferId {
    let encoder = ctx.create_encoder();
    let (mut pass, _) = ctx.global.command_encoder_begin_render_pass(
        encoder,
        &RenderPassDescriptor {
            label: None,
            color_attachments: Cow::Borrowed(&[]),
            depth_stencil_attachment: Some(attachment),
        },
    );
    ctx.global
        .render_pass_set_bind_group(&mut pass, 0, bind_group, &[])
        .unwrap();
    let _ = ctx.global.render_pass_end(pass);
    ctx.finish(encoder)
}

fn read_only_channel<V>() -> PassChannel<V> {
    PassChannel {
        load_op: None,
        store_op: None,
        read_only: true,
    }
}

fn written_channel<V>(clear: V) -> PassChannel<V> {
    PassChannel {
        load_op: Some(wgt::LoadOp::Clear(clear)),
        store_op: Some(wgt::StoreOp::Store),
        read_only: false,
    }
}

#[test]
fn index_buffer_and_writable_storage_conflict() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(256, Bu::INDEX | Bu::STORAGE);
    let layout = storage_layout(&ctx, ShaderStages::FRAGMENT, false);
    let bind_group = bind_buffer(&ctx, layout, buffer);
    let target = ctx.create_render_target();

    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global
                    .render_pass_set_index_buffer(pass, buffer, wgt::IndexFormat::Uint32, 0, None)
                    .unwrap();
                global
                    .render_pass_set_bind_group(pass, 0, bind_group, &[])
                    .unwrap();
            })
        },
        Some(CONFLICT),
    );
}

#[test]
fn read_only_usages_combine() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(256, Bu::INDEX | Bu::VERTEX | Bu::STORAGE);
    let layout = storage_layout(&ctx, ShaderStages::FRAGMENT, true);
    let bind_group = bind_buffer(&ctx, layout, buffer);
    let target = ctx.create_render_target();

    valid(&ctx, || {
        ctx.encode_render_pass(target, |global, pass| {
            global
                .render_pass_set_index_buffer(pass, buffer, wgt::IndexFormat::Uint16, 0, None)
                .unwrap();
            global
                .render_pass_set_vertex_buffer(pass, 0, Some(buffer), 0, None)
                .unwrap();
            global
                .render_pass_set_bind_group(pass, 0, bind_group, &[])
                .unwrap();
        })
    });
}

#[test]
fn overwritten_bindings_stay_in_the_render_pass_scope() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(256, Bu::INDEX | Bu::STORAGE);
    let other = ctx.create_buffer(256, Bu::INDEX | Bu::STORAGE);
    let layout = storage_layout(&ctx, ShaderStages::FRAGMENT, false);
    let bind_group = bind_buffer(&ctx, layout, buffer);
    let other_group = bind_buffer(&ctx, layout, other);
    let target = ctx.create_render_target();

    // Replacing the index buffer before the bind group is set.
    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global
                    .render_pass_set_index_buffer(pass, buffer, wgt::IndexFormat::Uint32, 0, None)
                    .unwrap();
                global
                    .render_pass_set_index_buffer(pass, other, wgt::IndexFormat::Uint32, 0, None)
                    .unwrap();
                global
                    .render_pass_set_bind_group(pass, 0, bind_group, &[])
                    .unwrap();
            })
        },
        Some(CONFLICT),
    );

    // Replacing the bind group before the index buffer is set.
    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global
                    .render_pass_set_bind_group(pass, 0, bind_group, &[])
                    .unwrap();
                global
                    .render_pass_set_bind_group(pass, 0, other_group, &[])
                    .unwrap();
                global
                    .render_pass_set_index_buffer(pass, buffer, wgt::IndexFormat::Uint32, 0, None)
                    .unwrap();
            })
        },
        Some(CONFLICT),
    );
}

#[test]
fn attachment_sampled_in_same_pass_conflicts() {
    let ctx = TestingContext::new(TestParameters::default());
    let texture = ctx.create_texture(
        wgt::TextureFormat::Rgba8Unorm,
        wgt::TextureUsages::RENDER_ATTACHMENT | wgt::TextureUsages::TEXTURE_BINDING,
        4,
        4,
    );
    let view = ctx.create_view(texture);
    let (layout, _) = ctx.global.device_create_bind_group_layout(
        ctx.device,
        &BindGroupLayoutDescriptor {
            label: None,
            entries: Cow::Owned(vec![BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                texture: Some(TextureBindingLayout::default()),
                ..Default::default()
            }]),
        },
    );
    let (bind_group, _) = ctx.global.device_create_bind_group(
        ctx.device,
        &BindGroupDescriptor {
            label: None,
            layout,
            entries: Cow::Owned(vec![BindGroupEntry {
                binding: 0,
                texture_view: Some(view),
                ..Default::default()
            }]),
        },
    );

    fail(
        &ctx,
        || {
            ctx.encode_render_pass(view, |global, pass| {
                global
                    .render_pass_set_bind_group(pass, 0, bind_group, &[])
                    .unwrap();
            })
        },
        Some(CONFLICT),
    );

    // Sampling it from another pass is fine.
    let target = ctx.create_render_target();
    valid(&ctx, || {
        ctx.encode_render_pass(target, |global, pass| {
            global
                .render_pass_set_bind_group(pass, 0, bind_group, &[])
                .unwrap();
        })
    });
}

#[test]
fn each_dispatch_is_its_own_scope() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(256, Bu::STORAGE);
    let write_layout = storage_layout(&ctx, ShaderStages::COMPUTE, false);
    let read_layout = storage_layout(&ctx, ShaderStages::COMPUTE, true);
    let write_pipeline = storage_pipeline(&ctx, &[(write_layout, false)]);
    let read_pipeline = storage_pipeline(&ctx, &[(read_layout, true)]);
    let write_group = bind_buffer(&ctx, write_layout, buffer);
    let read_group = bind_buffer(&ctx, read_layout, buffer);

    valid(&ctx, || {
        ctx.encode_compute_pass(|global, pass| {
            global.compute_pass_set_pipeline(pass, write_pipeline).unwrap();
            global
                .compute_pass_set_bind_group(pass, 0, write_group, &[])
                .unwrap();
            global.compute_pass_dispatch_workgroups(pass, 1, 1, 1).unwrap();
            global.compute_pass_set_pipeline(pass, read_pipeline).unwrap();
            global
                .compute_pass_set_bind_group(pass, 0, read_group, &[])
                .unwrap();
            global.compute_pass_dispatch_workgroups(pass, 1, 1, 1).unwrap();
        })
    });
}

#[test]
fn write_and_read_in_one_dispatch_conflict() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(256, Bu::STORAGE);
    let write_layout = storage_layout(&ctx, ShaderStages::COMPUTE, false);
    let read_layout = storage_layout(&ctx, ShaderStages::COMPUTE, true);
    let pipeline = storage_pipeline(&ctx, &[(write_layout, false), (read_layout, true)]);
    let write_group = bind_buffer(&ctx, write_layout, buffer);
    let read_group = bind_buffer(&ctx, read_layout, buffer);

    fail(
        &ctx,
        || {
            ctx.encode_compute_pass(|global, pass| {
                global.compute_pass_set_pipeline(pass, pipeline).unwrap();
                global
                    .compute_pass_set_bind_group(pass, 0, write_group, &[])
                    .unwrap();
                global
                    .compute_pass_set_bind_group(pass, 1, read_group, &[])
                    .unwrap();
                global.compute_pass_dispatch_workgroups(pass, 1, 1, 1).unwrap();
            })
        },
        Some(CONFLICT),
    );

    // Without a dispatch nothing is used.
    valid(&ctx, || {
        ctx.encode_compute_pass(|global, pass| {
            global.compute_pass_set_pipeline(pass, pipeline).unwrap();
            global
                .compute_pass_set_bind_group(pass, 0, write_group, &[])
                .unwrap();
            global
                .compute_pass_set_bind_group(pass, 1, read_group, &[])
                .unwrap();
        })
    });
}

#[test]
fn usages_in_separate_passes_never_conflict() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(256, Bu::INDEX | Bu::STORAGE | Bu::COPY_DST);
    let source = ctx.create_buffer(256, Bu::COPY_SRC);
    let compute_layout = storage_layout(&ctx, ShaderStages::COMPUTE, false);
    let pipeline = storage_pipeline(&ctx, &[(compute_layout, false)]);
    let compute_group = bind_buffer(&ctx, compute_layout, buffer);
    let fragment_layout = storage_layout(&ctx, ShaderStages::FRAGMENT, false);
    let fragment_group = bind_buffer(&ctx, fragment_layout, buffer);
    let target = ctx.create_render_target();

    valid(&ctx, || {
        let encoder = ctx.create_encoder();

        let (mut pass, _) = ctx.global.command_encoder_begin_compute_pass(
            encoder,
            &wgc::command::ComputePassDescriptor { label: None },
        );
        ctx.global.compute_pass_set_pipeline(&mut pass, pipeline).unwrap();
        ctx.global
            .compute_pass_set_bind_group(&mut pass, 0, compute_group, &[])
            .unwrap();
        ctx.global
            .compute_pass_dispatch_workgroups(&mut pass, 4, 1, 1)
            .unwrap();
        ctx.global.compute_pass_end(pass).unwrap();

        ctx.global
            .command_encoder_copy_buffer_to_buffer(encoder, source, 0, buffer, 0, 256)
            .unwrap();

        let (mut pass, _) = ctx.global.command_encoder_begin_render_pass(
            encoder,
            &wgc::command::RenderPassDescriptor {
                label: None,
                color_attachments: Cow::Owned(vec![Some(wgv_test::color_attachment(target))]),
                depth_stencil_attachment: None,
            },
        );
        ctx.global
            .render_pass_set_index_buffer(&mut pass, buffer, wgt::IndexFormat::Uint32, 0, None)
            .unwrap();
        ctx.global.render_pass_end(pass).unwrap();

        let (mut pass, _) = ctx.global.command_encoder_begin_render_pass(
            encoder,
            &wgc::command::RenderPassDescriptor {
                label: None,
                color_attachments: Cow::Owned(vec![Some(wgv_test::color_attachment(target))]),
                depth_stencil_attachment: None,
            },
        );
        ctx.global
            .render_pass_set_bind_group(&mut pass, 0, fragment_group, &[])
            .unwrap();
        ctx.global.render_pass_end(pass).unwrap();

        ctx.finish(encoder)
    });
}

#[test]
fn disjoint_mips_of_one_texture_do_not_conflict() {
    let ctx = TestingContext::new(TestParameters::default());
    let texture = create_texture(
        &ctx,
        TextureFormat::Rgba8Unorm,
        Tu::RENDER_ATTACHMENT | Tu::TEXTURE_BINDING,
        2,
    );
    let attachment = create_view(&ctx, texture, TextureAspect::All, Some((0, 1)));
    let lower_mip = create_view(&ctx, texture, TextureAspect::All, Some((1, 1)));
    let every_mip = create_view(&ctx, texture, TextureAspect::All, None);
    let float = TextureSampleType::Float { filterable: true };
    let sample_lower_mip = bind_sampled(&ctx, lower_mip, float);
    let sample_every_mip = bind_sampled(&ctx, every_mip, float);

    valid(&ctx, || {
        ctx.encode_render_pass(attachment, |global, pass| {
            global
                .render_pass_set_bind_group(pass, 0, sample_lower_mip, &[])
                .unwrap();
        })
    });
    fail(
        &ctx,
        || {
            ctx.encode_render_pass(attachment, |global, pass| {
                global
                    .render_pass_set_bind_group(pass, 0, sample_every_mip, &[])
                    .unwrap();
            })
        },
        Some(CONFLICT),
    );
}

#[test]
fn read_only_depth_attachment_can_be_sampled() {
    let ctx = TestingContext::new(TestParameters::default());
    let texture = create_texture(
        &ctx,
        TextureFormat::Depth32Float,
        Tu::RENDER_ATTACHMENT | Tu::TEXTURE_BINDING,
        1,
    );
    let view = create_view(&ctx, texture, TextureAspect::All, None);
    let bind_group = bind_sampled(&ctx, view, TextureSampleType::Depth);

    let read_only = RenderPassDepthStencilAttachment {
        view,
        depth: read_only_channel(),
        stencil: PassChannel::default(),
    };
    valid(&ctx, || encode_depth_pass(&ctx, &read_only, bind_group));

    let written = RenderPassDepthStencilAttachment {
        view,
        depth: written_channel(1.0),
        stencil: PassChannel::default(),
    };
    fail(
        &ctx,
        || encode_depth_pass(&ctx, &written, bind_group),
        Some(CONFLICT),
    );
}

#[test]
fn depth_and_stencil_aspects_are_tracked_apart() {
    let ctx = TestingContext::new(TestParameters::default());
    let texture = create_texture(
        &ctx,
        TextureFormat::Depth24PlusStencil8,
        Tu::RENDER_ATTACHMENT | Tu::TEXTURE_BINDING,
        1,
    );
    let view = create_view(&ctx, texture, TextureAspect::All, None);
    let depth = create_view(&ctx, texture, TextureAspect::DepthOnly, None);
    let stencil = create_view(&ctx, texture, TextureAspect::StencilOnly, None);
    let sample_depth = bind_sampled(&ctx, depth, TextureSampleType::Depth);
    let sample_stencil = bind_sampled(&ctx, stencil, TextureSampleType::Uint);

    // Depth is read-only, stencil is written.
    let attachment = RenderPassDepthStencilAttachment {
        view,
        depth: read_only_channel(),
        stencil: written_channel(0),
    };
    valid(&ctx, || encode_depth_pass(&ctx, &attachment, sample_depth));
    fail(
        &ctx,
        || encode_depth_pass(&ctx, &attachment, sample_stencil),
        Some(CONFLICT),
    );
}

#[test]
fn bindings_invisible_to_the_pass_are_tracked() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(256, Bu::INDEX | Bu::STORAGE);
    let layout = storage_layout(&ctx, ShaderStages::COMPUTE, false);
    let bind_group = bind_buffer(&ctx, layout, buffer);
    let target = ctx.create_render_target();

    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global
                    .render_pass_set_index_buffer(pass, buffer, wgt::IndexFormat::Uint32, 0, None)
                    .unwrap();
                global
                    .render_pass_set_bind_group(pass, 0, bind_group, &[])
                    .unwrap();
            })
        },
        Some(CONFLICT),
    );
}

#[test]
fn groups_outside_the_pipeline_layout_are_tracked() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(256, Bu::STORAGE);
    let write_layout = storage_layout(&ctx, ShaderStages::COMPUTE, false);
    let read_layout = storage_layout(&ctx, ShaderStages::COMPUTE, true);
    let pipeline = storage_pipeline(&ctx, &[(write_layout, false)]);
    let write_group = bind_buffer(&ctx, write_layout, buffer);
    let read_group = bind_buffer(&ctx, read_layout, buffer);

    // The pipeline layout only has group 0.
    fail(
        &ctx,
        || {
            ctx.encode_compute_pass(|global, pass| {
                global.compute_pass_set_pipeline(pass, pipeline).unwrap();
                global
                    .compute_pass_set_bind_group(pass, 0, write_group, &[])
                    .unwrap();
                global
                    .compute_pass_set_bind_group(pass, 1, read_group, &[])
                    .unwrap();
                global.compute_pass_dispatch_workgroups(pass, 1, 1, 1).unwrap();
            })
        },
        Some(CONFLICT),
    );
}

#[test]
fn same_writable_storage_usage_repeats() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(256, Bu::STORAGE);
    let storage_entry = |binding| BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        buffer: Some(BufferBindingLayout {
            ty: BufferBindingType::Storage { read_only: false },
            ..Default::default()
        }),
        ..Default::default()
    };
    let (layout, _) = ctx.global.device_create_bind_group_layout(
        ctx.device,
        &BindGroupLayoutDescriptor {
            label: None,
            entries: Cow::Owned(vec![storage_entry(0), storage_entry(1)]),
        },
    );
    let buffer_entry = |binding| BindGroupEntry {
        binding,
        buffer: Some(BufferBinding {
            buffer,
            offset: 0,
            size: None,
        }),
        ..Default::default()
    };
    let (bind_group, error) = ctx.global.device_create_bind_group(
        ctx.device,
        &BindGroupDescriptor {
            label: None,
            layout,
            entries: Cow::Owned(vec![buffer_entry(0), buffer_entry(1)]),
        },
    );
    assert!(error.is_none(), "{error:?}");
    let target = ctx.create_render_target();

    valid(&ctx, || {
        ctx.encode_render_pass(target, |global, pass| {
            global
                .render_pass_set_bind_group(pass, 0, bind_group, &[])
                .unwrap();
            global
                .render_pass_set_bind_group(pass, 1, bind_group, &[])
                .unwrap();
        })
    });
}
