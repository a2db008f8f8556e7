use std::borrow::Cow;

use wgc::binding_model::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BufferBinding, BufferBindingLayout, SamplerBindingLayout, TextureBindingLayout,
};
use wgc::command::ComputePassDescriptor;
use wgc::id;
use wgt::{BufferUsages as Bu, ShaderStages};
use wgv_test::{fail, valid, TestParameters, TestingContext};

fn create_layout(ctx: &TestingContext, entries: &[BindGroupLayoutEntry]) -> id::BindGroupLayoutId {
    let (layout, _) = ctx.global.device_create_bind_group_layout(
        ctx.device,
        &BindGroupLayoutDescriptor {
            label: None,
            entries: Cow::Borrowed(entries),
        },
    );
    layout
}

fn create_bind_group(
    ctx: &TestingContext,
    layout: id::BindGroupLayoutId,
    entries: &[BindGroupEntry],
) -> id::BindGroupId {
    let (bind_group, _) = ctx.global.device_create_bind_group(
        ctx.device,
        &BindGroupDescriptor {
            label: None,
            layout,
            entries: Cow::Borrowed(entries),
        },
    );
    bind_group
}

fn buffer_layout(binding: u32, visibility: ShaderStages, ty: wgt::BufferBindingType) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        buffer: Some(BufferBindingLayout {
            ty,
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn buffer_entry(binding: u32, buffer: id::BufferId, offset: u64, size: Option<u64>) -> BindGroupEntry {
    BindGroupEntry {
        binding,
        buffer: Some(BufferBinding {
            buffer,
            offset,
            size: size.and_then(wgt::BufferSize::new),
        }),
        ..Default::default()
    }
}

#[test]
fn sampler_binding_takes_exactly_one_resource() {
    let ctx = TestingContext::new(TestParameters::default());
    let layout = valid(&ctx, || {
        create_layout(
            &ctx,
            &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                sampler: Some(SamplerBindingLayout {
                    ty: wgt::SamplerBindingType::Filtering,
                }),
                ..Default::default()
            }],
        )
    });
    let (sampler, _) = ctx
        .global
        .device_create_sampler(ctx.device, &Default::default());

    valid(&ctx, || {
        create_bind_group(
            &ctx,
            layout,
            &[BindGroupEntry {
                binding: 0,
                sampler: Some(sampler),
                ..Default::default()
            }],
        )
    });

    let texture = ctx.create_texture(
        wgt::TextureFormat::Rgba8Unorm,
        wgt::TextureUsages::TEXTURE_BINDING,
        4,
        4,
    );
    let view = ctx.create_view(texture);
    fail(
        &ctx,
        || {
            create_bind_group(
                &ctx,
                layout,
                &[BindGroupEntry {
                    binding: 0,
                    sampler: Some(sampler),
                    texture_view: Some(view),
                    ..Default::default()
                }],
            )
        },
        Some("more than one of buffer, sampler, texture view or external texture"),
    );
    fail(
        &ctx,
        || {
            create_bind_group(
                &ctx,
                layout,
                &[BindGroupEntry {
                    binding: 0,
                    ..Default::default()
                }],
            )
        },
        Some("has none of buffer"),
    );
}

#[test]
fn uniform_binding_offset_alignment() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(1024, Bu::UNIFORM);
    let layout = create_layout(
        &ctx,
        &[buffer_layout(0, ShaderStages::VERTEX, wgt::BufferBindingType::Uniform)],
    );

    valid(&ctx, || {
        create_bind_group(&ctx, layout, &[buffer_entry(0, buffer, 0, Some(512))])
    });
    valid(&ctx, || {
        create_bind_group(&ctx, layout, &[buffer_entry(0, buffer, 256, None)])
    });
    // Static uniform bindings only need 4-byte aligned offsets.
    valid(&ctx, || {
        create_bind_group(&ctx, layout, &[buffer_entry(0, buffer, 4, Some(256))])
    });
    fail(
        &ctx,
        || create_bind_group(&ctx, layout, &[buffer_entry(0, buffer, 1, Some(256))]),
        Some("does not respect `BUFFER_BINDING_ALIGNMENT` alignment 4"),
    );
}

#[test]
fn storage_binding_offset_alignment() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(64, Bu::STORAGE);
    let storage = |has_dynamic_offset| BindGroupLayoutEntry {
        binding: 0,
        visibility: ShaderStages::COMPUTE,
        buffer: Some(BufferBindingLayout {
            ty: wgt::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset,
            min_binding_size: None,
        }),
        ..Default::default()
    };
    let layout = create_layout(&ctx, &[storage(false)]);
    let dynamic_layout = create_layout(&ctx, &[storage(true)]);

    valid(&ctx, || {
        create_bind_group(&ctx, layout, &[buffer_entry(0, buffer, 4, Some(16))])
    });
    valid(&ctx, || {
        create_bind_group(&ctx, dynamic_layout, &[buffer_entry(0, buffer, 4, Some(16))])
    });
    fail(
        &ctx,
        || create_bind_group(&ctx, layout, &[buffer_entry(0, buffer, 2, Some(16))]),
        Some("does not respect `BUFFER_BINDING_ALIGNMENT`"),
    );

    let bind_group =
        create_bind_group(&ctx, dynamic_layout, &[buffer_entry(0, buffer, 0, Some(16))]);
    let set_with_offsets = |offsets: &[u32]| {
        let encoder = ctx.create_encoder();
        let (mut pass, _) = ctx
            .global
            .command_encoder_begin_compute_pass(encoder, &ComputePassDescriptor { label: None });
        ctx.global
            .compute_pass_set_bind_group(&mut pass, 0, bind_group, offsets)
            .unwrap();
        let _ = ctx.global.compute_pass_end(pass);
        ctx.finish(encoder)
    };

    valid(&ctx, || set_with_offsets(&[4]));
    valid(&ctx, || set_with_offsets(&[48]));
    fail(&ctx, || set_with_offsets(&[6]), Some("does not respect `BUFFER_BINDING_ALIGNMENT`"));
    fail(&ctx, || set_with_offsets(&[52]), Some("would overrun"));
}

#[test]
fn buffer_binding_range() {
    let ctx = TestingContext::new(TestParameters::default());
    let uniform = ctx.create_buffer(1024, Bu::UNIFORM);
    let storage = ctx.create_buffer(1024, Bu::STORAGE);
    let uniform_layout = create_layout(
        &ctx,
        &[buffer_layout(0, ShaderStages::COMPUTE, wgt::BufferBindingType::Uniform)],
    );
    let storage_layout = create_layout(
        &ctx,
        &[buffer_layout(
            0,
            ShaderStages::COMPUTE,
            wgt::BufferBindingType::Storage { read_only: true },
        )],
    );

    fail(
        &ctx,
        || create_bind_group(&ctx, uniform_layout, &[buffer_entry(0, uniform, 768, Some(512))]),
        Some("overruns the buffer size"),
    );
    // An offset past the end never wraps around into range.
    fail(
        &ctx,
        || {
            create_bind_group(
                &ctx,
                uniform_layout,
                &[buffer_entry(0, uniform, u64::MAX - 255, Some(256))],
            )
        },
        Some("overruns the buffer size"),
    );
    fail(
        &ctx,
        || create_bind_group(&ctx, uniform_layout, &[buffer_entry(0, uniform, 1024, None)]),
        Some("is zero"),
    );
    fail(
        &ctx,
        || create_bind_group(&ctx, storage_layout, &[buffer_entry(0, storage, 0, Some(6))]),
        Some("not a multiple of 4"),
    );
    fail(
        &ctx,
        || create_bind_group(&ctx, storage_layout, &[buffer_entry(0, uniform, 0, None)]),
        Some("STORAGE"),
    );
}

#[test]
fn every_declared_binding_needs_a_resource() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(1024, Bu::UNIFORM);
    let layout = create_layout(
        &ctx,
        &[
            buffer_layout(0, ShaderStages::COMPUTE, wgt::BufferBindingType::Uniform),
            buffer_layout(1, ShaderStages::COMPUTE, wgt::BufferBindingType::Uniform),
        ],
    );

    valid(&ctx, || {
        create_bind_group(
            &ctx,
            layout,
            &[
                buffer_entry(0, buffer, 0, Some(256)),
                buffer_entry(1, buffer, 256, Some(256)),
            ],
        )
    });
    fail(
        &ctx,
        || create_bind_group(&ctx, layout, &[buffer_entry(0, buffer, 0, Some(256))]),
        Some("Binding 1 declared by the layout has no resource"),
    );
    fail(
        &ctx,
        || {
            create_bind_group(
                &ctx,
                layout,
                &[
                    buffer_entry(0, buffer, 0, Some(256)),
                    buffer_entry(1, buffer, 256, Some(256)),
                    buffer_entry(5, buffer, 512, Some(256)),
                ],
            )
        },
        Some("Unable to find a corresponding declaration for the given binding 5"),
    );
    fail(
        &ctx,
        || {
            create_bind_group(
                &ctx,
                layout,
                &[
                    buffer_entry(0, buffer, 0, Some(256)),
                    buffer_entry(0, buffer, 256, Some(256)),
                ],
            )
        },
        Some("set more than once"),
    );
}

#[test]
fn binding_arrays() {
    let texture_array = |ctx: &TestingContext| {
        create_layout(
            ctx,
            &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                texture: Some(TextureBindingLayout::default()),
                binding_array_size: 3,
                ..Default::default()
            }],
        )
    };

    // Sampled texture arrays need no optional feature.
    let ctx = TestingContext::new(TestParameters::default());
    let layout = valid(&ctx, || texture_array(&ctx));
    let texture = ctx.create_texture(
        wgt::TextureFormat::Rgba8Unorm,
        wgt::TextureUsages::TEXTURE_BINDING,
        4,
        4,
    );
    let view = ctx.create_view(texture);
    let element = |binding| BindGroupEntry {
        binding,
        texture_view: Some(view),
        ..Default::default()
    };

    valid(&ctx, || {
        create_bind_group(&ctx, layout, &[element(0), element(1), element(2)])
    });
    fail(
        &ctx,
        || create_bind_group(&ctx, layout, &[element(0), element(2)]),
        Some("Binding 1 declared by the layout has no resource"),
    );
    fail(
        &ctx,
        || create_bind_group(&ctx, layout, &[element(0), element(1), element(2), element(3)]),
        Some("Unable to find a corresponding declaration"),
    );

    // Only sampled textures can be arrays.
    fail(
        &ctx,
        || {
            create_layout(
                &ctx,
                &[BindGroupLayoutEntry {
                    binding_array_size: 2,
                    ..buffer_layout(0, ShaderStages::COMPUTE, wgt::BufferBindingType::Uniform)
                }],
            )
        },
        Some("only supported for sampled textures"),
    );
}

#[test]
fn partially_bound_arrays() {
    let ctx = TestingContext::new(
        TestParameters::default().features(wgt::Features::PARTIALLY_BOUND_BINDING_ARRAY),
    );
    let layout = create_layout(
        &ctx,
        &[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::FRAGMENT,
            texture: Some(TextureBindingLayout::default()),
            binding_array_size: 4,
            ..Default::default()
        }],
    );
    let texture = ctx.create_texture(
        wgt::TextureFormat::Rgba8Unorm,
        wgt::TextureUsages::TEXTURE_BINDING,
        4,
        4,
    );
    let view = ctx.create_view(texture);

    valid(&ctx, || {
        create_bind_group(
            &ctx,
            layout,
            &[BindGroupEntry {
                binding: 0,
                texture_view: Some(view),
                ..Default::default()
            }],
        )
    });
    // The first element is always required.
    fail(
        &ctx,
        || {
            create_bind_group(
                &ctx,
                layout,
                &[BindGroupEntry {
                    binding: 1,
                    texture_view: Some(view),
                    ..Default::default()
                }],
            )
        },
        Some("Binding 0 declared by the layout has no resource"),
    );
}

#[test]
fn layout_entry_validation() {
    let ctx = TestingContext::new(TestParameters::default());

    fail(
        &ctx,
        || {
            create_layout(
                &ctx,
                &[buffer_layout(
                    0,
                    ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                    wgt::BufferBindingType::Storage { read_only: false },
                )],
            )
        },
        Some("Writable storage bindings can't be visible to the vertex stage"),
    );
    valid(&ctx, || {
        create_layout(
            &ctx,
            &[buffer_layout(
                0,
                ShaderStages::VERTEX,
                wgt::BufferBindingType::Storage { read_only: true },
            )],
        )
    });
    fail(
        &ctx,
        || {
            create_layout(
                &ctx,
                &[BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::COMPUTE,
                    ..Default::default()
                }],
            )
        },
        Some("declares none of"),
    );
    fail(
        &ctx,
        || {
            create_layout(
                &ctx,
                &[BindGroupLayoutEntry {
                    sampler: Some(SamplerBindingLayout::default()),
                    ..buffer_layout(0, ShaderStages::COMPUTE, wgt::BufferBindingType::Uniform)
                }],
            )
        },
        Some("declares more than one of"),
    );
    fail(
        &ctx,
        || {
            create_layout(
                &ctx,
                &[
                    buffer_layout(3, ShaderStages::COMPUTE, wgt::BufferBindingType::Uniform),
                    buffer_layout(3, ShaderStages::COMPUTE, wgt::BufferBindingType::Uniform),
                ],
            )
        },
        Some("Conflicting binding at index 3"),
    );
}

#[test]
fn dynamic_offsets() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(1024, Bu::UNIFORM);
    let layout = create_layout(
        &ctx,
        &[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::COMPUTE,
            buffer: Some(BufferBindingLayout {
                ty: wgt::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: None,
            }),
            ..Default::default()
        }],
    );
    let bind_group = create_bind_group(&ctx, layout, &[buffer_entry(0, buffer, 0, Some(256))]);

    let set_with_offsets = |offsets: &[u32]| {
        let encoder = ctx.create_encoder();
        let (mut pass, _) = ctx
            .global
            .command_encoder_begin_compute_pass(encoder, &ComputePassDescriptor { label: None });
        ctx.global
            .compute_pass_set_bind_group(&mut pass, 0, bind_group, offsets)
            .unwrap();
        let _ = ctx.global.compute_pass_end(pass);
        ctx.finish(encoder)
    };

    valid(&ctx, || set_with_offsets(&[0]));
    valid(&ctx, || set_with_offsets(&[768]));
    fail(
        &ctx,
        || set_with_offsets(&[]),
        Some("expects 1 dynamic offset. However 0 dynamic offset were provided"),
    );
    fail(&ctx, || set_with_offsets(&[0, 0]), Some("dynamic offsets were provided"));
    fail(
        &ctx,
        || set_with_offsets(&[128]),
        Some("does not respect `min_uniform_buffer_offset_alignment` alignment 256"),
    );
    fail(&ctx, || set_with_offsets(&[1024]), Some("would overrun"));
}

#[test]
fn sampler_descriptors() {
    let ctx = TestingContext::new(TestParameters::default());
    let create = |desc: &wgc::resource::SamplerDescriptor| {
        let (sampler, _) = ctx.global.device_create_sampler(ctx.device, desc);
        sampler
    };
    let linear = wgc::resource::SamplerDescriptor {
        mag_filter: wgt::FilterMode::Linear,
        min_filter: wgt::FilterMode::Linear,
        mipmap_filter: wgt::FilterMode::Linear,
        anisotropy_clamp: 16,
        ..Default::default()
    };

    valid(&ctx, || create(&linear));
    fail(
        &ctx,
        || {
            create(&wgc::resource::SamplerDescriptor {
                mipmap_filter: wgt::FilterMode::Nearest,
                ..linear.clone()
            })
        },
        Some("`mipmap_filter` is Nearest, but an anisotropy clamp of 16"),
    );
    fail(
        &ctx,
        || {
            create(&wgc::resource::SamplerDescriptor {
                anisotropy_clamp: 0,
                ..linear.clone()
            })
        },
        Some("Invalid anisotropic clamp: 0"),
    );
}
