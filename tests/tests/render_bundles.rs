use std::borrow::Cow;

use wgc::{
    binding_model::{
        BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
        BufferBinding, BufferBindingLayout,
    },
    command::{RenderBundleEncoder, RenderBundleEncoderDescriptor},
    global::Global,
    id,
};
use wgt::{BufferUsages as Bu, TextureFormat as Tf};
use wgv_test::{fail, valid, TestParameters, TestingContext};

fn encoder_descriptor(
    color_formats: Vec<Option<Tf>>,
    depth_stencil: Option<wgt::RenderBundleDepthStencil>,
    sample_count: u32,
) -> RenderBundleEncoderDescriptor<'static> {
    RenderBundleEncoderDescriptor {
        label: None,
        color_formats: Cow::Owned(color_formats),
        depth_stencil,
        sample_count,
    }
}

/// Records `record` into a bundle for a single `Rgba8Unorm` target and finishes it.
fn encode_bundle(
    ctx: &TestingContext,
    record: impl FnOnce(&Global, &mut RenderBundleEncoder),
) -> id::RenderBundleId {
    let (mut encoder, error) = ctx.global.device_create_render_bundle_encoder(
        ctx.device,
        &encoder_descriptor(vec![Some(Tf::Rgba8Unorm)], None, 1),
    );
    assert!(error.is_none(), "{error:?}");
    record(&ctx.global, &mut encoder);
    let (bundle, _) = ctx
        .global
        .render_bundle_encoder_finish(encoder, &Default::default());
    bundle
}

#[test]
fn bundle_encoder_descriptor() {
    let ctx = TestingContext::new(TestParameters::default());
    let create = |desc: RenderBundleEncoderDescriptor| {
        let (_, error) = ctx
            .global
            .device_create_render_bundle_encoder(ctx.device, &desc);
        error
    };

    valid(&ctx, || {
        create(encoder_descriptor(vec![None, Some(Tf::Rgba8Unorm)], None, 4))
    });
    valid(&ctx, || {
        create(encoder_descriptor(
            Vec::new(),
            Some(wgt::RenderBundleDepthStencil {
                format: Tf::Depth24Plus,
                depth_read_only: true,
                stencil_read_only: true,
            }),
            1,
        ))
    });
    fail(
        &ctx,
        || create(encoder_descriptor(vec![None], None, 1)),
        Some("needs at least one color or depth-stencil format"),
    );
    fail(
        &ctx,
        || create(encoder_descriptor(vec![Some(Tf::Depth24Plus)], None, 1)),
        Some("is not color-renderable"),
    );
    fail(
        &ctx,
        || {
            create(encoder_descriptor(
                Vec::new(),
                Some(wgt::RenderBundleDepthStencil {
                    format: Tf::Rgba8Unorm,
                    depth_read_only: false,
                    stencil_read_only: false,
                }),
                1,
            ))
        },
        Some("is not a depth-stencil format"),
    );
    fail(
        &ctx,
        || create(encoder_descriptor(vec![Some(Tf::Rgba8Unorm)], None, 3)),
        Some("Invalid number of samples 3"),
    );
}

#[test]
fn bundle_commands_are_validated_at_finish() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[]);
    let indices = ctx.create_buffer(16, Bu::INDEX);

    valid(&ctx, || {
        encode_bundle(&ctx, |global, bundle| {
            global.render_bundle_set_pipeline(bundle, pipeline).unwrap();
            global
                .render_bundle_set_index_buffer(bundle, indices, wgt::IndexFormat::Uint32, 0, None)
                .unwrap();
            global.render_bundle_push_debug_group(bundle, "draws").unwrap();
            global.render_bundle_draw(bundle, 3, 1, 0, 0).unwrap();
            global
                .render_bundle_draw_indexed(bundle, 4, 1, 0, 0, 0)
                .unwrap();
            global.render_bundle_pop_debug_group(bundle).unwrap();
        })
    });

    fail(
        &ctx,
        || {
            encode_bundle(&ctx, |global, bundle| {
                global.render_bundle_draw(bundle, 3, 1, 0, 0).unwrap();
            })
        },
        Some("Render pipeline must be set"),
    );
    fail(
        &ctx,
        || {
            encode_bundle(&ctx, |global, bundle| {
                global.render_bundle_set_pipeline(bundle, pipeline).unwrap();
                global
                    .render_bundle_set_index_buffer(
                        bundle,
                        indices,
                        wgt::IndexFormat::Uint32,
                        0,
                        None,
                    )
                    .unwrap();
                global
                    .render_bundle_draw_indexed(bundle, 5, 1, 0, 0, 0)
                    .unwrap();
            })
        },
        Some("Index 5 extends beyond limit 4"),
    );
    fail(
        &ctx,
        || {
            encode_bundle(&ctx, |global, bundle| {
                global.render_bundle_pop_debug_group(bundle).unwrap();
            })
        },
        Some("Cannot pop debug group"),
    );
    fail(
        &ctx,
        || {
            encode_bundle(&ctx, |global, bundle| {
                global.render_bundle_push_debug_group(bundle, "open").unwrap();
            })
        },
        Some("was not popped"),
    );
}

#[test]
fn bundle_indirect_draws() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[]);
    let args = ctx.create_buffer(16, Bu::INDIRECT);

    let draw = |offset| {
        encode_bundle(&ctx, |global, bundle| {
            global.render_bundle_set_pipeline(bundle, pipeline).unwrap();
            global
                .render_bundle_draw_indirect(bundle, args, offset, false)
                .unwrap();
        })
    };

    valid(&ctx, || draw(0));
    fail(&ctx, || draw(4), Some("overruns indirect buffer"));
}

#[test]
fn executing_bundles_checks_the_attachments() {
    let ctx = TestingContext::new(TestParameters::default());
    let bundle = valid(&ctx, || encode_bundle(&ctx, |_, _| {}));

    let target = ctx.create_render_target();
    valid(&ctx, || {
        ctx.encode_render_pass(target, |global, pass| {
            global.render_pass_execute_bundles(pass, &[bundle]).unwrap();
        })
    });

    let other = ctx.create_texture(Tf::Bgra8Unorm, wgt::TextureUsages::RENDER_ATTACHMENT, 4, 4);
    let other = ctx.create_view(other);
    fail(
        &ctx,
        || {
            ctx.encode_render_pass(other, |global, pass| {
                global.render_pass_execute_bundles(pass, &[bundle]).unwrap();
            })
        },
        Some("Incompatible color attachments at indices [0]"),
    );
}

#[test]
fn executing_a_bundle_resets_pass_state() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[]);
    let bundle = valid(&ctx, || encode_bundle(&ctx, |_, _| {}));
    let target = ctx.create_render_target();

    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global.render_pass_set_pipeline(pass, pipeline).unwrap();
                global.render_pass_execute_bundles(pass, &[bundle]).unwrap();
                global.render_pass_draw(pass, 3, 1, 0, 0).unwrap();
            })
        },
        Some("Render pipeline must be set"),
    );
}

#[test]
fn bundle_usages_join_the_pass_scope() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[]);
    let buffer = ctx.create_buffer(64, Bu::INDEX | Bu::STORAGE);
    let target = ctx.create_render_target();

    let bundle = valid(&ctx, || {
        encode_bundle(&ctx, |global, bundle| {
            global.render_bundle_set_pipeline(bundle, pipeline).unwrap();
            global
                .render_bundle_set_index_buffer(bundle, buffer, wgt::IndexFormat::Uint32, 0, None)
                .unwrap();
        })
    });

    let (layout, _) = ctx.global.device_create_bind_group_layout(
        ctx.device,
        &BindGroupLayoutDescriptor {
            label: None,
            entries: Cow::Owned(vec![BindGroupLayoutEntry {
                binding: 0,
                visibility: wgt::ShaderStages::FRAGMENT,
                buffer: Some(BufferBindingLayout {
                    ty: wgt::BufferBindingType::Storage { read_only: false },
                    ..Default::default()
                }),
                ..Default::default()
            }]),
        },
    );
    let (writable, _) = ctx.global.device_create_bind_group(
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

    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global.render_pass_set_bind_group(pass, 0, writable, &[]).unwrap();
                global.render_pass_execute_bundles(pass, &[bundle]).unwrap();
            })
        },
        Some("Attempted to use"),
    );
}

#[test]
fn bundles_over_destroyed_or_invalid_resources() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[]);
    let args = ctx.create_buffer(16, Bu::INDIRECT);
    let target = ctx.create_render_target();

    let bundle = valid(&ctx, || {
        encode_bundle(&ctx, |global, bundle| {
            global.render_bundle_set_pipeline(bundle, pipeline).unwrap();
            global
                .render_bundle_draw_indirect(bundle, args, 0, false)
                .unwrap();
        })
    });
    ctx.global.buffer_destroy(args);
    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global.render_pass_execute_bundles(pass, &[bundle]).unwrap();
            })
        },
        Some("has been destroyed"),
    );

    let invalid = fail(
        &ctx,
        || {
            encode_bundle(&ctx, |global, bundle| {
                global.render_bundle_draw(bundle, 3, 1, 0, 0).unwrap();
            })
        },
        None,
    );
    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                let _ = global.render_pass_execute_bundles(pass, &[invalid]);
            })
        },
        Some("is invalid"),
    );
}
