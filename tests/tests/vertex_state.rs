//! Tests for draw calls against the bound vertex and index buffers.

use std::borrow::Cow;

use wgc::pipeline::VertexBufferLayout;
use wgt::BufferUsages as Bu;
use wgv_test::{fail, valid, TestParameters, TestingContext};

fn float2_layout(step_mode: wgt::VertexStepMode, shader_location: u32) -> VertexBufferLayout<'static> {
    VertexBufferLayout {
        array_stride: 8,
        step_mode,
        attributes: Cow::Owned(vec![wgt::VertexAttribute {
            format: wgt::VertexFormat::Float32x2,
            offset: 0,
            shader_location,
        }]),
    }
}

#[test]
fn draw_within_vertex_buffer() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[float2_layout(wgt::VertexStepMode::Vertex, 0)]);
    // Four vertices of eight bytes.
    let vertices = ctx.create_buffer(32, Bu::VERTEX);
    let target = ctx.create_render_target();

    let draw = |first_vertex, vertex_count, size: Option<u64>| {
        ctx.encode_render_pass(target, |global, pass| {
            global.render_pass_set_pipeline(pass, pipeline).unwrap();
            global
                .render_pass_set_vertex_buffer(
                    pass,
                    0,
                    Some(vertices),
                    0,
                    size.and_then(wgt::BufferSize::new),
                )
                .unwrap();
            global
                .render_pass_draw(pass, vertex_count, 1, first_vertex, 0)
                .unwrap();
        })
    };

    valid(&ctx, || draw(0, 4, None));
    valid(&ctx, || draw(3, 1, None));
    fail(
        &ctx,
        || draw(0, 5, None),
        Some("Vertex 5 extends beyond limit 4 imposed by the buffer in slot 0"),
    );
    fail(&ctx, || draw(4, 1, None), Some("extends beyond limit"));
    // A bound range limits the draw even when the buffer is larger.
    fail(&ctx, || draw(0, 3, Some(16)), Some("Vertex 3 extends beyond limit 2"));
    // Far beyond the limit without wrapping.
    fail(&ctx, || draw(u32::MAX, u32::MAX, None), Some("extends beyond limit"));
}

#[test]
fn draw_within_instance_buffer() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[
        float2_layout(wgt::VertexStepMode::Vertex, 0),
        float2_layout(wgt::VertexStepMode::Instance, 1),
    ]);
    let vertices = ctx.create_buffer(64, Bu::VERTEX);
    let instances = ctx.create_buffer(16, Bu::VERTEX);
    let target = ctx.create_render_target();

    let draw = |instance_count| {
        ctx.encode_render_pass(target, |global, pass| {
            global.render_pass_set_pipeline(pass, pipeline).unwrap();
            global
                .render_pass_set_vertex_buffer(pass, 0, Some(vertices), 0, None)
                .unwrap();
            global
                .render_pass_set_vertex_buffer(pass, 1, Some(instances), 0, None)
                .unwrap();
            global.render_pass_draw(pass, 8, instance_count, 0, 0).unwrap();
        })
    };

    valid(&ctx, || draw(2));
    fail(
        &ctx,
        || draw(3),
        Some("Instance 3 extends beyond limit 2 imposed by the buffer in slot 1"),
    );
}

#[test]
fn every_pipeline_slot_needs_a_buffer() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[float2_layout(wgt::VertexStepMode::Vertex, 0)]);
    let vertices = ctx.create_buffer(32, Bu::VERTEX);
    let target = ctx.create_render_target();

    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global.render_pass_set_pipeline(pass, pipeline).unwrap();
                global.render_pass_draw(pass, 3, 1, 0, 0).unwrap();
            })
        },
        Some("requires a buffer in slot 0"),
    );

    // Unsetting the slot takes the buffer away again.
    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global.render_pass_set_pipeline(pass, pipeline).unwrap();
                global
                    .render_pass_set_vertex_buffer(pass, 0, Some(vertices), 0, None)
                    .unwrap();
                global
                    .render_pass_set_vertex_buffer(pass, 0, None, 0, None)
                    .unwrap();
                global.render_pass_draw(pass, 3, 1, 0, 0).unwrap();
            })
        },
        Some("requires a buffer in slot 0"),
    );
}

#[test]
fn vertex_buffer_binding_validation() {
    let ctx = TestingContext::new(TestParameters::default());
    let vertices = ctx.create_buffer(32, Bu::VERTEX);
    let not_vertex = ctx.create_buffer(32, Bu::INDEX);
    let target = ctx.create_render_target();

    let set = |buffer, offset, size: Option<u64>| {
        ctx.encode_render_pass(target, |global, pass| {
            global
                .render_pass_set_vertex_buffer(
                    pass,
                    0,
                    Some(buffer),
                    offset,
                    size.and_then(wgt::BufferSize::new),
                )
                .unwrap();
        })
    };

    valid(&ctx, || set(vertices, 8, Some(8)));
    fail(&ctx, || set(not_vertex, 0, None), Some("VERTEX"));
    fail(&ctx, || set(vertices, 2, None), Some("must be a multiple of 4"));
    fail(&ctx, || set(vertices, 16, Some(32)), Some("overruns"));

    let slots = ctx.device_limits.max_vertex_buffers;
    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global
                    .render_pass_set_vertex_buffer(pass, slots, Some(vertices), 0, None)
                    .unwrap();
            })
        },
        Some("max_vertex_buffers"),
    );
}

#[test]
fn indexed_draws() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[]);
    // Four 32-bit indices.
    let indices = ctx.create_buffer(16, Bu::INDEX);
    let target = ctx.create_render_target();

    let draw_indexed = |set_index: bool, first_index, index_count| {
        ctx.encode_render_pass(target, |global, pass| {
            global.render_pass_set_pipeline(pass, pipeline).unwrap();
            if set_index {
                global
                    .render_pass_set_index_buffer(pass, indices, wgt::IndexFormat::Uint32, 0, None)
                    .unwrap();
            }
            global
                .render_pass_draw_indexed(pass, index_count, 1, first_index, 0, 0)
                .unwrap();
        })
    };

    valid(&ctx, || draw_indexed(true, 0, 4));
    valid(&ctx, || draw_indexed(true, 2, 2));
    fail(
        &ctx,
        || draw_indexed(true, 1, 4),
        Some("Index 5 extends beyond limit 4"),
    );
    fail(&ctx, || draw_indexed(false, 0, 3), Some("Index buffer must be set"));
}

#[test]
fn draws_require_pipeline() {
    let ctx = TestingContext::new(TestParameters::default());
    let target = ctx.create_render_target();

    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global.render_pass_draw(pass, 3, 1, 0, 0).unwrap();
            })
        },
        Some("Render pipeline must be set"),
    );
}

#[test]
fn pipeline_must_match_the_attachments() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[]);
    let texture = ctx.create_texture(
        wgt::TextureFormat::Bgra8Unorm,
        wgt::TextureUsages::RENDER_ATTACHMENT,
        4,
        4,
    );
    let other_format = ctx.create_view(texture);

    fail(
        &ctx,
        || {
            ctx.encode_render_pass(other_format, |global, pass| {
                global.render_pass_set_pipeline(pass, pipeline).unwrap();
            })
        },
        None,
    );
}
