use wgt::BufferUsages as Bu;
use wgv_test::{fail, valid, TestParameters, TestingContext};

#[test]
fn dispatch_indirect_range() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_compute_pipeline(Vec::new());
    // Exactly one set of dispatch arguments.
    let args = ctx.create_buffer(12, Bu::INDIRECT);

    let dispatch = |buffer, offset| {
        ctx.encode_compute_pass(|global, pass| {
            global.compute_pass_set_pipeline(pass, pipeline).unwrap();
            global
                .compute_pass_dispatch_workgroups_indirect(pass, buffer, offset)
                .unwrap();
        })
    };

    valid(&ctx, || dispatch(args, 0));
    fail(&ctx, || dispatch(args, 4), Some("overruns indirect buffer"));
    // The end offset would wrap around.
    fail(
        &ctx,
        || dispatch(args, u64::MAX - 3),
        Some("overruns indirect buffer"),
    );
    fail(&ctx, || dispatch(args, 2), Some("is not a multiple of 4"));

    let not_indirect = ctx.create_buffer(12, Bu::STORAGE);
    fail(&ctx, || dispatch(not_indirect, 0), Some("INDIRECT"));
}

#[test]
fn dispatch_indirect_requires_pipeline() {
    let ctx = TestingContext::new(TestParameters::default());
    let args = ctx.create_buffer(12, Bu::INDIRECT);

    fail(
        &ctx,
        || {
            ctx.encode_compute_pass(|global, pass| {
                global
                    .compute_pass_dispatch_workgroups_indirect(pass, args, 0)
                    .unwrap();
            })
        },
        Some("Compute pipeline must be set"),
    );
}

#[test]
fn dispatch_group_size_limit() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_compute_pipeline(Vec::new());
    let limit = ctx.device_limits.max_compute_workgroups_per_dimension;

    let dispatch = |x| {
        ctx.encode_compute_pass(|global, pass| {
            global.compute_pass_set_pipeline(pass, pipeline).unwrap();
            global.compute_pass_dispatch_workgroups(pass, x, 1, 1).unwrap();
        })
    };

    valid(&ctx, || dispatch(limit));
    fail(&ctx, || dispatch(limit + 1), Some("must be less or equal to"));
}

#[test]
fn draw_indirect_range() {
    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[]);
    let indices = ctx.create_buffer(16, Bu::INDEX);
    // One set of non-indexed arguments, or 16 of the 20 bytes of an indexed set.
    let args = ctx.create_buffer(16, Bu::INDIRECT);
    let target = ctx.create_render_target();

    let draw = |offset, indexed| {
        ctx.encode_render_pass(target, |global, pass| {
            global.render_pass_set_pipeline(pass, pipeline).unwrap();
            global
                .render_pass_set_index_buffer(pass, indices, wgt::IndexFormat::Uint32, 0, None)
                .unwrap();
            if indexed {
                global
                    .render_pass_draw_indexed_indirect(pass, args, offset)
                    .unwrap();
            } else {
                global.render_pass_draw_indirect(pass, args, offset).unwrap();
            }
        })
    };

    valid(&ctx, || draw(0, false));
    fail(&ctx, || draw(4, false), Some("overruns indirect buffer"));
    fail(&ctx, || draw(0, true), Some("overruns indirect buffer"));
    fail(&ctx, || draw(u64::MAX - 3, false), Some("overruns indirect buffer"));
    fail(&ctx, || draw(1, false), Some("is not a multiple of 4"));
}

#[test]
fn multi_draw_indirect_requires_feature() {
    let multi_draw = |ctx: &TestingContext| {
        let pipeline = ctx.create_render_pipeline(&[]);
        let args = ctx.create_buffer(64, Bu::INDIRECT);
        let target = ctx.create_render_target();
        ctx.encode_render_pass(target, |global, pass| {
            global.render_pass_set_pipeline(pass, pipeline).unwrap();
            global
                .render_pass_multi_draw_indirect(pass, args, 0, 4)
                .unwrap();
        })
    };

    let ctx = TestingContext::new(TestParameters::default());
    fail(&ctx, || multi_draw(&ctx), Some("MULTI_DRAW_INDIRECT"));

    let ctx = TestingContext::new(
        TestParameters::default().features(wgt::Features::MULTI_DRAW_INDIRECT),
    );
    valid(&ctx, || multi_draw(&ctx));
}

#[test]
fn multi_draw_indirect_count() {
    let ctx = TestingContext::new(
        TestParameters::default().features(wgt::Features::MULTI_DRAW_INDIRECT_COUNT),
    );
    let pipeline = ctx.create_render_pipeline(&[]);
    let args = ctx.create_buffer(64, Bu::INDIRECT);
    let count = ctx.create_buffer(8, Bu::INDIRECT);
    let target = ctx.create_render_target();

    let draw = |count_offset, max_count| {
        ctx.encode_render_pass(target, |global, pass| {
            global.render_pass_set_pipeline(pass, pipeline).unwrap();
            global
                .render_pass_multi_draw_indirect_count(
                    pass,
                    args,
                    0,
                    count,
                    count_offset,
                    max_count,
                    false,
                )
                .unwrap();
        })
    };

    valid(&ctx, || draw(0, 4));
    valid(&ctx, || draw(4, 4));
    fail(&ctx, || draw(8, 4), Some("overruns indirect buffer of size 8"));
    fail(&ctx, || draw(0, 5), Some("(using count 5)"));

    let ctx = TestingContext::new(TestParameters::default());
    let pipeline = ctx.create_render_pipeline(&[]);
    let args = ctx.create_buffer(64, Bu::INDIRECT);
    let target = ctx.create_render_target();
    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global.render_pass_set_pipeline(pass, pipeline).unwrap();
                global
                    .render_pass_multi_draw_indirect_count(pass, args, 0, args, 0, 1, false)
                    .unwrap();
            })
        },
        Some("MULTI_DRAW_INDIRECT_COUNT"),
    );
}
