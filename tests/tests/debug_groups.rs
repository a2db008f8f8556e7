use wgv_test::{fail, valid, TestParameters, TestingContext};

#[test]
fn encoder_debug_groups() {
    let ctx = TestingContext::new(TestParameters::default());

    valid(&ctx, || {
        let encoder = ctx.create_encoder();
        let global = &ctx.global;
        global.command_encoder_push_debug_group(encoder, "outer").unwrap();
        global.command_encoder_push_debug_group(encoder, "inner").unwrap();
        global.command_encoder_insert_debug_marker(encoder, "marker").unwrap();
        global.command_encoder_pop_debug_group(encoder).unwrap();
        global.command_encoder_pop_debug_group(encoder).unwrap();
        ctx.finish(encoder)
    });

    fail(
        &ctx,
        || {
            let encoder = ctx.create_encoder();
            // The error is deferred to `finish`.
            assert!(ctx.global.command_encoder_pop_debug_group(encoder).is_err());
            ctx.finish(encoder)
        },
        Some("Cannot pop debug group, because number of pushed debug groups is zero"),
    );

    fail(
        &ctx,
        || {
            let encoder = ctx.create_encoder();
            ctx.global
                .command_encoder_push_debug_group(encoder, "open")
                .unwrap();
            ctx.finish(encoder)
        },
        Some("A debug group was not popped before the encoder was finished (1 still open)"),
    );
}

#[test]
fn compute_pass_debug_groups() {
    let ctx = TestingContext::new(TestParameters::default());

    valid(&ctx, || {
        ctx.encode_compute_pass(|global, pass| {
            global.compute_pass_push_debug_group(pass, "group").unwrap();
            global.compute_pass_insert_debug_marker(pass, "marker").unwrap();
            global.compute_pass_pop_debug_group(pass).unwrap();
        })
    });

    fail(
        &ctx,
        || {
            ctx.encode_compute_pass(|global, pass| {
                global.compute_pass_pop_debug_group(pass).unwrap();
            })
        },
        Some("Cannot pop debug group"),
    );

    fail(
        &ctx,
        || {
            ctx.encode_compute_pass(|global, pass| {
                global.compute_pass_push_debug_group(pass, "a").unwrap();
                global.compute_pass_push_debug_group(pass, "b").unwrap();
            })
        },
        Some("(2 still open)"),
    );
}

#[test]
fn render_pass_debug_groups() {
    let ctx = TestingContext::new(TestParameters::default());
    let target = ctx.create_render_target();

    valid(&ctx, || {
        ctx.encode_render_pass(target, |global, pass| {
            global.render_pass_push_debug_group(pass, "group").unwrap();
            global.render_pass_insert_debug_marker(pass, "marker").unwrap();
            global.render_pass_pop_debug_group(pass).unwrap();
        })
    });

    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global.render_pass_pop_debug_group(pass).unwrap();
            })
        },
        Some("Cannot pop debug group"),
    );

    fail(
        &ctx,
        || {
            ctx.encode_render_pass(target, |global, pass| {
                global.render_pass_push_debug_group(pass, "open").unwrap();
            })
        },
        Some("was not popped"),
    );
}

#[test]
fn pass_groups_do_not_balance_encoder_groups() {
    let ctx = TestingContext::new(TestParameters::default());

    // A group pushed on the encoder can't be popped from inside a pass.
    fail(
        &ctx,
        || {
            let encoder = ctx.create_encoder();
            ctx.global
                .command_encoder_push_debug_group(encoder, "outer")
                .unwrap();
            let (mut pass, _) = ctx
                .global
                .command_encoder_begin_compute_pass(encoder, &Default::default());
            ctx.global.compute_pass_pop_debug_group(&mut pass).unwrap();
            let _ = ctx.global.compute_pass_end(pass);
            ctx.finish(encoder)
        },
        Some("Cannot pop debug group"),
    );
}
