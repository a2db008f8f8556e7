use wgc::command::{CommandEncoderError, ComputePassDescriptor};
use wgt::BufferUsages as Bu;
use wgv_test::{fail, valid, TestParameters, TestingContext};

#[test]
fn finish_twice() {
    let ctx = TestingContext::new(TestParameters::default());
    let encoder = ctx.create_encoder();

    valid(&ctx, || ctx.finish(encoder));
    fail(
        &ctx,
        || ctx.finish(encoder),
        Some("Command encoder must be active"),
    );
}

#[test]
fn recording_after_finish_is_reported_immediately() {
    let ctx = TestingContext::new(TestParameters::default());
    let src = ctx.create_buffer(16, Bu::COPY_SRC);
    let dst = ctx.create_buffer(16, Bu::COPY_DST);
    let encoder = ctx.create_encoder();
    valid(&ctx, || ctx.finish(encoder));

    let result = fail(
        &ctx,
        || {
            ctx.global
                .command_encoder_copy_buffer_to_buffer(encoder, src, 0, dst, 0, 16)
        },
        Some("Command encoder must be active"),
    );
    assert!(matches!(result, Err(CommandEncoderError::NotRecording)));

    fail(
        &ctx,
        || ctx.global.command_encoder_push_debug_group(encoder, "late"),
        Some("Command encoder must be active"),
    );
}

#[test]
fn begin_pass_on_finished_encoder() {
    let ctx = TestingContext::new(TestParameters::default());
    let encoder = ctx.create_encoder();
    valid(&ctx, || ctx.finish(encoder));

    let (pass, error) = fail(
        &ctx,
        || {
            ctx.global
                .command_encoder_begin_compute_pass(encoder, &ComputePassDescriptor { label: None })
        },
        Some("Command encoder must be active"),
    );
    assert!(matches!(error, Some(CommandEncoderError::NotRecording)));

    // Ending the invalid pass hands back the error it was born with.
    let ended = valid(&ctx, || ctx.global.compute_pass_end(pass));
    assert!(ended.is_err());
}

#[test]
fn open_pass_locks_the_encoder() {
    let ctx = TestingContext::new(TestParameters::default());
    let src = ctx.create_buffer(16, Bu::COPY_SRC);
    let dst = ctx.create_buffer(16, Bu::COPY_DST);
    let encoder = ctx.create_encoder();

    let pass = valid(&ctx, || {
        let (pass, error) = ctx
            .global
            .command_encoder_begin_compute_pass(encoder, &ComputePassDescriptor { label: None });
        assert!(error.is_none());
        pass
    });

    // Recording into a locked encoder fails silently and poisons the encoder.
    let result = valid(&ctx, || {
        ctx.global
            .command_encoder_copy_buffer_to_buffer(encoder, src, 0, dst, 0, 16)
    });
    assert!(matches!(result, Err(CommandEncoderError::Locked)));

    valid(&ctx, || ctx.global.compute_pass_end(pass).unwrap());
    fail(&ctx, || ctx.finish(encoder), Some("Command encoder is locked"));
}

#[test]
fn finish_with_open_pass() {
    let ctx = TestingContext::new(TestParameters::default());
    let encoder = ctx.create_encoder();

    let (_pass, _) = ctx
        .global
        .command_encoder_begin_compute_pass(encoder, &ComputePassDescriptor { label: None });
    fail(&ctx, || ctx.finish(encoder), Some("Command encoder is locked"));
}

#[test]
fn second_pass_while_locked() {
    let ctx = TestingContext::new(TestParameters::default());
    let encoder = ctx.create_encoder();

    let (first, _) = ctx
        .global
        .command_encoder_begin_compute_pass(encoder, &ComputePassDescriptor { label: None });
    let (second, error) = valid(&ctx, || {
        ctx.global
            .command_encoder_begin_compute_pass(encoder, &ComputePassDescriptor { label: None })
    });
    assert!(matches!(error, Some(CommandEncoderError::Locked)));

    let _ = ctx.global.compute_pass_end(second);
    let _ = ctx.global.compute_pass_end(first);
    fail(&ctx, || ctx.finish(encoder), Some("Command encoder is locked"));
}

#[test]
fn submit_validates_command_buffer_state() {
    let ctx = TestingContext::new(TestParameters::default());

    let command_buffer = ctx.finish(ctx.create_encoder());
    valid(&ctx, || {
        ctx.global.queue_submit(ctx.queue, &[command_buffer]).unwrap()
    });
    fail(
        &ctx,
        || ctx.global.queue_submit(ctx.queue, &[command_buffer]),
        Some("was already submitted"),
    );

    // The same command buffer twice in one submission.
    let command_buffer = ctx.finish(ctx.create_encoder());
    fail(
        &ctx,
        || {
            ctx.global
                .queue_submit(ctx.queue, &[command_buffer, command_buffer])
        },
        Some("was already submitted"),
    );
    // The failed submission submitted nothing.
    valid(&ctx, || {
        ctx.global.queue_submit(ctx.queue, &[command_buffer]).unwrap()
    });

    let unfinished = ctx.create_encoder();
    fail(
        &ctx,
        || {
            ctx.global
                .queue_submit(ctx.queue, &[unfinished.into_command_buffer_id()])
        },
        Some("is not finished"),
    );

    let invalid = ctx.create_encoder();
    let _ = ctx.global.command_encoder_pop_debug_group(invalid);
    let invalid = fail(&ctx, || ctx.finish(invalid), Some("Cannot pop debug group"));
    fail(
        &ctx,
        || ctx.global.queue_submit(ctx.queue, &[invalid]),
        Some("is invalid"),
    );
}

#[test]
fn submit_requires_resources_alive_and_unmapped() {
    let ctx = TestingContext::new(TestParameters::default());
    let src = ctx.create_buffer(16, Bu::COPY_SRC);
    let dst = ctx.create_buffer(16, Bu::COPY_DST);

    let copy = || {
        let encoder = ctx.create_encoder();
        ctx.global
            .command_encoder_copy_buffer_to_buffer(encoder, src, 0, dst, 0, 16)
            .unwrap();
        ctx.finish(encoder)
    };

    let command_buffer = valid(&ctx, copy);
    valid(&ctx, || {
        ctx.global.queue_submit(ctx.queue, &[command_buffer]).unwrap()
    });

    // Destroyed between recording and submission.
    let command_buffer = valid(&ctx, copy);
    ctx.global.buffer_destroy(dst);
    fail(
        &ctx,
        || ctx.global.queue_submit(ctx.queue, &[command_buffer]),
        Some("has been destroyed"),
    );
}
