use wgt::BufferUsages as Bu;
use wgv_test::{fail, valid, TestParameters, TestingContext};

#[test]
fn mapped_at_creation_requires_aligned_size() {
    let ctx = TestingContext::new(TestParameters::default());

    for (size, should_fail) in [(16, false), (0, false), (6, true)] {
        let (_, error) = ctx.global.device_create_buffer(
            ctx.device,
            &wgt::BufferDescriptor {
                label: None,
                size,
                usage: Bu::COPY_SRC,
                mapped_at_creation: true,
            },
        );
        assert_eq!(error.is_some(), should_fail, "size {size}");
    }
}

#[test]
fn buffer_size_limit() {
    let ctx = TestingContext::new(TestParameters::default());
    let max = ctx.device_limits.max_buffer_size;

    valid(&ctx, || ctx.create_buffer(max, Bu::COPY_DST));
    fail(
        &ctx,
        || ctx.create_buffer(max + 1, Bu::COPY_DST),
        Some("maximum buffer size"),
    );
}

#[test]
fn error_buffer_is_usable_in_calls() {
    let ctx = TestingContext::new(TestParameters::default());

    let bad = fail(&ctx, || ctx.create_buffer(16, Bu::empty()), None);
    let good = ctx.create_buffer(16, Bu::COPY_DST);

    // Using the error object invalidates the command buffer, not the device.
    let encoder = ctx.create_encoder();
    let _ = ctx
        .global
        .command_encoder_copy_buffer_to_buffer(encoder, bad, 0, good, 0, 16);
    fail(&ctx, || ctx.finish(encoder), Some("is invalid"));

    assert!(ctx.global.device_is_valid(ctx.device));
    valid(&ctx, || ctx.create_buffer(16, Bu::COPY_DST));

    // Destroying and dropping an error buffer never errors.
    valid(&ctx, || {
        ctx.global.buffer_destroy(bad);
        ctx.global.buffer_drop(bad);
    });
}

#[test]
fn copy_buffer_to_buffer() {
    let ctx = TestingContext::new(TestParameters::default());
    let src = ctx.create_buffer(256, Bu::COPY_SRC);
    let dst = ctx.create_buffer(256, Bu::COPY_DST);
    let both = ctx.create_buffer(256, Bu::COPY_SRC | Bu::COPY_DST);

    let copy = |src, src_offset, dst, dst_offset, size| {
        let encoder = ctx.create_encoder();
        let _ = ctx.global.command_encoder_copy_buffer_to_buffer(
            encoder, src, src_offset, dst, dst_offset, size,
        );
        ctx.finish(encoder)
    };

    valid(&ctx, || copy(src, 0, dst, 0, 256));
    valid(&ctx, || copy(src, 128, dst, 64, 128));
    valid(&ctx, || copy(both, 0, both, 128, 128));
    valid(&ctx, || copy(src, 256, dst, 0, 0));

    fail(&ctx, || copy(dst, 0, src, 0, 4), Some("COPY_SRC"));
    fail(&ctx, || copy(src, 0, dst, 0, 6), Some("COPY_BUFFER_ALIGNMENT"));
    fail(&ctx, || copy(src, 2, dst, 0, 4), Some("not aligned"));
    fail(&ctx, || copy(src, 0, dst, 4, 256), Some("overrunning"));
    fail(
        &ctx,
        || copy(src, u64::MAX - 3, dst, 0, 8),
        Some("overrunning"),
    );
    fail(&ctx, || copy(both, 0, both, 64, 128), Some("overlaps"));
}

#[test]
fn clear_buffer() {
    let ctx = TestingContext::new(TestParameters::default());
    let buffer = ctx.create_buffer(64, Bu::COPY_DST);
    let no_copy = ctx.create_buffer(64, Bu::UNIFORM);

    let clear = |buffer, offset, size: Option<u64>| {
        let encoder = ctx.create_encoder();
        let _ = ctx.global.command_encoder_clear_buffer(
            encoder,
            buffer,
            offset,
            size.and_then(wgt::BufferSize::new),
        );
        ctx.finish(encoder)
    };

    valid(&ctx, || clear(buffer, 0, None));
    valid(&ctx, || clear(buffer, 16, Some(16)));
    valid(&ctx, || clear(buffer, 64, None));

    fail(&ctx, || clear(no_copy, 0, None), Some("COPY_DST"));
    fail(&ctx, || clear(buffer, 2, None), None);
    fail(&ctx, || clear(buffer, 0, Some(6)), None);
    fail(&ctx, || clear(buffer, 32, Some(64)), None);
}

#[test]
fn destroyed_buffer_fails_at_record() {
    let ctx = TestingContext::new(TestParameters::default());
    let src = ctx.create_buffer(64, Bu::COPY_SRC);
    let dst = ctx.create_buffer(64, Bu::COPY_DST);

    ctx.global.buffer_destroy(src);
    // Destroying twice is fine.
    valid(&ctx, || ctx.global.buffer_destroy(src));

    let encoder = ctx.create_encoder();
    let _ = ctx
        .global
        .command_encoder_copy_buffer_to_buffer(encoder, src, 0, dst, 0, 64);
    fail(&ctx, || ctx.finish(encoder), Some("has been destroyed"));
}

#[test]
fn destroyed_buffer_fails_at_submit() {
    let ctx = TestingContext::new(TestParameters::default());
    let src = ctx.create_buffer(64, Bu::COPY_SRC);
    let dst = ctx.create_buffer(64, Bu::COPY_DST);

    let encoder = ctx.create_encoder();
    let _ = ctx
        .global
        .command_encoder_copy_buffer_to_buffer(encoder, src, 0, dst, 0, 64);
    let command_buffer = valid(&ctx, || ctx.finish(encoder));

    ctx.global.buffer_destroy(dst);
    fail(
        &ctx,
        || ctx.global.queue_submit(ctx.queue, &[command_buffer]),
        Some("has been destroyed"),
    );
}
