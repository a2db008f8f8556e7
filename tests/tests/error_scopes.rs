use std::sync::Arc;

use parking_lot::Mutex;
use wgc::error::{Error, ErrorType, PopErrorScopeError};
use wgt::BufferUsages as Bu;
use wgv_test::{TestParameters, TestingContext};

fn invalid_buffer(ctx: &TestingContext) {
    ctx.create_buffer(16, Bu::empty());
}

#[test]
fn scope_captures_only_the_first_error() {
    let ctx = TestingContext::new(TestParameters::default());

    ctx.global
        .device_push_error_scope(ctx.device, wgt::ErrorFilter::Validation);
    invalid_buffer(&ctx);
    ctx.create_buffer(ctx.device_limits.max_buffer_size + 1, Bu::COPY_DST);
    let error = ctx.global.device_pop_error_scope(ctx.device).unwrap();

    let error = error.expect("the scope should have captured an error");
    assert_eq!(error.error_type(), ErrorType::Validation);
    let description = error.description();
    assert!(description.contains("In Device::create_buffer"), "{description}");
    assert!(!description.contains("maximum buffer size"), "{description}");
}

#[test]
fn scope_without_errors_pops_none() {
    let ctx = TestingContext::new(TestParameters::default());

    ctx.global
        .device_push_error_scope(ctx.device, wgt::ErrorFilter::Validation);
    ctx.create_buffer(16, Bu::COPY_DST);
    assert!(matches!(
        ctx.global.device_pop_error_scope(ctx.device),
        Ok(None)
    ));
}

#[test]
fn errors_go_to_the_innermost_matching_scope() {
    let ctx = TestingContext::new(TestParameters::default());
    let global = &ctx.global;

    global.device_push_error_scope(ctx.device, wgt::ErrorFilter::Validation);
    global.device_push_error_scope(ctx.device, wgt::ErrorFilter::Validation);
    global.device_push_error_scope(ctx.device, wgt::ErrorFilter::OutOfMemory);
    invalid_buffer(&ctx);

    // The out-of-memory scope is skipped.
    assert!(matches!(global.device_pop_error_scope(ctx.device), Ok(None)));
    assert!(matches!(
        global.device_pop_error_scope(ctx.device),
        Ok(Some(Error::Validation { .. }))
    ));
    assert!(matches!(global.device_pop_error_scope(ctx.device), Ok(None)));
}

#[test]
fn popping_an_empty_stack_fails() {
    let ctx = TestingContext::new(TestParameters::default());

    assert!(matches!(
        ctx.global.device_pop_error_scope(ctx.device),
        Err(PopErrorScopeError::EmptyStack)
    ));

    ctx.global
        .device_push_error_scope(ctx.device, wgt::ErrorFilter::Internal);
    assert!(ctx.global.device_pop_error_scope(ctx.device).is_ok());
    assert!(ctx.global.device_pop_error_scope(ctx.device).is_err());
}

#[test]
fn uncaptured_errors_reach_the_handler() {
    let ctx = TestingContext::new(TestParameters::default());
    let captured = Arc::new(Mutex::new(Vec::new()));

    let sink = captured.clone();
    ctx.global.device_on_uncaptured_error(
        ctx.device,
        Some(Arc::new(move |error: Error| {
            sink.lock().push(error.description())
        })),
    );

    invalid_buffer(&ctx);
    assert_eq!(captured.lock().len(), 1);

    // A matching scope takes precedence over the handler.
    ctx.global
        .device_push_error_scope(ctx.device, wgt::ErrorFilter::Validation);
    invalid_buffer(&ctx);
    assert!(ctx.global.device_pop_error_scope(ctx.device).unwrap().is_some());
    assert_eq!(captured.lock().len(), 1);

    // A scope with another filter doesn't.
    ctx.global
        .device_push_error_scope(ctx.device, wgt::ErrorFilter::OutOfMemory);
    invalid_buffer(&ctx);
    assert!(ctx.global.device_pop_error_scope(ctx.device).unwrap().is_none());
    assert_eq!(captured.lock().len(), 2);

    ctx.global.device_on_uncaptured_error(ctx.device, None);
    invalid_buffer(&ctx);
    assert_eq!(captured.lock().len(), 2);
}

#[test]
fn handler_may_reenter_the_device() {
    let ctx = Arc::new(TestingContext::new(TestParameters::default()));
    let created = Arc::new(Mutex::new(0));

    let inner = ctx.clone();
    let count = created.clone();
    ctx.global.device_on_uncaptured_error(
        ctx.device,
        Some(Arc::new(move |_| {
            inner.create_buffer(16, Bu::COPY_DST);
            *count.lock() += 1;
        })),
    );

    invalid_buffer(&ctx);
    assert_eq!(*created.lock(), 1);

    // Break the reference cycle through the handler.
    ctx.global.device_on_uncaptured_error(ctx.device, None);
}
