//! Test utilities for the wgv repository.

mod params;
mod run;

pub use params::TestParameters;
pub use run::{color_attachment, compute_entry_point, TestingContext};

/// Run some code in an error scope and assert that validation fails.
///
/// If `message` is given, the error description must contain it.
pub fn fail<T>(ctx: &TestingContext, callback: impl FnOnce() -> T, message: Option<&str>) -> T {
    ctx.global
        .device_push_error_scope(ctx.device, wgt::ErrorFilter::Validation);
    let result = callback();
    let error = ctx
        .global
        .device_pop_error_scope(ctx.device)
        .expect("error scope stack is unbalanced");

    let Some(error) = error else {
        panic!("expected a validation error");
    };
    if let Some(message) = message {
        let description = error.description();
        assert!(
            description.contains(message),
            "expected {message:?} in the error:\n{description}"
        );
    }

    result
}

/// Run some code in an error scope and assert that validation succeeds.
pub fn valid<T>(ctx: &TestingContext, callback: impl FnOnce() -> T) -> T {
    ctx.global
        .device_push_error_scope(ctx.device, wgt::ErrorFilter::Validation);
    let result = callback();
    let error = ctx
        .global
        .device_pop_error_scope(ctx.device)
        .expect("error scope stack is unbalanced");
    if let Some(error) = error {
        panic!("unexpected validation error:\n{}", error.description());
    }

    result
}

/// Run some code in an error scope and assert that validation succeeds or fails depending on the
/// provided `should_fail` boolean.
pub fn fail_if<T>(
    ctx: &TestingContext,
    should_fail: bool,
    callback: impl FnOnce() -> T,
    message: Option<&str>,
) -> T {
    if should_fail {
        fail(ctx, callback, message)
    } else {
        valid(ctx, callback)
    }
}
