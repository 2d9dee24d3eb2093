// gpu/scope.rs — Turn wgpu allocation errors into `Result`s.
//
// wgpu reports resource-creation failures asynchronously through the
// uncaptured-error handler unless an error scope is open. Wrapping each
// allocation in an OutOfMemory + Validation scope pair lets construction
// fail with `ResourceCreation` instead of panicking in the default handler.

use crate::error::{AggregatorError, Result};

/// Run `create` inside OutOfMemory and Validation error scopes.
///
/// Scopes are popped in reverse push order. The first error found wins.
pub(crate) fn capture_creation<T>(
    device: &wgpu::Device,
    what: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    match validation.or(out_of_memory) {
        Some(source) => {
            log::error!("failed to create {what}: {source}");
            Err(AggregatorError::ResourceCreation { what, source })
        }
        None => Ok(value),
    }
}
