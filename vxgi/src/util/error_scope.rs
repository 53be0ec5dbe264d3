//! Device error scopes used to detect GPU failures.
//!
//! Allocation scopes guard resource creation: an out-of-memory error there
//! is fatal to pipeline construction. Validation scopes guard a sweep's
//! command recording: errors are logged and the sweep continues, as a
//! half-recorded sweep cannot be rolled back.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use wgpu::Device;

fn poll_scope(device: &Device) -> Result<(), wgpu::Error> {
    let mut future = device.pop_error_scope();
    let pin = Pin::new(&mut future);
    match pin.poll(&mut Context::from_waker(&noop_waker::noop_waker())) {
        // We got an error, so return an error.
        Poll::Ready(Some(error)) => Err(error),
        // We got no error, so return nothing.
        Poll::Ready(None) => Ok(()),
        // We're on webgpu, pretend everything always works.
        Poll::Pending => Ok(()),
    }
}

#[must_use = "All error scopes must end in a call to `end`"]
pub struct AllocationErrorScope<'a> {
    device: &'a Device,
}

impl<'a> AllocationErrorScope<'a> {
    pub fn new(device: &'a Device) -> Self {
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        Self { device }
    }

    pub fn end(self) -> Result<(), wgpu::Error> {
        let result = poll_scope(self.device);
        std::mem::forget(self);
        result
    }
}

impl<'a> Drop for AllocationErrorScope<'a> {
    fn drop(&mut self) {
        log::error!("AllocationErrorScope dropped without calling `end`");
    }
}

/// Scope over a sweep's command recording. Validation errors are logged,
/// never recovered; a corrupted sweep is corrected by the next scheduled
/// voxelization, not by re-running this one.
pub struct ValidationErrorScope<'a> {
    device: &'a Device,
    label: &'static str,
}

impl<'a> ValidationErrorScope<'a> {
    pub fn new(device: &'a Device, label: &'static str) -> Self {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        Self { device, label }
    }

    pub fn end(self) {
        if let Err(error) = poll_scope(self.device) {
            log::error!("GPU validation error during {}: {}", self.label, error);
        }
        std::mem::forget(self);
    }
}

impl<'a> Drop for ValidationErrorScope<'a> {
    fn drop(&mut self) {
        log::error!("ValidationErrorScope dropped without calling `end`");
    }
}
