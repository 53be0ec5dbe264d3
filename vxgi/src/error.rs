use thiserror::Error;
use wgpu::Features;

/// Enum mapping to each of a device's limits the pipeline checks.
#[derive(Debug)]
pub enum LimitType {
    MaxTextureDimension2d,
    MaxTextureDimension3d,
    MaxBindGroups,
    MaxStorageTexturesPerShaderStage,
    MaxUniformBufferBindingSize,
    MaxDynamicUniformBuffersPerPipelineLayout,
}

/// Reason why the pipeline failed to initialize.
///
/// Construction failures are fatal: no partially-built pipeline is ever
/// handed back to the caller.
#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("No supported adapter found")]
    MissingAdapter,
    #[error("The device limit of {:?} is {} but the pipeline requires at least {}", ty, device_limit, required_limit)]
    LowDeviceLimit {
        ty: LimitType,
        device_limit: u64,
        required_limit: u64,
    },
    #[error("Device is missing required features: {:?}", features)]
    MissingDeviceFeatures { features: Features },
    #[error("Requesting a device failed")]
    RequestDeviceFailed,
    #[error("Allocating the {label} render target failed")]
    TargetAllocationFailed {
        label: &'static str,
        #[source]
        source: wgpu::Error,
    },
    #[error(transparent)]
    MaterialLookup(#[from] MaterialLookupError),
}

/// Error returned when looking up a material by name.
#[derive(Error, Debug)]
#[error("No material registered under the name {name:?}")]
pub struct MaterialLookupError {
    pub name: String,
}
