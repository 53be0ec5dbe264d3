//! Instance/adapter/device creation.

use std::sync::Arc;

use wgpu::{
    Adapter, AdapterInfo, Backend, Backends, Device, DeviceDescriptor, DeviceType, Features, Instance,
    InstanceDescriptor, Limits, Queue,
};

use crate::{InitializationError, LimitType};

/// Features the voxelization pipeline requires beyond the WebGPU core set.
///
/// Storage-texture writes from compute shaders are core, so nothing extra
/// is needed.
pub const REQUIRED_FEATURES: Features = Features::empty();

/// Device limits the pipeline needs. Everything else stays at the
/// downlevel defaults so the pipeline runs on as many adapters as possible.
pub fn required_limits() -> Limits {
    Limits {
        // Depth-peel capture targets are at most the volume dimension.
        max_texture_dimension_2d: 2048,
        // The voxel volumes themselves.
        max_texture_dimension_3d: 512,
        // The scatter pass writes the albedo and normal volumes in one
        // dispatch, the mip pass one volume at a time.
        max_storage_textures_per_shader_stage: 2,
        // Per-draw peel uniforms are bound at a dynamic offset.
        max_dynamic_uniform_buffers_per_pipeline_layout: 1,
        ..Limits::downlevel_defaults()
    }
}

fn check_limit(device_limit: u32, required_limit: u32, ty: LimitType) -> Result<(), InitializationError> {
    if device_limit < required_limit {
        Err(InitializationError::LowDeviceLimit {
            ty,
            device_limit: device_limit as u64,
            required_limit: required_limit as u64,
        })
    } else {
        Ok(())
    }
}

/// Check that an adapter can satisfy [`required_limits`].
pub fn check_limits(device_limits: &Limits) -> Result<(), InitializationError> {
    let required = required_limits();
    check_limit(
        device_limits.max_texture_dimension_2d,
        required.max_texture_dimension_2d,
        LimitType::MaxTextureDimension2d,
    )?;
    check_limit(
        device_limits.max_texture_dimension_3d,
        required.max_texture_dimension_3d,
        LimitType::MaxTextureDimension3d,
    )?;
    check_limit(
        device_limits.max_storage_textures_per_shader_stage,
        required.max_storage_textures_per_shader_stage,
        LimitType::MaxStorageTexturesPerShaderStage,
    )?;
    check_limit(
        device_limits.max_dynamic_uniform_buffers_per_pipeline_layout,
        required.max_dynamic_uniform_buffers_per_pipeline_layout,
        LimitType::MaxDynamicUniformBuffersPerPipelineLayout,
    )?;
    Ok(())
}

/// Container for Instance/Adapter/Device/Queue.
///
/// Create these yourself, or call [`create_iad`].
#[derive(Clone)]
pub struct InstanceAdapterDevice {
    pub instance: Arc<Instance>,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    pub info: AdapterInfo,
}

fn backend_rank(backend: Backend) -> usize {
    match backend {
        Backend::Vulkan => 0,
        Backend::Metal => 1,
        Backend::Dx12 => 2,
        Backend::Gl => 3,
        _ => 4,
    }
}

fn device_type_rank(ty: DeviceType) -> usize {
    match ty {
        DeviceType::DiscreteGpu => 0,
        DeviceType::IntegratedGpu => 1,
        DeviceType::VirtualGpu => 2,
        DeviceType::Cpu => 3,
        DeviceType::Other => 4,
    }
}

/// Creates an Instance/Adapter/Device/Queue using the given choices.
/// Tries to get the best combination available.
pub async fn create_iad(
    desired_backend: Option<Backend>,
    desired_device: Option<String>,
) -> Result<InstanceAdapterDevice, InitializationError> {
    profiling::scope!("create_iad");

    let instance = Instance::new(InstanceDescriptor {
        backends: Backends::all(),
        ..Default::default()
    });

    let mut adapters: Vec<Adapter> = instance
        .enumerate_adapters(Backends::all())
        .into_iter()
        .filter(|adapter| {
            let info = adapter.get_info();

            if let Some(desired_backend) = desired_backend {
                if info.backend != desired_backend {
                    log::debug!("Skipping unwanted backend {:?}", info.backend);
                    return false;
                }
            }

            if let Some(ref desired_device) = desired_device {
                if !info.name.to_lowercase().contains(desired_device) {
                    log::debug!("Skipping unwanted device {}", info.name);
                    return false;
                }
            }

            match check_limits(&adapter.limits()) {
                Ok(()) => {
                    log::debug!("Adapter {} ({:?}) usable", info.name, info.backend);
                    true
                }
                Err(error) => {
                    log::debug!("Adapter {} ({:?}) not usable: {}", info.name, info.backend, error);
                    false
                }
            }
        })
        .collect();

    adapters.sort_by_key(|adapter| {
        let info = adapter.get_info();
        (backend_rank(info.backend), device_type_rank(info.device_type))
    });

    let adapter = adapters.into_iter().next().ok_or(InitializationError::MissingAdapter)?;
    let info = adapter.get_info();
    log::info!("Using adapter {} on {:?}", info.name, info.backend);

    let (device, queue) = adapter
        .request_device(
            &DeviceDescriptor {
                label: Some("vxgi device"),
                required_features: REQUIRED_FEATURES,
                required_limits: required_limits(),
            },
            None,
        )
        .await
        .map_err(|_| InitializationError::RequestDeviceFailed)?;

    Ok(InstanceAdapterDevice {
        instance: Arc::new(instance),
        adapter: Arc::new(adapter),
        device: Arc::new(device),
        queue: Arc::new(queue),
        info,
    })
}
