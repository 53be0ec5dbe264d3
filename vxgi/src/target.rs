//! Strongly-typed render targets.
//!
//! 2D capture targets and 3D volume targets are distinct types; nothing in
//! the pipeline ever downcasts between texture kinds. All creation runs
//! inside an out-of-memory error scope and failure aborts pipeline
//! construction.

use wgpu::{
    Device, Sampler, SamplerDescriptor, Texture, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
    TextureView, TextureViewDescriptor, TextureViewDimension,
};

use vxgi_types::{TargetProperties, VolumeDimensions};

use crate::{util::error_scope::AllocationErrorScope, InitializationError};

/// Format of the captured and scattered albedo data.
pub const ALBEDO_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
/// Format of the captured and scattered world-normal data.
pub const NORMAL_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
/// Format of the peel depth attachments.
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// A 2D color target that can be rendered to and sampled.
pub struct Target2d {
    pub texture: Texture,
    pub view: TextureView,
    pub format: TextureFormat,
}

impl Target2d {
    fn create(
        device: &Device,
        label: &'static str,
        dimensions: VolumeDimensions,
        format: TextureFormat,
    ) -> Result<Self, InitializationError> {
        let scope = AllocationErrorScope::new(device);
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: dimensions.layer_extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        scope
            .end()
            .map_err(|source| InitializationError::TargetAllocationFailed { label, source })?;

        let view = texture.create_view(&TextureViewDescriptor::default());

        Ok(Self { texture, view, format })
    }
}

/// A 2D depth target that can be rendered to and sampled.
pub struct DepthTarget2d {
    pub texture: Texture,
    pub view: TextureView,
}

impl DepthTarget2d {
    fn create(
        device: &Device,
        label: &'static str,
        dimensions: VolumeDimensions,
    ) -> Result<Self, InitializationError> {
        let scope = AllocationErrorScope::new(device);
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: dimensions.layer_extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        scope
            .end()
            .map_err(|source| InitializationError::TargetAllocationFailed { label, source })?;

        let view = texture.create_view(&TextureViewDescriptor::default());

        Ok(Self { texture, view })
    }
}

/// One layer of the depth-peeling chain: a depth attachment plus albedo and
/// world-normal color attachments.
///
/// All four layers are created once at pipeline construction and reused
/// every sweep; their contents are overwritten, never reallocated.
pub struct PeelLayer {
    pub depth: DepthTarget2d,
    pub albedo: Target2d,
    pub normal: Target2d,
}

impl PeelLayer {
    pub fn new(device: &Device, dimensions: VolumeDimensions, index: usize) -> Result<Self, InitializationError> {
        profiling::scope!("PeelLayer::new");

        // The labels are static per layer index so allocation failures name
        // the exact target.
        const DEPTH_LABELS: [&str; 4] = ["peel depth 0", "peel depth 1", "peel depth 2", "peel depth 3"];
        const ALBEDO_LABELS: [&str; 4] = ["peel albedo 0", "peel albedo 1", "peel albedo 2", "peel albedo 3"];
        const NORMAL_LABELS: [&str; 4] = ["peel normal 0", "peel normal 1", "peel normal 2", "peel normal 3"];

        Ok(Self {
            depth: DepthTarget2d::create(device, DEPTH_LABELS[index], dimensions)?,
            albedo: Target2d::create(device, ALBEDO_LABELS[index], dimensions, ALBEDO_FORMAT)?,
            normal: Target2d::create(device, NORMAL_LABELS[index], dimensions, NORMAL_FORMAT)?,
        })
    }
}

/// A 3D texture with a full mip chain, writable as a storage texture and
/// sampled by the downstream cone tracer.
pub struct VolumeTexture {
    pub texture: Texture,
    /// View over the whole mip chain, for sampling.
    pub sampled_view: TextureView,
    /// One storage view per mip level, for the scatter, clear, and
    /// downsample passes.
    pub mip_storage_views: Vec<TextureView>,
    pub format: TextureFormat,
    pub dimensions: VolumeDimensions,
}

impl VolumeTexture {
    pub fn new(
        device: &Device,
        label: &'static str,
        dimensions: VolumeDimensions,
        format: TextureFormat,
    ) -> Result<Self, InitializationError> {
        profiling::scope!("VolumeTexture::new");

        let scope = AllocationErrorScope::new(device);
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: dimensions.extent3d(),
            mip_level_count: dimensions.mip_count(),
            sample_count: 1,
            dimension: TextureDimension::D3,
            format,
            usage: TextureUsages::STORAGE_BINDING | TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        scope
            .end()
            .map_err(|source| InitializationError::TargetAllocationFailed { label, source })?;

        let sampled_view = texture.create_view(&TextureViewDescriptor {
            label: Some(label),
            dimension: Some(TextureViewDimension::D3),
            ..Default::default()
        });

        let mip_storage_views = (0..dimensions.mip_count())
            .map(|level| {
                texture.create_view(&TextureViewDescriptor {
                    label: Some(label),
                    dimension: Some(TextureViewDimension::D3),
                    base_mip_level: level,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        Ok(Self {
            texture,
            sampled_view,
            mip_storage_views,
            format,
            dimensions,
        })
    }
}

/// The two volumes produced by voxelization.
///
/// Owned by the pipeline, written only by the scatter and mip passes, and
/// exposed read-only to the cone-tracing consumer through the sampled
/// views and `sampler`.
pub struct VoxelVolume {
    pub albedo: VolumeTexture,
    pub normal: VolumeTexture,
    pub sampler: Sampler,
    pub dimensions: VolumeDimensions,
}

impl VoxelVolume {
    pub fn new(
        device: &Device,
        dimensions: VolumeDimensions,
        properties: TargetProperties,
    ) -> Result<Self, InitializationError> {
        profiling::scope!("VoxelVolume::new");

        let albedo = VolumeTexture::new(device, "voxel albedo volume", dimensions, ALBEDO_FORMAT)?;
        let normal = VolumeTexture::new(device, "voxel normal volume", dimensions, NORMAL_FORMAT)?;

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("voxel volume sampler"),
            address_mode_u: properties.address_mode,
            address_mode_v: properties.address_mode,
            address_mode_w: properties.address_mode,
            mag_filter: properties.mag_filter,
            min_filter: properties.min_filter,
            mipmap_filter: properties.min_filter,
            ..Default::default()
        });

        Ok(Self {
            albedo,
            normal,
            sampler,
            dimensions,
        })
    }
}
