//! Volume clear pass.
//!
//! Zeroes level 0 of both voxel volumes before a sweep. Lower mips are
//! not cleared here; the finalize step regenerates the whole chain from
//! level 0, which propagates the zeros.

use vxgi::{
    util::{
        bind_merge::{BindGroupBuilder, BindGroupLayoutBuilder},
        math::round_up_div,
    },
    InitializationError, Material, MaterialRegistry, VoxelVolume, ALBEDO_FORMAT, NORMAL_FORMAT,
};
use vxgi_types::VolumeDimensions;
use wgpu::{
    BindGroup, BindingType, CommandEncoder, ComputePassDescriptor, ComputePipeline, ComputePipelineDescriptor, Device,
    ShaderModuleDescriptor, ShaderSource, ShaderStages, StorageTextureAccess, TextureViewDimension,
};

/// Registered name of the volume-clear material.
pub const MATERIAL_NAME: &str = "volume-clear";

const WORKGROUP_SIZE: u32 = 4;

/// Register the volume-clear material: both level-0 storage views at
/// group 0.
pub fn register_material(device: &Device, registry: &mut MaterialRegistry) {
    let module = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("volume clear"),
        source: ShaderSource::Wgsl(include_str!("../shaders/volume_clear.wgsl").into()),
    });

    let bgl = BindGroupLayoutBuilder::new()
        .append(
            ShaderStages::COMPUTE,
            BindingType::StorageTexture {
                access: StorageTextureAccess::WriteOnly,
                format: ALBEDO_FORMAT,
                view_dimension: TextureViewDimension::D3,
            },
            None,
        )
        .append(
            ShaderStages::COMPUTE,
            BindingType::StorageTexture {
                access: StorageTextureAccess::WriteOnly,
                format: NORMAL_FORMAT,
                view_dimension: TextureViewDimension::D3,
            },
            None,
        )
        .build(device, Some("volume clear bgl"));

    registry.register(MATERIAL_NAME, Material::new(device, MATERIAL_NAME, module, vec![bgl]));
}

/// Compute pass clearing level 0 of both volumes in one dispatch.
pub struct VolumeClearPass {
    pipeline: ComputePipeline,
    bind_group: BindGroup,
    dimensions: VolumeDimensions,
}

impl VolumeClearPass {
    pub fn new(
        device: &Device,
        registry: &MaterialRegistry,
        volume: &VoxelVolume,
    ) -> Result<Self, InitializationError> {
        profiling::scope!("VolumeClearPass::new");

        let material = registry.get(MATERIAL_NAME)?;

        let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("volume clear pipeline"),
            layout: Some(&material.pipeline_layout),
            module: &material.module,
            entry_point: "clear",
        });

        let bind_group = BindGroupBuilder::new()
            .append_texture_view(&volume.albedo.mip_storage_views[0])
            .append_texture_view(&volume.normal.mip_storage_views[0])
            .build(device, Some("volume clear bg"), &material.bind_group_layouts[0]);

        Ok(Self {
            pipeline,
            bind_group,
            dimensions: volume.dimensions,
        })
    }

    pub fn clear(&self, encoder: &mut CommandEncoder) {
        profiling::scope!("volume clear");

        let mut cpass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some("volume clear"),
            timestamp_writes: None,
        });

        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, &self.bind_group, &[]);

        let groups = round_up_div(self.dimensions.get(), WORKGROUP_SIZE);
        cpass.dispatch_workgroups(groups, groups, groups);
    }
}
