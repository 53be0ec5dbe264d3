//! Scatter pass.
//!
//! Takes a captured peel layer and scatter-writes it into the voxel
//! volumes: one compute invocation per layer texel reconstructs the
//! world-space position behind the texel from the stored depth and the
//! sweep camera's inverse view-projection, maps it to a grid cell, and
//! stores the captured albedo and normal there. Overlapping writes are
//! last-write-wins, so the axis/layer dispatch order decides conflicts.
//! Invocation order within one dispatch is unspecified, so two texels of
//! the same layer hitting one cell resolve to an arbitrary one of them.

use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use vxgi::{
    util::{
        bind_merge::{BindGroupBuilder, BindGroupLayoutBuilder},
        math::round_up_div,
    },
    InitializationError, Material, MaterialRegistry, OrthographicCamera, PeelLayer, SweepAxis, VoxelVolume,
    ALBEDO_FORMAT, NORMAL_FORMAT,
};
use vxgi_types::VolumeDimensions;
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    BindGroup, BindingType, BufferBindingType, BufferUsages, CommandEncoder, ComputePassDescriptor, ComputePipeline,
    ComputePipelineDescriptor, Device, ShaderModuleDescriptor, ShaderSource, ShaderStages, StorageTextureAccess,
    TextureSampleType, TextureViewDimension,
};

use crate::peel::PEEL_LAYER_COUNT;

/// Registered name of the voxelization scatter material.
pub const MATERIAL_NAME: &str = "voxelization";

const WORKGROUP_SIZE: u32 = 8;

/// Per-axis uniforms for the scatter shader. Matches `ScatterUniforms` in
/// `voxel_scatter.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ScatterUniforms {
    to_world: Mat4,
    grid_dim: u32,
    half_extent: f32,
    _padding: [u32; 2],
}

/// Register the scatter material: the captured layer plus sweep uniforms
/// at group 0, the writable volumes at group 1.
pub fn register_material(device: &Device, registry: &mut MaterialRegistry) {
    let module = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("voxel scatter"),
        source: ShaderSource::Wgsl(include_str!("../shaders/voxel_scatter.wgsl").into()),
    });

    let layer_bgl = BindGroupLayoutBuilder::new()
        .append(
            ShaderStages::COMPUTE,
            BindingType::Texture {
                sample_type: TextureSampleType::Depth,
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
            None,
        )
        .append(
            ShaderStages::COMPUTE,
            BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
            None,
        )
        .append(
            ShaderStages::COMPUTE,
            BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
            None,
        )
        .append(
            ShaderStages::COMPUTE,
            BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: std::num::NonZeroU64::new(mem::size_of::<ScatterUniforms>() as u64),
            },
            None,
        )
        .build(device, Some("scatter layer bgl"));

    let volume_bgl = BindGroupLayoutBuilder::new()
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
        .build(device, Some("scatter volume bgl"));

    registry.register(
        MATERIAL_NAME,
        Material::new(device, MATERIAL_NAME, module, vec![layer_bgl, volume_bgl]),
    );
}

/// The texel rectangle a scatter dispatch covers, one invocation per
/// texel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProxyGrid {
    pub width: u32,
    pub height: u32,
}

impl ProxyGrid {
    pub fn layer(dimensions: VolumeDimensions) -> Self {
        Self {
            width: dimensions.get(),
            height: dimensions.get(),
        }
    }

    /// Workgroup counts covering the rectangle.
    pub fn workgroups(self) -> (u32, u32) {
        (
            round_up_div(self.width, WORKGROUP_SIZE),
            round_up_div(self.height, WORKGROUP_SIZE),
        )
    }
}

/// Scatter pass over the four peel layers of one axis.
///
/// All uniform buffers and bind groups are built once at construction:
/// the sweep poses are canonical per axis, so nothing here depends on the
/// scene.
pub struct VoxelScatterPass {
    pipeline: ComputePipeline,
    /// Layer bind groups, `[axis][layer]`, each pairing a peel layer with
    /// that axis's sweep uniforms.
    layer_bind_groups: [[BindGroup; PEEL_LAYER_COUNT]; 3],
    volume_bind_group: BindGroup,
    grid: ProxyGrid,
}

impl VoxelScatterPass {
    pub fn new(
        device: &Device,
        registry: &MaterialRegistry,
        layers: &[PeelLayer; PEEL_LAYER_COUNT],
        volume: &VoxelVolume,
        half_extent: f32,
    ) -> Result<Self, InitializationError> {
        profiling::scope!("VoxelScatterPass::new");

        let material = registry.get(MATERIAL_NAME)?;
        let dimensions = volume.dimensions;

        let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("voxel scatter pipeline"),
            layout: Some(&material.pipeline_layout),
            module: &material.module,
            entry_point: "scatter",
        });

        let layer_bind_groups = SweepAxis::ORDER.map(|axis| {
            let camera = OrthographicCamera::new(axis.pose(half_extent), half_extent);
            let uniforms = ScatterUniforms {
                to_world: camera.inv_view_proj(),
                grid_dim: dimensions.get(),
                half_extent,
                _padding: [0; 2],
            };
            let buffer = device.create_buffer_init(&BufferInitDescriptor {
                label: Some("scatter sweep uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: BufferUsages::UNIFORM,
            });

            [0, 1, 2, 3].map(|layer_index: usize| {
                let label = vxgi::format_sso!("scatter layer bg {}/{}", axis.index(), layer_index);
                let layer = &layers[layer_index];
                BindGroupBuilder::new()
                    .append_texture_view(&layer.depth.view)
                    .append_texture_view(&layer.albedo.view)
                    .append_texture_view(&layer.normal.view)
                    .append_buffer(&buffer)
                    .build(device, Some(&label), &material.bind_group_layouts[0])
            })
        });

        let volume_bind_group = BindGroupBuilder::new()
            .append_texture_view(&volume.albedo.mip_storage_views[0])
            .append_texture_view(&volume.normal.mip_storage_views[0])
            .build(device, Some("scatter volume bg"), &material.bind_group_layouts[1]);

        Ok(Self {
            pipeline,
            layer_bind_groups,
            volume_bind_group,
            grid: ProxyGrid::layer(dimensions),
        })
    }

    /// Scatters all four captured layers of `axis` into the volumes, in
    /// capture order. Later layers overwrite on cell collision.
    pub fn scatter_axis(&self, encoder: &mut CommandEncoder, axis: SweepAxis) {
        profiling::scope!("voxel scatter");

        let label = vxgi::format_sso!("scatter axis {}", axis.index());
        let mut cpass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some(&label),
            timestamp_writes: None,
        });

        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(1, &self.volume_bind_group, &[]);

        let (x, y) = self.grid.workgroups();
        for bind_group in &self.layer_bind_groups[axis.index()] {
            cpass.set_bind_group(0, bind_group, &[]);
            cpass.dispatch_workgroups(x, y, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_uniforms_match_the_shader_layout() {
        // A mat4x4 block, two scalars, two pad words.
        assert_eq!(mem::size_of::<ScatterUniforms>(), 80);
    }

    #[test]
    fn proxy_grid_covers_every_texel() {
        let grid = ProxyGrid { width: 64, height: 64 };
        assert_eq!(grid.workgroups(), (8, 8));

        // Non-multiple sizes round up rather than truncate.
        let ragged = ProxyGrid { width: 65, height: 9 };
        assert_eq!(ragged.workgroups(), (9, 2));
    }
}
