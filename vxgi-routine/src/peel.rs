//! Depth-peeling capture.
//!
//! Produces four ordered depth+color layers per sweep axis such that layer
//! k contains the k-th-nearest surface per texel. Four layers is a fixed
//! depth-complexity budget: scenes deeper than four surfaces along an axis
//! silently lose the deeper ones.

use std::{mem, num::NonZeroU64, sync::Arc};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use vxgi::{
    util::{
        bind_merge::{BindGroupBuilder, BindGroupLayoutBuilder},
        math::round_up_pot,
    },
    GpuScene, InitializationError, Material, MaterialRegistry, OrthographicCamera, PeelLayer, Vertex, ALBEDO_FORMAT,
    DEPTH_FORMAT, NORMAL_FORMAT,
};
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    BindGroup, BindingType, BufferBindingType, BufferUsages, Color, ColorTargetState, ColorWrites, CommandEncoder,
    CommandEncoderDescriptor, CompareFunction, DepthBiasState, DepthStencilState, Device, Extent3d, FragmentState,
    FrontFace, LoadOp, MultisampleState, Operations, PolygonMode, PrimitiveState, PrimitiveTopology, Queue,
    RenderPassColorAttachment, RenderPassDepthStencilAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, ShaderModuleDescriptor, ShaderSource, ShaderStages, StencilState, StoreOp, Texture,
    TextureDescriptor, TextureDimension, TextureSampleType, TextureUsages, TextureView, TextureViewDescriptor,
    TextureViewDimension, VertexState,
};

/// Number of depth-peel layers per axis sweep.
pub const PEEL_LAYER_COUNT: usize = 4;

/// Registered name of the depth-peeling material.
pub const MATERIAL_NAME: &str = "depth-peeling";

/// Per-draw uniforms, one aligned slot per (shape, mesh) pair.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DrawUniforms {
    mvp: Mat4,
    model: Mat4,
    diffuse_color: Vec4,
    first_layer: u32,
    _padding: [u32; 3],
}

/// Register the depth-peeling material: previous-layer depth at group 0,
/// dynamic-offset per-draw uniforms at group 1.
pub fn register_material(device: &Device, registry: &mut MaterialRegistry) {
    let module = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("depth peel"),
        source: ShaderSource::Wgsl(include_str!("../shaders/depth_peel.wgsl").into()),
    });

    let prev_depth_bgl = BindGroupLayoutBuilder::new()
        .append(
            ShaderStages::FRAGMENT,
            BindingType::Texture {
                sample_type: TextureSampleType::Depth,
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
            None,
        )
        .build(device, Some("peel exclusion bgl"));

    let draw_bgl = BindGroupLayoutBuilder::new()
        .append(
            ShaderStages::VERTEX_FRAGMENT,
            BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(mem::size_of::<DrawUniforms>() as u64),
            },
            None,
        )
        .build(device, Some("peel draw bgl"));

    registry.register(
        MATERIAL_NAME,
        Material::new(device, MATERIAL_NAME, module, vec![prev_depth_bgl, draw_bgl]),
    );
}

/// Uniform buffer holding one slot per draw, in two variants: the
/// first-layer variant (exclusion test disabled) followed by the deeper
/// variant. Rebuilt once per axis.
struct DrawUniformBuffer {
    bind_group: BindGroup,
    stride: u32,
    draw_count: u32,
}

impl DrawUniformBuffer {
    fn build(device: &Device, material: &Material, scene: &GpuScene, camera: &OrthographicCamera) -> Option<Self> {
        profiling::scope!("building peel draw uniforms");

        let draw_count = scene.draw_count();
        if draw_count == 0 {
            return None;
        }

        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        let stride = round_up_pot(mem::size_of::<DrawUniforms>() as u32, alignment);

        let mut data = vec![0u8; stride as usize * draw_count * 2];
        let view_proj = camera.view_proj();

        for first_layer in [1u32, 0u32] {
            let variant_base = (1 - first_layer) as usize * draw_count;
            let mut slot = 0;
            for shape in &scene.shapes {
                let mvp = view_proj * shape.transform;
                for mesh_index in 0..shape.meshes.len() {
                    let uniforms = DrawUniforms {
                        mvp,
                        model: shape.transform,
                        diffuse_color: shape.properties_for_mesh(mesh_index).diffuse_color,
                        first_layer,
                        _padding: [0; 3],
                    };
                    let offset = (variant_base + slot) * stride as usize;
                    data[offset..offset + mem::size_of::<DrawUniforms>()]
                        .copy_from_slice(bytemuck::bytes_of(&uniforms));
                    slot += 1;
                }
            }
        }

        let buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("peel draw uniforms"),
            contents: &data,
            usage: BufferUsages::UNIFORM,
        });

        let bind_group = BindGroupBuilder::new()
            .append_buffer_with_size(&buffer, mem::size_of::<DrawUniforms>() as u64)
            .build(device, Some("peel draw bg"), &material.bind_group_layouts[1]);

        Some(Self {
            bind_group,
            stride,
            draw_count: draw_count as u32,
        })
    }

    /// Dynamic offset of draw `slot` in the requested variant.
    fn offset(&self, slot: u32, first_layer: bool) -> u32 {
        let variant_base = if first_layer { 0 } else { self.draw_count };
        (variant_base + slot) * self.stride
    }
}

/// Depth-peeling routine: owns the peel pipeline, the sentinel exclusion
/// texture for the first layer, and one exclusion bind group per layer.
pub struct DepthPeelRoutine {
    material: Arc<Material>,
    pipeline: RenderPipeline,
    _sentinel_depth: Texture,
    /// Exclusion bind group for each layer: the sentinel for layer 0,
    /// layer k-1's depth for the rest.
    exclusion_bind_groups: [BindGroup; PEEL_LAYER_COUNT],
}

impl DepthPeelRoutine {
    pub fn new(
        device: &Device,
        queue: &Queue,
        registry: &MaterialRegistry,
        layers: &[PeelLayer; PEEL_LAYER_COUNT],
    ) -> Result<Self, InitializationError> {
        profiling::scope!("DepthPeelRoutine::new");

        let material = registry.get(MATERIAL_NAME)?;

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("depth peel pipeline"),
            layout: Some(&material.pipeline_layout),
            vertex: VertexState {
                module: &material.module,
                entry_point: "vs_main",
                buffers: &[Vertex::desc()],
            },
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                // Peeling captures surfaces regardless of facing.
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                module: &material.module,
                entry_point: "fs_main",
                targets: &[
                    Some(ColorTargetState {
                        format: ALBEDO_FORMAT,
                        blend: None,
                        write_mask: ColorWrites::ALL,
                    }),
                    Some(ColorTargetState {
                        format: NORMAL_FORMAT,
                        blend: None,
                        write_mask: ColorWrites::ALL,
                    }),
                ],
            }),
            multiview: None,
        });

        let (sentinel_depth, sentinel_view) = Self::create_sentinel(device, queue);

        let exclusion_bind_groups = [
            Self::exclusion_bind_group(device, &material, &sentinel_view, 0),
            Self::exclusion_bind_group(device, &material, &layers[0].depth.view, 1),
            Self::exclusion_bind_group(device, &material, &layers[1].depth.view, 2),
            Self::exclusion_bind_group(device, &material, &layers[2].depth.view, 3),
        ];

        Ok(Self {
            material,
            pipeline,
            _sentinel_depth: sentinel_depth,
            exclusion_bind_groups,
        })
    }

    /// The first layer has no prior depth to exclude against, but the
    /// shader still needs a bound texture. A 1x1 depth texture cleared to
    /// the far plane stands in; the shader never reads it.
    fn create_sentinel(device: &Device, queue: &Queue) -> (Texture, TextureView) {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("peel sentinel depth"),
            size: Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("peel sentinel clear"),
        });
        encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("peel sentinel clear"),
            color_attachments: &[],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: &view,
                depth_ops: Some(Operations {
                    load: LoadOp::Clear(1.0),
                    store: StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        queue.submit(Some(encoder.finish()));

        (texture, view)
    }

    fn exclusion_bind_group(device: &Device, material: &Material, depth_view: &TextureView, layer: usize) -> BindGroup {
        let label = vxgi::format_sso!("peel exclusion bg {}", layer);
        BindGroupBuilder::new()
            .append_texture_view(depth_view)
            .build(device, Some(&label), &material.bind_group_layouts[0])
    }

    /// Runs all four capture passes for the current axis, front to back.
    /// Layer k's pass samples layer k-1's depth, so the pass order is the
    /// data dependency.
    pub fn peel_axis(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        layers: &[PeelLayer; PEEL_LAYER_COUNT],
        scene: &GpuScene,
        camera: &OrthographicCamera,
    ) {
        profiling::scope!("depth peeling");

        let uniforms = DrawUniformBuffer::build(device, &self.material, scene, camera);

        for (layer_index, layer) in layers.iter().enumerate() {
            let label = vxgi::format_sso!("peel layer {}", layer_index);
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some(&label),
                color_attachments: &[
                    Some(RenderPassColorAttachment {
                        view: &layer.albedo.view,
                        resolve_target: None,
                        ops: Operations {
                            load: LoadOp::Clear(Color::TRANSPARENT),
                            store: StoreOp::Store,
                        },
                    }),
                    Some(RenderPassColorAttachment {
                        view: &layer.normal.view,
                        resolve_target: None,
                        ops: Operations {
                            load: LoadOp::Clear(Color::TRANSPARENT),
                            store: StoreOp::Store,
                        },
                    }),
                ],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &layer.depth.view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // An empty scene degenerates to the clears above.
            let Some(ref uniforms) = uniforms else { continue };

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.exclusion_bind_groups[layer_index], &[]);

            let first_layer = layer_index == 0;
            let mut slot = 0;
            for shape in &scene.shapes {
                for mesh in &shape.meshes {
                    rpass.set_bind_group(1, &uniforms.bind_group, &[uniforms.offset(slot, first_layer)]);
                    rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    rpass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
                    slot += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_uniforms_fit_an_aligned_slot() {
        // Dynamic offsets must be multiples of the device alignment; the
        // slot math assumes the struct itself never exceeds one slot.
        assert_eq!(mem::size_of::<DrawUniforms>(), 160);
        assert!(mem::size_of::<DrawUniforms>() as u32 <= round_up_pot(mem::size_of::<DrawUniforms>() as u32, 256));
    }

    #[test]
    fn slot_offsets_separate_variants() {
        // Mirror of DrawUniformBuffer::offset with a 256-byte stride and
        // three draws.
        let stride = 256;
        let draw_count = 3;
        let offset = |slot: u32, first: bool| {
            let base = if first { 0 } else { draw_count };
            (base + slot) * stride
        };

        assert_eq!(offset(0, true), 0);
        assert_eq!(offset(2, true), 512);
        assert_eq!(offset(0, false), 768);
        assert_eq!(offset(2, false), 1280);
    }
}
