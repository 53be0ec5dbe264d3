//! Mesh upload.
//!
//! CPU-side [`Scene`](vxgi_types::Scene) descriptions are uploaded once
//! into vertex/index buffers; the resulting [`GpuScene`] is what the
//! voxelization routine borrows for the duration of a sweep.

use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    Buffer, BufferUsages, Device, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode,
};

use vxgi_types::{Mesh, Scene, Shape, SurfaceProperties};

/// Interleaved vertex as stored in the vertex buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: &[
                VertexAttribute {
                    format: VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                },
                VertexAttribute {
                    format: VertexFormat::Float32x3,
                    offset: mem::size_of::<[f32; 3]>() as u64,
                    shader_location: 1,
                },
            ],
        }
    }
}

/// A mesh uploaded to the GPU.
pub struct GpuMesh {
    pub vertex_buffer: Buffer,
    pub index_buffer: Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn from_mesh(device: &Device, mesh: &Mesh) -> Self {
        let vertices: Vec<Vertex> = mesh
            .positions
            .iter()
            .zip(&mesh.normals)
            .map(|(position, normal)| Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
            })
            .collect();

        let vertex_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("mesh vertex buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("mesh index buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// A shape uploaded to the GPU. Surface properties stay on the CPU; they
/// are uploaded per draw by the peel pass.
pub struct GpuShape {
    pub transform: Mat4,
    pub meshes: Vec<GpuMesh>,
    pub mesh_properties: Vec<SurfaceProperties>,
    pub default_properties: SurfaceProperties,
}

impl GpuShape {
    pub fn from_shape(device: &Device, shape: &Shape) -> Self {
        Self {
            transform: shape.transform,
            meshes: shape.meshes.iter().map(|mesh| GpuMesh::from_mesh(device, mesh)).collect(),
            mesh_properties: shape.mesh_properties.clone(),
            default_properties: shape.default_properties,
        }
    }

    /// Surface properties for the mesh at `index`, falling back to the
    /// shape default when no per-mesh entry exists.
    pub fn properties_for_mesh(&self, index: usize) -> SurfaceProperties {
        self.mesh_properties
            .get(index)
            .copied()
            .unwrap_or(self.default_properties)
    }
}

/// A scene uploaded to the GPU. Borrowed, never retained, by the
/// voxelization routine.
#[derive(Default)]
pub struct GpuScene {
    pub shapes: Vec<GpuShape>,
}

impl GpuScene {
    pub fn from_scene(device: &Device, scene: &Scene) -> Self {
        profiling::scope!("GpuScene::from_scene");

        Self {
            shapes: scene.shapes.iter().map(|shape| GpuShape::from_shape(device, shape)).collect(),
        }
    }

    /// Total number of (shape, mesh) draws a single pass over this scene
    /// issues.
    pub fn draw_count(&self) -> usize {
        self.shapes.iter().map(|shape| shape.meshes.len()).sum()
    }
}
