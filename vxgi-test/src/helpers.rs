use glam::{Mat4, Vec3, Vec4};
use vxgi::types::{Mesh, MeshBuilder, Scene, Shape, SurfaceProperties};

fn single_mesh_shape(mesh: Mesh, transform: Mat4, color: Vec4) -> Shape {
    Shape {
        transform,
        meshes: vec![mesh],
        mesh_properties: vec![SurfaceProperties { diffuse_color: color }],
        default_properties: SurfaceProperties::default(),
    }
}

/// Creates a quad in the xy plane at height `z`, spanning `[-half, half]`
/// on both axes.
pub fn xy_quad(z: f32, half: f32, transform: Mat4, color: Vec4) -> Shape {
    let mesh = MeshBuilder::new(vec![
        Vec3::new(-half, -half, z),
        Vec3::new(half, -half, z),
        Vec3::new(half, half, z),
        Vec3::new(-half, half, z),
    ])
    .with_indices(vec![0, 1, 2, 0, 2, 3])
    .build()
    .unwrap();

    single_mesh_shape(mesh, transform, color)
}

/// Creates a quad in the yz plane at `x`, spanning `[-half, half]` on both
/// axes.
pub fn yz_quad(x: f32, half: f32, transform: Mat4, color: Vec4) -> Shape {
    let mesh = MeshBuilder::new(vec![
        Vec3::new(x, -half, -half),
        Vec3::new(x, half, -half),
        Vec3::new(x, half, half),
        Vec3::new(x, -half, half),
    ])
    .with_indices(vec![0, 1, 2, 0, 2, 3])
    .build()
    .unwrap();

    single_mesh_shape(mesh, transform, color)
}

/// Creates an axis-aligned cube centered at the origin, spanning
/// `[-half, half]` on every axis. Each face carries its own four vertices
/// so the computed normals stay flat per face.
pub fn cube(half: f32, transform: Mat4, color: Vec4) -> Shape {
    let h = half;
    let positions = vec![
        // +x
        Vec3::new(h, -h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(h, h, h),
        Vec3::new(h, -h, h),
        // -x
        Vec3::new(-h, -h, h),
        Vec3::new(-h, h, h),
        Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, -h),
        // +y
        Vec3::new(-h, h, -h),
        Vec3::new(-h, h, h),
        Vec3::new(h, h, h),
        Vec3::new(h, h, -h),
        // -y
        Vec3::new(-h, -h, h),
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(h, -h, h),
        // +z
        Vec3::new(-h, -h, h),
        Vec3::new(h, -h, h),
        Vec3::new(h, h, h),
        Vec3::new(-h, h, h),
        // -z
        Vec3::new(-h, h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(-h, -h, -h),
    ];
    let indices = (0..6u32)
        .flat_map(|face| {
            let base = face * 4;
            [base, base + 1, base + 2, base, base + 2, base + 3]
        })
        .collect();

    let mesh = MeshBuilder::new(positions).with_indices(indices).build().unwrap();

    single_mesh_shape(mesh, transform, color)
}

/// A scene holding the given shapes.
pub fn scene(shapes: Vec<Shape>) -> Scene {
    Scene { shapes }
}
