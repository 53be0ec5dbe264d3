//! Plain data types for the vxgi voxelization pipeline.
//!
//! This crate contains everything the pipeline shares with its callers that
//! does not require a GPU device: the volume extents, render target
//! properties, and the CPU-side scene description that gets uploaded before
//! a sweep.

use glam::{Mat4, Vec3, Vec4};
use thiserror::Error;

// WGPU REEXPORTS
#[doc(inline)]
pub use wgt::{AddressMode, Extent3d, FilterMode, TextureFormat, TextureUsages};

/// The maximum cubic dimension a voxel volume may have.
///
/// This matches the lowest 3D texture dimension limit the pipeline is
/// willing to run with.
pub const MAX_VOLUME_DIMENSION: u32 = 512;

/// Error returned when constructing [`VolumeDimensions`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VolumeDimensionsError {
    #[error("Volume dimension of {0} is not a power of two")]
    NotPowerOfTwo(u32),
    #[error("Volume dimension of {dim} exceeds the maximum of {MAX_VOLUME_DIMENSION}")]
    TooLarge { dim: u32 },
}

/// Cubic extent of a voxel volume.
///
/// Width, height and depth are all the same value, fixed at construction.
/// The value must be a power of two so the mip chain the cone tracer
/// samples terminates at exactly 1³.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VolumeDimensions(u32);

impl VolumeDimensions {
    pub fn new(dim: u32) -> Result<Self, VolumeDimensionsError> {
        if !dim.is_power_of_two() {
            return Err(VolumeDimensionsError::NotPowerOfTwo(dim));
        }
        if dim > MAX_VOLUME_DIMENSION {
            return Err(VolumeDimensionsError::TooLarge { dim });
        }
        Ok(Self(dim))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Number of mip levels in the full chain down to 1³.
    pub fn mip_count(self) -> u32 {
        32 - self.0.leading_zeros()
    }

    /// Dimension of the given mip level.
    pub fn mip_dimension(self, level: u32) -> u32 {
        (self.0 >> level).max(1)
    }

    pub fn extent3d(self) -> Extent3d {
        Extent3d {
            width: self.0,
            height: self.0,
            depth_or_array_layers: self.0,
        }
    }

    /// Extent of the 2D capture targets used during depth peeling. One
    /// texel per potential voxel column.
    pub fn layer_extent(self) -> Extent3d {
        Extent3d {
            width: self.0,
            height: self.0,
            depth_or_array_layers: 1,
        }
    }
}

/// Filtering and addressing properties of a render target.
///
/// Immutable once the target has been created.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TargetProperties {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub address_mode: AddressMode,
    pub format: TextureFormat,
}

impl TargetProperties {
    /// Properties for the voxel volumes: nearest filtering, as the scatter
    /// pass addresses exact cells.
    pub const VOLUME: Self = Self {
        min_filter: FilterMode::Nearest,
        mag_filter: FilterMode::Nearest,
        address_mode: AddressMode::ClampToEdge,
        format: TextureFormat::Rgba8Unorm,
    };
}

/// Surface attributes of a single mesh within a shape.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceProperties {
    pub diffuse_color: Vec4,
}

impl Default for SurfaceProperties {
    fn default() -> Self {
        Self {
            diffuse_color: Vec4::ONE,
        }
    }
}

/// Error returned from mesh validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshValidationError {
    #[error("Mesh's normal buffer has {actual} vertices but the position buffer has {expected}")]
    MismatchedNormalCount { expected: usize, actual: usize },
    #[error("Mesh has {count} indices which is not a multiple of three. Meshes are always composed of triangles")]
    IndexCountNotMultipleOfThree { count: usize },
    #[error("Index at position {index} has the value {value} which is out of bounds for vertex buffers of {max} length")]
    IndexOutOfBounds { index: usize, value: u32, max: u32 },
}

/// A triangle mesh ready for upload.
///
/// These can be annoying to construct by hand, so use [`MeshBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Ensure all invariants hold: the normal buffer is the same length as
    /// the position buffer, and indices form whole triangles that stay in
    /// bounds.
    pub fn validate(&self) -> Result<(), MeshValidationError> {
        if self.normals.len() != self.positions.len() {
            return Err(MeshValidationError::MismatchedNormalCount {
                expected: self.positions.len(),
                actual: self.normals.len(),
            });
        }

        if self.indices.len() % 3 != 0 {
            return Err(MeshValidationError::IndexCountNotMultipleOfThree {
                count: self.indices.len(),
            });
        }

        let max = self.positions.len() as u32;
        for (index, &value) in self.indices.iter().enumerate() {
            if value >= max {
                return Err(MeshValidationError::IndexOutOfBounds { index, value, max });
            }
        }

        Ok(())
    }
}

/// Easy to use builder for a [`Mesh`] that deals with common operations for
/// you.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    indices: Option<Vec<u32>>,
}

impl MeshBuilder {
    /// Create a new [`MeshBuilder`] with a given set of positions.
    ///
    /// All vertices must have positions.
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    /// Add vertex normals to the given mesh. If they are not provided,
    /// flat normals are computed from the triangle winding.
    pub fn with_vertex_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Add indices to the given mesh. If they are not provided, the mesh
    /// is treated as a triangle soup.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Build the mesh, validating the result.
    pub fn build(self) -> Result<Mesh, MeshValidationError> {
        let indices = self
            .indices
            .unwrap_or_else(|| (0..self.positions.len() as u32).collect());

        let normals = self
            .normals
            .unwrap_or_else(|| compute_flat_normals(&self.positions, &indices));

        let mesh = Mesh {
            positions: self.positions,
            normals,
            indices,
        };

        mesh.validate()?;

        Ok(mesh)
    }
}

/// Computes per-vertex normals by accumulating face normals.
fn compute_flat_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            // Validation will reject this mesh; don't panic here.
            continue;
        }
        let face = (positions[i1] - positions[i0])
            .cross(positions[i2] - positions[i0])
            .normalize_or_zero();
        normals[i0] += face;
        normals[i1] += face;
        normals[i2] += face;
    }

    for normal in &mut normals {
        *normal = normal.normalize_or_zero();
    }

    normals
}

/// A single shape in the scene: one transform over a collection of meshes.
///
/// `mesh_properties` parallels `meshes` and is addressed positionally; a
/// mesh whose index has no corresponding entry falls back to
/// `default_properties`.
#[derive(Debug, Clone)]
pub struct Shape {
    pub transform: Mat4,
    pub meshes: Vec<Mesh>,
    pub mesh_properties: Vec<SurfaceProperties>,
    pub default_properties: SurfaceProperties,
}

impl Shape {
    pub fn new(transform: Mat4, meshes: Vec<Mesh>) -> Self {
        Self {
            transform,
            meshes,
            mesh_properties: Vec::new(),
            default_properties: SurfaceProperties::default(),
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

/// A read-only collection of shapes handed to the voxelizer.
///
/// The voxelization pipeline borrows scenes for the duration of a sweep and
/// never retains them.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub shapes: Vec<Shape>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_dimensions_reject_non_pot() {
        assert_eq!(
            VolumeDimensions::new(48),
            Err(VolumeDimensionsError::NotPowerOfTwo(48))
        );
        assert_eq!(
            VolumeDimensions::new(0),
            Err(VolumeDimensionsError::NotPowerOfTwo(0))
        );
        assert_eq!(
            VolumeDimensions::new(1024),
            Err(VolumeDimensionsError::TooLarge { dim: 1024 })
        );
        assert!(VolumeDimensions::new(64).is_ok());
    }

    #[test]
    fn volume_dimensions_mip_chain() {
        let dims = VolumeDimensions::new(64).unwrap();
        assert_eq!(dims.mip_count(), 7);
        assert_eq!(dims.mip_dimension(0), 64);
        assert_eq!(dims.mip_dimension(6), 1);
        // Past the end of the chain the dimension clamps to one.
        assert_eq!(dims.mip_dimension(9), 1);
    }

    #[test]
    fn mesh_builder_computes_normals() {
        let mesh = MeshBuilder::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ])
        .build()
        .unwrap();

        for normal in mesh.normals {
            assert!((normal - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn mesh_validation_catches_bad_indices() {
        let err = MeshBuilder::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y])
            .with_indices(vec![0, 1, 3])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MeshValidationError::IndexOutOfBounds {
                index: 2,
                value: 3,
                max: 3
            }
        );

        let err = MeshBuilder::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y])
            .with_indices(vec![0, 1])
            .build()
            .unwrap_err();
        assert_eq!(err, MeshValidationError::IndexCountNotMultipleOfThree { count: 2 });
    }

    #[test]
    fn shape_properties_fall_back_to_default() {
        let mut shape = Shape::new(Mat4::IDENTITY, Vec::new());
        shape.mesh_properties.push(SurfaceProperties {
            diffuse_color: Vec4::new(1.0, 0.0, 0.0, 1.0),
        });
        shape.default_properties = SurfaceProperties {
            diffuse_color: Vec4::new(0.0, 1.0, 0.0, 1.0),
        };

        assert_eq!(
            shape.properties_for_mesh(0).diffuse_color,
            Vec4::new(1.0, 0.0, 0.0, 1.0)
        );
        // No entry at index 1; positional lookup falls back.
        assert_eq!(
            shape.properties_for_mesh(1).diffuse_color,
            Vec4::new(0.0, 1.0, 0.0, 1.0)
        );
    }
}
