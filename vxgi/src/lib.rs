//! GPU plumbing for the vxgi voxelization pipeline.
//!
//! This crate owns everything between raw wgpu and the voxelization routine
//! in `vxgi-routine`: device setup, strongly-typed 2D/3D render targets,
//! the orthographic sweep camera, mesh upload, the named material registry,
//! and volume mipmap generation.

mod camera;
mod error;
mod mesh;
mod registry;
mod setup;
mod target;

pub mod util;

pub use camera::*;
pub use error::*;
pub use mesh::*;
pub use registry::*;
pub use setup::*;
pub use target::*;

/// Reexport of all the types in `vxgi-types`.
pub mod types {
    pub use vxgi_types::*;
}
