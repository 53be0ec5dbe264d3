//! Voxelization routine for the vxgi pipeline, built on the plumbing in
//! the `vxgi` crate.
//!
//! A sweep works in three stages, all recorded into one submission by
//! [`voxelize::VoxelizeRoutine::voxelize`]:
//!
//! 1. [`clear`] zeroes level 0 of the albedo and normal volumes.
//! 2. For each axis (Y, then Z, then X), [`peel`] captures four
//!    depth-peeled layers and [`scatter`] writes them into the volumes.
//! 3. Both volume mip chains are regenerated from level 0.
//!
//! Each stage registers a named material in the shared
//! [`MaterialRegistry`](vxgi::MaterialRegistry) before the routine is
//! constructed; see [`peel::register_material`] and friends.

pub mod clear;
pub mod peel;
pub mod scatter;
pub mod voxelize;

pub use voxelize::{
    register_default_materials, SweepPhase, VoxelizationClock, VoxelizeRoutine, DEFAULT_HALF_EXTENT,
};
