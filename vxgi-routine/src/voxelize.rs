//! The voxelization routine.
//!
//! Owns every GPU resource of the pipeline and drives a full sweep: clear
//! the volumes, then for each axis in canonical order capture four peel
//! layers and scatter them into the volumes, then regenerate both mip
//! chains. A sweep is synchronous with respect to command recording;
//! everything lands in one submission.

use vxgi::{
    util::{error_scope::ValidationErrorScope, mipmap::VolumeMipmapGenerator},
    GpuScene, InitializationError, MaterialRegistry, OrthographicCamera, PeelLayer, SweepAxis, VoxelVolume,
    ALBEDO_FORMAT, NORMAL_FORMAT,
};
use vxgi_types::{TargetProperties, VolumeDimensions};
use wgpu::{CommandEncoderDescriptor, Device, Queue};

use crate::{
    clear::{self, VolumeClearPass},
    peel::{self, DepthPeelRoutine, PEEL_LAYER_COUNT},
    scatter::{self, VoxelScatterPass},
};

/// Half-extent of the voxelized world region. The grid spans
/// `[-DEFAULT_HALF_EXTENT, DEFAULT_HALF_EXTENT]` on every axis.
pub const DEFAULT_HALF_EXTENT: f32 = 3.5;

/// Where the routine is within a sweep. Observable between recording
/// steps; a finished [`VoxelizeRoutine::voxelize`] always leaves the
/// routine [`SweepPhase::Idle`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SweepPhase {
    Idle,
    SweepingAxis(SweepAxis),
    Finalizing,
}

/// Coalescing revoxelization scheduler.
///
/// Scene changes request a sweep; the clock releases at most one sweep
/// per `interval` ticks no matter how many requests accumulated. A
/// request never expires, it waits for the next release.
#[derive(Debug, Clone)]
pub struct VoxelizationClock {
    ticks: u64,
    pending: bool,
    interval: u64,
}

impl VoxelizationClock {
    pub fn new(interval: u64) -> Self {
        Self {
            ticks: 0,
            pending: false,
            interval,
        }
    }

    /// Advances the clock by one frame.
    pub fn tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    /// Records that the scene changed and a sweep is wanted.
    pub fn request(&mut self) {
        self.pending = true;
    }

    /// Whether a sweep should run now.
    pub fn due(&self) -> bool {
        self.pending && self.ticks >= self.interval
    }

    /// Called after a sweep ran; clears the request and restarts the
    /// interval.
    pub fn reset(&mut self) {
        self.ticks = 0;
        self.pending = false;
    }
}

/// Registers the peel, scatter, and clear materials the routine looks up
/// at construction.
pub fn register_default_materials(device: &Device, registry: &mut MaterialRegistry) {
    peel::register_material(device, registry);
    scatter::register_material(device, registry);
    clear::register_material(device, registry);
}

/// The complete voxelization pipeline.
pub struct VoxelizeRoutine {
    layers: [PeelLayer; PEEL_LAYER_COUNT],
    volume: VoxelVolume,
    peel: DepthPeelRoutine,
    scatter: VoxelScatterPass,
    clear: VolumeClearPass,
    mipmapper: VolumeMipmapGenerator,
    camera: OrthographicCamera,
    half_extent: f32,
    clock: VoxelizationClock,
    phase: SweepPhase,
}

impl VoxelizeRoutine {
    /// Builds the routine from the materials in `registry`. Callers with
    /// no registry of their own populate one via
    /// [`register_default_materials`] first.
    pub fn new(
        device: &Device,
        queue: &Queue,
        registry: &MaterialRegistry,
        dimensions: VolumeDimensions,
        half_extent: f32,
        interval: u64,
    ) -> Result<Self, InitializationError> {
        profiling::scope!("VoxelizeRoutine::new");

        let layers = [
            PeelLayer::new(device, dimensions, 0)?,
            PeelLayer::new(device, dimensions, 1)?,
            PeelLayer::new(device, dimensions, 2)?,
            PeelLayer::new(device, dimensions, 3)?,
        ];
        let volume = VoxelVolume::new(device, dimensions, TargetProperties::VOLUME)?;

        let peel = DepthPeelRoutine::new(device, queue, registry, &layers)?;
        let scatter = VoxelScatterPass::new(device, registry, &layers, &volume, half_extent)?;
        let clear = VolumeClearPass::new(device, registry, &volume)?;
        let mipmapper = VolumeMipmapGenerator::new(device, &[ALBEDO_FORMAT, NORMAL_FORMAT]);

        let camera = OrthographicCamera::new(SweepAxis::ORDER[0].pose(half_extent), half_extent);

        Ok(Self {
            layers,
            volume,
            peel,
            scatter,
            clear,
            mipmapper,
            camera,
            half_extent,
            clock: VoxelizationClock::new(interval),
            phase: SweepPhase::Idle,
        })
    }

    /// The voxel volumes this routine writes. Sample them only between
    /// sweeps.
    pub fn volume(&self) -> &VoxelVolume {
        &self.volume
    }

    /// The peel layers as left by the most recent sweep, holding the last
    /// swept axis's capture. Exposed for inspection and debugging.
    pub fn layers(&self) -> &[PeelLayer; PEEL_LAYER_COUNT] {
        &self.layers
    }

    pub fn phase(&self) -> SweepPhase {
        self.phase
    }

    /// Advances the revoxelization clock by one frame.
    pub fn tick(&mut self) {
        self.clock.tick();
    }

    /// Requests a sweep; it runs on the next [`Self::maybe_voxelize`]
    /// whose interval has elapsed.
    pub fn request_voxelize(&mut self) {
        self.clock.request();
    }

    /// Runs a sweep if one is due. Returns whether it ran.
    pub fn maybe_voxelize(&mut self, device: &Device, queue: &Queue, scene: &GpuScene) -> bool {
        if !self.clock.due() {
            return false;
        }
        self.voxelize(device, queue, scene);
        true
    }

    /// Records and submits one full sweep over `scene`.
    ///
    /// The volumes are cleared first, so a sweep over an empty scene
    /// leaves them zeroed. Repeating a sweep over an unchanged scene
    /// reproduces the volumes exactly; nothing here depends on prior
    /// volume contents.
    pub fn voxelize(&mut self, device: &Device, queue: &Queue, scene: &GpuScene) {
        profiling::scope!("voxelize sweep");

        let scope = ValidationErrorScope::new(device, "voxelize sweep");

        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("voxelize sweep"),
        });

        self.clear.clear(&mut encoder);

        for axis in SweepAxis::ORDER {
            self.phase = SweepPhase::SweepingAxis(axis);
            log::debug!("sweeping axis {:?}", axis);

            self.camera.set_pose(axis.pose(self.half_extent));
            self.peel
                .peel_axis(device, &mut encoder, &self.layers, scene, &self.camera);
            self.scatter.scatter_axis(&mut encoder, axis);
        }

        self.phase = SweepPhase::Finalizing;
        self.mipmapper.generate_mipmaps(device, &mut encoder, &self.volume.albedo);
        self.mipmapper.generate_mipmaps(device, &mut encoder, &self.volume.normal);

        queue.submit(Some(encoder.finish()));
        scope.end();

        self.phase = SweepPhase::Idle;
        self.clock.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_waits_for_the_interval() {
        let mut clock = VoxelizationClock::new(3);
        clock.request();
        assert!(!clock.due());
        clock.tick();
        clock.tick();
        assert!(!clock.due());
        clock.tick();
        assert!(clock.due());
    }

    #[test]
    fn clock_coalesces_requests() {
        let mut clock = VoxelizationClock::new(2);
        clock.request();
        clock.request();
        clock.request();
        clock.tick();
        clock.tick();
        assert!(clock.due());

        // One reset consumes every accumulated request.
        clock.reset();
        assert!(!clock.due());
        clock.tick();
        clock.tick();
        assert!(!clock.due());
    }

    #[test]
    fn clock_holds_requests_until_released() {
        let mut clock = VoxelizationClock::new(2);
        clock.tick();
        clock.tick();
        clock.tick();
        // Ticks alone never release a sweep.
        assert!(!clock.due());
        clock.request();
        assert!(clock.due());
    }

    #[test]
    fn zero_interval_releases_immediately() {
        let mut clock = VoxelizationClock::new(0);
        clock.request();
        assert!(clock.due());
    }
}
