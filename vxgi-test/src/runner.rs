use anyhow::{Context, Result};
use vxgi::{types::VolumeDimensions, GpuScene, InstanceAdapterDevice, MaterialRegistry};
use vxgi_routine::{register_default_materials, VoxelizeRoutine, DEFAULT_HALF_EXTENT};
use wgpu::{
    Extent3d, ImageCopyBuffer, ImageDataLayout, Origin3d, Texture, TextureAspect, COPY_BYTES_PER_ROW_ALIGNMENT,
};

#[derive(Default)]
pub struct TestRunnerBuilder {
    iad: Option<InstanceAdapterDevice>,
    dimension: Option<u32>,
}

impl TestRunnerBuilder {
    pub fn new() -> Self {
        TestRunnerBuilder::default()
    }

    pub fn iad(mut self, iad: InstanceAdapterDevice) -> Self {
        self.iad = Some(iad);
        self
    }

    pub fn dimension(mut self, dimension: u32) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub async fn build(self) -> Result<TestRunner> {
        let _ = env_logger::builder().is_test(true).try_init();

        let iad = match self.iad {
            Some(iad) => iad,
            None => vxgi::create_iad(None, None)
                .await
                .map_err(|err| anyhow::anyhow!("InstanceAdapterDevice creation failed: {err}"))?,
        };

        let dimensions =
            VolumeDimensions::new(self.dimension.unwrap_or(64)).context("Invalid test volume dimension")?;

        let mut registry = MaterialRegistry::new();
        register_default_materials(&iad.device, &mut registry);

        let routine = VoxelizeRoutine::new(&iad.device, &iad.queue, &registry, dimensions, DEFAULT_HALF_EXTENT, 0)
            .map_err(|err| anyhow::anyhow!("VoxelizeRoutine initialization failed: {err}"))?;

        Ok(TestRunner { iad, routine })
    }
}

pub struct TestRunner {
    pub iad: InstanceAdapterDevice,
    pub routine: VoxelizeRoutine,
}

/// A tightly-packed CPU copy of one mip level of a voxel volume.
pub struct VolumeReadback {
    pub dim: u32,
    pub bytes_per_texel: u32,
    pub data: Vec<u8>,
}

impl VolumeReadback {
    pub fn texel(&self, x: u32, y: u32, z: u32) -> &[u8] {
        let bpt = self.bytes_per_texel as usize;
        let index = ((z * self.dim + y) * self.dim + x) as usize * bpt;
        &self.data[index..index + bpt]
    }

    pub fn is_zeroed(&self) -> bool {
        self.data.iter().all(|&byte| byte == 0)
    }
}

/// A CPU copy of one peel layer's depth attachment.
pub struct DepthReadback {
    pub dim: u32,
    pub values: Vec<f32>,
}

impl DepthReadback {
    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.dim + x) as usize]
    }
}

impl TestRunner {
    pub fn builder() -> TestRunnerBuilder {
        TestRunnerBuilder::new()
    }

    pub fn upload(&self, scene: &vxgi::types::Scene) -> GpuScene {
        GpuScene::from_scene(&self.iad.device, scene)
    }

    pub fn voxelize(&mut self, scene: &GpuScene) {
        self.routine.voxelize(&self.iad.device, &self.iad.queue, scene);
    }

    pub async fn read_albedo_level(&self, level: u32) -> Result<VolumeReadback> {
        let volume = self.routine.volume();
        let dim = volume.dimensions.mip_dimension(level);
        let extent = Extent3d {
            width: dim,
            height: dim,
            depth_or_array_layers: dim,
        };
        let data = self.read_texture(&volume.albedo.texture, level, extent, 4).await?;
        Ok(VolumeReadback {
            dim,
            bytes_per_texel: 4,
            data,
        })
    }

    pub async fn read_normal_level(&self, level: u32) -> Result<VolumeReadback> {
        let volume = self.routine.volume();
        let dim = volume.dimensions.mip_dimension(level);
        let extent = Extent3d {
            width: dim,
            height: dim,
            depth_or_array_layers: dim,
        };
        let data = self.read_texture(&volume.normal.texture, level, extent, 8).await?;
        Ok(VolumeReadback {
            dim,
            bytes_per_texel: 8,
            data,
        })
    }

    /// Reads back the depth attachment of peel layer `layer`, holding the
    /// last swept axis's capture.
    pub async fn read_layer_depth(&self, layer: usize) -> Result<DepthReadback> {
        let dim = self.routine.volume().dimensions.get();
        let extent = Extent3d {
            width: dim,
            height: dim,
            depth_or_array_layers: 1,
        };
        let bytes = self
            .read_texture(&self.routine.layers()[layer].depth.texture, 0, extent, 4)
            .await?;
        let values = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Ok(DepthReadback { dim, values })
    }

    /// Copies one mip level of a texture into a tightly-packed CPU buffer,
    /// stripping the copy's row padding.
    async fn read_texture(&self, texture: &Texture, mip: u32, extent: Extent3d, bytes_per_texel: u32) -> Result<Vec<u8>> {
        let tight_row = extent.width * bytes_per_texel;
        let padded_row = vxgi::util::math::round_up_div(tight_row, COPY_BYTES_PER_ROW_ALIGNMENT) * COPY_BYTES_PER_ROW_ALIGNMENT;

        let buffer = self.iad.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Test readback buffer"),
            size: (padded_row * extent.height * extent.depth_or_array_layers) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .iad
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Test readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: mip,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            ImageCopyBuffer {
                buffer: &buffer,
                layout: ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(extent.height),
                },
            },
            extent,
        );

        let submit_index = self.iad.queue.submit(Some(encoder.finish()));

        let (sender, receiver) = flume::bounded(1);
        buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |_| sender.send(()).unwrap());
        self.iad
            .device
            .poll(wgpu::Maintain::WaitForSubmissionIndex(submit_index));

        receiver
            .recv_async()
            .await
            .context("Failed to receive message from map_async")?;

        let mapping = buffer.slice(..).get_mapped_range();

        let mut data = Vec::with_capacity((tight_row * extent.height * extent.depth_or_array_layers) as usize);
        for row in 0..(extent.height * extent.depth_or_array_layers) as usize {
            let start = row * padded_row as usize;
            data.extend_from_slice(&mapping[start..start + tight_row as usize]);
        }

        Ok(data)
    }
}
