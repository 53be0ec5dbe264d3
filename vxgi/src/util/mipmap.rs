//! Mipmap generation for 3D volumes.
//!
//! wgpu cannot attach 3D textures as render targets, so the chain is built
//! by a compute shader performing a 2x2x2 box downsample, one dispatch per
//! mip transition. The cone tracer samples these mips for its widening
//! cone queries, so every level down to 1x1x1 is generated.

use arrayvec::ArrayVec;
use parking_lot::RwLock;
use wgpu::{
    BindGroupLayout, BindingType, CommandEncoder, ComputePassDescriptor, ComputePipeline, ComputePipelineDescriptor,
    Device, PipelineLayoutDescriptor, ShaderModuleDescriptor, ShaderSource, ShaderStages,
    StorageTextureAccess, TextureFormat, TextureSampleType, TextureViewDimension,
};

use crate::{
    format_sso,
    target::VolumeTexture,
    util::{
        bind_merge::{BindGroupBuilder, BindGroupLayoutBuilder},
        math::round_up_div,
        typedefs::FastHashMap,
    },
};

const SOURCE: &str = include_str!("../../shaders/volume_mip.wgsl");
const WORKGROUP_SIZE: u32 = 4;

/// WGSL spelling of a storage texture format.
fn wgsl_storage_format(format: TextureFormat) -> &'static str {
    match format {
        TextureFormat::Rgba8Unorm => "rgba8unorm",
        TextureFormat::Rgba16Float => "rgba16float",
        TextureFormat::Rgba32Float => "rgba32float",
        _ => panic!("internal vxgi error: {format:?} is not a supported volume storage format"),
    }
}

/// Generator for 3D volume mipmaps.
///
/// The bind group layout carries the destination's storage format, so the
/// layout and pipeline are cached together, one pair per format.
pub struct VolumeMipmapGenerator {
    pipelines: RwLock<FastHashMap<TextureFormat, (BindGroupLayout, ComputePipeline)>>,
}

impl VolumeMipmapGenerator {
    pub fn new(device: &Device, default_formats: &[TextureFormat]) -> Self {
        profiling::scope!("VolumeMipmapGenerator::new");

        let pipelines = default_formats
            .iter()
            .map(|&format| (format, Self::build_pipeline(device, format)))
            .collect();

        Self {
            pipelines: RwLock::new(pipelines),
        }
    }

    fn build_bgl(device: &Device, format: TextureFormat) -> BindGroupLayout {
        BindGroupLayoutBuilder::new()
            .append(
                ShaderStages::COMPUTE,
                BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: false },
                    view_dimension: TextureViewDimension::D3,
                    multisampled: false,
                },
                None,
            )
            .append(
                ShaderStages::COMPUTE,
                BindingType::StorageTexture {
                    access: StorageTextureAccess::WriteOnly,
                    format,
                    view_dimension: TextureViewDimension::D3,
                },
                None,
            )
            .build(device, Some("volume mip bgl"))
    }

    fn build_pipeline(device: &Device, format: TextureFormat) -> (BindGroupLayout, ComputePipeline) {
        let label = format_sso!("volume mip pipeline {:?}", format);
        profiling::scope!(&label);

        let source = SOURCE.replace("{{format}}", wgsl_storage_format(format));
        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(&label),
            source: ShaderSource::Wgsl(source.into()),
        });

        let bgl = Self::build_bgl(device, format);
        let pll = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(&label),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some(&label),
            layout: Some(&pll),
            module: &module,
            entry_point: "downsample",
        });

        (bgl, pipeline)
    }

    /// Generates the full mip chain of `volume` from its level 0 contents.
    ///
    /// Each dispatch reads level k and writes level k+1, so the encoder's
    /// pass ordering provides the read-after-write dependency the chain
    /// needs.
    pub fn generate_mipmaps(&self, device: &Device, encoder: &mut CommandEncoder, volume: &VolumeTexture) {
        profiling::scope!("generating volume mipmaps");

        {
            let read_pipelines = self.pipelines.read();
            if !read_pipelines.contains_key(&volume.format) {
                drop(read_pipelines);
                self.pipelines
                    .write()
                    .insert(volume.format, Self::build_pipeline(device, volume.format));
            }
        }
        let pipelines = self.pipelines.read();
        let (bgl, pipeline) = &pipelines[&volume.format];

        let mip_count = volume.dimensions.mip_count();
        let bind_groups: ArrayVec<_, 16> = (0..mip_count.saturating_sub(1))
            .map(|level| {
                let label = format_sso!("volume mip {} -> {}", level, level + 1);
                BindGroupBuilder::new()
                    .append_texture_view(&volume.mip_storage_views[level as usize])
                    .append_texture_view(&volume.mip_storage_views[level as usize + 1])
                    .build(device, Some(&label), bgl)
            })
            .collect();

        let mut cpass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some("volume mip generation"),
            timestamp_writes: None,
        });
        cpass.set_pipeline(pipeline);

        for (level, bind_group) in bind_groups.iter().enumerate() {
            let dst_dim = volume.dimensions.mip_dimension(level as u32 + 1);
            let workgroups = round_up_div(dst_dim, WORKGROUP_SIZE);
            cpass.set_bind_group(0, bind_group, &[]);
            cpass.dispatch_workgroups(workgroups, workgroups, workgroups);
        }
    }
}
