//! Named material registry.
//!
//! Materials are opaque bundles of a shader module, its bind group
//! layouts, and the pipeline layout derived from them. Passes look their
//! material up by name once at construction time. The registry is an
//! explicitly constructed value owned by the caller; there is no
//! process-wide store.

use std::sync::Arc;

use wgpu::{BindGroupLayout, Device, PipelineLayout, PipelineLayoutDescriptor, ShaderModule};

use crate::{
    util::typedefs::{FastHashMap, SsoString},
    MaterialLookupError,
};

/// A shader module together with the layouts every pipeline built from it
/// shares.
#[derive(Debug)]
pub struct Material {
    pub module: ShaderModule,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub pipeline_layout: PipelineLayout,
}

impl Material {
    pub fn new(device: &Device, label: &str, module: ShaderModule, bind_group_layouts: Vec<BindGroupLayout>) -> Self {
        let bgl_refs: Vec<&BindGroupLayout> = bind_group_layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &bgl_refs,
            push_constant_ranges: &[],
        });

        Self {
            module,
            bind_group_layouts,
            pipeline_layout,
        }
    }
}

/// Registry mapping material names to [`Material`] handles.
#[derive(Default)]
pub struct MaterialRegistry {
    materials: FastHashMap<SsoString, Arc<Material>>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, material: Material) -> Arc<Material> {
        let material = Arc::new(material);
        self.materials.insert(SsoString::from(name), Arc::clone(&material));
        material
    }

    /// Look up a material by name.
    pub fn get(&self, name: &str) -> Result<Arc<Material>, MaterialLookupError> {
        self.materials
            .get(name)
            .cloned()
            .ok_or_else(|| MaterialLookupError { name: name.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::MaterialRegistry;

    #[test]
    fn lookup_of_missing_material_is_an_error() {
        let registry = MaterialRegistry::new();
        let error = registry.get("voxelization").unwrap_err();
        assert_eq!(error.name, "voxelization");
    }
}
