use vxgi::{types::VolumeDimensions, InitializationError, MaterialRegistry};
use vxgi_routine::{VoxelizeRoutine, DEFAULT_HALF_EXTENT};
use vxgi_test::test_attr;

#[test_attr]
pub async fn routine_construction_fails_without_materials() -> anyhow::Result<()> {
    let Ok(iad) = vxgi::create_iad(None, None).await else {
        return Ok(());
    };

    // The routine borrows its materials from the caller's registry; an
    // empty one must fail the lookup rather than register on its own.
    let registry = MaterialRegistry::new();
    let dimensions = VolumeDimensions::new(64)?;

    let result = VoxelizeRoutine::new(&iad.device, &iad.queue, &registry, dimensions, DEFAULT_HALF_EXTENT, 0);
    assert!(matches!(result, Err(InitializationError::MaterialLookup(_))));

    Ok(())
}
