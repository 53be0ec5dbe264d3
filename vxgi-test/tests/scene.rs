use glam::{Mat4, Vec3, Vec4};
use vxgi_test::{scene, test_attr, xy_quad, TestRunner};

const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

#[test_attr]
pub async fn quad_voxelizes_into_one_slice() -> anyhow::Result<()> {
    let Ok(mut runner) = TestRunner::builder().build().await else {
        return Ok(());
    };

    // Place the quad at the world-space center of grid cell z = 40 of 64,
    // so depth reconstruction error cannot move it into a neighbor:
    // (40.5 / 64 - 0.5) * 7.
    let quad = xy_quad(0.9296875, 3.0, Mat4::IDENTITY, RED);
    let gpu_scene = runner.upload(&scene(vec![quad]));
    runner.voxelize(&gpu_scene);

    let albedo = runner.read_albedo_level(0).await?;
    let mut hits = 0u32;
    for z in 0..albedo.dim {
        for y in 0..albedo.dim {
            for x in 0..albedo.dim {
                let texel = albedo.texel(x, y, z);
                if texel != [0, 0, 0, 0] {
                    // Only the Z-axis sweep sees the quad face-on, so every
                    // write lands on its plane, in the captured color.
                    assert_eq!(z, 40, "voxel outside the quad's slice at ({x}, {y}, {z})");
                    assert_eq!(texel, [255, 0, 0, 255]);
                    hits += 1;
                }
            }
        }
    }
    // The quad covers 6/7ths of the capture frustum in x and y.
    assert!(hits > 1000, "expected a filled slice, got {hits} voxels");

    let normal = runner.read_normal_level(0).await?;
    assert!(!normal.is_zeroed(), "quad produced no normals");

    // Downsampling carries the slice into the mip chain.
    let mip = runner.read_albedo_level(1).await?;
    assert!(!mip.is_zeroed(), "albedo level 1 not regenerated");

    Ok(())
}

#[test_attr]
pub async fn geometry_outside_the_volume_is_ignored() -> anyhow::Result<()> {
    let Ok(mut runner) = TestRunner::builder().build().await else {
        return Ok(());
    };

    // Entirely outside the [-3.5, 3.5] capture region on x.
    let transform = Mat4::from_translation(Vec3::new(100.0, 0.0, 0.0));
    let quad = xy_quad(0.0, 3.0, transform, RED);
    let gpu_scene = runner.upload(&scene(vec![quad]));
    runner.voxelize(&gpu_scene);

    let albedo = runner.read_albedo_level(0).await?;
    assert!(albedo.is_zeroed(), "out-of-volume geometry was voxelized");
    let normal = runner.read_normal_level(0).await?;
    assert!(normal.is_zeroed());

    Ok(())
}
