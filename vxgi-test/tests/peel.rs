use glam::{Mat4, Vec4};
use vxgi_test::{scene, test_attr, yz_quad, TestRunner};

#[test_attr]
pub async fn peel_layers_capture_front_to_back() -> anyhow::Result<()> {
    let Ok(mut runner) = TestRunner::builder().build().await else {
        return Ok(());
    };

    // Two quads facing the X-axis camera, which runs last, so its capture
    // is what the layers hold after the sweep. The camera sits at +3.5
    // looking down -x over a [0, 7] depth range.
    let near = yz_quad(1.0, 3.0, Mat4::IDENTITY, Vec4::new(1.0, 0.0, 0.0, 1.0));
    let far = yz_quad(-1.0, 3.0, Mat4::IDENTITY, Vec4::new(0.0, 0.0, 1.0, 1.0));
    let gpu_scene = runner.upload(&scene(vec![near, far]));
    runner.voxelize(&gpu_scene);

    let layer0 = runner.read_layer_depth(0).await?;
    let layer1 = runner.read_layer_depth(1).await?;
    let layer2 = runner.read_layer_depth(2).await?;

    // Both quads cover the frustum center.
    let center = layer0.dim / 2;
    assert!(
        (layer0.depth(center, center) - 2.5 / 7.0).abs() < 1e-3,
        "layer 0 captured depth {}",
        layer0.depth(center, center)
    );
    assert!(
        (layer1.depth(center, center) - 4.5 / 7.0).abs() < 1e-3,
        "layer 1 captured depth {}",
        layer1.depth(center, center)
    );
    // Only two surfaces exist along x, so the third layer stays cleared.
    assert_eq!(layer2.depth(center, center), 1.0);

    // Peeling is strictly front to back everywhere, not just at the
    // center: any texel captured in layer 1 lies behind its layer 0 value.
    for y in 0..layer0.dim {
        for x in 0..layer0.dim {
            let first = layer0.depth(x, y);
            let second = layer1.depth(x, y);
            if second < 1.0 {
                assert!(
                    first < second,
                    "layer order violated at ({x}, {y}): {first} >= {second}"
                );
            }
        }
    }

    Ok(())
}
