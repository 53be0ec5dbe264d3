//! Math utilities, including the CPU mirror of the scatter shader's
//! world-to-voxel-grid mapping.

use glam::{UVec3, Vec3};

/// Rounds up `src` to the power of two `factor`.
pub fn round_up_pot(src: u32, factor: u32) -> u32 {
    debug_assert_eq!(factor.count_ones(), 1); // .is_power_of_two()
    let minus1 = factor - 1;
    (src + minus1) & !minus1
}

/// Performs integer division between a and b rounding up, instead of down.
pub fn round_up_div(a: u32, b: u32) -> u32 {
    (a + (b - 1)) / b
}

/// Maps a world-space position into a voxel cell of a cubic grid of `dim`
/// cells spanning `[-half_extent, half_extent]` on every axis.
///
/// Returns `None` when the position lies outside the grid. This must stay
/// in lockstep with the mapping in `voxel_scatter.wgsl`.
pub fn world_to_voxel(world: Vec3, half_extent: f32, dim: u32) -> Option<UVec3> {
    let normalized = world / (2.0 * half_extent) + Vec3::splat(0.5);
    if normalized.cmplt(Vec3::ZERO).any() || normalized.cmpge(Vec3::ONE).any() {
        return None;
    }
    let scaled = normalized * dim as f32;
    Some(UVec3::new(scaled.x as u32, scaled.y as u32, scaled.z as u32).min(UVec3::splat(dim - 1)))
}

/// World-space center of the given voxel cell. Inverse of
/// [`world_to_voxel`] up to half a cell of quantization.
pub fn voxel_center_to_world(voxel: UVec3, half_extent: f32, dim: u32) -> Vec3 {
    let normalized = (voxel.as_vec3() + Vec3::splat(0.5)) / dim as f32;
    (normalized - Vec3::splat(0.5)) * 2.0 * half_extent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up() {
        assert_eq!(round_up_div(63, 8), 8);
        assert_eq!(round_up_div(64, 8), 8);
        assert_eq!(round_up_div(65, 8), 9);
        assert_eq!(round_up_pot(3, 4), 4);
        assert_eq!(round_up_pot(256, 256), 256);
    }

    #[test]
    fn world_to_voxel_round_trip() {
        let half_extent = 3.5;
        let dim = 64;
        for voxel in [
            UVec3::new(0, 0, 0),
            UVec3::new(31, 31, 31),
            UVec3::new(63, 0, 12),
            UVec3::new(63, 63, 63),
        ] {
            let world = voxel_center_to_world(voxel, half_extent, dim);
            assert_eq!(world_to_voxel(world, half_extent, dim), Some(voxel));
        }
    }

    #[test]
    fn world_to_voxel_contains_point() {
        // A point must land in the cell whose bounds contain it.
        let half_extent = 3.5;
        let dim = 64;
        let cell_size = 2.0 * half_extent / dim as f32;

        let point = Vec3::new(0.1, -1.3, 2.9);
        let voxel = world_to_voxel(point, half_extent, dim).unwrap();
        let min = voxel.as_vec3() * cell_size - Vec3::splat(half_extent);
        let max = min + Vec3::splat(cell_size);
        assert!(point.cmpge(min).all() && point.cmplt(max).all());
    }

    #[test]
    fn world_to_voxel_boundaries() {
        let half_extent = 3.5;
        let dim = 64;

        // The lower corner is inside, the upper corner is outside the
        // half-open grid.
        assert_eq!(
            world_to_voxel(Vec3::splat(-3.5), half_extent, dim),
            Some(UVec3::ZERO)
        );
        assert_eq!(world_to_voxel(Vec3::splat(3.5), half_extent, dim), None);
        assert_eq!(world_to_voxel(Vec3::new(4.0, 0.0, 0.0), half_extent, dim), None);
        assert_eq!(world_to_voxel(Vec3::new(0.0, -5.1, 0.0), half_extent, dim), None);
    }
}
