//! Orthographic capture camera for the axis-aligned sweeps.

use glam::{Mat4, Vec3};

/// Axis of an orthographic sweep, in canonical sweep order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SweepAxis {
    Y,
    Z,
    X,
}

impl SweepAxis {
    /// The canonical sweep order: Y, then Z, then X.
    pub const ORDER: [SweepAxis; 3] = [SweepAxis::Y, SweepAxis::Z, SweepAxis::X];

    pub fn index(self) -> usize {
        match self {
            SweepAxis::Y => 0,
            SweepAxis::Z => 1,
            SweepAxis::X => 2,
        }
    }

    /// Capture pose for this axis: positioned on the positive side of the
    /// voxelized bounding volume, looking down the axis through the origin.
    /// The up vectors match the original sweep so texel addressing is
    /// stable between runs.
    pub fn pose(self, half_extent: f32) -> CameraPose {
        let (position, forward, up) = match self {
            SweepAxis::Y => (Vec3::Y * half_extent, -Vec3::Y, -Vec3::X),
            SweepAxis::Z => (Vec3::Z * half_extent, -Vec3::Z, Vec3::Y),
            SweepAxis::X => (Vec3::X * half_extent, -Vec3::X, Vec3::Y),
        };
        CameraPose { position, forward, up }
    }
}

/// Position and orientation of the capture camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

/// Orthographic camera whose frustum is the voxelized bounding volume.
///
/// View and projection matrices are cached; setting a new pose rebuilds
/// them.
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    pose: CameraPose,
    half_extent: f32,
    view: Mat4,
    proj: Mat4,
    view_proj: Mat4,
    inv_view_proj: Mat4,
}

impl OrthographicCamera {
    pub fn new(pose: CameraPose, half_extent: f32) -> Self {
        let mut camera = Self {
            pose,
            half_extent,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
            inv_view_proj: Mat4::IDENTITY,
        };
        camera.update_matrices();
        camera
    }

    pub fn set_pose(&mut self, pose: CameraPose) {
        self.pose = pose;
        self.update_matrices();
    }

    fn update_matrices(&mut self) {
        let h = self.half_extent;
        self.view = Mat4::look_to_rh(self.pose.position, self.pose.forward, self.pose.up);
        // Depth range [0, 1], spanning the full volume along the view
        // direction.
        self.proj = Mat4::orthographic_rh(-h, h, -h, h, 0.0, 2.0 * h);
        self.view_proj = self.proj * self.view;
        self.inv_view_proj = self.view_proj.inverse();
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn proj(&self) -> Mat4 {
        self.proj
    }

    /// Combined view-projection matrix mapping world space to clip space.
    pub fn view_proj(&self) -> Mat4 {
        self.view_proj
    }

    /// Inverse view-projection matrix, used by the scatter pass to
    /// reconstruct world positions from captured depth.
    pub fn inv_view_proj(&self) -> Mat4 {
        self.inv_view_proj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4, Vec4Swizzles};

    const HALF_EXTENT: f32 = 3.5;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn poses_are_orthonormal() {
        for axis in SweepAxis::ORDER {
            let pose = axis.pose(HALF_EXTENT);
            assert!((pose.forward.length() - 1.0).abs() < 1e-6);
            assert!((pose.up.length() - 1.0).abs() < 1e-6);
            assert!(pose.forward.dot(pose.up).abs() < 1e-6);
        }
    }

    #[test]
    fn poses_look_through_the_origin() {
        for axis in SweepAxis::ORDER {
            let pose = axis.pose(HALF_EXTENT);
            assert_close(pose.position + pose.forward * HALF_EXTENT, Vec3::ZERO);
        }
    }

    #[test]
    fn origin_projects_to_ndc_center() {
        for axis in SweepAxis::ORDER {
            let camera = OrthographicCamera::new(axis.pose(HALF_EXTENT), HALF_EXTENT);
            let clip = camera.view_proj() * Vec4::new(0.0, 0.0, 0.0, 1.0);
            assert_close(clip.xyz() / clip.w, Vec3::new(0.0, 0.0, 0.5));
        }
    }

    #[test]
    fn unprojection_round_trips() {
        for axis in SweepAxis::ORDER {
            let camera = OrthographicCamera::new(axis.pose(HALF_EXTENT), HALF_EXTENT);
            for world in [
                Vec3::new(0.3, -1.2, 2.0),
                Vec3::new(-3.0, 3.0, -3.0),
                Vec3::new(1.0, 1.0, 1.0),
            ] {
                let clip = camera.view_proj() * world.extend(1.0);
                let ndc = clip.xyz() / clip.w;
                // Inside the frustum on every axis.
                assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
                assert!((0.0..=1.0).contains(&ndc.z));

                let back = camera.inv_view_proj() * ndc.extend(1.0);
                assert_close(back.xyz() / back.w, world);
            }
        }
    }

    #[test]
    fn sweep_order_matches_indices() {
        assert_eq!(SweepAxis::ORDER[0].index(), 0);
        assert_eq!(SweepAxis::ORDER[1].index(), 1);
        assert_eq!(SweepAxis::ORDER[2].index(), 2);
    }
}
