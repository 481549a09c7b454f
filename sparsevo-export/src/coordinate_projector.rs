use sophus::{lie::Isometry3F64, nalgebra::Vector4};

use sparsevo_core::{framepoint::PointHypothesis, Camera, PointCoordinates, Real};

/// Back-projects admitted pixels into the world frame.
///
/// The unprojection parameters are derived once per publish batch from the
/// camera intrinsics.
pub struct CoordinateProjector {
    fxi: Real,
    fyi: Real,
    cxi: Real,
    cyi: Real,
}

impl CoordinateProjector {
    pub fn new(camera: &dyn Camera) -> Self {
        Self {
            fxi: 1.0 / camera.fx(),
            fyi: 1.0 / camera.fy(),
            cxi: -camera.cx() / camera.fx(),
            cyi: -camera.cy() / camera.fy(),
        }
    }

    /// Maps a pixel with a finite depth to world coordinates. Total for
    /// `depth > 0`.
    pub fn project(
        &self,
        point: &PointHypothesis,
        depth: Real,
        camera_to_world: &Isometry3F64,
    ) -> PointCoordinates {
        let x = (point.u * self.fxi + self.cxi) * depth;
        let y = (point.v * self.fyi + self.cyi) * depth;
        // z carries a small fx-dependent multiplicative bias instead of the
        // plain pinhole depth; kept as-is for output compatibility
        let z = depth * (1.0 + 2.0 * self.fxi);

        let world_point = camera_to_world.matrix() * Vector4::new(x, y, z, 1.0);

        PointCoordinates::new(world_point[0], world_point[1], world_point[2])
    }
}
