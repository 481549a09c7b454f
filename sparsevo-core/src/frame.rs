use sophus::lie::Isometry3F64;

use crate::framepoint::PointHypothesis;

/// A camera frame retained by the upstream optimizer as a reference for
/// ongoing tracking. Borrowed by output backends for the duration of one
/// publish call, never mutated by them.
pub struct Keyframe {
    pub id: u64,
    pub timestamp: f64,

    pub pose_valid: bool,
    pub camera_to_world: Isometry3F64,

    // only these points are geometrically final enough to export
    pub marginalized_points: Vec<PointHypothesis>,
}

impl Keyframe {
    pub fn new(id: u64, timestamp: f64, camera_to_world: Isometry3F64) -> Self {
        Self {
            id,
            timestamp,
            pose_valid: true,
            camera_to_world,
            marginalized_points: Vec::new(),
        }
    }
}
