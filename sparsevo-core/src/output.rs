use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{frame::Keyframe, image::DepthImage, Camera};

/// One edge of the optimizer's keyframe connectivity graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub host_frame: u64,
    pub target_frame: u64,
    pub active_residuals: u32,
    pub marginalized_residuals: u32,
}

/// Callback surface the host pipeline drives after every optimizer step.
///
/// One implementation per output backend; the host holds them as trait
/// objects and invokes each callback synchronously. Backends override only
/// the callbacks they care about, the rest default to no-ops.
///
/// The host must not invoke the same backend instance concurrently from
/// multiple threads; a backend shared across threads has to be wrapped in a
/// mutex by its owner.
pub trait OutputWrapper {
    /// Connectivity-graph dump, diagnostic only.
    fn publish_graph(&mut self, _edges: &[GraphEdge]) {}

    /// Batch of keyframes from the optimizer. `is_final` marks batches whose
    /// marginalized points are safe to export.
    fn publish_keyframes(
        &mut self,
        frames: &[Keyframe],
        is_final: bool,
        camera: &dyn Camera,
    ) -> Result<()>;

    /// Current camera pose, visualization only.
    fn publish_camera_pose(&mut self, _frame: &Keyframe, _camera: &dyn Camera) {}

    /// Raw tracked frame, visualization only.
    fn push_live_frame(&mut self, _frame: &Keyframe) {}

    /// Rendered depth overlay, visualization only.
    fn push_depth_image(&mut self, _image: &DepthImage) {}

    /// Raw inverse-depth raster of a keyframe, visualization only.
    fn push_depth_image_float(&mut self, _image: &DepthImage, _frame: &Keyframe) {}

    /// Whether the host needs to compute the depth overlay for this backend.
    fn needs_depth_image(&self) -> bool {
        false
    }
}
