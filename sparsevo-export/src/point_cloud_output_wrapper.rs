use std::path::PathBuf;

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use serde::Deserialize;

use sparsevo_core::{
    frame::Keyframe, image::DepthImage, Camera, GraphEdge, OutputWrapper,
};

use crate::{
    coordinate_projector::CoordinateProjector,
    point_cloud_sink::PointCloudSink,
    point_filter::{PointFilter, PointFilterCfg, SettingsError},
};

// diagnostic callbacks log at most this many records per invocation
const MAX_DIAGNOSTIC_RECORDS: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct PointCloudOutputWrapperCfg {
    pub settings_path: PathBuf,
    pub output_path: PathBuf,
    pub rng_seed: u64,
    pub enabled: bool,
}

impl Default for PointCloudOutputWrapperCfg {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("settings_pc.txt"),
            output_path: PathBuf::from("pointcloud.txt"),
            rng_seed: 0,
            enabled: true,
        }
    }
}

impl PointCloudOutputWrapperCfg {
    pub fn finalize(self) -> Result<PointCloudOutputWrapper> {
        let settings = PointFilterCfg::load(&self.settings_path)?;
        let mut sink = PointCloudSink::create(&self.output_path)?;
        sink.set_enabled(self.enabled);

        log::info!(
            "point cloud export configured: settings {}, output {}",
            self.settings_path.display(),
            self.output_path.display()
        );

        Ok(PointCloudOutputWrapper {
            settings_path: self.settings_path,
            filter: PointFilter::new(settings),
            sink,
            rng: StdRng::seed_from_u64(self.rng_seed),
        })
    }
}

/// Output backend that turns final keyframe batches into a filtered
/// world-frame point cloud file.
///
/// Invoked synchronously by the host pipeline; it blocks the calling thread
/// for the duration of settings I/O, filtering, projection and sink writes,
/// and processes keyframes and points in collection order.
pub struct PointCloudOutputWrapper {
    settings_path: PathBuf,
    filter: PointFilter,
    sink: PointCloudSink,
    rng: StdRng,
}

impl PointCloudOutputWrapper {
    /// Re-reads the filter thresholds from the settings file, so edits take
    /// effect between batches. Runs at the start of every final publish.
    pub fn reload_settings(&mut self) -> Result<(), SettingsError> {
        let settings = PointFilterCfg::load(&self.settings_path)?;
        log::debug!("filter settings reloaded: {settings:?}");
        self.filter = PointFilter::new(settings);
        Ok(())
    }

    pub fn sink(&self) -> &PointCloudSink {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut PointCloudSink {
        &mut self.sink
    }

    pub fn points_exported(&self) -> usize {
        self.sink.points_written()
    }

    /// Flushes and closes the sink. Call at shutdown; idempotent.
    pub fn flush_and_close(&mut self) {
        self.sink.flush_and_close();
    }
}

impl OutputWrapper for PointCloudOutputWrapper {
    fn publish_graph(&mut self, edges: &[GraphEdge]) {
        for edge in edges.iter().take(MAX_DIAGNOSTIC_RECORDS) {
            log::debug!(
                "graph edge {} -> {}: {} active, {} marginalized residuals",
                edge.host_frame,
                edge.target_frame,
                edge.active_residuals,
                edge.marginalized_residuals
            );
        }
    }

    fn publish_keyframes(
        &mut self,
        frames: &[Keyframe],
        is_final: bool,
        camera: &dyn Camera,
    ) -> Result<()> {
        // non-final batches are not yet safe to export
        if !is_final {
            return Ok(());
        }

        self.reload_settings()?;
        let projector = CoordinateProjector::new(camera);

        for frame in frames {
            if !frame.pose_valid {
                log::trace!("skipping keyframe {} without a valid pose", frame.id);
                continue;
            }

            for point in &frame.marginalized_points {
                if point.inverse_depth <= 0.0 {
                    continue;
                }
                let depth = 1.0 / point.inverse_depth;

                if !self.filter.admit(point, depth, &mut self.rng) {
                    continue;
                }

                let world_point = projector.project(point, depth, &frame.camera_to_world);
                self.sink.write(&world_point);
            }
        }

        Ok(())
    }

    fn publish_camera_pose(&mut self, frame: &Keyframe, _camera: &dyn Camera) {
        log::trace!(
            "camera pose for frame {} (time {}): {:?}",
            frame.id,
            frame.timestamp,
            frame.camera_to_world.matrix()
        );
    }

    fn push_depth_image_float(&mut self, image: &DepthImage, frame: &Keyframe) {
        let mut remaining = MAX_DIAGNOSTIC_RECORDS;
        for y in 0..image.height() {
            for x in 0..image.width() {
                if image.at(x, y) <= 0.0 {
                    continue;
                }
                log::trace!(
                    "keyframe {} inverse depth at ({x},{y}): {}",
                    frame.id,
                    image.at(x, y)
                );
                remaining -= 1;
                if remaining == 0 {
                    return;
                }
            }
        }
    }

    fn needs_depth_image(&self) -> bool {
        false
    }
}
