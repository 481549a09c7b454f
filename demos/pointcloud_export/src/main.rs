use anyhow::Result;
use sophus::{core::linalg::VecF64, image::ImageSize, lie::Isometry3F64};
use sparsevo_core::{frame::Keyframe, framepoint::PointHypothesis, GraphEdge, OutputWrapper};
use sparsevo_export::PointCloudOutputWrapperCfg;
use sparsevo_sensor::PinholeCamera;

// a fronto-parallel wall of marginalized points at roughly 2m depth
fn synthetic_keyframe(id: u64, camera_to_world: Isometry3F64) -> Keyframe {
    let mut frame = Keyframe::new(id, id as f64 * 0.1, camera_to_world);

    for row in 0..20 {
        for col in 0..30 {
            let u = 40.0 + col as f64 * 20.0;
            let v = 40.0 + row as f64 * 20.0;
            frame.marginalized_points.push(PointHypothesis {
                u,
                v,
                inverse_depth: 0.5 + 0.01 * (row as f64 - 10.0) / 10.0,
                // let confidence fall off towards the image border
                inverse_depth_information: 80.0 / (1.0 + (col as f64 - 15.0).abs()),
                max_relative_baseline: 0.4 + 0.03 * col as f64,
            });
        }
    }

    frame
}

fn main() -> Result<()> {
    env_logger::init();

    let cfg = PointCloudOutputWrapperCfg::default();
    std::fs::write(&cfg.settings_path, "1.0\n1e6\n0.5\n2\n")?;
    let mut wrapper = cfg.finalize()?;

    let camera = PinholeCamera::from_params(500.0, 500.0, 320.0, 240.0, ImageSize::new(640, 480));

    let mut frames = vec![
        synthetic_keyframe(0, Isometry3F64::identity()),
        synthetic_keyframe(1, Isometry3F64::from_translation(&VecF64::<3>::new(0.3, 0.0, 0.1))),
        synthetic_keyframe(2, Isometry3F64::from_translation(&VecF64::<3>::new(0.6, 0.0, 0.2))),
    ];
    // a keyframe the optimizer never managed to localize
    frames[2].pose_valid = false;

    wrapper.publish_graph(&[GraphEdge {
        host_frame: 0,
        target_frame: 1,
        active_residuals: 120,
        marginalized_residuals: 46,
    }]);

    // the optimizer hands over every batch, only final ones are exported
    wrapper.publish_keyframes(&frames, false, &camera)?;
    log::info!("points after non-final batch: {}", wrapper.points_exported());

    wrapper.publish_keyframes(&frames, true, &camera)?;
    log::info!("points after final batch: {}", wrapper.points_exported());

    wrapper.flush_and_close();

    Ok(())
}
