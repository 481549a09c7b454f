use sophus::{
    core::linalg::VecF64, image::ImageSize,
    sensor::camera_enum::perspective_camera::PinholeCameraF64,
};

use sparsevo_core::Real;

#[derive(Clone, Debug)]
pub struct PinholeCamera {
    pub model: PinholeCameraF64,
}

impl sparsevo_core::Camera for PinholeCamera {
    fn cols(&self) -> usize {
        self.model.image_size().width
    }

    fn rows(&self) -> usize {
        self.model.image_size().height
    }

    fn fx(&self) -> Real {
        self.model.params()[0]
    }

    fn fy(&self) -> Real {
        self.model.params()[1]
    }

    fn cx(&self) -> Real {
        self.model.params()[2]
    }

    fn cy(&self) -> Real {
        self.model.params()[3]
    }
}

impl PinholeCamera {
    pub fn new(model: PinholeCameraF64) -> Self {
        let params = model.params();
        assert!(params[0] > 0.0 && params[1] > 0.0, "focal lengths must be positive");

        Self { model }
    }

    pub fn from_params(fx: Real, fy: Real, cx: Real, cy: Real, image_size: ImageSize) -> Self {
        Self::new(PinholeCameraF64::from_params_and_size(
            &VecF64::<4>::new(fx, fy, cx, cy),
            image_size,
        ))
    }
}
