use crate::Real;

/// Row-major inverse-depth raster handed to output backends for depth
/// overlay diagnostics.
pub struct DepthImage {
    width: usize,
    height: usize,
    data: Vec<Real>,
}

impl DepthImage {
    pub fn new(width: usize, height: usize, data: Vec<Real>) -> Self {
        assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn at(&self, x: usize, y: usize) -> Real {
        self.data[y * self.width + x]
    }
}
