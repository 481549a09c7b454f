mod camera;
pub use camera::*;
mod output;
pub use output::*;
pub mod frame;
pub mod framepoint;
pub mod image;

use sophus::nalgebra::Vector3;

pub type Real = f64;
pub type PointCoordinates = Vector3<Real>;
