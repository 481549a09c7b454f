pub mod coordinate_projector;
pub mod point_cloud_sink;
pub mod point_filter;

mod point_cloud_output_wrapper;
pub use point_cloud_output_wrapper::{PointCloudOutputWrapper, PointCloudOutputWrapperCfg};
