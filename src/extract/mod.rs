pub mod batch;
pub mod window;
pub mod zonal;
