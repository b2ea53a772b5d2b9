pub mod points;
pub mod scenes;
pub mod statics;

pub use points::{PointSample, PointSource};
pub use scenes::RasterSeriesProvider;
pub use statics::StaticRasterSource;
