pub mod collect;
pub mod config;
pub mod errors;
pub mod extract;
pub mod geo_core;
pub mod pipeline;
pub mod raster;

pub use config::{PipelineConfig, Sensor};
pub use errors::ExtractError;
pub use pipeline::export::{Destination, ExportFormat};
pub use pipeline::FeaturePipeline;
