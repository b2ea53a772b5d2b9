use anyhow::{ensure, Result};

use crate::geo_core::BoundingBox;
use crate::raster::RasterLayer;

/// Terrain elevation band name.
pub const ELEVATION_BAND: &str = "elevation";
/// Terrain slope band name, delivered precomputed by the provider.
pub const SLOPE_BAND: &str = "Slope";

/// Static raster provider (coded land-cover classification, terrain),
/// queried by geographic bound. `scale` is the delivery resolution in
/// target-CRS length units per pixel; providers reduce native data to it,
/// never the other way around.
pub trait StaticRasterSource: Sync {
    fn fetch(&self, bounds: &BoundingBox, scale: f64) -> Result<RasterLayer>;
}

/// Wraps an already-materialized raster, for tests and local runs. The
/// wrapped grid must sit at the requested scale; there is no resampling.
pub struct InMemoryStaticRaster {
    layer: RasterLayer,
}

impl InMemoryStaticRaster {
    pub fn new(layer: RasterLayer) -> Self {
        InMemoryStaticRaster { layer }
    }
}

impl StaticRasterSource for InMemoryStaticRaster {
    fn fetch(&self, _bounds: &BoundingBox, scale: f64) -> Result<RasterLayer> {
        ensure!(
            self.layer.grid().pixel_size == scale,
            "raster is materialized at {} per pixel, not the requested {}",
            self.layer.grid().pixel_size,
            scale
        );
        Ok(self.layer.clone())
    }
}
