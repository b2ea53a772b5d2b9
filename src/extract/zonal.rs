use std::collections::BTreeMap;

use geo::{EuclideanDistance, Point};

use crate::geo_core::BoundingBox;
use crate::raster::RasterLayer;

/// Disc footprint around a projected point, used for zonal statistics.
#[derive(Debug, Clone, Copy)]
pub struct BufferRegion {
    center: Point<f64>,
    radius: f64,
}

impl BufferRegion {
    /// `center` must already be in the reduction CRS (equal-area).
    pub fn new(center: Point<f64>, radius: f64) -> Self {
        BufferRegion { center, radius }
    }

    pub fn center(&self) -> Point<f64> {
        self.center
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.center.euclidean_distance(&Point::new(x, y)) <= self.radius
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.center.x() - self.radius,
            self.center.y() - self.radius,
            self.center.x() + self.radius,
            self.center.y() + self.radius,
        )
    }
}

/// Per-band reduction statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Mean of defined pixel values inside the footprint.
    Mean,
    /// Value of the pixel containing the footprint center. Used for coded
    /// categorical bands where averaging class codes is meaningless.
    First,
}

/// Reduces raster bands over a point's buffer footprint into scalar
/// attributes keyed by band name.
#[derive(Debug, Clone, Default)]
pub struct ZonalExtractor {
    /// Bands reduced with `Reduction::First` instead of the mean.
    pub categorical_bands: Vec<String>,
}

impl ZonalExtractor {
    pub fn new(categorical_bands: Vec<String>) -> Self {
        ZonalExtractor { categorical_bands }
    }

    fn reduction_for(&self, band: &str) -> Reduction {
        if self.categorical_bands.iter().any(|b| b == band) {
            Reduction::First
        } else {
            Reduction::Mean
        }
    }

    /// One attribute entry per band. A footprint entirely outside the raster
    /// extent, or covering only missing pixels, yields missing values.
    pub fn extract(
        &self,
        layer: &RasterLayer,
        region: &BufferRegion,
    ) -> BTreeMap<String, Option<f64>> {
        let mut attributes = BTreeMap::new();
        for band in layer.band_names() {
            let value = match self.reduction_for(band) {
                Reduction::Mean => self.mean(layer, band, region),
                Reduction::First => self.first(layer, band, region),
            };
            attributes.insert(band.to_string(), value);
        }
        attributes
    }

    fn mean(&self, layer: &RasterLayer, band: &str, region: &BufferRegion) -> Option<f64> {
        let grid = layer.grid();
        let bounds = region.bounds();

        // Walk only the pixels under the footprint envelope.
        let min_col = ((bounds.min_x - grid.origin_x) / grid.pixel_size).floor().max(0.0) as usize;
        let max_col = (((bounds.max_x - grid.origin_x) / grid.pixel_size).ceil().max(0.0) as usize)
            .min(grid.width);
        let min_row = ((grid.origin_y - bounds.max_y) / grid.pixel_size).floor().max(0.0) as usize;
        let max_row = (((grid.origin_y - bounds.min_y) / grid.pixel_size).ceil().max(0.0) as usize)
            .min(grid.height);

        let mut sum = 0.0;
        let mut count = 0usize;
        for row in min_row..max_row {
            for col in min_col..max_col {
                let (x, y) = grid.pixel_center(col, row);
                if !region.contains(x, y) {
                    continue;
                }
                if let Some(value) = layer.value_at(band, col, row) {
                    sum += value;
                    count += 1;
                }
            }
        }
        if count == 0 {
            // A footprint narrower than one pixel captures no center at all;
            // fall back to the pixel under the footprint center, which is
            // what the reduction degenerates to at that size.
            return self.first(layer, band, region);
        }
        Some(sum / count as f64)
    }

    fn first(&self, layer: &RasterLayer, band: &str, region: &BufferRegion) -> Option<f64> {
        let center = region.center();
        let (col, row) = layer.grid().locate(center.x(), center.y())?;
        layer.value_at(band, col, row)
    }
}
