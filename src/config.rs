use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::window::{Aggregation, TemporalWindow};
use crate::geo_core::BoundingBox;

/// Sensor family driving band selection, metadata predicates and masking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sensor {
    /// Sentinel-1 GRD backscatter (VV/VH, dB).
    Radar,
    /// Sentinel-2 surface reflectance plus derived indices.
    Optical,
    /// Static elevation and slope.
    Terrain,
}

/// Limits of one submitted backend computation. A plan whose batches exceed
/// them is rejected before anything is evaluated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackendQuota {
    pub max_points_per_batch: usize,
}

impl Default for BackendQuota {
    fn default() -> Self {
        BackendQuota {
            max_points_per_batch: 5000,
        }
    }
}

/// Explicit run configuration handed to every component. One value per run,
/// no ambient shared state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Area of interest, in `source_epsg` coordinates.
    pub aoi: BoundingBox,
    /// CRS of incoming point geometries.
    pub source_epsg: i32,
    /// Equal-area CRS used for buffering and reduction.
    pub target_epsg: i32,
    /// Buffer disc radius around each point, in target-CRS length units.
    pub buffer_radius: f64,
    /// Reduction resolution requested from providers (coarser or equal to
    /// native source resolution).
    pub reduce_scale: f64,
    /// Cloud Score+ clear threshold applied per optical scene.
    pub clear_threshold: f64,
    /// Per-scene cloudy-pixel percentage cutoff for optical scenes.
    pub max_cloud_pct: f64,
    /// Land-cover class codes excluded by the mask builder.
    pub excluded_classes: Vec<u16>,
    /// Study period; also the window in fixed-campaign aggregation.
    pub campaign: TemporalWindow,
    pub sensor: Sensor,
    pub aggregation: Aggregation,
    /// Number of batches the point set is partitioned into.
    pub batch_count: usize,
    pub quota: BackendQuota,
    /// Bands reduced with nearest/first instead of mean.
    pub categorical_bands: Vec<String>,
    /// Probe the classification raster at each point into a "Map" attribute.
    pub attach_landcover_probe: bool,
}

/// Base optical reflectance bands.
pub const OPTICAL_BANDS: [&str; 10] = [
    "B2", "B3", "B4", "B5", "B6", "B7", "B8", "B8A", "B11", "B12",
];

/// Divisor converting digital numbers to [0, 1] reflectance.
pub const REFLECTANCE_SCALE: f64 = 10_000.0;

/// WorldCover class code for water bodies.
pub const CLASS_WATER: u16 = 80;
/// WorldCover class code for built-up areas.
pub const CLASS_BUILT_UP: u16 = 50;

/// Quality-score band name carried by optical scenes.
pub const QA_BAND: &str = "cs_cdf";
/// Coded classification band name.
pub const CLASSIFICATION_BAND: &str = "Map";

impl Default for PipelineConfig {
    fn default() -> Self {
        // 2022 campaign over the northeastern US study area.
        let campaign = TemporalWindow::new(
            Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 10, 31, 0, 0, 0).unwrap(),
        );
        PipelineConfig {
            aoi: BoundingBox::new(-80.0, 40.0, -66.8, 47.5),
            source_epsg: 4326,
            target_epsg: 5070,
            buffer_radius: 12.5,
            reduce_scale: 25.0,
            clear_threshold: 0.85,
            max_cloud_pct: 20.0,
            excluded_classes: vec![CLASS_BUILT_UP, CLASS_WATER],
            campaign,
            sensor: Sensor::Optical,
            aggregation: Aggregation::WindowedPerPoint {
                half_width_days: 15,
            },
            batch_count: 3,
            quota: BackendQuota::default(),
            categorical_bands: vec![CLASSIFICATION_BAND.to_string()],
            attach_landcover_probe: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_constants() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.target_epsg, 5070);
        assert_eq!(cfg.buffer_radius, 12.5);
        assert_eq!(cfg.reduce_scale, 25.0);
        assert_eq!(cfg.excluded_classes, vec![50, 80]);
        assert_eq!(cfg.batch_count, 3);
    }
}
