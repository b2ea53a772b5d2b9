use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RasterLayer;
use crate::extract::window::TemporalWindow;
use crate::geo_core::BoundingBox;

/// Orbit direction of a radar acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbitPass {
    Ascending,
    Descending,
}

/// Radar instrument acquisition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentMode {
    /// Interferometric Wide swath.
    Iw,
    /// Extra Wide swath.
    Ew,
    /// StripMap.
    Sm,
}

/// Transmit/receive polarisation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarization {
    Vv,
    Vh,
    Hh,
    Hv,
}

impl Polarization {
    /// Band name the channel is stored under.
    pub fn band_name(&self) -> &'static str {
        match self {
            Polarization::Vv => "VV",
            Polarization::Vh => "VH",
            Polarization::Hh => "HH",
            Polarization::Hv => "HV",
        }
    }
}

/// Per-scene acquisition metadata, filterable server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMeta {
    /// Encoded scene/asset identifier.
    pub id: String,
    pub acquired: DateTime<Utc>,
    pub cloudy_pixel_percentage: Option<f64>,
    pub polarisations: Vec<Polarization>,
    pub instrument_mode: Option<InstrumentMode>,
    pub orbit_pass: Option<OrbitPass>,
}

impl SceneMeta {
    pub fn new(id: impl Into<String>, acquired: DateTime<Utc>) -> Self {
        SceneMeta {
            id: id.into(),
            acquired,
            cloudy_pixel_percentage: None,
            polarisations: Vec::new(),
            instrument_mode: None,
            orbit_pass: None,
        }
    }
}

/// One raster acquisition inside a time series.
#[derive(Debug, Clone)]
pub struct Scene {
    pub meta: SceneMeta,
    pub layer: RasterLayer,
}

/// Metadata predicates applied when filtering a series. Every `None`/empty
/// field is a wildcard. Passes are never split: a filter listing both orbit
/// passes keeps one pooled set.
#[derive(Debug, Clone, Default)]
pub struct SceneFilter {
    pub window: Option<TemporalWindow>,
    pub bounds: Option<BoundingBox>,
    /// Restrict to these identifiers. `Some(vec![])` matches nothing;
    /// `None` is the wildcard.
    pub ids: Option<Vec<String>>,
    /// Delivery resolution requested from the provider, in target-CRS
    /// length units per pixel.
    pub scale: Option<f64>,
    pub max_cloud_pct: Option<f64>,
    pub required_polarisations: Vec<Polarization>,
    pub instrument_mode: Option<InstrumentMode>,
    pub orbit_passes: Vec<OrbitPass>,
}

impl SceneFilter {
    pub fn matches(&self, scene: &Scene) -> bool {
        let meta = &scene.meta;
        if let Some(window) = &self.window {
            if !window.contains(meta.acquired) {
                return false;
            }
        }
        if let Some(bounds) = &self.bounds {
            if !bounds.intersects(&scene.layer.grid().extent()) {
                return false;
            }
        }
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| id == &meta.id) {
                return false;
            }
        }
        if let Some(scale) = self.scale {
            if scene.layer.grid().pixel_size != scale {
                return false;
            }
        }
        if let Some(max) = self.max_cloud_pct {
            // A scene without a cloud score cannot prove it is clear enough.
            match meta.cloudy_pixel_percentage {
                Some(pct) if pct < max => {}
                _ => return false,
            }
        }
        for pol in &self.required_polarisations {
            if !meta.polarisations.contains(pol) {
                return false;
            }
        }
        if let Some(mode) = self.instrument_mode {
            if meta.instrument_mode != Some(mode) {
                return false;
            }
        }
        if !self.orbit_passes.is_empty() {
            match meta.orbit_pass {
                Some(pass) if self.orbit_passes.contains(&pass) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Acquisition-time-ordered scene collection.
#[derive(Debug, Clone, Default)]
pub struct RasterTimeSeries {
    scenes: Vec<Scene>,
}

impl RasterTimeSeries {
    pub fn new(mut scenes: Vec<Scene>) -> Self {
        scenes.sort_by_key(|s| s.meta.acquired);
        RasterTimeSeries { scenes }
    }

    pub fn push(&mut self, scene: Scene) {
        let at = self
            .scenes
            .partition_point(|s| s.meta.acquired <= scene.meta.acquired);
        self.scenes.insert(at, scene);
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn filter(&self, filter: &SceneFilter) -> Vec<&Scene> {
        self.scenes.iter().filter(|s| filter.matches(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridSpec;
    use chrono::TimeZone;

    fn scene(id: &str, day: u32, pass: OrbitPass) -> Scene {
        let mut meta = SceneMeta::new(id, Utc.with_ymd_and_hms(2022, 7, day, 0, 0, 0).unwrap());
        meta.polarisations = vec![Polarization::Vv, Polarization::Vh];
        meta.instrument_mode = Some(InstrumentMode::Iw);
        meta.orbit_pass = Some(pass);
        Scene {
            meta,
            layer: RasterLayer::new(GridSpec::new(5070, 0.0, 100.0, 25.0, 4, 4)),
        }
    }

    #[test]
    fn test_series_is_time_ordered() {
        let mut series = RasterTimeSeries::new(vec![
            scene("b", 20, OrbitPass::Ascending),
            scene("a", 5, OrbitPass::Descending),
        ]);
        series.push(scene("c", 12, OrbitPass::Ascending));
        let ids: Vec<&str> = series.scenes().iter().map(|s| s.meta.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_filter_pools_both_passes() {
        let series = RasterTimeSeries::new(vec![
            scene("asc", 5, OrbitPass::Ascending),
            scene("desc", 6, OrbitPass::Descending),
        ]);
        let filter = SceneFilter {
            required_polarisations: vec![Polarization::Vv, Polarization::Vh],
            instrument_mode: Some(InstrumentMode::Iw),
            orbit_passes: vec![OrbitPass::Ascending, OrbitPass::Descending],
            ..SceneFilter::default()
        };
        assert_eq!(series.filter(&filter).len(), 2);
    }

    #[test]
    fn test_filter_cloud_percentage_requires_score() {
        let mut cloudy = scene("cloudy", 5, OrbitPass::Ascending);
        cloudy.meta.cloudy_pixel_percentage = Some(45.0);
        let mut unscored = scene("unscored", 6, OrbitPass::Ascending);
        unscored.meta.cloudy_pixel_percentage = None;
        let mut clear = scene("clear", 7, OrbitPass::Ascending);
        clear.meta.cloudy_pixel_percentage = Some(3.0);

        let series = RasterTimeSeries::new(vec![cloudy, unscored, clear]);
        let filter = SceneFilter {
            max_cloud_pct: Some(20.0),
            ..SceneFilter::default()
        };
        let kept = series.filter(&filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].meta.id, "clear");
    }

    #[test]
    fn test_filter_restricts_to_listed_identifiers() {
        let series = RasterTimeSeries::new(vec![
            scene("keep", 5, OrbitPass::Ascending),
            scene("drop", 6, OrbitPass::Ascending),
        ]);
        let filter = SceneFilter {
            ids: Some(vec!["keep".to_string()]),
            ..SceneFilter::default()
        };
        let kept = series.filter(&filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].meta.id, "keep");

        // An empty restriction matches nothing; no restriction matches all.
        let none = SceneFilter {
            ids: Some(Vec::new()),
            ..SceneFilter::default()
        };
        assert!(series.filter(&none).is_empty());
        assert_eq!(series.filter(&SceneFilter::default()).len(), 2);
    }

    #[test]
    fn test_filter_scale_excludes_other_resolutions() {
        let mut fine = scene("fine", 5, OrbitPass::Ascending);
        fine.layer = RasterLayer::new(GridSpec::new(5070, 0.0, 100.0, 10.0, 10, 10));
        let native = scene("native", 6, OrbitPass::Ascending);
        let series = RasterTimeSeries::new(vec![fine, native]);
        let filter = SceneFilter {
            scale: Some(25.0),
            ..SceneFilter::default()
        };
        let kept = series.filter(&filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].meta.id, "native");
    }

    #[test]
    fn test_filter_window_is_half_open() {
        let series = RasterTimeSeries::new(vec![
            scene("in", 10, OrbitPass::Ascending),
            scene("edge", 20, OrbitPass::Ascending),
        ]);
        let filter = SceneFilter {
            window: Some(TemporalWindow::new(
                Utc.with_ymd_and_hms(2022, 7, 10, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2022, 7, 20, 0, 0, 0).unwrap(),
            )),
            ..SceneFilter::default()
        };
        let kept = series.filter(&filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].meta.id, "in");
    }
}
