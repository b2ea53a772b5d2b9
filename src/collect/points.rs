use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use geo::Point;
use geojson::GeoJson;

/// One lidar-derived height sample. Geometry and timestamp are immutable;
/// the attribute map grows as covariates are attached.
#[derive(Debug, Clone)]
pub struct PointSample {
    id: String,
    geometry: Point<f64>,
    timestamp: DateTime<Utc>,
    pub attributes: BTreeMap<String, Option<f64>>,
}

impl PointSample {
    pub fn new(id: impl Into<String>, geometry: Point<f64>, timestamp: DateTime<Utc>) -> Self {
        PointSample {
            id: id.into(),
            geometry,
            timestamp,
            attributes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn geometry(&self) -> Point<f64> {
        self.geometry
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.attributes.insert(name.into(), value);
    }

    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied().flatten()
    }
}

/// Point-dataset provider, addressed by a stored asset identifier.
pub trait PointSource: Sync {
    fn load(&self, asset_id: &str) -> Result<Vec<PointSample>>;
}

/// Reads a point asset from `<root>/<asset_id>.geojson`. Expects Point
/// features with a `date` property (YYYY-MM-DD); numeric properties become
/// initial attributes.
pub struct GeoJsonPointSource {
    root: PathBuf,
}

impl GeoJsonPointSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        GeoJsonPointSource { root: root.into() }
    }
}

impl PointSource for GeoJsonPointSource {
    fn load(&self, asset_id: &str) -> Result<Vec<PointSample>> {
        let path = self.root.join(format!("{}.geojson", asset_id));
        let raw = std::fs::read_to_string(&path)
            .context(format!("Failed to read point asset {:?}", path))?;
        let geojson: GeoJson = raw
            .parse()
            .context(format!("Failed to parse GeoJSON in {:?}", path))?;

        let GeoJson::FeatureCollection(fc) = geojson else {
            anyhow::bail!("Point asset {:?} is not a FeatureCollection", path);
        };

        let mut samples = Vec::with_capacity(fc.features.len());
        for (index, feature) in fc.features.iter().enumerate() {
            let Some(geometry) = feature.geometry.as_ref() else {
                continue;
            };
            let geojson::Value::Point(coords) = &geometry.value else {
                continue;
            };
            let point = Point::new(coords[0], coords[1]);

            let date = feature
                .properties
                .as_ref()
                .and_then(|p| p.get("date"))
                .and_then(|v| v.as_str())
                .context(format!("Feature {} has no 'date' property", index))?;
            let timestamp = parse_sample_date(date)
                .context(format!("Feature {} has an unparsable date '{}'", index, date))?;

            let id = feature
                .id
                .as_ref()
                .map(|id| match id {
                    geojson::feature::Id::String(s) => s.clone(),
                    geojson::feature::Id::Number(n) => n.to_string(),
                })
                .unwrap_or_else(|| index.to_string());

            let mut sample = PointSample::new(id, point, timestamp);
            if let Some(props) = feature.properties.as_ref() {
                for (key, value) in props {
                    if key == "date" {
                        continue;
                    }
                    if let Some(number) = value.as_f64() {
                        sample.set_attribute(key.clone(), Some(number));
                    }
                }
            }
            samples.push(sample);
        }
        Ok(samples)
    }
}

fn parse_sample_date(date: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
    let midnight = naive
        .and_hms_opt(0, 0, 0)
        .context("invalid midnight timestamp")?;
    Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
}

/// In-memory point assets, for tests and local runs.
#[derive(Default)]
pub struct InMemoryPointSource {
    assets: HashMap<String, Vec<PointSample>>,
}

impl InMemoryPointSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset_id: impl Into<String>, samples: Vec<PointSample>) {
        self.assets.insert(asset_id.into(), samples);
    }
}

impl PointSource for InMemoryPointSource {
    fn load(&self, asset_id: &str) -> Result<Vec<PointSample>> {
        self.assets
            .get(asset_id)
            .cloned()
            .context(format!("Unknown point asset '{}'", asset_id))
    }
}
