use anyhow::Result;
use chrono::NaiveDate;

use crate::errors::ExtractError;
use crate::raster::series::{RasterTimeSeries, SceneFilter};

/// Time-ordered scene catalogue, filterable server-side. `list_scene_ids`
/// is the one blocking round-trip the pipeline performs before building the
/// rest of the computation; `scenes` is evaluated lazily by the backend.
pub trait RasterSeriesProvider: Sync {
    fn list_scene_ids(&self, filter: &SceneFilter) -> Result<Vec<String>>;
    fn scenes(&self, filter: &SceneFilter) -> Result<RasterTimeSeries>;
}

/// Byte range of the `YYYYDDD` date inside an encoded granule asset path.
const ID_DATE_RANGE: std::ops::Range<usize> = 33..40;

/// Parse the acquisition date encoded in a scene identifier as `YYYYDDD`
/// (year + day of year) at a fixed offset of the asset path.
pub fn parse_acquisition_date(id: &str) -> Result<NaiveDate, ExtractError> {
    let malformed = || ExtractError::MalformedSceneId { id: id.to_string() };

    let encoded = id.get(ID_DATE_RANGE).ok_or_else(malformed)?;
    if !encoded.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let year: i32 = encoded[..4].parse().map_err(|_| malformed())?;
    let day_of_year: u32 = encoded[4..].parse().map_err(|_| malformed())?;
    NaiveDate::from_yo_opt(year, day_of_year).ok_or_else(malformed)
}

/// In-memory scene catalogue, for tests and local runs. Filtering happens
/// "server-side" here too: callers never see scenes outside the filter.
#[derive(Default)]
pub struct InMemorySceneStore {
    series: RasterTimeSeries,
}

impl InMemorySceneStore {
    pub fn new(series: RasterTimeSeries) -> Self {
        InMemorySceneStore { series }
    }
}

impl RasterSeriesProvider for InMemorySceneStore {
    fn list_scene_ids(&self, filter: &SceneFilter) -> Result<Vec<String>> {
        Ok(self
            .series
            .filter(filter)
            .into_iter()
            .map(|s| s.meta.id.clone())
            .collect())
    }

    fn scenes(&self, filter: &SceneFilter) -> Result<RasterTimeSeries> {
        let filtered = self.series.filter(filter).into_iter().cloned().collect();
        Ok(RasterTimeSeries::new(filtered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_acquisition_date() {
        // 2022 day 181 = 2022-06-30, encoded at the fixed asset-path offset.
        let id = "LARSE/GEDI/GEDI02_A_002/GEDI02_A_2022181054214_O19999";
        assert_eq!(&id[33..40], "2022181");
        let date = parse_acquisition_date(id).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2022, 6, 30).unwrap());
    }

    #[test]
    fn test_short_identifier_is_malformed() {
        let err = parse_acquisition_date("too-short").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedSceneId { .. }));
    }

    #[test]
    fn test_non_numeric_date_field_is_malformed() {
        let id = "LARSE/GEDI/GEDI02_A_002/GEDI02_A_XXXX181054214_O19999";
        assert!(parse_acquisition_date(id).is_err());
    }

    #[test]
    fn test_day_out_of_range_is_malformed() {
        let id = "LARSE/GEDI/GEDI02_A_002/GEDI02_A_2022999054214_O19999";
        assert!(parse_acquisition_date(id).is_err());
    }
}
