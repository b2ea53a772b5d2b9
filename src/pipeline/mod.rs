pub mod export;

use std::collections::BTreeMap;
use std::ops::Range;

use anyhow::{Context, Result};
use chrono::NaiveDate;
#[cfg(feature = "indicatif")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(all(feature = "rayon", feature = "indicatif"))]
use std::sync::{Arc, Mutex};

use crate::collect::points::{PointSample, PointSource};
use crate::collect::scenes::{parse_acquisition_date, RasterSeriesProvider};
use crate::collect::statics::{StaticRasterSource, ELEVATION_BAND, SLOPE_BAND};
use crate::config::{
    PipelineConfig, Sensor, CLASSIFICATION_BAND, OPTICAL_BANDS, QA_BAND, REFLECTANCE_SCALE,
};
use crate::errors::ExtractError;
use crate::extract::batch::partition_batches;
use crate::extract::window::WindowResolver;
use crate::extract::zonal::{BufferRegion, ZonalExtractor};
use crate::geo_core::{transform_point, BoundingBox};
use crate::raster::composite::{CompositeBuilder, SceneMasker};
use crate::raster::indices::add_optical_indices;
use crate::raster::mask::{Mask, MaskBuilder};
use crate::raster::series::{
    InstrumentMode, OrbitPass, Polarization, RasterTimeSeries, Scene, SceneFilter,
};
use crate::raster::RasterLayer;
use export::{Destination, ExportFormat, ExportSink, FlatRecord};

/// Output of the synchronous plan phase: everything that must be known
/// before the batched computations are described.
#[derive(Debug)]
pub struct PipelinePlan {
    pub samples: Vec<PointSample>,
    pub batches: Vec<Range<usize>>,
    /// Scene identifiers resolved to acquisition dates inside the campaign.
    pub scene_dates: Vec<(String, NaiveDate)>,
    /// Identifiers skipped because no date could be parsed from them.
    pub malformed_ids: usize,
}

/// Per-run outcome. Failed batches are reported, never fatal to siblings.
#[derive(Debug, Default)]
pub struct RunReport {
    pub exported_batches: Vec<usize>,
    pub failed_batches: Vec<(usize, String)>,
    pub exported_records: usize,
}

/// Masks one optical scene from its linked quality band, combined with the
/// static classification raster when one is configured.
struct CloudScoreMasker {
    builder: MaskBuilder,
    classification: Option<RasterLayer>,
}

impl SceneMasker for CloudScoreMasker {
    fn mask_for(&self, scene: &Scene) -> Result<Option<Mask>> {
        let mask = match &self.classification {
            Some(classification) if classification.grid() == scene.layer.grid() => self
                .builder
                .build(classification, CLASSIFICATION_BAND, &scene.layer, QA_BAND)?,
            _ => self.builder.from_quality(&scene.layer, QA_BAND)?,
        };
        Ok(Some(mask))
    }
}

/// Sequences partitioning, window resolution, composite construction, zonal
/// extraction and flattening, then forwards each batch to the export sink.
pub struct FeaturePipeline<'a> {
    config: PipelineConfig,
    points: &'a dyn PointSource,
    series: Option<&'a dyn RasterSeriesProvider>,
    terrain: Option<&'a dyn StaticRasterSource>,
    classification: Option<&'a dyn StaticRasterSource>,
    sink: &'a dyn ExportSink,
}

impl<'a> FeaturePipeline<'a> {
    pub fn new(
        config: PipelineConfig,
        points: &'a dyn PointSource,
        sink: &'a dyn ExportSink,
    ) -> Self {
        FeaturePipeline {
            config,
            points,
            series: None,
            terrain: None,
            classification: None,
            sink,
        }
    }

    pub fn with_series(mut self, series: &'a dyn RasterSeriesProvider) -> Self {
        self.series = Some(series);
        self
    }

    pub fn with_terrain(mut self, terrain: &'a dyn StaticRasterSource) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn with_classification(mut self, classification: &'a dyn StaticRasterSource) -> Self {
        self.classification = Some(classification);
        self
    }

    /// Plan phase: the only blocking round-trips. Loads the point asset,
    /// enumerates scene identifiers and resolves their encoded dates,
    /// partitions the points, and rejects plans that would exceed the
    /// backend quota.
    pub fn plan(&self, asset_id: &str) -> Result<PipelinePlan> {
        let samples = self
            .points
            .load(asset_id)
            .context(format!("Failed to load point asset '{}'", asset_id))?;
        println!("Loaded {} point sample(s) from '{}'", samples.len(), asset_id);

        let mut scene_dates = Vec::new();
        let mut malformed_ids = 0usize;
        if let Some(series) = self.series {
            let campaign_filter = SceneFilter {
                window: Some(self.config.campaign),
                bounds: Some(self.target_aoi()?),
                scale: Some(self.config.reduce_scale),
                ..SceneFilter::default()
            };
            let campaign_start = self.config.campaign.start.date_naive();
            let campaign_end = self.config.campaign.end.date_naive();
            for id in series.list_scene_ids(&campaign_filter)? {
                match parse_acquisition_date(&id) {
                    Ok(date) => {
                        if date >= campaign_start && date < campaign_end {
                            scene_dates.push((id, date));
                        }
                    }
                    Err(err) => {
                        // Skip the offending scene, keep going.
                        eprintln!("Skipping scene: {}", err);
                        malformed_ids += 1;
                    }
                }
            }
            println!(
                "Resolved {} scene identifier(s) in the campaign window ({} malformed)",
                scene_dates.len(),
                malformed_ids
            );
        }

        let batches = partition_batches(samples.len(), self.config.batch_count)?;
        let limit = self.config.quota.max_points_per_batch;
        for batch in &batches {
            if batch.len() > limit {
                return Err(ExtractError::QuotaExceeded {
                    points: batch.len(),
                    limit,
                }
                .into());
            }
        }

        Ok(PipelinePlan {
            samples,
            batches,
            scene_dates,
            malformed_ids,
        })
    }

    /// Evaluate phase: one batched computation per batch, evaluated
    /// concurrently. A failing batch is isolated and reported; its siblings
    /// still complete and export.
    pub fn evaluate(
        &self,
        plan: &PipelinePlan,
        format: &ExportFormat,
        destination: &Destination,
    ) -> Result<RunReport> {
        let classification = match self.classification {
            Some(source) if self.needs_classification() => {
                Some(source.fetch(&self.target_aoi()?, self.config.reduce_scale)?)
            }
            _ => None,
        };

        // Only identifiers whose encoded dates resolved inside the campaign
        // take part in the composites; malformed ones were dropped at plan
        // time and stay dropped here.
        let scene_ids: Option<Vec<String>> = self.series.map(|_| {
            plan.scene_dates.iter().map(|(id, _)| id.clone()).collect()
        });

        #[cfg(feature = "rayon")]
        let outcomes: Vec<(usize, Result<Vec<FlatRecord>>)> = {
            #[cfg(feature = "indicatif")]
            let pb = {
                let pb = ProgressBar::new(plan.batches.len() as u64);
                pb.set_style(progress_style());
                pb.set_message("Batches");
                Arc::new(Mutex::new(pb))
            };

            let outcomes = plan
                .batches
                .par_iter()
                .enumerate()
                .map(|(index, range)| {
                    let result = self.evaluate_batch(
                        &plan.samples[range.clone()],
                        classification.as_ref(),
                        scene_ids.as_deref(),
                    );
                    #[cfg(feature = "indicatif")]
                    pb.lock().unwrap().inc(1);
                    (index, result)
                })
                .collect();

            #[cfg(feature = "indicatif")]
            pb.lock().unwrap().finish_with_message("All batches evaluated");
            outcomes
        };

        #[cfg(not(feature = "rayon"))]
        let outcomes: Vec<(usize, Result<Vec<FlatRecord>>)> = {
            #[cfg(feature = "indicatif")]
            let pb = {
                let pb = ProgressBar::new(plan.batches.len() as u64);
                pb.set_style(progress_style());
                pb.set_message("Batches");
                pb
            };

            let outcomes = plan
                .batches
                .iter()
                .enumerate()
                .map(|(index, range)| {
                    let result = self.evaluate_batch(
                        &plan.samples[range.clone()],
                        classification.as_ref(),
                        scene_ids.as_deref(),
                    );
                    #[cfg(feature = "indicatif")]
                    pb.inc(1);
                    (index, result)
                })
                .collect();

            #[cfg(feature = "indicatif")]
            pb.finish_with_message("All batches evaluated");
            outcomes
        };

        let mut report = RunReport::default();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(records) => {
                    let dest = destination.for_batch(index);
                    match self.sink.export(&records, format, &dest) {
                        Ok(()) => {
                            report.exported_records += records.len();
                            report.exported_batches.push(index);
                        }
                        Err(err) => {
                            eprintln!("Batch {} export failed: {:#}", index + 1, err);
                            report.failed_batches.push((index, format!("{:#}", err)));
                        }
                    }
                }
                Err(err) => {
                    eprintln!("Batch {} failed: {:#}", index + 1, err);
                    report.failed_batches.push((index, format!("{:#}", err)));
                }
            }
        }
        Ok(report)
    }

    /// Plan then evaluate in one call.
    pub fn run(
        &self,
        asset_id: &str,
        format: &ExportFormat,
        destination: &Destination,
    ) -> Result<RunReport> {
        let plan = self.plan(asset_id)?;
        self.evaluate(&plan, format, destination)
    }

    fn evaluate_batch(
        &self,
        samples: &[PointSample],
        classification: Option<&RasterLayer>,
        scene_ids: Option<&[String]>,
    ) -> Result<Vec<FlatRecord>> {
        let config = &self.config;
        let resolver = WindowResolver::new(config.aggregation, config.campaign);
        let zonal = ZonalExtractor::new(config.categorical_bands.clone());

        let masker = CloudScoreMasker {
            builder: MaskBuilder::new(config.excluded_classes.clone(), config.clear_threshold),
            classification: classification.cloned(),
        };

        let terrain = match config.sensor {
            Sensor::Terrain => Some(
                self.terrain
                    .context("Terrain sensor configured without a terrain source")?
                    .fetch(&self.target_aoi()?, config.reduce_scale)?,
            ),
            _ => None,
        };

        let mut records = Vec::with_capacity(samples.len());
        for sample in samples {
            let center = transform_point(
                config.source_epsg,
                config.target_epsg,
                sample.geometry(),
            )?;
            let region = BufferRegion::new(center, config.buffer_radius);

            let band_attrs = match (&terrain, config.sensor) {
                (Some(layer), _) => zonal.extract(layer, &region),
                (None, sensor) => {
                    let provider = self
                        .series
                        .context("Windowed sensor configured without a series provider")?;
                    let filter = self.scene_filter(sensor, sample, &region, &resolver, scene_ids);
                    let series = provider.scenes(&filter)?;
                    let composite = self.composite(sensor, &filter, &series, &masker)?;
                    match composite {
                        Some(layer) => zonal.extract(&layer, &region),
                        None => self
                            .reduce_bands(sensor)
                            .into_iter()
                            .map(|band| (band, None))
                            .collect(),
                    }
                }
            };

            let mut values: BTreeMap<String, Option<f64>> = sample.attributes.clone();
            values.extend(band_attrs);

            if config.attach_landcover_probe {
                if let Some(classification) = classification {
                    let probe = ZonalExtractor::new(vec![CLASSIFICATION_BAND.to_string()])
                        .extract(classification, &region);
                    if let Some(value) = probe.get(CLASSIFICATION_BAND) {
                        values.insert(CLASSIFICATION_BAND.to_string(), *value);
                    }
                }
            }

            records.push(FlatRecord {
                id: sample.id().to_string(),
                values,
            });
        }
        Ok(records)
    }

    fn scene_filter(
        &self,
        sensor: Sensor,
        sample: &PointSample,
        region: &BufferRegion,
        resolver: &WindowResolver,
        scene_ids: Option<&[String]>,
    ) -> SceneFilter {
        let window = resolver.resolve(sample.timestamp());
        let mut filter = SceneFilter {
            window: Some(window),
            bounds: Some(region.bounds()),
            ids: scene_ids.map(|ids| ids.to_vec()),
            scale: Some(self.config.reduce_scale),
            ..SceneFilter::default()
        };
        match sensor {
            Sensor::Radar => {
                filter.required_polarisations = vec![Polarization::Vv, Polarization::Vh];
                filter.instrument_mode = Some(InstrumentMode::Iw);
                // Both passes stay in one pooled set.
                filter.orbit_passes = vec![OrbitPass::Ascending, OrbitPass::Descending];
            }
            Sensor::Optical => {
                filter.max_cloud_pct = Some(self.config.max_cloud_pct);
            }
            Sensor::Terrain => {}
        }
        filter
    }

    /// Build the per-point composite, or None when the filtered series is
    /// empty and carries no grid to compose on.
    fn composite(
        &self,
        sensor: Sensor,
        filter: &SceneFilter,
        series: &RasterTimeSeries,
        masker: &CloudScoreMasker,
    ) -> Result<Option<RasterLayer>> {
        let Some(grid) = series.scenes().first().map(|s| *s.layer.grid()) else {
            return Ok(None);
        };
        let bands = self.reduce_bands(sensor);
        let builder = match sensor {
            Sensor::Optical => CompositeBuilder::new(filter.clone(), bands)
                .with_masker(masker)
                .with_prepare(&prepare_optical),
            _ => CompositeBuilder::new(filter.clone(), bands),
        };
        builder.build(grid, series).map(Some)
    }

    /// Bands reduced into attributes for a sensor.
    fn reduce_bands(&self, sensor: Sensor) -> Vec<String> {
        match sensor {
            Sensor::Radar => vec![
                Polarization::Vv.band_name().to_string(),
                Polarization::Vh.band_name().to_string(),
            ],
            Sensor::Optical => {
                let mut bands: Vec<String> =
                    OPTICAL_BANDS.iter().map(|b| b.to_string()).collect();
                bands.extend(
                    ["NDVI", "NBR", "NDRE", "NDMI", "TasseledCapGreenness"]
                        .iter()
                        .map(|b| b.to_string()),
                );
                bands
            }
            Sensor::Terrain => vec![SLOPE_BAND.to_string(), ELEVATION_BAND.to_string()],
        }
    }

    fn needs_classification(&self) -> bool {
        self.config.attach_landcover_probe || self.config.sensor == Sensor::Optical
    }

    fn target_aoi(&self) -> Result<BoundingBox> {
        self.config
            .aoi
            .transform(self.config.source_epsg, self.config.target_epsg)
    }
}

/// Reflectance scaling plus the standard index set, applied per scene after
/// masking and before the median.
fn prepare_optical(layer: &RasterLayer) -> Result<RasterLayer> {
    let mut prepared = layer
        .select(&OPTICAL_BANDS)
        .map_values(|v| Some(v / REFLECTANCE_SCALE));
    add_optical_indices(&mut prepared)?;
    Ok(prepared)
}

#[cfg(feature = "indicatif")]
fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
