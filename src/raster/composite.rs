use anyhow::Result;

use super::mask::Mask;
use super::series::{RasterTimeSeries, Scene, SceneFilter};
use super::{GridSpec, RasterLayer};
use crate::errors::ExtractError;

/// Per-scene mask seam. Returning `Ok(None)` leaves the scene unmasked.
pub trait SceneMasker: Sync {
    fn mask_for(&self, scene: &Scene) -> Result<Option<Mask>>;
}

/// Per-scene preparation applied after masking and before reduction
/// (band selection, reflectance scaling, index derivation).
pub type ScenePrep = dyn Fn(&RasterLayer) -> Result<RasterLayer> + Sync;

/// Reduces a filtered raster time series into one composite per band with
/// the per-pixel median over the time axis. Ascending and descending orbit
/// scenes stay pooled in one set; the passes are never reduced separately.
pub struct CompositeBuilder<'a> {
    filter: SceneFilter,
    bands: Vec<String>,
    masker: Option<&'a dyn SceneMasker>,
    prepare: Option<&'a ScenePrep>,
}

impl<'a> CompositeBuilder<'a> {
    pub fn new(filter: SceneFilter, bands: Vec<String>) -> Self {
        CompositeBuilder {
            filter,
            bands,
            masker: None,
            prepare: None,
        }
    }

    pub fn with_masker(mut self, masker: &'a dyn SceneMasker) -> Self {
        self.masker = Some(masker);
        self
    }

    pub fn with_prepare(mut self, prepare: &'a ScenePrep) -> Self {
        self.prepare = Some(prepare);
        self
    }

    /// Build the composite on `grid`. Zero surviving scenes for a pixel or
    /// band yield missing pixels, never an error and never zero.
    pub fn build(&self, grid: GridSpec, series: &RasterTimeSeries) -> Result<RasterLayer> {
        let retained = series.filter(&self.filter);

        let mut prepared: Vec<RasterLayer> = Vec::with_capacity(retained.len());
        for scene in retained {
            if *scene.layer.grid() != grid {
                return Err(ExtractError::GridMismatch {
                    id: scene.meta.id.clone(),
                }
                .into());
            }
            let mut layer = match self.masker {
                Some(masker) => match masker.mask_for(scene)? {
                    Some(mask) => mask.apply(&scene.layer)?,
                    None => scene.layer.clone(),
                },
                None => scene.layer.clone(),
            };
            if let Some(prepare) = self.prepare {
                layer = prepare(&layer)?;
            }
            prepared.push(layer);
        }

        let mut composite = RasterLayer::new(grid);
        for band in &self.bands {
            let mut values: Vec<Option<f64>> = vec![None; grid.len()];
            let mut stack: Vec<f64> = Vec::with_capacity(prepared.len());
            for (idx, slot) in values.iter_mut().enumerate() {
                stack.clear();
                for layer in &prepared {
                    if let Some(Some(v)) = layer.band(band).map(|b| b[idx]) {
                        stack.push(v);
                    }
                }
                *slot = median(&mut stack);
            }
            composite.set_band(band.clone(), values)?;
        }
        Ok(composite)
    }
}

/// Median of the slice, averaging the two middle values for even counts.
/// Empty input is missing.
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}
