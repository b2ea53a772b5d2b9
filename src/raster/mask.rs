use anyhow::{ensure, Result};

use super::{GridSpec, RasterLayer};

/// Boolean exclusion mask aligned to a grid. `Some(true)` keeps a pixel,
/// `Some(false)` drops it, `None` is undefined and stays undefined through
/// every combination.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    grid: GridSpec,
    values: Vec<Option<bool>>,
}

impl Mask {
    pub fn new(grid: GridSpec, values: Vec<Option<bool>>) -> Result<Self> {
        ensure!(
            values.len() == grid.len(),
            "mask length {} does not match grid size {}",
            values.len(),
            grid.len()
        );
        Ok(Mask { grid, values })
    }

    pub fn fill(grid: GridSpec, value: bool) -> Self {
        let len = grid.len();
        Mask {
            grid,
            values: vec![Some(value); len],
        }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn values(&self) -> &[Option<bool>] {
        &self.values
    }

    /// Pixelwise AND. Commutative and idempotent; undefined absorbs.
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        self.combine(other, |a, b| a && b)
    }

    /// Pixelwise OR. Commutative and idempotent; undefined absorbs.
    pub fn or(&self, other: &Mask) -> Result<Mask> {
        self.combine(other, |a, b| a || b)
    }

    fn combine(&self, other: &Mask, op: impl Fn(bool, bool) -> bool) -> Result<Mask> {
        ensure!(
            self.grid == other.grid,
            "cannot combine masks on different grids"
        );
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => Some(op(*a, *b)),
                _ => None,
            })
            .collect();
        Ok(Mask {
            grid: self.grid,
            values,
        })
    }

    /// Drop every raster pixel the mask does not affirmatively keep.
    pub fn apply(&self, layer: &RasterLayer) -> Result<RasterLayer> {
        ensure!(
            self.grid == *layer.grid(),
            "mask grid does not match raster grid"
        );
        let mut out = RasterLayer::new(*layer.grid());
        let names: Vec<String> = layer.band_names().map(str::to_string).collect();
        for name in names {
            let Some(band) = layer.band(&name) else {
                continue;
            };
            let masked: Vec<Option<f64>> = band
                .iter()
                .zip(&self.values)
                .map(|(v, keep)| match keep {
                    Some(true) => *v,
                    _ => None,
                })
                .collect();
            out.set_band(name, masked)?;
        }
        Ok(out)
    }
}

/// Builds the exclusion mask from a coded classification raster and a
/// per-scene quality-score raster.
#[derive(Debug, Clone)]
pub struct MaskBuilder {
    pub excluded_classes: Vec<u16>,
    pub quality_threshold: f64,
}

impl MaskBuilder {
    pub fn new(excluded_classes: Vec<u16>, quality_threshold: f64) -> Self {
        MaskBuilder {
            excluded_classes,
            quality_threshold,
        }
    }

    /// keep = (classification not excluded) AND (quality >= threshold).
    /// Undefined classification or quality pixels stay undefined.
    pub fn build(
        &self,
        classification: &RasterLayer,
        class_band: &str,
        quality: &RasterLayer,
        quality_band: &str,
    ) -> Result<Mask> {
        ensure!(
            classification.grid() == quality.grid(),
            "classification and quality rasters are on different grids"
        );
        let classes = classification
            .band(class_band)
            .ok_or_else(|| anyhow::anyhow!("classification band '{}' not found", class_band))?;
        let scores = quality
            .band(quality_band)
            .ok_or_else(|| anyhow::anyhow!("quality band '{}' not found", quality_band))?;

        let values = classes
            .iter()
            .zip(scores)
            .map(|(class, score)| match (class, score) {
                (Some(class), Some(score)) => {
                    let excluded = self.excluded_classes.contains(&(*class as u16));
                    Some(!excluded && *score >= self.quality_threshold)
                }
                _ => None,
            })
            .collect();
        Mask::new(*classification.grid(), values)
    }

    /// Quality-only variant for runs without a classification raster.
    pub fn from_quality(&self, quality: &RasterLayer, quality_band: &str) -> Result<Mask> {
        let scores = quality
            .band(quality_band)
            .ok_or_else(|| anyhow::anyhow!("quality band '{}' not found", quality_band))?;
        let values = scores
            .iter()
            .map(|score| score.map(|s| s >= self.quality_threshold))
            .collect();
        Mask::new(*quality.grid(), values)
    }
}
