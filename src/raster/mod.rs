pub mod composite;
pub mod indices;
pub mod mask;
pub mod series;

use std::collections::BTreeMap;

use anyhow::{ensure, Result};

use crate::geo_core::BoundingBox;

/// Regular grid definition: CRS, origin at the top-left corner, square
/// pixels, row index growing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub epsg: i32,
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_size: f64,
    pub width: usize,
    pub height: usize,
}

impl GridSpec {
    pub fn new(
        epsg: i32,
        origin_x: f64,
        origin_y: f64,
        pixel_size: f64,
        width: usize,
        height: usize,
    ) -> Self {
        GridSpec {
            epsg,
            origin_x,
            origin_y,
            pixel_size,
            width,
            height,
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Center coordinates of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_size,
            self.origin_y - (row as f64 + 0.5) * self.pixel_size,
        )
    }

    /// Pixel containing (x, y), or None outside the grid.
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = (x - self.origin_x) / self.pixel_size;
        let row = (self.origin_y - y) / self.pixel_size;
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        Some((col, row))
    }

    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    pub fn extent(&self) -> BoundingBox {
        BoundingBox::new(
            self.origin_x,
            self.origin_y - self.height as f64 * self.pixel_size,
            self.origin_x + self.width as f64 * self.pixel_size,
            self.origin_y,
        )
    }
}

/// Named-band raster on a single grid. `None` is the missing value; NaN is
/// never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    grid: GridSpec,
    bands: BTreeMap<String, Vec<Option<f64>>>,
}

impl RasterLayer {
    pub fn new(grid: GridSpec) -> Self {
        RasterLayer {
            grid,
            bands: BTreeMap::new(),
        }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Add or replace a band. Name collisions overwrite, last write wins.
    pub fn set_band(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<()> {
        ensure!(
            values.len() == self.grid.len(),
            "band length {} does not match grid size {}",
            values.len(),
            self.grid.len()
        );
        self.bands.insert(name.into(), values);
        Ok(())
    }

    /// Add a band with one value everywhere.
    pub fn set_constant_band(&mut self, name: impl Into<String>, value: f64) {
        self.bands.insert(name.into(), vec![Some(value); self.grid.len()]);
    }

    pub fn band(&self, name: &str) -> Option<&[Option<f64>]> {
        self.bands.get(name).map(|v| v.as_slice())
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(|s| s.as_str())
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    pub fn value_at(&self, name: &str, col: usize, row: usize) -> Option<f64> {
        self.bands
            .get(name)
            .and_then(|b| b[self.grid.index(col, row)])
    }

    /// Keep only the named bands, preserving their values.
    pub fn select(&self, names: &[&str]) -> RasterLayer {
        let mut out = RasterLayer::new(self.grid);
        for name in names {
            if let Some(values) = self.bands.get(*name) {
                out.bands.insert((*name).to_string(), values.clone());
            }
        }
        out
    }

    /// Apply a pointwise function to every pixel of every band.
    pub fn map_values(&self, f: impl Fn(f64) -> Option<f64>) -> RasterLayer {
        let mut out = RasterLayer::new(self.grid);
        for (name, values) in &self.bands {
            out.bands.insert(
                name.clone(),
                values.iter().map(|v| v.and_then(&f)).collect(),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridSpec {
        GridSpec::new(5070, 0.0, 100.0, 25.0, 4, 4)
    }

    #[test]
    fn test_pixel_center_and_locate_roundtrip() {
        let g = grid();
        let (x, y) = g.pixel_center(2, 1);
        assert_eq!((x, y), (62.5, 62.5));
        assert_eq!(g.locate(x, y), Some((2, 1)));
        assert_eq!(g.locate(-1.0, 50.0), None);
        assert_eq!(g.locate(50.0, 101.0), None);
    }

    #[test]
    fn test_band_last_write_wins() {
        let g = grid();
        let mut layer = RasterLayer::new(g);
        layer.set_constant_band("B4", 1.0);
        layer.set_constant_band("B4", 2.0);
        assert_eq!(layer.value_at("B4", 0, 0), Some(2.0));
    }

    #[test]
    fn test_band_length_checked() {
        let mut layer = RasterLayer::new(grid());
        assert!(layer.set_band("B4", vec![Some(1.0); 3]).is_err());
    }

    #[test]
    fn test_select_keeps_named_bands_only() {
        let mut layer = RasterLayer::new(grid());
        layer.set_constant_band("VV", -12.0);
        layer.set_constant_band("VH", -18.0);
        let vv = layer.select(&["VV"]);
        assert!(vv.has_band("VV"));
        assert!(!vv.has_band("VH"));
    }
}
