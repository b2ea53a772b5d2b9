use anyhow::{anyhow, Result};

use super::RasterLayer;

/// (a - b) / (a + b), missing when the denominator is zero. Never NaN and
/// never infinity.
pub fn normalized_difference(a: f64, b: f64) -> Option<f64> {
    let denom = a + b;
    if denom == 0.0 {
        None
    } else {
        Some((a - b) / denom)
    }
}

/// Add a normalized-difference band computed from two existing bands.
/// Missing inputs stay missing; an existing band of the same name is
/// overwritten.
pub fn add_normalized_difference(
    layer: &mut RasterLayer,
    name: &str,
    band_a: &str,
    band_b: &str,
) -> Result<()> {
    let a = layer
        .band(band_a)
        .ok_or_else(|| anyhow!("band '{}' not found", band_a))?;
    let b = layer
        .band(band_b)
        .ok_or_else(|| anyhow!("band '{}' not found", band_b))?;
    let values: Vec<Option<f64>> = a
        .iter()
        .zip(b)
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => normalized_difference(*a, *b),
            _ => None,
        })
        .collect();
    layer.set_band(name, values)
}

/// Add a fixed-weight linear combination of existing bands. A pixel missing
/// in any input band is missing in the output.
pub fn add_linear_combination(
    layer: &mut RasterLayer,
    name: &str,
    terms: &[(f64, &str)],
) -> Result<()> {
    let mut acc: Vec<Option<f64>> = vec![Some(0.0); layer.grid().len()];
    for (weight, band_name) in terms {
        let band = layer
            .band(band_name)
            .ok_or_else(|| anyhow!("band '{}' not found", band_name))?;
        for (sum, value) in acc.iter_mut().zip(band) {
            *sum = match (*sum, value) {
                (Some(s), Some(v)) => Some(s + weight * v),
                _ => None,
            };
        }
    }
    layer.set_band(name, acc)
}

/// Attach the standard optical index set: NDVI, NBR, NDRE, NDMI and
/// Tasseled Cap greenness. Input bands are kept.
pub fn add_optical_indices(layer: &mut RasterLayer) -> Result<()> {
    add_normalized_difference(layer, "NDVI", "B8", "B4")?;
    add_normalized_difference(layer, "NBR", "B8", "B12")?;
    add_normalized_difference(layer, "NDRE", "B8A", "B5")?;
    add_normalized_difference(layer, "NDMI", "B8", "B11")?;
    add_linear_combination(
        layer,
        "TasseledCapGreenness",
        &[(0.3909, "B8"), (-0.0396, "B4"), (0.1710, "B3"), (0.4574, "B2")],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridSpec;

    fn one_pixel_layer(bands: &[(&str, f64)]) -> RasterLayer {
        let mut layer = RasterLayer::new(GridSpec::new(5070, 0.0, 25.0, 25.0, 1, 1));
        for (name, value) in bands {
            layer.set_constant_band(*name, *value);
        }
        layer
    }

    #[test]
    fn test_normalized_difference_of_equal_values_is_zero() {
        assert_eq!(normalized_difference(0.3, 0.3), Some(0.0));
    }

    #[test]
    fn test_normalized_difference_zero_denominator_is_missing() {
        assert_eq!(normalized_difference(0.3, -0.3), None);
        assert_eq!(normalized_difference(0.0, 0.0), None);
    }

    #[test]
    fn test_add_normalized_difference_missing_input() {
        let mut layer = one_pixel_layer(&[("B4", 0.2)]);
        layer.set_band("B8", vec![None]).unwrap();
        add_normalized_difference(&mut layer, "NDVI", "B8", "B4").unwrap();
        assert_eq!(layer.band("NDVI").unwrap(), &[None]);
    }

    #[test]
    fn test_greenness_weights() {
        let mut layer =
            one_pixel_layer(&[("B8", 1.0), ("B4", 1.0), ("B3", 1.0), ("B2", 1.0)]);
        add_linear_combination(
            &mut layer,
            "TasseledCapGreenness",
            &[(0.3909, "B8"), (-0.0396, "B4"), (0.1710, "B3"), (0.4574, "B2")],
        )
        .unwrap();
        let value = layer.value_at("TasseledCapGreenness", 0, 0).unwrap();
        assert!((value - (0.3909 - 0.0396 + 0.1710 + 0.4574)).abs() < 1e-12);
    }

    #[test]
    fn test_optical_indices_keep_inputs() {
        let mut layer = one_pixel_layer(&[
            ("B2", 0.04),
            ("B3", 0.06),
            ("B4", 0.05),
            ("B5", 0.10),
            ("B8", 0.30),
            ("B8A", 0.32),
            ("B11", 0.15),
            ("B12", 0.08),
        ]);
        add_optical_indices(&mut layer).unwrap();
        assert!(layer.has_band("B4"));
        let ndvi = layer.value_at("NDVI", 0, 0).unwrap();
        assert!((ndvi - (0.30 - 0.05) / (0.30 + 0.05)).abs() < 1e-12);
    }
}
