use anyhow::Result;
use geo::Point;

/// Geographic bounding box, axis-aligned in the CRS it was built in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Transform the box corners to another CRS.
    pub fn transform(&self, from_epsg: i32, to_epsg: i32) -> Result<Self> {
        let (min_x, min_y) = transform_coords(from_epsg, to_epsg, self.min_x, self.min_y)?;
        let (max_x, max_y) = transform_coords(from_epsg, to_epsg, self.max_x, self.max_y)?;
        Ok(BoundingBox::new(min_x, min_y, max_x, max_y))
    }
}

/// Transform a coordinate pair between EPSG CRSs.
/// Equal source and target EPSG short-circuits to the identity, so data
/// already in the target projection never touches proj.
#[cfg(feature = "proj")]
pub fn transform_coords(from_epsg: i32, to_epsg: i32, x: f64, y: f64) -> Result<(f64, f64)> {
    use anyhow::Context;
    use proj::Proj;

    if from_epsg == to_epsg {
        return Ok((x, y));
    }

    let from_crs = format!("EPSG:{}", from_epsg);
    let to_crs = format!("EPSG:{}", to_epsg);

    let proj = Proj::new_known_crs(&from_crs, &to_crs, None)
        .context("Failed to create Proj transformation")?;

    proj.convert((x, y)).context("Failed to transform coordinates")
}

#[cfg(not(feature = "proj"))]
pub fn transform_coords(from_epsg: i32, to_epsg: i32, x: f64, y: f64) -> Result<(f64, f64)> {
    if from_epsg == to_epsg {
        return Ok((x, y));
    }
    anyhow::bail!(
        "Built without the 'proj' feature: cannot transform EPSG:{} -> EPSG:{}",
        from_epsg,
        to_epsg
    )
}

/// Transform a Point between EPSG CRSs.
pub fn transform_point(from_epsg: i32, to_epsg: i32, point: Point<f64>) -> Result<Point<f64>> {
    let (x, y) = transform_coords(from_epsg, to_epsg, point.x(), point.y())?;
    Ok(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_contains() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(bbox.contains(5.0, 5.0));
        assert!(bbox.contains(0.0, 10.0));
        assert!(!bbox.contains(-0.1, 5.0));
    }

    #[test]
    fn test_bounding_box_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(11.0, 11.0, 12.0, 12.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_identity_transform_skips_proj() {
        let (x, y) = transform_coords(5070, 5070, 1500.0, -320.0).unwrap();
        assert_eq!((x, y), (1500.0, -320.0));
    }

    #[test]
    #[cfg(feature = "proj")]
    fn test_transform_coords() {
        // May be skipped if proj data is not installed on the machine.
        let result = transform_coords(4326, 5070, -72.5, 43.9);
        if let Ok((x, y)) = result {
            assert!(x.is_finite());
            assert!(y.is_finite());
        }
    }
}
