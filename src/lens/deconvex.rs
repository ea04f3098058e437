//! De-convex curvature correction: a 1-D coefficient table sampled by
//! nearest index. The coefficient looked up from each UV axis IS that
//! axis's corrected coordinate; the table runs before any HVMap remap.

use std::path::Path;

use anyhow::{Context, ensure};

#[derive(Debug, Clone, PartialEq)]
pub struct CurvatureTable {
    coefficients: Vec<f32>,
}

impl CurvatureTable {
    pub fn new(coefficients: Vec<f32>) -> Result<Self, anyhow::Error> {
        ensure!(
            !coefficients.is_empty(),
            "curvature table needs at least one coefficient"
        );
        Ok(Self { coefficients })
    }

    /// Load a JSON array of coefficients.
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read curvature table {}", path.display()))?;
        let coefficients: Vec<f32> = serde_json::from_str(&text)
            .with_context(|| format!("invalid curvature table {}", path.display()))?;
        Self::new(coefficients)
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Nearest-index lookup: `clamp(floor(t * (n - 1)))` into the table.
    pub fn coefficient(&self, t: f32) -> f32 {
        let n = self.coefficients.len();
        if n == 1 {
            return self.coefficients[0];
        }
        let index = (t.clamp(0.0, 1.0) * (n - 1) as f32).floor() as usize;
        self.coefficients[index.min(n - 1)]
    }

    /// The corrected UV: the coefficient sampled from each axis replaces
    /// that axis, clamped into the frame.
    pub fn apply(&self, u: f32, v: f32) -> (f32, f32) {
        (
            self.coefficient(u).clamp(0.0, 1.0),
            self.coefficient(v).clamp(0.0, 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_is_rejected() {
        let err = CurvatureTable::new(vec![]).unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn single_coefficient_applies_everywhere() {
        let table = CurvatureTable::new(vec![0.5]).unwrap();
        assert_eq!(table.coefficient(0.0), 0.5);
        assert_eq!(table.coefficient(1.0), 0.5);
        assert_eq!(table.apply(0.8, 0.4), (0.5, 0.5));
    }

    #[test]
    fn nearest_index_lookup() {
        // 3 coefficients over [0, 1]: index = floor(t * 2).
        let table = CurvatureTable::new(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(table.coefficient(0.0), 1.0);
        assert_eq!(table.coefficient(0.49), 1.0);
        assert_eq!(table.coefficient(0.5), 2.0);
        assert_eq!(table.coefficient(0.99), 2.0);
        assert_eq!(table.coefficient(1.0), 3.0);
    }

    #[test]
    fn out_of_range_inputs_clamp() {
        let table = CurvatureTable::new(vec![1.0, 2.0]).unwrap();
        assert_eq!(table.coefficient(-5.0), 1.0);
        assert_eq!(table.coefficient(7.0), 2.0);
    }

    #[test]
    fn each_axis_uses_its_own_coordinate() {
        // Low inputs hit the first coefficient, high inputs the second,
        // and the coefficient replaces the coordinate outright.
        let table = CurvatureTable::new(vec![0.9, 0.1]).unwrap();
        assert_eq!(table.apply(0.3, 0.3), (0.9, 0.9));
        assert_eq!(table.apply(0.3, 1.0), (0.9, 0.1));
    }

    #[test]
    fn corrected_coordinates_stay_in_frame() {
        let table = CurvatureTable::new(vec![1.5, -0.5]).unwrap();
        assert_eq!(table.apply(0.0, 1.0), (1.0, 0.0));
    }
}
