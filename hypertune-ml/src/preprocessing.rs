//! Feature scaling.

use crate::error::MlError;
use ndarray::{Array1, Array2, Axis};

/// Standardizes each feature to zero mean and unit variance.
///
/// Statistics come from the data passed to `fit` only; columns with zero
/// variance are left unscaled.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<(), MlError> {
        if x.nrows() == 0 {
            return Err(MlError::model("cannot fit scaler on zero rows"));
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| MlError::model("cannot fit scaler on zero rows"))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, MlError> {
        let (Some(mean), Some(scale)) = (&self.mean, &self.scale) else {
            return Err(MlError::model("scaler used before fit"));
        };
        if x.ncols() != mean.len() {
            return Err(MlError::model(format!(
                "scaler fitted on {} features, got {}",
                mean.len(),
                x.ncols()
            )));
        }
        Ok((x - mean) / scale)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>, MlError> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_centers_and_scales() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(&x).unwrap();
        let col0: Vec<f64> = z.column(0).to_vec();
        assert!((col0[0] + 1.224744871).abs() < 1e-6);
        assert!(col0[1].abs() < 1e-12);
        // Constant column: centered, not divided by zero.
        assert!(z.column(1).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[0.0], [2.0]]).unwrap();
        let z = scaler.transform(&array![[4.0]]).unwrap();
        assert!((z[[0, 0]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_unfitted_and_mismatched() {
        let scaler = StandardScaler::new();
        assert!(scaler.transform(&array![[1.0]]).is_err());
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }
}
