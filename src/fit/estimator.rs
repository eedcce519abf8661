use linfa::prelude::*;
use linfa_linear::{FittedLinearRegression, LinearRegression};
use ndarray::{Array1, Array2};

use super::{check_lengths, r_squared, Backend, Coefficient, FitResult};
use crate::error::{Error, Result};

/// `fit` / `predict` / `score` estimator over a single feature.
#[derive(Debug, Clone)]
pub struct LinearEstimator {
    fit_intercept: bool,
    fitted: Option<FittedLinearRegression<f64>>,
}

impl Default for LinearEstimator {
    fn default() -> Self {
        Self::new()
    }
}

fn records(x: &[f64]) -> Result<Array2<f64>> {
    Array2::from_shape_vec((x.len(), 1), x.to_vec()).map_err(|e| Error::Estimator(e.to_string()))
}

impl LinearEstimator {
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
            fitted: None,
        }
    }

    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<&mut Self> {
        check_lengths(x, y, 2)?;

        let dataset = Dataset::new(records(x)?, Array1::from(y.to_vec()));

        let fitted = LinearRegression::new()
            .with_intercept(self.fit_intercept)
            .fit(&dataset)
            .map_err(|e| Error::Estimator(e.to_string()))?;

        self.fitted = Some(fitted);

        Ok(self)
    }

    fn fitted(&self) -> Result<&FittedLinearRegression<f64>> {
        self.fitted.as_ref().ok_or(Error::NotFitted)
    }

    pub fn predict(&self, x: &[f64]) -> Result<Vec<f64>> {
        let predictions: Array1<f64> = self.fitted()?.predict(&records(x)?);
        Ok(predictions.to_vec())
    }

    /// R² of the predictions against `y`.
    pub fn score(&self, x: &[f64], y: &[f64]) -> Result<f64> {
        check_lengths(x, y, 1)?;
        Ok(r_squared(y, &self.predict(x)?))
    }

    pub fn coef(&self) -> Result<f64> {
        Ok(self.fitted()?.params()[0])
    }

    pub fn intercept(&self) -> Result<f64> {
        Ok(self.fitted()?.intercept())
    }

    pub fn to_fit_result(&self, x: &[f64], y: &[f64]) -> Result<FitResult> {
        Ok(FitResult {
            backend: Backend::Estimator {
                fit_intercept: self.fit_intercept,
            },
            coefficients: vec![
                Coefficient::new("intercept", self.intercept()?, 0),
                Coefficient::new("coef", self.coef()?, 1),
            ],
            r_squared: Some(self.score(x, y)?),
        })
    }
}
