pub mod estimator;
pub mod formula;
pub mod linregress;
pub mod ols;
pub mod poly;

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::info;

use crate::error::{Error, Result};
use crate::observations::ObservationTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientStats {
    pub std_err: f64,
    pub t_value: f64,
    pub p_value: f64,
}

impl CoefficientStats {
    pub fn from_estimate(value: f64, std_err: f64, dof: f64) -> Self {
        let t_value = value / std_err;

        Self {
            std_err,
            t_value,
            p_value: two_sided_p(t_value, dof),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coefficient {
    pub name: String,
    pub value: f64,
    /// Power of x the coefficient multiplies.
    pub power: u32,
    pub stats: Option<CoefficientStats>,
}

impl Coefficient {
    pub fn new(name: impl Into<String>, value: f64, power: u32) -> Self {
        Self {
            name: name.into(),
            value,
            power,
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: CoefficientStats) -> Self {
        self.stats = Some(stats);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Polynomial { degree: usize },
    LinRegress,
    Ols { formula: String },
    Estimator { fit_intercept: bool },
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Polynomial { .. } => "polynomial least squares",
            Backend::LinRegress => "linear regression",
            Backend::Ols { .. } => "ordinary least squares (formula)",
            Backend::Estimator { .. } => "linear estimator",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Polynomial { degree } => write!(f, "{} (degree {degree})", self.name()),
            Backend::Ols { formula } => write!(f, "{} `{formula}`", self.name()),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Outcome of one backend run: a polynomial in x plus whatever statistics the backend reports.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub backend: Backend,
    pub coefficients: Vec<Coefficient>,
    pub r_squared: Option<f64>,
}

impl FitResult {
    pub fn r_squared(&self) -> Option<f64> {
        self.r_squared
    }

    pub fn coefficients(&self) -> &[Coefficient] {
        &self.coefficients
    }

    pub fn degree(&self) -> u32 {
        self.coefficients.iter().map(|c| c.power).max().unwrap_or(0)
    }

    /// Coefficients indexed by power, missing powers filled with zero.
    pub fn dense_coefficients(&self) -> Vec<f64> {
        let mut dense = vec![0.; self.degree() as usize + 1];
        for c in &self.coefficients {
            dense[c.power as usize] += c.value;
        }
        dense
    }

    pub fn intercept(&self) -> f64 {
        self.dense_coefficients()[0]
    }

    pub fn slope(&self) -> f64 {
        self.dense_coefficients().get(1).copied().unwrap_or(0.)
    }

    pub fn predict_one(&self, x: f64) -> f64 {
        poly::horner(&self.dense_coefficients(), x)
    }

    pub fn predict(&self, x: &[f64]) -> Vec<f64> {
        let dense = self.dense_coefficients();
        x.iter().map(|&x| poly::horner(&dense, x)).collect()
    }

    pub fn residuals(&self, table: &ObservationTable) -> Vec<f64> {
        table
            .y
            .iter()
            .zip(self.predict(&table.x))
            .map(|(y, y_hat)| y - y_hat)
            .collect()
    }

    /// Solves `y = intercept + slope * x` for x, e.g. concentration from a measured absorbance.
    pub fn invert_linear(&self, y: f64) -> Result<f64> {
        if self.degree() > 1 {
            return Err(Error::NotInvertible);
        }

        let slope = self.slope();
        if slope == 0. {
            return Err(Error::NotInvertible);
        }

        Ok((y - self.intercept()) / slope)
    }
}

/// Runs one backend against the x/y columns of `table`.
pub fn fit(backend: &Backend, table: &ObservationTable) -> Result<FitResult> {
    let result = match backend {
        Backend::Polynomial { degree } => poly::fit(&table.x, &table.y, *degree)?,
        Backend::LinRegress => linregress::linregress(&table.x, &table.y)?.into_fit_result(),
        Backend::Ols { formula } => ols::ols(formula, table)?.to_fit_result(table)?,
        Backend::Estimator { fit_intercept } => {
            let mut estimator = estimator::LinearEstimator::new().with_intercept(*fit_intercept);
            estimator.fit(&table.x, &table.y)?;
            estimator.to_fit_result(&table.x, &table.y)?
        }
    };

    info!(backend = %backend, r_squared = ?result.r_squared, "fit done");

    Ok(result)
}

pub(crate) fn check_lengths(x: &[f64], y: &[f64], min: usize) -> Result<()> {
    if x.len() != y.len() {
        return Err(Error::LengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }

    if x.len() < min {
        return Err(Error::TooFewPoints { got: x.len(), min });
    }

    check_finite("x", x)?;
    check_finite("y", y)
}

pub(crate) fn check_finite(column: &str, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(Error::NonFinite {
            column: column.to_string(),
            index,
        }),
        None => Ok(()),
    }
}

/// Coefficient of determination. Constant `y` scores 1.0 on an exact fit and 0.0 otherwise.
pub fn r_squared(y: &[f64], y_hat: &[f64]) -> f64 {
    let mean = y.iter().sum::<f64>() / y.len() as f64;

    let ss_res: f64 = y.iter().zip(y_hat).map(|(y, f)| (y - f).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_y: f64 = y.iter().map(|y| y.powi(2)).sum();

    r_squared_from_sums(ss_res, ss_tot, ss_y, y.len())
}

/// `1 - ss_res / ss_tot`, with sums compared against `ss_y = Σy²` so that
/// rounding noise in the solvers does not decide the constant-y case.
pub(crate) fn r_squared_from_sums(ss_res: f64, ss_tot: f64, ss_y: f64, n: usize) -> f64 {
    if is_negligible(ss_tot, ss_y, n) {
        return if ss_res <= ss_y * f64::EPSILON { 1. } else { 0. };
    }

    1. - ss_res / ss_tot
}

/// Sum of squared deviations indistinguishable from round-off of the mean.
pub(crate) fn is_negligible(ss: f64, ss_y: f64, n: usize) -> bool {
    ss <= ss_y * n as f64 * f64::EPSILON.powi(2)
}

pub(crate) fn two_sided_p(t: f64, dof: f64) -> f64 {
    if t.is_nan() || !(dof > 0.) {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.;
    }

    StudentsT::new(0., 1., dof)
        .map(|dist| 2. * dist.sf(t.abs()))
        .unwrap_or(f64::NAN)
}

/// Least squares through an SVD; fails when the design matrix is rank deficient.
pub(crate) fn solve_least_squares(design: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>> {
    let svd = design.clone().svd(true, true);

    let max_sv = svd.singular_values.max();
    let eps = max_sv * design.nrows().max(design.ncols()) as f64 * f64::EPSILON;

    if svd.rank(eps) < design.ncols() {
        return Err(Error::Singular);
    }

    let beta = svd.solve(y, eps).map_err(|_| Error::Singular)?;

    if beta.iter().all(|v| v.is_finite()) {
        Ok(beta)
    } else {
        Err(Error::Singular)
    }
}
