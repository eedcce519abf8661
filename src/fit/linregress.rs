use statrs::distribution::{ContinuousCDF, StudentsT};

use super::{check_lengths, r_squared, Backend, Coefficient, CoefficientStats, FitResult};
use crate::error::{Error, Result};

const TINY: f64 = 1.0e-20;

/// Least-squares line with the usual inference on the slope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinregressResult {
    pub slope: f64,
    pub intercept: f64,
    pub rvalue: f64,
    /// From the residuals, so a horizontal line through constant y scores 1 while r is 0.
    pub r_squared: f64,
    /// Two-sided, null hypothesis slope = 0.
    pub pvalue: f64,
    pub stderr: f64,
    pub intercept_stderr: f64,
    pub nobs: usize,
}

pub fn linregress(x: &[f64], y: &[f64]) -> Result<LinregressResult> {
    check_lengths(x, y, 2)?;

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    // population (co)variances
    let ssxm = x.iter().map(|x| (x - x_mean).powi(2)).sum::<f64>() / n;
    let ssym = y.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n;
    let ssxym = x
        .iter()
        .zip(y)
        .map(|(x, y)| (x - x_mean) * (y - y_mean))
        .sum::<f64>()
        / n;

    if ssxm == 0. {
        return Err(Error::ConstantInput);
    }

    let rvalue = if ssym == 0. {
        0.
    } else {
        (ssxym / (ssxm * ssym).sqrt()).clamp(-1., 1.)
    };

    let slope = ssxym / ssxm;
    let intercept = y_mean - slope * x_mean;

    let (pvalue, stderr, intercept_stderr) = if x.len() == 2 {
        let pvalue = if y[0] == y[1] { 1. } else { 0. };
        (pvalue, 0., 0.)
    } else {
        let df = n - 2.;
        let t = rvalue * (df / ((1. - rvalue + TINY) * (1. + rvalue + TINY))).sqrt();

        let pvalue = StudentsT::new(0., 1., df)
            .map(|dist| 2. * dist.sf(t.abs()))
            .map_err(|e| Error::Distribution(e.to_string()))?;

        let stderr = ((1. - rvalue.powi(2)) * ssym / ssxm / df).sqrt();
        let intercept_stderr = stderr * (ssxm + x_mean.powi(2)).sqrt();

        (pvalue, stderr, intercept_stderr)
    };

    let fitted: Vec<f64> = x.iter().map(|x| intercept + slope * x).collect();

    Ok(LinregressResult {
        slope,
        intercept,
        rvalue,
        r_squared: r_squared(y, &fitted),
        pvalue,
        stderr,
        intercept_stderr,
        nobs: x.len(),
    })
}

impl LinregressResult {
    pub fn into_fit_result(self) -> FitResult {
        let dof = self.nobs as f64 - 2.;

        let mut intercept = Coefficient::new("intercept", self.intercept, 0);
        let mut slope = Coefficient::new("slope", self.slope, 1);

        if self.nobs > 2 {
            intercept = intercept.with_stats(CoefficientStats::from_estimate(
                self.intercept,
                self.intercept_stderr,
                dof,
            ));
            slope = slope.with_stats(CoefficientStats {
                std_err: self.stderr,
                t_value: self.slope / self.stderr,
                p_value: self.pvalue,
            });
        }

        FitResult {
            backend: Backend::LinRegress,
            coefficients: vec![intercept, slope],
            r_squared: Some(self.r_squared),
        }
    }
}
