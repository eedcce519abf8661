use nalgebra::{DMatrix, DVector};

use super::{check_lengths, r_squared, solve_least_squares, Backend, Coefficient, FitResult};
use crate::error::{Error, Result};

pub fn vandermonde(x: &[f64], degree: usize) -> DMatrix<f64> {
    DMatrix::from_fn(x.len(), degree + 1, |i, j| x[i].powi(j as i32))
}

/// Evaluates `coefficients[0] + coefficients[1] * x + ...`.
pub fn horner(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0., |acc, &c| acc * x + c)
}

/// Least-squares polynomial of the given degree, coefficients in ascending power order.
pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<FitResult> {
    check_lengths(x, y, 1)?;

    if degree >= x.len() {
        return Err(Error::DegreeTooHigh {
            degree,
            points: x.len(),
        });
    }

    let design = vandermonde(x, degree);
    let target = DVector::from_column_slice(y);

    let beta = solve_least_squares(&design, &target)?;

    let fitted = &design * &beta;
    let r2 = r_squared(y, fitted.as_slice());

    let coefficients = beta
        .iter()
        .enumerate()
        .map(|(power, &value)| Coefficient::new(format!("x^{power}"), value, power as u32))
        .collect();

    Ok(FitResult {
        backend: Backend::Polynomial { degree },
        coefficients,
        r_squared: Some(r2),
    })
}
