use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use tracing::debug;

use super::formula::{Formula, Term};
use super::{
    check_finite, is_negligible, r_squared_from_sums, solve_least_squares, Backend, Coefficient,
    CoefficientStats, FitResult,
};
use crate::error::{Error, Result};
use crate::observations::ObservationTable;

#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub formula: Formula,
    /// One per formula term, in term order, each with standard error, t and p.
    pub coefficients: Vec<Coefficient>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub residual_std_error: f64,
    /// F statistic and its p value; absent for intercept-only or regressor-free models and constant responses.
    pub f_statistic: Option<(f64, f64)>,
    pub nobs: usize,
    pub df_model: usize,
    pub df_resid: usize,
    pub fitted: Vec<f64>,
}

pub fn ols(formula: &str, table: &ObservationTable) -> Result<OlsFit> {
    let formula: Formula = formula.parse()?;

    for column in std::iter::once(formula.response.as_str())
        .chain(formula.terms.iter().filter_map(Term::column))
    {
        if let Some(values) = table.column(column) {
            check_finite(column, values)?;
        }
    }

    let design = formula.design_matrix(table)?;
    let response = formula.response_vector(table)?;

    let (n, k) = design.shape();
    if n <= k {
        return Err(Error::TooFewPoints { got: n, min: k + 1 });
    }

    let beta = solve_least_squares(&design, &response)?;

    let fitted = &design * &beta;
    let ssr: f64 = (&response - &fitted).iter().map(|r| r.powi(2)).sum();

    let has_intercept = formula.has_intercept();
    let ss_y: f64 = response.iter().map(|y| y.powi(2)).sum();
    let tss: f64 = if has_intercept {
        let mean = response.mean();
        response.iter().map(|y| (y - mean).powi(2)).sum()
    } else {
        ss_y
    };

    let df_resid = n - k;
    let df_model = k - has_intercept as usize;
    let sigma2 = ssr / df_resid as f64;

    let xtx_inv = (design.transpose() * &design)
        .try_inverse()
        .ok_or(Error::Singular)?;

    let coefficients = formula
        .terms
        .iter()
        .zip(beta.iter())
        .enumerate()
        .map(|(i, (term, &value))| {
            let std_err = (sigma2 * xtx_inv[(i, i)]).sqrt();
            Coefficient::new(term.to_string(), value, term.exponent())
                .with_stats(CoefficientStats::from_estimate(value, std_err, df_resid as f64))
        })
        .collect();

    let r_squared = r_squared_from_sums(ssr, tss, ss_y, n);
    let adj_r_squared =
        1. - (n - has_intercept as usize) as f64 / df_resid as f64 * (1. - r_squared);

    // nothing to explain when the response is constant
    let explains_variance = !is_negligible(tss, ss_y, n);

    let f_statistic = (df_model > 0 && has_intercept && explains_variance).then(|| {
        let f = ((tss - ssr) / df_model as f64) / sigma2;
        let p = if f.is_infinite() {
            0.
        } else {
            FisherSnedecor::new(df_model as f64, df_resid as f64)
                .map(|dist| dist.sf(f))
                .unwrap_or(f64::NAN)
        };
        (f, p)
    });

    debug!(nobs = n, df_resid, r_squared, "ols solved");

    Ok(OlsFit {
        formula,
        coefficients,
        r_squared,
        adj_r_squared,
        residual_std_error: sigma2.sqrt(),
        f_statistic,
        nobs: n,
        df_model,
        df_resid,
        fitted: fitted.iter().cloned().collect(),
    })
}

impl OlsFit {
    pub fn predict(&self, table: &ObservationTable) -> Result<Vec<f64>> {
        let design = self.formula.design_matrix(table)?;
        let beta = nalgebra::DVector::from_iterator(
            self.coefficients.len(),
            self.coefficients.iter().map(|c| c.value),
        );

        Ok((design * beta).iter().cloned().collect())
    }

    fn foreign_term(&self, x_name: &str) -> Option<&Term> {
        self.formula
            .terms
            .iter()
            .find(|t| t.column().is_some_and(|c| c != x_name))
    }

    /// True when every term is a power of `x_name`, so the model can be evaluated from x alone.
    pub fn is_polynomial_in(&self, x_name: &str) -> bool {
        self.foreign_term(x_name).is_none()
    }

    /// Collapses the model to a polynomial in the table's x column. Fails when the response
    /// is not the table's y column or any term uses another column.
    pub fn to_fit_result(&self, table: &ObservationTable) -> Result<FitResult> {
        let invalid = |reason: String| Error::Formula {
            formula: self.formula.to_string(),
            reason,
        };

        if self.formula.response != table.y_name {
            return Err(invalid(format!(
                "response `{}` is not the y column `{}`",
                self.formula.response, table.y_name
            )));
        }

        if let Some(term) = self.foreign_term(&table.x_name) {
            return Err(invalid(format!(
                "term `{term}` is not a function of `{}`",
                table.x_name
            )));
        }

        Ok(FitResult {
            backend: Backend::Ols {
                formula: self.formula.to_string(),
            },
            coefficients: self.coefficients.clone(),
            r_squared: Some(self.r_squared),
        })
    }

    pub fn coefficient(&self, term: &Term) -> Option<&Coefficient> {
        let name = term.to_string();
        self.coefficients.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn table(x: Vec<f64>, y: Vec<f64>) -> ObservationTable {
        ObservationTable::from_columns("x", x, "y", y).unwrap()
    }

    #[test]
    fn matches_linregress_on_noisy_line() {
        let fit = ols("y ~ x", &table(vec![0., 1., 2., 3.], vec![1., 3., 2., 5.])).unwrap();

        let slope = fit.coefficient(&Term::Column("x".into())).unwrap();
        let stats = slope.stats.unwrap();

        assert_relative_eq!(slope.value, 1.1, epsilon = 1e-9);
        assert_relative_eq!(stats.std_err, 0.27f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(stats.p_value, 0.16847815937970012, epsilon = 1e-6);

        let intercept = fit.coefficient(&Term::Intercept).unwrap();
        assert_relative_eq!(intercept.stats.unwrap().std_err, 0.945f64.sqrt(), epsilon = 1e-9);

        assert_relative_eq!(fit.r_squared, 0.6914285714285714, epsilon = 1e-9);
        assert_relative_eq!(fit.adj_r_squared, 1. - 3. / 2. * (1. - 0.6914285714285714), epsilon = 1e-9);
        assert_relative_eq!(fit.residual_std_error, 1.35f64.sqrt(), epsilon = 1e-9);
        assert_eq!((fit.nobs, fit.df_model, fit.df_resid), (4, 1, 2));

        // with one regressor F = t^2 and shares its p value
        let (f, p) = fit.f_statistic.unwrap();
        assert_relative_eq!(f, stats.t_value.powi(2), epsilon = 1e-9);
        assert_abs_diff_eq!(p, stats.p_value, epsilon = 1e-9);
    }

    #[test]
    fn quadratic_formula_is_exact() {
        let x: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|x| 1. + 0.5 * x - 0.25 * x * x).collect();

        let fit = ols("y ~ x + I(x**2)", &table(x.clone(), y.clone())).unwrap();
        let result = fit.to_fit_result(&table(x.clone(), y.clone())).unwrap();
        let c = result.dense_coefficients();

        assert_abs_diff_eq!(c[0], 1., epsilon = 1e-9);
        assert_abs_diff_eq!(c[1], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(c[2], -0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.r_squared, 1., epsilon = 1e-9);

        for (p, y) in fit.predict(&table(x, y.clone())).unwrap().iter().zip(&y) {
            assert_abs_diff_eq!(p, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn without_intercept_uses_uncentred_r_squared() {
        let fit = ols("y ~ x - 1", &table(vec![1., 2., 3.], vec![2., 4.1, 5.9])).unwrap();

        assert_eq!(fit.coefficients.len(), 1);
        assert!(fit.f_statistic.is_none());

        let beta = (2. + 8.2 + 17.7) / 14.;
        assert_relative_eq!(fit.coefficients[0].value, beta, epsilon = 1e-9);

        let ssr: f64 = [(1f64, 2f64), (2., 4.1), (3., 5.9)]
            .iter()
            .map(|&(x, y)| (y - beta * x).powi(2))
            .sum();
        let expected = 1. - ssr / (4. + 4.1f64.powi(2) + 5.9f64.powi(2));
        assert_relative_eq!(fit.r_squared, expected, epsilon = 1e-9);
    }

    #[test]
    fn too_few_observations() {
        let err = ols("y ~ x", &table(vec![1., 2.], vec![1., 2.])).unwrap_err();
        assert!(matches!(err, Error::TooFewPoints { got: 2, min: 3 }));
    }

    #[test]
    fn foreign_column_cannot_become_polynomial() {
        let mut t = table(vec![1., 2., 3., 4.], vec![1., 2., 3., 5.]);
        t.extra = Some(("Time".into(), vec![0., 10., 20., 40.]));

        let fit = ols("y ~ x + Time", &t).unwrap();
        assert_eq!(fit.coefficients.len(), 3);
        assert!(!fit.is_polynomial_in("x"));
        assert!(matches!(fit.to_fit_result(&t), Err(Error::Formula { .. })));

        assert!(ols("y ~ x + I(x**2)", &t).unwrap().is_polynomial_in("x"));
    }

    #[test]
    fn response_must_be_the_y_column() {
        let t = table(vec![1., 2., 3., 4.], vec![1., 2., 3., 5.]);

        // regressing x on itself would be a polynomial in x, but not a model of y
        let fit = ols("x ~ I(x**2)", &t).unwrap();
        assert!(fit.is_polynomial_in("x"));
        assert!(matches!(
            fit.to_fit_result(&t),
            Err(Error::Formula { reason, .. }) if reason.contains("response")
        ));
    }

    #[test]
    fn constant_response_is_an_exact_fit() {
        let fit = ols("y ~ x", &table(vec![0., 1., 2., 3.], vec![1., 1., 1., 1.])).unwrap();

        assert_eq!(fit.r_squared, 1.);
        assert_eq!(fit.adj_r_squared, 1.);
        assert!(fit.f_statistic.is_none());
    }

    #[test]
    fn non_finite_column_rejected() {
        let mut t = table(vec![0., 1., 2., 3.], vec![0.1, 0.2, 0.5, 0.7]);
        t.extra = Some(("Time".into(), vec![0., f64::INFINITY, 2., 3.]));

        assert!(matches!(
            ols("y ~ x + Time", &t),
            Err(Error::NonFinite { column, index: 1 }) if column == "Time"
        ));
    }
}
