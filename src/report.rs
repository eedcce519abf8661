use itertools::Itertools;

use crate::fit::linregress::LinregressResult;
use crate::fit::ols::OlsFit;
use crate::fit::FitResult;

fn term(power: usize, x_name: &str) -> String {
    match power {
        0 => String::new(),
        1 => x_name.to_string(),
        _ => format!("{x_name}^{power}"),
    }
}

/// `y = 2.0000x + 1.0000`, highest power first.
pub fn equation(result: &FitResult, x_name: &str, y_name: &str) -> String {
    let rhs = result
        .dense_coefficients()
        .iter()
        .enumerate()
        .rev()
        .enumerate()
        .map(|(i, (power, c))| {
            let sign = match (i, *c < 0.) {
                (0, true) => "-",
                (0, false) => "",
                (_, true) => "- ",
                (_, false) => "+ ",
            };
            format!("{sign}{:.4}{}", c.abs(), term(power, x_name))
        })
        .join(" ");

    format!("{y_name} = {rhs}")
}

pub fn r_squared_line(result: &FitResult) -> String {
    match result.r_squared() {
        Some(r2) => format!("R² = {r2:.4}"),
        None => "R² = n/a".to_string(),
    }
}

pub fn render(result: &FitResult, x_name: &str, y_name: &str) -> String {
    let stats = result.coefficients().iter().filter_map(|c| {
        c.stats.map(|s| {
            format!(
                "  {:<16} {:>12.6}  se {:.6}  t {:.3}  p {:.4}\n",
                c.name, c.value, s.std_err, s.t_value, s.p_value
            )
        })
    });

    format!(
        "{}\n{}\n{}\n{}",
        result.backend,
        equation(result, x_name, y_name),
        r_squared_line(result),
        stats.collect::<String>()
    )
}

pub fn linregress_block(result: &LinregressResult) -> String {
    format!(
        "slope: {:.6}\nintercept: {:.6}\nr: {:.6}\np: {:.4e}\nstderr: {:.6}\nintercept stderr: {:.6}\n",
        result.slope,
        result.intercept,
        result.rvalue,
        result.pvalue,
        result.stderr,
        result.intercept_stderr
    )
}

/// Plain-text regression summary table.
pub fn ols_summary(fit: &OlsFit) -> String {
    let rule = "=".repeat(72);
    let thin = "-".repeat(72);

    let mut lines = vec![
        rule.clone(),
        format!("OLS Regression Results: {}", fit.formula),
        rule.clone(),
        format!(
            "No. Observations: {:>8}    R-squared:      {:>10.4}",
            fit.nobs, fit.r_squared
        ),
        format!(
            "Df Residuals:     {:>8}    Adj. R-squared: {:>10.4}",
            fit.df_resid, fit.adj_r_squared
        ),
    ];

    match fit.f_statistic {
        Some((f, p)) => {
            lines.push(format!(
                "Df Model:         {:>8}    F-statistic:    {:>10.4}",
                fit.df_model, f
            ));
            lines.push(format!("{:<30}Prob (F):       {:>10.4e}", "", p));
        }
        None => lines.push(format!("Df Model:         {:>8}", fit.df_model)),
    }

    lines.push(thin.clone());
    lines.push(format!(
        "{:<22}{:>12}{:>12}{:>12}{:>12}",
        "", "coef", "std err", "t", "P>|t|"
    ));
    lines.push(thin);

    lines.extend(fit.coefficients.iter().map(|c| {
        let stats = c
            .stats
            .map(|s| format!("{:>12.4}{:>12.3}{:>12.3}", s.std_err, s.t_value, s.p_value))
            .unwrap_or_default();
        format!("{:<22}{:>12.4}{stats}", c.name, c.value)
    }));

    lines.push(rule);
    lines.push(format!("Residual std. error: {:.4}", fit.residual_std_error));

    lines.join("\n") + "\n"
}
