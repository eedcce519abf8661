use approx::assert_abs_diff_eq;

use chem_fit::fit::{fit, linregress, ols, Backend};
use chem_fit::observations::synthetic_line;
use chem_fit::{report, ColumnSpec, Error, ObservationTable};

fn data_path(name: &str) -> String {
    format!("{}/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn all_backends(table: &ObservationTable) -> Vec<Backend> {
    vec![
        Backend::Polynomial { degree: 1 },
        Backend::LinRegress,
        Backend::Ols {
            formula: format!("{} ~ {}", table.y_name, table.x_name),
        },
        Backend::Estimator {
            fit_intercept: true,
        },
    ]
}

#[test]
fn exact_line_recovered_by_every_backend() {
    let xs: Vec<f64> = (0..10).map(|i| i as f64 * 0.1).collect();
    let table = synthetic_line(2., 1., &xs, 0., 0).unwrap();

    for backend in all_backends(&table) {
        let result = fit(&backend, &table).unwrap();

        assert_abs_diff_eq!(result.slope(), 2., epsilon = 1e-9);
        assert_abs_diff_eq!(result.intercept(), 1., epsilon = 1e-9);
        assert_abs_diff_eq!(result.r_squared().unwrap(), 1., epsilon = 1e-9);

        let predicted = result.predict(&table.x);
        assert_eq!(predicted.len(), table.len());
        for (p, y) in predicted.iter().zip(&table.y) {
            assert_abs_diff_eq!(p, y, epsilon = 1e-9);
        }
    }
}

#[test]
fn backends_agree_on_noisy_calibration() {
    let table =
        ObservationTable::from_path(data_path("calibration.csv"), &ColumnSpec::default()).unwrap();
    assert_eq!(table.len(), 7);

    let results: Vec<_> = all_backends(&table)
        .iter()
        .map(|b| fit(b, &table).unwrap())
        .collect();

    let reference = &results[0];
    assert!(reference.r_squared().unwrap() > 0.999);

    for result in &results[1..] {
        assert_abs_diff_eq!(result.slope(), reference.slope(), epsilon = 1e-9);
        assert_abs_diff_eq!(result.intercept(), reference.intercept(), epsilon = 1e-9);
        assert_abs_diff_eq!(
            result.r_squared().unwrap(),
            reference.r_squared().unwrap(),
            epsilon = 1e-9
        );
    }
}

#[test]
fn unknown_concentration_from_absorbance() {
    let table =
        ObservationTable::from_path(data_path("calibration.csv"), &ColumnSpec::default()).unwrap();
    let result = fit(&Backend::LinRegress, &table).unwrap();

    let measured = 0.45;
    let concentration = result.invert_linear(measured).unwrap();

    assert!(concentration > 0.3 && concentration < 0.4);
    assert_abs_diff_eq!(result.predict_one(concentration), measured, epsilon = 1e-12);
}

#[test]
fn transmittance_kinetics_fit() {
    let spec = ColumnSpec::new("Time", "Transmittance");
    let table = ObservationTable::from_path(data_path("kinetics.csv"), &spec)
        .unwrap()
        .y_to_absorbance(true)
        .unwrap();

    assert_eq!(table.y_name, "absorbance");
    assert_abs_diff_eq!(table.y[0], 1.0, epsilon = 1e-12);

    // %T grows by ~sqrt(2) every 30 s, so absorbance falls linearly
    let details = linregress::linregress(&table.x, &table.y).unwrap();
    assert!(details.slope < 0.);
    assert!(details.rvalue < -0.999);
    assert!(details.pvalue < 1e-6);
}

#[test]
fn ols_summary_on_file_data() {
    let table =
        ObservationTable::from_path(data_path("calibration.csv"), &ColumnSpec::default()).unwrap();

    let fit = ols::ols("absorbance ~ concentration + I(concentration**2)", &table).unwrap();
    assert_eq!(fit.coefficients.len(), 3);
    assert_eq!(fit.df_resid, 4);

    let summary = report::ols_summary(&fit);
    assert!(summary.contains("I(concentration**2)"));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = ObservationTable::load("/nonexistent/table.csv", &ColumnSpec::default()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn missing_column_in_file() {
    let spec = ColumnSpec::new("concentration", "Transmittance");
    let err = ObservationTable::from_path(data_path("calibration.csv"), &spec).unwrap_err();
    assert!(matches!(err, Error::MissingColumn(_)));
}

#[test]
fn multi_column_formula_reports_without_a_curve() {
    let data = "\
concentration,absorbance,Time
0.0,0.02,5
0.1,0.22,1
0.2,0.41,4
0.3,0.59,2
0.4,0.83,3
";
    let spec = ColumnSpec::default().with_extra("Time");
    let table = ObservationTable::from_csv_reader(data.as_bytes(), &spec).unwrap();

    let fit = ols::ols("absorbance ~ concentration + Time", &table).unwrap();
    assert_eq!(fit.coefficients.len(), 3);
    assert!(!fit.is_polynomial_in(&table.x_name));
    assert!(report::ols_summary(&fit).contains("Time"));

    assert!(matches!(fit.to_fit_result(&table), Err(Error::Formula { .. })));

    // a model of another column is not drawn over absorbance either
    let time_model = ols::ols("Time ~ concentration", &table).unwrap();
    assert!(time_model.to_fit_result(&table).is_err());
}

#[test]
fn nan_and_inf_in_file_are_rejected_before_fitting() {
    let data = "concentration,absorbance\n0,0.1\n1,nan\n2,0.5\n3,inf\n";
    let err =
        ObservationTable::from_csv_reader(data.as_bytes(), &ColumnSpec::default()).unwrap_err();

    assert!(matches!(err, Error::ParseValue { row: 3, .. }));
}

#[test]
fn constant_absorbance_is_a_perfect_fit() {
    let xs: Vec<f64> = (0..6).map(|i| i as f64 * 0.1).collect();
    let table = synthetic_line(0., 0.3, &xs, 0., 0).unwrap();

    for backend in all_backends(&table) {
        let result = fit(&backend, &table).unwrap();
        assert_abs_diff_eq!(result.r_squared().unwrap(), 1., epsilon = 1e-12);
    }

    let details = ols::ols("absorbance ~ concentration", &table).unwrap();
    assert_abs_diff_eq!(details.adj_r_squared, 1., epsilon = 1e-12);
    assert!(details.f_statistic.is_none());
}
