use chem_fit::config::{Args, RunConfig};
use chem_fit::fit::{fit, linregress, ols, Backend};
use chem_fit::{plots, report};

use clap::Parser;
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    chem_fit::init_tracing();

    let config = RunConfig::from_args(Args::parse());
    config.validate()?;

    let table = config.data.load()?;
    info!(rows = table.len(), backend = %config.backend, "fitting");

    // backends with richer output than the common fit result are solved here once
    let result = match &config.backend {
        Backend::LinRegress => {
            let details = linregress::linregress(&table.x, &table.y)?;
            let result = details.into_fit_result();
            println!("{}", report::render(&result, &table.x_name, &table.y_name));
            println!("{}", report::linregress_block(&details));
            result
        }
        Backend::Ols { formula } => {
            let details = ols::ols(formula, &table)?;
            println!("{}", report::ols_summary(&details));

            match details.to_fit_result(&table) {
                Ok(result) => {
                    println!("{}", report::equation(&result, &table.x_name, &table.y_name));
                    result
                }
                Err(e) => {
                    warn!("{e}; skipping predictions, inversion and plots");
                    return Ok(());
                }
            }
        }
        backend => {
            let result = fit(backend, &table)?;
            println!("{}", report::render(&result, &table.x_name, &table.y_name));
            result
        }
    };

    if !config.predict.is_empty() {
        for (x, y) in config.predict.iter().zip(result.predict(&config.predict)) {
            println!("{} = {x:.4} -> {} = {y:.4}", table.x_name, table.y_name);
        }
    }

    for y in &config.invert {
        match result.invert_linear(*y) {
            Ok(x) => println!("{} = {y:.4} -> {} = {x:.4}", table.y_name, table.x_name),
            Err(e) => warn!("cannot invert {y}: {e}"),
        }
    }

    let label = config.backend.to_string();
    plots::write_fit_svg(
        &config.plot,
        &table,
        &[(label.as_str(), &result)],
        &format!("{} vs {}", table.y_name, table.x_name),
    )?;

    if let Some(path) = &config.residuals {
        plots::write_residuals_svg(path, &table, &result)?;
    }

    Ok(())
}
