use std::path::PathBuf;

use chem_fit::config::{DataArgs, DataConfig};
use chem_fit::fit::{fit, Backend, FitResult};
use chem_fit::{plots, report};

use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run every backend on one dataset", long_about = None)]
struct Args {
    #[command(flatten)]
    input: DataArgs,

    /// Degree of the extra polynomial fit drawn next to the linear ones
    #[clap(long, default_value_t = 2)]
    degree: usize,

    #[clap(long, default_value = "plots/compare_backends.svg")]
    plot: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    chem_fit::init_tracing();

    let args = Args::parse();

    let data = DataConfig::from_args(args.input);
    data.validate()?;

    let table = data.load()?;

    let backends = [
        Backend::Polynomial { degree: 1 },
        Backend::Polynomial {
            degree: args.degree,
        },
        Backend::LinRegress,
        Backend::Ols {
            formula: format!("{} ~ {}", table.y_name, table.x_name),
        },
        Backend::Estimator {
            fit_intercept: true,
        },
    ];

    let mut results: Vec<(String, FitResult)> = Vec::new();

    for backend in backends {
        match fit(&backend, &table) {
            Ok(result) => results.push((backend.to_string(), result)),
            Err(e) => warn!(backend = %backend, "skipped: {e}"),
        }
    }

    println!(
        "{:<45}{:>12}{:>12}{:>10}",
        "backend", "slope", "intercept", "R²"
    );
    for (label, result) in &results {
        println!(
            "{:<45}{:>12.6}{:>12.6}{:>10}",
            label,
            result.slope(),
            result.intercept(),
            result
                .r_squared()
                .map(|r2| format!("{r2:.6}"))
                .unwrap_or_else(|| "n/a".to_string())
        );
    }

    println!();
    for (_, result) in &results {
        println!("{}", report::equation(result, &table.x_name, &table.y_name));
    }

    let fits: Vec<(&str, &FitResult)> = results.iter().map(|(l, r)| (l.as_str(), r)).collect();

    plots::write_fit_svg(&args.plot, &table, &fits, "Backend comparison")?;

    info!(backends = results.len(), "comparison done");

    Ok(())
}
