use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, ValueEnum};
use tracing::warn;

use crate::error::{Error, Result};
use crate::fit::formula::MAX_EXPONENT;
use crate::fit::Backend;
use crate::observations::{synthetic_line, ColumnSpec, ObservationTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Poly,
    Linregress,
    Ols,
    Estimator,
}

/// Where the observations come from and which columns to use.
#[derive(ClapArgs, Debug, Clone)]
pub struct DataArgs {
    /// CSV file path or http(s) URL
    #[clap(short, long)]
    pub data: Option<String>,

    #[clap(long, default_value = "concentration")]
    pub x: String,

    #[clap(long, default_value = "absorbance")]
    pub y: String,

    /// Optional third column kept alongside x and y, e.g. Time
    #[clap(long)]
    pub extra: Option<String>,

    /// Treat the y column as transmittance and convert it to absorbance
    #[clap(long)]
    pub transmittance: bool,

    /// Transmittance is given in percent
    #[clap(long, requires = "transmittance")]
    pub percent: bool,

    /// Generate calibration data instead of reading --data
    #[clap(long, conflicts_with = "data")]
    pub synthetic: bool,

    #[clap(long, default_value_t = 2.0, allow_negative_numbers = true)]
    pub slope: f64,

    #[clap(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub intercept: f64,

    #[clap(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub noise: f64,

    #[clap(long, default_value_t = 42)]
    pub seed: u64,

    #[clap(long, default_value_t = 10)]
    pub points: usize,

    #[clap(long, default_value_t = 1.0)]
    pub x_max: f64,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Fit calibration data and report the fit", long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub input: DataArgs,

    #[clap(short, long, value_enum, default_value_t = BackendKind::Linregress)]
    pub backend: BackendKind,

    #[clap(long, default_value_t = 1)]
    pub degree: usize,

    /// Formula for the ols backend, defaults to `<y> ~ <x>`
    #[clap(short, long)]
    pub formula: Option<String>,

    #[clap(long)]
    pub no_intercept: bool,

    #[clap(long, default_value = "plots/fit.svg")]
    pub plot: PathBuf,

    #[clap(long)]
    pub residuals: Option<PathBuf>,

    /// x values to predict y for
    #[clap(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub predict: Vec<f64>,

    /// y values to solve x for (linear fits only)
    #[clap(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub invert: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Location(String),
    Synthetic {
        slope: f64,
        intercept: f64,
        noise: f64,
        seed: u64,
        points: usize,
        x_max: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub source: DataSource,
    pub columns: ColumnSpec,
    /// `Some(percent)` when y holds transmittance.
    pub transmittance: Option<bool>,
}

impl DataConfig {
    pub fn from_args(args: DataArgs) -> Self {
        let source = match args.data {
            Some(location) if !args.synthetic => DataSource::Location(location),
            _ => DataSource::Synthetic {
                slope: args.slope,
                intercept: args.intercept,
                noise: args.noise,
                seed: args.seed,
                points: args.points,
                x_max: args.x_max,
            },
        };

        let mut columns = ColumnSpec::new(args.x, args.y);
        if let Some(extra) = args.extra {
            columns = columns.with_extra(extra);
        }

        Self {
            source,
            columns,
            transmittance: args.transmittance.then_some(args.percent),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let DataSource::Synthetic {
            noise,
            points,
            x_max,
            ..
        } = self.source
        {
            if points < 2 {
                return Err(Error::Config("--points must be at least 2".into()));
            }
            if !(noise >= 0.) {
                return Err(Error::Config("--noise must be non-negative".into()));
            }
            if !(x_max > 0.) {
                return Err(Error::Config("--x-max must be positive".into()));
            }
        }

        Ok(())
    }

    pub fn load(&self) -> Result<ObservationTable> {
        let table = match &self.source {
            DataSource::Location(location) => ObservationTable::load(location, &self.columns)?,
            DataSource::Synthetic {
                slope,
                intercept,
                noise,
                seed,
                points,
                x_max,
            } => {
                let xs: Vec<f64> = (0..*points)
                    .map(|i| x_max * i as f64 / (*points - 1) as f64)
                    .collect();
                let mut table = synthetic_line(*slope, *intercept, &xs, *noise, *seed)?;
                table.x_name = self.columns.x.clone();
                table.y_name = self.columns.y.clone();
                table
            }
        };

        match self.transmittance {
            Some(percent) => table.y_to_absorbance(percent),
            None => Ok(table),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub data: DataConfig,
    pub backend: Backend,
    pub plot: PathBuf,
    pub residuals: Option<PathBuf>,
    pub predict: Vec<f64>,
    pub invert: Vec<f64>,
}

impl RunConfig {
    pub fn from_args(args: Args) -> Self {
        let data = DataConfig::from_args(args.input);

        if args.formula.is_some() && args.backend != BackendKind::Ols {
            warn!("--formula is only used by the ols backend");
        }

        let backend = match args.backend {
            BackendKind::Poly => Backend::Polynomial {
                degree: args.degree,
            },
            BackendKind::Linregress => Backend::LinRegress,
            BackendKind::Ols => {
                let formula = args.formula.unwrap_or_else(|| {
                    let suffix = if args.no_intercept { " - 1" } else { "" };
                    // transmittance is converted before fitting
                    let response = match data.transmittance {
                        Some(_) => "absorbance",
                        None => data.columns.y.as_str(),
                    };
                    format!("{response} ~ {}{suffix}", data.columns.x)
                });
                Backend::Ols { formula }
            }
            BackendKind::Estimator => Backend::Estimator {
                fit_intercept: !args.no_intercept,
            },
        };

        Self {
            data,
            backend,
            plot: args.plot,
            residuals: args.residuals,
            predict: args.predict,
            invert: args.invert,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;

        match &self.backend {
            Backend::Ols { formula } if formula.trim().is_empty() => {
                Err(Error::Config("formula must not be empty".into()))
            }
            Backend::Polynomial { degree } if *degree > MAX_EXPONENT as usize => {
                Err(Error::Config(format!(
                    "degree {degree} is not a sensible calibration model"
                )))
            }
            _ => Ok(()),
        }
    }
}
