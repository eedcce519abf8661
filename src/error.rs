use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("column `{0}` not found in table header")]
    MissingColumn(String),

    #[error("row {row}: column `{column}` has non-numeric value `{value}`")]
    ParseValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("{column}[{index}] is not a finite number")]
    NonFinite { column: String, index: usize },

    #[error("x has {x_len} values but y has {y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },

    #[error("need at least {min} observations, got {got}")]
    TooFewPoints { got: usize, min: usize },

    #[error("polynomial degree {degree} is too high for {points} points")]
    DegreeTooHigh { degree: usize, points: usize },

    #[error("all x values are identical, slope is undefined")]
    ConstantInput,

    #[error("least squares system could not be solved")]
    Singular,

    #[error("invalid formula `{formula}`: {reason}")]
    Formula { formula: String, reason: String },

    #[error("transmittance must be positive, got {0}")]
    NonPositiveTransmittance(f64),

    #[error("model is not linear in x, cannot invert")]
    NotInvertible,

    #[error("estimator used before fit")]
    NotFitted,

    #[error("statistical distribution error: {0}")]
    Distribution(String),

    #[error("estimator failed: {0}")]
    Estimator(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
