pub mod config;
pub mod error;
pub mod fit;
pub mod observations;
pub mod plots;
pub mod report;

pub use error::{Error, Result};
pub use fit::{fit, Backend, FitResult};
pub use observations::{ColumnSpec, ObservationTable};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs go to stderr so the printed report stays clean. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chem_fit=info,compare_backends=info".into()),
        )
        .init();
}
