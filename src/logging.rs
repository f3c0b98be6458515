//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;
use crate::{Result, TravelMapError};

/// Filter directive for the configured level; `verbose` forces debug output
/// for this crate.
#[must_use]
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        format!("{},travelmap=debug", config.level)
    } else {
        config.level.clone()
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Logs go to stderr so stdout stays usable for output.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(config, verbose)))
        .map_err(|e| TravelMapError::config(format!("invalid log filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format.as_str() {
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| TravelMapError::config(format!("logging already initialised: {e}")))
}
