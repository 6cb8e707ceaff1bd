// src/telemetry.rs

// tracing subscriber setup for the service binary

// dependencies
use crate::errors::Error;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

/// Install the global tracing subscriber.
///
/// The filter is the first valid candidate among `explicit_filter`,
/// `RUST_LOG` and `info`.
///
/// # Errors
///
/// Returns an error when no filter parses, when JSON output is requested
/// without the `json-logs` feature, or when a global subscriber is already set.
pub fn init_tracing(explicit_filter: Option<&str>, use_json: bool) -> Result<(), Error> {
    let filter = resolve_filter(explicit_filter, std::env::var("RUST_LOG").ok())?;

    #[cfg(feature = "json-logs")]
    if use_json {
        let subscriber = Registry::default().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .json()
                .flatten_event(true),
        );
        return tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| Error::Telemetry(err.to_string()));
    }

    #[cfg(not(feature = "json-logs"))]
    if use_json {
        return Err(Error::Telemetry(
            "binary was built without the `json-logs` feature".to_string(),
        ));
    }

    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| Error::Telemetry(err.to_string()))
}

fn resolve_filter(explicit: Option<&str>, from_env: Option<String>) -> Result<EnvFilter, Error> {
    explicit
        .map(str::to_string)
        .into_iter()
        .chain(from_env)
        .chain(std::iter::once("info".to_string()))
        .find_map(|candidate| EnvFilter::try_new(candidate).ok())
        .ok_or_else(|| Error::Telemetry("invalid log filter".to_string()))
}
