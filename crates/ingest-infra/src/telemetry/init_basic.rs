use ingest_core::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid. Targets match by prefix, so this
/// covers every `ingest_*` crate.
pub const DEFAULT_FILTER: &str = "ingest=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Initialize tracing with a pretty or JSON formatter.
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let registry = tracing_subscriber::registry().with(env_filter());
    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()?,
    }

    tracing::debug!(format = ?format, "Tracing initialized");
    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::debug!("Telemetry shutdown");
}
