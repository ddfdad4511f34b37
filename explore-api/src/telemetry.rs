//! Tracing Subscriber Initialization
//!
//! Structured logs via `tracing-subscriber`. JSON lines by default, human
//! readable output when `EXPLORE_LOG_FORMAT=pretty`. The filter comes from
//! `RUST_LOG` and falls back to [`DEFAULT_FILTER`].

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_FILTER: &str = "explore_api=info,explore_storage=info,tower_http=info,warn";

/// Install the global subscriber. Call once at startup.
pub fn init_tracing(format: LogFormat) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        log_format = ?format,
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_second_init_fails_cleanly() {
        let _ = init_tracing(LogFormat::Pretty);
        let err = init_tracing(LogFormat::Json).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InternalError);
    }
}
