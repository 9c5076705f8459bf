//! Tracing setup for the approval service. The engine emits its audit events
//! (workflow created, transition applied, step completed) at info level, so
//! the fallback filter pins this crate at info even when the configured base
//! level is quieter. `RUST_LOG` overrides everything.

use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    Filter { directives: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { directives, .. } => {
                write!(f, "invalid log filter '{directives}'")
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// Base level from config, with the engine's audit events kept visible unless
/// the configuration addresses this crate explicitly.
fn default_filter(log_level: &str) -> Result<EnvFilter, TelemetryError> {
    let directives = if log_level.contains("caseflow") {
        log_level.to_string()
    } else {
        format!("{log_level},caseflow=info")
    };
    EnvFilter::try_new(&directives)
        .map_err(|source| TelemetryError::Filter { directives, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_base_level_still_surfaces_audit_events() {
        let filter = default_filter("warn").expect("filter parses");
        assert!(filter.to_string().contains("caseflow=info"));
    }

    #[test]
    fn explicit_crate_directive_is_left_alone() {
        let filter = default_filter("warn,caseflow=debug").expect("filter parses");
        assert!(!filter.to_string().contains("caseflow=info"));
    }

    #[test]
    fn malformed_directives_are_reported() {
        assert!(matches!(
            default_filter("caseflow=loud"),
            Err(TelemetryError::Filter { .. })
        ));
    }
}
