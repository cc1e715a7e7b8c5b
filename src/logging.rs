//! Logging setup
//!
//! Installs a global tracing subscriber writing human-readable lines to
//! stderr. The level comes from `RUST_LOG`, defaulting to `info`.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

static INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// `RUST_LOG` could not be parsed
    #[error("Invalid RUST_LOG directive: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    /// Another global subscriber is already installed
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Initialize tracing. Subsequent calls are no-ops.
pub fn init() -> Result<(), LoggingError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = build_env_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(LoggingError::SetGlobal)?;
    let _ = INITIALIZED.set(());
    Ok(())
}

fn build_env_filter(directives: Option<&str>) -> Result<EnvFilter, LoggingError> {
    match directives.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => Ok(EnvFilter::try_new(directives)?),
        None => Ok(EnvFilter::new(DEFAULT_FILTER)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_when_unset() {
        let filter = build_env_filter(None).unwrap();
        assert_eq!(filter.to_string(), "info");
        assert_eq!(build_env_filter(Some("  ")).unwrap().to_string(), "info");
    }

    #[test]
    fn test_explicit_directives() {
        let filter = build_env_filter(Some("catpaper=debug")).unwrap();
        assert_eq!(filter.to_string(), "catpaper=debug");
    }

    #[test]
    fn test_invalid_directive_is_reported() {
        assert!(matches!(
            build_env_filter(Some("catpaper=notalevel")),
            Err(LoggingError::Filter(_))
        ));
    }
}
