//! Logging setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::EoConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Calling this twice is
/// harmless: the second installation is ignored.
pub fn init_tracing(config: &EoConfig, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = if config.log_json {
        fmt()
            .with_env_filter(filter)
            .with_file(true)
            .with_line_number(true)
            .json()
            .flatten_event(true)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let config = EoConfig::default();
        init_tracing(&config, "debug");
        init_tracing(&config, "info");
        tracing::info!("still logging");
    }
}
