/// Tracing bootstrap
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (e.g.
/// `"choreshare=info"`) is used. `json` switches the formatter to one JSON
/// object per line.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds the filter used by [`init_tracing`]
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into())
}

/// Installs the global tracing subscriber
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init_tracing(default_filter: &str, json: bool) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(default_filter));

    if json {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer()).try_init()?;
    }

    tracing::debug!(json, "Tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_fails() {
        // Other tests in this binary may have installed a subscriber first
        let _ = init_tracing("choreshare=debug", false);
        assert!(init_tracing("choreshare=debug", true).is_err());
    }
}
