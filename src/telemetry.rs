//! Logging Setup
//!
//! Installs a `tracing` subscriber for hosts that don't bring their own.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "gridmerge=info";

/// Installs a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`. Fails if a global subscriber is already set.
pub fn init_logging(default_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // the first call may lose to another test's subscriber
        let _ = init_logging(DEFAULT_FILTER);
        assert!(init_logging(DEFAULT_FILTER).is_err());
    }
}
