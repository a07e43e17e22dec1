//! Telemetry helpers for applications embedding `mip-series`.
//!
//! The engine only emits `tracing` events (pyramid builds, mutations,
//! provider requests, data-integrity warnings). Installing a subscriber is
//! left to the host: either call `init_default_tracing` or wire your own.

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "mip_series=info";

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`, falling back
/// to [`DEFAULT_FILTER`].
///
/// Only does something with the `telemetry` feature. Returns `false` when the
/// feature is off or the host already installed a global subscriber.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        use tracing_subscriber::EnvFilter;

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
