//! Opt-in `tracing` setup for hosts embedding `chart-host`.
//!
//! Lifecycle transitions (instance creation and disposal, theme-switch
//! phases, rejected options) are reported through `tracing` under the
//! `chart_host` target. Hosts with their own subscriber need nothing here.

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "chart_host=info";

/// Installs a compact subscriber filtered by [`DEFAULT_FILTER`].
///
/// Returns `false` when the `telemetry` feature is disabled or a global
/// subscriber is already installed.
#[must_use]
pub fn init_default_tracing() -> bool {
    init_tracing(DEFAULT_FILTER)
}

/// Installs a compact subscriber. `RUST_LOG` takes precedence over
/// `fallback_filter`; an unparsable fallback leaves tracing uninitialized.
#[must_use]
pub fn init_tracing(fallback_filter: &str) -> bool {
    #[cfg(feature = "telemetry")]
    {
        use tracing_subscriber::EnvFilter;

        let Ok(filter) =
            EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback_filter))
        else {
            return false;
        };
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = fallback_filter;
        false
    }
}
