//! Telemetry helpers for applications embedding `histview`.
//!
//! Tracing setup stays explicit and opt-in. Hosts either call
//! `init_default_tracing` or wire their own `tracing` subscriber; query,
//! export and render passes emit `debug!`/`trace!` events either way.

/// Installs a compact `tracing` subscriber filtered by `RUST_LOG` when the
/// `telemetry` feature is enabled.
///
/// Returns `true` when initialization succeeds.
/// Returns `false` when the feature is disabled or a global subscriber was
/// already set by the host application.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("histview=info")),
            )
            .with_target(false)
            .compact();

        return builder.try_init().is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
