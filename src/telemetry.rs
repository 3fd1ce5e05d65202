//! Tracing setup for binaries and examples.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the application. [`init_tracing`] installs the one the `stepgraph`
//! binary uses: `RUST_LOG` if set, otherwise [`DEFAULT_FILTER`], with span
//! open/close events so instrumented runs and steps are visible.

use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "error,stepgraph=info";

/// Installs the global subscriber. Returns `false` if one was already set.
pub fn init_tracing() -> bool {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_refused() {
        let _ = init_tracing();
        assert!(!init_tracing());
    }
}
