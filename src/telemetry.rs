// src/telemetry.rs
//! Tracing setup for binaries. Library code only emits events.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Targets used across the crate; default filter keeps them at info.
pub const DEFAULT_FILTER: &str =
    "ingest=info,enrich=info,analyze=info,pipeline=info,notify=info,warn";

/// Install the global subscriber. `RUST_LOG` overrides the default filter,
/// `LOG_FORMAT=json` switches to JSON lines. Safe to call twice (second call is a no-op).
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
