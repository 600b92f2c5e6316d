//! Tracing setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
///
/// - Environment-based filtering via `RUST_LOG`
/// - Default log level of `info` for this crate and `tower_http`
///
/// Set `LOG_FORMAT=json` for structured JSON output (useful for log aggregation).
/// Default is human-readable text output.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("company_connector=info".parse()?)
        .add_directive("tower_http=info".parse()?);

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(false))
            .init();
    }

    Ok(())
}
