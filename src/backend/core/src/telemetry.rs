//! Logging and metrics initialization.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::ObservabilityConfig;

/// Initialize the tracing subscriber.
///
/// JSON output for production, compact single-line output otherwise.
/// Safe to call once per process; a second call returns an error from
/// `try_init`.
pub fn init_logging(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.log_level)?;

    if config.json_logging {
        let fmt_layer = fmt::layer()
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_target(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .compact()
            .with_file(true)
            .with_line_number(true)
            .with_target(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

/// Register descriptions for the counters the crate emits, so exporters
/// render them with units and help text.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "jobboard_policy_denials_total",
        "Authorization denials, labeled by action and reason"
    );
    metrics::describe_counter!(
        "jobboard_errors_total",
        "Errors surfaced to clients, labeled by code and category"
    );
    metrics::describe_counter!(
        "jobboard_http_requests_total",
        "HTTP requests served, labeled by method, path, and status"
    );
}
