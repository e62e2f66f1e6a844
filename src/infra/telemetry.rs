use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "rubrika_cache_hit_total",
            Unit::Count,
            "Total number of object-cache hits."
        );
        describe_counter!(
            "rubrika_cache_miss_total",
            Unit::Count,
            "Total number of object-cache misses."
        );
        describe_counter!(
            "rubrika_cache_evict_total",
            Unit::Count,
            "Total number of cache entries evicted by invalidation events."
        );
        describe_gauge!(
            "rubrika_cache_event_queue_len",
            Unit::Count,
            "Current number of pending cache events in the queue."
        );
        describe_histogram!(
            "rubrika_cache_consume_ms",
            Unit::Milliseconds,
            "Cache event consumption latency in milliseconds."
        );
    });
}

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::*;

    // The global subscriber can be installed once per process; the second
    // attempt exercises the conflict mapping.
    #[test]
    fn init_installs_once_then_reports_conflict() {
        let settings = LoggingSettings {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        };

        init(&settings).expect("first install should succeed");
        let err = init(&settings).expect_err("second install should conflict");
        assert!(matches!(err, InfraError::Telemetry(_)));
    }
}
