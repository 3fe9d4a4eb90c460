//! Prometheus metrics

use crate::store::UpdateOutcome;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Decode plus store apply for one stream frame
    FrameProcessing,
    /// One snapshot request during bootstrap
    BootstrapRequest,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Inbound stream frames (text or binary)
    FramesReceived,
    /// Frames that decoded to no updates
    FramesDropped,
    /// Subscribe messages that failed to send
    SubscribeFailures,
    /// Bootstrap requests that produced a price
    BootstrapSuccess,
    /// Bootstrap requests that soft-failed
    BootstrapFailure,
    /// Reconnect attempts made by the supervisor
    ReconnectAttempts,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Stream connection state (0 = disconnected .. 3 = receiving)
    ConnectionState,
    /// Quotes that currently have a price
    PricedQuotes,
}

impl LatencyMetric {
    fn name(self) -> &'static str {
        match self {
            LatencyMetric::FrameProcessing => "quote_stream_frame_processing_ms",
            LatencyMetric::BootstrapRequest => "quote_stream_bootstrap_request_ms",
        }
    }
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::FramesReceived => "quote_stream_frames_received_total",
            CounterMetric::FramesDropped => "quote_stream_frames_dropped_total",
            CounterMetric::SubscribeFailures => "quote_stream_subscribe_failures_total",
            CounterMetric::BootstrapSuccess => "quote_stream_bootstrap_success_total",
            CounterMetric::BootstrapFailure => "quote_stream_bootstrap_failure_total",
            CounterMetric::ReconnectAttempts => "quote_stream_reconnect_attempts_total",
        }
    }
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::ConnectionState => "quote_stream_connection_state",
            GaugeMetric::PricedQuotes => "quote_stream_priced_quotes",
        }
    }
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    metrics::histogram!(metric.name()).record(duration.as_secs_f64() * 1000.0);
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    metrics::counter!(metric.name()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Count one applied store update, labelled by outcome
pub fn record_update(outcome: UpdateOutcome) {
    metrics::counter!("quote_stream_updates_total", "outcome" => outcome.as_str()).increment(1);
}
