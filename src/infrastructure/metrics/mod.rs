//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connection gauges
//! - Inbound frame counts by type
//! - Persisted message count
//! - Broadcast delivery and delivery-failure counts
//! - Database query duration histograms

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active WebSocket connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            "websocket_connections_active",
            "Number of active WebSocket connections",
        )
        .namespace("channel_hub"),
        &["state"], // "connected", "authenticated"
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Inbound frames by protocol type ("unknown" and "malformed" included)
pub static WEBSOCKET_FRAMES_RECEIVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "websocket_frames_received_total",
            "Total number of inbound WebSocket frames",
        )
        .namespace("channel_hub"),
        &["type"],
    )
    .expect("Failed to create WEBSOCKET_FRAMES_RECEIVED_TOTAL metric")
});

/// Messages durably persisted
pub static MESSAGES_PERSISTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("messages_persisted_total", "Total number of persisted messages")
            .namespace("channel_hub"),
    )
    .expect("Failed to create MESSAGES_PERSISTED_TOTAL metric")
});

/// Frames enqueued to subscribers by the broadcast dispatcher
pub static BROADCAST_DELIVERIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "broadcast_deliveries_total",
            "Total number of frames delivered to channel subscribers",
        )
        .namespace("channel_hub"),
    )
    .expect("Failed to create BROADCAST_DELIVERIES_TOTAL metric")
});

/// Per-recipient broadcast failures, by reason
pub static BROADCAST_DELIVERY_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "broadcast_delivery_failures_total",
            "Total number of failed per-recipient broadcast deliveries",
        )
        .namespace("channel_hub"),
        &["reason"], // "queue_full", "closed", "unknown_connection"
    )
    .expect("Failed to create BROADCAST_DELIVERY_FAILURES_TOTAL metric")
});

/// Database query duration histogram
pub static DB_QUERY_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];
    HistogramVec::new(
        HistogramOpts::new(
            "db_query_duration_seconds",
            "Database query latency in seconds",
        )
        .namespace("channel_hub")
        .buckets(buckets),
        &["operation", "table"],
    )
    .expect("Failed to create DB_QUERY_DURATION_SECONDS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(WEBSOCKET_FRAMES_RECEIVED_TOTAL.clone()))
        .expect("Failed to register WEBSOCKET_FRAMES_RECEIVED_TOTAL");
    registry
        .register(Box::new(MESSAGES_PERSISTED_TOTAL.clone()))
        .expect("Failed to register MESSAGES_PERSISTED_TOTAL");
    registry
        .register(Box::new(BROADCAST_DELIVERIES_TOTAL.clone()))
        .expect("Failed to register BROADCAST_DELIVERIES_TOTAL");
    registry
        .register(Box::new(BROADCAST_DELIVERY_FAILURES_TOTAL.clone()))
        .expect("Failed to register BROADCAST_DELIVERY_FAILURES_TOTAL");
    registry
        .register(Box::new(DB_QUERY_DURATION_SECONDS.clone()))
        .expect("Failed to register DB_QUERY_DURATION_SECONDS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record database query metrics
pub fn record_db_query(operation: &str, table: &str, duration_secs: f64) {
    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation, table])
        .observe(duration_secs);
}

/// Helper to count a newly registered connection
pub fn connection_opened() {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["connected"])
        .inc();
}

/// Helper to count a connection gaining an identity
pub fn connection_authenticated() {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["authenticated"])
        .inc();
}

/// Helper to uncount a torn-down connection
pub fn connection_closed(authenticated: bool) {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["connected"])
        .dec();
    if authenticated {
        WEBSOCKET_CONNECTIONS_ACTIVE
            .with_label_values(&["authenticated"])
            .dec();
    }
}

/// Helper to count an inbound frame
pub fn record_frame_received(frame_type: &str) {
    WEBSOCKET_FRAMES_RECEIVED_TOTAL
        .with_label_values(&[frame_type])
        .inc();
}

/// Helper to count a persisted message
pub fn record_message_persisted() {
    MESSAGES_PERSISTED_TOTAL.inc();
}

/// Helper to record the outcome of one broadcast
pub fn record_broadcast(delivered: usize) {
    BROADCAST_DELIVERIES_TOTAL.inc_by(delivered as u64);
}

/// Helper to count a failed per-recipient delivery
pub fn record_delivery_failure(reason: &str) {
    BROADCAST_DELIVERY_FAILURES_TOTAL
        .with_label_values(&[reason])
        .inc();
}
