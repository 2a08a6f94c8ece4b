//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the relay service: connection
//! and queue gauges, match lifecycle counters, and relay traffic.

use anyhow::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a match left the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEndReason {
    /// Both participants ended it voluntarily
    Explicit,
    /// A participant disconnected
    Disconnect,
}

impl MatchEndReason {
    fn as_label(self) -> &'static str {
        match self {
            MatchEndReason::Explicit => "explicit",
            MatchEndReason::Disconnect => "disconnect",
        }
    }
}

/// Main metrics collector for the relay service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Connection, queue and match metrics
    session_metrics: SessionMetrics,

    /// Message traffic metrics
    relay_metrics: RelayMetrics,
}

/// Connection, queue and match metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Open WebSocket connections
    pub connections: IntGauge,

    /// Participants waiting for an opponent
    pub queue_length: IntGauge,

    /// Matches currently in the registry
    pub active_matches: IntGauge,

    /// Total matches started
    pub matches_started_total: IntCounter,

    /// Total matches ended, by reason
    pub matches_ended_total: IntCounterVec,
}

/// Message traffic metrics
#[derive(Clone)]
pub struct RelayMetrics {
    /// Moves forwarded to a peer
    pub moves_relayed_total: IntCounter,

    /// Forced-end notifications sent to surviving peers
    pub forced_ends_total: IntCounter,

    /// Requests rejected back to their sender, by reason
    pub rejected_messages_total: IntCounterVec,

    /// Deliveries that failed because the recipient was gone
    pub delivery_failures_total: IntCounter,

    /// Time spent handling one inbound message
    pub message_processing_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let session_metrics = SessionMetrics::new(&registry)?;
        let relay_metrics = RelayMetrics::new(&registry)?;

        Ok(Self {
            registry,
            session_metrics,
            relay_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn session(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    pub fn relay(&self) -> &RelayMetrics {
        &self.relay_metrics
    }

    pub fn record_connection_opened(&self) {
        self.session_metrics.connections.inc();
    }

    pub fn record_connection_closed(&self) {
        self.session_metrics.connections.dec();
    }

    pub fn set_queue_length(&self, len: usize) {
        self.session_metrics.queue_length.set(len as i64);
    }

    pub fn record_match_started(&self, active_matches: usize) {
        self.session_metrics.matches_started_total.inc();
        self.session_metrics
            .active_matches
            .set(active_matches as i64);
    }

    pub fn record_match_ended(&self, reason: MatchEndReason, active_matches: usize) {
        self.session_metrics
            .matches_ended_total
            .with_label_values(&[reason.as_label()])
            .inc();
        self.session_metrics
            .active_matches
            .set(active_matches as i64);
    }

    pub fn record_move_relayed(&self) {
        self.relay_metrics.moves_relayed_total.inc();
    }

    pub fn record_forced_end(&self) {
        self.relay_metrics.forced_ends_total.inc();
    }

    pub fn record_rejection(&self, reason: &str) {
        self.relay_metrics
            .rejected_messages_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn record_delivery_failure(&self) {
        self.relay_metrics.delivery_failures_total.inc();
    }

    pub fn record_message_processed(&self, duration: Duration) {
        self.relay_metrics
            .message_processing_duration
            .observe(duration.as_secs_f64());
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let connections = IntGauge::new("gomoku_relay_connections", "Open game connections")?;
        registry.register(Box::new(connections.clone()))?;

        let queue_length = IntGauge::new(
            "gomoku_relay_queue_length",
            "Participants waiting for an opponent",
        )?;
        registry.register(Box::new(queue_length.clone()))?;

        let active_matches =
            IntGauge::new("gomoku_relay_active_matches", "Matches currently active")?;
        registry.register(Box::new(active_matches.clone()))?;

        let matches_started_total = IntCounter::new(
            "gomoku_relay_matches_started_total",
            "Total matches started",
        )?;
        registry.register(Box::new(matches_started_total.clone()))?;

        let matches_ended_total = IntCounterVec::new(
            Opts::new("gomoku_relay_matches_ended_total", "Total matches ended"),
            &["reason"],
        )?;
        registry.register(Box::new(matches_ended_total.clone()))?;

        Ok(Self {
            connections,
            queue_length,
            active_matches,
            matches_started_total,
            matches_ended_total,
        })
    }
}

impl RelayMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let moves_relayed_total = IntCounter::new(
            "gomoku_relay_moves_relayed_total",
            "Moves forwarded to a peer",
        )?;
        registry.register(Box::new(moves_relayed_total.clone()))?;

        let forced_ends_total = IntCounter::new(
            "gomoku_relay_forced_ends_total",
            "Forced match-end notifications sent",
        )?;
        registry.register(Box::new(forced_ends_total.clone()))?;

        let rejected_messages_total = IntCounterVec::new(
            Opts::new(
                "gomoku_relay_rejected_messages_total",
                "Requests rejected back to their sender",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(rejected_messages_total.clone()))?;

        let delivery_failures_total = IntCounter::new(
            "gomoku_relay_delivery_failures_total",
            "Deliveries to connections that were already gone",
        )?;
        registry.register(Box::new(delivery_failures_total.clone()))?;

        let message_processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "gomoku_relay_message_processing_seconds",
                "Time spent handling one inbound message",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(message_processing_duration.clone()))?;

        Ok(Self {
            moves_relayed_total,
            forced_ends_total,
            rejected_messages_total,
            delivery_failures_total,
            message_processing_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
