use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use drphil_core::telemetry as prom;
use tracing::info;

/// Bot counters, mirrored into the Prometheus registry
pub struct BotMetrics {
    // Stream tracking
    pub events_seen: AtomicU64,
    pub events_considered: AtomicU64,
    pub duplicate_tasks: AtomicU64,
    pub skips: AtomicU64,

    // Execution tracking
    pub votes_cast: AtomicU64,
    pub votes_failed: AtomicU64,
    pub pending_tasks: AtomicU64,

    // Health tracking
    pub stream_reconnects: AtomicU32,
    pub wasted_power: AtomicU32,
}

impl Default for BotMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl strategy::ports::TelemetryPort for BotMetrics {
    fn log_event_seen(&self) {
        self.events_seen.fetch_add(1, Ordering::Relaxed);
        prom::EVENTS_SEEN.inc();
    }

    fn log_event_considered(&self) {
        self.events_considered.fetch_add(1, Ordering::Relaxed);
        prom::EVENTS_CONSIDERED.inc();
    }

    fn log_skip(&self, reason: &'static str) {
        self.skips.fetch_add(1, Ordering::Relaxed);
        prom::SKIPS.with_label_values(&[reason]).inc();
    }

    fn log_duplicate_task(&self) {
        self.duplicate_tasks.fetch_add(1, Ordering::Relaxed);
        prom::DUPLICATE_TASKS.inc();
    }

    fn log_vote_cast(&self) {
        self.votes_cast.fetch_add(1, Ordering::Relaxed);
        prom::VOTES_CAST.inc();
    }

    fn log_vote_failed(&self, class: &'static str) {
        self.votes_failed.fetch_add(1, Ordering::Relaxed);
        prom::VOTE_FAILURES.with_label_values(&[class]).inc();
    }

    fn log_pending_tasks(&self, pending: usize) {
        self.pending_tasks.store(pending as u64, Ordering::Relaxed);
        prom::PENDING_TASKS.set(pending as i64);
    }

    fn log_wasted_power(&self, hundredths: u32) {
        self.wasted_power.store(hundredths, Ordering::Relaxed);
        prom::WASTED_POWER.set(hundredths as i64);
    }
}

impl BotMetrics {
    pub fn new() -> Self {
        Self {
            events_seen: AtomicU64::new(0),
            events_considered: AtomicU64::new(0),
            duplicate_tasks: AtomicU64::new(0),
            skips: AtomicU64::new(0),
            votes_cast: AtomicU64::new(0),
            votes_failed: AtomicU64::new(0),
            pending_tasks: AtomicU64::new(0),
            stream_reconnects: AtomicU32::new(0),
            wasted_power: AtomicU32::new(0),
        }
    }

    pub fn log_stream_reconnect(&self) {
        self.stream_reconnects.fetch_add(1, Ordering::Relaxed);
        prom::STREAM_RECONNECTS.inc();
    }

    pub fn print_summary(&self) {
        info!(
            "📈 Events: {} seen / {} considered ({} already pending) | Skips: {} | Votes: {} cast, {} failed | Pending: {} | Stream restarts: {}",
            self.events_seen.load(Ordering::Relaxed),
            self.events_considered.load(Ordering::Relaxed),
            self.duplicate_tasks.load(Ordering::Relaxed),
            self.skips.load(Ordering::Relaxed),
            self.votes_cast.load(Ordering::Relaxed),
            self.votes_failed.load(Ordering::Relaxed),
            self.pending_tasks.load(Ordering::Relaxed),
            self.stream_reconnects.load(Ordering::Relaxed),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy::ports::TelemetryPort;

    #[test]
    fn test_counters_track_port_calls() {
        let metrics = BotMetrics::new();
        metrics.log_event_seen();
        metrics.log_event_seen();
        metrics.log_skip("payout_declined");
        metrics.log_vote_failed("transport");
        metrics.log_pending_tasks(3);
        metrics.log_stream_reconnect();

        assert_eq!(metrics.events_seen.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.skips.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.votes_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.pending_tasks.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.stream_reconnects.load(Ordering::Relaxed), 1);
        assert!(prom::SKIPS.with_label_values(&["payout_declined"]).get() >= 1.0);
    }
}
