use prometheus::{Counter, CounterVec, IntGauge, Opts, Registry};
use lazy_static::lazy_static;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Decision metrics
    pub static ref EVENTS_SEEN: Counter = Counter::new(
        "events_seen_total",
        "Comment operations received from the stream or relay"
    ).expect("metric can be created");

    pub static ref EVENTS_CONSIDERED: Counter = Counter::new(
        "events_considered_total",
        "Events that passed the pre-check and were scheduled"
    ).expect("metric can be created");

    pub static ref SKIPS: CounterVec = CounterVec::new(
        Opts::new("skips_total", "Scheduled posts skipped, by reason"),
        &["reason"]
    ).expect("metric can be created");

    pub static ref DUPLICATE_TASKS: Counter = Counter::new(
        "duplicate_tasks_total",
        "Events dropped because a vote was already pending for the post"
    ).expect("metric can be created");

    // Execution metrics
    pub static ref VOTES_CAST: Counter = Counter::new(
        "votes_cast_total",
        "Votes successfully broadcast"
    ).expect("metric can be created");

    pub static ref VOTE_FAILURES: CounterVec = CounterVec::new(
        Opts::new("vote_failures_total", "Failed vote broadcasts, by class"),
        &["class"]
    ).expect("metric can be created");

    pub static ref PENDING_TASKS: IntGauge = IntGauge::new(
        "pending_vote_tasks",
        "Per-post vote tasks currently in flight"
    ).expect("metric can be created");

    // Health metrics
    pub static ref STREAM_RECONNECTS: Counter = Counter::new(
        "stream_reconnects_total",
        "Times the event source was restarted after an error"
    ).expect("metric can be created");

    pub static ref WASTED_POWER: IntGauge = IntGauge::new(
        "wasted_vote_power_hundredths",
        "Vote power above 100 % across the pool at the last poll, in hundredths of a percent"
    ).expect("metric can be created");
}

pub fn init_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(EVENTS_SEEN.clone()))?;
    REGISTRY.register(Box::new(EVENTS_CONSIDERED.clone()))?;
    REGISTRY.register(Box::new(SKIPS.clone()))?;
    REGISTRY.register(Box::new(DUPLICATE_TASKS.clone()))?;
    REGISTRY.register(Box::new(VOTES_CAST.clone()))?;
    REGISTRY.register(Box::new(VOTE_FAILURES.clone()))?;
    REGISTRY.register(Box::new(PENDING_TASKS.clone()))?;
    REGISTRY.register(Box::new(STREAM_RECONNECTS.clone()))?;
    REGISTRY.register(Box::new(WASTED_POWER.clone()))?;
    Ok(())
}

/// Renders the registry in the Prometheus text exposition format.
pub fn gather_text() -> Result<String, prometheus::Error> {
    use prometheus::{Encoder, TextEncoder};

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_counter_labels() {
        SKIPS.with_label_values(&["payout_declined"]).inc();
        assert!(SKIPS.with_label_values(&["payout_declined"]).get() >= 1.0);
    }
}
