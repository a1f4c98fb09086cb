//! Prometheus metrics for the marketplace core.
//!
//! All metrics follow the naming convention: `tm_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., ledger_postings_total)
//! - **Gauge**: Value that can go up or down (e.g., store_conflicts)
//! - **Histogram**: Distribution of values (e.g., operation_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts,
    HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // WALLET LEDGER
    // =========================================================================

    /// Ledger postings applied, by entry kind and direction (debit/credit)
    pub static ref LEDGER_POSTINGS: CounterVec = CounterVec::new(
        Opts::new("tm_ledger_postings_total", "Ledger entries written"),
        &["kind", "direction"]
    ).expect("metric creation failed");

    /// Coins moved through the ledger, by direction
    pub static ref LEDGER_COINS: CounterVec = CounterVec::new(
        Opts::new("tm_ledger_coins_total", "Coins debited or credited"),
        &["direction"]
    ).expect("metric creation failed");

    /// Mutations answered from an existing idempotency key instead of applied
    pub static ref LEDGER_REPLAYS: CounterVec = CounterVec::new(
        Opts::new("tm_ledger_replays_total", "Idempotent ledger replays"),
        &["kind"]
    ).expect("metric creation failed");

    /// Debits refused for lack of balance
    pub static ref INSUFFICIENT_FUNDS: CounterVec = CounterVec::new(
        Opts::new("tm_ledger_insufficient_funds_total", "Debits refused for insufficient funds"),
        &["operation"]
    ).expect("metric creation failed");

    // =========================================================================
    // DOCUMENT STORE
    // =========================================================================

    /// Committed transactions (mirrors the store's own counter)
    pub static ref STORE_COMMITS: Gauge = Gauge::new(
        "tm_store_commits",
        "Transactions committed by the document store"
    ).expect("metric creation failed");

    /// Optimistic-concurrency conflicts that forced a retry
    pub static ref STORE_CONFLICTS: Gauge = Gauge::new(
        "tm_store_conflicts",
        "Transaction attempts aborted on a version conflict"
    ).expect("metric creation failed");

    /// Transactions that ran out of retry attempts
    pub static ref STORE_EXHAUSTED: Gauge = Gauge::new(
        "tm_store_retries_exhausted",
        "Transactions that gave up after the retry limit"
    ).expect("metric creation failed");

    // =========================================================================
    // TASKS AND OFFERS
    // =========================================================================

    /// Task status changes, by target status
    pub static ref TASK_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("tm_task_transitions_total", "Task status transitions"),
        &["to"]
    ).expect("metric creation failed");

    /// Offer state machine edges taken, by action and resulting status
    pub static ref OFFER_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("tm_offer_transitions_total", "Offer state transitions"),
        &["action", "to"]
    ).expect("metric creation failed");

    // =========================================================================
    // ELIGIBILITY AND DISPUTES
    // =========================================================================

    /// Eligibility recomputations, by outcome (changed/unchanged)
    pub static ref ELIGIBILITY_RECOMPUTES: CounterVec = CounterVec::new(
        Opts::new("tm_eligibility_recomputes_total", "Allowed-category recomputations"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Disputes resolved by an admin
    pub static ref DISPUTES_RESOLVED: Counter = Counter::new(
        "tm_disputes_resolved_total",
        "Disputes resolved"
    ).expect("metric creation failed");

    // =========================================================================
    // EVENTS AND COLLABORATORS
    // =========================================================================

    /// Domain events published after commit
    pub static ref EVENTS_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("tm_events_published_total", "Domain events published"),
        &["event"]
    ).expect("metric creation failed");

    /// Records a handler missed because its subscription fell behind
    pub static ref EVENTS_LAGGED: CounterVec = CounterVec::new(
        Opts::new("tm_events_lagged_total", "Bus records lost to a lagging handler"),
        &["handler"]
    ).expect("metric creation failed");

    /// Failed deliveries to external collaborators (notifications, chat, moderation)
    pub static ref COLLABORATOR_FAILURES: CounterVec = CounterVec::new(
        Opts::new("tm_collaborator_failures_total", "Dropped collaborator deliveries"),
        &["collaborator"]
    ).expect("metric creation failed");

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Operation errors, by operation and error code
    pub static ref OPERATION_ERRORS: CounterVec = CounterVec::new(
        Opts::new("tm_operation_errors_total", "Operations that returned an error"),
        &["operation", "code"]
    ).expect("metric creation failed");

    /// Operation latency
    pub static ref OPERATION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tm_operation_duration_seconds",
            "Time spent in a marketplace operation"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid buckets")),
        &["operation"]
    ).expect("metric creation failed");
}

/// Handle for the registered metrics.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Fails with `MetricsInit` when called twice.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ledger
        Box::new(LEDGER_POSTINGS.clone()),
        Box::new(LEDGER_COINS.clone()),
        Box::new(LEDGER_REPLAYS.clone()),
        Box::new(INSUFFICIENT_FUNDS.clone()),
        // Store
        Box::new(STORE_COMMITS.clone()),
        Box::new(STORE_CONFLICTS.clone()),
        Box::new(STORE_EXHAUSTED.clone()),
        // Tasks and offers
        Box::new(TASK_TRANSITIONS.clone()),
        Box::new(OFFER_TRANSITIONS.clone()),
        // Eligibility and disputes
        Box::new(ELIGIBILITY_RECOMPUTES.clone()),
        Box::new(DISPUTES_RESOLVED.clone()),
        // Events
        Box::new(EVENTS_PUBLISHED.clone()),
        Box::new(EVENTS_LAGGED.clone()),
        Box::new(COLLABORATOR_FAILURES.clone()),
        // Operations
        Box::new(OPERATION_ERRORS.clone()),
        Box::new(OPERATION_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Copy the store's running totals into the store gauges.
pub fn record_store_stats(commits: u64, conflicts: u64, exhausted: u64) {
    STORE_COMMITS.set(commits as f64);
    STORE_CONFLICTS.set(conflicts as f64);
    STORE_EXHAUSTED.set(exhausted as f64);
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }

    /// Start a timer for one operation's latency series.
    pub fn operation(name: &str) -> Self {
        Self::new(&OPERATION_DURATION.with_label_values(&[name]))
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}
