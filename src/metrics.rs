//! Prometheus metrics for sweep execution and service health.

use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};
use std::sync::LazyLock;

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Task Counters
// ============================================================================

/// Total number of tasks created
pub static TASKS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new("tasks_created_total", "Total number of tasks created")
        .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

/// Total number of task items generated by sweep expansion
pub static TASK_ITEMS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "task_items_created_total",
        "Total number of task items generated by sweep expansion",
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

/// Item status transitions
pub static ITEM_STATUS_TRANSITIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "item_status_transitions_total",
            "Number of task item status transitions",
        ),
        &["from_status", "to_status"],
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

/// Tasks reaching a terminal status, by outcome
pub static TASKS_COMPLETED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("tasks_completed_total", "Total number of tasks completed"),
        &["outcome"],
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

/// Items timed out
pub static ITEMS_TIMED_OUT_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "items_timed_out_total",
        "Total number of task items that timed out",
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

// ============================================================================
// Executor Metrics
// ============================================================================

/// Executor submissions by outcome
pub static EXECUTOR_SUBMISSIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "executor_submissions_total",
            "Number of task items submitted to the executor",
        ),
        &["outcome"],
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

/// Executor submit latency
pub static EXECUTOR_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "executor_submit_duration_seconds",
            "Executor submit request duration in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["outcome"],
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric can be registered");
    histogram
});

// ============================================================================
// Auth Metrics
// ============================================================================

/// Sign-in attempts by method and outcome
pub static LOGINS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("logins_total", "Number of sign-in attempts"),
        &["method", "outcome"],
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

/// OAuth token exchange retries
pub static OAUTH_RETRIES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "oauth_token_exchange_retries_total",
        "Number of retried OAuth token exchanges",
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

// ============================================================================
// Worker Loop Metrics
// ============================================================================

/// Dispatch loop iterations
pub static DISPATCH_LOOP_ITERATIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "dispatch_loop_iterations_total",
        "Total number of dispatch loop iterations",
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

/// Dispatch loop iteration duration
pub static DISPATCH_LOOP_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            "dispatch_loop_duration_seconds",
            "Dispatch loop iteration duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0]),
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric can be registered");
    histogram
});

/// Items dispatched per loop iteration
pub static ITEMS_DISPATCHED_PER_LOOP: LazyLock<Histogram> = LazyLock::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            "items_dispatched_per_loop",
            "Number of items dispatched per loop iteration",
        )
        .buckets(vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0]),
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric can be registered");
    histogram
});

/// Connection pool exhaustion events
pub static POOL_EXHAUSTED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "pool_exhausted_total",
        "Number of requests that failed to acquire a database connection",
    )
    .expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

pub fn record_task_created(item_count: usize) {
    TASKS_CREATED_TOTAL.inc();
    TASK_ITEMS_CREATED_TOTAL.inc_by(item_count as u64);
}

pub fn record_item_transition(from: &str, to: &str) {
    ITEM_STATUS_TRANSITIONS.with_label_values(&[from, to]).inc();
}

pub fn record_task_completed(outcome: &str) {
    TASKS_COMPLETED_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_item_timeouts(count: usize) {
    ITEMS_TIMED_OUT_TOTAL.inc_by(count as u64);
}

pub fn record_executor_submission(outcome: &str, duration_secs: f64) {
    EXECUTOR_SUBMISSIONS.with_label_values(&[outcome]).inc();
    EXECUTOR_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

pub fn record_login(method: &str, outcome: &str) {
    LOGINS_TOTAL.with_label_values(&[method, outcome]).inc();
}

pub fn record_oauth_retry() {
    OAUTH_RETRIES_TOTAL.inc();
}

pub fn record_dispatch_iteration(duration_secs: f64, items_dispatched: usize) {
    DISPATCH_LOOP_ITERATIONS.inc();
    DISPATCH_LOOP_DURATION_SECONDS.observe(duration_secs);
    ITEMS_DISPATCHED_PER_LOOP.observe(items_dispatched as f64);
}

pub fn record_pool_exhausted() {
    POOL_EXHAUSTED_TOTAL.inc();
}

/// Force registration of every metric so `/metrics` lists them from startup.
pub fn init_metrics() {
    LazyLock::force(&TASKS_CREATED_TOTAL);
    LazyLock::force(&TASK_ITEMS_CREATED_TOTAL);
    LazyLock::force(&ITEM_STATUS_TRANSITIONS);
    LazyLock::force(&TASKS_COMPLETED_TOTAL);
    LazyLock::force(&ITEMS_TIMED_OUT_TOTAL);
    LazyLock::force(&EXECUTOR_SUBMISSIONS);
    LazyLock::force(&EXECUTOR_DURATION_SECONDS);
    LazyLock::force(&LOGINS_TOTAL);
    LazyLock::force(&OAUTH_RETRIES_TOTAL);
    LazyLock::force(&DISPATCH_LOOP_ITERATIONS);
    LazyLock::force(&DISPATCH_LOOP_DURATION_SECONDS);
    LazyLock::force(&ITEMS_DISPATCHED_PER_LOOP);
    LazyLock::force(&POOL_EXHAUSTED_TOTAL);
}
