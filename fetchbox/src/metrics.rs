//! Metrics declaration and recording.
//!
//! With the `metrics` feature disabled every function here is an empty
//! inline no-op.

use std::time::Duration;

use crate::coordinator::Decision;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fetchbox_cache_hit_total",
            "Total number of responses served from the cache store."
        );
        "fetchbox_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fetchbox_cache_miss_total",
            "Total number of eligible requests that led a new network call."
        );
        "fetchbox_cache_miss_total"
    };
    /// Track number of callers that joined a call already in flight.
    pub static ref INFLIGHT_JOINED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fetchbox_inflight_joined_total",
            "Total number of requests that joined an in-flight call."
        );
        "fetchbox_inflight_joined_total"
    };
    /// Track number of requests not eligible for caching.
    pub static ref CACHE_BYPASS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fetchbox_cache_bypass_total",
            "Total number of requests that bypassed the cache."
        );
        "fetchbox_cache_bypass_total"
    };
    /// Metric of network call timings.
    pub static ref UPSTREAM_DURATION_HISTOGRAM: &'static str = {
        metrics::describe_histogram!(
            "fetchbox_upstream_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of network calls in seconds."
        );
        "fetchbox_upstream_duration_seconds"
    };
}

/// Count a coordinator decision, labelled with the store name.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_decision(decision: Decision, backend: &str) {
    let counter = match decision {
        Decision::Bypass => *CACHE_BYPASS_COUNTER,
        Decision::Hit => *CACHE_HIT_COUNTER,
        Decision::Join => *INFLIGHT_JOINED_COUNTER,
        Decision::Lead => *CACHE_MISS_COUNTER,
    };
    metrics::counter!(
        counter,
        "backend" => backend.to_string(),
        "decision" => decision.as_str()
    )
    .increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_decision(_decision: Decision, _backend: &str) {}

/// Record how long one network call took, labelled with its status.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_upstream(duration: Duration, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::histogram!(*UPSTREAM_DURATION_HISTOGRAM, "status" => status)
        .record(duration.as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_upstream(_duration: Duration, _ok: bool) {}
