//! # Capability Metrics
//!
//! Prometheus metrics for monitoring request lifecycle and round output.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! ocr3-capability = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `ocr3_requests_accepted_total` - Requests added to the store
//! - `ocr3_requests_expired_total` - Requests answered with a timeout
//! - `ocr3_responses_delivered_total` - Consensus values delivered to callers
//! - `ocr3_reports_generated_total` - Reports emitted by `reports`
//! - `ocr3_observations_skipped_total` - Executions skipped in `outcome` (by reason)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref REQUESTS_ACCEPTED: IntCounter = register_int_counter!(
        "ocr3_requests_accepted_total",
        "Total number of consensus requests accepted"
    )
    .expect("Failed to create REQUESTS_ACCEPTED metric");

    pub static ref REQUESTS_EXPIRED: IntCounter = register_int_counter!(
        "ocr3_requests_expired_total",
        "Total number of requests answered with a timeout"
    )
    .expect("Failed to create REQUESTS_EXPIRED metric");

    pub static ref RESPONSES_DELIVERED: IntCounter = register_int_counter!(
        "ocr3_responses_delivered_total",
        "Total number of consensus responses delivered to callers"
    )
    .expect("Failed to create RESPONSES_DELIVERED metric");

    pub static ref REPORTS_GENERATED: IntCounter = register_int_counter!(
        "ocr3_reports_generated_total",
        "Total number of reports generated"
    )
    .expect("Failed to create REPORTS_GENERATED metric");

    pub static ref OBSERVATIONS_SKIPPED: IntCounterVec = register_int_counter_vec!(
        "ocr3_observations_skipped_total",
        "Executions skipped while computing an outcome",
        &["reason"]
    )
    .expect("Failed to create OBSERVATIONS_SKIPPED metric");
}

#[cfg(feature = "metrics")]
pub fn record_request_accepted() {
    REQUESTS_ACCEPTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_request_expired() {
    REQUESTS_EXPIRED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_response_delivered() {
    RESPONSES_DELIVERED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_reports_generated(count: usize) {
    REPORTS_GENERATED.inc_by(count as u64);
}

#[cfg(feature = "metrics")]
pub fn record_observation_skipped(reason: &str) {
    OBSERVATIONS_SKIPPED.with_label_values(&[reason]).inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_request_accepted() {}

#[cfg(not(feature = "metrics"))]
pub fn record_request_expired() {}

#[cfg(not(feature = "metrics"))]
pub fn record_response_delivered() {}

#[cfg(not(feature = "metrics"))]
pub fn record_reports_generated(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_observation_skipped(_reason: &str) {}
