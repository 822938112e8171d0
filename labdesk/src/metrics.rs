//! Business metrics for labdesk.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `labdesk_requests_total{outcome}` - Request lifecycle outcomes (created,
//!   `rejected_empty`, `rejected_unavailable`, approved, rejected, completed,
//!   assigned, expired, deleted)
//! - `labdesk_availability_checks_total{result}` - Availability checker results
//!   (available, equipment, material, reactive, error)
//! - `labdesk_messages_total` - Conversation messages appended
//! - `labdesk_registrations_total{outcome}` - Registration attempts (registered,
//!   `token_unavailable`, `token_not_applicable`, `not_found`, invalid, error)

use crate::types::StockKind;
use metrics::describe_counter;

/// Register every metric description.
///
/// Call once at start-up, before anything is recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "labdesk_requests_total",
        "Total number of lab request lifecycle outcomes by kind"
    );
    describe_counter!(
        "labdesk_availability_checks_total",
        "Total number of availability checks by result"
    );
    describe_counter!(
        "labdesk_messages_total",
        "Total number of conversation messages appended"
    );
    describe_counter!(
        "labdesk_registrations_total",
        "Total number of registration attempts by outcome"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a request lifecycle outcome.
pub fn record_request(outcome: &'static str) {
    metrics::counter!("labdesk_requests_total", "outcome" => outcome).increment(1);
    tracing::debug!(outcome, "Recorded request metric");
}

/// Record the result of one availability check.
///
/// `None` means every group passed.
pub fn record_availability_check(unavailable: Option<StockKind>) {
    let result = match unavailable {
        None => "available",
        Some(StockKind::Equipment) => "equipment",
        Some(StockKind::Material) => "material",
        Some(StockKind::Reactive) => "reactive",
    };
    metrics::counter!("labdesk_availability_checks_total", "result" => result).increment(1);
}

/// Record an availability check aborted by a registry failure.
pub fn record_availability_error() {
    metrics::counter!("labdesk_availability_checks_total", "result" => "error").increment(1);
}

/// Record an appended conversation message.
pub fn record_message() {
    metrics::counter!("labdesk_messages_total").increment(1);
}

/// Record a registration attempt outcome.
pub fn record_registration(outcome: &'static str) {
    metrics::counter!("labdesk_registrations_total", "outcome" => outcome).increment(1);
    tracing::debug!(outcome, "Recorded registration metric");
}
