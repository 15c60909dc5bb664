// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; the binary decides which recorder collects them.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all broadcast metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "herald_deliveries_total",
        "Transport delivery attempts by classified outcome"
    );
    describe_counter!(
        "herald_retries_scheduled_total",
        "Messages pushed to the retry queue after a throttle signal"
    );
    describe_counter!(
        "herald_broadcasts_total",
        "Broadcast runs by audience and result"
    );
    describe_gauge!(
        "herald_broadcast_in_flight",
        "Messages of running broadcasts not yet in a terminal state"
    );
    describe_histogram!(
        "herald_broadcast_duration_seconds",
        "Wall time of completed broadcast runs"
    );
}

pub fn record_delivery(outcome: &'static str) {
    metrics::counter!("herald_deliveries_total", "outcome" => outcome).increment(1);
}

pub fn record_retry_scheduled() {
    metrics::counter!("herald_retries_scheduled_total").increment(1);
}

pub fn record_broadcast(audience: &str, result: &'static str) {
    metrics::counter!(
        "herald_broadcasts_total",
        "audience" => audience.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn add_in_flight(count: f64) {
    metrics::gauge!("herald_broadcast_in_flight").increment(count);
}

pub fn remove_in_flight(count: f64) {
    metrics::gauge!("herald_broadcast_in_flight").decrement(count);
}

pub fn record_duration(seconds: f64) {
    metrics::histogram!("herald_broadcast_duration_seconds").record(seconds);
}
