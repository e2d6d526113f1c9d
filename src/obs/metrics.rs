//! Counters and histograms published through the `metrics` facade.
//!
//! Without the `metrics` feature every function here compiles to a no-op.

// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counts one flow transition as `clearance_broker_flow_total{flow, outcome}`.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"clearance_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Observes how long one solver invocation took, labeled by whether it produced
/// credentials (`clearance_broker_acquisition_seconds{outcome}`).
pub fn record_acquisition_time(elapsed: std::time::Duration, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("clearance_broker_acquisition_seconds", "outcome" => outcome.as_str())
			.record(elapsed.as_secs_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (elapsed, outcome);
	}
}

/// Counts upstream responses classified as blocked, labeled by the attempt that saw them
/// (`clearance_broker_upstream_blocked_total{attempt}`).
pub fn record_upstream_block(attempt: u8) {
	#[cfg(feature = "metrics")]
	{
		let attempt = if attempt > 1 { "retry" } else { "first" };

		metrics::counter!("clearance_broker_upstream_blocked_total", "attempt" => attempt)
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = attempt;
	}
}
