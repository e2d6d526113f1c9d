//! Observability helpers for broker flows.
//!
//! - Every coordinator and fetch operation runs inside a `tracing` span named
//!   `clearance_broker.flow` with the `flow` (operation) and `stage` (call site) fields.
//! - Enable `metrics` to publish `clearance_broker_flow_total{flow, outcome}`, the
//!   `clearance_broker_acquisition_seconds` histogram and
//!   `clearance_broker_upstream_blocked_total{attempt}`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Broker operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Credential acquisition through the challenge solver.
	Refresh,
	/// Credentialed upstream fetch.
	Fetch,
	/// Manual warmup trigger.
	Warmup,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Refresh => "refresh",
			FlowKind::Fetch => "fetch",
			FlowKind::Warmup => "warmup",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure reported back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
