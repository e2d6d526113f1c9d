//! Failure reporting sinks for offline diagnosis of acquisition and fetch failures.
//!
//! Reporters are side effects only: they never influence control flow and must not
//! panic or block for long.

pub mod file;

pub use file::FileReporter;

// self
use crate::_prelude::*;

/// Single failure record: when, during which operation, and the full cause chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureReport {
	/// Instant the failure was observed.
	pub occurred_at: OffsetDateTime,
	/// Operation label (`refresh`, `fetch`, `warmup`).
	pub operation: String,
	/// Human-readable summary.
	pub message: String,
	/// Error display strings from outermost to innermost.
	pub causes: Vec<String>,
}
impl FailureReport {
	/// Creates a report stamped with the current instant.
	pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			occurred_at: OffsetDateTime::now_utc(),
			operation: operation.into(),
			message: message.into(),
			causes: Vec::new(),
		}
	}

	/// Records `err` and every error in its source chain.
	pub fn with_error(mut self, err: &(dyn StdError + 'static)) -> Self {
		let mut current = Some(err);

		while let Some(e) = current {
			self.causes.push(e.to_string());

			current = e.source();
		}

		self
	}
}

/// Sink for [`FailureReport`]s.
pub trait ErrorReporter
where
	Self: Send + Sync,
{
	/// Records a failure.
	fn report(&self, report: &FailureReport);
}

/// Emits reports as `tracing` error events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;
impl ErrorReporter for TracingReporter {
	fn report(&self, report: &FailureReport) {
		tracing::error!(
			operation = %report.operation,
			causes = ?report.causes,
			"{}",
			report.message
		);
	}
}

/// Fans each report out to several sinks.
#[derive(Clone, Default)]
pub struct CompositeReporter(Vec<Arc<dyn ErrorReporter>>);
impl CompositeReporter {
	/// Creates a reporter over the provided sinks.
	pub fn new(sinks: impl IntoIterator<Item = Arc<dyn ErrorReporter>>) -> Self {
		Self(sinks.into_iter().collect())
	}

	/// Adds another sink.
	pub fn with(mut self, sink: Arc<dyn ErrorReporter>) -> Self {
		self.0.push(sink);

		self
	}
}
impl ErrorReporter for CompositeReporter {
	fn report(&self, report: &FailureReport) {
		for sink in &self.0 {
			sink.report(report);
		}
	}
}
impl Debug for CompositeReporter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CompositeReporter").field(&self.0.len()).finish()
	}
}
