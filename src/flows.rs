//! Credential lifecycle orchestration: single-flight refresh, warmup, and status queries.

pub mod refresh;
pub mod warmup;

pub use refresh::*;
pub use warmup::*;

// self
use crate::{
	_prelude::*,
	auth::CredentialStatus,
	config::DEFAULT_ACQUISITION_TIMEOUT,
	report::{ErrorReporter, TracingReporter},
	solver::ChallengeSolver,
	store::CredentialStore,
};

/// Guarantees at most one in-flight challenge solve across every concurrent caller.
///
/// The coordinator shares one [`CredentialStore`] with the fetch service. Callers that
/// find the store expired race for the store's refresh marker; the winner invokes the
/// [`ChallengeSolver`] outside any lock while the losers return immediately instead of
/// queueing behind a solve that may take minutes. Cloning is cheap and every clone
/// shares the same store, solver, and counters.
#[derive(Clone)]
pub struct RefreshCoordinator {
	/// Shared credential cache.
	pub store: CredentialStore,
	/// Collaborator that passes the upstream challenge.
	pub solver: Arc<dyn ChallengeSolver>,
	/// Sink for acquisition failures.
	pub reporter: Arc<dyn ErrorReporter>,
	/// URL handed to the solver.
	pub target_url: Url,
	/// Upper bound for one solver invocation.
	pub acquisition_timeout: Duration,
	/// Shared counters for acquisition outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates a coordinator that reports through `tracing` and uses the default deadline.
	pub fn new(store: CredentialStore, solver: Arc<dyn ChallengeSolver>, target_url: Url) -> Self {
		Self {
			store,
			solver,
			reporter: Arc::new(TracingReporter),
			target_url,
			acquisition_timeout: DEFAULT_ACQUISITION_TIMEOUT,
			refresh_metrics: Default::default(),
		}
	}

	/// Replaces the failure reporter.
	pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
		self.reporter = reporter;

		self
	}

	/// Overrides the solver deadline.
	pub fn with_acquisition_timeout(mut self, timeout: Duration) -> Self {
		self.acquisition_timeout = timeout;

		self
	}

	/// Read-only status snapshot for health checks.
	pub fn status(&self) -> CredentialStatus {
		self.store.snapshot_at(OffsetDateTime::now_utc())
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("store", &self.store)
			.field("target_url", &self.target_url.as_str())
			.field("acquisition_timeout", &self.acquisition_timeout)
			.finish()
	}
}
