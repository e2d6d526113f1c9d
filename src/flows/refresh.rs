//! Single-flight credential refresh.
//!
//! [`RefreshCoordinator::ensure_fresh`] answers "are usable credentials available right
//! now?". A fresh store answers immediately. Otherwise the caller tries to claim the
//! store's refresh marker; the claim and the freshness re-check happen in one critical
//! section, so a caller that lost the race to a refresh that already finished still sees
//! the new credentials. Only the marker holder invokes the solver, bounded by
//! `acquisition_timeout`, and the marker is released on every exit path by its guard.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	flows::RefreshCoordinator,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	report::FailureReport,
	solver::{SolvedChallenge, SolverError},
	store::{BeginRefresh, RefreshGuard},
};

impl RefreshCoordinator {
	/// Returns `true` when usable credentials are available, refreshing them if needed.
	///
	/// Returns `false` without waiting when another caller's refresh is in flight, and
	/// `false` after a failed acquisition (which also empties the store so the next call
	/// tries again).
	pub async fn ensure_fresh(&self) -> bool {
		let now = OffsetDateTime::now_utc();

		if self.store.current().is_fresh_at(now, self.store.ttl()) {
			return true;
		}

		match self.store.begin_refresh(now, false) {
			BeginRefresh::Fresh => true,
			BeginRefresh::InProgress => {
				self.refresh_metrics.record_contended();
				tracing::debug!("Clearance refresh already in flight; not waiting for it.");

				false
			},
			BeginRefresh::Started(guard) => self.run_refresh(guard, "ensure_fresh").await.is_ok(),
		}
	}

	/// Forces a refresh and waits for its outcome.
	///
	/// Fails with [`Error::CredentialsUnavailable`] when another refresh is already in
	/// flight and with [`Error::AcquisitionFailed`] when the solver fails.
	pub async fn refresh_now(&self) -> Result<()> {
		match self.store.begin_refresh(OffsetDateTime::now_utc(), true) {
			BeginRefresh::Started(guard) => self
				.run_refresh(guard, "refresh_now")
				.await
				.map_err(|e| Error::AcquisitionFailed { reason: e.to_string() }),
			BeginRefresh::Fresh | BeginRefresh::InProgress => {
				self.refresh_metrics.record_contended();

				Err(Error::CredentialsUnavailable)
			},
		}
	}

	/// Invokes the solver while holding the refresh marker.
	pub(crate) async fn run_refresh(
		&self,
		guard: RefreshGuard,
		stage: &'static str,
	) -> Result<(), SolverError> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, stage);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let started = std::time::Instant::now();
		let result = span
			.instrument(async {
				tracing::info!(target_url = %self.target_url, "Acquiring clearance credentials.");

				let credentials = self.acquire().await?;

				tracing::info!(cookies = credentials.len(), "Clearance credentials acquired.");
				self.store.replace(credentials, OffsetDateTime::now_utc()).await;

				Ok(())
			})
			.await;

		match &result {
			Ok(()) => {
				obs::record_acquisition_time(started.elapsed(), FlowOutcome::Success);
				self.refresh_metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(e) => {
				obs::record_acquisition_time(started.elapsed(), FlowOutcome::Failure);
				self.store.invalidate();
				self.reporter.report(
					&FailureReport::new(KIND.as_str(), "Failed to acquire clearance credentials.")
						.with_error(e),
				);
				self.refresh_metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		guard.complete();

		result
	}

	async fn acquire(&self) -> Result<crate::auth::CredentialSet, SolverError> {
		let deadline = self.acquisition_timeout;
		let solved = tokio::time::timeout(
			deadline.unsigned_abs(),
			self.solver.solve_challenge(&self.target_url),
		)
		.await
		.map_err(|_| SolverError::Timeout { after: deadline })??;

		SolvedChallenge::into_credentials(solved)
	}
}
