//! Manual warmup trigger that starts a background refresh without blocking the caller.

// self
use crate::{
	_prelude::*,
	flows::RefreshCoordinator,
	obs::{self, FlowKind, FlowOutcome},
	store::BeginRefresh,
};

/// What a warmup request did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupState {
	/// A refresh was already running; nothing new was started.
	InProgress,
	/// Credentials are valid and no refresh was forced.
	Ready,
	/// A background refresh was started.
	WarmingUp,
	/// No tokio runtime is running on the calling thread, so nothing was started.
	NoRuntime,
}

/// Response of [`RefreshCoordinator::warmup`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WarmupOutcome {
	/// Action taken.
	pub status: WarmupState,
	/// Whether the credentials were valid when the request was handled.
	pub credentials_valid: bool,
	/// Human-readable explanation.
	pub message: String,
}

impl RefreshCoordinator {
	/// Starts at most one background refresh.
	///
	/// A no-op when a refresh is already in flight, or when the credentials are valid and
	/// `force` is not set. Otherwise the refresh marker is claimed synchronously and the
	/// solve runs on the current tokio runtime, so concurrent warmups never start two solves.
	/// Outside a runtime the store is left untouched and [`WarmupState::NoRuntime`] is returned.
	pub fn warmup(&self, force: bool) -> WarmupOutcome {
		const KIND: FlowKind = FlowKind::Warmup;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let now = OffsetDateTime::now_utc();
		let status = self.store.snapshot_at(now);
		let Ok(runtime) = tokio::runtime::Handle::try_current() else {
			tracing::warn!("Warmup requested outside a tokio runtime; no refresh started.");
			obs::record_flow_outcome(KIND, FlowOutcome::Failure);

			return WarmupOutcome {
				status: WarmupState::NoRuntime,
				credentials_valid: status.valid,
				message: "No async runtime available to run a credential refresh.".into(),
			};
		};
		let outcome = match self.store.begin_refresh(now, force) {
			BeginRefresh::InProgress => WarmupOutcome {
				status: WarmupState::InProgress,
				credentials_valid: status.valid,
				message: "Credential refresh already in progress.".into(),
			},
			BeginRefresh::Fresh => WarmupOutcome {
				status: WarmupState::Ready,
				credentials_valid: true,
				message: format!(
					"Credentials already valid (TTL remaining: {}s).",
					status.ttl_remaining_seconds
				),
			},
			BeginRefresh::Started(guard) => {
				let coordinator = self.clone();

				tracing::info!(force, "Starting background clearance refresh.");
				runtime.spawn(async move {
					let _ = coordinator.run_refresh(guard, "warmup").await;
				});

				WarmupOutcome {
					status: WarmupState::WarmingUp,
					credentials_valid: false,
					message: "Credential refresh started in background.".into(),
				}
			},
		};

		obs::record_flow_outcome(KIND, FlowOutcome::Success);

		outcome
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, auth::CredentialSet, store::CredentialStore};

	fn coordinator(solver: Arc<MockSolver>) -> RefreshCoordinator {
		let target = Url::parse("https://example.com/").expect("Fixture URL should parse.");

		RefreshCoordinator::new(CredentialStore::default(), solver, target)
			.with_reporter(Arc::new(RecordingReporter::default()))
	}

	async fn wait_until_idle(coordinator: &RefreshCoordinator) {
		for _ in 0..200 {
			if !coordinator.store.is_refreshing() {
				return;
			}

			tokio::time::sleep(std::time::Duration::from_millis(10)).await;
		}

		panic!("Background refresh did not finish in time.");
	}

	#[tokio::test]
	async fn valid_credentials_make_warmup_a_no_op() {
		let solver = Arc::new(MockSolver::succeeding([("a", "1")], "UA1"));
		let coordinator = coordinator(solver.clone());
		let live = CredentialSet::new([("a", "0")], "UA0").expect("Live fixture should be valid.");

		coordinator.store.replace(live, OffsetDateTime::now_utc()).await;

		let outcome = coordinator.warmup(false);

		assert_eq!(outcome.status, WarmupState::Ready);
		assert!(outcome.credentials_valid);
		assert!(outcome.message.contains("TTL remaining"));
		assert_eq!(solver.calls(), 0);
	}

	#[tokio::test]
	async fn warmup_starts_exactly_one_background_refresh() {
		let solver = Arc::new(
			MockSolver::succeeding([("a", "1")], "UA1")
				.with_delay(std::time::Duration::from_millis(100)),
		);
		let coordinator = coordinator(solver.clone());
		let first = coordinator.warmup(false);
		let second = coordinator.warmup(true);

		assert_eq!(first.status, WarmupState::WarmingUp);
		assert!(!first.credentials_valid);
		assert_eq!(second.status, WarmupState::InProgress);
		assert!(coordinator.status().is_refreshing);

		wait_until_idle(&coordinator).await;

		assert_eq!(solver.calls(), 1);
		assert!(coordinator.status().valid);
		assert_eq!(coordinator.warmup(false).status, WarmupState::Ready);
	}

	#[tokio::test]
	async fn forced_warmup_rotates_valid_credentials() {
		let solver = Arc::new(MockSolver::succeeding([("a", "rotated")], "UA1"));
		let coordinator = coordinator(solver.clone());
		let live = CredentialSet::new([("a", "old")], "UA1").expect("Live fixture should be valid.");

		coordinator.store.replace(live, OffsetDateTime::now_utc()).await;

		assert_eq!(coordinator.warmup(true).status, WarmupState::WarmingUp);

		wait_until_idle(&coordinator).await;

		assert_eq!(solver.calls(), 1);
		assert_eq!(coordinator.store.current().credentials().cookie("a"), Some("rotated"));
	}

	#[test]
	fn warmup_without_a_runtime_keeps_valid_credentials() {
		let solver = Arc::new(MockSolver::succeeding([("a", "new")], "UA1"));
		let coordinator = coordinator(solver.clone());
		let live = CredentialSet::new([("a", "old")], "UA1").expect("Live fixture should be valid.");

		tokio::runtime::Builder::new_current_thread()
			.build()
			.expect("Test runtime should build.")
			.block_on(coordinator.store.replace(live, OffsetDateTime::now_utc()));

		let outcome = coordinator.warmup(true);

		assert_eq!(outcome.status, WarmupState::NoRuntime);
		assert!(outcome.credentials_valid);
		assert!(!coordinator.store.is_refreshing());
		assert!(coordinator.status().valid);
		assert_eq!(coordinator.store.current().credentials().cookie("a"), Some("old"));
		assert_eq!(solver.calls(), 0);
	}

	#[test]
	fn outcome_serializes_with_snake_case_status() {
		let outcome = WarmupOutcome {
			status: WarmupState::WarmingUp,
			credentials_valid: false,
			message: "Credential refresh started in background.".into(),
		};
		let json = serde_json::to_string(&outcome).expect("Warmup outcome should serialize.");

		assert!(json.contains("\"status\":\"warming_up\""));
	}
}
