//! Acquire anti-bot clearance credentials once, share them across concurrent fetchers,
//! persist them across restarts, and re-acquire them when the upstream starts blocking.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod broker;
pub mod config;
pub mod error;
pub mod fetch;
pub mod flows;
pub mod http;
pub mod obs;
pub mod policy;
pub mod report;
pub mod solver;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	#[cfg(feature = "reqwest")] use crate::{broker::ReqwestBroker, config::BrokerConfig};
	use crate::{
		report::{ErrorReporter, FailureReport},
		solver::{ChallengeSolver, SolveFuture, SolvedChallenge, SolverError},
	};

	/// Scripted [`ChallengeSolver`] that counts invocations.
	///
	/// Each call pops the next scripted result; once the script is exhausted the last
	/// result is repeated.
	#[derive(Debug)]
	pub struct MockSolver {
		script: Mutex<VecDeque<Result<SolvedChallenge, String>>>,
		last: Mutex<Option<Result<SolvedChallenge, String>>>,
		delay: std::time::Duration,
		calls: AtomicUsize,
	}
	impl MockSolver {
		/// Solver that always succeeds with the given cookies and identity.
		pub fn succeeding<I, K, V>(cookies: I, identity: &str) -> Self
		where
			I: IntoIterator<Item = (K, V)>,
			K: Into<String>,
			V: Into<String>,
		{
			Self::scripted([Ok(SolvedChallenge::new(cookies, identity))])
		}

		/// Solver that always fails with `reason`.
		pub fn failing(reason: &str) -> Self {
			Self::scripted([Err(reason.to_owned())])
		}

		/// Solver that replays `script` in order.
		pub fn scripted(script: impl IntoIterator<Item = Result<SolvedChallenge, String>>) -> Self {
			Self {
				script: Mutex::new(script.into_iter().collect()),
				last: Mutex::new(None),
				delay: std::time::Duration::ZERO,
				calls: AtomicUsize::new(0),
			}
		}

		/// Makes every call sleep before answering.
		pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
			self.delay = delay;

			self
		}

		/// Number of `solve_challenge` invocations so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		fn next_result(&self) -> Result<SolvedChallenge, String> {
			let mut last = self.last.lock();

			if let Some(next) = self.script.lock().pop_front() {
				*last = Some(next);
			}

			last.clone().unwrap_or_else(|| Err("MockSolver has no scripted results.".into()))
		}
	}
	impl ChallengeSolver for MockSolver {
		fn solve_challenge<'a>(&'a self, _target: &'a Url) -> SolveFuture<'a> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let result = self.next_result();
			let delay = self.delay;

			Box::pin(async move {
				if !delay.is_zero() {
					tokio::time::sleep(delay).await;
				}

				result.map_err(SolverError::message)
			})
		}
	}

	/// [`ErrorReporter`] that keeps every report in memory.
	#[derive(Debug, Default)]
	pub struct RecordingReporter(Mutex<Vec<FailureReport>>);
	impl RecordingReporter {
		/// Copies of every report received so far.
		pub fn reports(&self) -> Vec<FailureReport> {
			self.0.lock().clone()
		}
	}
	impl ErrorReporter for RecordingReporter {
		fn report(&self, report: &FailureReport) {
			self.0.lock().push(report.clone());
		}
	}

	#[cfg(feature = "reqwest")]
	/// Builds a reqwest-backed broker for `config`, wiring in `solver` and a recording
	/// reporter.
	pub fn build_test_broker(
		config: &BrokerConfig,
		solver: Arc<MockSolver>,
	) -> (ReqwestBroker, Arc<RecordingReporter>) {
		let solver: Arc<dyn ChallengeSolver> = solver;
		let mut broker = ReqwestBroker::from_config(config, solver)
			.expect("Failed to build reqwest broker for tests.");
		let reporter = Arc::new(RecordingReporter::default());
		let sink: Arc<dyn ErrorReporter> = reporter.clone();

		broker.coordinator.reporter = sink.clone();
		broker.fetcher.coordinator.reporter = sink;

		(broker, reporter)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
