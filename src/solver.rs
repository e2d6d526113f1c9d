//! Boundary to the external challenge solver (typically browser automation).
//!
//! The broker never solves anti-bot challenges itself. It hands the target URL to a
//! [`ChallengeSolver`], which returns the raw cookies and the user-agent string of the
//! client that passed the challenge. Anything that is not a complete credential set is
//! treated as a failed acquisition.

pub mod command;

pub use command::CommandSolver;

// self
use crate::{
	_prelude::*,
	auth::{CredentialSet, CredentialSetError},
	error::BoxError,
};

/// Boxed future returned by [`ChallengeSolver::solve_challenge`].
pub type SolveFuture<'a> =
	Pin<Box<dyn Future<Output = Result<SolvedChallenge, SolverError>> + 'a + Send>>;

/// Contract for collaborators that pass the upstream challenge and report the resulting
/// clearance artifacts.
pub trait ChallengeSolver
where
	Self: Send + Sync,
{
	/// Solves the challenge guarding `target` and returns the raw artifacts.
	fn solve_challenge<'a>(&'a self, target: &'a Url) -> SolveFuture<'a>;
}

/// Raw solver output before validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvedChallenge {
	/// Cookie name to value, as observed by the solving client.
	#[serde(default)]
	pub cookies: BTreeMap<String, String>,
	/// User-agent string of the solving client.
	#[serde(default, alias = "user_agent")]
	pub identity: String,
}
impl SolvedChallenge {
	/// Creates a raw result from cookie pairs and an identity string.
	pub fn new<I, K, V>(cookies: I, identity: impl Into<String>) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			cookies: cookies.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
			identity: identity.into(),
		}
	}

	/// Validates the raw result into a [`CredentialSet`].
	pub fn into_credentials(self) -> Result<CredentialSet, SolverError> {
		CredentialSet::new(self.cookies, self.identity).map_err(SolverError::from)
	}
}

/// Opaque failure reported by (or on behalf of) a [`ChallengeSolver`].
#[derive(Debug, ThisError)]
pub enum SolverError {
	/// The solver did not finish within the acquisition deadline.
	#[error("Challenge solver did not finish within {after}.")]
	Timeout {
		/// Deadline that elapsed.
		after: Duration,
	},
	/// The solver reported a failure (navigation error, crash, challenge not passed).
	#[error("Challenge solver failed.")]
	Failed {
		/// Solver-specific failure.
		#[source]
		source: BoxError,
	},
	/// The solver returned something that is not a usable credential set.
	#[error("Challenge solver returned a malformed result: {reason}")]
	Malformed {
		/// Description of what was missing or invalid.
		reason: String,
	},
}
impl SolverError {
	/// Wraps a solver-specific failure.
	pub fn failed(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Failed { source: Box::new(src) }
	}

	/// Builds a failure from a plain message.
	pub fn message(message: impl Into<String>) -> Self {
		let message: String = message.into();

		Self::Failed { source: message.into() }
	}
}
impl From<CredentialSetError> for SolverError {
	fn from(e: CredentialSetError) -> Self {
		Self::Malformed { reason: e.to_string() }
	}
}
