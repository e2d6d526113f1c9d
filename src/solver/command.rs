//! [`ChallengeSolver`] that delegates to an external helper process.
//!
//! The helper receives the target URL as its last argument and must print a JSON object
//! such as `{"cookies": {"cf_clearance": "..."}, "user_agent": "..."}` as the last
//! non-empty line of its stdout. Earlier lines are treated as helper logging.

// std
use std::{ffi::OsString, process::Stdio};
// crates.io
use tokio::process::Command;
// self
use crate::{
	_prelude::*,
	solver::{ChallengeSolver, SolveFuture, SolvedChallenge, SolverError},
};

const STDERR_PREVIEW: usize = 512;

/// Failures of the helper process itself.
#[derive(Debug, ThisError)]
pub enum CommandError {
	/// The helper could not be started.
	#[error("Failed to spawn solver helper `{program}`.")]
	Spawn {
		/// Program that was executed.
		program: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The helper exited unsuccessfully.
	#[error("Solver helper exited with {status}: {stderr}")]
	Exit {
		/// Exit status rendered for display.
		status: String,
		/// Truncated stderr output.
		stderr: String,
	},
}

/// Runs an external program to solve the challenge.
#[derive(Clone, Debug)]
pub struct CommandSolver {
	program: PathBuf,
	args: Vec<OsString>,
}
impl CommandSolver {
	/// Creates a solver for `program` with no extra arguments.
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self { program: program.into(), args: Vec::new() }
	}

	/// Appends an argument placed before the target URL.
	pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
		self.args.push(arg.into());

		self
	}

	/// Appends several arguments placed before the target URL.
	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<OsString>,
	{
		self.args.extend(args.into_iter().map(Into::into));

		self
	}

	async fn run(&self, target: &Url) -> Result<SolvedChallenge, SolverError> {
		let output = Command::new(&self.program)
			.args(&self.args)
			.arg(target.as_str())
			.stdin(Stdio::null())
			.kill_on_drop(true)
			.output()
			.await
			.map_err(|source| {
				SolverError::failed(CommandError::Spawn {
					program: self.program.display().to_string(),
					source,
				})
			})?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr);

			return Err(SolverError::failed(CommandError::Exit {
				status: output.status.to_string(),
				stderr: stderr.trim().chars().take(STDERR_PREVIEW).collect(),
			}));
		}

		let stdout = String::from_utf8_lossy(&output.stdout);

		parse_output(&stdout)
	}
}
impl ChallengeSolver for CommandSolver {
	fn solve_challenge<'a>(&'a self, target: &'a Url) -> SolveFuture<'a> {
		Box::pin(async move {
			tracing::info!(program = %self.program.display(), %target, "Running challenge solver helper.");

			self.run(target).await
		})
	}
}

fn parse_output(stdout: &str) -> Result<SolvedChallenge, SolverError> {
	let line = stdout.lines().map(str::trim).rfind(|line| !line.is_empty()).ok_or_else(|| {
		SolverError::Malformed { reason: "solver helper printed nothing".into() }
	})?;
	let de = &mut serde_json::Deserializer::from_str(line);

	serde_path_to_error::deserialize(de).map_err(|e| SolverError::Malformed {
		reason: format!("solver helper output is not valid JSON at `{}`: {}", e.path(), e.inner()),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn last_json_line_wins() {
		let stdout = "opening browser...\npassed challenge\n{\"cookies\":{\"a\":\"1\"},\"identity\":\"UA1\"}\n\n";
		let solved = parse_output(stdout).expect("Trailing JSON line should parse.");

		assert_eq!(solved, SolvedChallenge::new([("a", "1")], "UA1"));
	}

	#[test]
	fn empty_or_non_json_output_is_malformed() {
		assert!(matches!(parse_output(" \n"), Err(SolverError::Malformed { .. })));
		assert!(matches!(parse_output("done"), Err(SolverError::Malformed { .. })));
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn helper_receives_target_and_reports_credentials() {
		let solver = CommandSolver::new("sh").args([
			"-c",
			r#"echo "solving $1" >&2; printf '{"cookies":{"seen":"%s"},"user_agent":"UA-cmd"}\n' "$1""#,
			"solver",
		]);
		let target = Url::parse("https://example.com/search/test/1/").expect("Fixture URL should parse.");
		let credentials = solver
			.solve_challenge(&target)
			.await
			.expect("Helper should succeed.")
			.into_credentials()
			.expect("Helper output should validate.");

		assert_eq!(credentials.cookie("seen"), Some("https://example.com/search/test/1/"));
		assert_eq!(credentials.identity(), "UA-cmd");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn failing_helper_surfaces_stderr() {
		let solver = CommandSolver::new("sh").args(["-c", "echo 'captcha loop' >&2; exit 3", "solver"]);
		let target = Url::parse("https://example.com/").expect("Fixture URL should parse.");
		let err = solver.solve_challenge(&target).await.expect_err("Helper should fail.");
		let source = StdError::source(&err).expect("Failed variant should expose its source.");

		assert!(source.to_string().contains("captcha loop"));
	}
}
