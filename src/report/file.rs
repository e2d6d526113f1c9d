//! [`ErrorReporter`] that writes one log file per failure second into a directory.

// std
use std::{
	fs::{self, OpenOptions},
	io::Write,
};
// crates.io
use time::{format_description::well_known::Rfc3339, macros::format_description};
// self
use crate::{
	_prelude::*,
	report::{ErrorReporter, FailureReport},
	store::PersistenceError,
};

/// Writes `error_<YYYY-MM-DD_HH-MM-SS>.log` files; reports within the same second append.
#[derive(Clone, Debug)]
pub struct FileReporter {
	dir: PathBuf,
}
impl FileReporter {
	/// Opens (and creates) the report directory.
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
		let dir = dir.into();

		fs::create_dir_all(&dir).map_err(|e| PersistenceError::Backend {
			message: format!("Failed to create error log directory {}: {e}", dir.display()),
		})?;

		Ok(Self { dir })
	}

	/// Directory receiving report files.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Path of the file that receives a report stamped `at`.
	pub fn file_for(&self, at: OffsetDateTime) -> PathBuf {
		let stamp = at
			.format(format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]"))
			.unwrap_or_else(|_| at.unix_timestamp().to_string());

		self.dir.join(format!("error_{stamp}.log"))
	}

	fn render(report: &FailureReport) -> String {
		let stamp = report
			.occurred_at
			.format(&Rfc3339)
			.unwrap_or_else(|_| report.occurred_at.unix_timestamp().to_string());
		let mut text = format!(
			"Timestamp: {stamp}\nOperation: {}\nMessage: {}\n",
			report.operation, report.message
		);

		for (depth, cause) in report.causes.iter().enumerate() {
			text.push_str(&format!("Cause[{depth}]: {cause}\n"));
		}

		text.push('\n');

		text
	}

	fn write(&self, report: &FailureReport) -> std::io::Result<PathBuf> {
		let path = self.file_for(report.occurred_at);
		let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

		file.write_all(Self::render(report).as_bytes())?;

		Ok(path)
	}
}
impl ErrorReporter for FileReporter {
	fn report(&self, report: &FailureReport) {
		match self.write(report) {
			Ok(path) => tracing::debug!(path = %path.display(), "Failure report written."),
			Err(e) => tracing::warn!(error = %e, "Failed to write failure report."),
		}
	}
}
