//! Broker configuration: solver target, lifetimes, timeouts, cache and report locations.

// self
use crate::{_prelude::*, error::ConfigError, fetch::BlockRule, policy::DEFAULT_TTL};

/// Default URL handed to the challenge solver.
pub const DEFAULT_TARGET_URL: &str = "https://1337x.to/search/test/1/";
/// Default upstream request timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::seconds(30);
/// Default upper bound for a single challenge solve.
pub const DEFAULT_ACQUISITION_TIMEOUT: Duration = Duration::minutes(2);

/// Runtime settings for a [`Broker`](crate::broker::Broker).
///
/// Every field has a default, so JSON documents only need to name what they change.
/// Durations are expressed in whole seconds in JSON (`ttl_secs`, `fetch_timeout_secs`,
/// `acquisition_timeout_secs`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
	/// URL the solver navigates to when acquiring credentials.
	pub target_url: Url,
	/// Credential lifetime before a refresh is required.
	#[serde(rename = "ttl_secs", with = "seconds")]
	pub ttl: Duration,
	/// Timeout applied to every upstream request.
	#[serde(rename = "fetch_timeout_secs", with = "seconds")]
	pub fetch_timeout: Duration,
	/// Upper bound for one solver invocation.
	#[serde(rename = "acquisition_timeout_secs", with = "seconds")]
	pub acquisition_timeout: Duration,
	/// Persistent cache file; `None` keeps credentials in memory only.
	pub cache_path: Option<PathBuf>,
	/// Directory for per-failure report files; `None` reports through tracing only.
	pub error_log_dir: Option<PathBuf>,
	/// Rules deciding when an upstream response is a block.
	pub block: BlockRule,
}
impl BrokerConfig {
	/// Creates the default configuration aimed at `target_url`.
	pub fn new(target_url: Url) -> Self {
		Self { target_url, ..Default::default() }
	}

	/// Parses a JSON document and validates the result.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let config: Self =
			serde_path_to_error::deserialize(de).map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Overrides the credential lifetime.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Overrides the upstream request timeout.
	pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
		self.fetch_timeout = timeout;

		self
	}

	/// Overrides the solver deadline.
	pub fn with_acquisition_timeout(mut self, timeout: Duration) -> Self {
		self.acquisition_timeout = timeout;

		self
	}

	/// Enables the persistent cache file.
	pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.cache_path = Some(path.into());

		self
	}

	/// Enables per-failure report files.
	pub fn with_error_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.error_log_dir = Some(dir.into());

		self
	}

	/// Overrides the block classification rules.
	pub fn with_block_rule(mut self, block: BlockRule) -> Self {
		self.block = block;

		self
	}

	/// Rejects zero or negative durations.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (field, value) in [
			("ttl", self.ttl),
			("fetch_timeout", self.fetch_timeout),
			("acquisition_timeout", self.acquisition_timeout),
		] {
			if !value.is_positive() {
				return Err(ConfigError::NonPositiveDuration { field });
			}
		}

		Ok(())
	}
}
impl Default for BrokerConfig {
	fn default() -> Self {
		Self {
			target_url: default_target_url(),
			ttl: DEFAULT_TTL,
			fetch_timeout: DEFAULT_FETCH_TIMEOUT,
			acquisition_timeout: DEFAULT_ACQUISITION_TIMEOUT,
			cache_path: None,
			error_log_dir: None,
			block: BlockRule::default(),
		}
	}
}

fn default_target_url() -> Url {
	Url::parse(DEFAULT_TARGET_URL).expect("Default target URL is a valid literal.")
}

mod seconds {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::seconds)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_the_documented_values() {
		let config = BrokerConfig::default();

		assert_eq!(config.target_url.as_str(), DEFAULT_TARGET_URL);
		assert_eq!(config.ttl, Duration::minutes(30));
		assert_eq!(config.fetch_timeout, Duration::seconds(30));
		assert_eq!(config.acquisition_timeout, Duration::minutes(2));
		assert_eq!(config.cache_path, None);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn json_overrides_only_named_fields() {
		let config = BrokerConfig::from_json_str(
			r#"{"target_url":"https://example.com/probe","ttl_secs":600,"cache_path":"/tmp/cookies.json","block":{"statuses":[403,503]}}"#,
		)
		.expect("Partial configuration should parse.");

		assert_eq!(config.target_url.as_str(), "https://example.com/probe");
		assert_eq!(config.ttl, Duration::seconds(600));
		assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
		assert_eq!(config.cache_path, Some(PathBuf::from("/tmp/cookies.json")));
		assert_eq!(config.block.statuses, vec![403, 503]);
		assert_eq!(config.block.markers, BlockRule::default().markers);
	}

	#[test]
	fn invalid_documents_are_rejected() {
		let parse = BrokerConfig::from_json_str(r#"{"ttl_secs":"soon"}"#)
			.expect_err("Non-numeric TTL should fail to parse.");

		assert!(matches!(parse, ConfigError::Parse { .. }));

		let zero = BrokerConfig::from_json_str(r#"{"acquisition_timeout_secs":0}"#)
			.expect_err("Zero timeout should fail validation.");

		assert!(matches!(zero, ConfigError::NonPositiveDuration { field: "acquisition_timeout" }));
	}
}
