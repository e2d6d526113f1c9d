//! Classification of upstream responses into real content versus challenge/denial pages.

// self
use crate::_prelude::*;

/// Status codes and body markers that identify a blocked response.
///
/// Markers are matched case-insensitively anywhere in the body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockRule {
	/// HTTP statuses that always mean access was denied.
	pub statuses: Vec<u16>,
	/// Body fragments that identify a challenge page.
	pub markers: Vec<String>,
}
impl BlockRule {
	/// Creates a rule from explicit statuses and markers.
	pub fn new<S, M>(statuses: S, markers: M) -> Self
	where
		S: IntoIterator<Item = u16>,
		M: IntoIterator,
		M::Item: Into<String>,
	{
		Self {
			statuses: statuses.into_iter().collect(),
			markers: markers.into_iter().map(Into::into).collect(),
		}
	}

	/// Classifies a response.
	pub fn classify(&self, status: u16, body: &str) -> BlockVerdict {
		if self.statuses.contains(&status) {
			return BlockVerdict::Blocked(BlockReason::Status(status));
		}
		if self.markers.is_empty() {
			return BlockVerdict::Content;
		}

		let haystack = body.to_lowercase();

		self.markers
			.iter()
			.find(|marker| !marker.is_empty() && haystack.contains(&marker.to_lowercase()))
			.map_or(BlockVerdict::Content, |marker| {
				BlockVerdict::Blocked(BlockReason::Marker(marker.clone()))
			})
	}
}
impl Default for BlockRule {
	fn default() -> Self {
		Self::new([403], ["challenge"])
	}
}

/// Result of [`BlockRule::classify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockVerdict {
	/// The body is real content (whatever its status).
	Content,
	/// The upstream denied access or served a challenge.
	Blocked(BlockReason),
}
impl BlockVerdict {
	/// Returns `true` for [`BlockVerdict::Blocked`].
	pub fn is_blocked(&self) -> bool {
		matches!(self, Self::Blocked(_))
	}
}

/// Why a response was classified as blocked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockReason {
	/// The status code is a configured denial status.
	Status(u16),
	/// The body contains a configured marker.
	Marker(String),
}
impl Display for BlockReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Status(status) => write!(f, "status {status}"),
			Self::Marker(marker) => write!(f, "body marker `{marker}`"),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn denial_status_blocks_regardless_of_body() {
		let rule = BlockRule::default();

		assert_eq!(
			rule.classify(403, "<html>results</html>"),
			BlockVerdict::Blocked(BlockReason::Status(403))
		);
	}

	#[test]
	fn markers_match_case_insensitively() {
		let rule = BlockRule::default();
		let verdict = rule.classify(200, "<title>Just a moment...</title><div id=\"Challenge-Form\">");

		assert_eq!(verdict, BlockVerdict::Blocked(BlockReason::Marker("challenge".into())));
		assert!(verdict.is_blocked());
	}

	#[test]
	fn other_statuses_with_clean_bodies_are_content() {
		let rule = BlockRule::default();

		assert_eq!(rule.classify(200, "<table class=\"table-list\"></table>"), BlockVerdict::Content);
		assert_eq!(rule.classify(404, "not found"), BlockVerdict::Content);
		assert_eq!(rule.classify(503, "maintenance"), BlockVerdict::Content);
	}

	#[test]
	fn custom_rules_replace_defaults() {
		let rule = BlockRule::new([429, 503], ["cf-browser-verification", ""]);

		assert!(rule.classify(503, "").is_blocked());
		assert!(!rule.classify(403, "forbidden").is_blocked());
		assert!(rule.classify(200, "<div class=\"CF-BROWSER-VERIFICATION\">").is_blocked());
		assert_eq!(BlockReason::Status(429).to_string(), "status 429");
	}
}
