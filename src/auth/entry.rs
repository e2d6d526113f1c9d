//! Cache entries pairing a credential set with its acquisition instant, plus derived status.

// self
use crate::{_prelude::*, auth::CredentialSet, policy};

/// Lifecycle status derived from a [`CacheEntry`] and the refresh marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
	/// Credentials exist and are younger than the TTL.
	Fresh,
	/// Credentials are absent or older than the TTL.
	Expired,
	/// A refresh is in flight; the last known credentials remain readable.
	Acquiring,
}

/// Credential set plus the instant it was acquired.
///
/// `acquired_at` is `None` exactly when the set is empty, so "no credentials yet" and
/// "credentials present" never overlap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheEntry {
	credentials: Arc<CredentialSet>,
	acquired_at: Option<OffsetDateTime>,
}
impl CacheEntry {
	/// Builds a populated entry. Empty sets collapse to [`CacheEntry::empty`].
	pub fn new(credentials: CredentialSet, acquired_at: OffsetDateTime) -> Self {
		if credentials.is_empty() {
			return Self::empty();
		}

		Self { credentials: Arc::new(credentials), acquired_at: Some(acquired_at) }
	}

	/// Returns the empty entry used at startup and after invalidation.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Returns `true` when no credentials are held.
	pub fn is_empty(&self) -> bool {
		self.acquired_at.is_none()
	}

	/// Shared handle to the credential set.
	pub fn credentials(&self) -> &Arc<CredentialSet> {
		&self.credentials
	}

	/// Acquisition instant, if credentials are present.
	pub fn acquired_at(&self) -> Option<OffsetDateTime> {
		self.acquired_at
	}

	/// Age of the credentials at `now`.
	pub fn age_at(&self, now: OffsetDateTime) -> Option<Duration> {
		self.acquired_at.map(|at| now - at)
	}

	/// Returns `true` when the entry may be used at `now` under `ttl`.
	pub fn is_fresh_at(&self, now: OffsetDateTime, ttl: Duration) -> bool {
		!policy::is_expired(self.acquired_at, now, ttl)
	}

	/// Computes the derived status; an in-flight refresh takes precedence.
	pub fn status_at(&self, now: OffsetDateTime, ttl: Duration, refreshing: bool) -> EntryStatus {
		if refreshing {
			EntryStatus::Acquiring
		} else if self.is_fresh_at(now, ttl) {
			EntryStatus::Fresh
		} else {
			EntryStatus::Expired
		}
	}
}

/// Read-only snapshot exposed to health checks and status endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
	/// Credentials are present and within the TTL.
	pub valid: bool,
	/// Seconds since acquisition; `None` when nothing is cached.
	pub age_seconds: Option<i64>,
	/// Seconds until the TTL elapses, clamped at zero.
	pub ttl_remaining_seconds: i64,
	/// A refresh is currently in flight.
	pub is_refreshing: bool,
}
impl CredentialStatus {
	/// Derives the status snapshot for `entry` at `now`.
	pub fn from_entry(
		entry: &CacheEntry,
		now: OffsetDateTime,
		ttl: Duration,
		is_refreshing: bool,
	) -> Self {
		Self {
			valid: entry.is_fresh_at(now, ttl),
			age_seconds: entry.age_at(now).map(|age| age.whole_seconds()),
			ttl_remaining_seconds: policy::ttl_remaining(entry.acquired_at, now, ttl)
				.whole_seconds(),
			is_refreshing,
		}
	}
}
