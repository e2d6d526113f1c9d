//! Credential store: the single shared cache entry, its refresh marker, and persistence hooks.
//!
//! [`CredentialStore`] owns the in-memory [`CacheEntry`] together with the "refresh in
//! flight" marker behind one [`Mutex`]. Every critical section is O(1); persistence I/O
//! and solver calls always run after the lock is released. The in-memory entry stays
//! authoritative for the running process; [`CachePersistence`] backends only let a
//! restarted process skip one expensive acquisition.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

// self
use crate::{
	_prelude::*,
	auth::{CacheEntry, CredentialSet, CredentialStatus, EntryStatus},
	policy::DEFAULT_TTL,
};

/// Boxed future returned by [`CachePersistence`] operations.
pub type PersistFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, PersistenceError>> + 'a + Send>>;

/// Durable storage contract for the credential cache record.
pub trait CachePersistence
where
	Self: Send + Sync,
{
	/// Reads the persisted record, if one exists.
	fn load(&self) -> PersistFuture<'_, Option<PersistedCache>>;

	/// Durably replaces the persisted record.
	fn save(&self, record: PersistedCache) -> PersistFuture<'_, ()>;
}

/// Error type produced by [`CachePersistence`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PersistenceError {
	/// The record could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// The storage backend failed.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// On-disk representation of the cache entry.
///
/// Unknown fields are ignored and missing fields decode as absent, so older or newer
/// writers never make a record unreadable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCache {
	/// Cookie name to value.
	#[serde(default)]
	pub cookies: BTreeMap<String, String>,
	/// Client identity (user-agent) the cookies belong to.
	#[serde(default, alias = "user_agent")]
	pub identity: String,
	/// Unix timestamp (seconds) of the acquisition; `0` or missing means absent.
	#[serde(default)]
	pub acquired_at: Option<i64>,
}
impl PersistedCache {
	/// Captures a populated credential set and its acquisition instant.
	pub fn new(credentials: &CredentialSet, acquired_at: OffsetDateTime) -> Self {
		Self {
			cookies: credentials.to_plain_cookies(),
			identity: credentials.identity().to_owned(),
			acquired_at: Some(acquired_at.unix_timestamp()),
		}
	}

	/// Acquisition instant, treating `0` and out-of-range values as absent.
	pub fn acquired_at(&self) -> Option<OffsetDateTime> {
		self.acquired_at
			.filter(|secs| *secs > 0)
			.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
	}

	/// Converts the record into a cache entry; incomplete records yield `None`.
	pub fn into_entry(self) -> Option<CacheEntry> {
		let acquired_at = self.acquired_at()?;
		let credentials = CredentialSet::new(self.cookies, self.identity).ok()?;

		Some(CacheEntry::new(credentials, acquired_at))
	}
}

#[derive(Debug, Default)]
struct StoreState {
	entry: CacheEntry,
	refreshing_since: Option<OffsetDateTime>,
}

type SharedState = Arc<Mutex<StoreState>>;

/// Outcome of trying to claim the refresh marker.
#[derive(Debug)]
pub enum BeginRefresh {
	/// Credentials are already fresh; no refresh is needed.
	Fresh,
	/// Another caller holds the marker.
	InProgress,
	/// The caller now owns the marker until the guard is completed or dropped.
	Started(RefreshGuard),
}

/// Owns the refresh marker. Dropping it without [`RefreshGuard::complete`] (panic,
/// cancellation) invalidates the entry and releases the marker.
#[derive(Debug)]
pub struct RefreshGuard {
	state: SharedState,
	completed: bool,
}
impl RefreshGuard {
	/// Instant the marker was claimed.
	pub fn started_at(&self) -> Option<OffsetDateTime> {
		self.state.lock().refreshing_since
	}

	/// Releases the marker without touching the entry.
	pub fn complete(mut self) {
		self.completed = true;
		self.state.lock().refreshing_since = None;
	}
}
impl Drop for RefreshGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}

		let mut state = self.state.lock();

		state.entry = CacheEntry::empty();
		state.refreshing_since = None;
	}
}

/// Shared, cloneable handle to the process-wide credential cache.
#[derive(Clone)]
pub struct CredentialStore {
	ttl: Duration,
	state: SharedState,
	persistence: Option<Arc<dyn CachePersistence>>,
}
impl CredentialStore {
	/// Creates an empty, memory-only store with the provided TTL.
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, state: Default::default(), persistence: None }
	}

	/// Attaches a persistence backend used by [`load`](Self::load) and [`save`](Self::save).
	pub fn with_persistence(mut self, persistence: Arc<dyn CachePersistence>) -> Self {
		self.persistence = Some(persistence);

		self
	}

	/// Configured credential lifetime.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Hydrates the entry from the persistence backend.
	///
	/// Returns `true` when a still-valid record was loaded. Read failures, malformed
	/// records, and records whose age already reached the TTL leave the store untouched.
	pub async fn load(&self) -> bool {
		let Some(persistence) = self.persistence.as_ref() else {
			return false;
		};
		let record = match persistence.load().await {
			Ok(Some(record)) => record,
			Ok(None) => {
				tracing::debug!("No persisted clearance credentials found.");

				return false;
			},
			Err(e) => {
				tracing::warn!(error = %e, "Failed to load persisted clearance credentials.");

				return false;
			},
		};
		let Some(entry) = record.into_entry() else {
			tracing::warn!("Persisted clearance credentials are incomplete; ignoring them.");

			return false;
		};
		let now = OffsetDateTime::now_utc();
		let age = entry.age_at(now).unwrap_or(Duration::MAX);

		if age.is_negative() {
			tracing::warn!(
				age_seconds = age.whole_seconds(),
				"Persisted clearance credentials are stamped in the future; ignoring them."
			);

			return false;
		}
		if age >= self.ttl {
			tracing::info!(age_seconds = age.whole_seconds(), "Persisted clearance credentials expired.");

			return false;
		}

		tracing::info!(
			age_seconds = age.whole_seconds(),
			"Loaded clearance credentials from the persistent cache."
		);

		self.state.lock().entry = entry;

		true
	}

	/// Persists the pair. Failures are logged and returned, never escalated further by
	/// the store itself.
	pub async fn save(
		&self,
		credentials: &CredentialSet,
		acquired_at: OffsetDateTime,
	) -> Result<(), PersistenceError> {
		let Some(persistence) = self.persistence.as_ref() else {
			return Ok(());
		};
		let result = persistence.save(PersistedCache::new(credentials, acquired_at)).await;

		match &result {
			Ok(()) => tracing::debug!("Clearance credentials persisted."),
			Err(e) => tracing::warn!(error = %e, "Failed to persist clearance credentials."),
		}

		result
	}

	/// Returns the last known entry without waiting on any refresh.
	pub fn current(&self) -> CacheEntry {
		self.state.lock().entry.clone()
	}

	/// Atomically swaps in a new pair, then persists it on a best-effort basis.
	pub async fn replace(&self, credentials: CredentialSet, acquired_at: OffsetDateTime) {
		let entry = CacheEntry::new(credentials, acquired_at);

		self.state.lock().entry = entry.clone();

		if !entry.is_empty() {
			let _ = self.save(entry.credentials(), acquired_at).await;
		}
	}

	/// Atomically drops the current pair.
	pub fn invalidate(&self) {
		self.state.lock().entry = CacheEntry::empty();
	}

	/// Drops the current pair only if it is still the one in `seen`.
	///
	/// Returns `false` when the entry was replaced since `seen` was read, so a late
	/// rejection of older credentials never discards newer ones.
	pub fn invalidate_if_current(&self, seen: &CacheEntry) -> bool {
		let mut state = self.state.lock();

		if state.entry.is_empty()
			|| !Arc::ptr_eq(state.entry.credentials(), seen.credentials())
			|| state.entry.acquired_at() != seen.acquired_at()
		{
			return false;
		}

		state.entry = CacheEntry::empty();

		true
	}

	/// Returns `true` while a refresh marker is held.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing_since.is_some()
	}

	/// Derived lifecycle status at `now`.
	pub fn status_at(&self, now: OffsetDateTime) -> EntryStatus {
		let state = self.state.lock();

		state.entry.status_at(now, self.ttl, state.refreshing_since.is_some())
	}

	/// Read-only status snapshot at `now`.
	pub fn snapshot_at(&self, now: OffsetDateTime) -> CredentialStatus {
		let state = self.state.lock();

		CredentialStatus::from_entry(&state.entry, now, self.ttl, state.refreshing_since.is_some())
	}

	/// Claims the refresh marker in the same critical section that re-checks freshness.
	///
	/// With `force` set the freshness check is skipped so valid credentials can be rotated.
	pub fn begin_refresh(&self, now: OffsetDateTime, force: bool) -> BeginRefresh {
		let mut state = self.state.lock();

		if !force && state.entry.is_fresh_at(now, self.ttl) {
			return BeginRefresh::Fresh;
		}
		if state.refreshing_since.is_some() {
			return BeginRefresh::InProgress;
		}

		state.refreshing_since = Some(now);

		BeginRefresh::Started(RefreshGuard { state: self.state.clone(), completed: false })
	}
}
impl Default for CredentialStore {
	fn default() -> Self {
		Self::new(DEFAULT_TTL)
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialStore")
			.field("ttl", &self.ttl)
			.field("persistent", &self.persistence.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn credentials(value: &str) -> CredentialSet {
		CredentialSet::new([("cf_clearance", value)], "UA1")
			.expect("Credential fixture should be valid.")
	}

	struct BrokenPersistence;
	impl CachePersistence for BrokenPersistence {
		fn load(&self) -> PersistFuture<'_, Option<PersistedCache>> {
			Box::pin(async { Err(PersistenceError::Backend { message: "disk on fire".into() }) })
		}

		fn save(&self, _: PersistedCache) -> PersistFuture<'_, ()> {
			Box::pin(async { Err(PersistenceError::Backend { message: "disk on fire".into() }) })
		}
	}

	#[tokio::test]
	async fn replace_and_invalidate_swap_the_whole_pair() {
		let store = CredentialStore::default();
		let now = OffsetDateTime::now_utc();

		assert!(store.current().is_empty());

		store.replace(credentials("one"), now).await;

		let entry = store.current();

		assert_eq!(entry.credentials().cookie("cf_clearance"), Some("one"));
		assert_eq!(entry.acquired_at(), Some(now));
		assert_eq!(store.status_at(now), EntryStatus::Fresh);

		store.invalidate();

		assert!(store.current().is_empty());
		assert_eq!(store.status_at(now), EntryStatus::Expired);
	}

	#[tokio::test]
	async fn persistence_failures_never_reach_the_caller() {
		let store =
			CredentialStore::default().with_persistence(Arc::new(BrokenPersistence));
		let now = OffsetDateTime::now_utc();

		assert!(!store.load().await);
		assert!(store.save(&credentials("one"), now).await.is_err());

		store.replace(credentials("two"), now).await;

		assert_eq!(store.current().credentials().cookie("cf_clearance"), Some("two"));
	}

	#[tokio::test]
	async fn conditional_invalidate_spares_newer_credentials() {
		let store = CredentialStore::default();
		let now = OffsetDateTime::now_utc();

		store.replace(credentials("one"), now).await;

		let seen = store.current();

		store.replace(credentials("two"), now).await;

		assert!(!store.invalidate_if_current(&seen));
		assert_eq!(store.current().credentials().cookie("cf_clearance"), Some("two"));

		let seen = store.current();

		assert!(store.invalidate_if_current(&seen));
		assert!(store.current().is_empty());
		assert!(!store.invalidate_if_current(&seen));
	}

	#[test]
	fn refresh_marker_is_exclusive() {
		let store = CredentialStore::default();
		let now = OffsetDateTime::now_utc();
		let BeginRefresh::Started(guard) = store.begin_refresh(now, false) else {
			panic!("Empty store should hand out the refresh marker.");
		};

		assert!(store.is_refreshing());
		assert_eq!(guard.started_at(), Some(now));
		assert!(matches!(store.begin_refresh(now, false), BeginRefresh::InProgress));
		assert_eq!(store.status_at(now), EntryStatus::Acquiring);

		guard.complete();

		assert!(!store.is_refreshing());
	}

	#[tokio::test]
	async fn fresh_entry_short_circuits_unless_forced() {
		let store = CredentialStore::default();
		let now = OffsetDateTime::now_utc();

		store.replace(credentials("one"), now).await;

		assert!(matches!(store.begin_refresh(now, false), BeginRefresh::Fresh));
		assert!(matches!(store.begin_refresh(now, true), BeginRefresh::Started(_)));
	}

	#[tokio::test]
	async fn abandoned_guard_invalidates_and_releases() {
		let store = CredentialStore::default();
		let now = OffsetDateTime::now_utc();

		store.replace(credentials("one"), now).await;

		let BeginRefresh::Started(guard) = store.begin_refresh(now, true) else {
			panic!("Forced refresh should hand out the refresh marker.");
		};

		drop(guard);

		assert!(!store.is_refreshing());
		assert!(store.current().is_empty());
	}

	#[tokio::test]
	async fn future_stamped_record_is_not_hydrated() {
		let record = PersistedCache::new(
			&credentials("skewed"),
			OffsetDateTime::now_utc() + Duration::hours(1),
		);
		let store = CredentialStore::default()
			.with_persistence(Arc::new(super::MemoryCache::with_record(record)));

		assert!(!store.load().await);
		assert!(store.current().is_empty());

		let record =
			PersistedCache::new(&credentials("ok"), OffsetDateTime::now_utc() - Duration::minutes(5));
		let store = CredentialStore::default()
			.with_persistence(Arc::new(super::MemoryCache::with_record(record)));

		assert!(store.load().await);
	}

	#[test]
	fn persisted_record_treats_zero_timestamp_as_absent() {
		let record = PersistedCache {
			cookies: BTreeMap::from([("a".to_owned(), "1".to_owned())]),
			identity: "UA1".into(),
			acquired_at: Some(0),
		};

		assert_eq!(record.acquired_at(), None);
		assert_eq!(record.into_entry(), None);
	}

	#[test]
	fn persisted_record_ignores_unknown_and_missing_fields() {
		let record: PersistedCache = serde_json::from_str(
			r#"{"cookies":{"a":"1"},"user_agent":"UA1","acquired_at":1762776000,"extra":true}"#,
		)
		.expect("Forward-compatible record should decode.");

		assert_eq!(record.identity, "UA1");
		assert_eq!(record.acquired_at, Some(1_762_776_000));

		let sparse: PersistedCache =
			serde_json::from_str("{}").expect("Empty record should decode as absent.");

		assert_eq!(sparse, PersistedCache::default());
		assert_eq!(sparse.into_entry(), None);
	}
}
