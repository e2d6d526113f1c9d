//! In-process [`CachePersistence`] backend for tests and ephemeral deployments.

// self
use crate::{
	_prelude::*,
	store::{CachePersistence, PersistFuture, PersistedCache},
};

/// Keeps the last saved record in memory; clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(Arc<Mutex<Option<PersistedCache>>>);
impl MemoryCache {
	/// Creates a backend pre-seeded with `record`.
	pub fn with_record(record: PersistedCache) -> Self {
		Self(Arc::new(Mutex::new(Some(record))))
	}

	/// Returns a copy of the stored record.
	pub fn snapshot(&self) -> Option<PersistedCache> {
		self.0.lock().clone()
	}
}
impl CachePersistence for MemoryCache {
	fn load(&self) -> PersistFuture<'_, Option<PersistedCache>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.lock().clone()) })
	}

	fn save(&self, record: PersistedCache) -> PersistFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.lock() = Some(record);

			Ok(())
		})
	}
}
