//! JSON file [`CachePersistence`] backend so restarted processes can reuse live credentials.

// std
use std::{
	fs::{self, File},
	io::Write,
};
// self
use crate::{
	_prelude::*,
	store::{CachePersistence, PersistFuture, PersistedCache, PersistenceError},
};

/// Persists the cache record to a JSON file, replacing it atomically on every save.
#[derive(Clone, Debug)]
pub struct FileCache {
	path: PathBuf,
}
impl FileCache {
	/// Opens a cache file at the provided path, creating its parent directory.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path })
	}

	/// Location of the cache file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_record(path: &Path) -> Result<Option<PersistedCache>, PersistenceError> {
		if !path.exists() {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| PersistenceError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(None);
		}

		let de = &mut serde_json::Deserializer::from_slice(&bytes);
		let record = serde_path_to_error::deserialize(de).map_err(|e| {
			PersistenceError::Serialization {
				message: format!("Failed to parse {} at `{}`: {}", path.display(), e.path(), e.inner()),
			}
		})?;

		Ok(Some(record))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), PersistenceError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| PersistenceError::Backend {
				message: format!("Failed to create cache directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn write_record(&self, record: &PersistedCache) -> Result<(), PersistenceError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(record).map_err(|e| PersistenceError::Serialization {
				message: format!("Failed to serialize cache record: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| PersistenceError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| PersistenceError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| PersistenceError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| PersistenceError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CachePersistence for FileCache {
	fn load(&self) -> PersistFuture<'_, Option<PersistedCache>> {
		Box::pin(async move { Self::read_record(&self.path) })
	}

	fn save(&self, record: PersistedCache) -> PersistFuture<'_, ()> {
		Box::pin(async move { self.write_record(&record) })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path(tag: &str) -> PathBuf {
		let unique = format!(
			"clearance_broker_file_cache_{tag}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn record() -> PersistedCache {
		PersistedCache {
			cookies: BTreeMap::from([("cf_clearance".to_owned(), "abc".to_owned())]),
			identity: "UA1".into(),
			acquired_at: Some(1_762_776_000),
		}
	}

	#[tokio::test]
	async fn save_and_reload_round_trip() {
		let path = temp_path("round_trip");
		let cache = FileCache::open(&path).expect("Failed to open file cache.");

		cache.save(record()).await.expect("Failed to save cache record.");

		let reopened = FileCache::open(&path).expect("Failed to reopen file cache.");
		let loaded = reopened
			.load()
			.await
			.expect("Failed to load cache record.")
			.expect("File cache lost its record after reopen.");

		assert_eq!(loaded, record());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary cache file {}: {e}", path.display())
		});
	}

	#[tokio::test]
	async fn missing_or_blank_file_loads_as_absent() {
		let path = temp_path("missing");
		let cache = FileCache::open(&path).expect("Failed to open file cache.");

		assert_eq!(cache.load().await.expect("Missing file should not be an error."), None);

		fs::write(&path, b"  \n").expect("Failed to write blank cache file.");

		assert_eq!(cache.load().await.expect("Blank file should not be an error."), None);

		fs::remove_file(&path).expect("Failed to remove blank cache file.");
	}

	#[tokio::test]
	async fn garbage_reports_serialization_error() {
		let path = temp_path("garbage");

		fs::write(&path, br#"{"cookies": ["not", "a", "map"]}"#)
			.expect("Failed to write garbage cache file.");

		let cache = FileCache::open(&path).expect("Failed to open file cache.");
		let err = cache.load().await.expect_err("Garbage should not decode.");

		assert!(matches!(err, PersistenceError::Serialization { .. }));
		assert!(err.to_string().contains("cookies"));

		fs::remove_file(&path).expect("Failed to remove garbage cache file.");
	}
}
