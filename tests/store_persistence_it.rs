// std
use std::{collections::BTreeMap, env, fs, path::PathBuf, process, sync::Arc};
// crates.io
use time::{Duration, OffsetDateTime};
// self
use clearance_broker::{
	auth::{CredentialSet, EntryStatus},
	store::{CachePersistence, CredentialStore, FileCache, MemoryCache, PersistedCache},
};

const TTL: Duration = Duration::seconds(1800);

fn temp_path(tag: &str) -> PathBuf {
	let unique = format!(
		"clearance_broker_it_{tag}_{}_{}",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	);

	env::temp_dir().join(unique).join("cache.json")
}

fn credentials() -> CredentialSet {
	CredentialSet::new([("cf_clearance", "abc"), ("session", "s1")], "UA1")
		.expect("Fixture credentials should be valid.")
}

fn store_with(persistence: Arc<dyn CachePersistence>) -> CredentialStore {
	CredentialStore::new(TTL).with_persistence(persistence)
}

#[tokio::test]
async fn file_cache_survives_a_restart() {
	let path = temp_path("restart");
	let cache = Arc::new(FileCache::open(&path).expect("Cache file should open."));
	let acquired_at = OffsetDateTime::now_utc() - Duration::seconds(600);

	store_with(cache).replace(credentials(), acquired_at).await;

	let restarted = store_with(Arc::new(FileCache::open(&path).expect("Cache file should reopen.")));

	assert!(restarted.load().await);

	let entry = restarted.current();

	assert_eq!(entry.credentials().as_ref(), &credentials());
	assert_eq!(
		entry.acquired_at().map(OffsetDateTime::unix_timestamp),
		Some(acquired_at.unix_timestamp())
	);
	assert_eq!(restarted.status_at(OffsetDateTime::now_utc()), EntryStatus::Fresh);

	if let Some(dir) = path.parent() {
		fs::remove_dir_all(dir).expect("Temporary cache directory should be removable.");
	}
}

#[tokio::test]
async fn record_at_or_past_the_ttl_is_not_hydrated() {
	let now = OffsetDateTime::now_utc();

	for age in [1800, 1900] {
		let cache = MemoryCache::with_record(PersistedCache::new(
			&credentials(),
			now - Duration::seconds(age),
		));
		let store = store_with(Arc::new(cache));

		assert!(!store.load().await, "A {age}s old record must not be loaded.");
		assert!(store.current().is_empty());
	}
}

#[tokio::test]
async fn incomplete_records_are_ignored() {
	let now = OffsetDateTime::now_utc().unix_timestamp();
	let records = [
		PersistedCache { cookies: BTreeMap::new(), identity: "UA1".into(), acquired_at: Some(now) },
		PersistedCache {
			cookies: BTreeMap::from([("a".to_owned(), "1".to_owned())]),
			identity: String::new(),
			acquired_at: Some(now),
		},
		PersistedCache {
			cookies: BTreeMap::from([("a".to_owned(), "1".to_owned())]),
			identity: "UA1".into(),
			acquired_at: Some(0),
		},
	];

	for record in records {
		let store = store_with(Arc::new(MemoryCache::with_record(record)));

		assert!(!store.load().await);
		assert!(store.current().is_empty());
	}
}

#[tokio::test]
async fn unknown_fields_and_the_user_agent_alias_are_accepted() {
	let path = temp_path("compat");
	let cache = FileCache::open(&path).expect("Cache file should open.");
	let acquired_at = OffsetDateTime::now_utc().unix_timestamp() - 60;

	fs::write(
		&path,
		format!(
			r#"{{"cookies":{{"cf_clearance":"abc"}},"user_agent":"UA9","acquired_at":{acquired_at},"extra":true}}"#
		),
	)
	.expect("Fixture cache file should be writable.");

	let store = store_with(Arc::new(cache));

	assert!(store.load().await);
	assert_eq!(store.current().credentials().identity(), "UA9");

	if let Some(dir) = path.parent() {
		fs::remove_dir_all(dir).expect("Temporary cache directory should be removable.");
	}
}

#[tokio::test]
async fn invalidate_keeps_the_persisted_record() {
	let cache = MemoryCache::default();
	let store = store_with(Arc::new(cache.clone()));

	store.replace(credentials(), OffsetDateTime::now_utc()).await;
	store.invalidate();

	assert!(store.current().is_empty());
	assert!(cache.snapshot().is_some());
}
