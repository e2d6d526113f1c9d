//! Facade wiring a [`BrokerConfig`] into a store, coordinator, reporter, and fetch service.

// self
use crate::{
	_prelude::*,
	auth::CredentialStatus,
	config::BrokerConfig,
	fetch::{FetchService, FetchedPage},
	flows::{RefreshCoordinator, WarmupOutcome},
	http::PageHttpClient,
	report::{CompositeReporter, ErrorReporter, FileReporter, TracingReporter},
	solver::ChallengeSolver,
	store::{CredentialStore, FileCache},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient>;

/// Everything a service needs to serve credentialed upstream fetches.
///
/// The store is injected into the coordinator and the coordinator into the fetch
/// service; nothing is reachable through globals.
#[derive(Clone, Debug)]
pub struct Broker<C>
where
	C: PageHttpClient,
{
	/// Single-flight refresh coordinator (owns the store).
	pub coordinator: RefreshCoordinator,
	/// Fetch service sharing the coordinator.
	pub fetcher: FetchService<C>,
}
impl<C> Broker<C>
where
	C: PageHttpClient,
{
	/// Builds a broker around a caller-provided transport.
	///
	/// A cache file or report directory that cannot be prepared is logged and skipped;
	/// the broker then runs memory-only or tracing-only.
	pub fn with_http_client(
		config: &BrokerConfig,
		solver: Arc<dyn ChallengeSolver>,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		config.validate()?;

		let mut store = CredentialStore::new(config.ttl);

		if let Some(path) = config.cache_path.as_ref() {
			match FileCache::open(path) {
				Ok(cache) => store = store.with_persistence(Arc::new(cache)),
				Err(e) => tracing::warn!(error = %e, "Credential cache file disabled."),
			}
		}

		let mut reporter = CompositeReporter::default().with(Arc::new(TracingReporter));

		if let Some(dir) = config.error_log_dir.as_ref() {
			match FileReporter::open(dir) {
				Ok(files) => reporter = reporter.with(Arc::new(files)),
				Err(e) => tracing::warn!(error = %e, "File failure reports disabled."),
			}
		}

		let reporter: Arc<dyn ErrorReporter> = Arc::new(reporter);
		let coordinator = RefreshCoordinator::new(store, solver, config.target_url.clone())
			.with_reporter(reporter)
			.with_acquisition_timeout(config.acquisition_timeout);
		let fetcher = FetchService::new(coordinator.clone(), http_client)
			.with_block_rule(config.block.clone());

		Ok(Self { coordinator, fetcher })
	}

	/// Loads persisted credentials; returns `true` when a still-valid set was restored.
	pub async fn hydrate(&self) -> bool {
		self.coordinator.store.load().await
	}

	/// See [`FetchService::fetch`].
	pub async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
		self.fetcher.fetch(url).await
	}

	/// See [`RefreshCoordinator::status`].
	pub fn status(&self) -> CredentialStatus {
		self.coordinator.status()
	}

	/// See [`RefreshCoordinator::warmup`].
	pub fn warmup(&self, force: bool) -> WarmupOutcome {
		self.coordinator.warmup(force)
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient> {
	/// Builds a broker with its own reqwest client using `config.fetch_timeout`.
	pub fn from_config(config: &BrokerConfig, solver: Arc<dyn ChallengeSolver>) -> Result<Self> {
		let http_client = ReqwestHttpClient::new(config.fetch_timeout)?;

		Self::with_http_client(config, solver, http_client)
	}
}
