//! Credentialed upstream fetches with block detection and a single forced-refresh retry.
//!
//! A fetch is a small state machine whose only loop edge is `Blocked -> Retry`, so the
//! number of upstream requests per call is at most two:
//!
//! ```text
//! FirstAttempt --content--> done
//!      |
//!   blocked
//!      v
//!   Blocked --invalidate (if unchanged) + ensure_fresh--> Retry --content--> done
//!      |                                     |
//!  not ready -> UpstreamBlocked           blocked -> UpstreamBlocked
//! ```
//!
//! The blocked step only discards the pair the rejected request carried. When another
//! fetch already replaced it, the retry reuses the newer pair without another solve.

pub mod block;

pub use block::*;

// self
use crate::{
	_prelude::*,
	auth::CacheEntry,
	error::TransportError,
	flows::RefreshCoordinator,
	http::{PageHttpClient, PageResponse},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	report::FailureReport,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Fetch service specialized for the crate's default reqwest transport.
pub type ReqwestFetchService = FetchService<ReqwestHttpClient>;

/// Body and metadata of a successful (non-blocked) fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedPage {
	/// URL that was requested.
	pub url: Url,
	/// HTTP status; interpreting it is the caller's concern.
	pub status: u16,
	/// Response body.
	pub body: String,
	/// Upstream requests issued (`1` or `2`).
	pub attempts: u8,
}

enum FetchStep {
	FirstAttempt,
	Blocked { status: u16, rejected: CacheEntry },
	Retry,
}

/// Issues upstream requests with the shared credentials and recovers from stale ones.
pub struct FetchService<C>
where
	C: PageHttpClient,
{
	/// Coordinator owning the shared credential store.
	pub coordinator: RefreshCoordinator,
	/// Transport used for upstream requests.
	pub http_client: Arc<C>,
	/// Rules separating content from block pages.
	pub block_rule: BlockRule,
}
impl<C> FetchService<C>
where
	C: PageHttpClient,
{
	/// Creates a fetch service using the default block rules.
	pub fn new(coordinator: RefreshCoordinator, http_client: impl Into<Arc<C>>) -> Self {
		Self { coordinator, http_client: http_client.into(), block_rule: BlockRule::default() }
	}

	/// Overrides the block classification rules.
	pub fn with_block_rule(mut self, block_rule: BlockRule) -> Self {
		self.block_rule = block_rule;

		self
	}

	/// Fetches `url`, forcing one credential refresh and one retry if the upstream blocks.
	///
	/// # Errors
	///
	/// - [`Error::CredentialsUnavailable`] when no credentials can be produced up front.
	/// - [`Error::UpstreamBlocked`] when the forced refresh fails or the retry is blocked too.
	/// - [`Error::Transport`] when a request fails before a response arrives.
	pub async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
		const KIND: FlowKind = FlowKind::Fetch;

		let span = FlowSpan::new(KIND, "fetch");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.run(url)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(e) => {
				self.coordinator.reporter.report(
					&FailureReport::new(KIND.as_str(), format!("Fetch of {url} failed.")).with_error(e),
				);
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Parses `url` and fetches it.
	pub async fn fetch_str(&self, url: &str) -> Result<FetchedPage> {
		let parsed = Url::parse(url).map_err(|source| crate::error::ConfigError::InvalidUrl {
			value: url.to_owned(),
			source,
		})?;

		self.fetch(&parsed).await
	}

	async fn run(&self, url: &Url) -> Result<FetchedPage> {
		let mut step = FetchStep::FirstAttempt;

		loop {
			step = match step {
				FetchStep::FirstAttempt => {
					if !self.coordinator.ensure_fresh().await {
						return Err(Error::CredentialsUnavailable);
					}

					let (page, used) = self.attempt(url).await?;

					match self.block_rule.classify(page.status, &page.body) {
						BlockVerdict::Content => return Ok(Self::finish(url, page, 1)),
						BlockVerdict::Blocked(reason) => {
							obs::record_upstream_block(1);
							tracing::warn!(%url, %reason, "Upstream blocked the request; forcing a credential refresh.");

							FetchStep::Blocked { status: page.status, rejected: used }
						},
					}
				},
				FetchStep::Blocked { status, rejected } => {
					if !self.coordinator.store.invalidate_if_current(&rejected) {
						tracing::debug!(%url, "Rejected credentials were already replaced; reusing the newer set.");
					}

					if !self.coordinator.ensure_fresh().await {
						return Err(Error::UpstreamBlocked { url: url.clone(), status });
					}

					FetchStep::Retry
				},
				FetchStep::Retry => {
					let (page, _) = self.attempt(url).await?;

					return match self.block_rule.classify(page.status, &page.body) {
						BlockVerdict::Content => Ok(Self::finish(url, page, 2)),
						BlockVerdict::Blocked(reason) => {
							obs::record_upstream_block(2);
							tracing::warn!(%url, %reason, "Upstream blocked the retry with fresh credentials.");

							Err(Error::UpstreamBlocked { url: url.clone(), status: page.status })
						},
					};
				},
			};
		}
	}

	/// Sends one request with the current pair and hands back the entry it used.
	async fn attempt(&self, url: &Url) -> Result<(PageResponse, CacheEntry)> {
		let entry = self.coordinator.store.current();

		// Invalidated by a concurrent fetch between readiness and send.
		if entry.is_empty() {
			return Err(Error::CredentialsUnavailable);
		}

		tracing::debug!(%url, "Fetching upstream page.");

		let page = self
			.http_client
			.get(url, entry.credentials())
			.await
			.map_err(TransportError::network)?;

		Ok((page, entry))
	}

	fn finish(url: &Url, page: PageResponse, attempts: u8) -> FetchedPage {
		FetchedPage { url: url.clone(), status: page.status, body: page.body, attempts }
	}
}
impl<C> Clone for FetchService<C>
where
	C: PageHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			coordinator: self.coordinator.clone(),
			http_client: self.http_client.clone(),
			block_rule: self.block_rule.clone(),
		}
	}
}
impl<C> Debug for FetchService<C>
where
	C: PageHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FetchService")
			.field("coordinator", &self.coordinator)
			.field("block_rule", &self.block_rule)
			.finish()
	}
}
