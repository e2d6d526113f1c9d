//! Transport primitives for upstream page requests.
//!
//! [`PageHttpClient`] is the fetch service's only dependency on an HTTP stack. Each call
//! carries the credential set explicitly: cookies go into the `Cookie` header and the
//! identity string becomes the `User-Agent`, so the transport never holds credential
//! state of its own.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{COOKIE, USER_AGENT};
// self
use crate::{_prelude::*, auth::CredentialSet};

/// Boxed future returned by [`PageHttpClient::get`].
pub type PageFuture<'a, E> = Pin<Box<dyn Future<Output = Result<PageResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP transports able to issue credentialed GET requests.
///
/// Implementations must enforce their own request timeout and return every response
/// that arrived, whatever its status; classification happens in the fetch service.
pub trait PageHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Issues `GET url` presenting `credentials`.
	fn get<'a>(
		&'a self,
		url: &'a Url,
		credentials: &'a CredentialSet,
	) -> PageFuture<'a, Self::TransportError>;
}

/// Status and decoded body of an upstream response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body decoded as text.
	pub body: String,
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client whose requests time out after `timeout`.
	pub fn new(timeout: Duration) -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout.unsigned_abs()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`]; its own timeout settings apply.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl PageHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn get<'a>(
		&'a self,
		url: &'a Url,
		credentials: &'a CredentialSet,
	) -> PageFuture<'a, Self::TransportError> {
		Box::pin(async move {
			let mut request = self.0.get(url.clone());

			if !credentials.identity().is_empty() {
				request = request.header(USER_AGENT, credentials.identity());
			}
			if let Some(cookies) = credentials.cookie_header() {
				request = request.header(COOKIE, cookies);
			}

			let response = request.send().await?;
			let status = response.status().as_u16();
			let body = response.text().await?;

			Ok(PageResponse { status, body })
		})
	}
}
