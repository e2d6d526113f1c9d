//! Immutable clearance credential sets (cookies + client identity).

// self
use crate::{
	_prelude::*,
	auth::{CookieValue, CookieValueError},
};

/// Errors produced while validating a [`CredentialSet`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialSetError {
	/// The client identity (user-agent) string was empty.
	#[error("Client identity must not be empty.")]
	MissingIdentity,
	/// No cookies were supplied.
	#[error("At least one clearance cookie is required.")]
	MissingCookies,
	/// A cookie name cannot be rendered into a `Cookie` header.
	#[error("Cookie name `{name}` is not a valid header token.")]
	InvalidCookieName {
		/// Offending cookie name.
		name: String,
	},
	/// A cookie value cannot be rendered into a `Cookie` header.
	#[error("Cookie `{name}` has an unusable value: {reason}")]
	InvalidCookieValue {
		/// Cookie whose value was rejected.
		name: String,
		/// Why the value was rejected.
		reason: CookieValueError,
	},
}

/// Cookies plus the client identity string they were issued to.
///
/// A set is either empty (no credentials yet) or fully populated; successful
/// acquisitions replace it wholesale and nothing mutates it in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialSet {
	cookies: BTreeMap<String, CookieValue>,
	identity: String,
}
impl CredentialSet {
	/// Validates and builds a populated credential set.
	pub fn new<I, K, V>(cookies: I, identity: impl Into<String>) -> Result<Self, CredentialSetError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let identity = identity.into();

		if identity.trim().is_empty() {
			return Err(CredentialSetError::MissingIdentity);
		}

		let mut map = BTreeMap::new();

		for (name, value) in cookies {
			let name = name.into();

			if !is_cookie_name(&name) {
				return Err(CredentialSetError::InvalidCookieName { name });
			}

			let value = match CookieValue::parse(value) {
				Ok(value) => value,
				Err(reason) => return Err(CredentialSetError::InvalidCookieValue { name, reason }),
			};

			map.insert(name, value);
		}

		if map.is_empty() {
			return Err(CredentialSetError::MissingCookies);
		}

		Ok(Self { cookies: map, identity })
	}

	/// Returns the empty set used before the first acquisition.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Returns `true` when no credentials are present.
	pub fn is_empty(&self) -> bool {
		self.cookies.is_empty()
	}

	/// Returns the client identity (user-agent) the cookies were issued to.
	pub fn identity(&self) -> &str {
		&self.identity
	}

	/// Looks up a single cookie value.
	pub fn cookie(&self, name: &str) -> Option<&str> {
		self.cookies.get(name).map(CookieValue::expose)
	}

	/// Iterates over cookies in name order.
	pub fn cookies(&self) -> impl Iterator<Item = (&str, &CookieValue)> {
		self.cookies.iter().map(|(name, value)| (name.as_str(), value))
	}

	/// Returns the number of cookies in the set.
	pub fn len(&self) -> usize {
		self.cookies.len()
	}

	/// Renders the cookies as a `Cookie` header value (`a=1; b=2`), if any are present.
	pub fn cookie_header(&self) -> Option<String> {
		if self.cookies.is_empty() {
			return None;
		}

		let mut buf = String::new();

		for (idx, (name, value)) in self.cookies.iter().enumerate() {
			if idx > 0 {
				buf.push_str("; ");
			}

			value.write_pair(name, &mut buf);
		}

		Some(buf)
	}

	/// Returns plain `name -> value` pairs for persistence.
	pub(crate) fn to_plain_cookies(&self) -> BTreeMap<String, String> {
		self.cookies.iter().map(|(name, value)| (name.clone(), value.expose().to_owned())).collect()
	}
}

fn is_cookie_name(name: &str) -> bool {
	!name.is_empty()
		&& name.bytes().all(|b| b.is_ascii_graphic() && !matches!(b, b'=' | b';' | b',' | b'"'))
}
