//! Cookie values as they travel inside a `Cookie` request header.
//!
//! Solver output is untrusted: a value carrying `;` or a control character would split or
//! terminate the header it is rendered into, so such values are rejected up front.
//! Values are kept verbatim otherwise, including the optional RFC 6265 double-quote
//! wrapping, and never appear in `Debug`/`Display` output.

// self
use crate::_prelude::*;

/// Reasons a raw string cannot be used as a cookie value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum CookieValueError {
	/// The value contains `;`, which separates pairs inside a `Cookie` header.
	#[error("Cookie value contains a `;` separator.")]
	Separator,
	/// The value contains a control character (CR/LF included).
	#[error("Cookie value contains a control character.")]
	Control,
}

/// Cookie value validated for header rendering; formatting never reveals it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CookieValue(String);
impl CookieValue {
	/// Validates `raw`, dropping surrounding whitespace.
	pub fn parse(raw: impl Into<String>) -> Result<Self, CookieValueError> {
		let raw = raw.into();
		let value = raw.trim();

		if value.contains(';') {
			return Err(CookieValueError::Separator);
		}
		if value.chars().any(char::is_control) {
			return Err(CookieValueError::Control);
		}

		Ok(Self(value.to_owned()))
	}

	/// Exact value as it is sent upstream. Callers must avoid logging it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Value without the optional surrounding double quotes.
	pub fn unquoted(&self) -> &str {
		self.0
			.strip_prefix('"')
			.and_then(|inner| inner.strip_suffix('"'))
			.unwrap_or(&self.0)
	}

	/// Byte length of the value, safe to log.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` for an empty value (a cookie that is present but blank).
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub(crate) fn write_pair(&self, name: &str, buf: &mut String) {
		buf.push_str(name);
		buf.push('=');
		buf.push_str(&self.0);
	}
}
impl TryFrom<String> for CookieValue {
	type Error = CookieValueError;

	fn try_from(raw: String) -> Result<Self, Self::Error> {
		Self::parse(raw)
	}
}
impl From<CookieValue> for String {
	fn from(value: CookieValue) -> Self {
		value.0
	}
}
impl Debug for CookieValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "CookieValue(<redacted; {} bytes>)", self.0.len())
	}
}
impl Display for CookieValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
