//! Expiry strategy hooks that classify failed responses.
//!
//! Implementations decide whether a failure means "the access credential's validity window
//! elapsed" (renew and replay), "the credential is unusable" (log out now), or "unrelated to the
//! session" (hand the failure to the caller), without tying flows to any HTTP client.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	http::{self, HttpResponse},
};

/// Signature of the message fallback used by [`DefaultExpiryDetector`].
pub type MessagePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Strategy hook that classifies failed responses.
///
/// Implementors are required to be `Send + Sync` and only see crate-owned data, so custom
/// detectors never depend on a particular transport.
pub trait ExpiryDetector: Send + Sync {
	/// Classifies a failed response.
	fn classify(&self, failure: &ResponseFailure) -> ExpiryVerdict;
}

/// Classification of a failed response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExpiryVerdict {
	/// Failure unrelated to the session; surfaced to the caller untouched.
	NotExpired,
	/// Access credential's validity window elapsed; eligible for one renewal and replay.
	Expired,
	/// Any other authorization failure; the session is terminated immediately.
	Invalid,
}

/// Primitive view of a failed response handed to [`ExpiryDetector::classify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseFailure {
	/// HTTP status code.
	pub status: u16,
	/// Structured error code from the body (`code`, `errorCode`, `error_code`, or `error`).
	pub error_code: Option<String>,
	/// Human-readable message from the body (`message`, `error_description`, or `detail`).
	pub message: Option<String>,
	/// Truncated body text for diagnostics.
	pub body_preview: Option<String>,
	/// Retry-After hint, when the server sent one.
	pub retry_after: Option<Duration>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ResponseFailure {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an empty failure for the provided status.
	pub fn new(status: u16) -> Self {
		Self {
			status,
			error_code: None,
			message: None,
			body_preview: None,
			retry_after: None,
			body: Vec::new(),
		}
	}

	/// Extracts the structured fields of a failed response.
	pub fn from_response(response: &HttpResponse) -> Self {
		let body = response.body();
		let mut failure = Self::new(response.status().as_u16());

		failure.retry_after = http::parse_retry_after(response.headers());

		if let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) {
			failure.error_code = ["code", "errorCode", "error_code", "error"]
				.iter()
				.find_map(|key| fields.get(*key).and_then(Value::as_str))
				.map(str::to_owned);
			failure.message = ["message", "error_description", "detail"]
				.iter()
				.find_map(|key| fields.get(*key).and_then(message_text));
		}
		if !body.is_empty() {
			failure = failure.with_body_preview(String::from_utf8_lossy(body));
		}

		failure.body = body.clone();

		failure
	}

	/// Adds the structured error code.
	pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
		self.error_code = Some(code.into());

		self
	}

	/// Adds the human-readable message.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Adds a body preview, truncated to a bounded length.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	/// Returns the most descriptive short text available.
	pub fn summary(&self) -> String {
		self.message
			.clone()
			.or_else(|| self.error_code.clone())
			.unwrap_or_else(|| format!("HTTP {}", self.status))
	}
}

/// Default detector: structured codes first, then a message predicate, scoped to
/// authorization statuses.
///
/// Failures whose status is not an authorization status are never session related. Within
/// those, an expired code wins over an invalid code, an invalid code wins over the message
/// predicate, and anything left is treated as an invalid credential.
#[derive(Clone)]
pub struct DefaultExpiryDetector {
	auth_statuses: Vec<u16>,
	expired_codes: Vec<String>,
	invalid_codes: Vec<String>,
	message_predicate: Option<MessagePredicate>,
}
impl DefaultExpiryDetector {
	/// Creates a detector that relies on structured codes only.
	pub fn structured_only() -> Self {
		Self { message_predicate: None, ..Self::default() }
	}

	/// Treats another status code as an authorization failure.
	pub fn with_auth_status(mut self, status: u16) -> Self {
		if !self.auth_statuses.contains(&status) {
			self.auth_statuses.push(status);
		}

		self
	}

	/// Adds a structured code that signals an elapsed validity window.
	pub fn with_expired_code(mut self, code: impl Into<String>) -> Self {
		self.expired_codes.push(code.into());

		self
	}

	/// Adds a structured code that signals an unusable credential.
	pub fn with_invalid_code(mut self, code: impl Into<String>) -> Self {
		self.invalid_codes.push(code.into());

		self
	}

	/// Replaces the message fallback; the predicate receives the lower-cased message.
	pub fn with_message_predicate<F>(mut self, predicate: F) -> Self
	where
		F: 'static + Fn(&str) -> bool + Send + Sync,
	{
		self.message_predicate = Some(Arc::new(predicate));

		self
	}

	fn matches_code(codes: &[String], code: &str) -> bool {
		codes.iter().any(|candidate| candidate.eq_ignore_ascii_case(code))
	}
}
impl Default for DefaultExpiryDetector {
	fn default() -> Self {
		Self {
			auth_statuses: vec![401],
			expired_codes: ["token_expired", "access_token_expired", "jwt_expired", "session_expired"]
				.map(String::from)
				.to_vec(),
			invalid_codes: ["token_invalid", "token_revoked", "session_invalid", "invalid_token"]
				.map(String::from)
				.to_vec(),
			message_predicate: Some(Arc::new(|message: &str| message.contains("expired"))),
		}
	}
}
impl Debug for DefaultExpiryDetector {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DefaultExpiryDetector")
			.field("auth_statuses", &self.auth_statuses)
			.field("expired_codes", &self.expired_codes)
			.field("invalid_codes", &self.invalid_codes)
			.field("message_predicate", &self.message_predicate.is_some())
			.finish()
	}
}
impl ExpiryDetector for DefaultExpiryDetector {
	fn classify(&self, failure: &ResponseFailure) -> ExpiryVerdict {
		if !self.auth_statuses.contains(&failure.status) {
			return ExpiryVerdict::NotExpired;
		}

		if let Some(code) = failure.error_code.as_deref() {
			if Self::matches_code(&self.expired_codes, code) {
				return ExpiryVerdict::Expired;
			}
			if Self::matches_code(&self.invalid_codes, code) {
				return ExpiryVerdict::Invalid;
			}
		}

		let matches_message = match (self.message_predicate.as_ref(), failure.message.as_deref()) {
			(Some(predicate), Some(message)) => predicate(&message.to_lowercase()),
			_ => false,
		};

		if matches_message { ExpiryVerdict::Expired } else { ExpiryVerdict::Invalid }
	}
}

fn message_text(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Array(items) => {
			let parts = items.iter().filter_map(Value::as_str).collect::<Vec<_>>();

			if parts.is_empty() { None } else { Some(parts.join("; ")) }
		},
		_ => None,
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ResponseFailure::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= ResponseFailure::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}
