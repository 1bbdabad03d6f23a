//! Transport primitives for authenticated API calls.
//!
//! The module exposes [`HttpTransport`] alongside [`RequestDescriptor`] and [`RequestTimeout`]
//! so downstream crates can plug in custom HTTP clients. Flows only ever see
//! [`HttpRequest`]/[`HttpResponse`] values, which keeps expiry detection and replay independent
//! of the transport in use.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{CONTENT_TYPE, RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	api::ApiDescriptor,
	error::{ConfigError, TransportError},
};

/// Outbound request handed to [`HttpTransport::send`].
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Fully buffered response returned by [`HttpTransport::send`].
pub type HttpResponse = ::http::Response<Vec<u8>>;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports that execute already-signed requests.
///
/// The trait acts as the client's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so they can be shared across client clones, and the futures they
/// return must be `Send` so callers can spawn requests onto any multi-threaded executor.
///
/// Any status code is a successful send; only failures that produced no response (DNS, TCP,
/// TLS, timeout) are reported as [`TransportError`]. Transports should honor a
/// [`RequestTimeout`] extension when one is present and report expiry as
/// [`TransportError::Timeout`].
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and buffers the full response body.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Per-request timeout carried as a request extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTimeout(pub Duration);

/// Transport-independent description of an API call.
///
/// The descriptor is kept (not the built request) so a request parked behind a renewal can be
/// rebuilt and re-signed with the fresh credential.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the API base URL, or an absolute `http(s)` URL.
	pub path: String,
	/// Extra headers; the client adds `Authorization` itself.
	pub headers: HeaderMap,
	/// Request body.
	pub body: Vec<u8>,
	/// Optional per-request timeout.
	pub timeout: Option<Duration>,
	replayed: bool,
}
impl RequestDescriptor {
	/// Creates a descriptor without a body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: Vec::new(),
			timeout: None,
			replayed: false,
		}
	}

	/// Shortcut for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shortcut for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shortcut for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shortcut for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shortcut for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Adds a header, replacing any previous value with the same name.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `payload` as the JSON body and sets `Content-Type`.
	pub fn json<T>(mut self, payload: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = serde_json::to_vec(payload)?;
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Bounds this request; transports report expiry as [`TransportError::Timeout`].
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns `true` once the request has been replayed after a renewal.
	///
	/// A replayed request is never renewed again: a second expiry surfaces to the caller.
	pub fn is_replayed(&self) -> bool {
		self.replayed
	}

	pub(crate) fn into_replay(mut self) -> Self {
		self.replayed = true;

		self
	}

	/// Builds the unsigned transport request.
	pub(crate) fn build(&self, api: &ApiDescriptor) -> Result<HttpRequest, ConfigError> {
		let url = api.resolve(&self.path)?;
		let mut request = ::http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone())?;

		*request.headers_mut() = self.headers.clone();

		if let Some(timeout) = self.timeout {
			request.extensions_mut().insert(RequestTimeout(timeout));
		}

		Ok(request)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Configure any custom [`ReqwestClient`] to disable redirect following if the API answers
/// authentication failures with redirects, since a redirected `401` cannot be replayed.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
		let timeout = request.extensions().get::<RequestTimeout>().copied();
		let mut request = reqwest::Request::try_from(request)?;

		if let Some(RequestTimeout(timeout)) = timeout {
			*request.timeout_mut() = std::time::Duration::try_from(timeout).ok();
		}

		let response = self.0.execute(request).await?;
		let status = response.status();
		let version = response.version();
		let headers = response.headers().to_owned();
		let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

		*response_new.status_mut() = status;
		*response_new.version_mut() = version;
		*response_new.headers_mut() = headers;

		Ok(response_new)
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
impl HttpTransport for ReqwestHttpClient {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(self.execute(request))
	}
}

/// Parses a `Retry-After` header given either as delta-seconds or an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return (secs >= 0).then(|| Duration::seconds(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
