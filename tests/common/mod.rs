//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::MockServer;
use parking_lot::Mutex;
use serde_json::{Value, json};
use url::Url;
// self
use session_broker::{
	api::ApiDescriptor,
	auth::{Session, UserProfile},
	error::TransportError,
	flows::{SessionClient, TerminationReason},
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	store::{CredentialStore, MemoryStore, SessionVault},
};
#[cfg(feature = "reqwest")] use session_broker::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
pub type ReqwestTestClient = SessionClient<ReqwestHttpClient>;

/// Builds a descriptor pointing at the mock server.
pub fn descriptor(server: &MockServer) -> ApiDescriptor {
	api_descriptor(&server.base_url())
}

/// Builds a descriptor for an arbitrary base URL.
pub fn api_descriptor(base: &str) -> ApiDescriptor {
	ApiDescriptor::builder(Url::parse(base).expect("Mock base URL should parse."))
		.build()
		.expect("Test descriptor should build.")
}

/// Profile used by seeded sessions.
pub fn profile() -> UserProfile {
	serde_json::from_value(json!({ "id": "u-1", "name": "Ada" }))
		.expect("Profile fixture should deserialize.")
}

/// Writes the `access-1`/`refresh-1` session into `store`.
pub async fn seed_session(store: &Arc<MemoryStore>, descriptor: &ApiDescriptor) {
	let vault = SessionVault::new(store.clone(), descriptor.storage_keys.clone());

	vault
		.persist(&Session::new("access-1", "refresh-1", profile()))
		.await
		.expect("Seeding the session should succeed.");
}

#[cfg(feature = "reqwest")]
/// Builds a reqwest-backed client over an in-memory store holding the seeded session.
pub async fn seeded_reqwest_client(server: &MockServer) -> (ReqwestTestClient, Arc<MemoryStore>) {
	let descriptor = descriptor(server);
	let store = Arc::new(MemoryStore::default());

	seed_session(&store, &descriptor).await;

	let backend: Arc<dyn CredentialStore> = store.clone();

	(SessionClient::new(backend, descriptor), store)
}

/// Body the API sends when the access credential has expired.
pub fn expired_body() -> Value {
	json!({ "statusCode": 401, "code": "token_expired", "message": "jwt expired" })
}

/// Records every termination reason an observer receives.
#[derive(Clone, Default)]
pub struct ObserverLog(Arc<Mutex<Vec<TerminationReason>>>);
impl ObserverLog {
	pub fn record(&self, reason: TerminationReason) {
		self.0.lock().push(reason);
	}

	pub fn reasons(&self) -> Vec<TerminationReason> {
		self.0.lock().clone()
	}

	pub fn attach<C>(&self, client: &SessionClient<C>)
	where
		C: ?Sized + HttpTransport,
	{
		let log = self.clone();

		client.observe(move |reason: TerminationReason| log.record(reason));
	}
}

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Scripted transport for deterministic failure injection.
pub struct ScriptedTransport {
	handler: Box<Handler>,
	seen: Mutex<Vec<HttpRequest>>,
	sent: AtomicUsize,
}
impl ScriptedTransport {
	pub fn new<F>(handler: F) -> Self
	where
		F: 'static + Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
	{
		Self { handler: Box::new(handler), seen: Mutex::new(Vec::new()), sent: AtomicUsize::new(0) }
	}

	/// Returns how many requests hit `path`.
	pub fn calls_to(&self, path: &str) -> usize {
		self.seen.lock().iter().filter(|request| request.uri().path() == path).count()
	}

	/// Returns a copy of the requests that hit `path`.
	pub fn requests_to(&self, path: &str) -> Vec<(Option<String>, Vec<u8>)> {
		self.seen
			.lock()
			.iter()
			.filter(|request| request.uri().path() == path)
			.map(|request| (authorization(request), request.body().clone()))
			.collect()
	}

	pub fn total(&self) -> usize {
		self.sent.load(Ordering::SeqCst)
	}
}
impl HttpTransport for ScriptedTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			self.sent.fetch_add(1, Ordering::SeqCst);

			let outcome = (self.handler)(&request);
			let mut seen_request = HttpRequest::new(request.body().clone());

			*seen_request.method_mut() = request.method().clone();
			*seen_request.uri_mut() = request.uri().clone();
			*seen_request.headers_mut() = request.headers().clone();
			self.seen.lock().push(seen_request);

			outcome
		})
	}
}

/// Returns the `Authorization` header of `request`, if any.
pub fn authorization(request: &HttpRequest) -> Option<String> {
	request
		.headers()
		.get(http::header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.map(str::to_owned)
}

/// Builds a JSON response.
pub fn json_response(status: u16, body: Value) -> HttpResponse {
	let mut response = HttpResponse::new(body.to_string().into_bytes());

	*response.status_mut() =
		http::StatusCode::from_u16(status).expect("Status fixture should be valid.");
	response
		.headers_mut()
		.insert(http::header::CONTENT_TYPE, http::HeaderValue::from_static("application/json"));

	response
}
