//! Demonstrates driving [`SessionClient`] through a custom, in-process transport.
//!
//! 1. Implement [`HttpTransport`] so the transport answers with buffered [`HttpResponse`]s.
//! 2. Pass the transport to [`SessionClient::with_http_client`] together with a store.
//! 3. Log in, let the access credential expire, and watch the client renew and replay.
//! 4. Log out and observe the termination through a [`TerminationReason`] callback.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use parking_lot::Mutex;
use serde_json::{Value, json};
use url::Url;
// self
use session_broker::{
	api::ApiDescriptor,
	auth::LoginCredentials,
	error::TransportError,
	flows::{SessionClient, TerminationReason},
	http::{HttpRequest, HttpResponse, HttpTransport, RequestDescriptor, TransportFuture},
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let descriptor = ApiDescriptor::builder(Url::parse("https://pos.example.com/api/")?).build()?;
	let transport = Arc::new(MockApi::default());
	let client: SessionClient<MockApi> =
		SessionClient::with_http_client(store, descriptor, transport.clone()).with_observer(
			|reason: TerminationReason| println!("Session ended locally ({reason})."),
		);
	let session = client.login(LoginCredentials::new("ada", "analytical-engine")).await?;

	println!("Signed in as {}.", session.user.id().unwrap_or_default());

	let branches = client.execute_json::<Value>(RequestDescriptor::get("branches")).await?;

	println!("First call succeeded: {branches}.");

	transport.expire_access_credential();

	let branches = client.execute_json::<Value>(RequestDescriptor::get("branches")).await?;

	println!(
		"Call after expiry succeeded after {} refresh call(s): {branches}.",
		client.renewal_metrics.refresh_calls(),
	);

	client.logout().await?;

	println!("Requests served by the mock API: {}.", transport.served());

	Ok(())
}

/// Tiny in-process API that issues numbered access credentials.
#[derive(Default)]
struct MockApi {
	generation: Mutex<u32>,
	expired: Mutex<bool>,
	served: AtomicUsize,
}
impl MockApi {
	fn expire_access_credential(&self) {
		*self.expired.lock() = true;
	}

	fn served(&self) -> usize {
		self.served.load(Ordering::Relaxed)
	}

	fn issue(&self) -> String {
		let mut generation = self.generation.lock();

		*generation += 1;
		*self.expired.lock() = false;

		format!("access-{generation}")
	}

	fn current(&self) -> String {
		format!("Bearer access-{}", self.generation.lock())
	}

	fn respond(&self, request: &HttpRequest) -> HttpResponse {
		match request.uri().path() {
			"/api/auth/login" => reply(
				200,
				json!({
					"accessToken": self.issue(),
					"refreshToken": "refresh-1",
					"user": { "id": "u-1", "name": "Ada" }
				}),
			),
			"/api/auth/refresh" => reply(200, json!({ "accessToken": self.issue() })),
			"/api/auth/logout" => reply(200, json!({})),
			_ => {
				let authorization = request
					.headers()
					.get(http::header::AUTHORIZATION)
					.and_then(|value| value.to_str().ok());

				let expired = *self.expired.lock();

				if expired || authorization != Some(self.current().as_str()) {
					reply(401, json!({ "code": "token_expired", "message": "jwt expired" }))
				} else {
					reply(200, json!([{ "id": 1, "name": "North" }]))
				}
			},
		}
	}
}
impl HttpTransport for MockApi {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			self.served.fetch_add(1, Ordering::Relaxed);

			Ok::<_, TransportError>(self.respond(&request))
		})
	}
}

fn reply(status: u16, body: Value) -> HttpResponse {
	let mut response = HttpResponse::new(body.to_string().into_bytes());

	*response.status_mut() = http::StatusCode::from_u16(status).unwrap_or_default();

	response
}
