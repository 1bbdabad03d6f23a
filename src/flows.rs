//! Session flows powered by the [`SessionClient`] facade.

pub mod login;
pub mod refresh;
pub mod replay;
pub mod terminate;

mod common;

pub use refresh::*;
pub use replay::*;
pub use terminate::*;

// self
use crate::{
	_prelude::*,
	api::{ApiDescriptor, DefaultExpiryDetector, ExpiryDetector},
	auth::Session,
	ext::{BearerSigner, RequestSigner, SessionObserver},
	http::HttpTransport,
	store::{CredentialStore, SessionVault},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestSessionClient = SessionClient<ReqwestHttpClient>;

/// Authenticated API client that renews its session transparently.
///
/// The client owns the HTTP transport, the session vault, the expiry detector, and the request
/// signer. Clones share the same renewal state, so the single-flight guarantee holds across
/// every clone of one client.
pub struct SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// HTTP transport used for every outbound request.
	pub http_client: Arc<C>,
	/// API descriptor that defines the base URL, auth endpoints, and renewal bound.
	pub descriptor: ApiDescriptor,
	/// Typed view over the credential store.
	pub vault: SessionVault,
	/// Classifier applied to failed responses.
	pub detector: Arc<dyn ExpiryDetector>,
	/// Attaches the access credential to outbound requests.
	pub signer: Arc<dyn RequestSigner>,
	/// Shared counters for renewal outcomes.
	pub renewal_metrics: Arc<RenewalMetrics>,
	coordinator: Arc<RefreshCoordinator>,
	terminator: Arc<SessionTerminator>,
}
impl<C> SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn CredentialStore>,
		descriptor: ApiDescriptor,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		let vault = SessionVault::new(store, descriptor.storage_keys.clone());
		let renewal_metrics = Arc::new(RenewalMetrics::default());

		Self {
			http_client: http_client.into(),
			descriptor,
			detector: Arc::new(DefaultExpiryDetector::default()),
			signer: Arc::new(BearerSigner),
			coordinator: Arc::new(RefreshCoordinator::new(renewal_metrics.clone())),
			terminator: Arc::new(SessionTerminator::new(vault.clone())),
			renewal_metrics,
			vault,
		}
	}

	/// Replaces the expiry detector.
	pub fn with_detector(mut self, detector: impl 'static + ExpiryDetector) -> Self {
		self.detector = Arc::new(detector);

		self
	}

	/// Replaces the request signer.
	pub fn with_signer(mut self, signer: impl 'static + RequestSigner) -> Self {
		self.signer = Arc::new(signer);

		self
	}

	/// Registers a session observer.
	pub fn with_observer(self, observer: impl 'static + SessionObserver) -> Self {
		self.observe(observer);

		self
	}

	/// Registers a session observer on an existing client (and all of its clones).
	pub fn observe(&self, observer: impl 'static + SessionObserver) {
		self.terminator.observe(Arc::new(observer));
	}

	/// Loads the stored session, if a complete one exists.
	pub async fn current_session(&self) -> Result<Option<Session>> {
		Ok(self.vault.load().await?)
	}

	/// Returns the renewal coordinator shared by this client's clones.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Returns the session terminator shared by this client's clones.
	pub fn terminator(&self) -> &SessionTerminator {
		&self.terminator
	}
}
#[cfg(feature = "reqwest")]
impl SessionClient<ReqwestHttpClient> {
	/// Creates a new client for the provided descriptor.
	///
	/// The client provisions its own reqwest-backed transport so callers do not need to pass
	/// HTTP handles explicitly.
	pub fn new(store: Arc<dyn CredentialStore>, descriptor: ApiDescriptor) -> Self {
		Self::with_http_client(store, descriptor, ReqwestHttpClient::default())
	}
}
impl<C> Clone for SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			descriptor: self.descriptor.clone(),
			vault: self.vault.clone(),
			detector: self.detector.clone(),
			signer: self.signer.clone(),
			renewal_metrics: self.renewal_metrics.clone(),
			coordinator: self.coordinator.clone(),
			terminator: self.terminator.clone(),
		}
	}
}
impl<C> Debug for SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionClient")
			.field("descriptor", &self.descriptor)
			.field("refresh_state", &self.coordinator.state())
			.finish_non_exhaustive()
	}
}
