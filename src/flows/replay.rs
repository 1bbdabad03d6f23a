//! Authenticated dispatch with transparent renewal and a single replay.
//!
//! [`SessionClient::execute`] signs the request with the stored access credential and sends it.
//! When the response is classified [`ExpiryVerdict::Expired`], the request is parked as a
//! [`PendingRequest`] while its caller awaits the shared renewal, then replayed exactly once
//! with the fresh credential. A replayed request is never renewed again.

// self
use crate::{
	_prelude::*,
	api::{ExpiryVerdict, ResponseFailure},
	auth::TokenSecret,
	flows::{SessionClient, TerminationReason, common},
	http::{HttpResponse, HttpTransport, RequestDescriptor},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// A request that failed as expired and is waiting for the renewal to settle.
#[derive(Clone, Debug)]
pub struct PendingRequest {
	request: RequestDescriptor,
	carried: Option<TokenSecret>,
	failure: ResponseFailure,
}
impl PendingRequest {
	/// Parks `request`, remembering the credential it carried and the failure it received.
	pub fn new(
		request: RequestDescriptor,
		carried: Option<TokenSecret>,
		failure: ResponseFailure,
	) -> Self {
		Self { request, carried, failure }
	}

	/// Returns the original request.
	pub fn request(&self) -> &RequestDescriptor {
		&self.request
	}

	/// Returns the credential the failed attempt carried, if any.
	pub fn carried(&self) -> Option<&TokenSecret> {
		self.carried.as_ref()
	}

	/// Returns the expiry failure that parked the request.
	pub fn failure(&self) -> &ResponseFailure {
		&self.failure
	}

	/// Consumes the parked request and returns it marked as replayed.
	pub fn into_replay(self) -> RequestDescriptor {
		self.request.into_replay()
	}
}

/// Result of inspecting one attempt.
enum Attempt {
	Done(HttpResponse),
	Park(Box<PendingRequest>),
}

impl<C> SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Sends an authenticated request, renewing the session and replaying once if the access
	/// credential has expired.
	///
	/// Only successful (`2xx`/`3xx`) responses are returned; every failure is mapped to an
	/// [`Error`] variant. When renewal fails, the renewal's error is returned, not the original
	/// expiry.
	pub async fn execute(&self, request: RequestDescriptor) -> Result<HttpResponse> {
		let pending = match self.attempt(FlowKind::Request, request).await? {
			Attempt::Done(response) => return Ok(response),
			Attempt::Park(pending) => pending,
		};
		let fresh = self.renew_session(pending.carried()).await?;
		let replay = pending.into_replay();

		self.renewal_metrics.record_replay();

		match self.attempt_with(FlowKind::Replay, replay, Some(fresh)).await? {
			Attempt::Done(response) => Ok(response),
			// A replayed request never parks; `inspect` surfaces a second expiry instead.
			Attempt::Park(pending) => Err(Error::SessionExpired(Box::new(pending.failure))),
		}
	}

	/// Same as [`execute`](Self::execute), then decodes the JSON body into `T`.
	pub async fn execute_json<T>(&self, request: RequestDescriptor) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.execute(request).await?;

		common::decode_json(&response)
	}

	async fn attempt(&self, kind: FlowKind, request: RequestDescriptor) -> Result<Attempt> {
		let credential = self.vault.access_credential().await?;

		self.attempt_with(kind, request, credential).await
	}

	async fn attempt_with(
		&self,
		kind: FlowKind,
		request: RequestDescriptor,
		credential: Option<TokenSecret>,
	) -> Result<Attempt> {
		let span = FlowSpan::new(kind, "attempt");

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let observed = self.terminator.epoch();
				let response = self.dispatch(&request, credential.as_ref()).await?;

				self.inspect(request, credential, response, observed).await
			})
			.await;

		match &result {
			Ok(Attempt::Done(_)) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Ok(Attempt::Park(_)) | Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
		}

		result
	}

	async fn inspect(
		&self,
		request: RequestDescriptor,
		credential: Option<TokenSecret>,
		response: HttpResponse,
		observed: u64,
	) -> Result<Attempt> {
		let status = response.status();

		if !(status.is_client_error() || status.is_server_error()) {
			return Ok(Attempt::Done(response));
		}

		let failure = ResponseFailure::from_response(&response);

		match self.detector.classify(&failure) {
			ExpiryVerdict::NotExpired => Err(Error::Api(Box::new(failure))),
			ExpiryVerdict::Invalid => {
				self.end_session(TerminationReason::SessionInvalid, observed).await;

				Err(Error::SessionInvalid(Box::new(failure)))
			},
			ExpiryVerdict::Expired if request.is_replayed() =>
				Err(Error::SessionExpired(Box::new(failure))),
			ExpiryVerdict::Expired => {
				let pending = PendingRequest::new(request, credential, failure);

				Ok(Attempt::Park(Box::new(pending)))
			},
		}
	}
}
