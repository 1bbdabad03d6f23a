//! Credential exchange and explicit logout.

// self
use crate::{
	_prelude::*,
	api::ResponseFailure,
	auth::{LoginCredentials, LoginGrant, RefreshBody, Session},
	flows::{SessionClient, TerminationReason, common},
	http::{HttpTransport, RequestDescriptor},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<C> SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Exchanges credentials at the login endpoint and persists the resulting session.
	///
	/// Any previously stored session is replaced. The login call is unauthenticated and never
	/// enters the renewal path.
	pub async fn login(&self, credentials: LoginCredentials) -> Result<Session> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = RequestDescriptor::post(self.descriptor.endpoints.login.as_str())
					.json(&credentials)?;
				let response = self.dispatch(&request, None).await?;

				if !response.status().is_success() {
					return Err(Error::Api(Box::new(ResponseFailure::from_response(&response))));
				}

				let session = Session::from(common::decode_json::<LoginGrant>(&response)?);

				self.terminator.replace(&session).await?;

				Ok(session)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Invalidates the session on the server (best effort) and always ends it locally.
	///
	/// A failing logout call is logged and ignored; only a store failure while clearing the
	/// session is returned. Without a stored refresh credential the server is not contacted.
	pub async fn logout(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let remote = match self.vault.refresh_credential().await {
					Ok(Some(refresh)) => self.invalidate_remote(refresh.expose()).await,
					Ok(None) => Ok(()),
					Err(e) => Err(e.into()),
				};

				if let Err(e) = remote {
					obs::record_warning(KIND, "Server-side logout failed.", &e);
				}

				self.terminator.terminate(TerminationReason::Logout).await?;

				Ok(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn invalidate_remote(&self, refresh_token: &str) -> Result<()> {
		let request = RequestDescriptor::post(self.descriptor.endpoints.logout.as_str())
			.json(&RefreshBody { refresh_token })?;
		let credential = self.vault.access_credential().await?;
		let response = self.dispatch(&request, credential.as_ref()).await?;

		if !response.status().is_success() {
			return Err(Error::Api(Box::new(ResponseFailure::from_response(&response))));
		}

		Ok(())
	}
}
