//! Request signing contract that attaches the current access credential to outbound requests.

// crates.io
use ::http::{HeaderValue, header::AUTHORIZATION};
// self
use crate::{auth::TokenSecret, error::ConfigError, http::HttpRequest};

/// Describes how to attach an access credential to an outbound request.
///
/// Signers run on every attempt, including replays, so they must overwrite rather than append
/// any header they manage.
pub trait RequestSigner
where
	Self: Send + Sync,
{
	/// Injects authorization state derived from `credential` into `request`.
	fn sign(&self, request: &mut HttpRequest, credential: &TokenSecret) -> Result<(), ConfigError>;
}

/// Default signer that sets `Authorization: Bearer <credential>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
impl RequestSigner for BearerSigner {
	fn sign(&self, request: &mut HttpRequest, credential: &TokenSecret) -> Result<(), ConfigError> {
		let mut value = HeaderValue::try_from(credential.bearer())?;

		value.set_sensitive(true);
		request.headers_mut().insert(AUTHORIZATION, value);

		Ok(())
	}
}
