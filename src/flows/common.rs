//! Shared helpers for flow implementations (body decoding, signed dispatch).

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	flows::SessionClient,
	http::{HttpResponse, HttpTransport, RequestDescriptor},
};

/// Decodes a JSON body, keeping the path of the offending field on failure.
pub(crate) fn deserialize_body<T>(
	body: &[u8],
) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
}

/// Decodes a successful response into `T`.
pub(crate) fn decode_json<T>(response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	deserialize_body(response.body())
		.map_err(|source| Error::Decode { source, status: response.status().as_u16() })
}

impl<C> SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Builds, signs, and sends `request`; requests without a credential go out unsigned.
	pub(crate) async fn dispatch(
		&self,
		request: &RequestDescriptor,
		credential: Option<&TokenSecret>,
	) -> Result<HttpResponse> {
		let mut outbound = request.build(&self.descriptor)?;

		if let Some(credential) = credential {
			self.signer.sign(&mut outbound, credential)?;
		}

		Ok(self.http_client.send(outbound).await?)
	}
}
