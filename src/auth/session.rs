//! Session triple, user profile, and the wire shapes of the authentication endpoints.

// crates.io
use serde::{Deserializer, de::Error as _};
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Authenticated session: both credentials plus the signed-in user's profile.
///
/// A session only exists when both credentials are present; the vault treats a partial set of
/// stored entries as no session at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
	/// Bearer credential attached to every authenticated request.
	pub access_credential: TokenSecret,
	/// Credential exchanged at the refresh endpoint for a new access credential.
	pub refresh_credential: TokenSecret,
	/// Profile of the signed-in user.
	pub user: UserProfile,
}
impl Session {
	/// Creates a session from its three parts.
	pub fn new(
		access_credential: impl Into<TokenSecret>,
		refresh_credential: impl Into<TokenSecret>,
		user: UserProfile,
	) -> Self {
		Self {
			access_credential: access_credential.into(),
			refresh_credential: refresh_credential.into(),
			user,
		}
	}

	/// Applies a renewal grant, keeping the current refresh credential and profile when the
	/// server did not rotate them.
	pub fn renewed(self, grant: RenewalGrant) -> Self {
		Self {
			access_credential: grant.access_token,
			refresh_credential: grant
				.refresh_token
				.filter(|rotated| !rotated.is_empty())
				.unwrap_or(self.refresh_credential),
			user: grant.user.unwrap_or(self.user),
		}
	}
}
impl From<LoginGrant> for Session {
	fn from(grant: LoginGrant) -> Self {
		Self {
			access_credential: grant.access_token,
			refresh_credential: grant.refresh_token,
			user: grant.user,
		}
	}
}

/// Opaque user profile record returned by the authentication endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);
impl UserProfile {
	/// Wraps an already-decoded JSON object.
	pub fn new(fields: Map<String, Value>) -> Self {
		Self(fields)
	}

	/// Returns a single profile attribute.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	/// Returns the user identifier when the server supplied one as a string or number.
	pub fn id(&self) -> Option<String> {
		match self.0.get("id")? {
			Value::String(id) => Some(id.clone()),
			Value::Number(id) => Some(id.to_string()),
			_ => None,
		}
	}

	/// Returns `true` when the profile carries no attributes.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns the underlying JSON object.
	pub fn fields(&self) -> &Map<String, Value> {
		&self.0
	}
}
impl FromIterator<(String, Value)> for UserProfile {
	fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// Credentials posted to the login endpoint.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials {
	/// Account name.
	pub username: String,
	/// Account password.
	pub password: TokenSecret,
	/// Optional tenant the account belongs to.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tenant_slug: Option<String>,
}
impl LoginCredentials {
	/// Creates credentials without a tenant.
	pub fn new(username: impl Into<String>, password: impl Into<TokenSecret>) -> Self {
		Self { username: username.into(), password: password.into(), tenant_slug: None }
	}

	/// Scopes the login to a tenant.
	pub fn with_tenant(mut self, tenant_slug: impl Into<String>) -> Self {
		self.tenant_slug = Some(tenant_slug.into());

		self
	}
}
impl Debug for LoginCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginCredentials")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("tenant_slug", &self.tenant_slug)
			.finish()
	}
}

/// Successful login response.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginGrant {
	/// Newly issued access credential.
	#[serde(deserialize_with = "non_blank")]
	pub access_token: TokenSecret,
	/// Newly issued refresh credential.
	#[serde(deserialize_with = "non_blank")]
	pub refresh_token: TokenSecret,
	/// Signed-in user's profile.
	#[serde(default)]
	pub user: UserProfile,
}

/// Successful refresh response; the server may omit the rotated refresh credential and profile.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalGrant {
	/// Newly issued access credential.
	#[serde(deserialize_with = "non_blank")]
	pub access_token: TokenSecret,
	/// Rotated refresh credential, when the server rotates.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Updated profile, when the server returns one.
	#[serde(default)]
	pub user: Option<UserProfile>,
}

/// Body posted to the refresh and logout endpoints.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshBody<'a> {
	pub(crate) refresh_token: &'a str,
}

fn non_blank<'de, D>(deserializer: D) -> Result<TokenSecret, D::Error>
where
	D: Deserializer<'de>,
{
	let secret = TokenSecret::deserialize(deserializer)?;

	if secret.is_empty() {
		return Err(D::Error::custom("credential must not be blank"));
	}

	Ok(secret)
}
