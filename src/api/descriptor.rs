//! API descriptor data structures shared by every flow.
//!
//! The descriptor is validated once at construction so flows can resolve request paths and
//! read the renewal bound without re-checking configuration on the hot path.

/// Builder API for assembling API descriptors.
pub mod builder;
/// Persisted storage key names.
pub mod keys;

pub use builder::*;
pub use keys::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Paths of the authentication endpoints, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
	/// Credential exchange endpoint (`POST {username, password, tenantSlug?}`).
	pub login: String,
	/// Session renewal endpoint (`POST {refreshToken}`).
	pub refresh: String,
	/// Server-side session invalidation endpoint (`POST {refreshToken}`).
	pub logout: String,
}
impl Default for AuthEndpoints {
	fn default() -> Self {
		Self { login: "auth/login".into(), refresh: "auth/refresh".into(), logout: "auth/logout".into() }
	}
}

/// Immutable API descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
	/// Base URL every relative request path resolves against; always ends with `/`.
	pub base_url: Url,
	/// Authentication endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Upper bound on a single renewal call; `None` leaves it to the transport.
	pub refresh_timeout: Option<Duration>,
	/// Names of the persisted session entries.
	pub storage_keys: StorageKeys,
}
impl ApiDescriptor {
	/// Renewal bound applied when none is configured explicitly.
	pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(15);

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ApiDescriptorBuilder {
		ApiDescriptorBuilder::new(base_url)
	}

	/// Resolves a request path against the base URL.
	///
	/// Absolute `http`/`https` URLs pass through untouched; anything else is treated as relative
	/// to the base URL, with leading slashes ignored so `/branches` and `branches` agree.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		if path.starts_with("http://") || path.starts_with("https://") {
			return Url::parse(path)
				.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source });
		}

		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}
}
