// std
use std::collections::HashSet;
// self
use crate::{
	_prelude::*,
	api::{ApiDescriptor, AuthEndpoints, StorageKeys},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ApiDescriptorError {
	/// Only `http` and `https` base URLs are accepted.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL cannot have relative paths joined onto it.
	#[error("The base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Authentication endpoint paths must not be blank.
	#[error("The {endpoint} endpoint path is empty.")]
	EmptyEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
	},
	/// Renewal timeout must be strictly positive.
	#[error("The refresh timeout must be positive.")]
	NonPositiveTimeout,
	/// Storage keys must not be blank.
	#[error("Storage keys cannot be empty.")]
	EmptyStorageKey,
	/// The three storage keys must be distinct.
	#[error("Storage key `{key}` is used more than once.")]
	DuplicateStorageKey {
		/// Key that appears more than once.
		key: String,
	},
}

/// Builder for [`ApiDescriptor`] values.
#[derive(Debug)]
pub struct ApiDescriptorBuilder {
	/// Base URL for every relative request path.
	pub base_url: Url,
	/// Authentication endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Renewal bound.
	pub refresh_timeout: Option<Duration>,
	/// Persisted entry names.
	pub storage_keys: StorageKeys,
}
impl ApiDescriptorBuilder {
	/// Creates a new builder seeded with the provided base URL and default endpoints.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: AuthEndpoints::default(),
			refresh_timeout: Some(ApiDescriptor::DEFAULT_REFRESH_TIMEOUT),
			storage_keys: StorageKeys::default(),
		}
	}

	/// Sets the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Sets the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Sets the logout endpoint path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.logout = path.into();

		self
	}

	/// Bounds each renewal call (defaults to 15 seconds).
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = Some(timeout);

		self
	}

	/// Leaves the renewal call unbounded apart from whatever the transport enforces.
	pub fn without_refresh_timeout(mut self) -> Self {
		self.refresh_timeout = None;

		self
	}

	/// Overrides the persisted entry names.
	pub fn storage_keys(mut self, keys: StorageKeys) -> Self {
		self.storage_keys = keys;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ApiDescriptor, ApiDescriptorError> {
		let mut base_url = self.base_url;

		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let descriptor = ApiDescriptor {
			base_url,
			endpoints: self.endpoints,
			refresh_timeout: self.refresh_timeout,
			storage_keys: self.storage_keys,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ApiDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ApiDescriptorError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ApiDescriptorError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.base_url.cannot_be_a_base() {
			return Err(ApiDescriptorError::CannotBeABase { url: self.base_url.to_string() });
		}

		validate_endpoint("login", &self.endpoints.login)?;
		validate_endpoint("refresh", &self.endpoints.refresh)?;
		validate_endpoint("logout", &self.endpoints.logout)?;

		if self.refresh_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(ApiDescriptorError::NonPositiveTimeout);
		}

		validate_storage_keys(&self.storage_keys)
	}
}

fn validate_endpoint(name: &'static str, path: &str) -> Result<(), ApiDescriptorError> {
	if path.trim().trim_matches('/').is_empty() {
		Err(ApiDescriptorError::EmptyEndpoint { endpoint: name })
	} else {
		Ok(())
	}
}

fn validate_storage_keys(keys: &StorageKeys) -> Result<(), ApiDescriptorError> {
	let mut seen = HashSet::new();

	for key in keys.all() {
		if key.trim().is_empty() {
			return Err(ApiDescriptorError::EmptyStorageKey);
		}
		if !seen.insert(key) {
			return Err(ApiDescriptorError::DuplicateStorageKey { key: key.to_owned() });
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse descriptor URL fixture.")
	}

	#[test]
	fn rejects_unsupported_scheme_and_blank_endpoints() {
		let err = ApiDescriptor::builder(url("ftp://files.example.com/"))
			.build()
			.expect_err("Descriptor builder should reject non-HTTP schemes.");

		assert!(matches!(err, ApiDescriptorError::UnsupportedScheme { .. }));

		let err = ApiDescriptor::builder(url("https://api.example.com/"))
			.refresh_path("/")
			.build()
			.expect_err("Descriptor builder should reject blank endpoint paths.");

		assert_eq!(err, ApiDescriptorError::EmptyEndpoint { endpoint: "refresh" });
	}

	#[test]
	fn rejects_non_positive_timeout() {
		let err = ApiDescriptor::builder(url("https://api.example.com/"))
			.refresh_timeout(Duration::ZERO)
			.build()
			.expect_err("Descriptor builder should reject a zero timeout.");

		assert_eq!(err, ApiDescriptorError::NonPositiveTimeout);

		let descriptor = ApiDescriptor::builder(url("https://api.example.com/"))
			.without_refresh_timeout()
			.build()
			.expect("Descriptor without a timeout should build.");

		assert_eq!(descriptor.refresh_timeout, None);
	}

	#[test]
	fn rejects_duplicate_storage_keys() {
		let keys =
			StorageKeys { access: "token".into(), refresh: "token".into(), user: "user".into() };
		let err = ApiDescriptor::builder(url("http://localhost:8080/api"))
			.storage_keys(keys)
			.build()
			.expect_err("Descriptor builder should reject duplicate storage keys.");

		assert_eq!(err, ApiDescriptorError::DuplicateStorageKey { key: "token".into() });
	}

	#[test]
	fn defaults_cover_auth_endpoints() {
		let descriptor = ApiDescriptor::builder(url("http://localhost:8080/api"))
			.build()
			.expect("Default descriptor should build.");

		assert_eq!(descriptor.endpoints.login, "auth/login");
		assert_eq!(descriptor.endpoints.logout, "auth/logout");
		assert_eq!(descriptor.refresh_timeout, Some(Duration::seconds(15)));
		assert_eq!(descriptor.storage_keys.all(), ["accessToken", "refreshToken", "user"]);
	}
}
