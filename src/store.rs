//! Storage contracts, the session vault, and built-in credential store implementations.
//!
//! A [`CredentialStore`] is a flat string key/value store (browser storage, a keychain, a file).
//! [`SessionVault`] maps the three persisted entries onto a [`Session`] and is the only place
//! that knows the entry names.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	api::StorageKeys,
	auth::{Session, TokenSecret, UserProfile},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for persisted session entries.
///
/// Writes and removals take several entries at once so backends that support it can apply them
/// atomically; a backend that cannot should apply them in order.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads a single entry.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Writes (or overwrites) every provided entry.
	fn set_many(&self, entries: Vec<(String, String)>) -> StoreFuture<'_, ()>;

	/// Removes every provided entry; missing entries are ignored.
	fn remove_many(&self, keys: Vec<String>) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend or the vault.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Typed view over a [`CredentialStore`] that reads and writes whole sessions.
#[derive(Clone)]
pub struct SessionVault {
	store: Arc<dyn CredentialStore>,
	keys: StorageKeys,
}
impl SessionVault {
	/// Wraps a store using the provided entry names.
	pub fn new(store: Arc<dyn CredentialStore>, keys: StorageKeys) -> Self {
		Self { store, keys }
	}

	/// Returns the entry names in use.
	pub fn keys(&self) -> &StorageKeys {
		&self.keys
	}

	/// Loads the stored session.
	///
	/// Missing or blank credentials mean no session; a missing profile is treated as empty.
	pub async fn load(&self) -> Result<Option<Session>, StoreError> {
		let (Some(access), Some(refresh)) =
			(self.access_credential().await?, self.refresh_credential().await?)
		else {
			return Ok(None);
		};
		let user = match self.store.get(&self.keys.user).await? {
			Some(raw) if !raw.trim().is_empty() =>
				serde_json::from_str::<UserProfile>(&raw).map_err(|e| StoreError::Serialization {
					message: format!("Stored user profile is not a JSON object: {e}"),
				})?,
			_ => UserProfile::default(),
		};

		Ok(Some(Session { access_credential: access, refresh_credential: refresh, user }))
	}

	/// Reads the stored access credential.
	pub async fn access_credential(&self) -> Result<Option<TokenSecret>, StoreError> {
		self.secret(&self.keys.access).await
	}

	/// Reads the stored refresh credential.
	pub async fn refresh_credential(&self) -> Result<Option<TokenSecret>, StoreError> {
		self.secret(&self.keys.refresh).await
	}

	/// Persists all three entries of the session.
	pub async fn persist(&self, session: &Session) -> Result<(), StoreError> {
		let user = serde_json::to_string(&session.user).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize user profile: {e}"),
		})?;

		self.store
			.set_many(vec![
				(self.keys.access.clone(), session.access_credential.expose().to_owned()),
				(self.keys.refresh.clone(), session.refresh_credential.expose().to_owned()),
				(self.keys.user.clone(), user),
			])
			.await
	}

	/// Removes all three entries.
	pub async fn clear(&self) -> Result<(), StoreError> {
		self.store.remove_many(self.keys.all().map(str::to_owned).to_vec()).await
	}

	/// Returns `true` when any of the three entries is present, even a partial set.
	pub async fn has_any(&self) -> Result<bool, StoreError> {
		for key in self.keys.all() {
			if self.store.get(key).await?.is_some() {
				return Ok(true);
			}
		}

		Ok(false)
	}

	async fn secret(&self, key: &str) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.store.get(key).await?.map(TokenSecret::new).filter(|secret| !secret.is_empty()))
	}
}
impl Debug for SessionVault {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionVault").field("keys", &self.keys).finish_non_exhaustive()
	}
}
