// self
use crate::_prelude::*;

/// Names of the three persisted entries that together hold a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageKeys {
	/// Entry holding the access credential.
	pub access: String,
	/// Entry holding the refresh credential.
	pub refresh: String,
	/// Entry holding the serialized user profile.
	pub user: String,
}
impl StorageKeys {
	/// Returns the keys in the order they are written and cleared.
	pub fn all(&self) -> [&str; 3] {
		[self.access.as_str(), self.refresh.as_str(), self.user.as_str()]
	}
}
impl Default for StorageKeys {
	fn default() -> Self {
		Self { access: "accessToken".into(), refresh: "refreshToken".into(), user: "user".into() }
	}
}
