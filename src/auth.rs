//! Session-domain models: redacted credentials, the session triple, and endpoint payloads.

pub mod secret;
pub mod session;

pub use secret::*;
pub use session::*;
