//! Public extension contracts (request signing, session observers).
//!
//! Both hooks are plain traits so the UI layer can supply its own header scheme or navigation
//! handling without the client depending on it.

pub mod request_signer;
pub mod session_observer;

pub use request_signer::*;
pub use session_observer::*;
