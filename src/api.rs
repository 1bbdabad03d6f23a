//! API-facing descriptors (data) and expiry strategies (behavior).
//!
//! `descriptor` exposes validated metadata ([`ApiDescriptor`]) covering the base URL, the
//! authentication endpoint paths, the renewal timeout, and the persisted storage keys.
//! `expiry` defines [`ExpiryDetector`], an HTTP-client-agnostic hook that classifies failed
//! responses as expired, invalid, or unrelated to the session.

pub mod descriptor;
pub mod expiry;

pub use descriptor::*;
pub use expiry::*;
