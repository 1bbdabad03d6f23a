// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for session renewals.
#[derive(Debug, Default)]
pub struct RenewalMetrics {
	attempts: AtomicU64,
	coalesced: AtomicU64,
	refresh_calls: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	replays: AtomicU64,
}
impl RenewalMetrics {
	/// Returns the number of callers that asked for a fresh credential.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of callers that joined a renewal already in flight.
	pub fn coalesced(&self) -> u64 {
		self.coalesced.load(Ordering::Relaxed)
	}

	/// Returns the number of calls actually sent to the refresh endpoint.
	pub fn refresh_calls(&self) -> u64 {
		self.refresh_calls.load(Ordering::Relaxed)
	}

	/// Returns the number of renewals that settled successfully (including stale-credential reuse).
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of renewals that settled with a failure.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of requests replayed after a renewal.
	pub fn replays(&self) -> u64 {
		self.replays.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_coalesced(&self) {
		self.coalesced.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_call(&self) {
		self.refresh_calls.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_replay(&self) {
		self.replays.fetch_add(1, Ordering::Relaxed);
	}
}
