//! Observer hook notified when the local session ends.

// self
use crate::flows::TerminationReason;

/// Receives a notification each time a session is terminated.
///
/// Observers run after the stored session has been cleared and at most once per session, so
/// they are the place to route the user back to a login screen.
pub trait SessionObserver
where
	Self: Send + Sync,
{
	/// Called once the session has been cleared.
	fn session_ended(&self, reason: TerminationReason);
}
impl<F> SessionObserver for F
where
	F: Fn(TerminationReason) + Send + Sync,
{
	fn session_ended(&self, reason: TerminationReason) {
		self(reason)
	}
}
