//! Idempotent session termination and observer fan-out.
//!
//! Every termination and every login bumps a session epoch under the terminator's gate. Writers
//! that started from an older session (a renewal in flight, a request that was rejected) pass the
//! epoch they observed, and their write or termination is dropped once the epoch has moved on.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::Session,
	error::RenewalError,
	ext::SessionObserver,
	flows::SessionClient,
	http::HttpTransport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{SessionVault, StoreError},
};

/// Why a session was terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerminationReason {
	/// The user logged out.
	Logout,
	/// The application called [`SessionClient::terminate`].
	Requested,
	/// The server rejected the access credential for a reason other than expiry.
	SessionInvalid,
	/// Session renewal failed.
	RenewalFailed,
	/// Renewal was needed but no refresh credential was stored.
	NoRefreshCredential,
}
impl TerminationReason {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			TerminationReason::Logout => "logout",
			TerminationReason::Requested => "requested",
			TerminationReason::SessionInvalid => "session_invalid",
			TerminationReason::RenewalFailed => "renewal_failed",
			TerminationReason::NoRefreshCredential => "no_refresh_credential",
		}
	}

	pub(crate) fn from_renewal(error: &RenewalError) -> Self {
		match error {
			RenewalError::MissingRefreshCredential => Self::NoRefreshCredential,
			_ => Self::RenewalFailed,
		}
	}
}
impl Display for TerminationReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Clears the stored session and notifies observers, at most once per session.
pub struct SessionTerminator {
	vault: SessionVault,
	observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
	gate: AsyncMutex<()>,
	epoch: AtomicU64,
}
impl SessionTerminator {
	/// Creates a terminator for the provided vault.
	pub fn new(vault: SessionVault) -> Self {
		Self {
			vault,
			observers: RwLock::new(Vec::new()),
			gate: AsyncMutex::new(()),
			epoch: AtomicU64::new(0),
		}
	}

	/// Registers an observer for future terminations.
	pub fn observe(&self, observer: Arc<dyn SessionObserver>) {
		self.observers.write().push(observer);
	}

	/// Returns the current session epoch.
	pub fn epoch(&self) -> u64 {
		self.epoch.load(Ordering::Acquire)
	}

	/// Clears every session entry.
	///
	/// Returns `true` when a session (even a partial one) was cleared and observers were
	/// notified; `false` when nothing was stored, in which case nothing else happens.
	pub async fn terminate(&self, reason: TerminationReason) -> Result<bool, StoreError> {
		self.terminate_at(reason, None).await
	}

	/// Terminates only if no other termination or login happened since `observed`.
	pub(crate) async fn terminate_at(
		&self,
		reason: TerminationReason,
		observed: Option<u64>,
	) -> Result<bool, StoreError> {
		const KIND: FlowKind = FlowKind::Terminate;

		let span = FlowSpan::new(KIND, "terminate");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _serialized = self.gate.lock().await;

				if observed.is_some_and(|observed| observed != self.epoch()) {
					self.superseded(KIND);

					return Ok(false);
				}

				self.epoch.fetch_add(1, Ordering::AcqRel);

				if !self.vault.has_any().await? {
					return Ok(false);
				}

				self.vault.clear().await?;
				obs::record_termination(reason.as_str());

				let observers = self.observers.read().clone();

				for observer in observers {
					observer.session_ended(reason);
				}

				Ok(true)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Stores a brand-new session (login), superseding every in-flight writer.
	pub(crate) async fn replace(&self, session: &Session) -> Result<(), StoreError> {
		let _serialized = self.gate.lock().await;

		self.epoch.fetch_add(1, Ordering::AcqRel);
		self.vault.persist(session).await
	}

	/// Stores a renewed session unless the session ended or was replaced since `observed`.
	///
	/// Returns `false` (and writes nothing) when the epoch has moved on.
	pub(crate) async fn persist_at(
		&self,
		session: &Session,
		observed: u64,
	) -> Result<bool, StoreError> {
		let _serialized = self.gate.lock().await;

		if observed != self.epoch() {
			self.superseded(FlowKind::Refresh);

			return Ok(false);
		}

		self.vault.persist(session).await?;

		Ok(true)
	}

	fn superseded(&self, kind: FlowKind) {
		obs::record_superseded(kind);
		obs::trace_superseded(kind, self.epoch());
	}
}
impl Debug for SessionTerminator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionTerminator")
			.field("vault", &self.vault)
			.field("observers", &self.observers.read().len())
			.field("epoch", &self.epoch())
			.finish()
	}
}

impl<C> SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Ends the local session; safe to call any number of times.
	///
	/// Returns `true` only for the call that actually cleared a session.
	pub async fn terminate(&self) -> Result<bool> {
		Ok(self.terminator.terminate(TerminationReason::Requested).await?)
	}

	/// Terminates on behalf of a failing flow that started at session epoch `observed`, where
	/// the flow's own error takes precedence over a store failure.
	pub(crate) async fn end_session(&self, reason: TerminationReason, observed: u64) {
		if let Err(e) = self.terminator.terminate_at(reason, Some(observed)).await {
			obs::record_warning(FlowKind::Terminate, "Failed to clear the stored session.", &e);
		}
	}
}
