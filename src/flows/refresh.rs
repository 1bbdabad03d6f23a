//! Single-flight session renewal.
//!
//! [`RefreshCoordinator`] owns the [`RefreshState`] machine: the first caller that needs a fresh
//! credential flips `Idle → Refreshing` under a lock and becomes the leader; every caller that
//! arrives while the state is `Refreshing` awaits the leader's [`RenewalFlight`] instead of
//! issuing its own call. The leader settles the flight exactly once, after the store has been
//! updated (success) or cleared (failure), so no waiter ever observes a half-finished renewal.

mod metrics;

pub use metrics::RenewalMetrics;

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// self
use crate::{
	_prelude::*,
	api::ResponseFailure,
	auth::{RefreshBody, RenewalGrant, Session, TokenSecret},
	error::RenewalError,
	flows::{SessionClient, TerminationReason, common},
	http::{HttpTransport, RequestDescriptor},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Renewal state shared by every request of a client.
#[derive(Clone, Debug, Default)]
pub enum RefreshState {
	/// No renewal is in flight.
	#[default]
	Idle,
	/// A renewal is in flight; new callers join it.
	Refreshing(Arc<RenewalFlight>),
}

/// Shared outcome of one in-flight renewal.
pub struct RenewalFlight {
	outcome: AsyncOnceCell<Result<TokenSecret, RenewalError>>,
	waiters: AtomicUsize,
}
impl RenewalFlight {
	fn new() -> Self {
		Self { outcome: AsyncOnceCell::new(), waiters: AtomicUsize::new(0) }
	}

	/// Returns how many callers joined this flight besides the leader.
	pub fn waiters(&self) -> usize {
		self.waiters.load(Ordering::Relaxed)
	}

	/// Returns `true` once the leader has published the outcome.
	pub fn is_settled(&self) -> bool {
		self.outcome.is_initialized()
	}

	/// Waits for the leader's outcome.
	pub async fn wait(&self) -> Result<TokenSecret, RenewalError> {
		self.outcome.wait().await.clone()
	}

	fn settle(&self, outcome: Result<TokenSecret, RenewalError>) {
		// Only the leader's guard settles, so there is never a competing initializer.
		let _ = self.outcome.set_blocking(outcome);
	}
}
impl Debug for RenewalFlight {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RenewalFlight")
			.field("waiters", &self.waiters())
			.field("settled", &self.is_settled())
			.finish()
	}
}

/// Guarantees at most one renewal in flight per client.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: Arc<RenewalMetrics>,
}
impl RefreshCoordinator {
	/// Creates a coordinator that reports into the provided counters.
	pub fn new(metrics: Arc<RenewalMetrics>) -> Self {
		Self { state: Mutex::new(RefreshState::Idle), metrics }
	}

	/// Returns a snapshot of the current state.
	pub fn state(&self) -> RefreshState {
		self.state.lock().clone()
	}

	/// Returns `true` while a renewal is in flight.
	pub fn is_refreshing(&self) -> bool {
		matches!(*self.state.lock(), RefreshState::Refreshing(_))
	}

	/// Returns the counters this coordinator reports into.
	pub fn metrics(&self) -> &Arc<RenewalMetrics> {
		&self.metrics
	}

	/// Runs `renew` unless a renewal is already in flight, in which case the caller waits for
	/// that renewal's outcome instead.
	///
	/// `renew` only runs for the leader. If the leader's future is dropped before `renew`
	/// settles, the state returns to [`RefreshState::Idle`] and every waiter rejoins once,
	/// so one of them leads a fresh renewal. A waiter whose second flight is abandoned as well
	/// receives [`RenewalError::Abandoned`].
	pub async fn single_flight<F, Fut>(&self, renew: F) -> Result<TokenSecret, RenewalError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<TokenSecret, RenewalError>>,
	{
		self.metrics.record_attempt();

		let mut rejoined = false;

		loop {
			match self.join_or_lead() {
				Role::Follower(flight) => {
					self.metrics.record_coalesced();

					match flight.wait().await {
						Err(RenewalError::Abandoned) if !rejoined => rejoined = true,
						outcome => return outcome,
					}
				},
				Role::Leader(flight) => {
					let guard = FlightGuard { coordinator: self, flight, settled: false };
					let outcome = renew().await;

					guard.settle(outcome.clone());

					return outcome;
				},
			}
		}
	}

	fn join_or_lead(&self) -> Role {
		let mut state = self.state.lock();

		match &*state {
			RefreshState::Refreshing(flight) => {
				flight.waiters.fetch_add(1, Ordering::Relaxed);

				Role::Follower(flight.clone())
			},
			RefreshState::Idle => {
				let flight = Arc::new(RenewalFlight::new());

				*state = RefreshState::Refreshing(flight.clone());

				Role::Leader(flight)
			},
		}
	}
}

enum Role {
	Leader(Arc<RenewalFlight>),
	Follower(Arc<RenewalFlight>),
}

struct FlightGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	flight: Arc<RenewalFlight>,
	settled: bool,
}
impl FlightGuard<'_> {
	fn settle(mut self, outcome: Result<TokenSecret, RenewalError>) {
		self.finish(outcome);
	}

	fn finish(&mut self, outcome: Result<TokenSecret, RenewalError>) {
		{
			let mut state = self.coordinator.state.lock();

			let is_current = match &*state {
				RefreshState::Refreshing(current) => Arc::ptr_eq(current, &self.flight),
				RefreshState::Idle => false,
			};

			if is_current {
				*state = RefreshState::Idle;
			}
		}

		match &outcome {
			Ok(_) => self.coordinator.metrics.record_success(),
			Err(_) => self.coordinator.metrics.record_failure(),
		}

		self.flight.settle(outcome);
		self.settled = true;
	}
}
impl Drop for FlightGuard<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.finish(Err(RenewalError::Abandoned));
		}
	}
}

impl<C> SessionClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Returns a fresh access credential, renewing the session at most once no matter how many
	/// callers ask concurrently.
	///
	/// A failed renewal terminates the session before any caller observes the failure.
	pub async fn ensure_fresh_credential(&self) -> Result<TokenSecret> {
		Ok(self.renew_session(None).await?)
	}

	/// Renews after a request carrying `carried` was rejected as expired.
	///
	/// When the stored credential no longer matches `carried`, another renewal already
	/// finished while that request was in flight and the stored credential is reused.
	pub(crate) async fn renew_session(
		&self,
		carried: Option<&TokenSecret>,
	) -> Result<TokenSecret, RenewalError> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "renew_session");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(self.coordinator.single_flight(|| async move {
				let observed = self.terminator.epoch();
				let outcome = self.renew_once(carried, observed).await;

				if let Err(e) = &outcome {
					self.end_session(TerminationReason::from_renewal(e), observed).await;
				}

				outcome
			}))
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn renew_once(
		&self,
		carried: Option<&TokenSecret>,
		observed: u64,
	) -> Result<TokenSecret, RenewalError> {
		let session = self
			.vault
			.load()
			.await
			.map_err(RenewalError::Storage)?
			.ok_or(RenewalError::MissingRefreshCredential)?;

		if carried.is_some_and(|carried| *carried != session.access_credential) {
			return Ok(session.access_credential);
		}

		let grant = self.call_refresh_endpoint(&session).await?;
		let renewed = session.renewed(grant);

		// A logout or rejection that landed while the call was in flight wins over the grant.
		let persisted =
			self.terminator.persist_at(&renewed, observed).await.map_err(RenewalError::Storage)?;

		if !persisted {
			return Err(RenewalError::Terminated);
		}

		Ok(renewed.access_credential)
	}

	async fn call_refresh_endpoint(&self, session: &Session) -> Result<RenewalGrant, RenewalError> {
		let body = RefreshBody { refresh_token: session.refresh_credential.expose() };
		let mut request =
			RequestDescriptor::post(self.descriptor.endpoints.refresh.as_str()).json(&body)?;

		if let Some(timeout) = self.descriptor.refresh_timeout {
			request = request.with_timeout(timeout);
		}

		self.renewal_metrics.record_refresh_call();

		let response = self.http_client.send(request.build(&self.descriptor)?).await?;

		if !response.status().is_success() {
			let failure = ResponseFailure::from_response(&response);

			return Err(RenewalError::Rejected { status: failure.status, reason: failure.summary() });
		}

		common::deserialize_body::<RenewalGrant>(response.body())
			.map_err(|e| RenewalError::Malformed { message: e.to_string() })
	}
}
