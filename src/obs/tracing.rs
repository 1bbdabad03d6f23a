// self
use crate::{_prelude::*, obs::FlowKind};

/// A session flow future, wrapped in its span when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// The bare flow future when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span covering one login, request, renewal, replay, logout, or termination.
///
/// Renewal followers never open one; only the leader's network call is traced.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens `session_broker.flow` with the flow label and the call site as `stage`.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("session_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span; keep the guard out of `.await` points.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Attaches the span to a flow future, so waits on the renewal gate stay attributed.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Keeps a [`FlowSpan`] entered until dropped.
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Warns about a failure the client swallows, such as a failed server-side logout or a
/// store that could not be cleared while another error is being returned.
pub fn record_warning(kind: FlowKind, message: &str, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(flow = kind.as_str(), error = %error, "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, message, error);
	}
}

/// Notes a renewal grant or termination that lost to a newer login or logout.
pub fn trace_superseded(kind: FlowKind, epoch: u64) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(flow = kind.as_str(), epoch, "Session epoch moved on; dropping the write.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, epoch);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn flow_span_noop_without_tracing() {
		let _guard = FlowSpan::new(FlowKind::Terminate, "terminate").entered();
	}

	#[test]
	fn superseded_write_is_logged_for_any_flow() {
		trace_superseded(FlowKind::Refresh, 3);
		trace_superseded(FlowKind::Terminate, 4);
	}

	#[test]
	fn record_warning_accepts_any_error() {
		let error = std::io::Error::other("connection reset");

		record_warning(FlowKind::Logout, "Logout endpoint call failed.", &error);
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
