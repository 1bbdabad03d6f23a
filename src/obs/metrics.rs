// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counts one login, request, replay, renewal, logout, or termination step.
///
/// Emits `session_broker_flow_total{flow, outcome}` when the `metrics` feature is enabled.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"session_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a session that was actually cleared, labeled by why it ended.
pub fn record_termination(reason: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("session_broker_terminations_total", "reason" => reason).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = reason;
	}
}

/// Counts a write or termination dropped because a newer session epoch had already begun.
pub fn record_superseded(kind: FlowKind) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("session_broker_superseded_total", "flow" => kind.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = kind;
	}
}
