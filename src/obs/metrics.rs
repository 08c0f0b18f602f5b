// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per recorded flow outcome.
pub const FLOW_COUNTER: &str = "oauth2_token_manager_flow_total";

/// Label pairs attached to [`FLOW_COUNTER`] for one flow outcome.
pub fn flow_labels(kind: FlowKind, outcome: FlowOutcome) -> [(&'static str, &'static str); 2] {
	[("flow", kind.as_str()), ("outcome", outcome.as_str())]
}

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	let labels = flow_labels(kind, outcome);

	tracing::trace!(flow = labels[0].1, outcome = labels[1].1, "flow outcome recorded");

	#[cfg(feature = "metrics")]
	metrics::counter!(FLOW_COUNTER, &labels).increment(1);
}
