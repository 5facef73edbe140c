// self
use crate::obs::{OpKind, OpOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"odot_client_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records the final outcome of an operation from its result.
pub(crate) fn record_result<T, E>(kind: OpKind, result: &Result<T, E>) {
	match result {
		Ok(_) => record_op_outcome(kind, OpOutcome::Success),
		Err(_) => record_op_outcome(kind, OpOutcome::Failure),
	}
}
