use crate::error::StateMachineError;
use crate::types::WorkflowStatus;

/// Validates a workflow status transition.
///
/// Staying in the same status (a transient failure leaves `writing` as
/// `writing`) is not a transition and is never passed here.
pub fn validate_transition(
    from: WorkflowStatus,
    to: WorkflowStatus,
) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: WorkflowStatus) -> Vec<WorkflowStatus> {
    use WorkflowStatus::*;
    match from {
        Pending => vec![Writing, Completed, Error],
        Writing => vec![Reviewing, Error],
        Reviewing => vec![Pending, Writing, NeedsHuman, Error],
        // resume, or approve/skip the escalated section
        NeedsHuman => vec![Writing, Pending],
        // retry
        Error => vec![Writing, Pending],
        Completed => vec![],
    }
}

fn allowed(from: WorkflowStatus, to: WorkflowStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
