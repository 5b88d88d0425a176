use tally_rt::{ReductionPlan, RunError};

use crate::error::CliError;

/// Prints the butterfly schedule for `participants` and whether it is complete.
pub fn handle_plan(participants: usize) -> Result<ReductionPlan, CliError> {
    if participants == 0 {
        return Err(RunError::InsufficientParticipants {
            required: 1,
            actual: 0,
        }
        .into());
    }
    let plan = ReductionPlan::build(participants);
    println!("{}", plan);
    if !plan.is_complete() {
        log::warn!(
            "A butterfly run over {} participants would be rejected; use a power of two.",
            participants
        );
    }
    Ok(plan)
}
