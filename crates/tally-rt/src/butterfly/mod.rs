// tally-rt/src/butterfly/mod.rs

//! Recursive-halving reduction. Every participant starts with a local sum;
//! each round the upper half of the still-active ranks hands its accumulator
//! to the lower half and drops out, until rank 0 alone holds the total.

mod plan;
mod reducer;

pub use plan::ReductionPlan;
pub use reducer::{ButterflyReducer, Role, Step};
