// tally-rt/src/butterfly/reducer.rs

use tally_comm::Rank;

use crate::error::RunResult;
use crate::protocol::{post, unexpected, Comm, Message, REDUCTION_PAYLOAD};

/// What a participant does in one reduction round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Hand the accumulator to `to` and retire.
    Send { to: Rank },
    /// Fold in the accumulator of `from`.
    Receive { from: Rank },
    /// Out of the reduction.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Active,
    Retired,
}

/// One participant's side of the recursive-halving reduction.
///
/// Every participant runs its own machine from its rank and the world size
/// alone. Each call to [`next_step`](Self::next_step) halves `active_half`;
/// ranks in the upper half send to `rank - active_half` and retire, ranks in the
/// lower half receive from `rank + active_half`. Halving from the world size
/// keeps that partner below the size.
#[derive(Debug, Clone)]
pub struct ButterflyReducer {
    rank: Rank,
    active_half: usize,
    role: Role,
    round: usize,
}

impl ButterflyReducer {
    pub fn new(rank: Rank, size: usize) -> Self {
        Self {
            rank,
            active_half: size,
            role: Role::Active,
            round: 0,
        }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Rounds entered so far.
    pub fn round(&self) -> usize {
        self.round
    }

    /// Advances to the next round and returns what to do in it.
    pub fn next_step(&mut self) -> Step {
        if self.role == Role::Retired || self.rank >= self.active_half || self.active_half <= 1 {
            return Step::Done;
        }

        self.active_half /= 2;
        self.round += 1;

        if self.rank >= self.active_half {
            self.role = Role::Retired;
            Step::Send { to: self.rank - self.active_half }
        } else {
            Step::Receive { from: self.rank + self.active_half }
        }
    }

    /// Runs the reduction over `comm` starting from this participant's `local` sum.
    ///
    /// Returns the grand total on rank 0 and `None` everywhere else. The caller
    /// is responsible for checking that the schedule for this world size is
    /// complete (see [`ReductionPlan`](super::ReductionPlan)); this method runs it
    /// as written.
    pub fn reduce(mut self, comm: &mut Comm, local: u128) -> RunResult<Option<u128>> {
        let mut accumulator = local;

        loop {
            match self.next_step() {
                Step::Send { to } => {
                    post(comm, to, Message::Reduction(accumulator))?;
                    log::debug!(
                        "Rank {} sent {} to {} in round {} and retired.",
                        self.rank,
                        accumulator,
                        to,
                        self.round
                    );
                }
                Step::Receive { from } => {
                    let envelope = comm.recv(from, REDUCTION_PAYLOAD)?;
                    let value = match envelope.payload {
                        Message::Reduction(value) => value,
                        _ => return Err(unexpected(comm, &envelope, "reduction payload")),
                    };
                    accumulator += value;
                    log::debug!(
                        "Rank {} received {} from {} in round {}, accumulator {}.",
                        self.rank,
                        value,
                        from,
                        self.round,
                        accumulator
                    );
                }
                Step::Done => break,
            }
        }

        Ok((self.rank == 0).then_some(accumulator))
    }
}
