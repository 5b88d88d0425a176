// tally-rt/src/butterfly/plan.rs

use std::fmt;

use tally_comm::Rank;

use super::reducer::{ButterflyReducer, Step};
use crate::error::{RunError, RunResult};

/// The complete reduction schedule for a world, simulated without any messages.
///
/// Each participant's steps come from the same [`ButterflyReducer`] the real
/// run uses. A send is *matched* when its destination receives from the sender
/// in the same round; a receive is matched when its source sends to the
/// receiver in the same round. An unmatched send strands its value (it never
/// reaches rank 0), an unmatched receive would block forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionPlan {
    participants: usize,
    /// Steps per rank; `steps[rank][i]` happens in round `i + 1`.
    steps: Vec<Vec<Step>>,
    stranded: Vec<Rank>,
    starved: Vec<Rank>,
}

impl ReductionPlan {
    pub fn build(participants: usize) -> Self {
        let steps: Vec<Vec<Step>> = (0..participants)
            .map(|rank| {
                let mut reducer = ButterflyReducer::new(rank, participants);
                std::iter::from_fn(|| match reducer.next_step() {
                    Step::Done => None,
                    step => Some(step),
                })
                .collect()
            })
            .collect();

        let step_at = |rank: Rank, round: usize| steps.get(rank).and_then(|s| s.get(round)).copied();

        let mut stranded = Vec::new();
        let mut starved = Vec::new();
        for (rank, rank_steps) in steps.iter().enumerate() {
            for (round, step) in rank_steps.iter().enumerate() {
                match *step {
                    Step::Send { to } => {
                        if step_at(to, round) != Some(Step::Receive { from: rank }) {
                            stranded.push(rank);
                        }
                    }
                    Step::Receive { from } => {
                        if step_at(from, round) != Some(Step::Send { to: rank }) {
                            starved.push(rank);
                        }
                    }
                    Step::Done => {}
                }
            }
        }

        Self {
            participants,
            steps,
            stranded,
            starved,
        }
    }

    /// Builds the plan and rejects it unless every value reaches rank 0.
    pub fn verify(participants: usize) -> RunResult<Self> {
        if participants == 0 {
            return Err(RunError::InsufficientParticipants {
                required: 1,
                actual: 0,
            });
        }
        let plan = Self::build(participants);
        if !plan.is_complete() {
            log::warn!(
                "Butterfly schedule for {} participants strands {:?} and starves {:?}",
                participants,
                plan.stranded,
                plan.starved
            );
            return Err(RunError::IncompleteReduction {
                participants,
                stranded: plan.stranded,
            });
        }
        Ok(plan)
    }

    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Ranks whose send is never received.
    pub fn stranded(&self) -> &[Rank] {
        &self.stranded
    }

    /// Ranks whose receive is never matched by a send.
    pub fn starved(&self) -> &[Rank] {
        &self.starved
    }

    pub fn is_complete(&self) -> bool {
        self.stranded.is_empty() && self.starved.is_empty()
    }

    /// Number of rounds in the schedule (rank 0's rounds when it is complete).
    pub fn rounds(&self) -> usize {
        self.steps.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn steps(&self, rank: Rank) -> &[Step] {
        self.steps.get(rank).map_or(&[], Vec::as_slice)
    }

    /// Every `(sender, receiver)` transfer of `round` (1-based).
    pub fn transfers(&self, round: usize) -> Vec<(Rank, Rank)> {
        let Some(index) = round.checked_sub(1) else {
            return Vec::new();
        };
        self.steps
            .iter()
            .enumerate()
            .filter_map(|(rank, steps)| match steps.get(index) {
                Some(Step::Send { to }) => Some((rank, *to)),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for ReductionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Butterfly schedule for {} participants", self.participants)?;
        for round in 1..=self.rounds() {
            let transfers: Vec<String> = self
                .transfers(round)
                .into_iter()
                .map(|(from, to)| {
                    let mark = if self.steps(to).get(round - 1) != Some(&Step::Receive { from }) {
                        " (stranded)"
                    } else {
                        ""
                    };
                    format!("{} -> {}{}", from, to, mark)
                })
                .collect();
            writeln!(f, "  round {}: {}", round, transfers.join(", "))?;
        }
        if self.is_complete() {
            write!(f, "  complete: every value reaches rank 0")
        } else {
            write!(
                f,
                "  incomplete: values sent by {:?} never reach rank 0",
                self.stranded
            )
        }
    }
}
