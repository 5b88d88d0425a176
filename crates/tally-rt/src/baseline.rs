// tally-rt/src/baseline.rs

//! Reference strategies the load-balanced and butterfly paths are measured
//! against: a fixed master/worker split and a single-participant sum.

use tally_comm::Rank;

use crate::aggregate::Aggregator;
use crate::error::{RunError, RunResult};
use crate::partition::worker_share;
use crate::protocol::{post, unexpected, Comm, Message, PROBLEM_SIZE, ROOT_RANK, TASK_RESULT};
use crate::range::{Range, SumMethod};

/// What one participant of the static split summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticShare {
    pub rank: Rank,
    pub range: Option<Range>,
    pub subtotal: u128,
}

/// Rank 0 of the static split: announces `total` to every worker, then waits
/// for each worker's subtotal in rank order.
///
/// Collecting in rank order means a slow low-numbered worker holds up the
/// whole collection even when the others are done.
pub fn collect_static(mut comm: Comm, total: u64) -> RunResult<u128> {
    if comm.rank() != ROOT_RANK {
        return Err(RunError::InvalidInput(format!(
            "the static collector must run on rank {}, not {}",
            ROOT_RANK,
            comm.rank()
        )));
    }
    if comm.size() < 2 {
        return Err(RunError::InsufficientParticipants {
            required: 2,
            actual: comm.size(),
        });
    }

    for worker in 1..comm.size() {
        post(&comm, worker, Message::ProblemSize(total))?;
    }

    let mut aggregator = Aggregator::new();
    for worker in 1..comm.size() {
        let envelope = comm.recv(worker, TASK_RESULT)?;
        match envelope.payload {
            Message::Subtotal(value) => {
                log::debug!("Collected {} from worker {}", value, worker);
                aggregator.add(value);
            }
            _ => return Err(unexpected(&comm, &envelope, "subtotal")),
        }
    }

    log::info!(
        "Static split collected {} subtotals, total {}.",
        aggregator.count(),
        aggregator.total()
    );
    Ok(aggregator.total())
}

/// A worker of the static split. Always answers, with 0 when its share is empty.
pub fn static_worker(mut comm: Comm, method: SumMethod) -> RunResult<StaticShare> {
    let envelope = comm.recv(ROOT_RANK, PROBLEM_SIZE)?;
    let total = match envelope.payload {
        Message::ProblemSize(total) => total,
        _ => return Err(unexpected(&comm, &envelope, "problem size")),
    };

    let range = worker_share(total, comm.size(), comm.rank())?;
    let subtotal = range.map_or(0, |range| range.sum_with(method));
    match range {
        Some(range) => log::debug!("Worker {}: {} sums to {}", comm.rank(), range, subtotal),
        None => log::debug!("Worker {}: empty share", comm.rank()),
    }

    post(&comm, ROOT_RANK, Message::Subtotal(subtotal))?;
    Ok(StaticShare {
        rank: comm.rank(),
        range,
        subtotal,
    })
}

/// `1 + ... + total` on the calling thread.
pub fn sequential_sum(total: u64, method: SumMethod) -> RunResult<u128> {
    let range = Range::new(1, total)?;
    Ok(range.sum_with(method))
}
