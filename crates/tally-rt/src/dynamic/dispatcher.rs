// tally-rt/src/dynamic/dispatcher.rs

use std::collections::VecDeque;

use tally_comm::Rank;

use crate::aggregate::Aggregator;
use crate::error::{RunError, RunResult};
use crate::partition::{dispatch_granularity, partition};
use crate::protocol::{post, unexpected, Comm, Message, Task, ROOT_RANK, TASK_RESULT};
use crate::range::Range;

/// Hooks around a dispatch. Every method defaults to doing nothing.
///
/// `dispatch_started` and `results_collected` bracket the whole exchange and
/// are where an external timer belongs.
pub trait DispatchProbe {
    fn dispatch_started(&mut self, _chunks: usize) {}

    fn result_received(&mut self, _worker: Rank, _value: u128) {}

    fn results_collected(&mut self, _total: u128) {}
}

/// Probe that observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

impl DispatchProbe for NoProbe {}

/// Dispatcher-side view of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Between a received result and the reply to it.
    Idle,
    /// Holding exactly one chunk whose result is still outstanding.
    Assigned(Range),
    /// Sent the stop marker; must not be heard from again.
    Terminated,
}

/// Outcome of a completed dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub total: u128,
    /// Chunks produced by the partitioner.
    pub chunks: usize,
    /// Results received; equal to `chunks` on success.
    pub results: usize,
    /// Chunks completed per rank. Index 0 is the dispatcher and stays 0.
    pub per_worker: Vec<usize>,
}

/// Rank 0 of the dynamic strategy. Owns the chunk queue and feeds whichever
/// worker answers first.
///
/// The queue is only touched from [`Dispatcher::run`]'s sequential loop, popped
/// from the front and never refilled.
#[derive(Debug)]
pub struct Dispatcher {
    comm: Comm,
    queue: VecDeque<Range>,
    chunks: usize,
    dispatched: usize,
    slots: Vec<SlotState>,
    completed: Vec<usize>,
    aggregator: Aggregator,
}

impl Dispatcher {
    /// Partitions `[1, total]` for the workers of `comm`'s world.
    ///
    /// `granularity` defaults to four chunks per worker.
    pub fn new(comm: Comm, total: u64, granularity: Option<u64>) -> RunResult<Self> {
        if comm.rank() != ROOT_RANK {
            return Err(RunError::InvalidInput(format!(
                "the dispatcher must run on rank {}, not {}",
                ROOT_RANK,
                comm.rank()
            )));
        }
        let size = comm.size();
        if size < 2 {
            return Err(RunError::InsufficientParticipants {
                required: 2,
                actual: size,
            });
        }
        let granularity = match granularity {
            Some(granularity) => granularity,
            None => dispatch_granularity(size)?,
        };
        let queue: VecDeque<Range> = partition(total, granularity)?.into();

        Ok(Self {
            comm,
            chunks: queue.len(),
            queue,
            dispatched: 0,
            slots: vec![SlotState::Idle; size],
            completed: vec![0; size],
            aggregator: Aggregator::new(),
        })
    }

    /// Number of chunks this dispatch will hand out.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Current view of every worker's slot; index 0 is unused.
    pub fn slots(&self) -> &[SlotState] {
        &self.slots
    }

    /// Hands out every chunk and collects every result.
    ///
    /// Blocks until done. A worker that stops answering without disconnecting
    /// blocks this call forever.
    pub fn run(mut self, probe: &mut dyn DispatchProbe) -> RunResult<DispatchReport> {
        log::info!(
            "Dispatching {} chunks to {} workers.",
            self.chunks,
            self.comm.size() - 1
        );
        probe.dispatch_started(self.chunks);

        // --- 1. Initial fan-out: every worker gets a chunk or an immediate stop ---
        for worker in 1..self.comm.size() {
            self.refill(worker)?;
        }

        // --- 2. Refill whoever answers first until every chunk is back ---
        while self.aggregator.count() < self.chunks {
            let envelope = self.comm.recv_any(TASK_RESULT)?;
            let worker = envelope.source;
            let (range, value) = match envelope.payload {
                Message::Result { range, value } => (range, value),
                _ => return Err(unexpected(&self.comm, &envelope, "result")),
            };

            match self.slots[worker] {
                SlotState::Assigned(assigned) if assigned == range => {
                    log::debug!("Worker {} returned {} for {}", worker, value, range);
                }
                SlotState::Assigned(assigned) => {
                    // A repeated or stale result; the one for `assigned` is still owed.
                    log::error!(
                        "Worker {} returned a result for {} while holding {}",
                        worker,
                        range,
                        assigned
                    );
                    return Err(RunError::ResultCountMismatch {
                        expected: self.chunks,
                        received: self.aggregator.count() + 1,
                    });
                }
                SlotState::Idle | SlotState::Terminated => {
                    return Err(RunError::MalformedTermination {
                        rank: worker,
                        expected: "no result from a worker without a task",
                        found: "result",
                    });
                }
            }
            self.slots[worker] = SlotState::Idle;
            self.aggregator.add(value);
            self.completed[worker] += 1;
            probe.result_received(worker, value);

            self.refill(worker)?;
        }

        // --- 3. Integrity: nothing assigned, nothing queued, nothing extra in flight ---
        let mut surplus = 0;
        for worker in 1..self.comm.size() {
            while let Ok(Some(envelope)) = self.comm.try_recv(worker, TASK_RESULT) {
                log::error!(
                    "Worker {} sent a {} after its last chunk was collected",
                    worker,
                    envelope.payload.kind()
                );
                surplus += 1;
            }
        }
        let outstanding = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, SlotState::Assigned(_)))
            .count();
        if surplus != 0
            || self.dispatched != self.aggregator.count()
            || outstanding != 0
            || !self.queue.is_empty()
        {
            return Err(RunError::ResultCountMismatch {
                expected: self.chunks,
                received: self.aggregator.count() + surplus,
            });
        }

        let total = self.aggregator.total();
        probe.results_collected(total);
        log::info!("All {} results collected, total {}.", self.chunks, total);

        Ok(DispatchReport {
            total,
            chunks: self.chunks,
            results: self.aggregator.count(),
            per_worker: self.completed,
        })
    }

    /// Answers `worker` with the next chunk, or the stop marker once the queue is dry.
    fn refill(&mut self, worker: Rank) -> RunResult<()> {
        match self.queue.pop_front() {
            Some(range) => {
                post(&self.comm, worker, Message::Task(Task::Range(range)))?;
                self.slots[worker] = SlotState::Assigned(range);
                self.dispatched += 1;
            }
            None => {
                post(&self.comm, worker, Message::Task(Task::Stop))?;
                self.slots[worker] = SlotState::Terminated;
            }
        }
        Ok(())
    }
}
