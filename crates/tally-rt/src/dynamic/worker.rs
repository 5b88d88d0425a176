// tally-rt/src/dynamic/worker.rs

use tally_comm::Rank;

use crate::error::RunResult;
use crate::protocol::{post, unexpected, Comm, Message, Task, ROOT_RANK, TASK_RANGE};
use crate::range::SumMethod;

/// Where a worker is in its task cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    /// Blocked on the next task from the dispatcher.
    Waiting,
    Computing,
    Sending,
    /// Received the stop marker. Terminal.
    Terminated,
}

/// What a worker did during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub rank: Rank,
    /// Chunks summed and returned.
    pub chunks: usize,
    /// Sum of every value this worker sent back.
    pub subtotal: u128,
}

/// A participant that pulls chunks from the dispatcher until told to stop.
///
/// A worker only ever talks to the dispatcher, and only ever holds one task:
/// it asks for nothing, it simply answers each assignment, and the dispatcher
/// decides whether the answer earns it another chunk or the stop marker.
#[derive(Debug)]
pub struct Worker {
    comm: Comm,
    method: SumMethod,
    state: WorkerState,
    chunks: usize,
    subtotal: u128,
}

impl Worker {
    pub fn new(comm: Comm, method: SumMethod) -> Self {
        Self {
            comm,
            method,
            state: WorkerState::Waiting,
            chunks: 0,
            subtotal: 0,
        }
    }

    pub fn rank(&self) -> Rank {
        self.comm.rank()
    }

    /// The main execution loop for the worker thread.
    ///
    /// Returns once the stop marker arrives. Dropping the worker afterwards
    /// closes its channels.
    pub fn run_loop(mut self) -> RunResult<WorkerReport> {
        log::debug!("Worker {} entering run loop.", self.rank());

        while self.state != WorkerState::Terminated {
            self.step()?;
        }

        log::info!(
            "Worker {} exiting run loop after {} chunks.",
            self.rank(),
            self.chunks
        );
        Ok(WorkerReport {
            rank: self.rank(),
            chunks: self.chunks,
            subtotal: self.subtotal,
        })
    }

    /// Runs one full task cycle: wait, then either terminate or compute and reply.
    fn step(&mut self) -> RunResult<()> {
        self.state = WorkerState::Waiting;
        let envelope = self.comm.recv(ROOT_RANK, TASK_RANGE)?;

        let range = match envelope.payload {
            Message::Task(Task::Range(range)) => range,
            Message::Task(Task::Stop) => {
                log::debug!("Worker {}: received stop marker.", self.rank());
                self.state = WorkerState::Terminated;
                return Ok(());
            }
            _ => return Err(unexpected(&self.comm, &envelope, "task or stop marker")),
        };

        self.state = WorkerState::Computing;
        log::debug!("Worker {}: summing {}", self.rank(), range);
        let value = range.sum_with(self.method);

        self.state = WorkerState::Sending;
        post(&self.comm, ROOT_RANK, Message::Result { range, value })?;
        self.chunks += 1;
        self.subtotal += value;
        Ok(())
    }
}
