//! Wire protocol shared by every strategy.

use tally_comm::{Communicator, Envelope, Rank, Tag};

use crate::error::{RunError, RunResult};
use crate::range::Range;

/// Dispatcher to worker: a chunk assignment or the termination marker.
pub const TASK_RANGE: Tag = Tag(1);
/// Participant to participant: butterfly round exchange.
pub const REDUCTION_PAYLOAD: Tag = Tag(2);
/// Worker to dispatcher: a completed partial sum.
pub const TASK_RESULT: Tag = Tag(3);
/// Collector to worker in the static split: the problem size.
pub const PROBLEM_SIZE: Tag = Tag(4);

/// Rank that dispatches or collects in the master/worker strategies.
pub const ROOT_RANK: Rank = 0;

/// Work handed to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Range(Range),
    /// No more work; the worker must exit without replying.
    Stop,
}

/// Everything that travels between participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Task(Task),
    /// A worker's sum of the chunk it was assigned.
    Result { range: Range, value: u128 },
    /// A static-split worker's sum of its whole share.
    Subtotal(u128),
    Reduction(u128),
    ProblemSize(u64),
}

impl Message {
    /// The tag this message always travels under.
    pub fn tag(&self) -> Tag {
        match self {
            Message::Task(_) => TASK_RANGE,
            Message::Result { .. } | Message::Subtotal(_) => TASK_RESULT,
            Message::Reduction(_) => REDUCTION_PAYLOAD,
            Message::ProblemSize(_) => PROBLEM_SIZE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Task(Task::Range(_)) => "task",
            Message::Task(Task::Stop) => "stop marker",
            Message::Result { .. } => "result",
            Message::Subtotal(_) => "subtotal",
            Message::Reduction(_) => "reduction payload",
            Message::ProblemSize(_) => "problem size",
        }
    }
}

pub type Comm = Communicator<Message>;

/// Sends `message` to `dest` under the message's own tag.
pub fn post(comm: &Comm, dest: Rank, message: Message) -> RunResult<()> {
    log::debug!("Rank {} -> {}: {}", comm.rank(), dest, message.kind());
    comm.send(dest, message.tag(), message)?;
    Ok(())
}

/// Builds the error for a payload that does not belong where it arrived.
pub(crate) fn unexpected(
    comm: &Comm,
    envelope: &Envelope<Message>,
    expected: &'static str,
) -> RunError {
    log::error!(
        "Rank {}: expected {} from {}, got {}",
        comm.rank(),
        expected,
        envelope.source,
        envelope.payload.kind()
    );
    RunError::MalformedTermination {
        rank: comm.rank(),
        expected,
        found: envelope.payload.kind(),
    }
}
