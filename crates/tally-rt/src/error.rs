use tally_comm::{CommError, Rank};
use thiserror::Error;

/// Errors surfaced by a tally run.
///
/// Nothing here is retried. A participant that never answers is not detected
/// either: a blocking receive on a live but silent peer waits forever.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("At least {required} participants are required, got {actual}.")]
    InsufficientParticipants { required: usize, actual: usize },

    /// A task or termination marker showed up where the protocol does not allow it.
    #[error("Protocol violation at participant {rank}: expected {expected}, found {found}.")]
    MalformedTermination {
        rank: Rank,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Dispatcher handed out {expected} chunks but received {received} results.")]
    ResultCountMismatch { expected: usize, received: usize },

    #[error("Butterfly reduction over {participants} participants strands the values sent by ranks {stranded:?}.")]
    IncompleteReduction {
        participants: usize,
        stranded: Vec<Rank>,
    },

    #[error("Communication failure: {0}")]
    Comm(#[from] CommError),

    #[error("Participant {0} panicked.")]
    ParticipantPanicked(Rank),

    #[error("Failed to spawn participant {rank}: {reason}")]
    SpawnFailed { rank: Rank, reason: String },
}

pub type RunResult<T> = Result<T, RunError>;
