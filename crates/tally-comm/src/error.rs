use thiserror::Error;

use crate::Rank;

/// Errors raised by the message-passing substrate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommError {
    #[error("a world needs at least one participant")]
    EmptyWorld,

    #[error("rank {rank} is outside a world of {size} participants")]
    UnknownRank { rank: Rank, size: usize },

    #[error("participant {0} cannot exchange messages with itself")]
    SelfMessage(Rank),

    /// The peer dropped its communicator and nothing matching is left in flight.
    #[error("channel to participant {peer} is disconnected")]
    Disconnected { peer: Rank },

    #[error("every peer of participant {0} has disconnected")]
    AllPeersDisconnected(Rank),
}
