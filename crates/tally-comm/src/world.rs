// tally-comm/src/world.rs

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::communicator::Communicator;
use crate::error::CommError;
use crate::tag::Envelope;

/// Factory for a fixed group of connected participants.
#[derive(Debug)]
pub struct World;

impl World {
    /// Creates `size` communicators, fully connected by one channel per
    /// ordered pair of distinct participants.
    ///
    /// The returned vector is indexed by rank.
    pub fn create<M: Send>(size: usize) -> Result<Vec<Communicator<M>>, CommError> {
        if size == 0 {
            return Err(CommError::EmptyWorld);
        }

        // outboxes[s][d] sends from s to d, inboxes[d][s] receives at d from s.
        let mut outboxes: Vec<Vec<Option<Sender<Envelope<M>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut inboxes: Vec<Vec<Option<Receiver<Envelope<M>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for source in 0..size {
            for dest in 0..size {
                if source == dest {
                    continue;
                }
                let (tx, rx) = unbounded();
                outboxes[source][dest] = Some(tx);
                inboxes[dest][source] = Some(rx);
            }
        }

        log::debug!("Created world of {} participants ({} channels)", size, size * (size - 1));

        Ok(outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outbox, inbox))| Communicator::new(rank, size, outbox, inbox))
            .collect())
    }
}
