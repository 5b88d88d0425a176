// tally-comm/src/communicator.rs

use std::collections::VecDeque;
use std::fmt;

use crossbeam::channel::{Receiver, Select, Sender, TryRecvError};

use crate::error::CommError;
use crate::tag::{Envelope, Tag};
use crate::Rank;

/// One participant's view of the world: its identity, the peer count, and the
/// channel handles to every peer.
///
/// A communicator is owned by exactly one participant. Receiving takes `&mut self`
/// because messages that arrive under a different tag than the one requested are
/// parked locally until someone asks for them.
pub struct Communicator<M> {
    rank: Rank,
    size: usize,

    /// Outbound channel per destination rank (`None` for our own rank).
    outboxes: Vec<Option<Sender<Envelope<M>>>>,

    /// Inbound channel per source rank (`None` for our own rank).
    inboxes: Vec<Option<Receiver<Envelope<M>>>>,

    /// Messages that arrived ahead of a receive for their tag, per source rank,
    /// in arrival order.
    pending: Vec<VecDeque<Envelope<M>>>,

    /// Sources whose sending side has been dropped.
    disconnected: Vec<bool>,
}

impl<M> fmt::Debug for Communicator<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("pending", &self.pending.iter().map(VecDeque::len).sum::<usize>())
            .finish()
    }
}

impl<M: Send> Communicator<M> {
    pub(crate) fn new(
        rank: Rank,
        size: usize,
        outboxes: Vec<Option<Sender<Envelope<M>>>>,
        inboxes: Vec<Option<Receiver<Envelope<M>>>>,
    ) -> Self {
        Self {
            rank,
            size,
            outboxes,
            inboxes,
            pending: (0..size).map(|_| VecDeque::new()).collect(),
            disconnected: vec![false; size],
        }
    }

    /// This participant's rank.
    #[inline]
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of participants in the world, including this one.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sends `payload` to `dest` under `tag`. Never blocks.
    pub fn send(&self, dest: Rank, tag: Tag, payload: M) -> Result<(), CommError> {
        self.check_peer(dest)?;
        let outbox = self.outboxes[dest]
            .as_ref()
            .ok_or(CommError::SelfMessage(self.rank))?;

        log::trace!("Rank {} -> {} tag {}", self.rank, dest, tag);
        outbox
            .send(Envelope { source: self.rank, tag, payload })
            .map_err(|_| CommError::Disconnected { peer: dest })
    }

    /// Blocks until a message tagged `tag` arrives from `source`.
    pub fn recv(&mut self, source: Rank, tag: Tag) -> Result<Envelope<M>, CommError> {
        self.check_peer(source)?;
        if let Some(envelope) = take_pending(&mut self.pending[source], tag) {
            return Ok(envelope);
        }

        let inbox = self.inboxes[source]
            .as_ref()
            .ok_or(CommError::SelfMessage(self.rank))?;
        loop {
            let envelope = match inbox.recv() {
                Ok(envelope) => envelope,
                Err(_) => {
                    self.disconnected[source] = true;
                    return Err(CommError::Disconnected { peer: source });
                }
            };
            if envelope.tag == tag {
                return Ok(envelope);
            }
            log::trace!("Rank {}: parking tag {} from {}", self.rank, envelope.tag, source);
            self.pending[source].push_back(envelope);
        }
    }

    /// Returns a message tagged `tag` from `source` if one is already available.
    pub fn try_recv(&mut self, source: Rank, tag: Tag) -> Result<Option<Envelope<M>>, CommError> {
        self.check_peer(source)?;
        if let Some(envelope) = take_pending(&mut self.pending[source], tag) {
            return Ok(Some(envelope));
        }

        let inbox = self.inboxes[source]
            .as_ref()
            .ok_or(CommError::SelfMessage(self.rank))?;
        loop {
            match inbox.try_recv() {
                Ok(envelope) if envelope.tag == tag => return Ok(Some(envelope)),
                Ok(envelope) => self.pending[source].push_back(envelope),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    self.disconnected[source] = true;
                    return Err(CommError::Disconnected { peer: source });
                }
            }
        }
    }

    /// Blocks until a message tagged `tag` is available from any peer.
    ///
    /// Parked messages are served first, lowest source rank first. After that the
    /// first channel to become ready wins; no order is promised across peers.
    /// Peers that disconnect are dropped from the wait set, and the call fails
    /// only once every peer is gone.
    pub fn recv_any(&mut self, tag: Tag) -> Result<Envelope<M>, CommError> {
        for queue in self.pending.iter_mut() {
            if let Some(envelope) = take_pending(queue, tag) {
                return Ok(envelope);
            }
        }

        loop {
            let mut select = Select::new();
            let mut registered = Vec::with_capacity(self.size);
            for (source, inbox) in self.inboxes.iter().enumerate() {
                match inbox {
                    Some(inbox) if !self.disconnected[source] => {
                        select.recv(inbox);
                        registered.push((source, inbox));
                    }
                    _ => {}
                }
            }
            if registered.is_empty() {
                return Err(CommError::AllPeersDisconnected(self.rank));
            }

            let operation = select.select();
            let (source, inbox) = registered[operation.index()];
            match operation.recv(inbox) {
                Ok(envelope) if envelope.tag == tag => return Ok(envelope),
                Ok(envelope) => {
                    log::trace!("Rank {}: parking tag {} from {}", self.rank, envelope.tag, source);
                    self.pending[source].push_back(envelope);
                }
                Err(_) => {
                    log::debug!("Rank {}: peer {} disconnected", self.rank, source);
                    self.disconnected[source] = true;
                }
            }
        }
    }

    fn check_peer(&self, peer: Rank) -> Result<(), CommError> {
        if peer >= self.size {
            return Err(CommError::UnknownRank { rank: peer, size: self.size });
        }
        if peer == self.rank {
            return Err(CommError::SelfMessage(self.rank));
        }
        Ok(())
    }
}

fn take_pending<M>(queue: &mut VecDeque<Envelope<M>>, tag: Tag) -> Option<Envelope<M>> {
    let position = queue.iter().position(|envelope| envelope.tag == tag)?;
    queue.remove(position)
}
