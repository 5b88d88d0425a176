//! Tally-Comm: point-to-point message passing for a fixed group of participants.
//!
//! A [`World`] of `size` participants is created once. Each participant gets its
//! own [`Communicator`], which it owns exclusively and moves onto its thread.
//! There is no shared mutable state between participants: everything they know
//! about each other arrives as an [`Envelope`].
//!
//! # Channels
//!
//! Every ordered pair `(sender, receiver)` has its own unbounded channel, so
//! sends never block. Messages carry a [`Tag`]; a receive names the tag it is
//! waiting for and any other message that arrives first is parked in a per-peer
//! pending buffer. This keeps ordering intact per `(sender, receiver, tag)`.
//!
//! # Receiving from any peer
//!
//! [`Communicator::recv_any`] blocks until a message with the requested tag is
//! available from *any* peer and reports which peer it came from. It is an
//! explicit wait-any over the fixed set of inbound channels.
//!
//! # Usage
//!
//! ```rust
//! use tally_comm::{Tag, World};
//!
//! let mut comms = World::create::<u64>(2).unwrap();
//! let mut second = comms.pop().unwrap();
//! let first = comms.pop().unwrap();
//!
//! first.send(1, Tag(7), 42).unwrap();
//! let envelope = second.recv(0, Tag(7)).unwrap();
//! assert_eq!((envelope.source, envelope.payload), (0, 42));
//! ```

mod communicator;
mod error;
mod tag;
mod world;

pub use communicator::Communicator;
pub use error::CommError;
pub use tag::{Envelope, Tag};
pub use world::World;

/// Index of a participant within its world, in `0..size`.
pub type Rank = usize;
