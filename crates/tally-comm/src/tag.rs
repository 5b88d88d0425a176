use std::fmt;

use crate::Rank;

/// Logical channel label carried by every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub u16);

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A message in flight: who sent it, under which tag, and what it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<M> {
    pub source: Rank,
    pub tag: Tag,
    pub payload: M,
}
