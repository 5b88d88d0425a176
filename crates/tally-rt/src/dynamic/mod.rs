// tally-rt/src/dynamic/mod.rs

//! Pull-based load balancing: rank 0 hands out small chunks, workers return
//! partial sums, and each returned result immediately earns its sender the next
//! chunk. Faster workers come back sooner and so end up summing more chunks.

mod dispatcher;
mod worker;

pub use dispatcher::{DispatchProbe, DispatchReport, Dispatcher, NoProbe, SlotState};
pub use worker::{Worker, WorkerReport};
