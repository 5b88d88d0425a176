//! Tally-RT: parallel summation of `1 + 2 + ... + N` over a fixed world of
//! message-passing participants.
//!
//! Two designs sit at the core:
//!
//! - [`dynamic`]: rank 0 splits `[1, N]` into small chunks and hands them out on
//!   demand, so a faster worker ends up summing more of them.
//! - [`butterfly`]: every rank sums an equal share and the partial sums are
//!   combined by recursive halving until rank 0 holds the total.
//!
//! Two baselines ([`baseline`]) run over the same substrate for comparison: a
//! static master/worker split and a sequential sum.
//!
//! [`run`] drives any of them end to end on one thread per participant:
//!
//! ```rust
//! use tally_rt::{run, RunConfig, Strategy};
//!
//! let report = run(&RunConfig::new(Strategy::Dynamic, 20, 3)).unwrap();
//! assert_eq!(report.total, 210);
//! assert!(report.is_correct());
//! ```

pub mod aggregate;
pub mod baseline;
pub mod butterfly;
pub mod dynamic;
pub mod error;
pub mod partition;
pub mod protocol;
pub mod range;
pub mod runtime;

pub use aggregate::{expected_total, Aggregator};
pub use butterfly::ReductionPlan;
pub use dynamic::{DispatchProbe, NoProbe};
pub use error::{RunError, RunResult};
pub use range::{Range, SumMethod};
pub use runtime::{run, run_with_probe, RankReport, RunConfig, RunReport, Strategy};
pub use tally_comm::Rank;
