// tally-rt/src/runtime.rs

use std::fmt;
use std::thread::{self, JoinHandle};

use tally_comm::{Rank, World};

use crate::aggregate::expected_total;
use crate::baseline::{collect_static, sequential_sum, static_worker};
use crate::butterfly::{ButterflyReducer, ReductionPlan};
use crate::dynamic::{DispatchProbe, Dispatcher, NoProbe, Worker, WorkerReport};
use crate::error::{RunError, RunResult};
use crate::partition::static_share;
use crate::protocol::{Comm, Message, ROOT_RANK};
use crate::range::SumMethod;

/// How the range is divided and the partial sums combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Rank 0 hands out chunks on demand and collects the results.
    Dynamic,
    /// Fixed equal shares, combined by recursive halving.
    Butterfly,
    /// Fixed worker shares, collected by rank 0 in rank order.
    Static,
    /// Rank 0 alone.
    Sequential,
}

impl Strategy {
    /// Smallest world the strategy can run in.
    pub fn min_participants(self) -> usize {
        match self {
            Strategy::Dynamic | Strategy::Static => 2,
            Strategy::Butterfly | Strategy::Sequential => 1,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Dynamic => "dynamic",
            Strategy::Butterfly => "butterfly",
            Strategy::Static => "static",
            Strategy::Sequential => "sequential",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub strategy: Strategy,
    /// Upper bound of `[1, n]`.
    pub n: u64,
    /// World size, rank 0 included. Ignored by [`Strategy::Sequential`].
    pub participants: usize,
    /// Dynamic strategy only; `None` means four chunks per worker.
    pub granularity: Option<u64>,
    pub method: SumMethod,
}

impl RunConfig {
    pub fn new(strategy: Strategy, n: u64, participants: usize) -> Self {
        Self {
            strategy,
            n,
            participants,
            granularity: None,
            method: SumMethod::default(),
        }
    }

    /// Checks everything that can be checked before a participant is spawned.
    pub fn validate(&self) -> RunResult<()> {
        if self.n == 0 {
            return Err(RunError::InvalidInput("N must be at least 1".to_string()));
        }
        if self.granularity == Some(0) {
            return Err(RunError::InvalidInput(
                "chunk granularity must be at least 1".to_string(),
            ));
        }
        let required = self.strategy.min_participants();
        if self.strategy != Strategy::Sequential && self.participants < required {
            return Err(RunError::InsufficientParticipants {
                required,
                actual: self.participants,
            });
        }
        if self.strategy == Strategy::Butterfly {
            ReductionPlan::verify(self.participants)?;
        }
        Ok(())
    }
}

/// What one rank contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankReport {
    pub rank: Rank,
    /// Chunks or shares this rank summed.
    pub chunks: usize,
    pub subtotal: u128,
}

impl From<WorkerReport> for RankReport {
    fn from(report: WorkerReport) -> Self {
        Self {
            rank: report.rank,
            chunks: report.chunks,
            subtotal: report.subtotal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub strategy: Strategy,
    pub n: u64,
    pub participants: usize,
    pub total: u128,
    /// `n(n+1)/2`.
    pub expected: u128,
    /// Units of work summed across all ranks.
    pub chunks: usize,
    /// One entry per rank, in rank order.
    pub per_rank: Vec<RankReport>,
}

impl RunReport {
    pub fn is_correct(&self) -> bool {
        self.total == self.expected
    }
}

/// Runs `config` to completion.
pub fn run(config: &RunConfig) -> RunResult<RunReport> {
    run_with_probe(config, &mut NoProbe)
}

/// Runs `config`, reporting dispatch progress to `probe`.
///
/// Rank 0 runs on the calling thread, so `probe` never crosses a thread. Every
/// other rank gets its own thread, and all of them are joined before this
/// returns. When several ranks fail, rank 0's error wins.
pub fn run_with_probe(config: &RunConfig, probe: &mut dyn DispatchProbe) -> RunResult<RunReport> {
    config.validate()?;
    log::info!(
        "Starting {} run: N = {}, {} participants.",
        config.strategy,
        config.n,
        config.participants
    );

    let (total, per_rank) = match config.strategy {
        Strategy::Dynamic => run_dynamic(config, probe)?,
        Strategy::Butterfly => run_butterfly(config)?,
        Strategy::Static => run_static(config)?,
        Strategy::Sequential => {
            let total = sequential_sum(config.n, config.method)?;
            let root = RankReport {
                rank: ROOT_RANK,
                chunks: 1,
                subtotal: total,
            };
            (total, vec![root])
        }
    };

    let report = RunReport {
        strategy: config.strategy,
        n: config.n,
        participants: per_rank.len(),
        total,
        expected: expected_total(config.n),
        chunks: per_rank.iter().map(|rank| rank.chunks).sum(),
        per_rank,
    };
    if report.is_correct() {
        log::info!("{} run finished with total {}.", report.strategy, report.total);
    } else {
        log::warn!(
            "{} run finished with total {}, expected {}.",
            report.strategy,
            report.total,
            report.expected
        );
    }
    Ok(report)
}

fn run_dynamic(
    config: &RunConfig,
    probe: &mut dyn DispatchProbe,
) -> RunResult<(u128, Vec<RankReport>)> {
    let mut comms = World::create::<Message>(config.participants)?;
    let root = comms.remove(ROOT_RANK);
    let dispatcher = Dispatcher::new(root, config.n, config.granularity)?;

    let method = config.method;
    let handles = spawn_participants(comms, move |comm| {
        Worker::new(comm, method).run_loop().map(RankReport::from)
    })?;
    let outcome = dispatcher.run(probe);
    let workers = join_participants(handles);

    let dispatch = outcome?;
    let mut per_rank = workers?;
    let root = RankReport {
        rank: ROOT_RANK,
        chunks: 0,
        subtotal: 0,
    };
    per_rank.insert(0, root);

    for report in &per_rank {
        let counted = dispatch.per_worker.get(report.rank).copied().unwrap_or(0);
        if counted != report.chunks {
            return Err(RunError::ResultCountMismatch {
                expected: counted,
                received: report.chunks,
            });
        }
    }
    Ok((dispatch.total, per_rank))
}

fn run_butterfly(config: &RunConfig) -> RunResult<(u128, Vec<RankReport>)> {
    let mut comms = World::create::<Message>(config.participants)?;
    let root = comms.remove(ROOT_RANK);

    let (n, method) = (config.n, config.method);
    let handles = spawn_participants(comms, move |comm| {
        reduce_share(comm, n, method).map(|(report, _)| report)
    })?;
    let outcome = reduce_share(root, n, method);
    let others = join_participants(handles);

    let (root, total) = outcome?;
    let mut per_rank = others?;
    per_rank.insert(0, root);
    // Rank 0 always ends the reduction holding the total.
    Ok((total.unwrap_or(root.subtotal), per_rank))
}

/// Sums this rank's equal share, then takes part in the reduction.
fn reduce_share(
    mut comm: Comm,
    n: u64,
    method: SumMethod,
) -> RunResult<(RankReport, Option<u128>)> {
    let rank = comm.rank();
    let share = static_share(n, comm.size(), rank)?;
    let local = share.map_or(0, |range| range.sum_with(method));
    log::debug!("Rank {}: local sum {}", rank, local);

    let total = ButterflyReducer::new(rank, comm.size()).reduce(&mut comm, local)?;
    let report = RankReport {
        rank,
        chunks: usize::from(share.is_some()),
        subtotal: local,
    };
    Ok((report, total))
}

fn run_static(config: &RunConfig) -> RunResult<(u128, Vec<RankReport>)> {
    let mut comms = World::create::<Message>(config.participants)?;
    let root = comms.remove(ROOT_RANK);

    let method = config.method;
    let handles = spawn_participants(comms, move |comm| {
        static_worker(comm, method).map(|share| RankReport {
            rank: share.rank,
            chunks: usize::from(share.range.is_some()),
            subtotal: share.subtotal,
        })
    })?;
    let outcome = collect_static(root, config.n);
    let workers = join_participants(handles);

    let total = outcome?;
    let mut per_rank = workers?;
    per_rank.insert(
        0,
        RankReport {
            rank: ROOT_RANK,
            chunks: 0,
            subtotal: 0,
        },
    );
    Ok((total, per_rank))
}

type Participant = (Rank, JoinHandle<RunResult<RankReport>>);

/// Starts one named thread per communicator.
///
/// If a spawn fails, the threads already started are left detached; they see
/// their peers disconnect once the remaining communicators are dropped.
fn spawn_participants<F>(comms: Vec<Comm>, body: F) -> RunResult<Vec<Participant>>
where
    F: Fn(Comm) -> RunResult<RankReport> + Clone + Send + 'static,
{
    let mut handles = Vec::with_capacity(comms.len());
    for comm in comms {
        let rank = comm.rank();
        let body = body.clone();
        let handle = thread::Builder::new()
            .name(format!("tally-rank-{}", rank))
            .spawn(move || body(comm))
            .map_err(|e| RunError::SpawnFailed {
                rank,
                reason: e.to_string(),
            })?;
        handles.push((rank, handle));
    }
    log::debug!("Spawned {} participant threads.", handles.len());
    Ok(handles)
}

/// Joins every participant, then reports the first failure by rank.
fn join_participants(handles: Vec<Participant>) -> RunResult<Vec<RankReport>> {
    let outcomes: Vec<RunResult<RankReport>> = handles
        .into_iter()
        .map(|(rank, handle)| {
            handle.join().unwrap_or_else(|_| {
                log::error!("Participant {} panicked.", rank);
                Err(RunError::ParticipantPanicked(rank))
            })
        })
        .collect();
    outcomes.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_happens_before_spawning() {
        let zero = RunConfig::new(Strategy::Dynamic, 0, 4);
        assert!(matches!(zero.validate(), Err(RunError::InvalidInput(_))));

        let lonely = RunConfig::new(Strategy::Static, 10, 1);
        assert_eq!(
            lonely.validate(),
            Err(RunError::InsufficientParticipants {
                required: 2,
                actual: 1
            })
        );

        let mut coarse = RunConfig::new(Strategy::Dynamic, 10, 3);
        coarse.granularity = Some(0);
        assert!(matches!(coarse.validate(), Err(RunError::InvalidInput(_))));

        let empty = RunConfig::new(Strategy::Butterfly, 10, 0);
        assert!(matches!(
            empty.validate(),
            Err(RunError::InsufficientParticipants { .. })
        ));
    }

    #[test]
    fn test_sequential_ignores_participants() -> RunResult<()> {
        let report = run(&RunConfig::new(Strategy::Sequential, 100, 0))?;
        assert_eq!(report.total, 5050);
        assert_eq!(report.participants, 1);
        assert_eq!(report.chunks, 1);
        assert!(report.is_correct());
        Ok(())
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(Strategy::Dynamic.to_string(), "dynamic");
        assert_eq!(Strategy::Sequential.to_string(), "sequential");
        assert_eq!(Strategy::Butterfly.min_participants(), 1);
    }

    #[test]
    fn test_worker_panic_is_reported_with_its_rank() -> RunResult<()> {
        let mut comms = World::create::<Message>(3)?;
        let _root = comms.remove(ROOT_RANK);
        let handles = spawn_participants(comms, |comm| {
            if comm.rank() == 2 {
                panic!("rank 2 gives up");
            }
            Ok(RankReport {
                rank: comm.rank(),
                chunks: 0,
                subtotal: 0,
            })
        })?;
        assert_eq!(
            join_participants(handles),
            Err(RunError::ParticipantPanicked(2))
        );
        Ok(())
    }
}
