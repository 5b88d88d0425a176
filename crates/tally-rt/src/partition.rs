// tally-rt/src/partition.rs

use tally_comm::Rank;

use crate::error::{RunError, RunResult};
use crate::range::Range;

/// Chunks handed out per worker by the dynamic dispatcher.
pub const CHUNKS_PER_WORKER: u64 = 4;

/// Granularity used by the dispatcher for a world of `participants`
/// (rank 0 dispatches, everyone else works).
pub fn dispatch_granularity(participants: usize) -> RunResult<u64> {
    if participants < 2 {
        return Err(RunError::InsufficientParticipants {
            required: 2,
            actual: participants,
        });
    }
    Ok(CHUNKS_PER_WORKER * (participants as u64 - 1))
}

/// Splits `[1, total]` into consecutive chunks of `max(1, total / granularity)`
/// integers. The last chunk stops at `total`, so it may be shorter.
///
/// The result is a disjoint, gap-free cover of `[1, total]` in ascending order,
/// and identical for identical inputs.
pub fn partition(total: u64, granularity: u64) -> RunResult<Vec<Range>> {
    if total == 0 {
        return Err(RunError::InvalidInput("N must be at least 1".to_string()));
    }
    if granularity == 0 {
        return Err(RunError::InvalidInput(
            "chunk granularity must be at least 1".to_string(),
        ));
    }

    let chunk_len = (total / granularity).max(1);
    let count = total.div_ceil(chunk_len);
    let mut chunks = Vec::new();
    usize::try_from(count)
        .ok()
        .and_then(|count| chunks.try_reserve_exact(count).ok())
        .ok_or_else(|| {
            RunError::InvalidInput(format!(
                "{} chunks of [1, {}] do not fit in memory; use a smaller granularity",
                count, total
            ))
        })?;
    let mut start: u64 = 1;
    loop {
        let end = start.saturating_add(chunk_len - 1).min(total);
        chunks.push(Range::from_bounds(start, end));
        if end == total {
            break;
        }
        start = end + 1;
    }

    log::debug!(
        "Partitioned [1, {}] into {} chunks of length {}",
        total,
        chunks.len(),
        chunk_len
    );
    Ok(chunks)
}

/// Equal share of `[1, total]` owned by `rank` out of `participants`.
///
/// Shares are `total / participants` long and the last rank also takes the
/// remainder. When `total < participants` every rank but the last owns nothing
/// and gets `None`.
pub fn static_share(total: u64, participants: usize, rank: Rank) -> RunResult<Option<Range>> {
    if total == 0 {
        return Err(RunError::InvalidInput("N must be at least 1".to_string()));
    }
    if participants == 0 {
        return Err(RunError::InsufficientParticipants {
            required: 1,
            actual: 0,
        });
    }
    if rank >= participants {
        return Err(RunError::InvalidInput(format!(
            "rank {} is outside a group of {}",
            rank, participants
        )));
    }

    let share = total / participants as u64;
    let start = share * rank as u64 + 1;
    let end = if rank == participants - 1 {
        total
    } else {
        share * (rank as u64 + 1)
    };

    Ok((start <= end).then(|| Range::from_bounds(start, end)))
}

/// Share of a worker in the static master/worker split, where rank 0 only
/// collects and ranks `1..participants` divide the range between them.
pub fn worker_share(total: u64, participants: usize, rank: Rank) -> RunResult<Option<Range>> {
    if participants < 2 {
        return Err(RunError::InsufficientParticipants {
            required: 2,
            actual: participants,
        });
    }
    if rank == 0 {
        return Err(RunError::InvalidInput(
            "rank 0 collects and owns no share".to_string(),
        ));
    }
    static_share(total, participants - 1, rank - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::expected_total;

    fn assert_exact_cover(chunks: &[Range], total: u64) {
        assert_eq!(chunks.first().map(Range::start), Some(1));
        assert_eq!(chunks.last().map(Range::end), Some(total));
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end() + 1, pair[1].start(), "gap or overlap at {}", pair[0]);
        }
    }

    #[test]
    fn test_scenario_a_chunks() -> RunResult<()> {
        // Two workers: granularity 8, chunk length 20 / 8 = 2.
        let chunks = partition(20, dispatch_granularity(3)?)?;
        assert_eq!(chunks.len(), 10);
        assert_eq!(chunks[0], Range::new(1, 2)?);
        assert_eq!(chunks[9], Range::new(19, 20)?);
        assert!(chunks.iter().all(|c| c.len() == 2));
        Ok(())
    }

    #[test]
    fn test_scenario_b_trims_last_chunk() -> RunResult<()> {
        let chunks = partition(100, 12)?;
        assert_eq!(chunks.len(), 13);
        assert!(chunks[..12].iter().all(|c| c.len() == 8));
        assert_eq!(chunks[12], Range::new(97, 100)?);
        Ok(())
    }

    #[test]
    fn test_small_total_collapses_to_singletons() -> RunResult<()> {
        let chunks = partition(5, 8)?;
        assert_eq!(chunks.len(), 5);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.start(), i as u64 + 1);
            assert_eq!(chunk.len(), 1);
        }
        Ok(())
    }

    #[test]
    fn test_cover_and_sum_for_many_inputs() -> RunResult<()> {
        for total in 1..=200u64 {
            for granularity in 1..=17u64 {
                let chunks = partition(total, granularity)?;
                assert_exact_cover(&chunks, total);
                let sum: u128 = chunks.iter().map(Range::sum).sum();
                assert_eq!(sum, expected_total(total), "N={} G={}", total, granularity);
            }
        }
        Ok(())
    }

    #[test]
    fn test_partition_is_deterministic() -> RunResult<()> {
        assert_eq!(partition(12_345, 36)?, partition(12_345, 36)?);
        Ok(())
    }

    #[test]
    fn test_partition_reaches_u64_max() -> RunResult<()> {
        let chunks = partition(u64::MAX, 4)?;
        assert_eq!(chunks.last().map(Range::end), Some(u64::MAX));
        assert_exact_cover(&chunks, u64::MAX);
        Ok(())
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(partition(0, 4), Err(RunError::InvalidInput(_))));
        assert!(matches!(partition(10, 0), Err(RunError::InvalidInput(_))));
        assert!(matches!(
            dispatch_granularity(1),
            Err(RunError::InsufficientParticipants { required: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_unallocatable_chunk_count_is_rejected() {
        assert!(matches!(
            partition(u64::MAX, u64::MAX),
            Err(RunError::InvalidInput(_))
        ));
        assert!(matches!(
            partition(u64::MAX / 2, u64::MAX),
            Err(RunError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_static_shares_for_scenario_c() -> RunResult<()> {
        let sums: Vec<u128> = (0..4)
            .map(|rank| static_share(10, 4, rank).map(|share| share.map_or(0, |r| r.sum())))
            .collect::<RunResult<_>>()?;
        assert_eq!(sums, vec![3, 7, 11, 34]);
        Ok(())
    }

    #[test]
    fn test_static_share_with_fewer_numbers_than_participants() -> RunResult<()> {
        assert_eq!(static_share(3, 4, 0)?, None);
        assert_eq!(static_share(3, 4, 2)?, None);
        assert_eq!(static_share(3, 4, 3)?, Some(Range::new(1, 3)?));
        Ok(())
    }

    #[test]
    fn test_worker_share_skips_the_collector() -> RunResult<()> {
        // Three workers over 10: 3 + 3 + 4.
        assert_eq!(worker_share(10, 4, 1)?, Some(Range::new(1, 3)?));
        assert_eq!(worker_share(10, 4, 2)?, Some(Range::new(4, 6)?));
        assert_eq!(worker_share(10, 4, 3)?, Some(Range::new(7, 10)?));
        assert!(worker_share(10, 4, 0).is_err());
        Ok(())
    }
}
