use tally_rt::{expected_total, run, ReductionPlan, RunConfig, RunError, RunResult, Strategy, SumMethod};

fn butterfly(n: u64, participants: usize) -> RunConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    RunConfig::new(Strategy::Butterfly, n, participants)
}

#[test]
fn test_ten_over_four_participants() -> RunResult<()> {
    let report = run(&butterfly(10, 4))?;
    assert_eq!(report.total, 55);
    let locals: Vec<u128> = report.per_rank.iter().map(|rank| rank.subtotal).collect();
    assert_eq!(locals, vec![3, 7, 11, 34]);
    Ok(())
}

#[test]
fn test_powers_of_two_reach_the_oracle() -> RunResult<()> {
    for participants in [1, 2, 8, 16] {
        for n in [1, 7, 1000, 123_457] {
            let report = run(&butterfly(n, participants))?;
            assert_eq!(report.total, expected_total(n), "N = {}, P = {}", n, participants);
            assert_eq!(report.participants, participants);
        }
    }
    Ok(())
}

#[test]
fn test_fewer_integers_than_participants() -> RunResult<()> {
    let report = run(&butterfly(3, 8))?;
    assert_eq!(report.total, 6);
    // Only the last rank owns anything.
    assert_eq!(report.chunks, 1);
    assert_eq!(report.per_rank[7].subtotal, 6);
    Ok(())
}

#[test]
fn test_three_participants_are_rejected_before_running() {
    assert_eq!(
        run(&butterfly(10, 3)),
        Err(RunError::IncompleteReduction {
            participants: 3,
            stranded: vec![2],
        })
    );
}

#[test]
fn test_plan_agrees_with_the_driver() {
    for participants in 1..=8 {
        let planned = ReductionPlan::verify(participants).is_ok();
        let ran = run(&butterfly(100, participants)).is_ok();
        assert_eq!(planned, ran, "P = {}", participants);
    }
}

#[test]
fn test_iterative_method_agrees() -> RunResult<()> {
    let mut config = butterfly(50_000, 4);
    config.method = SumMethod::Iterative;
    assert_eq!(run(&config)?.total, expected_total(50_000));
    Ok(())
}
