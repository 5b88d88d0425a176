use std::thread;

use tally_comm::{Rank, World};
use tally_rt::dynamic::{DispatchProbe, Dispatcher, Worker};
use tally_rt::protocol::{post, Message, Task, ROOT_RANK, TASK_RANGE};
use tally_rt::{expected_total, run, run_with_probe, RunConfig, RunError, RunResult, Strategy, SumMethod};

fn dynamic(n: u64, participants: usize) -> RunConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    RunConfig::new(Strategy::Dynamic, n, participants)
}

#[derive(Default)]
struct Recorder {
    started: Option<usize>,
    results: Vec<(Rank, u128)>,
    collected: Option<u128>,
}

impl DispatchProbe for Recorder {
    fn dispatch_started(&mut self, chunks: usize) {
        self.started = Some(chunks);
    }

    fn result_received(&mut self, worker: Rank, value: u128) {
        self.results.push((worker, value));
    }

    fn results_collected(&mut self, total: u128) {
        self.collected = Some(total);
    }
}

#[test]
fn test_twenty_over_two_workers() -> RunResult<()> {
    let report = run(&dynamic(20, 3))?;
    assert_eq!(report.total, 210);
    assert_eq!(report.chunks, 10);
    assert!(report.is_correct());
    Ok(())
}

#[test]
fn test_hundred_with_twelve_chunks_requested() -> RunResult<()> {
    let mut config = dynamic(100, 4);
    config.granularity = Some(12);
    let report = run(&config)?;

    // Chunks of 8; the thirteenth is the remainder [97, 100].
    assert_eq!(report.chunks, 13);
    assert_eq!(report.total, 5050);
    assert_eq!(report.per_rank.len(), 4);
    assert_eq!(report.per_rank[0].chunks, 0);
    let summed: u128 = report.per_rank.iter().map(|rank| rank.subtotal).sum();
    assert_eq!(summed, 5050);
    Ok(())
}

#[test]
fn test_fewer_integers_than_workers() -> RunResult<()> {
    let report = run(&dynamic(2, 5))?;
    assert_eq!(report.total, 3);
    assert_eq!(report.chunks, 2);
    let idle = report.per_rank[1..].iter().filter(|rank| rank.chunks == 0).count();
    assert_eq!(idle, 2);
    Ok(())
}

#[test]
fn test_iterative_method_agrees() -> RunResult<()> {
    let mut config = dynamic(10_000, 4);
    config.method = SumMethod::Iterative;
    let report = run(&config)?;
    assert_eq!(report.total, expected_total(10_000));
    Ok(())
}

#[test]
fn test_probe_sees_every_result() -> RunResult<()> {
    let mut recorder = Recorder::default();
    let report = run_with_probe(&dynamic(1000, 5), &mut recorder)?;

    assert_eq!(recorder.started, Some(report.chunks));
    assert_eq!(recorder.results.len(), report.chunks);
    assert_eq!(recorder.collected, Some(500_500));
    assert!(recorder.results.iter().all(|(worker, _)| *worker != ROOT_RANK));
    Ok(())
}

#[test]
fn test_rejects_a_world_without_workers() {
    assert_eq!(
        run(&dynamic(10, 1)),
        Err(RunError::InsufficientParticipants {
            required: 2,
            actual: 1
        })
    );
}

#[test]
fn test_slow_worker_gets_a_single_chunk() -> RunResult<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut comms = World::create::<Message>(3)?;
    let fast = comms.pop().expect("rank 2");
    let mut slow = comms.pop().expect("rank 1");
    let root = comms.pop().expect("rank 0");

    let dispatcher = Dispatcher::new(root, 100, Some(10))?;
    let chunks = dispatcher.chunks();
    let dispatch = thread::spawn(move || dispatcher.run(&mut tally_rt::NoProbe));
    let fast = thread::spawn(move || Worker::new(fast, SumMethod::ClosedForm).run_loop());

    let task = slow.recv(ROOT_RANK, TASK_RANGE)?;
    let range = match task.payload {
        Message::Task(Task::Range(range)) => range,
        other => panic!("expected a chunk, got {:?}", other),
    };

    // The fast worker only stops once the queue is empty.
    let fast = fast.join().expect("fast worker")?;
    assert_eq!(fast.chunks, chunks - 1);

    post(
        &slow,
        ROOT_RANK,
        Message::Result {
            range,
            value: range.sum(),
        },
    )?;
    assert_eq!(slow.recv(ROOT_RANK, TASK_RANGE)?.payload, Message::Task(Task::Stop));

    let report = dispatch.join().expect("dispatcher")?;
    assert_eq!(report.total, 5050);
    assert_eq!(report.per_worker, vec![0, 1, chunks - 1]);
    Ok(())
}

#[test]
fn test_silent_exit_of_a_worker_is_a_disconnect() -> RunResult<()> {
    let mut comms = World::create::<Message>(2)?;
    let worker = comms.pop().expect("rank 1");
    let root = comms.pop().expect("rank 0");

    let dispatcher = Dispatcher::new(root, 10, None)?;
    drop(worker);
    assert!(matches!(dispatcher.run(&mut tally_rt::NoProbe), Err(RunError::Comm(_))));
    Ok(())
}
