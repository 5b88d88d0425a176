use std::fmt;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tally_rt::{DispatchProbe, Rank, RunReport};

const BAR_TEMPLATE: &str = "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} chunks";

/// Times a dynamic dispatch and, when asked to, draws a bar of returned chunks.
#[derive(Default)]
pub struct ProgressProbe {
    show: bool,
    bar: Option<ProgressBar>,
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

impl ProgressProbe {
    pub fn new(show: bool) -> Self {
        Self {
            show,
            ..Self::default()
        }
    }

    /// Time from the first chunk handed out to the last result collected.
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }
}

impl DispatchProbe for ProgressProbe {
    fn dispatch_started(&mut self, chunks: usize) {
        if self.show {
            let style = ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            let bar = ProgressBar::new(chunks as u64);
            bar.set_style(style);
            self.bar = Some(bar);
        }
        self.started = Some(Instant::now());
    }

    fn result_received(&mut self, _worker: Rank, _value: u128) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn results_collected(&mut self, _total: u128) {
        self.elapsed = self.started.map(|started| started.elapsed());
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Human-readable summary of a finished run.
pub struct ReportView<'a> {
    report: &'a RunReport,
    elapsed: Duration,
}

impl<'a> ReportView<'a> {
    pub fn new(report: &'a RunReport, elapsed: Duration) -> Self {
        Self { report, elapsed }
    }
}

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(
            f,
            "{} sum of 1..={} over {} participant(s)",
            report.strategy, report.n, report.participants
        )?;
        writeln!(f, "  total:    {}", report.total)?;
        writeln!(f, "  elapsed:  {:.6}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "  chunks:   {}", report.chunks)?;
        for rank in &report.per_rank {
            writeln!(
                f,
                "    rank {:>3}: {:>6} chunk(s), subtotal {}",
                rank.rank, rank.chunks, rank.subtotal
            )?;
        }
        if report.is_correct() {
            write!(f, "  check:    ok, matches N(N+1)/2 = {}", report.expected)
        } else {
            write!(f, "  check:    MISMATCH, expected {}", report.expected)
        }
    }
}
