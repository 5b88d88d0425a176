use std::io;
use std::time::Instant;

use tally_rt::{run_with_probe, RunConfig, RunReport, Strategy};

use crate::config::{MethodSetting, TallyConfig};
use crate::error::CliError;
use crate::io::prompt_for_n;
use crate::report::{ProgressProbe, ReportView};

/// Run options as given on the command line. Anything left out falls back to
/// the config file, then to a built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    pub n: Option<u64>,
    pub participants: Option<usize>,
    pub granularity: Option<u64>,
    pub method: Option<MethodSetting>,
    pub no_progress: bool,
}

/// World size when neither the flags nor the config name one.
pub fn default_participants(strategy: Strategy, cpus: usize) -> usize {
    match strategy {
        Strategy::Sequential => 1,
        // Largest power of two that fits, so the reduction schedule is complete.
        Strategy::Butterfly => 1 << cpus.max(1).ilog2(),
        Strategy::Dynamic | Strategy::Static => cpus.max(2),
    }
}

/// Merges flags over the config file. `read_n` is only called when neither has N.
pub fn resolve<F>(
    strategy: Strategy,
    args: &RunArgs,
    config: &TallyConfig,
    read_n: F,
) -> Result<RunConfig, CliError>
where
    F: FnOnce() -> Result<u64, CliError>,
{
    let n = match args.n.or(config.n) {
        Some(n) => n,
        None => read_n()?,
    };
    let participants = args
        .participants
        .or(config.participants)
        .unwrap_or_else(|| default_participants(strategy, num_cpus::get()));
    let method = args.method.or(config.method).unwrap_or_default();

    let mut run_config = RunConfig::new(strategy, n, participants);
    run_config.method = method.into();
    if strategy == Strategy::Dynamic {
        run_config.granularity = args.granularity.or(config.granularity);
    }
    Ok(run_config)
}

pub fn handle_run(
    strategy: Strategy,
    args: &RunArgs,
    config: &TallyConfig,
) -> Result<RunReport, CliError> {
    let run_config = resolve(strategy, args, config, || {
        prompt_for_n(&mut io::stdin().lock(), &mut io::stdout())
    })?;
    log::debug!("Resolved run configuration: {:?}", run_config);

    let show_progress =
        strategy == Strategy::Dynamic && !args.no_progress && config.progress.unwrap_or(true);
    let mut probe = ProgressProbe::new(show_progress);

    let started = Instant::now();
    let report = run_with_probe(&run_config, &mut probe)?;
    // Dispatch time excludes thread start-up; the other strategies are timed whole.
    let elapsed = probe.elapsed().unwrap_or_else(|| started.elapsed());

    println!("{}", ReportView::new(&report, elapsed));

    if !report.is_correct() {
        return Err(CliError::WrongTotal {
            total: report.total,
            expected: report.expected,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_rt::SumMethod;

    fn never() -> Result<u64, CliError> {
        panic!("N should not be read from stdin")
    }

    #[test]
    fn test_flags_override_the_config() -> Result<(), CliError> {
        let config = TallyConfig {
            n: Some(10),
            participants: Some(8),
            granularity: Some(4),
            method: Some(MethodSetting::Iterative),
            progress: None,
        };
        let args = RunArgs {
            n: Some(20),
            participants: Some(3),
            ..RunArgs::default()
        };
        let resolved = resolve(Strategy::Dynamic, &args, &config, never)?;
        assert_eq!(resolved.n, 20);
        assert_eq!(resolved.participants, 3);
        assert_eq!(resolved.granularity, Some(4));
        assert_eq!(resolved.method, SumMethod::Iterative);
        Ok(())
    }

    #[test]
    fn test_missing_n_is_read() -> Result<(), CliError> {
        let resolved = resolve(
            Strategy::Sequential,
            &RunArgs::default(),
            &TallyConfig::default(),
            || Ok(42),
        )?;
        assert_eq!(resolved.n, 42);
        assert_eq!(resolved.participants, 1);
        Ok(())
    }

    #[test]
    fn test_granularity_only_applies_to_dynamic() -> Result<(), CliError> {
        let args = RunArgs {
            n: Some(5),
            participants: Some(2),
            granularity: Some(7),
            ..RunArgs::default()
        };
        let resolved = resolve(Strategy::Static, &args, &TallyConfig::default(), never)?;
        assert_eq!(resolved.granularity, None);
        Ok(())
    }

    #[test]
    fn test_default_participants() {
        assert_eq!(default_participants(Strategy::Dynamic, 1), 2);
        assert_eq!(default_participants(Strategy::Static, 6), 6);
        assert_eq!(default_participants(Strategy::Butterfly, 6), 4);
        assert_eq!(default_participants(Strategy::Butterfly, 8), 8);
        assert_eq!(default_participants(Strategy::Butterfly, 0), 1);
        assert_eq!(default_participants(Strategy::Sequential, 16), 1);
    }

    #[test]
    fn test_handle_run_reports_a_correct_total() -> Result<(), CliError> {
        let args = RunArgs {
            n: Some(20),
            participants: Some(3),
            no_progress: true,
            ..RunArgs::default()
        };
        let report = handle_run(Strategy::Dynamic, &args, &TallyConfig::default())?;
        assert_eq!(report.total, 210);
        Ok(())
    }
}
