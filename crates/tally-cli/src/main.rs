use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use miette::IntoDiagnostic;
use tally_rt::Strategy;

mod commands;
mod config;
mod error;
mod io;
mod report;

use commands::plan::handle_plan;
use commands::run::{handle_run, RunArgs};
use config::{MethodSetting, TallyConfig};

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Parallel summation of 1..=N over message-passing participants", long_about = None)]
struct Args {
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    /// Configuration file (defaults to ./tally.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone)]
struct SumArgs {
    /// Upper bound of the range; read from stdin when not given anywhere
    #[arg(short = 'n', value_name = "N")]
    n: Option<u64>,

    /// How each participant sums its range
    #[arg(long, value_enum)]
    method: Option<MethodSetting>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Rank 0 hands out chunks on demand
    Dynamic {
        #[command(flatten)]
        sum: SumArgs,
        /// Participants, rank 0 included
        #[arg(short, long, value_name = "P")]
        participants: Option<usize>,
        /// Chunks to cut the range into (default: 4 per worker)
        #[arg(short, long, value_name = "G")]
        granularity: Option<u64>,
        /// Do not draw a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Equal shares combined by recursive halving
    Butterfly {
        #[command(flatten)]
        sum: SumArgs,
        /// Participants, a power of two
        #[arg(short, long, value_name = "P")]
        participants: Option<usize>,
    },

    /// Fixed worker shares collected by rank 0
    Static {
        #[command(flatten)]
        sum: SumArgs,
        /// Participants, rank 0 included
        #[arg(short, long, value_name = "P")]
        participants: Option<usize>,
    },

    /// One participant, no messages
    Sequential {
        #[command(flatten)]
        sum: SumArgs,
    },

    /// Print the butterfly schedule and check that it is complete
    Plan {
        /// Participants
        #[arg(short, long, value_name = "P")]
        participants: Option<usize>,
    },
}

fn run_args(sum: SumArgs, participants: Option<usize>) -> RunArgs {
    RunArgs {
        n: sum.n,
        participants,
        method: sum.method,
        ..RunArgs::default()
    }
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .parse_default_env()
        .init();

    let cwd = std::env::current_dir().into_diagnostic()?;
    let config = TallyConfig::load(args.config.as_deref(), &cwd)?;

    let (strategy, run) = match args.command {
        Command::Dynamic {
            sum,
            participants,
            granularity,
            no_progress,
        } => {
            let run = RunArgs {
                granularity,
                no_progress,
                ..run_args(sum, participants)
            };
            (Strategy::Dynamic, run)
        }
        Command::Butterfly { sum, participants } => (Strategy::Butterfly, run_args(sum, participants)),
        Command::Static { sum, participants } => (Strategy::Static, run_args(sum, participants)),
        Command::Sequential { sum } => (Strategy::Sequential, run_args(sum, None)),
        Command::Plan { participants } => {
            let participants = participants
                .or(config.participants)
                .unwrap_or_else(num_cpus::get);
            handle_plan(participants)?;
            return Ok(());
        }
    };

    handle_run(strategy, &run, &config)?;
    Ok(())
}
