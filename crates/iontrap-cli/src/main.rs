//! iontrap Command-Line Interface
//!
//! Builds a native gate workload, schedules it on a trap lattice with the
//! greedy or optimal strategy, and prints the result.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use iontrap_sched::Strategy;

mod commands;

use commands::schedule::ScheduleOptions;
use commands::{lattice, schedule, version};

/// iontrap - shuttling and execution schedules for trapped-ion lattices
#[derive(Parser)]
#[command(name = "iontrap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a gate sequence on a trap
    Schedule {
        /// Built-in workload (qft)
        #[arg(short, long, default_value = "qft")]
        workload: String,

        /// Number of qubits for the workload
        #[arg(short, long, default_value = "4")]
        qubits: usize,

        /// JSON gate sequence (overrides the workload)
        #[arg(short, long)]
        input: Option<String>,

        /// JSON trap description (defaults to the Penning trap)
        #[arg(long)]
        trap: Option<String>,

        /// YAML scheduler configuration
        #[arg(short, long)]
        config: Option<String>,

        /// Strategy (greedy, optimal)
        #[arg(short, long, value_parser = parse_strategy)]
        strategy: Option<Strategy>,

        /// Interactions in flight at once (greedy)
        #[arg(long)]
        max_interactions: Option<usize>,

        /// Initial horizon in time steps (optimal)
        #[arg(long)]
        horizon: Option<usize>,

        /// Largest horizon to try (optimal)
        #[arg(long)]
        max_horizon: Option<usize>,

        /// Solver budget per horizon in milliseconds (optimal)
        #[arg(long, env = "IONTRAP_TIME_BUDGET_MS")]
        time_budget_ms: Option<u64>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Verify the schedule before printing it
        #[arg(long)]
        verify: bool,
    },

    /// Show the trap lattice
    Lattice {
        /// JSON trap description (defaults to the Penning trap)
        #[arg(long)]
        trap: Option<String>,
    },

    /// Show version information
    Version,
}

fn parse_strategy(value: &str) -> Result<Strategy, String> {
    match value.to_lowercase().as_str() {
        "greedy" => Ok(Strategy::Greedy),
        "optimal" => Ok(Strategy::Optimal),
        other => Err(format!("unknown strategy '{other}' (greedy, optimal)")),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Schedule {
            workload,
            qubits,
            input,
            trap,
            config,
            strategy,
            max_interactions,
            horizon,
            max_horizon,
            time_budget_ms,
            format,
            verify,
        } => schedule::execute(&ScheduleOptions {
            workload,
            qubits,
            input,
            trap,
            config,
            strategy,
            max_interactions,
            horizon,
            max_horizon,
            time_budget_ms,
            format,
            verify,
        }),

        Commands::Lattice { trap } => lattice::execute(trap.as_deref()),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schedule_defaults() {
        let cli = Cli::try_parse_from(["iontrap", "schedule"]).unwrap();
        match cli.command {
            Commands::Schedule {
                workload,
                qubits,
                strategy,
                format,
                verify,
                ..
            } => {
                assert_eq!(workload, "qft");
                assert_eq!(qubits, 4);
                assert_eq!(strategy, None);
                assert_eq!(format, "table");
                assert!(!verify);
            }
            _ => panic!("expected schedule command"),
        }
    }

    #[test]
    fn test_parse_schedule_overrides() {
        let cli = Cli::try_parse_from([
            "iontrap",
            "-vv",
            "schedule",
            "--strategy",
            "optimal",
            "--horizon",
            "8",
            "--max-interactions",
            "2",
            "--format",
            "json",
            "--verify",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Schedule {
                strategy,
                horizon,
                max_interactions,
                verify,
                ..
            } => {
                assert_eq!(strategy, Some(Strategy::Optimal));
                assert_eq!(horizon, Some(8));
                assert_eq!(max_interactions, Some(2));
                assert!(verify);
            }
            _ => panic!("expected schedule command"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_strategy() {
        assert!(Cli::try_parse_from(["iontrap", "schedule", "-s", "annealing"]).is_err());
    }

    #[test]
    fn test_parse_lattice_and_version() {
        assert!(matches!(
            Cli::try_parse_from(["iontrap", "lattice"]).unwrap().command,
            Commands::Lattice { trap: None }
        ));
        assert!(matches!(
            Cli::try_parse_from(["iontrap", "version"]).unwrap().command,
            Commands::Version
        ));
    }
}
