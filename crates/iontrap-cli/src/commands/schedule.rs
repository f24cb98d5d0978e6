//! Schedule command implementation.

use std::time::Instant;

use anyhow::Result;
use console::style;
use serde::Serialize;
use tracing::info;

use iontrap_ir::DependencyGraph;
use iontrap_sched::{
    Schedule, SchedulerConfig, Strategy, VerificationReport, scheduler_for, verify,
};

use super::common::{build_workload, load_config, load_sequence, load_trap};

/// Options of the schedule command.
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    /// Named workload, used when no input file is given.
    pub workload: String,
    /// Qubit count of the workload.
    pub qubits: usize,
    /// JSON gate sequence.
    pub input: Option<String>,
    /// JSON trap description.
    pub trap: Option<String>,
    /// YAML scheduler configuration.
    pub config: Option<String>,
    /// Strategy override.
    pub strategy: Option<Strategy>,
    /// Interaction admission bound override.
    pub max_interactions: Option<usize>,
    /// Horizon override.
    pub horizon: Option<usize>,
    /// Largest horizon override.
    pub max_horizon: Option<usize>,
    /// Solver budget override.
    pub time_budget_ms: Option<u64>,
    /// Output format (table, json).
    pub format: String,
    /// Check the schedule before printing it.
    pub verify: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    strategy: &'a str,
    num_qubits: usize,
    schedule: &'a Schedule,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<VerificationReport>,
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn resolve_config(options: &ScheduleOptions) -> Result<SchedulerConfig> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(strategy) = options.strategy {
        config.strategy = strategy;
    }
    if let Some(k) = options.max_interactions {
        config.greedy.max_active_interactions = k;
    }
    if let Some(horizon) = options.horizon {
        config.optimal.horizon = horizon;
    }
    if let Some(max_horizon) = options.max_horizon {
        config.optimal.max_horizon = Some(max_horizon);
    }
    if let Some(budget) = options.time_budget_ms {
        config.optimal.time_budget_ms = budget;
    }
    config.validate()?;
    Ok(config)
}

/// Execute the schedule command.
pub fn execute(options: &ScheduleOptions) -> Result<()> {
    let json = match options.format.to_lowercase().as_str() {
        "table" => false,
        "json" => true,
        other => anyhow::bail!("Unknown format: '{other}'. Available: table, json"),
    };

    let config = resolve_config(options)?;
    let trap = load_trap(options.trap.as_deref())?;
    let (source, num_qubits, sequence) = match &options.input {
        Some(path) => {
            let (n, sequence) = load_sequence(path)?;
            (path.clone(), n, sequence)
        }
        None => (
            options.workload.clone(),
            options.qubits,
            build_workload(&options.workload, options.qubits)?,
        ),
    };

    let graph = DependencyGraph::from_sequence(num_qubits, &sequence)?;
    let scheduler = scheduler_for(&config);

    if !json {
        println!(
            "{} Scheduling {} ({} qubits, {} gates) with {}",
            style("→").cyan().bold(),
            style(&source).green(),
            num_qubits,
            graph.num_units(),
            style(scheduler.name()).yellow()
        );
    }

    let start = Instant::now();
    let schedule = scheduler.build(&graph, &trap)?;
    info!("Scheduled in {:?}", start.elapsed());

    let report = if options.verify {
        Some(verify(&schedule, &graph, &trap)?)
    } else {
        None
    };

    if json {
        let output = JsonOutput {
            strategy: scheduler.name(),
            num_qubits,
            schedule: &schedule,
            report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_table(&schedule);
    println!(
        "{} Schedule complete: {} steps, makespan {}, {} gates, {} hops",
        style("✓").green().bold(),
        schedule.len(),
        schedule.makespan(),
        schedule.fired_gates(),
        schedule.total_hops()
    );
    if report.is_some() {
        println!("  Verified: {}", style("ok").green());
    }
    Ok(())
}

fn print_table(schedule: &Schedule) {
    println!("  {:>5}  {:<40}  events", "step", "positions");
    for step in schedule.steps() {
        let positions = step
            .positions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let events = step
            .events
            .iter()
            .map(|e| format!("{}({:.4}) {}", e.kind, e.angle, e.operands))
            .collect::<Vec<_>>()
            .join("; ");
        println!("  {:>5}  {:<40}  {}", step.index, positions, style(events).cyan());
    }
}
