//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - shuttling schedules for trapped-ion lattices",
        style("iontrap").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  iontrap-ir       Native gates and dependency graph");
    println!("  iontrap-lattice  Trap lattice and routing queries");
    println!("  iontrap-sched    Greedy and optimal schedulers, verifier");
    println!("  iontrap-cli      Command-line interface");
}
