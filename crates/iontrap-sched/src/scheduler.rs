//! Shared scheduling interface.

use iontrap_ir::DependencyGraph;
use iontrap_lattice::Lattice;

use crate::config::{SchedulerConfig, Strategy};
use crate::error::SchedResult;
use crate::greedy::GreedyRouter;
use crate::optimal::OptimalScheduler;
use crate::schedule::Schedule;

/// A strategy that turns a dependency graph into a schedule on a lattice.
///
/// Both strategies implement this trait, so the same inputs can be run
/// through either one and the results checked with [`crate::verify`].
pub trait Scheduler: Send + Sync {
    /// Get the name of this strategy.
    fn name(&self) -> &str;

    /// Build a schedule for every gate of `graph` on `lattice`.
    fn build(&self, graph: &DependencyGraph, lattice: &dyn Lattice) -> SchedResult<Schedule>;
}

/// Instantiate the strategy selected by `config`.
pub fn scheduler_for(config: &SchedulerConfig) -> Box<dyn Scheduler> {
    match config.strategy {
        Strategy::Greedy => Box::new(GreedyRouter::new(config.greedy.clone())),
        Strategy::Optimal => Box::new(OptimalScheduler::new(config.optimal.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_for_strategy() {
        let config = SchedulerConfig::default();
        assert_eq!(scheduler_for(&config).name(), "greedy");

        let config = config.with_strategy(Strategy::Optimal);
        assert_eq!(scheduler_for(&config).name(), "optimal");
    }
}
