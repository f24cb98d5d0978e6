//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use iontrap_lattice::NodeId;

use crate::error::{SchedError, SchedResult};

/// Which scheduling strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Step-by-step greedy router.
    #[default]
    Greedy,
    /// Makespan-optimal MILP scheduler.
    Optimal,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Greedy => write!(f, "greedy"),
            Strategy::Optimal => write!(f, "optimal"),
        }
    }
}

/// Configuration of the greedy router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreedyConfig {
    /// Bound on interactions in flight at once.
    pub max_active_interactions: usize,
    /// Safety bound on the number of time steps.
    pub max_steps: usize,
    /// Blocked steps after which a carrier recomputes its path around
    /// occupied nodes.
    pub replan_after: usize,
    /// Initial node per qubit. Defaults to the first idle nodes.
    pub homes: Option<Vec<NodeId>>,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            max_active_interactions: 1,
            max_steps: 10_000,
            replan_after: 2,
            homes: None,
        }
    }
}

impl GreedyConfig {
    /// Set the interaction admission bound.
    #[must_use]
    pub fn with_max_active_interactions(mut self, k: usize) -> Self {
        self.max_active_interactions = k;
        self
    }

    /// Set the step bound.
    #[must_use]
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    /// Set the replanning threshold.
    #[must_use]
    pub fn with_replan_after(mut self, steps: usize) -> Self {
        self.replan_after = steps;
        self
    }

    /// Set explicit homes.
    #[must_use]
    pub fn with_homes(mut self, homes: Vec<NodeId>) -> Self {
        self.homes = Some(homes);
        self
    }

    /// Reject settings the router cannot run with.
    pub fn validate(&self) -> SchedResult<()> {
        if self.max_active_interactions == 0 {
            return Err(SchedError::Config(
                "max_active_interactions must be at least 1".into(),
            ));
        }
        if self.max_steps == 0 {
            return Err(SchedError::Config("max_steps must be at least 1".into()));
        }
        Ok(())
    }
}

/// Configuration of the optimal scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimalConfig {
    /// First horizon tried, in time steps.
    pub horizon: usize,
    /// Largest horizon tried. `None` means only `horizon`.
    pub max_horizon: Option<usize>,
    /// Horizon increment after an infeasible result.
    pub horizon_step: usize,
    /// Wall-clock budget per solve, in milliseconds.
    pub time_budget_ms: u64,
    /// Initial node per qubit. Defaults to the first idle nodes.
    pub homes: Option<Vec<NodeId>>,
}

impl Default for OptimalConfig {
    fn default() -> Self {
        Self {
            horizon: 12,
            max_horizon: None,
            horizon_step: 4,
            time_budget_ms: 60_000,
            homes: None,
        }
    }
}

impl OptimalConfig {
    /// Set the initial horizon.
    #[must_use]
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Allow the horizon to grow up to `max_horizon`.
    #[must_use]
    pub fn with_max_horizon(mut self, max_horizon: usize) -> Self {
        self.max_horizon = Some(max_horizon);
        self
    }

    /// Set the horizon increment.
    #[must_use]
    pub fn with_horizon_step(mut self, step: usize) -> Self {
        self.horizon_step = step;
        self
    }

    /// Set the solver budget.
    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set explicit homes.
    #[must_use]
    pub fn with_homes(mut self, homes: Vec<NodeId>) -> Self {
        self.homes = Some(homes);
        self
    }

    /// The solver budget.
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    /// Horizons tried in order.
    pub fn horizons(&self) -> Vec<usize> {
        let last = self.max_horizon.unwrap_or(self.horizon).max(self.horizon);
        let step = self.horizon_step.max(1);
        let mut horizons: Vec<usize> = (self.horizon..last).step_by(step).collect();
        if horizons.last() != Some(&last) {
            horizons.push(last);
        }
        horizons
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> SchedResult<()> {
        if self.horizon == 0 {
            return Err(SchedError::Config("horizon must be at least 1".into()));
        }
        if self.time_budget_ms == 0 {
            return Err(SchedError::Config("time_budget_ms must be positive".into()));
        }
        Ok(())
    }
}

/// Strategy choice plus both strategies' settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Strategy to run.
    pub strategy: Strategy,
    /// Greedy router settings.
    pub greedy: GreedyConfig,
    /// Optimal scheduler settings.
    pub optimal: OptimalConfig,
}

impl SchedulerConfig {
    /// Choose the strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Validate the settings of the chosen strategy.
    pub fn validate(&self) -> SchedResult<()> {
        match self.strategy {
            Strategy::Greedy => self.greedy.validate(),
            Strategy::Optimal => self.optimal.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.strategy, Strategy::Greedy);
        assert_eq!(config.greedy.max_active_interactions, 1);
        assert_eq!(config.greedy.max_steps, 10_000);
        assert_eq!(config.optimal.horizon, 12);
        assert_eq!(config.optimal.time_budget(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_horizons() {
        let fixed = OptimalConfig::default().with_horizon(6);
        assert_eq!(fixed.horizons(), vec![6]);

        let growing = OptimalConfig::default()
            .with_horizon(6)
            .with_max_horizon(15)
            .with_horizon_step(4);
        assert_eq!(growing.horizons(), vec![6, 10, 14, 15]);
    }

    #[test]
    fn test_zero_admission_bound_rejected() {
        let config = GreedyConfig::default().with_max_active_interactions(0);
        assert!(matches!(config.validate(), Err(SchedError::Config(_))));
    }
}
