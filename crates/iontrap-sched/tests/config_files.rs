//! Loading scheduler configuration from YAML.

use std::time::Duration;

use iontrap_lattice::NodeId;
use iontrap_sched::{SchedError, SchedulerConfig, Strategy, scheduler_for};

#[test]
fn test_partial_yaml_keeps_defaults() {
    let yaml = r#"
strategy: optimal
optimal:
  horizon: 8
  max_horizon: 16
  time_budget_ms: 5000
"#;
    let config: SchedulerConfig = serde_yaml_ng::from_str(yaml).unwrap();
    assert_eq!(config.strategy, Strategy::Optimal);
    assert_eq!(config.optimal.horizons(), vec![8, 12, 16]);
    assert_eq!(config.optimal.time_budget(), Duration::from_secs(5));
    assert_eq!(config.greedy.max_active_interactions, 1);
    assert!(config.validate().is_ok());
    assert_eq!(scheduler_for(&config).name(), "optimal");
}

#[test]
fn test_homes_from_yaml() {
    let yaml = r#"
greedy:
  max_active_interactions: 2
  homes: [1, 3]
"#;
    let config: SchedulerConfig = serde_yaml_ng::from_str(yaml).unwrap();
    assert_eq!(config.strategy, Strategy::Greedy);
    assert_eq!(config.greedy.homes, Some(vec![NodeId(1), NodeId(3)]));
}

#[test]
fn test_invalid_yaml_values_rejected() {
    let config: SchedulerConfig =
        serde_yaml_ng::from_str("greedy:\n  max_steps: 0\n").unwrap();
    assert!(matches!(config.validate(), Err(SchedError::Config(_))));

    assert!(serde_yaml_ng::from_str::<SchedulerConfig>("strategy: annealing\n").is_err());
}

#[test]
fn test_yaml_round_trip() {
    let config = SchedulerConfig::default().with_strategy(Strategy::Optimal);
    let text = serde_yaml_ng::to_string(&config).unwrap();
    let back: SchedulerConfig = serde_yaml_ng::from_str(&text).unwrap();
    assert_eq!(back, config);
}
