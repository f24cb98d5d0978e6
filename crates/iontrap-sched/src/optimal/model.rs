//! MILP formulation of the shuttling problem.
//!
//! Variables, for a horizon of `H` steps:
//!
//! - `x[c][n][t]`: carrier `c` occupies node `n` at step `t`
//! - `s[g][t]`: rotation `g` fires at step `t`
//! - `m[g][n][t]`: interaction `g` fires at interaction node `n` at step `t`,
//!   holding both carriers there through `t + 1`
//! - `makespan`: continuous, bounded by every gate's completion step
//!
//! Every carrier starts on its home and rests on an idle node at the last
//! step. The objective is the makespan, with the summed start times as a
//! tie-breaker weighted so that it never trades against a shorter makespan.

use std::sync::atomic::{AtomicBool, Ordering};

use good_lp::{
    Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
    constraint, microlp, variable,
};
use tracing::debug;

use iontrap_ir::GateKind;
use iontrap_lattice::{Lattice, NodeId, NodeKind};

use crate::schedule::{Schedule, ScheduledGate};

/// One logical gate of an instance.
#[derive(Debug, Clone)]
pub(crate) struct Unit {
    pub event: ScheduledGate,
    pub qubits: Vec<usize>,
    pub duration: usize,
    /// Indices of predecessor units.
    pub predecessors: Vec<usize>,
}

/// Owned snapshot of everything the model needs, so a solve can run on its
/// own thread.
#[derive(Debug, Clone)]
pub(crate) struct Instance {
    pub horizon: usize,
    pub kinds: Vec<NodeKind>,
    pub neighbors: Vec<Vec<NodeId>>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub homes: Vec<NodeId>,
    pub units: Vec<Unit>,
}

impl Instance {
    pub fn new(lattice: &dyn Lattice, homes: Vec<NodeId>, units: Vec<Unit>, horizon: usize) -> Self {
        let nodes = lattice.nodes();
        Self {
            horizon,
            kinds: nodes.iter().map(|&n| lattice.kind(n)).collect(),
            neighbors: nodes.iter().map(|&n| lattice.neighbors(n)).collect(),
            edges: lattice.edges(),
            homes,
            units,
        }
    }

    fn interaction_nodes(&self) -> Vec<usize> {
        (0..self.kinds.len())
            .filter(|&n| self.kinds[n] == NodeKind::Interaction)
            .collect()
    }
}

/// Start variables of one unit.
enum Starts {
    /// `s[t]` for every step.
    Rotation(Vec<Variable>),
    /// `(node, m[t])` for every interaction node, `t + 1 < H`.
    Interaction(Vec<(usize, Vec<Variable>)>),
}

impl Starts {
    /// `sum_t t * start[t]`
    fn start_time(&self) -> Expression {
        let mut expr = Expression::with_capacity(0);
        let mut add = |vars: &[Variable]| {
            for (t, &var) in vars.iter().enumerate() {
                expr += (t as f64) * var;
            }
        };
        match self {
            Starts::Rotation(vars) => add(vars.as_slice()),
            Starts::Interaction(by_node) => {
                for (_, vars) in by_node {
                    add(vars.as_slice());
                }
            }
        }
        expr
    }

    /// Sum of every start variable.
    fn total(&self) -> Expression {
        let mut expr = Expression::with_capacity(0);
        match self {
            Starts::Rotation(vars) => vars.iter().for_each(|&v| expr += v),
            Starts::Interaction(by_node) => by_node
                .iter()
                .flat_map(|(_, vars)| vars)
                .for_each(|&v| expr += v),
        }
        expr
    }
}

/// Reported when the caller has stopped waiting for the solve.
const CANCELLED: &str = "solve cancelled";

fn check(cancel: &AtomicBool) -> Result<(), ResolutionError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(ResolutionError::Other(CANCELLED));
    }
    Ok(())
}

/// Build and solve the model for one horizon, giving up between stages once
/// `cancel` is set.
pub(crate) fn solve(instance: &Instance, cancel: &AtomicBool) -> Result<Schedule, ResolutionError> {
    let h = instance.horizon;
    let node_count = instance.kinds.len();
    let carrier_count = instance.homes.len();
    let interaction_nodes = instance.interaction_nodes();

    let has_interaction = instance.units.iter().any(|u| u.event.kind == GateKind::Ms);
    if h == 0 || (has_interaction && (h < 2 || interaction_nodes.is_empty())) {
        return Err(ResolutionError::Infeasible);
    }

    let mut vars = ProblemVariables::new();
    let mut x: Vec<Vec<Vec<Variable>>> = Vec::with_capacity(carrier_count);
    for _ in 0..carrier_count {
        let mut per_node = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            per_node.push(vars.add_vector(variable().binary(), h));
        }
        x.push(per_node);
    }

    let starts: Vec<Starts> = instance
        .units
        .iter()
        .map(|unit| match unit.event.kind {
            GateKind::Ms => Starts::Interaction(
                interaction_nodes
                    .iter()
                    .map(|&n| (n, vars.add_vector(variable().binary(), h - 1)))
                    .collect(),
            ),
            GateKind::Rx | GateKind::Ry => Starts::Rotation(vars.add_vector(variable().binary(), h)),
        })
        .collect();
    let makespan = vars.add(variable().min(0.0).max(h as f64));
    let variable_count = vars.len();

    let start_times: Vec<Expression> = starts.iter().map(Starts::start_time).collect();
    let weight = (instance.units.len() * h + 1) as f64;
    let mut objective = weight * makespan;
    for start in &start_times {
        objective += start.clone();
    }

    let mut constraints: Vec<Constraint> = Vec::new();

    // Placement and movement.
    check(cancel)?;
    for (c, per_node) in x.iter().enumerate() {
        for t in 0..h {
            let mut somewhere = Expression::with_capacity(node_count);
            for vars in per_node {
                somewhere += vars[t];
            }
            constraints.push(constraint!(somewhere == 1));
        }
        constraints.push(constraint!(per_node[instance.homes[c].index()][0] == 1));

        let mut parked = Expression::with_capacity(node_count);
        for n in (0..node_count).filter(|&n| instance.kinds[n] == NodeKind::Idle) {
            parked += per_node[n][h - 1];
        }
        constraints.push(constraint!(parked == 1));

        for t in 0..h.saturating_sub(1) {
            for n in 0..node_count {
                let mut reachable = Expression::from(per_node[n][t]);
                for m in &instance.neighbors[n] {
                    reachable += per_node[m.index()][t];
                }
                constraints.push(constraint!(per_node[n][t + 1] <= reachable));
            }
        }
    }

    check(cancel)?;

    // Capacity. An interaction node takes a second carrier only on the two
    // steps of an interaction firing there, and hosts one interaction at a time.
    for n in 0..node_count {
        for t in 0..h {
            let mut load = Expression::with_capacity(carrier_count);
            for per_node in &x {
                load += per_node[n][t];
            }
            if instance.kinds[n] != NodeKind::Interaction {
                constraints.push(constraint!(load <= 1));
                continue;
            }
            let mut licences = Expression::with_capacity(2 * starts.len());
            for start in &starts {
                if let Starts::Interaction(by_node) = start {
                    for (node, vars) in by_node {
                        if *node != n {
                            continue;
                        }
                        if let Some(&v) = vars.get(t) {
                            licences += v;
                        }
                        if let Some(&v) = t.checked_sub(1).and_then(|prev| vars.get(prev)) {
                            licences += v;
                        }
                    }
                }
            }
            constraints.push(constraint!(load - licences.clone() <= 1));
            constraints.push(constraint!(licences <= 1));
        }
    }

    // Locality and exactly-once.
    for (unit, start) in instance.units.iter().zip(&starts) {
        match start {
            Starts::Rotation(vars) => {
                let carrier = &x[unit.qubits[0]];
                for (t, &fire) in vars.iter().enumerate() {
                    let mut on_standard = Expression::with_capacity(node_count);
                    for n in (0..node_count).filter(|&n| instance.kinds[n] == NodeKind::Standard) {
                        on_standard += carrier[n][t];
                    }
                    constraints.push(constraint!(fire <= on_standard));
                }
            }
            Starts::Interaction(by_node) => {
                for (n, vars) in by_node {
                    for (t, &fire) in vars.iter().enumerate() {
                        for &q in &unit.qubits {
                            constraints.push(constraint!(fire <= x[q][*n][t]));
                            constraints.push(constraint!(fire <= x[q][*n][t + 1]));
                        }
                    }
                }
            }
        }
        constraints.push(constraint!(start.total() == 1));
    }

    // Precedence and makespan.
    for (v, unit) in instance.units.iter().enumerate() {
        for &u in &unit.predecessors {
            let gap = instance.units[u].duration as f64;
            constraints.push(constraint!(start_times[v].clone() >= start_times[u].clone() + gap));
        }
        let end = start_times[v].clone() + unit.duration as f64;
        constraints.push(constraint!(makespan >= end));
    }

    // No two carriers exchange the endpoints of an edge.
    check(cancel)?;
    for &(p, q) in &instance.edges {
        check(cancel)?;
        let (p, q) = (p.index(), q.index());
        for i in 0..carrier_count {
            for j in (i + 1)..carrier_count {
                for t in 0..h.saturating_sub(1) {
                    for (a, b) in [(p, q), (q, p)] {
                        constraints.push(constraint!(
                            x[i][a][t] + x[i][b][t + 1] + x[j][b][t] + x[j][a][t + 1] <= 3
                        ));
                    }
                }
            }
        }
    }

    debug!(
        "MILP model at horizon {h}: {variable_count} variables, {} constraints",
        constraints.len()
    );

    check(cancel)?;
    let mut model = vars.minimise(objective).using(microlp);
    for c in constraints {
        model.add_constraint(c);
    }
    let solution = model.solve()?;

    Ok(extract(instance, &solution, &x, &starts, makespan))
}

fn is_set(solution: &impl Solution, var: Variable) -> bool {
    solution.value(var) > 0.5
}

/// Read positions and events back out of a solution.
///
/// The schedule runs to the first step at or after the makespan where every
/// carrier rests on an idle node, or to the horizon if that never happens.
fn extract(
    instance: &Instance,
    solution: &impl Solution,
    x: &[Vec<Vec<Variable>>],
    starts: &[Starts],
    makespan: Variable,
) -> Schedule {
    let h = instance.horizon;
    let positions: Vec<Vec<NodeId>> = (0..h)
        .map(|t| {
            x.iter()
                .enumerate()
                .map(|(c, per_node)| {
                    per_node
                        .iter()
                        .position(|vars| is_set(solution, vars[t]))
                        .map_or(instance.homes[c], |n| NodeId(n as u32))
                })
                .collect()
        })
        .collect();

    let mut events: Vec<Vec<ScheduledGate>> = vec![Vec::new(); h];
    for (unit, start) in instance.units.iter().zip(starts) {
        let fired = match start {
            Starts::Rotation(vars) => vars.iter().position(|&v| is_set(solution, v)),
            Starts::Interaction(by_node) => by_node
                .iter()
                .find_map(|(_, vars)| vars.iter().position(|&v| is_set(solution, v))),
        };
        if let Some(t) = fired {
            events[t].push(unit.event.clone());
        }
    }
    for step in &mut events {
        step.sort_by_key(|event| event.gate);
    }

    let makespan = solution.value(makespan).round().max(1.0) as usize;
    let all_idle = |t: usize| {
        positions[t]
            .iter()
            .all(|n| instance.kinds[n.index()] == NodeKind::Idle)
    };
    let len = (makespan.min(h)..=h)
        .find(|&len| len == h || all_idle(len - 1))
        .unwrap_or(h);

    let mut schedule = Schedule::new();
    for (step_positions, step_events) in positions.into_iter().zip(events).take(len) {
        schedule.push_step(step_positions, step_events);
    }
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use iontrap_lattice::TrapLattice;

    #[test]
    fn test_cancelled_solve_stops_before_solving() {
        let trap = TrapLattice::line(3);
        let homes = vec![trap.idle_nodes()[0]];
        let instance = Instance::new(&trap, homes, Vec::new(), 4);

        let outcome = solve(&instance, &AtomicBool::new(true));
        assert!(matches!(outcome, Err(ResolutionError::Other(msg)) if msg == CANCELLED));
        assert!(solve(&instance, &AtomicBool::new(false)).is_ok());
    }
}
