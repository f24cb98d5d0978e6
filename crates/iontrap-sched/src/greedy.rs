//! Greedy shuttling router.
//!
//! The router simulates the trap one time step at a time. Logical gates move
//! from `pending` (topological order) to `ready` (all predecessors finished,
//! qubits not spoken for) to `active` (being serviced). Each step runs:
//!
//! 1. **Admission**: ready gates become active. Rotations are always
//!    admitted; interactions only while fewer than `K` are in flight.
//! 2. **Advance**: a rotation fires once its carrier stands on a standard
//!    node, after stepping off its idle node or out of an interaction node.
//!    An interaction claims a free interaction node, routes both carriers
//!    there around every other interaction node, fires once both have
//!    arrived and holds them for one more step before releasing the node.
//! 3. **Idle reclamation**: carriers without work return to an idle node,
//!    their own twin if free, otherwise the nearest free one.
//! 4. **Making way**: a carrier that stands where a higher-priority carrier
//!    wants to go, and is not leaving anyway, steps aside.
//! 5. **Tick**: per-step flags are reset and `ready` is replenished by one
//!    scan over `pending`.
//!
//! ## Priority
//!
//! Carriers of active gates rank by admission order, ahead of every carrier
//! without work, which rank by index. Routes of lower-ranked carriers avoid
//! the remaining paths of higher-ranked ones where an alternative exists,
//! and moves are granted in rank order.
//!
//! All moves of a step are decided from the start-of-step positions. A hop
//! into a node that was occupied at the start of the step is refused, so
//! carriers never swap; a refused hop is retried next step, and after
//! `replan_after` refusals the carrier recomputes its path around occupied
//! nodes. A carrier without work that keeps being refused, or whose parking
//! spot has been taken, picks a new spot instead.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, instrument, trace};

use iontrap_ir::{DependencyGraph, GateId, QubitId};
use iontrap_lattice::{Lattice, NodeId, NodeKind};

use crate::carrier::{Carrier, initial_positions};
use crate::config::GreedyConfig;
use crate::error::{SchedError, SchedResult};
use crate::schedule::{Schedule, ScheduledGate};
use crate::scheduler::Scheduler;

/// Step-by-step greedy router.
#[derive(Debug, Clone, Default)]
pub struct GreedyRouter {
    config: GreedyConfig,
}

impl GreedyRouter {
    /// Create a router with the given configuration.
    pub fn new(config: GreedyConfig) -> Self {
        Self { config }
    }

    /// The router configuration.
    pub fn config(&self) -> &GreedyConfig {
        &self.config
    }
}

impl Scheduler for GreedyRouter {
    fn name(&self) -> &str {
        "greedy"
    }

    #[instrument(skip(self, graph, lattice))]
    fn build(&self, graph: &DependencyGraph, lattice: &dyn Lattice) -> SchedResult<Schedule> {
        self.config.validate()?;
        let homes = initial_positions(lattice, graph.num_qubits(), self.config.homes.as_deref())?;
        info!(
            "Routing {} logical gates on {} qubits, at most {} interactions in flight",
            graph.num_units(),
            graph.num_qubits(),
            self.config.max_active_interactions
        );
        Router::new(graph, lattice, &self.config, &homes).run()
    }
}

/// Progress of an active gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Rotation waiting for its carrier to stand on a standard node.
    Rotate,
    /// Interaction waiting for a free interaction node.
    Unclaimed,
    /// Carriers converging on the claimed node.
    Approach(NodeId),
    /// Fired; carriers held at the node for the second step.
    Settle(NodeId),
}

#[derive(Debug, Clone)]
struct ActiveGate {
    unit: GateId,
    qubits: Vec<QubitId>,
    phase: Phase,
}

/// Scratch state of one time step.
struct StepState {
    index: usize,
    occupied: FxHashMap<NodeId, Vec<usize>>,
    intents: Vec<(usize, NodeId)>,
    events: Vec<ScheduledGate>,
}

impl StepState {
    fn new(index: usize, carriers: &[Carrier]) -> Self {
        let mut occupied: FxHashMap<NodeId, Vec<usize>> = FxHashMap::default();
        for (c, carrier) in carriers.iter().enumerate() {
            occupied.entry(carrier.node).or_default().push(c);
        }
        Self {
            index,
            occupied,
            intents: Vec::new(),
            events: Vec::new(),
        }
    }

    fn occupants(&self, node: NodeId) -> &[usize] {
        self.occupied.get(&node).map_or(&[], Vec::as_slice)
    }

    fn is_occupied(&self, node: NodeId) -> bool {
        self.occupied.contains_key(&node)
    }

    fn intend(&mut self, carrier: usize, node: NodeId) {
        self.intents.push((carrier, node));
    }
}

struct Router<'a> {
    graph: &'a DependencyGraph,
    lattice: &'a dyn Lattice,
    config: &'a GreedyConfig,
    carriers: Vec<Carrier>,
    pending: Vec<GateId>,
    ready: Vec<GateId>,
    active: Vec<ActiveGate>,
    finished: Vec<bool>,
    /// Interaction node -> unit holding it.
    claims: FxHashMap<NodeId, GateId>,
    interaction_nodes: Vec<NodeId>,
    impassable: FxHashSet<NodeId>,
    /// Priority of each carrier for the current step, lower first.
    ranks: Vec<usize>,
    schedule: Schedule,
}

impl<'a> Router<'a> {
    fn new(
        graph: &'a DependencyGraph,
        lattice: &'a dyn Lattice,
        config: &'a GreedyConfig,
        homes: &[NodeId],
    ) -> Self {
        let carriers = homes
            .iter()
            .enumerate()
            .map(|(q, &home)| Carrier::new(QubitId(q as u32), home, lattice))
            .collect();
        let interaction_nodes = lattice.interaction_nodes();
        let impassable = interaction_nodes.iter().copied().collect();

        Self {
            graph,
            lattice,
            config,
            carriers,
            pending: graph.units().map(|gate| gate.id).collect(),
            ready: Vec::new(),
            active: Vec::new(),
            finished: vec![false; graph.len()],
            claims: FxHashMap::default(),
            interaction_nodes,
            impassable,
            ranks: (0..homes.len()).collect(),
            schedule: Schedule::new(),
        }
    }

    fn run(mut self) -> SchedResult<Schedule> {
        self.schedule.push_step(self.positions(), Vec::new());
        self.replenish();

        while !self.is_done() {
            if self.schedule.len() > self.config.max_steps {
                return Err(SchedError::StepLimitExceeded {
                    limit: self.config.max_steps,
                    remaining: self.remaining(),
                });
            }
            self.step()?;
        }

        info!(
            "Greedy schedule: {} steps, {} gates fired, makespan {}, {} hops",
            self.schedule.len(),
            self.schedule.fired_gates(),
            self.schedule.makespan(),
            self.schedule.total_hops()
        );
        Ok(self.schedule)
    }

    fn step(&mut self) -> SchedResult<()> {
        let mut step = StepState::new(self.schedule.len(), &self.carriers);

        self.admit(step.index);
        self.rank_carriers();
        self.advance(&mut step)?;
        self.reclaim(&mut step);
        self.make_way(&mut step);
        self.resolve_moves(&mut step);

        self.schedule.push_step(self.positions(), step.events);
        for carrier in &mut self.carriers {
            carrier.busy = false;
        }
        self.replenish();
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.pending.is_empty()
            && self.ready.is_empty()
            && self.active.is_empty()
            && self.carriers.iter().all(|carrier| carrier.idle)
    }

    fn remaining(&self) -> usize {
        self.pending.len() + self.ready.len() + self.active.len()
    }

    fn positions(&self) -> Vec<NodeId> {
        self.carriers.iter().map(|carrier| carrier.node).collect()
    }

    /// Phase 1: promote ready gates to active.
    fn admit(&mut self, t: usize) {
        let graph = self.graph;
        let mut in_flight = self
            .active
            .iter()
            .filter(|gate| gate.phase != Phase::Rotate)
            .count();

        let mut waiting = Vec::new();
        for unit in std::mem::take(&mut self.ready) {
            let gate = &graph[unit];
            if gate.is_interaction() {
                if in_flight >= self.config.max_active_interactions {
                    waiting.push(unit);
                    continue;
                }
                in_flight += 1;
            }
            debug!("Step {t}: admitted {gate}");
            self.active.push(ActiveGate {
                unit,
                qubits: gate.operands.qubits(),
                phase: if gate.is_interaction() {
                    Phase::Unclaimed
                } else {
                    Phase::Rotate
                },
            });
        }
        self.ready = waiting;
    }

    /// Carriers of active gates in admission order, then the rest by index.
    fn rank_carriers(&mut self) {
        let base = self.active.len();
        self.ranks = (0..self.carriers.len()).map(|c| base + c).collect();
        for (rank, gate) in self.active.iter().enumerate() {
            for q in &gate.qubits {
                self.ranks[q.index()] = rank;
            }
        }
    }

    /// Nodes on the remaining paths of carriers ranked above `c`.
    fn protected(&self, c: usize) -> FxHashSet<NodeId> {
        let rank = self.ranks[c];
        self.carriers
            .iter()
            .enumerate()
            .filter(|&(other, _)| self.ranks[other] < rank)
            .flat_map(|(_, carrier)| carrier.path.iter().copied())
            .collect()
    }

    /// Phase 2: move, fire and release active gates in admission order.
    fn advance(&mut self, step: &mut StepState) -> SchedResult<()> {
        let active = std::mem::take(&mut self.active);
        let mut still_active = Vec::with_capacity(active.len());
        for mut gate in active {
            for q in &gate.qubits {
                self.carriers[q.index()].busy = true;
            }
            let done = match gate.phase {
                Phase::Rotate => self.advance_rotation(&gate, step),
                _ => self.advance_interaction(&mut gate, step)?,
            };
            if !done {
                still_active.push(gate);
            }
        }
        self.active = still_active;
        Ok(())
    }

    fn advance_rotation(&mut self, gate: &ActiveGate, step: &mut StepState) -> bool {
        let lattice = self.lattice;
        let c = gate.qubits[0].index();
        let node = self.carriers[c].node;

        match lattice.kind(node) {
            NodeKind::Standard => {
                self.carriers[c].clear_path();
                self.fire(gate.unit, step);
                self.finished[gate.unit.index()] = true;
                true
            }
            NodeKind::Idle => {
                self.carriers[c].clear_path();
                if let Some(twin) = lattice.idle_twin(node) {
                    step.intend(c, twin);
                }
                false
            }
            NodeKind::Interaction => {
                if self.carriers[c].path.is_empty() {
                    let occupied = &step.occupied;
                    let route = lattice.nearest(node, &self.impassable, &|n| {
                        lattice.kind(n) == NodeKind::Standard && !occupied.contains_key(&n)
                    });
                    match route {
                        Some(route) => self.carriers[c].set_route(&route),
                        None => trace!("Step {}: no free standard node near {node}", step.index),
                    }
                }
                self.follow_path(c, step);
                false
            }
        }
    }

    fn advance_interaction(&mut self, gate: &mut ActiveGate, step: &mut StepState) -> SchedResult<bool> {
        let t = step.index;
        let (a, b) = (gate.qubits[0].index(), gate.qubits[1].index());

        match gate.phase {
            Phase::Unclaimed => match self.claim_node(gate.unit, a, b, step)? {
                Some(node) => {
                    debug!("Step {t}: {} claimed interaction node {node}", gate.unit);
                    self.claims.insert(node, gate.unit);
                    gate.phase = Phase::Approach(node);
                }
                None => return Ok(false),
            },
            Phase::Settle(node) => {
                self.finished[gate.unit.index()] = true;
                self.claims.remove(&node);
                self.carriers[a].clear_path();
                self.carriers[b].clear_path();
                debug!("Step {t}: {} released {node}", gate.unit);
                return Ok(true);
            }
            Phase::Approach(_) | Phase::Rotate => {}
        }

        let Phase::Approach(node) = gate.phase else {
            return Ok(false);
        };

        if self.carriers[a].path.is_empty() && self.carriers[b].path.is_empty() {
            let (node_a, node_b) = (self.carriers[a].node, self.carriers[b].node);
            if node_a != node || node_b != node {
                return Err(SchedError::ColocationMismatch {
                    gate: gate.unit,
                    first: gate.qubits[0],
                    first_node: node_a,
                    second: gate.qubits[1],
                    second_node: node_b,
                });
            }
            self.fire(gate.unit, step);
            gate.phase = Phase::Settle(node);
        } else {
            self.follow_path(a, step);
            self.follow_path(b, step);
        }
        Ok(false)
    }

    /// Pick the free interaction node with the fewest foreign occupants,
    /// then the shortest combined route, then the lowest id, and route both
    /// carriers there.
    fn claim_node(
        &mut self,
        unit: GateId,
        a: usize,
        b: usize,
        step: &StepState,
    ) -> SchedResult<Option<NodeId>> {
        let lattice = self.lattice;
        let free: Vec<NodeId> = self
            .interaction_nodes
            .iter()
            .copied()
            .filter(|node| !self.claims.contains_key(node))
            .collect();
        if free.is_empty() {
            trace!("Step {}: {unit} waiting for an interaction node", step.index);
            return Ok(None);
        }

        let (from_a, from_b) = (self.carriers[a].node, self.carriers[b].node);
        let mut best: Option<((usize, usize, NodeId), Vec<NodeId>, Vec<NodeId>)> = None;
        for &node in &free {
            let Some(route_a) = lattice.shortest_path(from_a, node, &self.impassable) else {
                continue;
            };
            let Some(route_b) = lattice.shortest_path(from_b, node, &self.impassable) else {
                continue;
            };
            let foreign = step
                .occupants(node)
                .iter()
                .filter(|&&c| c != a && c != b)
                .count();
            let key = (foreign, route_a.len() + route_b.len(), node);
            if best.as_ref().is_none_or(|(current, ..)| key < *current) {
                best = Some((key, route_a, route_b));
            }
        }

        let Some(((_, _, node), route_a, route_b)) = best else {
            return Err(SchedError::NoPath {
                from: from_a,
                to: free[0],
            });
        };
        self.carriers[a].set_route(&route_a);
        self.carriers[b].set_route(&route_b);
        Ok(Some(node))
    }

    fn fire(&self, unit: GateId, step: &mut StepState) {
        let gate = &self.graph[unit];
        debug!("Step {}: fired {gate}", step.index);
        step.events.push(ScheduledGate::from_gate(gate));
    }

    /// Queue the next hop of a carrier's path, replanning around occupied
    /// nodes once it has been blocked for `replan_after` steps.
    fn follow_path(&mut self, c: usize, step: &mut StepState) {
        if self.carriers[c].stalled >= self.config.replan_after {
            self.replan(c, step);
        }
        if let Some(hop) = self.carriers[c].next_hop() {
            step.intend(c, hop);
        }
    }

    /// Reroute towards the same destination around occupied nodes, keeping
    /// off higher-ranked paths when possible.
    fn replan(&mut self, c: usize, step: &StepState) {
        let lattice = self.lattice;
        let (from, qubit) = (self.carriers[c].node, self.carriers[c].qubit);
        let Some(destination) = self.carriers[c].destination() else {
            return;
        };

        let mut avoid = self.impassable.clone();
        avoid.extend(step.occupied.keys().copied().filter(|&n| n != from));
        let mut strict = avoid.clone();
        strict.extend(self.protected(c));

        let route = lattice
            .shortest_path(from, destination, &strict)
            .or_else(|| lattice.shortest_path(from, destination, &avoid));
        if let Some(route) = route.filter(|route| route.len() > 1) {
            trace!("Step {}: {qubit} replanned towards {destination}", step.index);
            self.carriers[c].set_route(&route);
        }
    }

    /// Phase 3: send carriers without work back to an idle node.
    fn reclaim(&mut self, step: &mut StepState) {
        let lattice = self.lattice;
        let mut reserved: FxHashSet<NodeId> = self
            .carriers
            .iter()
            .filter(|carrier| !carrier.busy)
            .filter_map(Carrier::destination)
            .filter_map(|node| lattice.idle_twin(node))
            .collect();

        for c in 0..self.carriers.len() {
            let carrier = &self.carriers[c];
            if carrier.busy {
                continue;
            }
            let node = carrier.node;
            let moving = match carrier.destination() {
                Some(spot) => {
                    let stuck = carrier.stalled >= self.config.replan_after;
                    let taken = |n: NodeId| step.occupants(n).iter().any(|&o| o != c);
                    let lost = taken(spot) || lattice.idle_twin(spot).is_some_and(taken);
                    if stuck || lost {
                        self.carriers[c].clear_path();
                    }
                    !(stuck || lost)
                }
                None => false,
            };
            match lattice.kind(node) {
                NodeKind::Idle => self.carriers[c].clear_path(),
                _ if moving => self.follow_path(c, step),
                NodeKind::Standard => match lattice.idle_twin(node) {
                    Some(twin) if !step.is_occupied(twin) && !reserved.contains(&twin) => {
                        reserved.insert(twin);
                        step.intend(c, twin);
                    }
                    _ => self.route_to_parking(c, &mut reserved, step),
                },
                NodeKind::Interaction => self.route_to_parking(c, &mut reserved, step),
            }
        }
    }

    fn route_to_parking(&mut self, c: usize, reserved: &mut FxHashSet<NodeId>, step: &mut StepState) {
        let lattice = self.lattice;
        let from = self.carriers[c].node;
        let occupied = &step.occupied;
        let taken: &FxHashSet<NodeId> = reserved;
        let protected = self.protected(c);
        let spot = |n: NodeId, strict: bool| {
            n != from
                && lattice.kind(n) == NodeKind::Standard
                && !occupied.contains_key(&n)
                && !(strict && protected.contains(&n))
                && lattice
                    .idle_twin(n)
                    .is_some_and(|twin| !occupied.contains_key(&twin) && !taken.contains(&twin))
        };

        // Around higher-ranked paths and standing carriers first.
        let mut clear = self.impassable.clone();
        clear.extend(protected.iter().copied());
        let mut crowded = clear.clone();
        crowded.extend(occupied.keys().copied().filter(|&n| n != from));
        let route = lattice
            .nearest(from, &crowded, &|n| spot(n, true))
            .or_else(|| lattice.nearest(from, &clear, &|n| spot(n, true)))
            .or_else(|| lattice.nearest(from, &self.impassable, &|n| spot(n, false)));

        let Some(route) = route else {
            trace!("Step {}: no parking spot for {}", step.index, self.carriers[c].qubit);
            return;
        };
        if let Some(twin) = route.last().and_then(|&n| lattice.idle_twin(n)) {
            reserved.insert(twin);
        }
        self.carriers[c].set_route(&route);
        self.follow_path(c, step);
    }

    /// Phase 4: step aside for higher-ranked carriers.
    ///
    /// A carrier standing on a node that a higher-ranked carrier intends to
    /// enter, and whose own hop (if any) is refused anyway, moves to a free
    /// neighbour off every higher-ranked path, its idle twin first. Carriers
    /// of active gates without a hop are firing or waiting at their
    /// interaction node and stay put.
    fn make_way(&mut self, step: &mut StepState) {
        let lattice = self.lattice;
        let mut wanted: FxHashMap<NodeId, usize> = FxHashMap::default();
        for &(c, target) in &step.intents {
            let rank = self.ranks[c];
            wanted
                .entry(target)
                .and_modify(|best| *best = (*best).min(rank))
                .or_insert(rank);
        }
        let reserved: FxHashSet<NodeId> = self
            .carriers
            .iter()
            .filter_map(Carrier::destination)
            .filter_map(|node| lattice.idle_twin(node))
            .collect();

        let mut order: Vec<usize> = (0..self.carriers.len()).collect();
        order.sort_by_key(|&c| self.ranks[c]);
        for c in order {
            let (node, busy) = (self.carriers[c].node, self.carriers[c].busy);
            if wanted.get(&node).is_none_or(|&rank| rank >= self.ranks[c]) {
                continue;
            }
            let hop = step.intents.iter().find(|&&(o, _)| o == c).map(|&(_, n)| n);
            match hop {
                Some(hop) if !step.is_occupied(hop) => continue,
                None if busy => continue,
                _ => {}
            }

            let protected = self.protected(c);
            let side = lattice
                .idle_twin(node)
                .into_iter()
                .chain(lattice.neighbors(node))
                .find(|&n| {
                    lattice.kind(n) != NodeKind::Interaction
                        && !step.is_occupied(n)
                        && !wanted.contains_key(&n)
                        && !protected.contains(&n)
                        && !reserved.contains(&n)
                });
            let Some(side) = side else {
                continue;
            };

            let mut route = vec![node, side];
            if let Some(destination) = self.carriers[c].destination().filter(|_| busy) {
                let Some(rest) = lattice.shortest_path(side, destination, &self.impassable) else {
                    continue;
                };
                route.extend(rest.into_iter().skip(1));
            }
            trace!("Step {}: {} steps aside to {side}", step.index, self.carriers[c].qubit);
            self.carriers[c].set_route(&route);
            step.intents.retain(|&(o, _)| o != c);
            step.intend(c, side);
            wanted.insert(side, self.ranks[c]);
        }
    }

    /// Grant intents in rank order against the start-of-step occupancy. A
    /// second carrier may enter an interaction node only when both belong
    /// to the interaction holding it.
    fn resolve_moves(&mut self, step: &mut StepState) {
        let lattice = self.lattice;
        let mut intents = std::mem::take(&mut step.intents);
        intents.sort_by_key(|&(c, _)| (self.ranks[c], c));

        let mut granted: FxHashMap<NodeId, Vec<usize>> = FxHashMap::default();
        for (c, target) in intents {
            let mut others: Vec<usize> = step.occupants(target).to_vec();
            if let Some(entered) = granted.get(&target) {
                others.extend(entered);
            }
            others.retain(|&o| o != c);

            if others.is_empty() || self.shares_interaction(target, c, &others) {
                granted.entry(target).or_default().push(c);
                self.carriers[c].move_to(target, lattice);
            } else {
                let carrier = &mut self.carriers[c];
                carrier.stalled += 1;
                trace!(
                    "Step {}: {} blocked at {} -> {target}",
                    step.index, carrier.qubit, carrier.node
                );
            }
        }
    }

    fn shares_interaction(&self, node: NodeId, entrant: usize, others: &[usize]) -> bool {
        let [other] = others else {
            return false;
        };
        self.claims.get(&node).is_some_and(|&unit| {
            let operands = self.graph[unit].operands;
            operands.contains(QubitId(entrant as u32)) && operands.contains(QubitId(*other as u32))
        })
    }

    /// Phase 5: one scan over `pending` in topological order.
    ///
    /// A unit whose qubits are free and whose predecessors have finished
    /// becomes ready. Qubits of every unit seen are claimed for the rest of
    /// the scan, and the scan stops at the first rotation it has to skip.
    fn replenish(&mut self) {
        let graph = self.graph;
        let mut claimed: FxHashSet<QubitId> = self
            .ready
            .iter()
            .copied()
            .chain(self.active.iter().map(|gate| gate.unit))
            .flat_map(|unit| graph.unit_qubits(unit))
            .collect();

        let mut promoted = Vec::new();
        for &unit in &self.pending {
            let qubits = graph.unit_qubits(unit);
            let free = qubits.iter().all(|q| !claimed.contains(q));
            let eligible = free
                && graph
                    .unit_predecessors(unit)
                    .iter()
                    .all(|pred| self.finished[pred.index()]);
            claimed.extend(qubits);

            if eligible {
                promoted.push(unit);
            } else if !graph[unit].is_interaction() {
                break;
            }
        }

        if !promoted.is_empty() {
            self.pending.retain(|unit| !promoted.contains(unit));
            self.ready.extend(promoted);
        }
    }
}
