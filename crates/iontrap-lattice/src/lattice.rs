//! The read-only lattice capability used by schedulers.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::node::{LatticeNode, NodeId, NodeKind, Site};

/// Read-only view of a trap lattice.
///
/// Node ids are dense: every id in `0..node_count()` is a node. Schedulers
/// only need the required methods; the provided ones are derived from them.
pub trait Lattice: Send + Sync {
    /// Number of nodes.
    fn node_count(&self) -> usize;

    /// Site and type of a node, or `None` for unknown ids.
    fn node(&self, id: NodeId) -> Option<LatticeNode>;

    /// Neighbours of a node in ascending id order.
    fn neighbors(&self, id: NodeId) -> Vec<NodeId>;

    /// The idle twin of a standard node, or the standard node of an idle one.
    fn idle_twin(&self, id: NodeId) -> Option<NodeId>;

    /// Type of a node. Unknown ids report [`NodeKind::Standard`].
    fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).map_or(NodeKind::Standard, |node| node.kind)
    }

    /// Grid coordinate of a node.
    fn site(&self, id: NodeId) -> Option<Site> {
        self.node(id).map(|node| node.site)
    }

    /// All node ids.
    fn nodes(&self) -> Vec<NodeId> {
        (0..self.node_count() as u32).map(NodeId).collect()
    }

    /// Nodes of one type, ascending.
    fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes()
            .into_iter()
            .filter(|&id| self.kind(id) == kind)
            .collect()
    }

    /// Interaction nodes, ascending.
    fn interaction_nodes(&self) -> Vec<NodeId> {
        self.nodes_of_kind(NodeKind::Interaction)
    }

    /// Idle nodes, ascending.
    fn idle_nodes(&self) -> Vec<NodeId> {
        self.nodes_of_kind(NodeKind::Idle)
    }

    /// Check if two nodes share an edge.
    fn is_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Undirected edges as `(low, high)` pairs, ascending.
    fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.nodes()
            .into_iter()
            .flat_map(|a| {
                self.neighbors(a)
                    .into_iter()
                    .filter(move |&b| a < b)
                    .map(move |b| (a, b))
            })
            .collect()
    }

    /// Shortest path from `from` to `to`, both endpoints included.
    ///
    /// Nodes in `impassable` are never entered, except `to` itself; `from` is
    /// always a valid start. Neighbours are explored in ascending id order, so
    /// among equally short paths the result is deterministic.
    fn shortest_path(
        &self,
        from: NodeId,
        to: NodeId,
        impassable: &FxHashSet<NodeId>,
    ) -> Option<Vec<NodeId>> {
        if to.index() >= self.node_count() {
            return None;
        }
        self.nearest(from, impassable, &|node| node == to)
    }

    /// Shortest path from `from` to the closest node accepted by `goal`.
    ///
    /// Goal nodes are never impassable. Ties between equally close goals go
    /// to the one discovered first in ascending-neighbour BFS order.
    fn nearest(
        &self,
        from: NodeId,
        impassable: &FxHashSet<NodeId>,
        goal: &dyn Fn(NodeId) -> bool,
    ) -> Option<Vec<NodeId>> {
        let count = self.node_count();
        if from.index() >= count {
            return None;
        }
        if goal(from) {
            return Some(vec![from]);
        }

        let mut parent: Vec<Option<NodeId>> = vec![None; count];
        let mut visited = vec![false; count];
        let mut queue = VecDeque::new();
        visited[from.index()] = true;
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for neighbor in self.neighbors(current) {
                if visited[neighbor.index()] {
                    continue;
                }
                let is_goal = goal(neighbor);
                if !is_goal && impassable.contains(&neighbor) {
                    continue;
                }
                visited[neighbor.index()] = true;
                parent[neighbor.index()] = Some(current);

                if is_goal {
                    let mut path = vec![neighbor];
                    let mut node = neighbor;
                    while let Some(prev) = parent[node.index()] {
                        path.push(prev);
                        node = prev;
                    }
                    path.reverse();
                    return Some(path);
                }

                queue.push_back(neighbor);
            }
        }

        None
    }

    /// Hop distance between two nodes, ignoring occupancy.
    fn distance(&self, from: NodeId, to: NodeId) -> Option<usize> {
        self.shortest_path(from, to, &FxHashSet::default())
            .map(|path| path.len() - 1)
    }
}
