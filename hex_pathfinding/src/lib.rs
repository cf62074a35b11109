use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// A trait for graphs that can be searched.
///
/// `Node`: The type of node identifiers (e.g., a hex coordinate).
/// `Ctx`: A context object passed to passability checks (e.g., the world
/// state plus the civilization doing the searching).
pub trait Graph<Node, Ctx> {
    /// Return the neighbors of a node.
    fn neighbors(&self, node: Node, context: &Ctx) -> Vec<Node>;

    /// Whether the search may expand from `from` into `to`.
    /// This allows dynamic filtering based on the provided context.
    fn passable(&self, from: Node, to: Node, context: &Ctx) -> bool;
}

/// Lifecycle of a [`BoundedBfs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Created, no layer expanded yet. The visited set holds only the start.
    Unstarted,
    /// At least one layer expanded, frontier still non-empty.
    Stepping,
    /// A goal passed to [`BoundedBfs::seek`] was reached.
    Succeeded,
    /// The frontier emptied or the visited-size budget was hit.
    /// A normal terminal outcome, not an error: it means "unreachable
    /// within the search budget". No further expansion will happen.
    Exhausted,
}

/// Breadth-first reachability search with a hard cap on visited nodes.
///
/// The cap exists because an unbounded flood fill across a large map is a
/// performance hazard inside an interactive per-turn loop. Callers size it
/// from known geometry (aerial distance between the endpoints plus padding)
/// instead of scanning the whole map.
///
/// The search is resumable: each [`next_step`](Self::next_step) expands one
/// frontier layer, so callers can interleave it with other work and abandon
/// it at any step boundary by dropping the value.
#[derive(Debug, Clone)]
pub struct BoundedBfs<Node> {
    start: Node,
    max_size: usize,
    state: SearchState,
    /// Visited set doubling as parent pointers. The start maps to itself.
    came_from: HashMap<Node, Node>,
    frontier: VecDeque<Node>,
}

impl<Node: Copy + Eq + Hash> BoundedBfs<Node> {
    /// Create a search rooted at `start`, allowed to visit at most
    /// `max_size` nodes (the start counts).
    pub fn new(start: Node, max_size: usize) -> Self {
        let mut came_from = HashMap::new();
        came_from.insert(start, start);
        let mut frontier = VecDeque::new();
        frontier.push_back(start);
        Self {
            start,
            max_size: max_size.max(1),
            state: SearchState::Unstarted,
            came_from,
            frontier,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn start(&self) -> Node {
        self.start
    }

    /// Number of nodes visited so far.
    pub fn size(&self) -> usize {
        self.came_from.len()
    }

    /// O(1) membership test against the visited set.
    pub fn has_reached(&self, node: Node) -> bool {
        self.came_from.contains_key(&node)
    }

    /// Expand one frontier layer. Terminal states are sticky: calling this
    /// on a `Succeeded` or `Exhausted` search is a no-op.
    pub fn next_step<Ctx, G>(&mut self, graph: &G, context: &Ctx)
    where
        G: Graph<Node, Ctx>,
    {
        match self.state {
            SearchState::Succeeded | SearchState::Exhausted => return,
            SearchState::Unstarted => self.state = SearchState::Stepping,
            SearchState::Stepping => {}
        }

        let layer = self.frontier.len();
        for _ in 0..layer {
            // Frontier is non-empty for exactly `layer` pops.
            let Some(current) = self.frontier.pop_front() else {
                break;
            };
            for neighbor in graph.neighbors(current, context) {
                if self.came_from.contains_key(&neighbor) {
                    continue;
                }
                if !graph.passable(current, neighbor, context) {
                    continue;
                }
                if self.came_from.len() >= self.max_size {
                    // Budget hit: stop permanently rather than finish the layer.
                    self.frontier.clear();
                    self.state = SearchState::Exhausted;
                    return;
                }
                self.came_from.insert(neighbor, current);
                self.frontier.push_back(neighbor);
            }
        }

        if self.frontier.is_empty() {
            self.state = SearchState::Exhausted;
        }
    }

    /// Step until `goal` is reached (`Succeeded`) or the search terminates
    /// without it (`Exhausted`). Returns whether the goal was reached.
    ///
    /// A `Succeeded` search may be seeked again for a new goal: expansion
    /// resumes from the retained frontier, sharing the visited set across
    /// goals. Only `Exhausted` is final.
    pub fn seek<Ctx, G>(&mut self, graph: &G, context: &Ctx, goal: Node) -> bool
    where
        G: Graph<Node, Ctx>,
    {
        loop {
            if self.has_reached(goal) {
                self.state = SearchState::Succeeded;
                return true;
            }
            match self.state {
                SearchState::Exhausted => return false,
                SearchState::Succeeded => self.state = SearchState::Stepping,
                SearchState::Unstarted | SearchState::Stepping => {}
            }
            self.next_step(graph, context);
        }
    }

    /// Reconstruct the route from the start to `node` via parent pointers.
    /// Returns `None` if `node` was never visited.
    pub fn path_to(&self, node: Node) -> Option<Vec<Node>> {
        if !self.has_reached(node) {
            return None;
        }
        let mut path = vec![node];
        let mut curr = node;
        while curr != self.start {
            let prev = self.came_from[&curr];
            path.push(prev);
            curr = prev;
        }
        path.reverse();
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Simple grid graph for testing
    // 0 1 2
    // 3 4 5
    // 6 7 8
    struct GridGraph;

    impl Graph<u32, ()> for GridGraph {
        fn neighbors(&self, node: u32, _context: &()) -> Vec<u32> {
            let mut n = Vec::new();
            let x = node % 3;
            let y = node / 3;

            if x > 0 {
                n.push(node - 1);
            } // Left
            if x < 2 {
                n.push(node + 1);
            } // Right
            if y > 0 {
                n.push(node - 3);
            } // Up
            if y < 2 {
                n.push(node + 3);
            } // Down
            n
        }

        fn passable(&self, _from: u32, _to: u32, _context: &()) -> bool {
            true
        }
    }

    #[test]
    fn test_grid_reachability_and_path() {
        let graph = GridGraph;
        let mut bfs = BoundedBfs::new(0u32, 64);
        assert_eq!(bfs.state(), SearchState::Unstarted);

        assert!(bfs.seek(&graph, &(), 8));
        assert_eq!(bfs.state(), SearchState::Succeeded);

        let path = bfs.path_to(8).unwrap();
        // BFS on a uniform grid finds a shortest path: 4 steps, 5 nodes.
        assert_eq!(path.first(), Some(&0));
        assert_eq!(path.last(), Some(&8));
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_layer_per_step() {
        let graph = GridGraph;
        let mut bfs = BoundedBfs::new(0u32, 64);

        // Layer 1: nodes at distance 1 from the corner (1 and 3).
        bfs.next_step(&graph, &());
        assert_eq!(bfs.state(), SearchState::Stepping);
        assert!(bfs.has_reached(1));
        assert!(bfs.has_reached(3));
        assert!(!bfs.has_reached(4));

        // Layer 2: distance 2 (2, 4, 6).
        bfs.next_step(&graph, &());
        assert!(bfs.has_reached(4));
        assert!(!bfs.has_reached(8));
    }

    #[test]
    fn test_budget_exhaustion() {
        let graph = GridGraph;
        // 9 reachable nodes, budget of 4: must stop at 4 visited, Exhausted.
        let mut bfs = BoundedBfs::new(0u32, 4);
        assert!(!bfs.seek(&graph, &(), 8));
        assert_eq!(bfs.state(), SearchState::Exhausted);
        assert!(bfs.size() <= 4);
        assert!(bfs.path_to(8).is_none());

        // Terminal state is sticky.
        bfs.next_step(&graph, &());
        assert_eq!(bfs.state(), SearchState::Exhausted);
        assert!(bfs.size() <= 4);
    }

    #[test]
    fn test_natural_exhaustion_on_disconnected_goal() {
        // 0 -> 1 only; 2 is disconnected.
        struct TinyGraph;
        impl Graph<u32, ()> for TinyGraph {
            fn neighbors(&self, node: u32, _context: &()) -> Vec<u32> {
                match node {
                    0 => vec![1],
                    1 => vec![0],
                    _ => vec![],
                }
            }
            fn passable(&self, _from: u32, _to: u32, _context: &()) -> bool {
                true
            }
        }

        let mut bfs = BoundedBfs::new(0u32, 100);
        assert!(!bfs.seek(&TinyGraph, &(), 2));
        assert_eq!(bfs.state(), SearchState::Exhausted);
        assert!(bfs.has_reached(1));
    }

    #[test]
    fn test_pass_predicate_blocks_expansion() {
        // Grid with the middle column blocked: 1, 4, 7 impassable.
        struct BlockedGrid;
        impl Graph<u32, ()> for BlockedGrid {
            fn neighbors(&self, node: u32, context: &()) -> Vec<u32> {
                GridGraph.neighbors(node, context)
            }
            fn passable(&self, _from: u32, to: u32, _context: &()) -> bool {
                to % 3 != 1
            }
        }

        let mut bfs = BoundedBfs::new(0u32, 64);
        assert!(!bfs.seek(&BlockedGrid, &(), 2));
        assert!(bfs.has_reached(6));
        assert!(!bfs.has_reached(4));
    }

    #[test]
    fn test_sequential_seeks_share_visited_set() {
        let graph = GridGraph;
        let mut bfs = BoundedBfs::new(0u32, 64);

        assert!(bfs.seek(&graph, &(), 1));
        assert_eq!(bfs.state(), SearchState::Succeeded);
        // A later goal resumes expansion instead of failing outright.
        assert!(bfs.seek(&graph, &(), 8));
        assert_eq!(bfs.state(), SearchState::Succeeded);
        assert_eq!(bfs.path_to(8).unwrap().len(), 5);
    }

    #[test]
    fn test_path_to_start_is_singleton() {
        let bfs = BoundedBfs::new(7u32, 8);
        assert_eq!(bfs.path_to(7), Some(vec![7]));
    }
}
