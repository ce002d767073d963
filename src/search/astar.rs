//! Generic best-first (A*) search.
//!
//! The search is parameterised by three closures: an exit condition, a
//! neighbor generator and a heuristic. The neighbor generator returns the
//! *tentative g-score* of each neighbor, not the edge cost, and can read the
//! search state (closed set, g-scores) so it may prune already-finalized
//! nodes itself.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::hash::Hash;

use log::{debug, trace};

/// A node of the search space. Nodes with equal keys are the same state.
pub trait SearchNode {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> Self::Key;
}

/// Search tuning shared by every planner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AStarConfig {
    /// Weight on the heuristic; 1.0 keeps A* optimal, larger values trade
    /// optimality for fewer expansions.
    pub heuristic_weight: f32,
    /// Stop after this many expansions. `None` searches exhaustively.
    pub max_expansions: Option<usize>,
}

impl Default for AStarConfig {
    fn default() -> Self {
        Self {
            heuristic_weight: 1.0,
            max_expansions: None,
        }
    }
}

struct OpenEntry<K> {
    f_score: f32,
    g_score: f32,
    order: u64,
    key: K,
}

impl<K> PartialEq for OpenEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K> Eq for OpenEntry<K> {}

impl<K> Ord for OpenEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior; ties go to the oldest entry.
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl<K> PartialOrd for OpenEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bookkeeping visible to neighbor generators while the search runs.
pub struct SearchState<N: SearchNode> {
    nodes: HashMap<N::Key, N>,
    came_from: HashMap<N::Key, N::Key>,
    g_scores: HashMap<N::Key, f32>,
    close_set: HashSet<N::Key>,
}

impl<N: SearchNode> SearchState<N> {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            came_from: HashMap::new(),
            g_scores: HashMap::new(),
            close_set: HashSet::new(),
        }
    }

    pub fn g_score(&self, key: &N::Key) -> Option<f32> {
        self.g_scores.get(key).copied()
    }

    pub fn is_closed(&self, key: &N::Key) -> bool {
        self.close_set.contains(key)
    }

    pub fn node(&self, key: &N::Key) -> Option<&N> {
        self.nodes.get(key)
    }
}

/// Everything a finished search knows.
pub struct SearchOutcome<N: SearchNode> {
    state: SearchState<N>,
    end: Option<N::Key>,
    open_remaining: usize,
    expansions: usize,
}

impl<N: SearchNode> SearchOutcome<N> {
    pub fn found(&self) -> bool {
        self.end.is_some()
    }

    pub fn end_key(&self) -> Option<&N::Key> {
        self.end.as_ref()
    }

    pub fn end(&self) -> Option<&N> {
        self.end.as_ref().and_then(|key| self.state.node(key))
    }

    pub fn node(&self, key: &N::Key) -> Option<&N> {
        self.state.node(key)
    }

    pub fn g_score(&self, key: &N::Key) -> Option<f32> {
        self.state.g_score(key)
    }

    pub fn is_closed(&self, key: &N::Key) -> bool {
        self.state.is_closed(key)
    }

    pub fn closed_keys(&self) -> impl Iterator<Item = &N::Key> {
        self.state.close_set.iter()
    }

    /// Nodes left in the open heap when the search stopped.
    pub fn open_remaining(&self) -> usize {
        self.open_remaining
    }

    pub fn expansions(&self) -> usize {
        self.expansions
    }

    /// Nodes from a start node to `key`, inclusive.
    pub fn path_to(&self, key: &N::Key) -> Vec<N>
    where
        N: Clone,
    {
        let mut path = Vec::new();
        let mut current = Some(key.clone());
        while let Some(k) = current {
            let Some(node) = self.state.node(&k) else {
                break;
            };
            path.push(node.clone());
            current = self.state.came_from.get(&k).cloned();
        }
        path.reverse();
        path
    }

    /// Path to the exit node, empty when the search failed.
    pub fn path(&self) -> Vec<N>
    where
        N: Clone,
    {
        self.end
            .as_ref()
            .map(|key| self.path_to(key))
            .unwrap_or_default()
    }
}

/// Run a best-first search from `starts` (each with its initial g-score).
///
/// Popped nodes are finalized into the close set before the exit condition
/// is evaluated and before their neighbors are generated.
pub fn search<N, E, G, H>(
    starts: impl IntoIterator<Item = (N, f32)>,
    goal: &N,
    config: &AStarConfig,
    mut exit_condition: E,
    mut neighbors: G,
    mut heuristic: H,
) -> SearchOutcome<N>
where
    N: SearchNode,
    E: FnMut(&N, &N) -> bool,
    G: FnMut(&N, &SearchState<N>) -> Vec<(N, f32)>,
    H: FnMut(&N, &N) -> f32,
{
    let mut state = SearchState::new();
    let mut open: BinaryHeap<OpenEntry<N::Key>> = BinaryHeap::new();
    let mut order = 0u64;

    for (node, g_score) in starts {
        let key = node.key();
        if state.g_score(&key).is_some_and(|g| g <= g_score) {
            continue;
        }
        let f_score = g_score + config.heuristic_weight * heuristic(&node, goal);
        state.g_scores.insert(key.clone(), g_score);
        state.nodes.insert(key.clone(), node);
        open.push(OpenEntry {
            f_score,
            g_score,
            order,
            key,
        });
        order += 1;
    }

    let mut end = None;
    let mut expansions = 0usize;
    while let Some(entry) = open.pop() {
        if state.close_set.contains(&entry.key)
            || state.g_score(&entry.key).is_some_and(|g| g < entry.g_score)
        {
            continue;
        }
        state.close_set.insert(entry.key.clone());

        let Some(current) = state.nodes.get(&entry.key) else {
            continue;
        };
        if exit_condition(current, goal) {
            end = Some(entry.key);
            break;
        }

        if config.max_expansions.is_some_and(|max| expansions >= max) {
            debug!("[AStar] expansion budget of {expansions} exhausted");
            break;
        }
        expansions += 1;

        let successors = neighbors(current, &state);
        for (neighbor, tentative_g) in successors {
            let key = neighbor.key();
            if state.close_set.contains(&key) {
                continue;
            }
            match state.g_scores.entry(key.clone()) {
                Entry::Occupied(mut known) if tentative_g < *known.get() => {
                    known.insert(tentative_g);
                }
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(tentative_g);
                }
            }
            let f_score = tentative_g + config.heuristic_weight * heuristic(&neighbor, goal);
            state.came_from.insert(key.clone(), entry.key.clone());
            state.nodes.insert(key.clone(), neighbor);
            open.push(OpenEntry {
                f_score,
                g_score: tentative_g,
                order,
                key,
            });
            order += 1;
        }
    }

    trace!(
        "[AStar] {} after {} expansions, {} nodes left open",
        if end.is_some() { "found" } else { "exhausted" },
        expansions,
        open.len()
    );

    SearchOutcome {
        state,
        end,
        open_remaining: open.len(),
        expansions,
    }
}
