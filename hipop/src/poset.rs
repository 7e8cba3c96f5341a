//! Component H: the incremental poset.
//!
//! Grounded on `utils/poset.py`'s `IncrementalPoset`, but the level array
//! `L[v]` is kept strictly as the pruning hint the spec calls for (§4.H
//! implementation hint), not as the source of truth: the original's
//! `_add_edge` can mutate `L` speculatively before it has confirmed the edge
//! keeps the graph acyclic, which on the one path it takes to reject an edge
//! (`__follow` returning `false`) leaves `L` inconsistent with the edge that
//! was in fact never added. Here, acyclicity is always decided by BFS
//! reachability *before* any mutation, so a rejected `add_edge` leaves the
//! poset bit-identical to its pre-call state (spec §8.6), and `L` is only
//! ever touched once the edge is already known-safe.

use hashbrown::{HashMap, HashSet};
use std::hash::Hash;

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    successors: HashSet<usize>,
    predecessors: HashSet<usize>,
}

/// A directed acyclic relation over values of type `T`, with fast
/// `is_less_than` queries backed by a per-node level hint.
#[derive(Debug, Clone)]
pub struct IncrementalPoset<T> {
    nodes: Vec<Option<Node<T>>>,
    index_of: HashMap<T, usize>,
    /// Insertion order of currently-live node indices; used to break ties
    /// deterministically in `topological_sort`, matching spec §5's
    /// "open-list tie-breaking uses insertion order" guarantee extended to
    /// plan emission.
    insertion_order: Vec<usize>,
    /// `relation -> set of edge labels`, keyed by `(from, to)` node index.
    edge_labels: HashMap<(usize, usize), HashSet<String>>,
    /// Pruning hint only: `level[v] > level[u]` for every edge `u -> v`,
    /// but the converse does not hold. Never consulted to *accept* an edge,
    /// only to short-circuit a `false` answer to `is_less_than`.
    level: HashMap<usize, i64>,
}

impl<T> Default for IncrementalPoset<T> {
    fn default() -> Self {
        IncrementalPoset {
            nodes: Vec::new(),
            index_of: HashMap::new(),
            insertion_order: Vec::new(),
            edge_labels: HashMap::new(),
            level: HashMap::new(),
        }
    }
}

impl<T: Eq + Hash + Clone> IncrementalPoset<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, v: T) {
        if self.index_of.contains_key(&v) {
            return;
        }
        let idx = self.nodes.len();
        self.nodes.push(Some(Node {
            value: v.clone(),
            successors: HashSet::new(),
            predecessors: HashSet::new(),
        }));
        self.index_of.insert(v, idx);
        self.insertion_order.push(idx);
        self.level.insert(idx, 0);
    }

    pub fn contains(&self, v: &T) -> bool {
        self.index_of.contains_key(v)
    }

    pub fn remove_node(&mut self, v: &T) {
        let Some(idx) = self.index_of.remove(v) else {
            return;
        };
        let node = self.nodes[idx].take();
        if let Some(node) = node {
            for &succ in &node.successors {
                if let Some(s) = self.nodes[succ].as_mut() {
                    s.predecessors.remove(&idx);
                }
                self.edge_labels.remove(&(idx, succ));
            }
            for &pred in &node.predecessors {
                if let Some(p) = self.nodes[pred].as_mut() {
                    p.successors.remove(&idx);
                }
                self.edge_labels.remove(&(pred, idx));
            }
        }
        self.insertion_order.retain(|&i| i != idx);
        self.level.remove(&idx);
    }

    fn reaches(&self, from: usize, to: usize) -> bool {
        if from == to {
            return true;
        }
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        seen.insert(from);
        while let Some(u) = stack.pop() {
            let Some(node) = self.nodes[u].as_ref() else {
                continue;
            };
            for &v in &node.successors {
                if v == to {
                    return true;
                }
                if seen.insert(v) {
                    stack.push(v);
                }
            }
        }
        false
    }

    /// Adds an ordering edge `x < y` labelled `relation`. Returns `false`
    /// (without mutating anything) iff the edge would close a cycle.
    pub fn add_edge(&mut self, x: &T, y: &T, relation: impl Into<String>) -> bool {
        self.add_node(x.clone());
        self.add_node(y.clone());
        let xi = self.index_of[x];
        let yi = self.index_of[y];
        if xi == yi {
            return false;
        }
        if self.reaches(yi, xi) {
            return false;
        }
        self.edge_labels
            .entry((xi, yi))
            .or_default()
            .insert(relation.into());
        let already_edge = self.nodes[xi]
            .as_ref()
            .map(|n| n.successors.contains(&yi))
            .unwrap_or(false);
        if !already_edge {
            self.nodes[xi].as_mut().unwrap().successors.insert(yi);
            self.nodes[yi].as_mut().unwrap().predecessors.insert(xi);
            self.bump_level(xi, yi);
        }
        true
    }

    /// Propagates the level hint forward from a freshly-added edge
    /// `x -> y`, so `level[y] > level[x]` and the invariant holds
    /// transitively along every path out of `y`.
    fn bump_level(&mut self, x: usize, y: usize) {
        let lx = *self.level.get(&x).unwrap_or(&0);
        let ly = *self.level.get(&y).unwrap_or(&0);
        if ly > lx {
            return;
        }
        let mut queue = std::collections::VecDeque::new();
        self.level.insert(y, lx + 1);
        queue.push_back(y);
        while let Some(u) = queue.pop_front() {
            let lu = self.level[&u];
            let successors: Vec<usize> = self.nodes[u]
                .as_ref()
                .map(|n| n.successors.iter().copied().collect())
                .unwrap_or_default();
            for v in successors {
                let lv = *self.level.get(&v).unwrap_or(&0);
                if lv <= lu {
                    self.level.insert(v, lu + 1);
                    queue.push_back(v);
                }
            }
        }
    }

    /// `true` iff `x <_poset y`, i.e. `x` precedes `y`. The level hint
    /// rejects most negatives in O(1); anything it cannot reject falls back
    /// to BFS, which is always authoritative.
    pub fn is_less_than(&self, x: &T, y: &T) -> bool {
        let (Some(&xi), Some(&yi)) = (self.index_of.get(x), self.index_of.get(y)) else {
            return false;
        };
        if xi == yi {
            return false;
        }
        let lx = *self.level.get(&xi).unwrap_or(&0);
        let ly = *self.level.get(&yi).unwrap_or(&0);
        if lx >= ly {
            return false;
        }
        self.reaches(xi, yi)
    }

    pub fn edge_labels(&self, x: &T, y: &T) -> Option<&HashSet<String>> {
        let xi = *self.index_of.get(x)?;
        let yi = *self.index_of.get(y)?;
        self.edge_labels.get(&(xi, yi))
    }

    fn live_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.insertion_order.iter().copied()
    }

    /// Topological sort, stable relative to insertion order among nodes at
    /// the same rank. `subset`, if given, restricts the sort to the induced
    /// subgraph over those values.
    pub fn topological_sort(&self, subset: Option<&[T]>) -> Vec<T> {
        let allowed: Option<HashSet<usize>> =
            subset.map(|s| s.iter().filter_map(|v| self.index_of.get(v).copied()).collect());
        let in_subset = |i: usize| allowed.as_ref().map(|a| a.contains(&i)).unwrap_or(true);
        let rank: HashMap<usize, usize> = self
            .insertion_order
            .iter()
            .enumerate()
            .map(|(r, &i)| (i, r))
            .collect();

        let mut indegree: HashMap<usize, usize> = HashMap::new();
        for i in self.live_indices().filter(|&i| in_subset(i)) {
            let node = self.nodes[i].as_ref().unwrap();
            let d = node.predecessors.iter().filter(|&&p| in_subset(p)).count();
            indegree.insert(i, d);
        }
        let mut ready: Vec<usize> = self
            .insertion_order
            .iter()
            .copied()
            .filter(|&i| in_subset(i) && indegree[&i] == 0)
            .collect();
        let mut order = Vec::new();
        while !ready.is_empty() {
            ready.sort_by_key(|&i| rank[&i]);
            let next: Vec<usize> = ready.drain(..).collect();
            for i in next {
                order.push(i);
                let node = self.nodes[i].as_ref().unwrap();
                for &s in &node.successors {
                    if !in_subset(s) {
                        continue;
                    }
                    let d = indegree.get_mut(&s).unwrap();
                    *d -= 1;
                    if *d == 0 {
                        ready.push(s);
                    }
                }
            }
        }
        order
            .into_iter()
            .map(|i| self.nodes[i].as_ref().unwrap().value.clone())
            .collect()
    }

    pub fn minimal_elements(&self) -> Vec<T> {
        self.live_indices()
            .filter(|&i| self.nodes[i].as_ref().unwrap().predecessors.is_empty())
            .map(|i| self.nodes[i].as_ref().unwrap().value.clone())
            .collect()
    }

    pub fn maximal_elements(&self) -> Vec<T> {
        self.live_indices()
            .filter(|&i| self.nodes[i].as_ref().unwrap().successors.is_empty())
            .map(|i| self.nodes[i].as_ref().unwrap().value.clone())
            .collect()
    }

    pub fn has_bottom(&self) -> bool {
        self.minimal_elements().len() == 1
    }

    pub fn has_top(&self) -> bool {
        self.maximal_elements().len() == 1
    }

    pub fn len(&self) -> usize {
        self.insertion_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertion_order.is_empty()
    }

    pub fn nodes_iter(&self) -> impl Iterator<Item = &T> {
        self.live_indices().map(|i| &self.nodes[i].as_ref().unwrap().value)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_labels.len()
    }

    /// Every live edge as `(from, to)`, in insertion order of the source
    /// node; used to translate a method's subtask network into ordering
    /// constraints between the plan steps it resolves to (spec §4.I).
    pub fn edges(&self) -> Vec<(T, T)> {
        let mut out = Vec::new();
        for &u in &self.insertion_order {
            let node = self.nodes[u].as_ref().unwrap();
            for &v in &node.successors {
                out.push((node.value.clone(), self.nodes[v].as_ref().unwrap().value.clone()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_cycle_without_mutating() {
        let mut p: IncrementalPoset<i64> = IncrementalPoset::new();
        assert!(p.add_edge(&1, &2, "<"));
        assert!(p.add_edge(&2, &3, "<"));
        let before = p.edge_count();
        assert!(!p.add_edge(&3, &1, "<"));
        assert_eq!(p.edge_count(), before);
        assert!(p.is_less_than(&1, &3));
        assert!(!p.is_less_than(&3, &1));
    }

    #[test]
    fn topological_sort_is_consistent() {
        let mut p: IncrementalPoset<i64> = IncrementalPoset::new();
        p.add_edge(&1, &2, "<");
        p.add_edge(&1, &3, "<");
        p.add_edge(&2, &4, "<");
        p.add_edge(&3, &4, "<");
        let order = p.topological_sort(None);
        let pos = |x: i64| order.iter().position(|&v| v == x).unwrap();
        assert!(pos(1) < pos(2));
        assert!(pos(1) < pos(3));
        assert!(pos(2) < pos(4));
        assert!(pos(3) < pos(4));
    }

    #[test]
    fn bottom_and_top() {
        let mut p: IncrementalPoset<i64> = IncrementalPoset::new();
        p.add_edge(&1, &2, "<");
        p.add_edge(&1, &3, "<");
        assert!(p.has_bottom());
        assert!(!p.has_top());
        p.add_edge(&2, &4, "<");
        p.add_edge(&3, &4, "<");
        assert!(p.has_top());
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut p: IncrementalPoset<i64> = IncrementalPoset::new();
        p.add_edge(&1, &2, "<");
        p.remove_node(&2);
        assert!(!p.contains(&2));
        assert!(p.contains(&1));
        assert_eq!(p.edge_count(), 0);
    }
}
