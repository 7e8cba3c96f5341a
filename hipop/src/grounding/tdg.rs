//! Component G: the Task Decomposition Graph.
//!
//! Grounded on `grounding/tdg.py`'s `TaskDecompositionGraph`: a bipartite
//! task/method/action graph, a monotone `useless` set filled in by
//! strongly-connected-component condensation (reverse topological order),
//! and per-node optimistic effects propagated the same way. The design
//! notes' open question about two parallel pipelines (`grounding/` vs the
//! legacy `problem/`) is resolved in favor of the newer, simpler usefulness
//! rule implemented here: see DESIGN.md.

use crate::grounding::{GroundedAction, GroundedMethod, GroundedTask, HaddTable};
use crate::ids::TdgNodeId;
use crate::symbols::Sym;
use fixedbitset::FixedBitSet;
use hashbrown::{HashMap, HashSet};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Task,
    Method,
    Action,
}

#[derive(Debug, Clone, Default)]
pub struct OptimisticEffect {
    pub adds: FixedBitSet,
    pub dels: FixedBitSet,
}

impl OptimisticEffect {
    fn union_with(&mut self, other: &OptimisticEffect) {
        if self.adds.len() < other.adds.len() {
            self.adds.grow(other.adds.len());
        }
        if self.dels.len() < other.dels.len() {
            self.dels.grow(other.dels.len());
        }
        self.adds.union_with(&other.adds);
        self.dels.union_with(&other.dels);
    }
}

/// A cheap per-node decomposition cost, used by `search::order`'s `bechon`
/// and `hadd-max` evaluation functions (spec §4.K) — not part of spec.md's
/// TDG contract itself, which only specifies the `effect` rule; folded in
/// here since it is computed over the same graph with the same reverse
/// topological walk. See DESIGN.md for the reasoning behind this choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TdgCost {
    /// Cheapest number of primitive actions a full decomposition requires.
    pub cost: u32,
    /// Number of new steps the cheapest decomposition would add.
    pub modifications: u32,
    /// Worst-case h_add over the actions reachable through the cheapest path.
    pub hadd_max: u32,
}

impl Default for TdgCost {
    fn default() -> Self {
        TdgCost {
            cost: u32::MAX,
            modifications: u32::MAX,
            hadd_max: u32::MAX,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    repr: Sym,
    kind: NodeKind,
    successors: Vec<TdgNodeId>,
    effect: OptimisticEffect,
    cost: TdgCost,
}

/// The bipartite task/method/action graph plus its monotone `useless` set.
#[derive(Debug, Clone, Default)]
pub struct TaskDecompositionGraph {
    nodes: Vec<Node>,
    index_of: HashMap<Sym, TdgNodeId>,
    useless: HashSet<TdgNodeId>,
}

impl TaskDecompositionGraph {
    /// Builds the raw graph (tasks, methods, actions as nodes; `task ->
    /// method` and `method -> subtask` edges), seeds `useless` from
    /// h_add-unreachable actions, filters usefulness by SCC condensation,
    /// optionally restricts to what is BFS-reachable from `root_tasks`, and
    /// finally drops every useless node. This folds spec §4.G's
    /// construction, usefulness filtering and HTN projection into the one
    /// entry point a caller needs.
    pub fn build(
        actions: &HashMap<Sym, GroundedAction>,
        methods: &HashMap<Sym, GroundedMethod>,
        tasks: &HashMap<Sym, GroundedTask>,
        hadd: &HaddTable,
        root_tasks: &[Sym],
    ) -> TaskDecompositionGraph {
        let mut tdg = TaskDecompositionGraph::default();
        for repr in tasks.keys() {
            tdg.add_node(repr.clone(), NodeKind::Task);
        }
        for repr in methods.keys() {
            tdg.add_node(repr.clone(), NodeKind::Method);
        }
        for (repr, action) in actions {
            let id = tdg.add_node(repr.clone(), NodeKind::Action);
            tdg.nodes[id.index()].effect = OptimisticEffect {
                adds: action.adds.clone(),
                dels: action.dels.clone(),
            };
        }

        for (repr, method) in methods {
            let method_id = tdg.index_of[repr];
            match tdg.index_of.get(&method.task_repr) {
                Some(&task_id) => tdg.add_edge(task_id, method_id),
                None => {
                    tracing::debug!(method = %repr, task = %method.task_repr, "method has no task, marking useless");
                    tdg.useless.insert(method_id);
                }
            }
            for subtask_repr in method.subtasks.values() {
                match tdg.index_of.get(subtask_repr) {
                    Some(&sub_id) => tdg.add_edge(method_id, sub_id),
                    None => {
                        tracing::debug!(method = %repr, subtask = %subtask_repr, "method has unresolved subtask, marking useless");
                        tdg.useless.insert(method_id);
                    }
                }
            }
        }

        let initially_useless: Vec<TdgNodeId> = actions
            .keys()
            .filter(|repr| !hadd.is_reachable(repr))
            .map(|repr| tdg.index_of[repr])
            .collect();
        tdg.remove_useless(initially_useless);

        if !root_tasks.is_empty() {
            tdg.project_htn(root_tasks);
        }

        tdg.drop_useless_nodes();
        tdg.compute_costs(hadd);
        tdg
    }

    /// Fixed-point pass computing [`TdgCost`] for every live node: an action's
    /// cost is fixed at its own h_add value, a method's is the sum over its
    /// subtasks (it must perform all of them), a task's is the minimum over
    /// its methods (it only needs one). Iterated to a fixed point rather than
    /// solved in one reverse-topological pass since recursive tasks can make
    /// the induced subgraph non-acyclic.
    fn compute_costs(&mut self, hadd: &HaddTable) {
        let n = self.nodes.len();
        for i in 0..n {
            self.nodes[i].cost = match self.nodes[i].kind {
                NodeKind::Action => TdgCost {
                    cost: 1,
                    modifications: 0,
                    hadd_max: hadd.action(&self.nodes[i].repr),
                },
                NodeKind::Method | NodeKind::Task => TdgCost::default(),
            };
        }
        let mut changed = true;
        let mut rounds = 0;
        while changed && rounds <= n {
            changed = false;
            rounds += 1;
            for i in 0..n {
                if self.useless.contains(&TdgNodeId::from(i)) {
                    continue;
                }
                let updated = match self.nodes[i].kind {
                    NodeKind::Action => None,
                    NodeKind::Method => {
                        let succs = self.nodes[i].successors.clone();
                        if succs.iter().any(|s| self.nodes[s.index()].cost.cost == u32::MAX) {
                            None
                        } else {
                            let cost = succs.iter().fold(0u32, |a, s| a.saturating_add(self.nodes[s.index()].cost.cost));
                            let modifications = succs.len() as u32;
                            let hadd_max = succs.iter().map(|s| self.nodes[s.index()].cost.hadd_max).max().unwrap_or(0);
                            Some(TdgCost { cost, modifications, hadd_max })
                        }
                    }
                    NodeKind::Task => self.nodes[i]
                        .successors
                        .iter()
                        .map(|s| self.nodes[s.index()].cost)
                        .min_by_key(|c| c.cost),
                };
                if let Some(new_cost) = updated {
                    if new_cost.cost < self.nodes[i].cost.cost {
                        self.nodes[i].cost = new_cost;
                        changed = true;
                    }
                }
            }
        }
    }

    pub fn cost(&self, id: TdgNodeId) -> TdgCost {
        self.nodes[id.index()].cost
    }

    fn add_node(&mut self, repr: Sym, kind: NodeKind) -> TdgNodeId {
        if let Some(&id) = self.index_of.get(&repr) {
            return id;
        }
        let id = TdgNodeId::from(self.nodes.len());
        self.nodes.push(Node {
            repr: repr.clone(),
            kind,
            successors: Vec::new(),
            effect: OptimisticEffect::default(),
            cost: TdgCost::default(),
        });
        self.index_of.insert(repr, id);
        id
    }

    fn add_edge(&mut self, from: TdgNodeId, to: TdgNodeId) {
        let succs = &mut self.nodes[from.index()].successors;
        if !succs.contains(&to) {
            succs.push(to);
        }
    }

    pub fn node_id(&self, repr: &str) -> Option<TdgNodeId> {
        self.index_of.get(repr).copied()
    }

    pub fn kind(&self, id: TdgNodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    pub fn is_useless(&self, id: TdgNodeId) -> bool {
        self.useless.contains(&id)
    }

    pub fn successors(&self, id: TdgNodeId) -> impl Iterator<Item = TdgNodeId> + '_ {
        self.nodes[id.index()].successors.iter().copied()
    }

    pub fn effect(&self, id: TdgNodeId) -> &OptimisticEffect {
        &self.nodes[id.index()].effect
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Seeds `useless` with `seed`, then iterates strongly-connected
    /// components in reverse topological order: a method becomes useless if
    /// any successor is useless, a task becomes useless if all of its
    /// methods are useless, and otherwise the node's optimistic effect is
    /// refreshed as the union of its successors' effects. Matches
    /// `remove_useless` in `tdg.py`.
    fn remove_useless(&mut self, seed: Vec<TdgNodeId>) {
        self.useless.extend(seed);
        let sccs = tarjan::reverse_topological_sccs(&self.nodes);
        for component in sccs {
            for &node in &component {
                if self.useless.contains(&node) {
                    continue;
                }
                match self.nodes[node.index()].kind {
                    NodeKind::Method => {
                        let any_useless = self.nodes[node.index()]
                            .successors
                            .iter()
                            .any(|s| self.useless.contains(s));
                        if any_useless {
                            self.useless.insert(node);
                        } else {
                            let mut effect = OptimisticEffect::default();
                            for &s in &self.nodes[node.index()].successors {
                                effect.union_with(&self.nodes[s.index()].effect);
                            }
                            self.nodes[node.index()].effect = effect;
                        }
                    }
                    NodeKind::Task => {
                        let successors = &self.nodes[node.index()].successors;
                        let all_useless = !successors.is_empty()
                            && successors.iter().all(|s| self.useless.contains(s));
                        if all_useless {
                            self.useless.insert(node);
                        } else {
                            let mut effect = OptimisticEffect::default();
                            for &s in &self.nodes[node.index()].successors {
                                effect.union_with(&self.nodes[s.index()].effect);
                            }
                            self.nodes[node.index()].effect = effect;
                        }
                    }
                    NodeKind::Action => {}
                }
            }
        }
    }

    /// Single-source BFS from every root task; nodes unreached are removed
    /// from the "useless-relevant" universe by simply being dropped at
    /// [`TaskDecompositionGraph::drop_useless_nodes`] time, matching `htn()`
    /// in `tdg.py` (including its quirk of un-marking the dropped nodes as
    /// useless, since they are gone from the graph either way).
    fn project_htn(&mut self, root_tasks: &[Sym]) {
        let mut reachable: HashSet<TdgNodeId> = HashSet::new();
        let mut queue: VecDeque<TdgNodeId> = VecDeque::new();
        for root in root_tasks {
            if let Some(&id) = self.index_of.get(root) {
                if reachable.insert(id) {
                    queue.push_back(id);
                }
            }
        }
        while let Some(u) = queue.pop_front() {
            for &v in &self.nodes[u.index()].successors {
                if reachable.insert(v) {
                    queue.push_back(v);
                }
            }
        }
        let unreachable: Vec<TdgNodeId> = (0..self.nodes.len())
            .map(TdgNodeId::from)
            .filter(|id| !reachable.contains(id))
            .collect();
        for id in unreachable {
            self.useless.remove(&id);
            self.mark_removed(id);
        }
    }

    fn mark_removed(&mut self, id: TdgNodeId) {
        self.removed_mut().insert(id);
    }

    fn removed_mut(&mut self) -> &mut HashSet<TdgNodeId> {
        // A node marked removed-but-not-useless (by HTN projection) is
        // folded into `useless` at drop time: both paths end in the node
        // being absent from the graph, and nothing downstream distinguishes
        // "useless" from "unreachable from the root" once dropped.
        &mut self.useless
    }

    fn drop_useless_nodes(&mut self) {
        for &id in &self.useless.clone() {
            self.nodes[id.index()].successors.clear();
        }
    }

    pub fn iter_live(&self) -> impl Iterator<Item = TdgNodeId> + '_ {
        (0..self.nodes.len())
            .map(TdgNodeId::from)
            .filter(move |id| !self.useless.contains(id))
    }

    pub fn repr(&self, id: TdgNodeId) -> &str {
        &self.nodes[id.index()].repr
    }
}

/// Tarjan's strongly-connected-components algorithm, adapted from
/// `chronicles::analysis::fluent_hierarchy`'s `mod tarjan` to plain `Vec`
/// indices instead of an `aries`-specific ref-store, since this graph's
/// nodes are already dense `TdgNodeId`s.
mod tarjan {
    use super::Node;
    use crate::ids::TdgNodeId;

    struct Tarjan<'a> {
        nodes: &'a [Node],
        index: Vec<Option<usize>>,
        lowlink: Vec<usize>,
        on_stack: Vec<bool>,
        stack: Vec<TdgNodeId>,
        counter: usize,
        sccs: Vec<Vec<TdgNodeId>>,
    }

    impl<'a> Tarjan<'a> {
        fn strong_connect(&mut self, v: TdgNodeId) {
            self.index[v.index()] = Some(self.counter);
            self.lowlink[v.index()] = self.counter;
            self.counter += 1;
            self.stack.push(v);
            self.on_stack[v.index()] = true;

            for &w in &self.nodes[v.index()].successors {
                if self.index[w.index()].is_none() {
                    self.strong_connect(w);
                    self.lowlink[v.index()] = self.lowlink[v.index()].min(self.lowlink[w.index()]);
                } else if self.on_stack[w.index()] {
                    self.lowlink[v.index()] = self.lowlink[v.index()].min(self.index[w.index()].unwrap());
                }
            }

            if self.lowlink[v.index()] == self.index[v.index()].unwrap() {
                let mut component = Vec::new();
                loop {
                    let w = self.stack.pop().unwrap();
                    self.on_stack[w.index()] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                self.sccs.push(component);
            }
        }
    }

    /// Returns each SCC as a `Vec<TdgNodeId>`, with the SCCs themselves
    /// ordered so that a component has no edge into any component appearing
    /// later in the list: a reverse topological order of the condensation,
    /// matching `networkx.condensation(...).reverse()` plus a topological
    /// sort in `remove_useless`.
    pub fn reverse_topological_sccs(nodes: &[Node]) -> Vec<Vec<TdgNodeId>> {
        let n = nodes.len();
        let mut t = Tarjan {
            nodes,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            counter: 0,
            sccs: Vec::new(),
        };
        for i in 0..n {
            let id = TdgNodeId::from(i);
            if t.index[id.index()].is_none() {
                t.strong_connect(id);
            }
        }
        // Tarjan emits SCCs in an order where a component is finished only
        // after all components reachable from it, i.e. reverse topological
        // order of the condensation already: the sink components of the DAG
        // come out first.
        t.sccs
    }
}
