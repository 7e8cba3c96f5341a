//! Component I: the hierarchical partial plan.
//!
//! Grounded on `hipop/plan/plan.py`'s `HierarchicalPartialPlan`: a mutable
//! refinement state shared-by-reference with the grounded problem (per
//! spec §5's "shared resource discipline") and cloned wholesale whenever a
//! resolver commits to a choice, since the original does the same
//! (`HierarchicalPartialPlan.copy`) rather than threading structural
//! sharing through every field.

pub mod flaws;
pub mod links;
pub mod step;

pub use flaws::{AbstractFlaw, Decomposition, Threat};
pub use links::{CausalLink, OpenLink};
pub use step::{Step, StepKind};

use crate::error::PlanError;
use crate::grounding::GroundedProblem;
use crate::ids::{AtomId, StepIndex};
use crate::poset::IncrementalPoset;
use crate::symbols::Sym;
use fixedbitset::FixedBitSet;
use hashbrown::{HashMap, HashSet};

/// The partial-order plan under refinement. Shares `problem` by reference
/// with every other plan produced during the same search run; owns its own
/// poset, step table and flaw lists, per spec §5.
#[derive(Debug, Clone)]
pub struct Plan<'p> {
    problem: &'p GroundedProblem,
    steps: HashMap<StepIndex, Step>,
    tasks: HashSet<StepIndex>,
    hierarchy: HashMap<StepIndex, Decomposition>,
    poset: IncrementalPoset<StepIndex>,
    causal_links: Vec<CausalLink>,
    open_links: Vec<OpenLink>,
    threats: Vec<Threat>,
    abstract_flaws: Vec<AbstractFlaw>,
    step_counter: StepIndex,
    init_step: Option<StepIndex>,
    init_adds: FixedBitSet,
    init_dels: FixedBitSet,
    /// Whether to extend threat detection with the mutex table, per spec
    /// §4.I's closing paragraph; a per-plan copy of `SearchConfig::threat_mutex`.
    threat_mutex: bool,
    /// `task-name -> methods already tried for it`, for duplicate detection
    /// (spec §4.I's "same multiset of ... decompositions").
    task_method_decomposition: HashMap<Sym, HashSet<Sym>>,
    /// `(atom, supporter-op, consumer-op)` signatures of every causal link,
    /// for duplicate detection.
    causal_link_signatures: HashSet<(AtomId, Sym, Sym)>,
}

impl<'p> Plan<'p> {
    /// `init = true` seeds step 0 as the synthetic `__init` action, whose
    /// effect restores the initial state: adds every atom in
    /// `problem.literals.init_state`, deletes every other fluent atom.
    pub fn new(problem: &'p GroundedProblem, init: bool, threat_mutex: bool) -> Plan<'p> {
        let mut plan = Plan {
            problem,
            steps: HashMap::new(),
            tasks: HashSet::new(),
            hierarchy: HashMap::new(),
            poset: IncrementalPoset::new(),
            causal_links: Vec::new(),
            open_links: Vec::new(),
            threats: Vec::new(),
            abstract_flaws: Vec::new(),
            // Step indices start at 1, never 0: the signed start/end encoding
            // (`end = -index`) collapses start and end onto the same poset
            // node if `index == 0`, so 0 is left unused.
            step_counter: 1,
            init_step: None,
            init_adds: FixedBitSet::with_capacity(0),
            init_dels: FixedBitSet::with_capacity(0),
            threat_mutex,
            task_method_decomposition: HashMap::new(),
            causal_link_signatures: HashSet::new(),
        };
        if init {
            let adds = problem.literals.init_state.clone();
            let mut dels = problem.literals.fluent_atoms.clone();
            dels.difference_with(&problem.literals.init_state);
            plan.init_adds = adds;
            plan.init_dels = dels;
            let idx = plan.add_step(StepKind::Init, true, false);
            plan.init_step = Some(idx);
        }
        plan
    }

    fn add_step(&mut self, kind: StepKind, atomic: bool, link_to_init: bool) -> StepIndex {
        let index = self.step_counter;
        self.step_counter += 1;
        let (start, end) = if atomic { (index, index) } else { (index, -index) };
        self.poset.add_node(start);
        if !atomic {
            self.poset.add_node(end);
            self.poset.add_edge(&start, &end, "<");
        }
        if link_to_init {
            if let Some(init) = self.init_step {
                let init_step = self.steps[&init].start;
                self.poset.add_edge(&init_step, &start, "<");
            }
        }
        self.steps.insert(index, Step { kind, start, end });
        index
    }

    fn add_open_links(&mut self, step: StepIndex, precondition: &crate::logic::Expr) {
        let support = precondition.support(self.problem.interner.len());
        for atom in support.pos.ones() {
            self.open_links.push(OpenLink {
                step,
                atom: AtomId::from(atom),
                polarity: true,
            });
        }
        for atom in support.neg.ones() {
            self.open_links.push(OpenLink {
                step,
                atom: AtomId::from(atom),
                polarity: false,
            });
        }
    }

    /// Adds a primitive action step, registering one open link per atom in
    /// its precondition's support. `link_to_init` orders `__init` before it.
    pub fn add_action(&mut self, repr: impl Into<Sym>, link_to_init: bool) -> StepIndex {
        let repr = repr.into();
        let index = self.add_step(StepKind::Action(repr.clone()), true, link_to_init);
        if let Some(action) = self.problem.actions.get(&repr) {
            self.add_open_links(index, &action.precondition);
        }
        index
    }

    /// Adds a compound task step and marks it an abstract flaw.
    pub fn add_task(&mut self, repr: impl Into<Sym>, link_to_init: bool) -> StepIndex {
        let repr = repr.into();
        let index = self.add_step(StepKind::Task(repr.clone()), false, link_to_init);
        self.tasks.insert(index);
        self.abstract_flaws.push(AbstractFlaw { step: index, task: repr });
        index
    }

    pub fn has_flaws(&self) -> bool {
        !self.threats.is_empty() || !self.open_links.is_empty() || !self.abstract_flaws.is_empty()
    }

    pub fn threats(&self) -> &[Threat] {
        &self.threats
    }

    pub fn open_links(&self) -> &[OpenLink] {
        &self.open_links
    }

    pub fn abstract_flaws(&self) -> &[AbstractFlaw] {
        &self.abstract_flaws
    }

    pub fn problem(&self) -> &'p GroundedProblem {
        self.problem
    }

    pub fn step(&self, index: StepIndex) -> Option<&Step> {
        self.steps.get(&index)
    }

    fn operator_repr(&self, index: StepIndex) -> Sym {
        self.steps
            .get(&index)
            .map(|s| s.kind.repr().to_string())
            .unwrap_or_default()
    }

    /// `(adds, dels)` of the concrete effect at `index`, if it has one:
    /// `None` for task/method steps, which are compound and have no effect
    /// of their own (their substeps do).
    fn effect_of(&self, index: StepIndex) -> Option<(&FixedBitSet, &FixedBitSet)> {
        match &self.steps.get(&index)?.kind {
            StepKind::Init => Some((&self.init_adds, &self.init_dels)),
            StepKind::Action(repr) => self.problem.actions.get(repr).map(|a| (&a.adds, &a.dels)),
            StepKind::Method(_) | StepKind::Task(_) => None,
        }
    }

    /// Seeds a plan from the problem's root task network (`htn` in the input
    /// AST, §6): one step per root subtask, action or task, ordered per the
    /// network's edges and linked after `__init`. Not itself named by spec
    /// §4.I (which only specifies `new`/`add_action`/`add_task` as the
    /// primitives), but every driver entry point needs exactly this
    /// translation of the root network and it is the same translation
    /// `apply_method` performs for a method's subtask network, so it is
    /// factored out here rather than duplicated by every caller.
    pub fn from_root(problem: &'p GroundedProblem, threat_mutex: bool) -> Plan<'p> {
        let mut plan = Plan::new(problem, true, threat_mutex);
        let mut label_to_step: HashMap<Sym, StepIndex> = HashMap::new();
        let mut new_primitive_steps = Vec::new();
        for label in problem.root_network.network.nodes_iter() {
            let Some(child_repr) = problem.root_network.subtasks.get(label) else {
                continue;
            };
            let child_index = if problem.tasks.contains_key(child_repr) {
                plan.add_task(child_repr.clone(), true)
            } else if problem.actions.contains_key(child_repr) {
                let idx = plan.add_action(child_repr.clone(), true);
                new_primitive_steps.push(idx);
                idx
            } else {
                continue;
            };
            label_to_step.insert(label.clone(), child_index);
        }
        for (before, after) in problem.root_network.network.edges() {
            let (Some(&b), Some(&a)) = (label_to_step.get(&before), label_to_step.get(&after)) else {
                continue;
            };
            let b_step = plan.steps[&b].clone();
            let a_step = plan.steps[&a].clone();
            plan.poset.add_edge(&b_step.end, &a_step.start, "<");
        }
        for idx in new_primitive_steps {
            if let Ok(new_threats) = plan.threats_on_action(idx) {
                plan.threats.extend(new_threats);
            }
        }
        plan
    }

    /// For each method of `flaw.task` in the TDG, a copy of the plan with
    /// the flaw decomposed: see spec §4.I's `abstract_flaw_resolvers`.
    pub fn abstract_flaw_resolvers(&self, flaw: &AbstractFlaw) -> Vec<Plan<'p>> {
        let Some(task_id) = self.problem.tdg.node_id(&flaw.task) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for method_id in self.problem.tdg.successors(task_id) {
            if self.problem.tdg.kind(method_id) != crate::grounding::tdg::NodeKind::Method {
                continue;
            }
            let method_repr = self.problem.tdg.repr(method_id).to_string();
            let Some(method) = self.problem.methods.get(&method_repr) else {
                continue;
            };
            if let Some(resolved) = self.apply_method(flaw, &method_repr, method) {
                out.push(resolved);
            }
        }
        out
    }

    fn apply_method(
        &self,
        flaw: &AbstractFlaw,
        method_repr: &Sym,
        method: &crate::grounding::GroundedMethod,
    ) -> Option<Plan<'p>> {
        let mut new_plan = self.clone();
        new_plan.abstract_flaws.retain(|f| f != flaw);

        let flaw_step = new_plan.steps[&flaw.step].clone();
        let mindex = new_plan.add_step(StepKind::Method(method_repr.clone()), false, false);
        let method_step = new_plan.steps[&mindex].clone();
        new_plan.poset.add_edge(&flaw_step.start, &method_step.start, "<");
        new_plan.poset.add_edge(&method_step.end, &flaw_step.end, "<");

        let mut label_to_step: HashMap<Sym, StepIndex> = HashMap::new();
        let mut new_primitive_steps = Vec::new();
        for label in method.network.nodes_iter() {
            let Some(child_repr) = method.subtasks.get(label) else {
                continue;
            };
            let child_index = if self.problem.tasks.contains_key(child_repr) {
                new_plan.add_task(child_repr.clone(), false)
            } else if self.problem.actions.contains_key(child_repr) {
                let idx = new_plan.add_action(child_repr.clone(), false);
                new_primitive_steps.push(idx);
                idx
            } else {
                continue;
            };
            label_to_step.insert(label.clone(), child_index);
        }

        for &child_index in label_to_step.values() {
            let child_step = new_plan.steps[&child_index].clone();
            new_plan.poset.add_edge(&method_step.start, &child_step.start, "<");
            new_plan.poset.add_edge(&child_step.end, &method_step.end, "<");
        }

        for (before, after) in method.network.edges() {
            let (Some(&b), Some(&a)) = (label_to_step.get(&before), label_to_step.get(&after)) else {
                continue;
            };
            let b_step = new_plan.steps[&b].clone();
            let a_step = new_plan.steps[&a].clone();
            new_plan.poset.add_edge(&b_step.end, &a_step.start, "<");
        }

        new_plan.add_open_links(mindex, &method.precondition);

        new_plan.hierarchy.insert(
            flaw.step,
            Decomposition {
                method: method_repr.clone(),
                substeps: label_to_step.values().copied().collect(),
            },
        );
        new_plan
            .task_method_decomposition
            .entry(flaw.task.clone())
            .or_default()
            .insert(method_repr.clone());

        for idx in new_primitive_steps {
            match new_plan.threats_on_action(idx) {
                Ok(new_threats) => new_plan.threats.extend(new_threats),
                Err(_) => return None,
            }
        }
        Some(new_plan)
    }

    /// For each existing primitive step that supports `link`'s atom in the
    /// right polarity and isn't already ordered after the consumer, a copy
    /// with a new causal link and ordering edge: spec §4.I's
    /// `open_link_resolvers`.
    pub fn open_link_resolvers(&self, link: &OpenLink) -> Vec<Plan<'p>> {
        let Some(consumer) = self.steps.get(&link.step).cloned() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut candidates: Vec<StepIndex> = self.steps.keys().copied().collect();
        candidates.sort();
        for idx in candidates {
            let Some((adds, dels)) = self.effect_of(idx) else {
                continue;
            };
            let step = self.steps[&idx].clone();
            if self.poset.is_less_than(&consumer.start, &step.end) {
                continue;
            }
            let matches = if link.polarity {
                adds.contains(link.atom.index())
            } else {
                dels.contains(link.atom.index())
            };
            if !matches {
                continue;
            }

            let mut new_plan = self.clone();
            let (pred, _) = self.problem.interner.decode(link.atom);
            let label = if link.polarity {
                pred.clone()
            } else {
                format!("not {pred}")
            };
            if !new_plan.poset.add_edge(&step.end, &consumer.start, label) {
                continue;
            }
            let cl = CausalLink {
                supporter: idx,
                consumer: link.step,
                atom: link.atom,
                polarity: link.polarity,
            };
            new_plan.open_links.retain(|l| l != link);
            new_plan.causal_links.push(cl);
            new_plan.causal_link_signatures.insert((
                link.atom,
                new_plan.operator_repr(idx),
                new_plan.operator_repr(link.step),
            ));
            match new_plan.threats_on_causal_link(&cl) {
                Ok(new_threats) => new_plan.threats.extend(new_threats),
                Err(_) => continue,
            }
            out.push(new_plan);
        }
        out
    }

    /// True if mutex-extended threat detection flags `(adds, dels)` as
    /// conflicting with `link`, per spec §4.I.
    fn is_threatening(&self, adds: &FixedBitSet, dels: &FixedBitSet, link: &CausalLink) -> bool {
        if link.polarity {
            if dels.contains(link.atom.index()) {
                return true;
            }
            if self.threat_mutex {
                if let Some(mutex) = self.problem.mutex.mutex_of(link.atom) {
                    if adds.ones().any(|a| mutex.contains(a)) {
                        return true;
                    }
                }
            }
            false
        } else {
            adds.contains(link.atom.index())
        }
    }

    /// Threats a freshly-added primitive step `step_idx` raises against every
    /// *existing* causal link, per spec §4.I's
    /// "newly introduced primitive steps are checked for threats against
    /// existing causal links".
    fn threats_on_action(&self, step_idx: StepIndex) -> Result<Vec<Threat>, PlanError> {
        let Some((adds, dels)) = self.effect_of(step_idx) else {
            return Ok(Vec::new());
        };
        let action_step = self.steps[&step_idx].clone();
        let mut out = Vec::new();
        for cl in &self.causal_links {
            if !self.is_threatening(adds, dels, cl) {
                continue;
            }
            if let Some(t) = self.resolve_one_threat(&action_step, step_idx, cl)? {
                out.push(t);
            }
        }
        Ok(out)
    }

    /// Threats a freshly-added causal link raises against every *other*
    /// existing primitive step, per spec §4.I's `open_link_resolvers`.
    fn threats_on_causal_link(&self, cl: &CausalLink) -> Result<Vec<Threat>, PlanError> {
        let mut out = Vec::new();
        let mut candidates: Vec<StepIndex> = self.steps.keys().copied().collect();
        candidates.sort();
        for idx in candidates {
            if idx == cl.supporter || idx == cl.consumer {
                continue;
            }
            if matches!(self.steps[&idx].kind, StepKind::Init) {
                continue;
            }
            let Some((adds, dels)) = self.effect_of(idx) else {
                continue;
            };
            if !self.is_threatening(adds, dels, cl) {
                continue;
            }
            let step = self.steps[&idx].clone();
            if let Some(t) = self.resolve_one_threat(&step, idx, cl)? {
                out.push(t);
            }
        }
        Ok(out)
    }

    /// Shared core of the "is `step` a threat on `cl`, and if so is it
    /// already unresolvable?" check used by both threat-discovery paths.
    fn resolve_one_threat(&self, step: &Step, idx: StepIndex, cl: &CausalLink) -> Result<Option<Threat>, PlanError> {
        let support = self.steps[&cl.supporter].clone();
        let supported = self.steps[&cl.consumer].clone();
        if self.poset.is_less_than(&step.end, &support.end) {
            return Ok(None);
        }
        if self.poset.is_less_than(&supported.start, &step.start) {
            return Ok(None);
        }
        if self.poset.is_less_than(&support.end, &step.end) && self.poset.is_less_than(&step.start, &supported.start) {
            return Err(PlanError::FlawUnresolvable);
        }
        Ok(Some(Threat { step: idx, link: *cl }))
    }

    /// Promotion (`threat.step.end -> supporter.end`) and demotion
    /// (`consumer.start -> threat.step.start`), each accepted independently
    /// iff it keeps the poset acyclic: spec §4.I's `threat_resolvers`.
    pub fn threat_resolvers(&self, threat: &Threat) -> Vec<Plan<'p>> {
        let mut out = Vec::new();
        let Some(step) = self.steps.get(&threat.step).cloned() else {
            return out;
        };
        let Some(support) = self.steps.get(&threat.link.supporter).cloned() else {
            return out;
        };
        let Some(supported) = self.steps.get(&threat.link.consumer).cloned() else {
            return out;
        };

        let mut promoted = self.clone();
        if promoted.poset.add_edge(&step.end, &support.end, "<") {
            promoted.threats.retain(|t| t != threat);
            out.push(promoted);
        }

        let mut demoted = self.clone();
        if demoted.poset.add_edge(&supported.start, &step.start, "<") {
            demoted.threats.retain(|t| t != threat);
            out.push(demoted);
        }

        out
    }

    /// True if some still-abstract task step, not ordered after the
    /// consumer, optimistically produces `link`'s atom with matching
    /// polarity: spec §4.I's `has_open_link_task_resolvers`.
    pub fn has_open_link_task_resolvers(&self, link: &OpenLink) -> bool {
        let Some(consumer) = self.steps.get(&link.step) else {
            return false;
        };
        for flaw in &self.abstract_flaws {
            let Some(step) = self.steps.get(&flaw.step) else {
                continue;
            };
            if self.poset.is_less_than(&consumer.start, &step.end) {
                continue;
            }
            let Some(task_id) = self.problem.tdg.node_id(&flaw.task) else {
                continue;
            };
            let effect = self.problem.tdg.effect(task_id);
            let matches = if link.polarity {
                effect.adds.contains(link.atom.index())
            } else {
                effect.dels.contains(link.atom.index())
            };
            if matches {
                return true;
            }
        }
        false
    }

    /// Topological sort of the poset restricted to positive (start) step
    /// ids, per spec §4.I's `sequential_plan`.
    pub fn sequential_plan(&self) -> Vec<(StepIndex, Step)> {
        self.poset
            .topological_sort(None)
            .into_iter()
            .filter(|&i| i > 0)
            .map(|i| (i, self.steps[&i].clone()))
            .collect()
    }

    pub fn hierarchy(&self) -> &HashMap<StepIndex, Decomposition> {
        &self.hierarchy
    }

    pub fn poset(&self) -> &IncrementalPoset<StepIndex> {
        &self.poset
    }

    pub fn init_step(&self) -> Option<StepIndex> {
        self.init_step
    }

    /// Orders `before`'s end node ahead of `after`'s start node. Used by the
    /// SHOP fallback driver to thread its totally-ordered step sequence into
    /// a [`Plan`] so emission doesn't need a second code path; returns
    /// `false` (never expected here, since SHOP steps are already acyclic by
    /// construction) iff the edge would close a cycle.
    pub fn order_after(&mut self, before: StepIndex, after: StepIndex) -> bool {
        let Some(b) = self.steps.get(&before).cloned() else {
            return false;
        };
        let Some(a) = self.steps.get(&after).cloned() else {
            return false;
        };
        self.poset.add_edge(&b.end, &a.start, "<")
    }

    fn poset_node_label(&self, node: StepIndex) -> String {
        let key = node.abs();
        let repr = self.operator_repr(key);
        if node >= 0 {
            format!("+{repr}")
        } else {
            format!("-{repr}")
        }
    }

    /// Canonical `(sorted node labels, sorted labelled edges)` signature of
    /// this plan's poset, used as the isomorphism check in [`Plan::is_duplicate_of`].
    fn poset_signature(&self) -> (Vec<String>, Vec<(String, String, Vec<String>)>) {
        let mut nodes: Vec<String> = self.poset.nodes_iter().map(|&n| self.poset_node_label(n)).collect();
        nodes.sort();

        let mut edges: Vec<(String, String, Vec<String>)> = Vec::new();
        for (u, v) in self.poset.edges() {
            let mut labels: Vec<String> = self
                .poset
                .edge_labels(&u, &v)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            labels.sort();
            edges.push((self.poset_node_label(u), self.poset_node_label(v), labels));
        }
        edges.sort();
        (nodes, edges)
    }

    /// Spec §4.I's plan-equality relation: equal counts of every flaw/step
    /// collection, the same decomposition multiset, the same causal-link and
    /// open-link signature sets, the same abstract-flaw task-name set, and
    /// poset isomorphism under operator-name node labels / relation-name edge
    /// labels. Per the design notes (§9), the stricter isomorphism rule is
    /// used rather than the weaker signature-only one.
    pub fn is_duplicate_of(&self, other: &Plan<'p>) -> bool {
        if self.steps.len() != other.steps.len()
            || self.tasks.len() != other.tasks.len()
            || self.hierarchy.len() != other.hierarchy.len()
            || self.causal_links.len() != other.causal_links.len()
            || self.open_links.len() != other.open_links.len()
            || self.threats.len() != other.threats.len()
            || self.abstract_flaws.len() != other.abstract_flaws.len()
        {
            return false;
        }
        if self.task_method_decomposition != other.task_method_decomposition {
            return false;
        }
        if self.causal_link_signatures != other.causal_link_signatures {
            return false;
        }
        let self_flaw_tasks: HashSet<&Sym> = self.abstract_flaws.iter().map(|f| &f.task).collect();
        let other_flaw_tasks: HashSet<&Sym> = other.abstract_flaws.iter().map(|f| &f.task).collect();
        if self_flaw_tasks != other_flaw_tasks {
            return false;
        }
        let self_ol: HashSet<(AtomId, String)> = self
            .open_links
            .iter()
            .map(|l| (l.atom, self.operator_repr(l.step)))
            .collect();
        let other_ol: HashSet<(AtomId, String)> = other
            .open_links
            .iter()
            .map(|l| (l.atom, other.operator_repr(l.step)))
            .collect();
        if self_ol != other_ol {
            return false;
        }
        self.poset_signature() == other.poset_signature()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::grounding::GroundedProblem;

    fn two_method_problem() -> (Domain, Problem) {
        let domain = Domain {
            name: "d".into(),
            types: vec![],
            constants: vec![],
            predicates: vec![],
            actions: vec![Action {
                name: "noop".into(),
                parameters: vec![],
                precondition: None,
                effect: Some(Formula::And { parts: vec![] }),
            }],
            tasks: vec![Task {
                name: "task".into(),
                parameters: vec![],
                methods: vec![
                    Method {
                        name: "m1".into(),
                        parameters: vec![],
                        task: TaskHead { name: "task".into(), args: vec![] },
                        precondition: None,
                        network: TaskNetwork {
                            subtasks: vec![SubtaskRef { label: "s1".into(), name: "noop".into(), args: vec![] }],
                            ordering: vec![],
                        },
                    },
                    Method {
                        name: "m2".into(),
                        parameters: vec![],
                        task: TaskHead { name: "task".into(), args: vec![] },
                        precondition: None,
                        network: TaskNetwork {
                            subtasks: vec![SubtaskRef { label: "s1".into(), name: "noop".into(), args: vec![] }],
                            ordering: vec![],
                        },
                    },
                ],
            }],
            methods: vec![],
        };
        let problem = Problem {
            name: "p".into(),
            domain: "d".into(),
            objects: vec![],
            init: vec![],
            goal: None,
            htn: Some(TaskNetwork {
                subtasks: vec![SubtaskRef { label: "root".into(), name: "task".into(), args: vec![] }],
                ordering: vec![],
            }),
        };
        (domain, problem)
    }

    #[test]
    fn two_methods_yield_two_terminal_plans() {
        let (domain, problem) = two_method_problem();
        let grounded = GroundedProblem::build(&domain, &problem);
        let mut plan = Plan::new(&grounded, true, true);
        let task_index = plan.add_task("(task)", true);
        let flaw = AbstractFlaw { step: task_index, task: "(task)".to_string() };

        let resolvers = plan.abstract_flaw_resolvers(&flaw);
        assert_eq!(resolvers.len(), 2);
        for r in &resolvers {
            assert!(!r.has_flaws(), "each resolver should be terminal: {:?}", r.abstract_flaws());
            assert_eq!(r.sequential_plan().iter().filter(|(i, _)| *i > 0).count(), 2);
        }
    }

    #[test]
    fn from_root_seeds_one_abstract_flaw_per_root_subtask() {
        let (domain, problem) = two_method_problem();
        let grounded = GroundedProblem::build(&domain, &problem);
        let plan = Plan::from_root(&grounded, true);
        assert_eq!(plan.abstract_flaws().len(), 1);
        assert_eq!(plan.abstract_flaws()[0].task, "(task)");
        assert!(plan.open_links().is_empty());
    }

    #[test]
    fn open_link_resolver_adds_causal_link_and_clears_it() {
        let domain = Domain {
            name: "d".into(),
            types: vec![],
            constants: vec![],
            predicates: vec![Predicate { name: "p".into(), variables: vec![] }],
            actions: vec![
                Action {
                    name: "produce".into(),
                    parameters: vec![],
                    precondition: None,
                    effect: Some(Formula::Atomic { name: "p".into(), args: vec![] }),
                },
                Action {
                    name: "consume".into(),
                    parameters: vec![],
                    precondition: Some(Formula::Atomic { name: "p".into(), args: vec![] }),
                    effect: Some(Formula::And { parts: vec![] }),
                },
            ],
            tasks: vec![],
            methods: vec![],
        };
        let problem = Problem {
            name: "p".into(),
            domain: "d".into(),
            objects: vec![],
            init: vec![],
            goal: None,
            htn: None,
        };
        let grounded = GroundedProblem::build(&domain, &problem);
        let mut plan = Plan::new(&grounded, false, true);
        plan.add_action("(produce)", false);
        plan.add_action("(consume)", false);
        assert_eq!(plan.open_links().len(), 1);
        let link = plan.open_links()[0];
        let resolvers = plan.open_link_resolvers(&link);
        assert_eq!(resolvers.len(), 1);
        assert!(resolvers[0].open_links().is_empty());
    }
}
