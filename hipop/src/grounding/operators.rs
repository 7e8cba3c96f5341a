//! Component E: grounded operators.
//!
//! Grounded on `grounding/operator.py`'s `WithPrecondition` / `WithEffect` /
//! `GroundedOperator` mixin hierarchy. The design notes call for replacing
//! duck-typed ABC mixins with a tagged variant, so the three concrete Python
//! classes (`GroundedAction`, the commented-out `GroundedMethod`, the
//! commented-out `GroundedTask`) become one [`Operator`] enum with an
//! explicit `{name, assignment, precondition?, effect?, subtasks?}`
//! capability set realized per-variant rather than via inheritance.

use super::{assignments_of, ground_term, Literals};
use crate::ast::{Action, Domain, TaskNetwork};
use crate::logic::Expr;
use crate::symbols::{AtomTable, Sym, TypeIndex};
use fixedbitset::FixedBitSet;
use hashbrown::HashMap;

/// Fields shared by every grounded operator kind, per the design notes'
/// `{name, assignment}` capability set.
#[derive(Debug, Clone)]
pub struct OperatorHeader {
    pub name: Sym,
    pub repr: Sym,
    pub assignment: HashMap<Sym, Sym>,
}

#[derive(Debug, Clone)]
pub struct GroundedAction {
    pub header: OperatorHeader,
    pub precondition: Expr,
    pub adds: FixedBitSet,
    pub dels: FixedBitSet,
    pub cost: u32,
}

#[derive(Debug, Clone)]
pub struct GroundedMethod {
    pub header: OperatorHeader,
    pub precondition: Expr,
    /// Ground term of the task this method decomposes, e.g. `"(deliver p1)"`.
    pub task_repr: Sym,
    /// `subtask label -> grounded child operator repr`.
    pub subtasks: HashMap<Sym, Sym>,
    /// Ordering constraints over subtask labels, transitively closed.
    pub network: crate::poset::IncrementalPoset<Sym>,
}

#[derive(Debug, Clone)]
pub struct GroundedTask {
    pub header: OperatorHeader,
    /// Reprs of the methods that decompose this task; populated by the TDG
    /// once all methods are grounded, since a method only declares its
    /// parent task by ground term.
    pub methods: Vec<Sym>,
}

/// Tagged union standing in for the source's `GroundedAction` / commented
/// `GroundedMethod` / `GroundedTask` mixin triple.
#[derive(Debug, Clone)]
pub enum Operator {
    Action(GroundedAction),
    Method(GroundedMethod),
    Task(GroundedTask),
}

impl Operator {
    pub fn header(&self) -> &OperatorHeader {
        match self {
            Operator::Action(a) => &a.header,
            Operator::Method(m) => &m.header,
            Operator::Task(t) => &t.header,
        }
    }

    pub fn precondition(&self) -> Option<&Expr> {
        match self {
            Operator::Action(a) => Some(&a.precondition),
            Operator::Method(m) => Some(&m.precondition),
            Operator::Task(_) => None,
        }
    }
}

/// An action whose effect is already grounded but whose precondition has
/// not yet been simplified against the rigid partition, because that
/// partition is computed from every action's effect support (spec §4.D) —
/// a dependency cycle the original breaks the same way, by building effects
/// first and preconditions second.
struct RawAction {
    header: OperatorHeader,
    precondition: Expr,
    adds: FixedBitSet,
    dels: FixedBitSet,
}

/// Builds every type-conforming grounding of every declared action's
/// *effect*, deferring precondition simplification to [`simplify_actions`].
/// Returns the raw groundings plus, per action, the `pos ∪ neg` support set
/// [`Literals::compute`] unions to find fluent predicates.
pub(crate) fn ground_actions(
    domain: &Domain,
    types: &mut TypeIndex,
    interner: &mut AtomTable,
) -> (Vec<RawAction>, Vec<FixedBitSet>) {
    let mut raw = Vec::new();
    let mut supports = Vec::new();
    for action in &domain.actions {
        for assignment in assignments_of(&action.parameters, types) {
            let Some(effect_ast) = action.effect.as_ref() else {
                continue;
            };
            let effect = match Expr::build(effect_ast, &assignment, types, interner) {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(action = %action.name, error = %e, "dropping action grounding");
                    continue;
                }
            };
            // Built here, while `interner` is still at hand, and simplified
            // against the rigid partition only once `Literals::compute` has
            // run (see `simplify_actions`): the precondition's *atoms* must
            // exist before the rigid/fluent split can be computed from every
            // action's effect support, but simplification itself needs that
            // split, hence the two-phase split mirroring the source's own
            // effect-before-precondition construction order.
            let precondition = match action.precondition.as_ref() {
                None => Expr::True,
                Some(ast) => match Expr::build(ast, &assignment, types, interner) {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::debug!(action = %action.name, error = %e, "dropping action grounding");
                        continue;
                    }
                },
            };
            let support = effect.support(interner.len());
            let mut combined = support.pos.clone();
            combined.union_with(&support.neg);
            let header = header_for(action, &action.parameters, &assignment);
            supports.push(combined);
            raw.push(RawAction {
                header,
                precondition,
                adds: support.pos,
                dels: support.neg,
            });
        }
    }
    (raw, supports)
}

/// Finishes grounding actions: simplifies each precondition against the
/// rigid partition, drops any grounding whose precondition simplifies to
/// `False` or whose effect has overlapping add/delete sets (spec §4.E
/// steps 2-3), and returns the survivors keyed by ground term.
pub(crate) fn simplify_actions(
    raw: Vec<RawAction>,
    literals: &Literals,
    _atom_count: usize,
) -> HashMap<Sym, GroundedAction> {
    let mut out = HashMap::new();
    for a in raw {
        let precondition = a.precondition.simplify(&literals.rigid_true, &literals.rigid_false);
        if matches!(precondition, Expr::False) {
            tracing::debug!(op = %a.header.repr, "precondition simplifies to False, dropping");
            continue;
        }
        let mut inconsistent = a.adds.clone();
        inconsistent.intersect_with(&a.dels);
        if inconsistent.count_ones(..) > 0 {
            tracing::debug!(op = %a.header.repr, "contradictory effect, dropping");
            continue;
        }
        out.insert(
            a.header.repr.clone(),
            GroundedAction {
                header: a.header,
                precondition,
                adds: a.adds,
                dels: a.dels,
                cost: 1,
            },
        );
    }
    out
}

fn header_for(op_like: &Action, _params: &[crate::ast::Var], assignment: &HashMap<Sym, Sym>) -> OperatorHeader {
    let args: Vec<Sym> = op_like
        .parameters
        .iter()
        .map(|p| assignment.get(&p.name).cloned().unwrap_or_else(|| p.name.clone()))
        .collect();
    OperatorHeader {
        name: op_like.name.clone(),
        repr: ground_term(&op_like.name, args.iter().map(|s| s.as_str())),
        assignment: assignment.clone(),
    }
}

/// Grounds every method in `methods` (the domain's top-level methods plus
/// any declared inline on a [`crate::ast::Task`]: the input shape allows
/// both, see spec §6).
pub(crate) fn ground_methods(
    methods: &[crate::ast::Method],
    types: &mut TypeIndex,
    interner: &mut AtomTable,
    literals: &Literals,
) -> HashMap<Sym, GroundedMethod> {
    let mut out = HashMap::new();
    for method in methods {
        for assignment in assignments_of(&method.parameters, types) {
            let precondition = match &method.precondition {
                None => Expr::True,
                Some(ast) => match Expr::build(ast, &assignment, types, interner) {
                    Ok(e) => e.simplify(&literals.rigid_true, &literals.rigid_false),
                    Err(_) => continue,
                },
            };
            if matches!(precondition, Expr::False) {
                continue;
            }
            let args: Vec<Sym> = method
                .parameters
                .iter()
                .map(|p| assignment.get(&p.name).cloned().unwrap_or_else(|| p.name.clone()))
                .collect();
            let repr = ground_term(&method.name, args.iter().map(|s| s.as_str()));
            let task_args: Vec<Sym> = method
                .task
                .args
                .iter()
                .map(|a| assignment.get(a).cloned().unwrap_or_else(|| a.clone()))
                .collect();
            let task_repr = ground_term(&method.task.name, task_args.iter().map(|s| s.as_str()));
            let (subtasks, network) = ground_network(&method.network, &assignment);
            out.insert(
                repr.clone(),
                GroundedMethod {
                    header: OperatorHeader {
                        name: method.name.clone(),
                        repr,
                        assignment: assignment.clone(),
                    },
                    precondition,
                    task_repr,
                    subtasks,
                    network,
                },
            );
        }
    }
    out
}

/// Grounds a task network's subtask references through `assignment`,
/// returning `label -> grounded child repr` plus the ordering poset over
/// labels (transitively closed, matching `GroundedMethod.__network`'s
/// `.close()` call in the original).
pub(crate) fn ground_network(
    network: &TaskNetwork,
    assignment: &HashMap<Sym, Sym>,
) -> (HashMap<Sym, Sym>, crate::poset::IncrementalPoset<Sym>) {
    let mut subtasks = HashMap::new();
    let mut poset = crate::poset::IncrementalPoset::new();
    for st in &network.subtasks {
        let args: Vec<Sym> = st
            .args
            .iter()
            .map(|a| assignment.get(a).cloned().unwrap_or_else(|| a.clone()))
            .collect();
        let repr = ground_term(&st.name, args.iter().map(|s| s.as_str()));
        subtasks.insert(st.label.clone(), repr);
        poset.add_node(st.label.clone());
    }
    for (before, after) in &network.ordering {
        poset.add_edge(before, after, "<");
    }
    (subtasks, poset)
}

pub(crate) fn ground_tasks(
    domain: &Domain,
    types: &mut TypeIndex,
    _interner: &mut AtomTable,
) -> HashMap<Sym, GroundedTask> {
    let mut out = HashMap::new();
    for task in &domain.tasks {
        for assignment in assignments_of(&task.parameters, types) {
            let args: Vec<Sym> = task
                .parameters
                .iter()
                .map(|p| assignment.get(&p.name).cloned().unwrap_or_else(|| p.name.clone()))
                .collect();
            let repr = ground_term(&task.name, args.iter().map(|s| s.as_str()));
            out.insert(
                repr.clone(),
                GroundedTask {
                    header: OperatorHeader {
                        name: task.name.clone(),
                        repr,
                        assignment,
                    },
                    methods: Vec::new(),
                },
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Object, Predicate, Problem, Var};

    fn simple_domain() -> Domain {
        Domain {
            name: "d".into(),
            types: vec![],
            constants: vec![],
            predicates: vec![Predicate {
                name: "p".into(),
                variables: vec![Var {
                    name: "?x".into(),
                    tpe: "object".into(),
                }],
            }],
            actions: vec![Action {
                name: "noop".into(),
                parameters: vec![],
                precondition: None,
                effect: Some(crate::ast::Formula::And { parts: vec![] }),
            }],
            tasks: vec![],
            methods: vec![],
        }
    }

    #[test]
    fn grounds_a_parameterless_action() {
        let domain = simple_domain();
        let mut types = TypeIndex::new();
        let mut interner = AtomTable::new();
        let (raw, _supports) = ground_actions(&domain, &mut types, &mut interner);
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].header.repr, "(noop)");
    }

    #[test]
    fn drops_action_with_contradictory_effect() {
        use crate::ast::Formula;
        let mut domain = simple_domain();
        domain.actions[0].effect = Some(Formula::And {
            parts: vec![
                Formula::Atomic {
                    name: "p".into(),
                    args: vec!["a".into()],
                },
                Formula::Not {
                    inner: Box::new(Formula::Atomic {
                        name: "p".into(),
                        args: vec!["a".into()],
                    }),
                },
            ],
        });
        let problem = Problem {
            name: "p".into(),
            domain: "d".into(),
            objects: vec![Object {
                name: "a".into(),
                tpe: "object".into(),
            }],
            init: vec![],
            goal: None,
            htn: None,
        };
        let mut types = TypeIndex::new();
        types.declare_object("a", "object");
        let mut interner = AtomTable::new();
        let (raw, supports) = ground_actions(&domain, &mut types, &mut interner);
        let literals = Literals::compute(&domain, &problem, &mut types, &mut interner, supports.iter());
        let actions = simplify_actions(raw, &literals, interner.len());
        assert!(actions.is_empty());
    }
}
