//! The grounding pipeline: components D through G. [`GroundedProblem`] ties
//! literals, operators, the h_add table and the task decomposition graph
//! into the single immutable value the search driver (component K/M) shares
//! across every plan in a run, per spec §5's "shared resource discipline".

pub mod hadd;
pub mod literals;
pub mod mutex;
pub mod operators;
pub mod tdg;

use crate::ast::{Domain, Problem, Var};
use crate::symbols::{AtomTable, Sym, TypeIndex};
use hashbrown::HashMap;
use itertools::Itertools;

pub use hadd::HaddTable;
pub use literals::Literals;
pub use mutex::MutexTable;
pub use operators::{GroundedAction, GroundedMethod, GroundedTask, Operator, OperatorHeader};
pub use tdg::{TaskDecompositionGraph, TdgNodeId};

/// Every type-conforming assignment of `vars`' names to objects, built as a
/// cartesian product over [`TypeIndex::objects_of`]. Shared by literal
/// enumeration, operator grounding and `Forall` expansion.
pub(crate) fn assignments_of(vars: &[Var], types: &mut TypeIndex) -> Vec<HashMap<Sym, Sym>> {
    let mut partials: Vec<HashMap<Sym, Sym>> = vec![HashMap::new()];
    for v in vars {
        let objects = types.objects_of(&v.tpe).to_vec();
        partials = partials
            .into_iter()
            .cartesian_product(objects)
            .map(|(mut a, obj)| {
                a.insert(v.name.clone(), obj);
                a
            })
            .collect();
    }
    partials
}

/// Canonical ground-term string `"(name arg1 arg2 ...)"`, per spec §4.E.4.
pub(crate) fn ground_term(name: &str, args: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    let mut s = String::from("(");
    s.push_str(name);
    for a in args {
        s.push(' ');
        s.push_str(a.as_ref());
    }
    s.push(')');
    s
}

/// The fully grounded, immutable view of a domain/problem pair: shared by
/// reference across every plan produced during a search run.
#[derive(Debug)]
pub struct GroundedProblem {
    pub types: TypeIndex,
    pub interner: AtomTable,
    pub literals: Literals,
    pub actions: HashMap<Sym, GroundedAction>,
    pub methods: HashMap<Sym, GroundedMethod>,
    pub tasks: HashMap<Sym, GroundedTask>,
    pub hadd: HaddTable,
    pub tdg: TaskDecompositionGraph,
    pub mutex: MutexTable,
    /// Root task network of the problem (`htn` in the input AST), with
    /// subtask labels already resolved to grounded operator reprs.
    pub root_network: RootNetwork,
}

/// The root task network, translated the same way a method's network is:
/// see [`GroundedMethod::subtasks`] and [`GroundedMethod::network`].
#[derive(Debug, Clone, Default)]
pub struct RootNetwork {
    pub subtasks: HashMap<Sym, Sym>,
    pub network: crate::poset::IncrementalPoset<Sym>,
}

impl GroundedProblem {
    /// Grounds with HTN BFS projection enabled, per spec §4.G's default. See
    /// [`GroundedProblem::build_with_options`] for the `--no-htn` knob.
    pub fn build(domain: &Domain, problem: &Problem) -> GroundedProblem {
        Self::build_with_options(domain, problem, true)
    }

    /// `htn_projection = false` mirrors the CLI's `--no-htn` flag (spec §6):
    /// the TDG still seeds `useless` from h_add-unreachable actions and
    /// condenses SCCs, but skips the BFS reachability restriction from the
    /// root task, so nodes unreachable from the root but otherwise useful
    /// are kept.
    pub fn build_with_options(domain: &Domain, problem: &Problem, htn_projection: bool) -> GroundedProblem {
        let mut types = TypeIndex::new();
        for t in &domain.types {
            types.declare_type(t.name.clone(), t.supertype.clone());
        }
        for c in &domain.constants {
            types.declare_object(c.name.clone(), c.tpe.clone());
        }
        for o in &problem.objects {
            types.declare_object(o.name.clone(), o.tpe.clone());
        }

        let mut interner = AtomTable::new();
        let (actions, action_supports) = operators::ground_actions(domain, &mut types, &mut interner);
        let literals = Literals::compute(
            domain,
            problem,
            &mut types,
            &mut interner,
            action_supports.iter(),
        );

        let actions = operators::simplify_actions(actions, &literals, interner.len());
        let mut all_methods = domain.methods.clone();
        for t in &domain.tasks {
            all_methods.extend(t.methods.clone());
        }
        let methods = operators::ground_methods(&all_methods, &mut types, &mut interner, &literals);
        let mut tasks = operators::ground_tasks(domain, &mut types, &mut interner);
        for m in methods.values() {
            if let Some(task) = tasks.get_mut(&m.task_repr) {
                task.methods.push(m.header.repr.clone());
            }
        }

        let hadd = HaddTable::compute(&actions, &literals.init_state);
        let mutex = MutexTable::compute(&actions, &interner, interner.len());

        let root_network = problem
            .htn
            .as_ref()
            .map(|net| operators::ground_network(net, &HashMap::new()))
            .unwrap_or_default();
        let root_network = RootNetwork {
            subtasks: root_network.0,
            network: root_network.1,
        };

        let root_task_names: Vec<Sym> = if htn_projection {
            root_network
                .subtasks
                .values()
                .filter_map(|repr| tasks.keys().find(|k| *k == repr).cloned())
                .collect()
        } else {
            Vec::new()
        };

        let tdg = TaskDecompositionGraph::build(&actions, &methods, &tasks, &hadd, &root_task_names);

        GroundedProblem {
            types,
            interner,
            literals,
            actions,
            methods,
            tasks,
            hadd,
            tdg,
            mutex,
            root_network,
        }
    }
}
