//! Component M: classical total-order SHOP-like search.
//!
//! Grounded on `hipop/plan/shop.py`: depth-first method selection over a
//! totally-ordered task list, backtracking on failure, applying each
//! primitive action against a concrete state as soon as it is chosen rather
//! than deferring causal-link bookkeeping. `seen` cuts duplicate action
//! attempts; `decomposed` is a stack-scoped `(method, state)` recursion
//! guard, pushed right before descending into a method's expansion and
//! popped right after, the same push/pop discipline as the original's
//! `seek_plan`.

use crate::error::SearchError;
use crate::grounding::GroundedProblem;
use crate::logic::Expr;
use crate::symbols::Sym;
use fixedbitset::FixedBitSet;
use hashbrown::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// One emitted primitive step, in application order.
#[derive(Debug, Clone)]
pub struct ShopStep {
    pub repr: Sym,
}

fn holds(expr: &Expr, state: &FixedBitSet) -> bool {
    match expr {
        Expr::True => true,
        Expr::False => false,
        Expr::Atom(id) => state.contains(id.index()),
        Expr::Not(x) => !holds(x, state),
        Expr::And(parts) => parts.iter().all(|p| holds(p, state)),
    }
}

fn apply(action_repr: &str, problem: &GroundedProblem, state: &mut FixedBitSet) {
    let action = &problem.actions[action_repr];
    for a in action.adds.ones() {
        state.insert(a);
    }
    for d in action.dels.ones() {
        state.set(d, false);
    }
}

/// State fingerprint for the `seen`/`decomposed` memo sets: cheap and exact,
/// since `FixedBitSet` hashes its backing words.
fn state_key(state: &FixedBitSet) -> Vec<u32> {
    state.as_slice().to_vec()
}

struct Search<'p, 'c> {
    problem: &'p GroundedProblem,
    seen: HashSet<(Vec<u32>, Sym)>,
    /// `(method, state)` pairs currently being expanded on the call stack;
    /// scoped to one descent, not a permanent memo (see [`Search::solve`]).
    decomposed: HashSet<(Sym, Vec<u32>)>,
    cancel: &'c AtomicBool,
}

impl<'p, 'c> Search<'p, 'c> {
    /// Depth-first descent over a totally ordered task list `tasks`
    /// (ground-term reprs of actions or compound tasks), threading `state`
    /// and accumulating `plan` in place. Returns `false` (leaving `plan`
    /// unspecified beyond what was pushed) on backtrack-exhaustion.
    fn solve(&mut self, tasks: &[Sym], state: &mut FixedBitSet, plan: &mut Vec<ShopStep>) -> Result<bool, SearchError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(SearchError::Cancelled);
        }
        let Some((head, rest)) = tasks.split_first() else {
            return Ok(true);
        };
        if let Some(action) = self.problem.actions.get(head) {
            let key = (state_key(state), head.clone());
            if self.seen.contains(&key) {
                return Ok(false);
            }
            if !holds(&action.precondition, state) {
                self.seen.insert(key);
                return Ok(false);
            }
            let checkpoint = state.clone();
            apply(head, self.problem, state);
            plan.push(ShopStep { repr: head.clone() });
            if self.solve(rest, state, plan)? {
                return Ok(true);
            }
            plan.pop();
            *state = checkpoint;
            self.seen.insert(key);
            return Ok(false);
        }

        let Some(task) = self.problem.tasks.get(head) else {
            return Ok(false);
        };
        for method_repr in &task.methods {
            let Some(method) = self.problem.methods.get(method_repr) else {
                continue;
            };
            if !holds(&method.precondition, state) {
                continue;
            }
            let dkey = (method_repr.clone(), state_key(state));
            if self.decomposed.contains(&dkey) {
                continue;
            }
            let ordered_labels = method.network.topological_sort(None);
            let mut subtasks: Vec<Sym> = ordered_labels
                .into_iter()
                .filter_map(|label| method.subtasks.get(&label).cloned())
                .collect();
            subtasks.extend_from_slice(rest);
            let checkpoint = state.clone();
            let mark = plan.len();
            self.decomposed.insert(dkey.clone());
            let result = self.solve(&subtasks, state, plan)?;
            self.decomposed.remove(&dkey);
            if result {
                return Ok(true);
            }
            plan.truncate(mark);
            *state = checkpoint;
        }
        Ok(false)
    }
}

/// Runs total-order SHOP search from the problem's root task network,
/// flattened into a single totally-ordered task list via its subtask poset.
/// Returns the primitive steps in execution order, or [`SearchError::NoPlan`]
/// if every branch backtracks to exhaustion.
pub fn search_steps<'p>(problem: &'p GroundedProblem, cancel: &AtomicBool) -> Result<Vec<ShopStep>, SearchError> {
    let root_labels = problem.root_network.network.topological_sort(None);
    let root_tasks: Vec<Sym> = root_labels
        .into_iter()
        .filter_map(|label| problem.root_network.subtasks.get(&label).cloned())
        .collect();

    let mut state = problem.literals.init_state.clone();
    let mut plan = Vec::new();
    let mut search = Search {
        problem,
        seen: HashSet::new(),
        decomposed: HashSet::new(),
        cancel,
    };
    if search.solve(&root_tasks, &mut state, &mut plan)? {
        Ok(plan)
    } else {
        Err(SearchError::NoPlan)
    }
}

/// Adapter matching [`super::driver::search`]'s signature: SHOP has no
/// partial-order plan to return, so its primitive sequence is wrapped into a
/// fully-linear [`crate::plan::Plan`] (every step ordered after the last) so
/// callers downstream of the driver (emission) don't need a second code
/// path.
pub fn search<'p>(
    problem: &'p GroundedProblem,
    config: &crate::config::SearchConfig,
    cancel: &AtomicBool,
) -> Result<crate::plan::Plan<'p>, SearchError> {
    let steps = search_steps(problem, cancel)?;
    let mut plan = crate::plan::Plan::new(problem, true, config.threat_mutex);
    let mut previous = plan.init_step();
    for step in steps {
        let idx = plan.add_action(step.repr, false);
        if let Some(prev) = previous {
            plan.order_after(prev, idx);
        }
        previous = Some(idx);
    }
    Ok(plan)
}
