//! Component K: the best-first plan-space search driver.
//!
//! Grounded on `hipop/plan/pop.py`'s `seek_plan` / `seek_plan_dualqueue`: an
//! OPEN priority queue keyed by a selectable evaluation function, a CLOSED
//! list checked by [`crate::plan::Plan::is_duplicate_of`] at expansion time,
//! and a flaw-by-flaw refinement loop per spec §4.K. Duplicate checks run
//! when a plan is popped for expansion rather than when it is generated:
//! the source's own pseudocode inserts a plan into CLOSED before it has ever
//! been popped, which would make the very next "is p in CLOSED" check
//! trivially true for every plan; expansion-time checking is the
//! interpretation that actually prunes duplicate *expansions* rather than
//! vacuously discarding everything. See DESIGN.md.

use crate::config::{DriverKind, EvalStrategy, SearchConfig};
use crate::error::SearchError;
use crate::grounding::GroundedProblem;
use crate::plan::Plan;
use crate::search::order::{self, Flaw};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EvalKey {
    primary: i64,
    secondary: i64,
    tertiary: i64,
}

struct Entry<'p> {
    key: EvalKey,
    seq: u64,
    depth: i64,
    plan: Plan<'p>,
}

impl<'p> PartialEq for Entry<'p> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.seq == other.seq
    }
}
impl<'p> Eq for Entry<'p> {}
impl<'p> PartialOrd for Entry<'p> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<'p> Ord for Entry<'p> {
    /// Reversed so [`BinaryHeap`] (a max-heap) pops the *smallest*
    /// `(key, seq)` first, breaking ties by insertion order per spec §5.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key.cmp(&self.key).then_with(|| other.seq.cmp(&self.seq))
    }
}

fn sum_open_link_hadd(plan: &Plan, problem: &GroundedProblem) -> u32 {
    problem.hadd.sum(plan.open_links().iter().map(|l| l.atom))
}

/// `(Σ h_tdg.cost, Σ h_tdg.modifications, max h_tdg.hadd_max)` over a plan's
/// abstract flaws; flaws whose task never made it into the TDG (dropped as
/// useless) contribute nothing, matching the TDG's own monotone pruning.
fn tdg_totals(plan: &Plan, problem: &GroundedProblem) -> (u32, u32, u32) {
    let mut cost = 0u32;
    let mut modifications = 0u32;
    let mut hadd_max = 0u32;
    for f in plan.abstract_flaws() {
        if let Some(id) = problem.tdg.node_id(&f.task) {
            let c = problem.tdg.cost(id);
            cost = cost.saturating_add(c.cost);
            modifications = modifications.saturating_add(c.modifications);
            hadd_max = hadd_max.max(c.hadd_max);
        }
    }
    (cost, modifications, hadd_max)
}

fn eval_key(plan: &Plan, problem: &GroundedProblem, config: &SearchConfig, depth: i64, iteration: u64) -> EvalKey {
    match config.eval {
        EvalStrategy::Depth => EvalKey {
            primary: depth,
            secondary: 0,
            tertiary: 0,
        },
        EvalStrategy::Bechon => {
            let (tdg_cost, tdg_mods, _) = tdg_totals(plan, problem);
            let h = sum_open_link_hadd(plan, problem).saturating_add(tdg_cost);
            let effort = (plan.open_links().len() as u32).saturating_add(h).saturating_add(tdg_mods);
            EvalKey {
                primary: h as i64,
                secondary: effort as i64,
                tertiary: -(iteration as i64),
            }
        }
        EvalStrategy::HaddMax => {
            let (_, _, hadd_max) = tdg_totals(plan, problem);
            let h = hadd_max.saturating_add(sum_open_link_hadd(plan, problem));
            EvalKey {
                primary: h as i64,
                secondary: 0,
                tertiary: -(iteration as i64),
            }
        }
        EvalStrategy::Dual => unreachable!("Dual is driven by dual_search, not eval_key"),
    }
}

fn enumerate_resolvers<'p>(plan: &Plan<'p>, flaw: &Flaw) -> Vec<Plan<'p>> {
    match flaw {
        Flaw::Threat(t) => plan.threat_resolvers(t),
        Flaw::OpenLink(l) => plan.open_link_resolvers(l),
        Flaw::AbstractFlaw(f) => plan.abstract_flaw_resolvers(f),
    }
}

/// Runs one search loop iteration's worth of bookkeeping shared by every
/// `EvalStrategy`: pop, check terminal, check duplicate, expand, push
/// children. `rank` computes a child's sort key given its parent's depth and
/// a monotonic iteration counter.
fn run_loop<'p>(
    initial: Plan<'p>,
    config: &SearchConfig,
    cancel: &AtomicBool,
    mut rank: impl FnMut(&Plan<'p>, i64, u64) -> EvalKey,
) -> Result<Plan<'p>, SearchError> {
    let mut open: BinaryHeap<Entry<'p>> = BinaryHeap::new();
    let mut closed: Vec<Plan<'p>> = Vec::new();
    let mut seq: u64 = 0;
    let mut iteration: u64 = 0;

    let root_key = rank(&initial, 0, iteration);
    open.push(Entry {
        key: root_key,
        seq,
        depth: 0,
        plan: initial,
    });
    seq += 1;

    while let Some(Entry { plan, depth, .. }) = open.pop() {
        if cancel.load(AtomicOrdering::Relaxed) {
            return Err(SearchError::Cancelled);
        }
        if !plan.has_flaws() {
            return Ok(plan);
        }
        if closed.iter().any(|c| c.is_duplicate_of(&plan)) {
            continue;
        }
        let Some(flaw) = order::next_flaw(&plan, config) else {
            continue;
        };
        let resolvers = enumerate_resolvers(&plan, &flaw);
        if resolvers.is_empty() {
            continue;
        }
        closed.push(plan);
        for r in resolvers {
            if closed.iter().any(|c| c.is_duplicate_of(&r)) {
                continue;
            }
            if config.filter_relaxed && !order::is_resolvable(&r) {
                continue;
            }
            iteration += 1;
            let key = rank(&r, depth - 1, iteration);
            open.push(Entry {
                key,
                seq,
                depth: depth - 1,
                plan: r,
            });
            seq += 1;
        }
    }
    Err(SearchError::NoPlan)
}

/// Two alternating OPEN queues — one keyed by `bechon`, one by `hadd-max` —
/// popped in strict alternation, mirroring `pop.py`'s `seek_plan_dualqueue`.
/// A plan expanded from either queue is still checked against the single
/// shared CLOSED list.
fn dual_search<'p>(
    problem: &'p GroundedProblem,
    initial: Plan<'p>,
    config: &SearchConfig,
    cancel: &AtomicBool,
) -> Result<Plan<'p>, SearchError> {
    let mut bechon_cfg = config.clone();
    bechon_cfg.eval = EvalStrategy::Bechon;
    let mut haddmax_cfg = config.clone();
    haddmax_cfg.eval = EvalStrategy::HaddMax;

    let mut bechon_open: BinaryHeap<Entry<'p>> = BinaryHeap::new();
    let mut haddmax_open: BinaryHeap<Entry<'p>> = BinaryHeap::new();
    let mut closed: Vec<Plan<'p>> = Vec::new();
    let mut seq: u64 = 0;
    let mut iteration: u64 = 0;

    let root_bechon = eval_key(&initial, problem, &bechon_cfg, 0, iteration);
    let root_haddmax = eval_key(&initial, problem, &haddmax_cfg, 0, iteration);
    bechon_open.push(Entry {
        key: root_bechon,
        seq,
        depth: 0,
        plan: initial.clone(),
    });
    seq += 1;
    haddmax_open.push(Entry {
        key: root_haddmax,
        seq,
        depth: 0,
        plan: initial,
    });
    seq += 1;

    let mut use_bechon = true;
    loop {
        if cancel.load(AtomicOrdering::Relaxed) {
            return Err(SearchError::Cancelled);
        }
        let popped = if use_bechon { bechon_open.pop() } else { haddmax_open.pop() };
        use_bechon = !use_bechon;
        let Some(Entry { plan, depth, .. }) = popped else {
            if bechon_open.is_empty() && haddmax_open.is_empty() {
                return Err(SearchError::NoPlan);
            }
            continue;
        };
        if !plan.has_flaws() {
            return Ok(plan);
        }
        if closed.iter().any(|c| c.is_duplicate_of(&plan)) {
            continue;
        }
        let Some(flaw) = order::next_flaw(&plan, config) else {
            continue;
        };
        let resolvers = enumerate_resolvers(&plan, &flaw);
        if resolvers.is_empty() {
            continue;
        }
        closed.push(plan);
        for r in resolvers {
            if closed.iter().any(|c| c.is_duplicate_of(&r)) {
                continue;
            }
            if config.filter_relaxed && !order::is_resolvable(&r) {
                continue;
            }
            iteration += 1;
            let bechon_key = eval_key(&r, problem, &bechon_cfg, depth - 1, iteration);
            let haddmax_key = eval_key(&r, problem, &haddmax_cfg, depth - 1, iteration);
            bechon_open.push(Entry {
                key: bechon_key,
                seq,
                depth: depth - 1,
                plan: r.clone(),
            });
            seq += 1;
            haddmax_open.push(Entry {
                key: haddmax_key,
                seq,
                depth: depth - 1,
                plan: r,
            });
            seq += 1;
        }
    }
}

/// Entry point for component K: dispatches on `config.driver` and
/// `config.eval`, delegating total-order search to [`super::shop`].
pub fn search<'p>(
    problem: &'p GroundedProblem,
    initial: Plan<'p>,
    config: &SearchConfig,
    cancel: &AtomicBool,
) -> Result<Plan<'p>, SearchError> {
    if config.driver == DriverKind::Shop {
        return super::shop::search(problem, config, cancel);
    }
    if config.eval == EvalStrategy::Dual {
        return dual_search(problem, initial, config, cancel);
    }
    run_loop(initial, config, cancel, |plan, depth, iteration| {
        eval_key(plan, problem, config, depth, iteration)
    })
}
