//! Component J: flaw ordering and the resolvability pre-check.
//!
//! Grounded on `hipop/plan/pop.py`'s `seek_plan`: the same three-tier
//! priority (threats, then open links under a selectable mode, then
//! abstract flaws by start time) and the same "would this plan ever be
//! refinable" filter run before a freshly generated plan is pushed onto
//! OPEN.

use crate::config::{OpenLinkOrder, SearchConfig};
use crate::ids::StepIndex;
use crate::plan::{AbstractFlaw, OpenLink, Plan, Threat};
use hashbrown::HashMap;

#[derive(Debug, Clone)]
pub enum Flaw {
    Threat(Threat),
    OpenLink(OpenLink),
    AbstractFlaw(AbstractFlaw),
}

/// `step id -> position in the sequential projection`, used both to rank
/// `EARLIEST`/chronological flaws and to read off a consumer's "start time".
fn step_positions(plan: &Plan) -> HashMap<StepIndex, usize> {
    plan.sequential_plan()
        .into_iter()
        .enumerate()
        .map(|(pos, (idx, _))| (idx, pos))
        .collect()
}

/// The single next flaw to resolve, per spec §4.J's three tiers. `None` iff
/// `plan.has_flaws()` is false.
pub fn next_flaw(plan: &Plan, config: &SearchConfig) -> Option<Flaw> {
    if let Some(&t) = plan.threats().first() {
        return Some(Flaw::Threat(t));
    }
    if !plan.open_links().is_empty() {
        return Some(Flaw::OpenLink(pick_open_link(plan, config)));
    }
    let positions = step_positions(plan);
    plan.abstract_flaws()
        .iter()
        .min_by_key(|f| positions.get(&f.step).copied().unwrap_or(usize::MAX))
        .cloned()
        .map(Flaw::AbstractFlaw)
}

fn pick_open_link(plan: &Plan, config: &SearchConfig) -> OpenLink {
    let positions = step_positions(plan);
    let earliest = |l: &OpenLink| positions.get(&l.step).copied().unwrap_or(usize::MAX);
    let hadd = |l: &OpenLink| plan.problem().hadd.atom(l.atom);

    let mut links: Vec<(usize, OpenLink)> = plan.open_links().iter().copied().enumerate().collect();
    match config.open_link_order {
        OpenLinkOrder::Lifo => links.sort_by_key(|(i, _)| std::cmp::Reverse(*i)),
        OpenLinkOrder::Earliest => links.sort_by_key(|(i, l)| (earliest(l), std::cmp::Reverse(*i))),
        OpenLinkOrder::Sorted => links.sort_by_key(|(i, l)| (std::cmp::Reverse(hadd(l)), std::cmp::Reverse(*i))),
        OpenLinkOrder::Local => links.sort_by_key(|(i, l)| (std::cmp::Reverse(l.step), std::cmp::Reverse(*i))),
        OpenLinkOrder::LocalEarliest => {
            links.sort_by_key(|(i, l)| (std::cmp::Reverse(l.step), earliest(l), std::cmp::Reverse(*i)))
        }
        OpenLinkOrder::SortedEarliest => {
            links.sort_by_key(|(i, l)| (std::cmp::Reverse(hadd(l)), earliest(l), std::cmp::Reverse(*i)))
        }
    }
    // `open_link_boost`/`prefer_recent_open_link_chain` bias toward the most
    // recently pushed open link (the tail of the insertion-ordered vector)
    // when it ties the primary mode's winner, mirroring `pop.py`'s
    // chain-locality heuristic: a plan that just resolved one link of a
    // causal chain tends to resolve the rest of that chain fastest.
    if (config.open_link_boost || config.prefer_recent_open_link_chain) && links.len() > 1 {
        let (first_i, first_l) = links[0];
        let (last_i, last_l) = *links.last().unwrap();
        let tied = match config.open_link_order {
            OpenLinkOrder::Sorted | OpenLinkOrder::SortedEarliest => hadd(&first_l) == hadd(&last_l),
            OpenLinkOrder::Local | OpenLinkOrder::LocalEarliest => first_l.step == last_l.step,
            _ => false,
        };
        if tied && last_i != first_i {
            links.retain(|&(i, _)| i != last_i);
            links.insert(0, (last_i, last_l));
        }
    }
    links[0].1
}

/// Every open link has a supporter or a still-abstract covering task, every
/// abstract flaw has at least one method resolver, and every threat has at
/// least one accepted promotion/demotion: spec §4.J's pre-check run before a
/// plan is admitted to OPEN.
pub fn is_resolvable(plan: &Plan) -> bool {
    for t in plan.threats() {
        if plan.threat_resolvers(t).is_empty() {
            return false;
        }
    }
    for l in plan.open_links() {
        if plan.open_link_resolvers(l).is_empty() && !plan.has_open_link_task_resolvers(l) {
            return false;
        }
    }
    for f in plan.abstract_flaws() {
        if plan.abstract_flaw_resolvers(f).is_empty() {
            return false;
        }
    }
    true
}
