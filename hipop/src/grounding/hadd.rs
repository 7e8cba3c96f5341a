//! Component F: the h_add heuristic.
//!
//! Grounded on `classical/heuristics.rs`'s `hadd()`: a dirty-bit fixed-point
//! relaxation, except driven over `(Sym, GroundedAction)` pairs rather than
//! `Operators`/`RefStore`, since HTN operator reprs (not dense ids) are the
//! stable key this crate threads through grounding. Matches `hipop/plan/plan.py`'s
//! reliance on per-atom/per-action h_add values for flaw ordering (spec
//! §4.J.2's `SORTED` mode) and for TDG usefulness filtering (spec §4.G).

use super::GroundedAction;
use crate::ids::AtomId;
use crate::symbols::Sym;
use fixedbitset::FixedBitSet;
use hashbrown::HashMap;

pub const INFINITY: u32 = u32::MAX;

/// `h(atom)` and `h(action)` tables computed by one fixed-point pass, per
/// spec §4.F.
#[derive(Debug, Clone)]
pub struct HaddTable {
    atom_cost: Vec<u32>,
    action_cost: HashMap<Sym, u32>,
}

impl HaddTable {
    /// Runs the Vidal fixed-point algorithm: `h(atom) = 0` for every atom in
    /// `init`, `+infinity` otherwise; actions are repeatedly relaxed until no
    /// `h` value decreases further. Negative preconditions are ignored
    /// (delete-relaxation), per spec §4.F's closing note.
    pub fn compute(actions: &HashMap<Sym, GroundedAction>, init: &FixedBitSet) -> HaddTable {
        let atom_count = init.len();
        let mut atom_cost = vec![INFINITY; atom_count];
        for a in init.ones() {
            atom_cost[a] = 0;
        }

        let keys: Vec<Sym> = actions.keys().cloned().collect();
        let preconditions: HashMap<Sym, FixedBitSet> = keys
            .iter()
            .map(|k| (k.clone(), positive_preconditions(&actions[k])))
            .collect();
        // `dependent_on(atom) -> actions whose precondition mentions it`,
        // mirroring `ops.dependent_on(lit)` in the teacher's heuristic, kept
        // once rather than recomputed inside the fixed-point loop.
        let mut dependent_on: Vec<Vec<Sym>> = vec![Vec::new(); atom_count];
        for k in &keys {
            for atom in preconditions[k].ones() {
                dependent_on[atom].push(k.clone());
            }
        }

        let mut action_cost: HashMap<Sym, u32> = keys.iter().map(|k| (k.clone(), INFINITY)).collect();
        let mut dirty: HashMap<Sym, bool> = keys
            .iter()
            .map(|k| (k.clone(), preconditions[k].count_ones(..) == 0))
            .collect();
        for a in init.ones() {
            for k in &dependent_on[a] {
                dirty.insert(k.clone(), true);
            }
        }

        let mut again = true;
        while again {
            again = false;
            for key in &keys {
                if !dirty[key] {
                    continue;
                }
                dirty.insert(key.clone(), false);
                let action = &actions[key];
                let c = sum_cost(&preconditions[key], &atom_cost);
                if c < action_cost[key] {
                    action_cost.insert(key.clone(), c);
                    let g = c.saturating_add(action.cost);
                    for add in action.adds.ones() {
                        if g < atom_cost[add] {
                            atom_cost[add] = g;
                            again = true;
                            for dependent in &dependent_on[add] {
                                dirty.insert(dependent.clone(), true);
                            }
                        }
                    }
                }
            }
        }

        HaddTable { atom_cost, action_cost }
    }

    pub fn atom(&self, id: AtomId) -> u32 {
        self.atom_cost.get(id.index()).copied().unwrap_or(INFINITY)
    }

    pub fn action(&self, repr: &str) -> u32 {
        self.action_cost.get(repr).copied().unwrap_or(INFINITY)
    }

    pub fn is_reachable(&self, repr: &str) -> bool {
        self.action(repr) != INFINITY
    }

    /// Sum of `h(atom)` over an arbitrary set of atom ids, saturating at
    /// [`INFINITY`]; used for the `SORTED`/`bechon`/`hadd-max` flaw and plan
    /// evaluation functions (spec §4.J.2, §4.K).
    pub fn sum(&self, atoms: impl IntoIterator<Item = AtomId>) -> u32 {
        let mut total: u32 = 0;
        for a in atoms {
            total = total.saturating_add(self.atom(a));
            if total == INFINITY {
                return INFINITY;
            }
        }
        total
    }
}

fn positive_preconditions(action: &GroundedAction) -> FixedBitSet {
    action.precondition.support(action.adds.len()).pos
}

fn sum_cost(atoms: &FixedBitSet, atom_cost: &[u32]) -> u32 {
    let mut total: u32 = 0;
    for a in atoms.ones() {
        let c = atom_cost.get(a).copied().unwrap_or(INFINITY);
        if c == INFINITY {
            return INFINITY;
        }
        total = total.saturating_add(c);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grounding::operators::OperatorHeader;
    use crate::logic::Expr;

    fn action(repr: &str, pre: Expr, adds: &[usize], len: usize) -> GroundedAction {
        let mut adds_bs = FixedBitSet::with_capacity(len);
        for &a in adds {
            adds_bs.insert(a);
        }
        GroundedAction {
            header: OperatorHeader {
                name: repr.to_string(),
                repr: repr.to_string(),
                assignment: HashMap::new(),
            },
            precondition: pre,
            adds: adds_bs,
            dels: FixedBitSet::with_capacity(len),
            cost: 1,
        }
    }

    #[test]
    fn reachable_action_gets_finite_cost() {
        let len = 2;
        let mut actions = HashMap::new();
        actions.insert(
            "(a)".to_string(),
            action("(a)", Expr::Atom(AtomId::from(0usize)), &[1], len),
        );
        let mut init = FixedBitSet::with_capacity(len);
        init.insert(0);
        let table = HaddTable::compute(&actions, &init);
        assert_eq!(table.atom(AtomId::from(0usize)), 0);
        assert_eq!(table.atom(AtomId::from(1usize)), 1);
        assert!(table.is_reachable("(a)"));
    }

    #[test]
    fn unreachable_precondition_yields_infinite_cost() {
        let len = 2;
        let mut actions = HashMap::new();
        actions.insert(
            "(a)".to_string(),
            action("(a)", Expr::Atom(AtomId::from(0usize)), &[1], len),
        );
        let init = FixedBitSet::with_capacity(len);
        let table = HaddTable::compute(&actions, &init);
        assert_eq!(table.atom(AtomId::from(0usize)), INFINITY);
        assert!(!table.is_reachable("(a)"));
    }
}
