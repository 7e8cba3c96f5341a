//! Optional mutex table extending threat detection, per spec §4.I's closing
//! paragraph: "predicates whose grounded atoms form a single-valued fluent,
//! i.e. each action that changes them deletes exactly one and adds exactly
//! one". Grounded on the same predicate-scanning style as `literals.rs`'s
//! rigid/fluent split, except the scan is over actions' per-predicate
//! add/delete counts rather than over supports.

use super::GroundedAction;
use crate::ids::AtomId;
use crate::symbols::{AtomTable, Sym};
use fixedbitset::FixedBitSet;
use hashbrown::{HashMap, HashSet};

/// `atom -> every other atom of the same single-valued predicate`. Empty for
/// atoms whose predicate isn't single-valued (or wasn't touched by any
/// action at all).
#[derive(Debug, Clone, Default)]
pub struct MutexTable {
    groups: HashMap<AtomId, FixedBitSet>,
}

impl MutexTable {
    pub fn compute(actions: &HashMap<Sym, GroundedAction>, interner: &AtomTable, atom_count: usize) -> MutexTable {
        let mut single_valued: HashMap<Sym, bool> = HashMap::new();
        let mut touched: HashSet<Sym> = HashSet::new();

        for action in actions.values() {
            let mut adds_per_pred: HashMap<&str, usize> = HashMap::new();
            let mut dels_per_pred: HashMap<&str, usize> = HashMap::new();
            for a in action.adds.ones() {
                let (pred, _) = interner.decode(AtomId::from(a));
                *adds_per_pred.entry(pred.as_str()).or_insert(0) += 1;
            }
            for a in action.dels.ones() {
                let (pred, _) = interner.decode(AtomId::from(a));
                *dels_per_pred.entry(pred.as_str()).or_insert(0) += 1;
            }
            for pred in adds_per_pred.keys().chain(dels_per_pred.keys()).copied().collect::<HashSet<_>>() {
                touched.insert(pred.to_string());
                let adds = adds_per_pred.get(pred).copied().unwrap_or(0);
                let dels = dels_per_pred.get(pred).copied().unwrap_or(0);
                let exchanges_one_for_one = (adds == 0 && dels == 0) || (adds == 1 && dels == 1);
                let entry = single_valued.entry(pred.to_string()).or_insert(true);
                *entry = *entry && exchanges_one_for_one;
            }
        }

        let mut groups: HashMap<AtomId, FixedBitSet> = HashMap::new();
        for pred in touched {
            if !*single_valued.get(&pred).unwrap_or(&false) {
                continue;
            }
            let ids: Vec<AtomId> = interner.iter_ids_of_predicate(&pred).collect();
            if ids.len() < 2 {
                continue;
            }
            for &id in &ids {
                let mut bs = FixedBitSet::with_capacity(atom_count);
                for &other in &ids {
                    if other != id {
                        bs.insert(other.index());
                    }
                }
                groups.insert(id, bs);
            }
        }
        MutexTable { groups }
    }

    pub fn mutex_of(&self, atom: AtomId) -> Option<&FixedBitSet> {
        self.groups.get(&atom)
    }
}
