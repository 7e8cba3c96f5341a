//! Component D: literal/fluent classification.
//!
//! Grounded on `grounding/literals.py`'s `Literals` class: enumerate every
//! atom a declared predicate can take over the current object index, split
//! predicates into `rigid`/`fluent` by scanning every action's effect
//! support, then partition atoms into `(rigid_true, rigid_false)` against
//! the problem's initial state.

use crate::ast::{AtomicFormula, Domain, Problem};
use crate::ids::AtomId;
use crate::symbols::{AtomTable, TypeIndex};
use fixedbitset::FixedBitSet;
use hashbrown::HashSet;
use itertools::Itertools;

/// Per-predicate rigid/fluent split plus the initial-state literal sets, as
/// produced by one grounding pass over a domain/problem pair.
#[derive(Debug, Clone)]
pub struct Literals {
    /// Atoms whose predicate is rigid, split `(true-in-init, false-in-init)`.
    pub rigid_true: FixedBitSet,
    pub rigid_false: FixedBitSet,
    /// The mutable part of the initial state: `init_atoms - rigid_true`.
    pub init_state: FixedBitSet,
    /// Every atom whose predicate is fluent (appears in some effect).
    pub fluent_atoms: FixedBitSet,
    pub len: usize,
}

impl Literals {
    /// Enumerates every `(predicate, arg-tuple)` satisfying the domain's
    /// declared predicate arities, interning each one, then computes the
    /// rigid/fluent split and initial-state partition described in spec
    /// §4.D. Takes `effect_supports` (one support-atom iterator per action
    /// effect) rather than re-parsing effects, since by the time this runs
    /// the caller (operators.rs) has already built them once.
    pub fn compute<'a>(
        domain: &Domain,
        problem: &Problem,
        types: &mut TypeIndex,
        interner: &mut AtomTable,
        effect_supports: impl Iterator<Item = &'a FixedBitSet>,
    ) -> Literals {
        for predicate in &domain.predicates {
            Self::enumerate_predicate(predicate, types, interner);
        }
        tracing::info!(predicates = domain.predicates.len(), atoms = interner.len(), "grounded atoms");

        let len = interner.len();
        let mut fluents = FixedBitSet::with_capacity(len);
        for support in effect_supports {
            fluents.union_with(support);
        }
        tracing::debug!(fluents = fluents.count_ones(..), "fluent atoms");

        let fluent_predicates: HashSet<&str> = fluents
            .ones()
            .map(|i| interner.decode(AtomId::from(i)).0.as_str())
            .collect();
        let mut rigid_atoms = FixedBitSet::with_capacity(len);
        for id in interner.iter() {
            let (pred, _) = interner.decode(id);
            if !fluent_predicates.contains(pred.as_str()) {
                rigid_atoms.insert(id.index());
            }
        }

        let mut pb_init = FixedBitSet::with_capacity(len);
        for lit in &problem.init {
            if let Some(id) = interner.get(&lit.name, &lit.args) {
                pb_init.insert(id.index());
            }
        }

        let mut rigid_true = rigid_atoms.clone();
        rigid_true.intersect_with(&pb_init);
        let mut rigid_false = rigid_atoms.clone();
        rigid_false.difference_with(&pb_init);

        tracing::info!(
            rigid_true = rigid_true.count_ones(..),
            rigid_false = rigid_false.count_ones(..),
            "rigid literals"
        );

        let mut init_state = pb_init;
        init_state.difference_with(&rigid_true);

        Literals {
            rigid_true,
            rigid_false,
            init_state,
            fluent_atoms: fluents,
            len,
        }
    }

    fn enumerate_predicate(predicate: &crate::ast::Predicate, types: &mut TypeIndex, interner: &mut AtomTable) {
        let mut assignments: Vec<Vec<String>> = vec![Vec::new()];
        for var in &predicate.variables {
            let objects = types.objects_of(&var.tpe).to_vec();
            assignments = assignments
                .into_iter()
                .cartesian_product(objects)
                .map(|(mut args, obj)| {
                    args.push(obj);
                    args
                })
                .collect();
        }
        for args in assignments {
            interner.intern(predicate.name.clone(), args);
        }
    }

    /// `true` iff no atom of `atom` or any atom in `rigid_false` overlaps
    /// with `other`: used by invariant tests (spec §8.2) to assert no
    /// grounded action's effect contains a rigid atom.
    pub fn is_rigid(&self, atom: AtomId) -> bool {
        self.rigid_true.contains(atom.index()) || self.rigid_false.contains(atom.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Object, Predicate, Var};

    fn minimal_domain() -> Domain {
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
            actions: vec![],
            tasks: vec![],
            methods: vec![],
        }
    }

    #[test]
    fn rigid_when_no_action_touches_predicate() {
        let domain = minimal_domain();
        let problem = Problem {
            name: "p".into(),
            domain: "d".into(),
            objects: vec![Object {
                name: "a".into(),
                tpe: "object".into(),
            }],
            init: vec![AtomicFormula {
                name: "p".into(),
                args: vec!["a".into()],
            }],
            goal: None,
            htn: None,
        };
        let mut types = TypeIndex::new();
        types.declare_object("a", "object");
        let mut interner = AtomTable::new();
        let lits = Literals::compute(&domain, &problem, &mut types, &mut interner, std::iter::empty());
        let id = interner.get("p", &["a".to_string()]).unwrap();
        assert!(lits.rigid_true.contains(id.index()));
        assert!(lits.init_state.is_clear());
    }
}
