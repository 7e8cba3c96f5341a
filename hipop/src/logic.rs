//! Component C: the logical expression kernel.
//!
//! The original planner built preconditions with `pyeda` (see
//! `utils/logic.py`'s `build_expression`); the design notes call for
//! replacing a general Boolean-expression library with a minimal in-tree
//! kernel, so `Expr` only carries the five forms actually needed:
//! `True`, `False`, `Atom`, `Not`, `And`, plus `Forall` as a macro that
//! expands away during [`Expr::build`].

use crate::ast::Formula;
use crate::ids::AtomId;
use crate::symbols::{Sym, TypeIndex};
use fixedbitset::FixedBitSet;
use hashbrown::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    True,
    False,
    Atom(AtomId),
    Not(Box<Expr>),
    And(Vec<Expr>),
}

/// `(positive atoms, negative atoms)` appearing in an expression.
#[derive(Debug, Clone, Default)]
pub struct Support {
    pub pos: FixedBitSet,
    pub neg: FixedBitSet,
}

impl Support {
    fn singleton_pos(id: AtomId, len: usize) -> Self {
        let mut pos = FixedBitSet::with_capacity(len);
        pos.insert(id.index());
        Support {
            pos,
            neg: FixedBitSet::with_capacity(len),
        }
    }

    fn swapped(self) -> Self {
        Support {
            pos: self.neg,
            neg: self.pos,
        }
    }

    fn union_into(&mut self, other: &Support) {
        self.pos.union_with(&other.pos);
        self.neg.union_with(&other.neg);
    }
}

/// Error raised when an atom in a formula refers to a variable that is
/// neither bound in `assignment` nor a literal object name. Grounding drops
/// the instance on this error, per spec §4.E step 2.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unbound variable `{0}` while building an expression")]
pub struct UnboundVariable(pub Sym);

impl Expr {
    /// Builds an expression from a parsed [`Formula`], resolving each
    /// argument through `assignment` (falling back to the literal token
    /// when it is not a bound variable name — matching the original's
    /// `assignment[a]` lookup convention, except we tolerate constants).
    /// `Forall` unfolds into an `And` over every type-conforming assignment
    /// of its variables, drawn from `types`. `When` is unsupported: it logs
    /// and reduces to `False`, per the design notes.
    pub fn build(
        formula: &Formula,
        assignment: &HashMap<Sym, Sym>,
        types: &mut TypeIndex,
        interner: &mut crate::symbols::AtomTable,
    ) -> Result<Expr, UnboundVariable> {
        match formula {
            Formula::Atomic { name, args } => {
                let mut resolved = Vec::with_capacity(args.len());
                for a in args {
                    let v = match assignment.get(a) {
                        Some(bound) => bound.clone(),
                        None => a.clone(),
                    };
                    resolved.push(v);
                }
                let (id, _) = interner.intern(name.clone(), resolved);
                Ok(Expr::Atom(id))
            }
            Formula::Not { inner } => {
                Ok(Expr::Not(Box::new(Expr::build(inner, assignment, types, interner)?)))
            }
            Formula::And { parts } => {
                let mut built = Vec::with_capacity(parts.len());
                for p in parts {
                    built.push(Expr::build(p, assignment, types, interner)?);
                }
                Ok(Expr::And(built))
            }
            Formula::Forall { vars, body } => {
                let mut assignments: Vec<HashMap<Sym, Sym>> = vec![assignment.clone()];
                for v in vars {
                    let objects = types.objects_of(&v.tpe).to_vec();
                    let mut next = Vec::with_capacity(assignments.len() * objects.len());
                    for partial in &assignments {
                        for obj in &objects {
                            let mut extended = partial.clone();
                            extended.insert(v.name.clone(), obj.clone());
                            next.push(extended);
                        }
                    }
                    assignments = next;
                }
                let mut conjuncts = Vec::with_capacity(assignments.len());
                for a in &assignments {
                    conjuncts.push(Expr::build(body, a, types, interner)?);
                }
                Ok(Expr::And(conjuncts))
            }
            Formula::When { .. } => {
                tracing::warn!("conditional effect (When) is unsupported; treating as False");
                Ok(Expr::False)
            }
        }
    }

    /// Pushes `(known_true, known_false)` atom sets down through the tree:
    /// atoms in `known_true` become `True`, atoms in `known_false` become
    /// `False`, `Not` propagates, `And` short-circuits on any `False` child
    /// and drops `True` children.
    pub fn simplify(&self, known_true: &FixedBitSet, known_false: &FixedBitSet) -> Expr {
        match self {
            Expr::True | Expr::False => self.clone(),
            Expr::Atom(id) => {
                if known_true.contains(id.index()) {
                    Expr::True
                } else if known_false.contains(id.index()) {
                    Expr::False
                } else {
                    Expr::Atom(*id)
                }
            }
            Expr::Not(x) => match x.simplify(known_true, known_false) {
                Expr::True => Expr::False,
                Expr::False => Expr::True,
                other => Expr::Not(Box::new(other)),
            },
            Expr::And(parts) => {
                let mut kept = Vec::with_capacity(parts.len());
                for p in parts {
                    match p.simplify(known_true, known_false) {
                        Expr::True => {}
                        Expr::False => return Expr::False,
                        other => kept.push(other),
                    }
                }
                if kept.is_empty() {
                    Expr::True
                } else if kept.len() == 1 {
                    kept.into_iter().next().unwrap()
                } else {
                    Expr::And(kept)
                }
            }
        }
    }

    /// `(positive-set, negative-set)` of atom ids appearing in this
    /// expression, computed bottom-up. `len` is the interner's current atom
    /// count, used to size the bitsets.
    pub fn support(&self, len: usize) -> Support {
        match self {
            Expr::True | Expr::False => Support {
                pos: FixedBitSet::with_capacity(len),
                neg: FixedBitSet::with_capacity(len),
            },
            Expr::Atom(id) => Support::singleton_pos(*id, len),
            Expr::Not(x) => x.support(len).swapped(),
            Expr::And(parts) => {
                let mut s = Support {
                    pos: FixedBitSet::with_capacity(len),
                    neg: FixedBitSet::with_capacity(len),
                };
                for p in parts {
                    s.union_into(&p.support(len));
                }
                s
            }
        }
    }

    /// `true` once no rigid atom (member of either `known_true` or
    /// `known_false`) remains free in the expression; used by grounding's
    /// invariant check after a precondition is simplified with the rigid
    /// partition (spec §3: "after simplification ... no rigid atom
    /// remains").
    pub fn is_free_of(&self, rigid: &FixedBitSet) -> bool {
        match self {
            Expr::True | Expr::False => true,
            Expr::Atom(id) => !rigid.contains(id.index()),
            Expr::Not(x) => x.is_free_of(rigid),
            Expr::And(parts) => parts.iter().all(|p| p.is_free_of(rigid)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::AtomTable;

    fn atom(interner: &mut AtomTable, pred: &str) -> AtomId {
        interner.intern(pred, Vec::<Sym>::new()).0
    }

    #[test]
    fn simplify_and_short_circuits_on_false() {
        let mut interner = AtomTable::new();
        let p = atom(&mut interner, "p");
        let q = atom(&mut interner, "q");
        let e = Expr::And(vec![Expr::Atom(p), Expr::Atom(q)]);
        let mut known_false = FixedBitSet::with_capacity(interner.len());
        known_false.insert(q.index());
        let known_true = FixedBitSet::with_capacity(interner.len());
        assert_eq!(e.simplify(&known_true, &known_false), Expr::False);
    }

    #[test]
    fn simplify_drops_known_true_atoms() {
        let mut interner = AtomTable::new();
        let p = atom(&mut interner, "p");
        let q = atom(&mut interner, "q");
        let e = Expr::And(vec![Expr::Atom(p), Expr::Atom(q)]);
        let mut known_true = FixedBitSet::with_capacity(interner.len());
        known_true.insert(p.index());
        let known_false = FixedBitSet::with_capacity(interner.len());
        assert_eq!(e.simplify(&known_true, &known_false), Expr::Atom(q));
    }

    #[test]
    fn not_support_is_swapped() {
        let mut interner = AtomTable::new();
        let p = atom(&mut interner, "p");
        let e = Expr::Not(Box::new(Expr::Atom(p)));
        let s = e.support(interner.len());
        assert!(s.neg.contains(p.index()));
        assert!(!s.pos.contains(p.index()));
    }
}
