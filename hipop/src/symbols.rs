//! Components A and B: the atom interner and the object/type index.
//!
//! `Sym` follows the convention of the teacher's planning crates
//! (`planning/timelines/src/lib.rs`, `planning/sched/src/lib.rs`): a plain
//! owned `String`, not an interned handle. Atoms are what gets interned here
//! (component A); symbol names themselves are not perf-critical enough to
//! warrant a second interner.

use crate::ids::AtomId;
use hashbrown::HashMap;

/// An object, predicate, type or operator name.
pub type Sym = String;

/// Bijection between `(predicate, arg-tuple)` and a dense [`AtomId`].
///
/// Grounded on `collections::ref_store::RefPool`: a `Vec` for id -> value and
/// a reverse `HashMap` for value -> id, except specialized to the
/// `(Sym, Vec<Sym>)` key so [`AtomTable::iter_ids_of_predicate`] can also
/// maintain a per-predicate index.
#[derive(Debug, Default, Clone)]
pub struct AtomTable {
    by_id: Vec<(Sym, Vec<Sym>)>,
    by_key: HashMap<(Sym, Vec<Sym>), AtomId>,
    by_predicate: HashMap<Sym, Vec<AtomId>>,
}

impl AtomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `(pred, args)`, allocating a fresh one if this is
    /// the first time the pair is seen. The `bool` is `true` iff the id is
    /// newly allocated.
    pub fn intern(&mut self, pred: impl Into<Sym>, args: impl Into<Vec<Sym>>) -> (AtomId, bool) {
        let pred = pred.into();
        let args = args.into();
        let key = (pred.clone(), args.clone());
        if let Some(&id) = self.by_key.get(&key) {
            return (id, false);
        }
        let id = AtomId::from(self.by_id.len());
        self.by_id.push((pred.clone(), args));
        self.by_key.insert(key, id);
        self.by_predicate.entry(pred).or_default().push(id);
        (id, true)
    }

    pub fn decode(&self, id: AtomId) -> (&Sym, &[Sym]) {
        let (pred, args) = &self.by_id[id.index()];
        (pred, args)
    }

    /// `get_or_intern`'s dual: looks up an id without allocating one.
    pub fn get(&self, pred: &str, args: &[Sym]) -> Option<AtomId> {
        // HashMap is keyed by owned (Sym, Vec<Sym>); a throwaway allocation
        // here is cheap relative to grounding and keeps the key type simple.
        self.by_key.get(&(pred.to_string(), args.to_vec())).copied()
    }

    pub fn iter_ids_of_predicate<'a>(&'a self, pred: &str) -> impl Iterator<Item = AtomId> + 'a {
        self.by_predicate
            .get(pred)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AtomId> {
        (0..self.by_id.len()).map(AtomId::from)
    }
}

/// Transitive-closure type index over the domain's `Type(name, supertype)`
/// declarations, rooted at the universal type `"object"`.
///
/// Grounded on `classical/state.rs`'s instances-of-type bookkeeping: a flat
/// map from type name to the set of declared subtypes, with membership
/// resolved by a one-time closure pass rather than recomputed per query.
#[derive(Debug, Default, Clone)]
pub struct TypeIndex {
    /// type -> direct supertype, as declared; `"object"` has no entry.
    supertype_of: HashMap<Sym, Sym>,
    /// type -> objects declared directly of that type (before closure).
    direct_objects: HashMap<Sym, Vec<Sym>>,
    /// type -> objects of that type or any subtype, after `close()`.
    closure: HashMap<Sym, Vec<Sym>>,
    closed: bool,
}

pub const OBJECT_TYPE: &str = "object";

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_type(&mut self, name: impl Into<Sym>, supertype: impl Into<Sym>) {
        self.supertype_of.insert(name.into(), supertype.into());
        self.closed = false;
    }

    pub fn declare_object(&mut self, name: impl Into<Sym>, tpe: impl Into<Sym>) {
        self.direct_objects
            .entry(tpe.into())
            .or_default()
            .push(name.into());
        self.closed = false;
    }

    /// Every declared type plus every type mentioned as a supertype,
    /// deduplicated, always including `"object"`.
    fn all_types(&self) -> Vec<Sym> {
        let mut types: Vec<Sym> = self.supertype_of.keys().cloned().collect();
        for s in self.supertype_of.values() {
            if !types.contains(s) {
                types.push(s.clone());
            }
        }
        for t in self.direct_objects.keys() {
            if !types.contains(t) {
                types.push(t.clone());
            }
        }
        if !types.iter().any(|t| t == OBJECT_TYPE) {
            types.push(OBJECT_TYPE.to_string());
        }
        types
    }

    fn is_subtype_of(&self, tpe: &str, ancestor: &str) -> bool {
        if tpe == ancestor || ancestor == OBJECT_TYPE {
            return true;
        }
        let mut cur = tpe;
        loop {
            match self.supertype_of.get(cur) {
                Some(sup) if sup == ancestor => return true,
                Some(sup) => cur = sup,
                None => return false,
            }
        }
    }

    /// Recomputes `closure` from `supertype_of`/`direct_objects`. Idempotent;
    /// called lazily by [`TypeIndex::objects_of`].
    fn close(&mut self) {
        let types = self.all_types();
        let mut closure: HashMap<Sym, Vec<Sym>> = HashMap::new();
        for t in &types {
            let mut objs = Vec::new();
            for (decl_type, decl_objs) in &self.direct_objects {
                if self.is_subtype_of(decl_type, t) {
                    objs.extend(decl_objs.iter().cloned());
                }
            }
            closure.insert(t.clone(), objs);
        }
        self.closure = closure;
        self.closed = true;
    }

    /// Objects declared of `tpe` or any of its subtypes. `"object"` returns
    /// every declared object.
    pub fn objects_of(&mut self, tpe: &str) -> &[Sym] {
        if !self.closed {
            self.close();
        }
        self.closure.get(tpe).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner_bijection() {
        let mut t = AtomTable::new();
        let (id1, fresh1) = t.intern("at", vec!["a".to_string()]);
        assert!(fresh1);
        let (id2, fresh2) = t.intern("at", vec!["a".to_string()]);
        assert_eq!(id1, id2);
        assert!(!fresh2);
        let (pred, args) = t.decode(id1);
        assert_eq!(pred, "at");
        assert_eq!(args, &["a".to_string()]);
    }

    #[test]
    fn iter_by_predicate() {
        let mut t = AtomTable::new();
        t.intern("at", vec!["a".to_string()]);
        t.intern("at", vec!["b".to_string()]);
        t.intern("holding", vec!["c".to_string()]);
        assert_eq!(t.iter_ids_of_predicate("at").count(), 2);
        assert_eq!(t.iter_ids_of_predicate("holding").count(), 1);
        assert_eq!(t.iter_ids_of_predicate("nope").count(), 0);
    }

    #[test]
    fn type_closure() {
        let mut idx = TypeIndex::new();
        idx.declare_type("room", OBJECT_TYPE);
        idx.declare_type("kitchen", "room");
        idx.declare_object("k1", "kitchen");
        idx.declare_object("r1", "room");
        let mut rooms = idx.objects_of("room").to_vec();
        rooms.sort();
        assert_eq!(rooms, vec!["k1".to_string(), "r1".to_string()]);
        assert_eq!(idx.objects_of("kitchen"), &["k1".to_string()]);
        let mut everything = idx.objects_of(OBJECT_TYPE).to_vec();
        everything.sort();
        assert_eq!(everything, vec!["k1".to_string(), "r1".to_string()]);
    }
}
