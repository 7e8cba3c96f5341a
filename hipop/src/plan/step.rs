//! A single step of a [`super::Plan`]: either the synthetic `__init` step,
//! a primitive action, or a compound method/task step with a distinct
//! start/end. Grounded on `hipop/plan/plan.py`'s `Step` namedtuple, except
//! the Python `operator` string is split here into a typed `StepKind` so the
//! plan doesn't need to string-match `"__init"` to special-case it.

use crate::ids::StepIndex;
use crate::symbols::Sym;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Step 0 of a plan created with `init = true`: see [`super::Plan::new`].
    Init,
    Action(Sym),
    Method(Sym),
    Task(Sym),
}

impl StepKind {
    /// The ground term to print for this step, e.g. `"(move r1 r2)"`.
    pub fn repr(&self) -> &str {
        match self {
            StepKind::Init => "__init",
            StepKind::Action(r) | StepKind::Method(r) | StepKind::Task(r) => r,
        }
    }
}

/// `start == end` for a primitive (atomic) step; a compound step's `end` is
/// the negation of its `start`, per [`crate::ids::StepIndex`]'s doc comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step {
    pub kind: StepKind,
    pub start: StepIndex,
    pub end: StepIndex,
}

impl Step {
    pub fn is_atomic(&self) -> bool {
        self.start == self.end
    }
}
