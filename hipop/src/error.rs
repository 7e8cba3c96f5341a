//! Error kinds, per spec §7. Grounding failures are absorbed locally (an
//! instance is simply dropped), so `GroundingError` is mostly used to carry a
//! reason into a `tracing::debug!` line rather than to abort a run. Search
//! failures are reported as the *absence* of a plan, not as an exception —
//! see [`SearchError`].

use crate::symbols::Sym;
use thiserror::Error;

/// An operator instance is inconsistent with the rigid partition, or has
/// conflicting add/del effects. The instance is dropped by the caller; this
/// type exists so the drop can be logged with a reason.
#[derive(Error, Debug, Clone)]
pub enum GroundingError {
    #[error("precondition of {0} simplifies to false under the rigid partition")]
    ImpossiblePrecondition(String),
    #[error("effect of {0} has overlapping add/delete sets: {1:?}")]
    ContradictoryEffect(String, Vec<Sym>),
    #[error("unbound variable {0} in operator {1}")]
    UnboundVariable(Sym, String),
}

/// Raised while mutating a [`crate::plan::Plan`]; always caught by the
/// caller and turned into "this resolver doesn't apply", never propagated to
/// the user.
#[derive(Error, Debug, Clone, Copy)]
pub enum PlanError {
    #[error("threat has neither a promotion nor a demotion resolver")]
    FlawUnresolvable,
    #[error("ordering edge would close a cycle in the poset")]
    PosetCycle,
}

/// Search-time outcomes that are not exceptions: both are reported to the
/// caller as "no plan was found", per spec §7.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    #[error("search exhausted OPEN without reaching a flawless plan")]
    NoPlan,
    #[error("search was cancelled")]
    Cancelled,
}
