//! Threats and abstract flaws: the other two flaw kinds a [`super::Plan`]
//! tracks, alongside the open links of `links.rs`. Grounded on
//! `hipop/plan/plan.py`'s `Threat`/`Decomposition`-adjacent bookkeeping
//! (`__threats_on_action`, `abstract_flaws` property).

use super::links::CausalLink;
use crate::ids::StepIndex;
use crate::symbols::Sym;

/// `step`'s effect may negate (or mutex-conflict with) `link`'s literal
/// between its support and its consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Threat {
    pub step: StepIndex,
    pub link: CausalLink,
}

/// A compound-task step not yet decomposed by a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbstractFlaw {
    pub step: StepIndex,
    pub task: Sym,
}

/// Which method decomposed `flaw.step` and the steps it was expanded into,
/// recorded once `abstract_flaw_resolvers` commits to a choice. Grounded on
/// `hipop/plan/links.py`'s `Decomposition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub method: Sym,
    pub substeps: Vec<StepIndex>,
}
