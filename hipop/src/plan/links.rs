//! Causal links and open links: the "supported" half of a plan's flaws.
//! Grounded on `hipop/plan/links.py`'s `CausalLink`, generalized from a
//! Python property-bag to a plain struct since there's no lazy `open_link`
//! reference to thread through — a causal link here simply *is* the
//! resolved form of an open link, not a wrapper around one.

use crate::ids::{AtomId, StepIndex};

/// A commitment that `supporter`'s effect establishes `atom` (with the given
/// polarity) for `consumer` to consume, per spec §4.I / GLOSSARY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CausalLink {
    pub supporter: StepIndex,
    pub consumer: StepIndex,
    pub atom: AtomId,
    pub polarity: bool,
}

/// An unsupported precondition atom of `step`, dual to a [`CausalLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenLink {
    pub step: StepIndex,
    pub atom: AtomId,
    pub polarity: bool,
}
