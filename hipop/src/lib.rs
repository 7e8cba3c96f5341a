//! A hierarchical partial-order planner (HiPOP) for HTN problems expressed
//! in a PDDL/HDDL-like language.
//!
//! The pipeline runs leaf-first: [`symbols`] builds the object/type index,
//! [`grounding`] instantiates actions/methods/tasks and computes the h_add
//! heuristic and the task decomposition graph, [`plan`] is the partial-order
//! plan refined by [`search`], and [`emit`] serializes a terminal plan.

pub mod ast;
pub mod config;
pub mod emit;
pub mod error;
pub mod grounding;
pub mod ids;
pub mod logic;
pub mod plan;
pub mod poset;
pub mod search;
pub mod symbols;

pub use error::{GroundingError, PlanError, SearchError};
