//! External AST shapes, per spec §6. This is the boundary the surface
//! parser hands off to: nothing here builds or interprets a formula, it
//! only names the shape a `Domain`/`Problem` arrives in. `serde::Deserialize`
//! lets `hipop-cli` read it straight off a JSON document; the parser itself
//! is out of scope.

use crate::symbols::Sym;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Var {
    pub name: Sym,
    #[serde(rename = "type")]
    pub tpe: Sym,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Type {
    pub name: Sym,
    pub supertype: Sym,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Object {
    pub name: Sym,
    #[serde(rename = "type")]
    pub tpe: Sym,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Predicate {
    pub name: Sym,
    pub variables: Vec<Var>,
}

/// One node of a formula tree, as produced by the parser. `When` is parsed
/// but never supported past grounding: see [`crate::logic::Expr::build`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Formula {
    #[serde(rename = "atom")]
    Atomic { name: Sym, args: Vec<Sym> },
    #[serde(rename = "not")]
    Not { inner: Box<Formula> },
    #[serde(rename = "and")]
    And { parts: Vec<Formula> },
    #[serde(rename = "forall")]
    Forall { vars: Vec<Var>, body: Box<Formula> },
    #[serde(rename = "when")]
    When {
        condition: Box<Formula>,
        effect: Box<Formula>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Action {
    pub name: Sym,
    pub parameters: Vec<Var>,
    pub precondition: Option<Formula>,
    pub effect: Option<Formula>,
}

/// A labelled reference to a subtask within a method's network: `label`
/// names the network node, `(name, args)` is the task/action it invokes
/// with each parameter either a method parameter or a literal object name.
#[derive(Debug, Clone, Deserialize)]
pub struct SubtaskRef {
    pub label: Sym,
    pub name: Sym,
    pub args: Vec<Sym>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskNetwork {
    pub subtasks: Vec<SubtaskRef>,
    /// `(before-label, after-label)` ordering constraints, not necessarily
    /// transitively closed in the input.
    pub ordering: Vec<(Sym, Sym)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskHead {
    pub name: Sym,
    pub args: Vec<Sym>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Method {
    pub name: Sym,
    pub parameters: Vec<Var>,
    pub task: TaskHead,
    pub precondition: Option<Formula>,
    pub network: TaskNetwork,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub name: Sym,
    pub parameters: Vec<Var>,
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Domain {
    pub name: Sym,
    pub types: Vec<Type>,
    #[serde(default)]
    pub constants: Vec<Object>,
    pub predicates: Vec<Predicate>,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtomicFormula {
    pub name: Sym,
    pub args: Vec<Sym>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Problem {
    pub name: Sym,
    pub domain: Sym,
    pub objects: Vec<Object>,
    pub init: Vec<AtomicFormula>,
    #[serde(default)]
    pub goal: Option<Formula>,
    /// Root task network, in the same shape as a method's network; absent
    /// for classical (non-HTN) problems.
    #[serde(default)]
    pub htn: Option<TaskNetwork>,
}
