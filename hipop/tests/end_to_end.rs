//! End-to-end scenarios from spec §8: whole-pipeline runs from a hand-built
//! `Domain`/`Problem` AST through `GroundedProblem::build` and `search::search`
//! to a terminal (or absent) plan, exercising the cross-component behavior
//! unit tests within each module can't reach on their own.

use fixedbitset::FixedBitSet;
use hipop::ast::*;
use hipop::config::{DriverKind, SearchConfig};
use hipop::error::SearchError;
use hipop::grounding::GroundedProblem;
use hipop::logic::Expr;
use hipop::plan::Plan;
use hipop::search;
use std::sync::atomic::AtomicBool;

fn atom(name: &str) -> Formula {
    Formula::Atomic { name: name.into(), args: vec![] }
}

/// Re-applies a sequential plan's primitive steps to the problem's initial
/// state, checking at every step that the consumed precondition holds just
/// before the step executes: spec §8's "hierarchical soundness" property.
fn simulate(problem: &GroundedProblem, plan: &Plan) -> FixedBitSet {
    let mut state = problem.literals.init_state.clone();
    for (_, step) in plan.sequential_plan() {
        let repr = step.kind.repr();
        if let Some(action) = problem.actions.get(repr) {
            assert!(
                holds(&action.precondition, &state),
                "precondition of {repr} does not hold when executed"
            );
            for a in action.adds.ones() {
                state.insert(a);
            }
            for d in action.dels.ones() {
                state.set(d, false);
            }
        }
    }
    state
}

fn holds(expr: &Expr, state: &FixedBitSet) -> bool {
    match expr {
        Expr::True => true,
        Expr::False => false,
        Expr::Atom(id) => state.contains(id.index()),
        Expr::Not(x) => !holds(x, state),
        Expr::And(parts) => parts.iter().all(|p| holds(p, state)),
    }
}

/// Unreachable goal (spec §8): one action requires an atom no action ever
/// adds. h_add(a) is infinite, the TDG marks it useless, the only method of
/// the root task becomes useless in turn, and the abstract flaw has zero
/// resolvers, so search must report `NoPlan`.
#[test]
fn unreachable_precondition_yields_no_plan() {
    let domain = Domain {
        name: "d".into(),
        types: vec![],
        constants: vec![],
        predicates: vec![Predicate { name: "p".into(), variables: vec![] }],
        actions: vec![Action {
            name: "a".into(),
            parameters: vec![],
            precondition: Some(atom("p")),
            effect: Some(Formula::And { parts: vec![] }),
        }],
        tasks: vec![Task {
            name: "reach".into(),
            parameters: vec![],
            methods: vec![Method {
                name: "m".into(),
                parameters: vec![],
                task: TaskHead { name: "reach".into(), args: vec![] },
                precondition: None,
                network: TaskNetwork {
                    subtasks: vec![SubtaskRef { label: "s1".into(), name: "a".into(), args: vec![] }],
                    ordering: vec![],
                },
            }],
        }],
        methods: vec![],
    };
    let problem = Problem {
        name: "p".into(),
        domain: "d".into(),
        objects: vec![],
        init: vec![],
        goal: None,
        htn: Some(TaskNetwork {
            subtasks: vec![SubtaskRef { label: "root".into(), name: "reach".into(), args: vec![] }],
            ordering: vec![],
        }),
    };

    let grounded = GroundedProblem::build(&domain, &problem);
    assert!(!grounded.hadd.is_reachable("(a)"), "a should be unreachable under h_add");

    let plan = Plan::from_root(&grounded, true);
    let config = SearchConfig::default();
    let cancel = AtomicBool::new(false);
    let result = search::search(&grounded, plan, &config, &cancel);
    assert_eq!(result.unwrap_err(), SearchError::NoPlan);
}

/// Threat requiring demotion (spec §8): `A` adds `q`, `B` deletes `q`, `C`
/// requires `q`; the root network leaves all three unordered. Once an open
/// link links `A -> C` over `q`, `B` threatens it; both the promotion
/// (`B` before `A`) and demotion (`C` before `B`) resolvers must be
/// available, and the eventual terminal plan must never interleave `B`
/// between `A` and `C`.
#[test]
fn threat_is_resolved_by_either_promotion_or_demotion() {
    let domain = Domain {
        name: "d".into(),
        types: vec![],
        constants: vec![],
        predicates: vec![Predicate { name: "q".into(), variables: vec![] }],
        actions: vec![
            Action {
                name: "A".into(),
                parameters: vec![],
                precondition: None,
                effect: Some(atom("q")),
            },
            Action {
                name: "B".into(),
                parameters: vec![],
                precondition: None,
                effect: Some(Formula::Not { inner: Box::new(atom("q")) }),
            },
            Action {
                name: "C".into(),
                parameters: vec![],
                precondition: Some(atom("q")),
                effect: Some(Formula::And { parts: vec![] }),
            },
        ],
        tasks: vec![],
        methods: vec![],
    };
    let problem = Problem {
        name: "p".into(),
        domain: "d".into(),
        objects: vec![],
        init: vec![],
        goal: None,
        htn: Some(TaskNetwork {
            subtasks: vec![
                SubtaskRef { label: "a".into(), name: "A".into(), args: vec![] },
                SubtaskRef { label: "b".into(), name: "B".into(), args: vec![] },
                SubtaskRef { label: "c".into(), name: "C".into(), args: vec![] },
            ],
            ordering: vec![],
        }),
    };

    let grounded = GroundedProblem::build(&domain, &problem);

    // Directly exercise `threat_resolvers` on the plan state described by
    // the scenario, to confirm both resolutions are offered independently
    // of which one the search driver picks.
    let mut plan = Plan::new(&grounded, false, true);
    let a = plan.add_action("(A)", false);
    let b = plan.add_action("(B)", false);
    let c = plan.add_action("(C)", false);
    let link = plan.open_links()[0];
    assert_eq!(link.step, c);
    let resolved = plan.open_link_resolvers(&link);
    assert_eq!(resolved.len(), 1, "only A supports q");
    let linked = &resolved[0];
    assert_eq!(linked.threats().len(), 1, "B should threaten the new A->C link");
    let threat = linked.threats()[0];
    assert_eq!(threat.step, b);
    let threat_resolutions = linked.threat_resolvers(&threat);
    assert_eq!(threat_resolutions.len(), 2, "both promotion and demotion should be accepted");
    for r in &threat_resolutions {
        assert!(r.threats().is_empty());
        assert!(r.open_links().is_empty());
    }

    // End to end: the full driver must also reach a flawless plan, and that
    // plan's sequential projection must never place B between A and C.
    let config = SearchConfig::default();
    let cancel = AtomicBool::new(false);
    let root_plan = Plan::from_root(&grounded, true);
    let solved = search::search(&grounded, root_plan, &config, &cancel).expect("a plan should be found");
    let order: Vec<String> = solved
        .sequential_plan()
        .into_iter()
        .map(|(_, s)| s.kind.repr().to_string())
        .collect();
    let pos = |n: &str| order.iter().position(|s| s == n).unwrap();
    let (pa, pb, pc) = (pos("(A)"), pos("(B)"), pos("(C)"));
    assert!(
        pb < pa || pb > pc,
        "B must not execute between A and C, got order {order:?}"
    );
    simulate(&grounded, &solved);
}

fn at(arg: &str) -> Formula {
    Formula::Atomic { name: "at".into(), args: vec![arg.into()] }
}

fn mutex_domain_and_problem() -> (Domain, Problem) {
    let domain = Domain {
        name: "d".into(),
        types: vec![Type { name: "loc".into(), supertype: "object".into() }],
        constants: vec![],
        predicates: vec![Predicate { name: "at".into(), variables: vec![Var { name: "l".into(), tpe: "loc".into() }] }],
        actions: vec![
            Action {
                name: "need_a".into(),
                parameters: vec![],
                precondition: Some(at("locA")),
                effect: Some(Formula::And { parts: vec![] }),
            },
            Action {
                name: "move".into(),
                parameters: vec![
                    Var { name: "from".into(), tpe: "loc".into() },
                    Var { name: "to".into(), tpe: "loc".into() },
                ],
                precondition: None,
                effect: Some(Formula::And {
                    parts: vec![at("to"), Formula::Not { inner: Box::new(at("from")) }],
                }),
            },
        ],
        tasks: vec![],
        methods: vec![],
    };
    let problem = Problem {
        name: "p".into(),
        domain: "d".into(),
        objects: vec![
            Object { name: "locA".into(), tpe: "loc".into() },
            Object { name: "locB".into(), tpe: "loc".into() },
            Object { name: "locC".into(), tpe: "loc".into() },
        ],
        init: vec![AtomicFormula { name: "at".into(), args: vec!["locA".into()] }],
        goal: None,
        htn: None,
    };
    (domain, problem)
}

/// Mutex-driven threat (spec §8): `at(?l)` is single-valued over three
/// locations. A causal link supporting `at(locA)` must treat `(move locB
/// locC)` — which never touches `at(locA)` directly, only adds the
/// mutex-conflicting `at(locC)` — as a threat, purely via the mutex table.
#[test]
fn mutex_extends_threat_detection_to_non_deleting_actions() {
    let (domain, problem) = mutex_domain_and_problem();
    let grounded = GroundedProblem::build(&domain, &problem);

    let mut plan = Plan::new(&grounded, true, true);
    let mover = plan.add_action("(move locB locC)", true);
    plan.add_action("(need_a)", true);
    assert_eq!(plan.open_links().len(), 1);
    let link = plan.open_links()[0];

    let resolved = plan.open_link_resolvers(&link);
    assert_eq!(resolved.len(), 1, "only __init supports at(locA) among the plan's steps");
    assert_eq!(resolved[0].threats().len(), 1, "(move locB locC) should threaten at(locA) via mutex");
    assert_eq!(resolved[0].threats()[0].step, mover);
}

/// Negative control: with `threat_mutex` disabled, the same plan must not
/// flag `(move locB locC)`, since it never deletes `at(locA)` directly —
/// confirming the mutex table is what drove the threat above, not some
/// other mechanism.
#[test]
fn without_mutex_the_non_deleting_move_is_not_a_threat() {
    let (domain, problem) = mutex_domain_and_problem();
    let grounded = GroundedProblem::build(&domain, &problem);

    let mut plan = Plan::new(&grounded, true, false);
    plan.add_action("(move locB locC)", true);
    plan.add_action("(need_a)", true);
    let link = plan.open_links()[0];

    let resolved = plan.open_link_resolvers(&link);
    assert_eq!(resolved.len(), 1);
    assert!(resolved[0].threats().is_empty());
}

/// Cancellation (spec §8): raising the stop flag before the first pop must
/// make the driver return `Cancelled` without exploring further.
#[test]
fn cancellation_flag_stops_search_immediately() {
    let domain = Domain {
        name: "d".into(),
        types: vec![],
        constants: vec![],
        predicates: vec![],
        actions: vec![Action {
            name: "noop".into(),
            parameters: vec![],
            precondition: None,
            effect: Some(Formula::And { parts: vec![] }),
        }],
        tasks: vec![],
        methods: vec![],
    };
    let problem = Problem {
        name: "p".into(),
        domain: "d".into(),
        objects: vec![],
        init: vec![],
        goal: None,
        htn: Some(TaskNetwork {
            subtasks: vec![SubtaskRef { label: "s".into(), name: "noop".into(), args: vec![] }],
            ordering: vec![],
        }),
    };
    let grounded = GroundedProblem::build(&domain, &problem);
    let plan = Plan::from_root(&grounded, true);
    let config = SearchConfig::default();
    let cancel = AtomicBool::new(true);
    let result = search::search(&grounded, plan, &config, &cancel);
    assert_eq!(result.unwrap_err(), SearchError::Cancelled);
}

/// Determinism (spec §8): the same problem searched twice under the same
/// configuration must yield plans that are `is_duplicate_of` each other,
/// independent of the absolute step-index numbering each run assigns.
#[test]
fn same_problem_searched_twice_yields_duplicate_plans() {
    let domain = Domain {
        name: "d".into(),
        types: vec![],
        constants: vec![],
        predicates: vec![Predicate { name: "q".into(), variables: vec![] }],
        actions: vec![
            Action {
                name: "produce".into(),
                parameters: vec![],
                precondition: None,
                effect: Some(atom("q")),
            },
            Action {
                name: "consume".into(),
                parameters: vec![],
                precondition: Some(atom("q")),
                effect: Some(Formula::And { parts: vec![] }),
            },
        ],
        tasks: vec![Task {
            name: "job".into(),
            parameters: vec![],
            methods: vec![Method {
                name: "m".into(),
                parameters: vec![],
                task: TaskHead { name: "job".into(), args: vec![] },
                precondition: None,
                network: TaskNetwork {
                    subtasks: vec![
                        SubtaskRef { label: "p".into(), name: "produce".into(), args: vec![] },
                        SubtaskRef { label: "c".into(), name: "consume".into(), args: vec![] },
                    ],
                    ordering: vec![("p".into(), "c".into())],
                },
            }],
        }],
        methods: vec![],
    };
    let problem = Problem {
        name: "p".into(),
        domain: "d".into(),
        objects: vec![],
        init: vec![],
        goal: None,
        htn: Some(TaskNetwork {
            subtasks: vec![SubtaskRef { label: "root".into(), name: "job".into(), args: vec![] }],
            ordering: vec![],
        }),
    };

    let grounded = GroundedProblem::build(&domain, &problem);
    let config = SearchConfig::default();

    let cancel_a = AtomicBool::new(false);
    let plan_a = Plan::from_root(&grounded, true);
    let solved_a = search::search(&grounded, plan_a, &config, &cancel_a).expect("first run finds a plan");

    let cancel_b = AtomicBool::new(false);
    let plan_b = Plan::from_root(&grounded, true);
    let solved_b = search::search(&grounded, plan_b, &config, &cancel_b).expect("second run finds a plan");

    assert!(solved_a.is_duplicate_of(&solved_b));
    simulate(&grounded, &solved_a);
}

/// `DriverKind::Shop` end to end (spec §4.M): task `X` has one method whose
/// expansion is followed by an unreachable action and one method whose
/// expansion is not; both decompose through a shared subtask `T` at the same
/// state. The first method must fail and backtrack without permanently
/// poisoning `T`'s expansion for the second method's different continuation.
#[test]
fn shop_driver_backtracks_across_shared_subtask_without_blocking_second_attempt() {
    let domain = Domain {
        name: "d".into(),
        types: vec![],
        constants: vec![],
        predicates: vec![Predicate { name: "never".into(), variables: vec![] }],
        actions: vec![
            Action {
                name: "step_t".into(),
                parameters: vec![],
                precondition: None,
                effect: Some(Formula::And { parts: vec![] }),
            },
            Action {
                name: "blocker".into(),
                parameters: vec![],
                precondition: Some(atom("never")),
                effect: Some(Formula::And { parts: vec![] }),
            },
            Action {
                name: "finish".into(),
                parameters: vec![],
                precondition: None,
                effect: Some(Formula::And { parts: vec![] }),
            },
        ],
        tasks: vec![
            Task {
                name: "T".into(),
                parameters: vec![],
                methods: vec![Method {
                    name: "m_t".into(),
                    parameters: vec![],
                    task: TaskHead { name: "T".into(), args: vec![] },
                    precondition: None,
                    network: TaskNetwork {
                        subtasks: vec![SubtaskRef { label: "a".into(), name: "step_t".into(), args: vec![] }],
                        ordering: vec![],
                    },
                }],
            },
            Task {
                name: "X".into(),
                parameters: vec![],
                methods: vec![
                    Method {
                        name: "m_x1".into(),
                        parameters: vec![],
                        task: TaskHead { name: "X".into(), args: vec![] },
                        precondition: None,
                        network: TaskNetwork {
                            subtasks: vec![
                                SubtaskRef { label: "t".into(), name: "T".into(), args: vec![] },
                                SubtaskRef { label: "b".into(), name: "blocker".into(), args: vec![] },
                            ],
                            ordering: vec![("t".into(), "b".into())],
                        },
                    },
                    Method {
                        name: "m_x2".into(),
                        parameters: vec![],
                        task: TaskHead { name: "X".into(), args: vec![] },
                        precondition: None,
                        network: TaskNetwork {
                            subtasks: vec![SubtaskRef { label: "t".into(), name: "T".into(), args: vec![] }],
                            ordering: vec![],
                        },
                    },
                ],
            },
        ],
        methods: vec![],
    };
    let problem = Problem {
        name: "p".into(),
        domain: "d".into(),
        objects: vec![],
        init: vec![],
        goal: None,
        htn: Some(TaskNetwork {
            subtasks: vec![
                SubtaskRef { label: "x".into(), name: "X".into(), args: vec![] },
                SubtaskRef { label: "f".into(), name: "finish".into(), args: vec![] },
            ],
            ordering: vec![("x".into(), "f".into())],
        }),
    };

    let grounded = GroundedProblem::build(&domain, &problem);
    let config = SearchConfig {
        driver: DriverKind::Shop,
        ..SearchConfig::default()
    };
    let cancel = AtomicBool::new(false);
    let initial = Plan::from_root(&grounded, config.threat_mutex);
    let solved = search::search(&grounded, initial, &config, &cancel).expect("m_x2 must still be reachable");
    let reprs: Vec<String> = solved
        .sequential_plan()
        .into_iter()
        .map(|(_, s)| s.kind.repr().to_string())
        .collect();
    assert_eq!(reprs, vec!["(step_t)", "(finish)"]);
}
