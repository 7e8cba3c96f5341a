//! Component L: plan emission.
//!
//! Grounded on `hipop/plan/plan.py`'s IPC-2020 text writer, generalized to
//! write to any `std::io::Write` (per `planning/planning/src/chronicles`'s
//! convention of a writer-based serializer plus a convenience
//! `String`-returning wrapper) rather than only building a string in memory.

use crate::plan::{Decomposition, Plan, StepKind};
use hashbrown::HashSet;
use std::io::{self, Write};

fn write_header(w: &mut impl Write) -> io::Result<()> {
    writeln!(w, "==>")
}

fn write_footer(w: &mut impl Write) -> io::Result<()> {
    writeln!(w, "<==")
}

fn write_primitive_steps(plan: &Plan, w: &mut impl Write) -> io::Result<()> {
    for (idx, step) in plan.sequential_plan() {
        if let StepKind::Action(repr) = &step.kind {
            writeln!(w, "{idx} {repr}")?;
        }
    }
    Ok(())
}

/// Flat IPC-2020 form: the primitive steps in execution order, with no
/// decomposition information.
pub fn write_sequential(plan: &Plan, w: &mut impl Write) -> io::Result<()> {
    write_header(w)?;
    write_primitive_steps(plan, w)?;
    write_footer(w)
}

pub fn sequential(plan: &Plan) -> String {
    let mut buf = Vec::new();
    write_sequential(plan, &mut buf).expect("writing to a Vec<u8> is infallible");
    String::from_utf8(buf).expect("ground terms are valid UTF-8")
}

/// Every task/action step not claimed as a substep of some decomposition:
/// the top-level steps the root task network resolved into directly, in
/// execution order. Mirrors `root()` in the source's plan printer, adapted
/// since this representation has no single step standing in for the root
/// task itself (the root network is a bare subtask list, like a method's).
/// `Method` steps are bracketing nodes with no counterpart in the original
/// and are never themselves root subtasks.
fn root_subtasks(plan: &Plan) -> Vec<i64> {
    let claimed: HashSet<i64> = plan
        .hierarchy()
        .values()
        .flat_map(|d| d.substeps.iter().copied())
        .collect();
    plan.sequential_plan()
        .into_iter()
        .filter(|(idx, step)| {
            matches!(step.kind, StepKind::Action(_) | StepKind::Task(_)) && !claimed.contains(idx)
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// Hierarchical IPC-2020 form: primitive steps, a `root` line naming the
/// root network's direct children, then one decomposition line per refined
/// task, per spec §4.L / §6.
pub fn write_hierarchical(plan: &Plan, w: &mut impl Write) -> io::Result<()> {
    write_header(w)?;
    write_primitive_steps(plan, w)?;

    write!(w, "root")?;
    for r in root_subtasks(plan) {
        write!(w, " {r}")?;
    }
    writeln!(w)?;

    let mut entries: Vec<(&i64, &Decomposition)> = plan.hierarchy().iter().collect();
    entries.sort_by_key(|(idx, _)| **idx);
    for (idx, decomposition) in entries {
        let Some(step) = plan.step(*idx) else {
            continue;
        };
        let StepKind::Task(task_repr) = &step.kind else {
            continue;
        };
        write!(w, "{idx} {task_repr} -> {}", decomposition.method)?;
        for s in &decomposition.substeps {
            write!(w, " {s}")?;
        }
        writeln!(w)?;
    }
    write_footer(w)
}

pub fn hierarchical(plan: &Plan) -> String {
    let mut buf = Vec::new();
    write_hierarchical(plan, &mut buf).expect("writing to a Vec<u8> is infallible");
    String::from_utf8(buf).expect("ground terms are valid UTF-8")
}
