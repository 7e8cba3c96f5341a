//! `hipop`: a thin driver shell around the [`hipop`] library, following
//! `planning/model/src/main.rs` and `planning/planners/src/bin/plannerosp.rs`'s
//! division of labor — parse CLI flags, set up logging, load input, call into
//! the library, print the result. The PDDL/HDDL surface syntax is out of
//! scope (spec §1): this binary reads the already-parsed domain/problem AST
//! (§6) serialized as JSON, which stands in for whatever surface parser a
//! caller supplies.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use hipop::ast::{Domain, Problem};
use hipop::config::{DriverKind, EvalStrategy, OpenLinkOrder, SearchConfig};
use hipop::emit;
use hipop::grounding::GroundedProblem;
use hipop::plan::Plan;

/// A hierarchical partial-order planner for HTN problems.
#[derive(Parser, Debug)]
#[command(name = "hipop", author, version, about, long_about = None)]
struct Opt {
    /// Path to the domain, as the §6 AST shape serialized as JSON.
    domain: PathBuf,
    /// Path to the problem, as the §6 AST shape serialized as JSON.
    problem: PathBuf,

    /// Run the classical total-order SHOP-like fallback instead of
    /// partial-order plan-space search.
    #[arg(long, conflicts_with = "pop")]
    shop: bool,
    /// Run partial-order plan-space search (the default).
    #[arg(long)]
    pop: bool,

    /// Emit the hierarchical IPC-2020 form (root line plus decompositions)
    /// instead of the flat sequential form.
    #[arg(long)]
    hierarchical: bool,

    /// Use the incremental poset for precedence queries (the default; the
    /// flag exists to mirror the reference CLI surface of spec §6 — this
    /// implementation has no alternate poset backend to switch away from).
    #[arg(long, default_value_t = true)]
    incremental_poset: bool,

    /// Use the dual-queue evaluation strategy (`--dq`) instead of `bechon`.
    #[arg(long = "dq")]
    dual_queue: bool,
    /// Select `hadd-max` as the evaluation strategy instead of `bechon`.
    #[arg(long = "h2")]
    hadd_max: bool,
    /// Select `depth` as the evaluation strategy instead of `bechon`.
    #[arg(long = "h1")]
    depth: bool,

    /// Open-link flaw ordering mode.
    #[arg(long = "ol-sort", value_enum, default_value_t = OlSort::Lifo)]
    ol_sort: OlSort,
    /// Bias open-link selection toward the most recently opened chain.
    #[arg(long = "ol-boost")]
    ol_boost: bool,

    /// Extend threat detection with the mutex table.
    #[arg(long = "threat-mutex")]
    threat_mutex: bool,
    /// Disable the mutex table entirely (`--no-mutex`).
    #[arg(long = "no-mutex")]
    no_mutex: bool,

    /// Disable the resolvability pre-check before a plan is admitted to OPEN.
    #[arg(long = "no-filter-relaxed")]
    no_filter_relaxed: bool,
    /// Disable HTN-reachability projection of the task decomposition graph.
    #[arg(long = "no-htn")]
    no_htn: bool,

    /// Wall-clock search budget in seconds; `0` means unbounded.
    #[arg(short = 'T', long = "timeout", default_value_t = 0)]
    timeout_secs: u64,

    /// Logging level: one of "error", "warn", "info", "debug", "trace".
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OlSort {
    Lifo,
    Earliest,
    Sorted,
    Local,
    LocalEarliest,
    SortedEarliest,
}

impl From<OlSort> for OpenLinkOrder {
    fn from(o: OlSort) -> Self {
        match o {
            OlSort::Lifo => OpenLinkOrder::Lifo,
            OlSort::Earliest => OpenLinkOrder::Earliest,
            OlSort::Sorted => OpenLinkOrder::Sorted,
            OlSort::Local => OpenLinkOrder::Local,
            OlSort::LocalEarliest => OpenLinkOrder::LocalEarliest,
            OlSort::SortedEarliest => OpenLinkOrder::SortedEarliest,
        }
    }
}

fn build_config(opt: &Opt) -> SearchConfig {
    let eval = if opt.dual_queue {
        EvalStrategy::Dual
    } else if opt.hadd_max {
        EvalStrategy::HaddMax
    } else if opt.depth {
        EvalStrategy::Depth
    } else {
        EvalStrategy::Bechon
    };
    SearchConfig {
        driver: if opt.shop { DriverKind::Shop } else { DriverKind::PartialOrder },
        hierarchical: opt.hierarchical,
        incremental_poset: opt.incremental_poset,
        eval,
        open_link_order: opt.ol_sort.into(),
        open_link_boost: opt.ol_boost,
        threat_mutex: opt.threat_mutex && !opt.no_mutex,
        filter_relaxed: !opt.no_filter_relaxed,
        htn_projection: !opt.no_htn,
        prefer_recent_open_link_chain: opt.ol_boost,
        timeout_secs: opt.timeout_secs,
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::Uptime::from(std::time::Instant::now()))
        .with_max_level(opt.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting global tracing subscriber")?;

    anyhow::ensure!(opt.domain.exists(), "domain file {} does not exist", opt.domain.display());
    anyhow::ensure!(opt.problem.exists(), "problem file {} does not exist", opt.problem.display());

    let domain_src = std::fs::read_to_string(&opt.domain)
        .with_context(|| format!("reading domain file {}", opt.domain.display()))?;
    let problem_src = std::fs::read_to_string(&opt.problem)
        .with_context(|| format!("reading problem file {}", opt.problem.display()))?;
    let domain: Domain = serde_json::from_str(&domain_src).context("parsing domain JSON")?;
    let problem: Problem = serde_json::from_str(&problem_src).context("parsing problem JSON")?;

    tracing::info!(domain = %domain.name, problem = %problem.name, "grounding problem");
    let grounded = GroundedProblem::build_with_options(&domain, &problem, !opt.no_htn);
    tracing::info!(
        actions = grounded.actions.len(),
        methods = grounded.methods.len(),
        tasks = grounded.tasks.len(),
        tdg_nodes = grounded.tdg.len(),
        "grounding complete"
    );

    let config = build_config(&opt);

    let cancel = Arc::new(AtomicBool::new(false));
    if config.timeout_secs > 0 {
        let cancel = Arc::clone(&cancel);
        let budget = Duration::from_secs(config.timeout_secs);
        std::thread::spawn(move || {
            std::thread::sleep(budget);
            cancel.store(true, Ordering::Relaxed);
        });
    }

    let initial = Plan::from_root(&grounded, config.threat_mutex);
    let result = hipop::search::search(&grounded, initial, &config, cancel.as_ref());

    match result {
        Ok(plan) => {
            let text = if config.hierarchical {
                emit::hierarchical(&plan)
            } else {
                emit::sequential(&plan)
            };
            println!("{text}");
            Ok(())
        }
        Err(hipop::SearchError::Cancelled) => {
            tracing::warn!("search cancelled before a plan was found");
            println!("No plan found");
            std::process::exit(1);
        }
        Err(hipop::SearchError::NoPlan) => {
            println!("No plan found");
            std::process::exit(1);
        }
    }
}
