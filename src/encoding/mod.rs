// Copyright 2025 Cornell University
// released under MIT License

//! # Encodings
//! Compiles a trace automaton and a set of constraint automata into a
//! planning domain and problem whose cost-optimal plans are optimal
//! alignments. Two encodings are available, see [`Strategy`].

mod replicated;
mod shared;

pub use replicated::Replicated;
pub use shared::Shared;

use crate::automaton::{Automaton, Constraint, StateId};
use crate::errors::{EncodingError, EncodingResult, InvalidKind};
use crate::pddl::{params, Domain, Formula, Problem};
use clap::ValueEnum;
use itertools::Itertools;
use log::info;
use std::fmt;

pub const DOMAIN_NAME: &str = "alignment";
pub const TOTAL_COST: &str = "total-cost";

pub const REQUIREMENTS: [&str; 5] = [
    ":typing",
    ":disjunctive-preconditions",
    ":conditional-effects",
    ":universal-preconditions",
    ":action-costs",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Strategy {
    /// one namespaced state object per constraint state (`s_<id>_<state>`)
    #[value(name = "replicated")]
    ReplicatedIds,
    /// automata are objects, states are pooled (`s0 .. s<max-1>`)
    #[value(name = "shared")]
    SharedStates,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::ReplicatedIds => write!(f, "replicated"),
            Strategy::SharedStates => write!(f, "shared"),
        }
    }
}

/// Precondition of the `add` action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum AddPolicy {
    /// any activity may be inserted at any time
    #[default]
    Unconstrained,
    /// only activities labelling a trace transition out of the current
    /// trace state may be inserted (the trace pointer does not move)
    TraceGuarded,
}

/// What `goto-goal` adds to the total cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum GotoGoalCost {
    #[default]
    Free,
    Unit,
}

impl GotoGoalCost {
    pub fn amount(self) -> u32 {
        match self {
            GotoGoalCost::Free => 0,
            GotoGoalCost::Unit => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodingOptions {
    pub add_policy: AddPolicy,
    pub goto_goal_cost: GotoGoalCost,
    /// the caller already has the domain, `compile` skips it
    pub reuse_domain: bool,
}

/// Output of [`Encoding::compile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    pub domain: Option<String>,
    pub problem: String,
}

/// An encoding bound to a validated set of automata.
#[derive(Debug, Clone)]
pub enum Encoding<'a> {
    ReplicatedIds(Replicated<'a>),
    SharedStates(Shared<'a>),
}

impl<'a> Encoding<'a> {
    /// Validates the automata and prepares the chosen encoding. Any malformed
    /// input is reported here, before text is produced.
    pub fn new(
        strategy: Strategy,
        trace: &'a Automaton,
        constraints: &'a [Constraint],
        options: EncodingOptions,
    ) -> EncodingResult<Self> {
        info!(
            "Encoding trace with {} states against {} constraint automata ({strategy})",
            trace.size(),
            constraints.len()
        );
        let encoding = match strategy {
            Strategy::ReplicatedIds => {
                Encoding::ReplicatedIds(Replicated::new(trace, constraints, options)?)
            }
            Strategy::SharedStates => {
                Encoding::SharedStates(Shared::new(trace, constraints, options)?)
            }
        };
        Ok(encoding)
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Encoding::ReplicatedIds(_) => Strategy::ReplicatedIds,
            Encoding::SharedStates(_) => Strategy::SharedStates,
        }
    }

    pub fn options(&self) -> EncodingOptions {
        match self {
            Encoding::ReplicatedIds(enc) => enc.options(),
            Encoding::SharedStates(enc) => enc.options(),
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            Encoding::ReplicatedIds(enc) => enc.domain(),
            Encoding::SharedStates(enc) => enc.domain(),
        }
    }

    pub fn problem(&self, trace_id: u64) -> Problem {
        match self {
            Encoding::ReplicatedIds(enc) => enc.problem(trace_id),
            Encoding::SharedStates(enc) => enc.problem(trace_id),
        }
    }

    pub fn emit_domain(&self) -> String {
        self.domain().to_string()
    }

    pub fn emit_problem(&self, trace_id: u64) -> String {
        self.problem(trace_id).to_string()
    }

    /// Problem text, plus domain text unless the domain is being reused
    pub fn compile(&self, trace_id: u64) -> Compiled {
        let domain = if self.options().reuse_domain {
            None
        } else {
            Some(self.emit_domain())
        };
        Compiled {
            domain,
            problem: self.emit_problem(trace_id),
        }
    }
}

pub fn problem_name(trace_id: u64) -> String {
    format!("p-trace-{trace_id}")
}

/// Constraint automata in canonical order (see `AutomatonId::canonical_cmp`)
pub(crate) fn canonical_order(constraints: &[Constraint]) -> Vec<&Constraint> {
    constraints
        .iter()
        .sorted_by(|a, b| a.id.canonical_cmp(&b.id))
        .collect()
}

/// Initial and (first) accept state of an automaton.
pub(crate) fn endpoints(automaton: &Automaton) -> EncodingResult<(StateId, StateId)> {
    let init = automaton
        .init()
        .ok_or_else(|| EncodingError::invalid(automaton.name(), InvalidKind::MissingInitialState))?;
    let accept = automaton
        .accept()
        .first()
        .copied()
        .ok_or_else(|| EncodingError::invalid(automaton.name(), InvalidKind::EmptyAcceptSet))?;
    Ok((init, accept))
}

/// Trace alphabet followed by every constraint alphabet, first occurrence wins
pub(crate) fn unified_alphabet<'a>(
    trace: &'a Automaton,
    constraints: &[&'a Constraint],
) -> Vec<&'a str> {
    trace
        .alphabet()
        .iter()
        .chain(constraints.iter().flat_map(|c| c.automaton.alphabet()))
        .map(String::as_str)
        .unique()
        .collect()
}

pub(crate) fn cost(amount: u32) -> Formula {
    Formula::Increase(TOTAL_COST.to_string(), amount)
}

/// `(forall (quantified) (when (and cur trans) (and (not cur) next)))`:
/// every automaton whose current state has a matching transition moves,
/// all others stay where they are
pub(crate) fn broadcast(
    quantified: &[(&[&str], &str)],
    cur: Formula,
    trans: Formula,
    next: Formula,
) -> Formula {
    Formula::forall(
        params(quantified),
        Formula::when(
            Formula::and(vec![cur.clone(), trans]),
            Formula::and(vec![Formula::not(cur), next]),
        ),
    )
}
