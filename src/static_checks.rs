// Copyright 2025 Cornell University
// released under MIT License

//! Well-formedness checks for the automata handed to the encoder.
//! Everything is checked up front so that no text is produced for
//! malformed input.

use crate::automaton::{Automaton, Constraint};
use crate::errors::{EncodingError, EncodingResult, InvalidKind};
use crate::names::{check_activity_name, check_name};
use log::debug;
use rustc_hash::FxHashSet;

/// Which automaton is being checked; the trace has stricter shape rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Trace,
    Constraint,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Trace => write!(f, "trace"),
            Role::Constraint => write!(f, "constraint"),
        }
    }
}

/// Checks one automaton. `label` is the name used in error reports.
pub fn check_automaton(automaton: &Automaton, label: &str, role: Role) -> EncodingResult<()> {
    for (_, state) in automaton.states() {
        if let Some(reason) = check_name(state.name()) {
            return Err(EncodingError::invalid(
                label,
                InvalidKind::InvalidName {
                    name: state.name().to_string(),
                    reason,
                },
            ));
        }
    }

    for symbol in automaton.alphabet() {
        if let Some(reason) = check_activity_name(symbol) {
            return Err(EncodingError::invalid(
                label,
                InvalidKind::InvalidName {
                    name: symbol.clone(),
                    reason,
                },
            ));
        }
    }

    match automaton.init() {
        None => return Err(EncodingError::invalid(label, InvalidKind::MissingInitialState)),
        Some(init) if !automaton.has_state(init) => {
            return Err(EncodingError::invalid(
                label,
                InvalidKind::UnknownState {
                    role: "initial",
                    state: init.to_string(),
                },
            ))
        }
        Some(_) => {}
    }

    if automaton.accept().is_empty() {
        return Err(EncodingError::invalid(label, InvalidKind::EmptyAcceptSet));
    }
    if role == Role::Trace && automaton.accept().len() > 1 {
        return Err(EncodingError::invalid(
            label,
            InvalidKind::UnsupportedTraceShape {
                accept_states: automaton.accept().len(),
            },
        ));
    }
    if let Some(unknown) = automaton.accept().iter().find(|id| !automaton.has_state(**id)) {
        return Err(EncodingError::invalid(
            label,
            InvalidKind::UnknownState {
                role: "accept",
                state: unknown.to_string(),
            },
        ));
    }

    for (_, tran) in automaton.transitions() {
        let detail = if !automaton.has_state(tran.from) {
            Some(format!("source {} is not a state of the automaton", tran.from))
        } else if !automaton.has_state(tran.to) {
            Some(format!("target {} is not a state of the automaton", tran.to))
        } else if !automaton.alphabet().contains(&tran.symbol) {
            Some(format!("symbol `{}` is not in the alphabet", tran.symbol))
        } else {
            None
        };
        if let Some(detail) = detail {
            return Err(EncodingError::malformed_transition(
                label,
                automaton.describe_transition(tran),
                detail,
            ));
        }
    }

    debug!(
        "{role} automaton `{label}` ok: {} states, {} symbols, {} transitions",
        automaton.size(),
        automaton.alphabet().len(),
        automaton.num_transitions()
    );
    Ok(())
}

/// Checks the trace, every constraint, and that constraint ids are unique.
pub fn check_inputs(trace: &Automaton, constraints: &[Constraint]) -> EncodingResult<()> {
    check_automaton(trace, trace.name(), Role::Trace)?;
    let mut seen = FxHashSet::default();
    for constraint in constraints {
        if !seen.insert(constraint.id.as_str()) {
            return Err(EncodingError::collision(
                constraint.id.as_str(),
                constraint.id.as_str(),
            ));
        }
        check_automaton(&constraint.automaton, constraint.id.as_str(), Role::Constraint)?;
    }
    Ok(())
}
