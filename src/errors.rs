// Copyright 2025 Cornell University
// released under MIT License

use thiserror::Error;

/// What exactly is wrong with an automaton handed to the encoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidKind {
    /// No accept state, so the goal would be undefined
    #[error("automaton has no accept state")]
    EmptyAcceptSet,
    /// Only a single accept state of the trace automaton can be honored
    #[error("trace automaton has {accept_states} accept states, exactly one is supported")]
    UnsupportedTraceShape { accept_states: usize },
    /// Two automata share an id, or two objects render to the same name
    #[error("identifier `{name}` is used more than once")]
    IdentifierCollision { name: String },
    /// A transition references a state or symbol the automaton does not declare
    #[error("malformed transition `{transition}`: {detail}")]
    MalformedTransition { transition: String, detail: String },
    /// The initial or an accept state is not part of the state set
    #[error("{role} state `{state}` is not a state of the automaton")]
    UnknownState { role: &'static str, state: String },
    #[error("automaton has no initial state")]
    MissingInitialState,
    /// A name that cannot be used as (part of) a planning object name
    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },
    /// The shared-object encoding sizes its state pool from the constraints
    #[error("at least one constraint automaton is required")]
    EmptyConstraintSet,
}

/// Main error type of the encoder. Every malformed input is reported as an
/// invalid automaton together with the name of the offending automaton.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("invalid automaton `{automaton}`: {kind}")]
    InvalidAutomaton { automaton: String, kind: InvalidKind },
}

impl EncodingError {
    pub fn invalid(automaton: impl Into<String>, kind: InvalidKind) -> Self {
        EncodingError::InvalidAutomaton {
            automaton: automaton.into(),
            kind,
        }
    }

    pub fn automaton(&self) -> &str {
        match self {
            EncodingError::InvalidAutomaton { automaton, .. } => automaton,
        }
    }

    pub fn kind(&self) -> &InvalidKind {
        match self {
            EncodingError::InvalidAutomaton { kind, .. } => kind,
        }
    }

    pub fn collision(automaton: impl Into<String>, name: impl Into<String>) -> Self {
        Self::invalid(automaton, InvalidKind::IdentifierCollision { name: name.into() })
    }

    pub fn malformed_transition(
        automaton: impl Into<String>,
        transition: String,
        detail: impl Into<String>,
    ) -> Self {
        Self::invalid(
            automaton,
            InvalidKind::MalformedTransition {
                transition,
                detail: detail.into(),
            },
        )
    }
}

pub type EncodingResult<T> = Result<T, EncodingError>;
