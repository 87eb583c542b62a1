// Copyright 2025 Cornell University
// released under MIT License

//! # Object names
//! Every planning object the encoder emits is described by an [`ObjectName`]
//! and rendered by its `Display` impl, which is the only place where the
//! naming conventions are spelled out. Plan decoders key off these strings.

use crate::automaton::AutomatonId;
use crate::errors::{EncodingError, EncodingResult};
use log::debug;
use rustc_hash::FxHashMap;
use std::fmt;

/// Name of the distinguished bookkeeping activity
pub const DUMMY_ACTIVITY: &str = "dummy";

/// PDDL keywords that must not appear as a bare activity object
const RESERVED_WORDS: [&str; 14] = [
    "and", "or", "not", "imply", "exists", "forall", "when", "either", "object", "define",
    "domain", "problem", "increase", "decrease",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectName<'a> {
    /// `t<state>`
    TraceState(&'a str),
    /// `s_<automaton>_<state>`
    AutomatonState(&'a AutomatonId, &'a str),
    /// `gs_<automaton>`, the synthetic accept state of a multi-accept automaton
    GlobalAccept(&'a AutomatonId),
    /// `a<automaton>`
    Automaton(&'a AutomatonId),
    /// `s<index>`, a pooled state shared by all automata
    PooledState(usize),
    /// the symbol itself
    Activity(&'a str),
    /// `dummy`
    DummyActivity,
}

impl fmt::Display for ObjectName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectName::TraceState(state) => write!(f, "t{state}"),
            ObjectName::AutomatonState(id, state) => write!(f, "s_{id}_{state}"),
            ObjectName::GlobalAccept(id) => write!(f, "gs_{id}"),
            ObjectName::Automaton(id) => write!(f, "a{id}"),
            ObjectName::PooledState(index) => write!(f, "s{index}"),
            ObjectName::Activity(symbol) => write!(f, "{symbol}"),
            ObjectName::DummyActivity => write!(f, "{DUMMY_ACTIVITY}"),
        }
    }
}

/// Characters allowed in state names and symbols
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Returns why `name` is unusable inside an object name, if it is.
pub fn check_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("names must not be empty".to_string());
    }
    name.chars()
        .find(|c| !is_name_char(*c))
        .map(|c| format!("unexpected character {c:?}, only ASCII letters, digits, `_` and `-` are allowed"))
}

/// Activities are emitted verbatim, so they also have to start with a letter
/// and must not be a PDDL keyword.
pub fn check_activity_name(name: &str) -> Option<String> {
    check_name(name).or_else(|| {
        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            Some("activity names have to start with a letter".to_string())
        } else if RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(name)) {
            Some(format!("`{name}` is a reserved word in PDDL"))
        } else {
            None
        }
    })
}

/// The objects of one problem, in emission order, each with its type.
/// Registering a rendered name twice is an identifier collision. PDDL does
/// not distinguish case, so neither does the table.
#[derive(Debug, Default)]
pub struct ObjectTable {
    objects: Vec<(String, &'static str)>,
    /// lowercase name -> automaton that introduced it
    owners: FxHashMap<String, String>,
}

impl ObjectTable {
    /// `owner` is the automaton the object stems from (for error reporting)
    pub fn add(&mut self, name: ObjectName<'_>, tpe: &'static str, owner: &str) -> EncodingResult<String> {
        let rendered = name.to_string();
        let key = rendered.to_ascii_lowercase();
        if let Some(first) = self.owners.get(&key) {
            debug!("{rendered} from {owner} clashes with an object of {first}");
            return Err(EncodingError::collision(owner, rendered));
        }
        self.owners.insert(key, owner.to_string());
        self.objects.push((rendered.clone(), tpe));
        Ok(rendered)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn count_of_type(&self, tpe: &str) -> usize {
        self.objects.iter().filter(|(_, t)| *t == tpe).count()
    }

    pub fn into_objects(self) -> Vec<(String, &'static str)> {
        self.objects
    }
}
