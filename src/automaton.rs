// Copyright 2025 Cornell University
// released under MIT License

use crate::errors::{EncodingError, InvalidKind};
use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;

/// Source location of a parsed item: `(start, end, file_id)`
pub type Loc = (usize, usize, usize);

/// Stable identifier of a constraint automaton.
///
/// The id ends up inside object names like `s_<id>_<state>`, so the
/// underscore separator (and anything outside `[A-Za-z0-9]`) is rejected
/// here, which keeps that rendering injective.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AutomatonId(String);

impl AutomatonId {
    pub fn new(id: impl Into<String>) -> Result<Self, EncodingError> {
        let id = id.into();
        if id.is_empty() {
            return Err(EncodingError::invalid(
                id,
                InvalidKind::InvalidName {
                    name: String::new(),
                    reason: "automaton ids must not be empty".to_string(),
                },
            ));
        }
        if let Some(c) = id.chars().find(|c| !c.is_ascii_alphanumeric()) {
            let reason = format!("automaton ids may only contain ASCII letters and digits, found {c:?}");
            return Err(EncodingError::invalid(
                id.clone(),
                InvalidKind::InvalidName { name: id, reason },
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical order used whenever a set of automata is enumerated:
    /// decimal ids compare numerically and come first, everything else
    /// compares bytewise.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl fmt::Display for AutomatonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct StateId(u32);
entity_impl!(StateId, "state");

#[derive(Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct TransitionId(u32);
entity_impl!(TransitionId, "transition");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    name: String,
}

impl State {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transition {
    pub from: StateId,
    pub symbol: String,
    pub to: StateId,
}

/// A finite automaton as handed to the encoder. Every collection keeps
/// insertion order so that enumerating it is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    name: String,
    states: PrimaryMap<StateId, State>,
    by_name: FxHashMap<String, StateId>,
    alphabet: Vec<String>,
    init: Option<StateId>,
    accept: Vec<StateId>,
    transitions: PrimaryMap<TransitionId, Transition>,
    loc: Option<Loc>,
    transition_locs: SecondaryMap<TransitionId, Option<Loc>>,
}

impl Automaton {
    /// `name` is only used for reporting (`trace`, or the constraint id).
    pub fn new(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            states: PrimaryMap::new(),
            by_name: FxHashMap::default(),
            alphabet: Vec::new(),
            init: None,
            accept: Vec::new(),
            transitions: PrimaryMap::new(),
            loc: None,
            transition_locs: SecondaryMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// add a state, returning the existing id if the name is taken
    pub fn add_state(&mut self, name: impl Into<String>) -> StateId {
        let name = name.into();
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = self.states.push(State { name: name.clone() });
        self.by_name.insert(name, id);
        id
    }

    pub fn state_id_from_name(&self, name: &str) -> Option<StateId> {
        self.by_name.get(name).copied()
    }

    pub fn declare_symbol(&mut self, symbol: impl Into<String>) {
        let symbol = symbol.into();
        if !self.alphabet.contains(&symbol) {
            self.alphabet.push(symbol);
        }
    }

    pub fn set_init(&mut self, state: StateId) {
        self.init = Some(state);
    }

    pub fn add_accept(&mut self, state: StateId) {
        if !self.accept.contains(&state) {
            self.accept.push(state);
        }
    }

    /// Adds `from --symbol--> to`. The symbol joins the alphabet if it is new.
    pub fn add_transition(
        &mut self,
        from: StateId,
        symbol: impl Into<String>,
        to: StateId,
    ) -> TransitionId {
        let symbol = symbol.into();
        self.declare_symbol(symbol.clone());
        self.transitions.push(Transition { from, symbol, to })
    }

    /// Like `add_transition` but leaves the alphabet untouched, so the
    /// symbol may end up undeclared.
    pub fn add_raw_transition(&mut self, transition: Transition) -> TransitionId {
        self.transitions.push(transition)
    }

    pub fn state_ids(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states.keys()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> + '_ {
        self.states.iter()
    }

    pub fn has_state(&self, id: StateId) -> bool {
        self.states.is_valid(id)
    }

    /// number of states
    pub fn size(&self) -> usize {
        self.states.len()
    }

    pub fn alphabet(&self) -> &[String] {
        &self.alphabet
    }

    pub fn init(&self) -> Option<StateId> {
        self.init
    }

    pub fn accept(&self) -> &[StateId] {
        &self.accept
    }

    pub fn transitions(&self) -> impl Iterator<Item = (TransitionId, &Transition)> + '_ {
        self.transitions.iter()
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn set_loc(&mut self, start: usize, end: usize, file_id: usize) {
        self.loc = Some((start, end, file_id));
    }

    pub fn loc(&self) -> Option<Loc> {
        self.loc
    }

    pub fn add_transition_loc(&mut self, id: TransitionId, start: usize, end: usize, file_id: usize) {
        self.transition_locs[id] = Some((start, end, file_id));
    }

    pub fn transition_loc(&self, id: TransitionId) -> Option<Loc> {
        self.transition_locs.get(id).copied().flatten()
    }

    /// Human readable `from --symbol-> to`, tolerating dangling state ids.
    pub fn describe_transition(&self, tran: &Transition) -> String {
        let state_name = |id: StateId| match self.states.get(id) {
            Some(state) => state.name().to_string(),
            None => format!("<{id}>"),
        };
        format!("{} --{}-> {}", state_name(tran.from), tran.symbol, state_name(tran.to))
    }
}

impl Index<StateId> for Automaton {
    type Output = State;

    fn index(&self, index: StateId) -> &Self::Output {
        &self.states[index]
    }
}

impl Index<&StateId> for Automaton {
    type Output = State;

    fn index(&self, index: &StateId) -> &Self::Output {
        &self.states[*index]
    }
}

impl Index<TransitionId> for Automaton {
    type Output = Transition;

    fn index(&self, index: TransitionId) -> &Self::Output {
        &self.transitions[index]
    }
}

/// A constraint automaton together with its namespacing id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub id: AutomatonId,
    pub automaton: Automaton,
}

impl Constraint {
    pub fn new(id: AutomatonId, automaton: Automaton) -> Self {
        Self { id, automaton }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a linear automaton `s0 --e0-> s1 --e1-> ... sN` accepting `sN`.
    pub fn linear(name: &str, prefix: &str, symbols: &[&str]) -> Automaton {
        let mut a = Automaton::new(name);
        let mut prev = a.add_state(format!("{prefix}0"));
        a.set_init(prev);
        for (ii, sym) in symbols.iter().enumerate() {
            let next = a.add_state(format!("{prefix}{}", ii + 1));
            a.add_transition(prev, *sym, next);
            prev = next;
        }
        a.add_accept(prev);
        a
    }

    /// trace `0 --a-> 1`, accepting `1`
    pub fn single_step_trace() -> Automaton {
        linear("trace", "", &["a"])
    }

    /// constraint `s0 --a-> s1`, accepting `s1`
    pub fn single_step_constraint(id: &str) -> Constraint {
        let mut a = Automaton::new(id);
        let s0 = a.add_state("s0");
        let s1 = a.add_state("s1");
        a.set_init(s0);
        a.add_transition(s0, "a", s1);
        a.add_accept(s1);
        Constraint::new(AutomatonId::new(id).unwrap(), a)
    }

    /// "precedence(a, b)": `b` may only happen after an `a`; both states accept
    pub fn precedence_constraint(id: &str) -> Constraint {
        let mut a = Automaton::new(id);
        let s0 = a.add_state("s0");
        let s1 = a.add_state("s1");
        let s2 = a.add_state("s2");
        a.set_init(s0);
        a.add_transition(s0, "a", s1);
        a.add_transition(s0, "b", s2);
        a.add_transition(s1, "a", s1);
        a.add_transition(s1, "b", s1);
        a.add_accept(s0);
        a.add_accept(s1);
        Constraint::new(AutomatonId::new(id).unwrap(), a)
    }

    #[test]
    fn states_keep_declaration_order_and_dedup() {
        let mut a = Automaton::new("x");
        let q1 = a.add_state("q1");
        let q0 = a.add_state("q0");
        assert_eq!(a.add_state("q1"), q1);
        let names: Vec<&str> = a.states().map(|(_, s)| s.name()).collect();
        assert_eq!(names, vec!["q1", "q0"]);
        assert_eq!(a.state_id_from_name("q0"), Some(q0));
        assert_eq!(a.size(), 2);
    }

    #[test]
    fn transitions_extend_alphabet_once() {
        let mut a = Automaton::new("x");
        let q0 = a.add_state("q0");
        let q1 = a.add_state("q1");
        a.declare_symbol("z");
        a.add_transition(q0, "b", q1);
        a.add_transition(q1, "z", q0);
        a.add_transition(q1, "b", q1);
        assert_eq!(a.alphabet(), &["z".to_string(), "b".to_string()]);
        assert_eq!(a.num_transitions(), 3);
        assert_eq!(a.describe_transition(&a[TransitionId::from_u32(2)]), "q1 --b-> q1");
    }

    #[test]
    fn accept_states_keep_order() {
        let a = precedence_constraint("3").automaton;
        let names: Vec<&str> = a.accept().iter().map(|id| a[id].name()).collect();
        assert_eq!(names, vec!["s0", "s1"]);
    }

    #[test]
    fn automaton_ids_reject_separator() {
        assert!(AutomatonId::new("12").is_ok());
        assert!(AutomatonId::new("resp3").is_ok());
        assert!(AutomatonId::new("1_2").is_err());
        assert!(AutomatonId::new("").is_err());
        assert!(AutomatonId::new("a-b").is_err());
    }

    #[test]
    fn canonical_order_is_numeric_first() {
        let mut ids: Vec<AutomatonId> = ["10", "b", "2", "a", "1"]
            .iter()
            .map(|s| AutomatonId::new(*s).unwrap())
            .collect();
        ids.sort_by(|a, b| a.canonical_cmp(b));
        let rendered: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(rendered, vec!["1", "2", "10", "a", "b"]);
    }
}
