// Copyright 2025 Cornell University
// released under MIT License

//! Shared-Object encoding: automata are objects `a<id>` and all of them draw
//! their states from one pool `s0 .. s<max-1>`. The goal asks every automaton
//! to sit in one of its final states, so no synthetic accept state is needed.

use super::{
    broadcast, canonical_order, cost, endpoints, problem_name, unified_alphabet, AddPolicy,
    EncodingOptions, DOMAIN_NAME, REQUIREMENTS, TOTAL_COST,
};
use crate::automaton::{Automaton, Constraint, StateId};
use crate::errors::{EncodingError, EncodingResult, InvalidKind};
use crate::static_checks::check_inputs;
use crate::names::{ObjectName, ObjectTable};
use crate::pddl::*;
use cranelift_entity::EntityRef;
use log::debug;

const TRACE_STATE: &str = "trace_state";
const AUTOMATON_STATE: &str = "automaton_state";
const ACTIVITY: &str = "activity";
const AUTOMATON: &str = "automaton";

#[derive(Debug, Clone)]
pub struct Shared<'a> {
    trace: &'a Automaton,
    trace_init: StateId,
    trace_accept: StateId,
    constraints: Vec<(&'a Constraint, StateId)>,
    options: EncodingOptions,
    objects: Vec<(String, &'static str)>,
}

/// A constraint state is represented by the pool entry at its declaration
/// position.
fn pooled(id: StateId) -> String {
    ObjectName::PooledState(id.index()).to_string()
}

impl<'a> Shared<'a> {
    /// Fails on malformed automata, on object names that clash and on an
    /// empty constraint set.
    pub fn new(
        trace: &'a Automaton,
        constraints: &'a [Constraint],
        options: EncodingOptions,
    ) -> EncodingResult<Self> {
        check_inputs(trace, constraints)?;
        let (trace_init, trace_accept) = endpoints(trace)?;
        let Some(pool_size) = constraints.iter().map(|c| c.automaton.size()).max() else {
            return Err(EncodingError::invalid(trace.name(), InvalidKind::EmptyConstraintSet));
        };
        let constraints = canonical_order(constraints)
            .into_iter()
            .map(|c| endpoints(&c.automaton).map(|(init, _)| (c, init)))
            .collect::<EncodingResult<Vec<_>>>()?;

        let mut table = ObjectTable::default();
        for (c, _) in &constraints {
            table.add(ObjectName::Automaton(&c.id), AUTOMATON, c.id.as_str())?;
        }
        for (_, state) in trace.states() {
            table.add(ObjectName::TraceState(state.name()), TRACE_STATE, trace.name())?;
        }
        for index in 0..pool_size {
            table.add(ObjectName::PooledState(index), AUTOMATON_STATE, trace.name())?;
        }
        let ordered: Vec<&Constraint> = constraints.iter().map(|(c, _)| *c).collect();
        for symbol in unified_alphabet(trace, &ordered) {
            table.add(ObjectName::Activity(symbol), ACTIVITY, trace.name())?;
        }
        debug!(
            "shared encoding: {} objects, pool of {pool_size} states for {} automata",
            table.len(),
            constraints.len()
        );

        Ok(Self {
            trace,
            trace_init,
            trace_accept,
            constraints,
            options,
            objects: table.into_objects(),
        })
    }

    pub fn options(&self) -> EncodingOptions {
        self.options
    }

    pub fn domain(&self) -> Domain {
        let trace_step: &[(&[&str], &str)] = &[
            (&["?t1"], TRACE_STATE),
            (&["?e"], ACTIVITY),
            (&["?t2"], TRACE_STATE),
        ];
        let on_trace_step = Formula::and(vec![
            Formula::atom("cur_state_trace", &["?t1"]),
            Formula::atom("trace_trans", &["?t1", "?e", "?t2"]),
        ]);
        let advance_trace = [
            Formula::not(Formula::atom("cur_state_trace", &["?t1"])),
            Formula::atom("cur_state_trace", &["?t2"]),
        ];
        let advance_automata = broadcast(
            &[(&["?a"], AUTOMATON), (&["?s1", "?s2"], AUTOMATON_STATE)],
            Formula::atom("cur_state", &["?a", "?s1"]),
            Formula::atom("automaton_trans", &["?a", "?s1", "?e", "?s2"]),
            Formula::atom("cur_state", &["?a", "?s2"]),
        );

        let sync = Action {
            name: "sync".to_string(),
            params: params(trace_step),
            precondition: on_trace_step.clone(),
            effect: Formula::and(
                advance_trace
                    .iter()
                    .cloned()
                    .chain([advance_automata.clone()])
                    .collect(),
            ),
        };

        let add_effect = Formula::and(vec![cost(1), advance_automata]);
        let add = match self.options.add_policy {
            AddPolicy::Unconstrained => Action {
                name: "add".to_string(),
                params: params(&[(&["?e"], ACTIVITY)]),
                precondition: Formula::and(vec![]),
                effect: add_effect,
            },
            AddPolicy::TraceGuarded => Action {
                name: "add".to_string(),
                params: params(trace_step),
                precondition: on_trace_step.clone(),
                effect: add_effect,
            },
        };

        let del = Action {
            name: "del".to_string(),
            params: params(trace_step),
            precondition: on_trace_step,
            effect: Formula::and([cost(1)].into_iter().chain(advance_trace).collect()),
        };

        Domain {
            name: DOMAIN_NAME.to_string(),
            requirements: REQUIREMENTS.iter().map(|r| r.to_string()).collect(),
            types: vec![
                TypedList::new(&[TRACE_STATE, AUTOMATON_STATE], "state"),
                TypedList::untyped(&[ACTIVITY, AUTOMATON]),
            ],
            predicates: vec![
                Predicate::new("trace_trans", params(trace_step)),
                Predicate::new(
                    "cur_state",
                    params(&[(&["?a"], AUTOMATON), (&["?s"], AUTOMATON_STATE)]),
                ),
                Predicate::new("cur_state_trace", params(&[(&["?t"], TRACE_STATE)])),
                Predicate::new(
                    "automaton_trans",
                    params(&[
                        (&["?a"], AUTOMATON),
                        (&["?s1"], AUTOMATON_STATE),
                        (&["?e"], ACTIVITY),
                        (&["?s2"], AUTOMATON_STATE),
                    ]),
                ),
                Predicate::new(
                    "final_state",
                    params(&[(&["?a"], AUTOMATON), (&["?s"], AUTOMATON_STATE)]),
                ),
            ],
            functions: vec![TOTAL_COST.to_string()],
            actions: vec![sync, add, del],
        }
    }

    fn trace_state(&self, id: StateId) -> String {
        ObjectName::TraceState(self.trace[id].name()).to_string()
    }

    pub fn problem(&self, trace_id: u64) -> Problem {
        let mut init = vec![
            Formula::FluentEq(TOTAL_COST.to_string(), 0),
            Formula::atom("cur_state_trace", &[self.trace_state(self.trace_init)]),
        ];
        for (_, tran) in self.trace.transitions() {
            init.push(Formula::atom(
                "trace_trans",
                &[
                    self.trace_state(tran.from),
                    tran.symbol.clone(),
                    self.trace_state(tran.to),
                ],
            ));
        }
        for (c, c_init) in &self.constraints {
            let automaton = ObjectName::Automaton(&c.id).to_string();
            init.push(Formula::atom("cur_state", &[automaton.clone(), pooled(*c_init)]));
            for acc in c.automaton.accept() {
                init.push(Formula::atom("final_state", &[automaton.clone(), pooled(*acc)]));
            }
            for (_, tran) in c.automaton.transitions() {
                init.push(Formula::atom(
                    "automaton_trans",
                    &[
                        automaton.clone(),
                        pooled(tran.from),
                        tran.symbol.clone(),
                        pooled(tran.to),
                    ],
                ));
            }
        }

        let goal = vec![
            Formula::atom("cur_state_trace", &[self.trace_state(self.trace_accept)]),
            Formula::forall(
                params(&[(&["?a"], AUTOMATON), (&["?s"], AUTOMATON_STATE)]),
                Formula::imply(
                    Formula::atom("cur_state", &["?a", "?s"]),
                    Formula::atom("final_state", &["?a", "?s"]),
                ),
            ),
        ];

        Problem {
            name: problem_name(trace_id),
            domain: DOMAIN_NAME.to_string(),
            objects: self.objects.clone(),
            init,
            goal,
            metric: TOTAL_COST.to_string(),
        }
    }
}
