// Copyright 2025 Cornell University
// released under MIT License

//! Replicated-Identifier encoding: every constraint state becomes its own
//! object `s_<id>_<state>`. Automata with several accept states get a
//! synthetic accept object `gs_<id>` reached through `goto-goal`.

use super::{
    broadcast, canonical_order, cost, endpoints, problem_name, unified_alphabet, AddPolicy,
    EncodingOptions, DOMAIN_NAME, REQUIREMENTS, TOTAL_COST,
};
use crate::automaton::{Automaton, Constraint, StateId};
use crate::errors::EncodingResult;
use crate::static_checks::check_inputs;
use crate::names::{ObjectName, ObjectTable, DUMMY_ACTIVITY};
use crate::pddl::*;
use log::debug;

const TRACE_STATE: &str = "trace_state";
const AUTOMATON_STATE: &str = "automaton_state";
const ACT: &str = "act";
const DUMMY_ACT: &str = "dummy_act";

#[derive(Debug, Clone)]
pub struct Replicated<'a> {
    trace: &'a Automaton,
    trace_init: StateId,
    trace_accept: StateId,
    /// constraint automata in canonical order with their initial state
    constraints: Vec<(&'a Constraint, StateId)>,
    options: EncodingOptions,
    objects: Vec<(String, &'static str)>,
}

impl<'a> Replicated<'a> {
    /// Fails on malformed automata and on object names that clash.
    pub fn new(
        trace: &'a Automaton,
        constraints: &'a [Constraint],
        options: EncodingOptions,
    ) -> EncodingResult<Self> {
        check_inputs(trace, constraints)?;
        let (trace_init, trace_accept) = endpoints(trace)?;
        let constraints = canonical_order(constraints)
            .into_iter()
            .map(|c| endpoints(&c.automaton).map(|(init, _)| (c, init)))
            .collect::<EncodingResult<Vec<_>>>()?;

        let mut table = ObjectTable::default();
        for (_, state) in trace.states() {
            table.add(ObjectName::TraceState(state.name()), TRACE_STATE, trace.name())?;
        }
        for (c, _) in &constraints {
            for (_, state) in c.automaton.states() {
                table.add(
                    ObjectName::AutomatonState(&c.id, state.name()),
                    AUTOMATON_STATE,
                    c.id.as_str(),
                )?;
            }
            if c.automaton.accept().len() > 1 {
                table.add(ObjectName::GlobalAccept(&c.id), AUTOMATON_STATE, c.id.as_str())?;
            }
        }
        let ordered: Vec<&Constraint> = constraints.iter().map(|(c, _)| *c).collect();
        for symbol in unified_alphabet(trace, &ordered) {
            table.add(ObjectName::Activity(symbol), ACT, trace.name())?;
        }
        table.add(ObjectName::DummyActivity, DUMMY_ACT, trace.name())?;
        debug!(
            "replicated encoding: {} objects, {} automaton states",
            table.len(),
            table.count_of_type(AUTOMATON_STATE)
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
            (&["?e"], ACT),
            (&["?t2"], TRACE_STATE),
        ];
        let on_trace_step = Formula::and(vec![
            Formula::atom("cur_state", &["?t1"]),
            Formula::atom("trace", &["?t1", "?e", "?t2"]),
        ]);
        let advance_trace = [
            Formula::not(Formula::atom("cur_state", &["?t1"])),
            Formula::atom("cur_state", &["?t2"]),
        ];
        let advance_automata = |label: &str, symbol: &str| {
            broadcast(
                &[(&["?s1", "?s2"], AUTOMATON_STATE)],
                Formula::atom("cur_state", &["?s1"]),
                Formula::atom(label, &["?s1", symbol, "?s2"]),
                Formula::atom("cur_state", &["?s2"]),
            )
        };

        let sync = Action {
            name: "sync".to_string(),
            params: params(trace_step),
            precondition: on_trace_step.clone(),
            effect: Formula::and(
                advance_trace
                    .iter()
                    .cloned()
                    .chain([advance_automata("automaton", "?e")])
                    .collect(),
            ),
        };

        let add_effect = Formula::and(vec![cost(1), advance_automata("automaton", "?e")]);
        let add = match self.options.add_policy {
            AddPolicy::Unconstrained => Action {
                name: "add".to_string(),
                params: params(&[(&["?e"], ACT)]),
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

        let goto_cost = self.options.goto_goal_cost.amount();
        let goto_goal = Action {
            name: "goto-goal".to_string(),
            params: params(&[(&["?t1"], TRACE_STATE), (&["?de"], DUMMY_ACT)]),
            precondition: Formula::and(vec![
                Formula::atom("cur_state", &["?t1"]),
                Formula::atom("final_state", &["?t1"]),
            ]),
            effect: Formula::and(
                (goto_cost > 0)
                    .then(|| cost(goto_cost))
                    .into_iter()
                    .chain([advance_automata("dummy_trans", "?de")])
                    .collect(),
            ),
        };

        Domain {
            name: DOMAIN_NAME.to_string(),
            requirements: REQUIREMENTS.iter().map(|r| r.to_string()).collect(),
            types: vec![
                TypedList::new(&[TRACE_STATE, AUTOMATON_STATE], "state"),
                TypedList::new(&[ACT, DUMMY_ACT], "activity"),
            ],
            predicates: vec![
                Predicate::new("trace", params(trace_step)),
                Predicate::new("cur_state", params(&[(&["?s"], "state")])),
                Predicate::new(
                    "automaton",
                    params(&[
                        (&["?s1"], AUTOMATON_STATE),
                        (&["?e"], ACT),
                        (&["?s2"], AUTOMATON_STATE),
                    ]),
                ),
                Predicate::new("final_state", params(&[(&["?s"], "state")])),
                Predicate::new(
                    "dummy_trans",
                    params(&[
                        (&["?s1"], AUTOMATON_STATE),
                        (&["?de"], DUMMY_ACT),
                        (&["?s2"], AUTOMATON_STATE),
                    ]),
                ),
            ],
            functions: vec![TOTAL_COST.to_string()],
            actions: vec![sync, add, del, goto_goal],
        }
    }

    fn trace_state(&self, id: StateId) -> String {
        ObjectName::TraceState(self.trace[id].name()).to_string()
    }

    pub fn problem(&self, trace_id: u64) -> Problem {
        let trace_accept = self.trace_state(self.trace_accept);
        let mut init = vec![
            Formula::FluentEq(TOTAL_COST.to_string(), 0),
            Formula::atom("cur_state", &[self.trace_state(self.trace_init)]),
            Formula::atom("final_state", &[trace_accept.clone()]),
        ];
        for (_, tran) in self.trace.transitions() {
            init.push(Formula::atom(
                "trace",
                &[
                    self.trace_state(tran.from),
                    tran.symbol.clone(),
                    self.trace_state(tran.to),
                ],
            ));
        }

        let mut goal = vec![
            Formula::atom("final_state", &[trace_accept.clone()]),
            Formula::atom("cur_state", &[trace_accept]),
        ];

        for (c, c_init) in &self.constraints {
            let state = |id: StateId| {
                ObjectName::AutomatonState(&c.id, c.automaton[id].name()).to_string()
            };
            init.push(Formula::atom("cur_state", &[state(*c_init)]));
            for (_, tran) in c.automaton.transitions() {
                init.push(Formula::atom(
                    "automaton",
                    &[state(tran.from), tran.symbol.clone(), state(tran.to)],
                ));
            }
            match c.automaton.accept() {
                [single] => goal.push(Formula::atom("cur_state", &[state(*single)])),
                accept => {
                    let global = ObjectName::GlobalAccept(&c.id).to_string();
                    for acc in accept {
                        init.push(Formula::atom(
                            "dummy_trans",
                            &[state(*acc), DUMMY_ACTIVITY.to_string(), global.clone()],
                        ));
                    }
                    goal.push(Formula::atom("cur_state", &[global]));
                }
            }
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::tests::{
        linear, precedence_constraint, single_step_constraint, single_step_trace,
    };
    use crate::automaton::{AutomatonId, Transition};
    use crate::encoding::GotoGoalCost;
    use crate::errors::InvalidKind;
    use crate::serialize::is_balanced;
    use cranelift_entity::EntityRef;

    fn encode<'a>(trace: &'a Automaton, constraints: &'a [Constraint]) -> Replicated<'a> {
        Replicated::new(trace, constraints, EncodingOptions::default()).unwrap()
    }

    #[test]
    fn single_step_problem() {
        let trace = single_step_trace();
        let constraints = vec![single_step_constraint("1")];
        let problem = encode(&trace, &constraints).problem(0);
        insta::assert_snapshot!(problem.to_string(), @r"
        (define (problem p-trace-0)
        (:domain alignment)
        (:objects
        t0 - trace_state
        t1 - trace_state
        s_1_s0 - automaton_state
        s_1_s1 - automaton_state
        a - act
        dummy - dummy_act
        )
        (:init
        (= (total-cost) 0)
        (cur_state t0)
        (final_state t1)
        (trace t0 a t1)
        (cur_state s_1_s0)
        (automaton s_1_s0 a s_1_s1)
        )
        (:goal (and
        (final_state t1)
        (cur_state t1)
        (cur_state s_1_s1)
        ))
        (:metric minimize (total-cost))
        )
        ");
    }

    #[test]
    fn domain_text() {
        let trace = single_step_trace();
        let constraints = vec![single_step_constraint("1")];
        let domain = encode(&trace, &constraints).domain();
        insta::assert_snapshot!(domain.to_string(), @r"
        (define (domain alignment)
        (:requirements :typing :disjunctive-preconditions :conditional-effects :universal-preconditions :action-costs)
        (:types trace_state automaton_state - state act dummy_act - activity)
        (:predicates
        (trace ?t1 - trace_state ?e - act ?t2 - trace_state)
        (cur_state ?s - state)
        (automaton ?s1 - automaton_state ?e - act ?s2 - automaton_state)
        (final_state ?s - state)
        (dummy_trans ?s1 - automaton_state ?de - dummy_act ?s2 - automaton_state)
        )
        (:functions
        (total-cost)
        )

        (:action sync
        :parameters (?t1 - trace_state ?e - act ?t2 - trace_state)
        :precondition (and (cur_state ?t1) (trace ?t1 ?e ?t2))
        :effect (and
          (not (cur_state ?t1))
          (cur_state ?t2)
          (forall (?s1 ?s2 - automaton_state)
            (when (and (cur_state ?s1) (automaton ?s1 ?e ?s2))
              (and (not (cur_state ?s1)) (cur_state ?s2)))))
        )

        (:action add
        :parameters (?e - act)
        :precondition (and)
        :effect (and
          (increase (total-cost) 1)
          (forall (?s1 ?s2 - automaton_state)
            (when (and (cur_state ?s1) (automaton ?s1 ?e ?s2))
              (and (not (cur_state ?s1)) (cur_state ?s2)))))
        )

        (:action del
        :parameters (?t1 - trace_state ?e - act ?t2 - trace_state)
        :precondition (and (cur_state ?t1) (trace ?t1 ?e ?t2))
        :effect (and (increase (total-cost) 1) (not (cur_state ?t1)) (cur_state ?t2))
        )

        (:action goto-goal
        :parameters (?t1 - trace_state ?de - dummy_act)
        :precondition (and (cur_state ?t1) (final_state ?t1))
        :effect (and
          (forall (?s1 ?s2 - automaton_state)
            (when (and (cur_state ?s1) (dummy_trans ?s1 ?de ?s2))
              (and (not (cur_state ?s1)) (cur_state ?s2)))))
        )
        )
        ");
    }

    #[test]
    fn multi_accept_goes_through_global_state() {
        let trace = linear("trace", "", &["a", "b"]);
        let constraints = vec![precedence_constraint("7"), single_step_constraint("3")];
        let problem = encode(&trace, &constraints).problem(1);

        let states: Vec<&str> = problem.objects_of_type(AUTOMATON_STATE).collect();
        assert_eq!(
            states,
            vec!["s_3_s0", "s_3_s1", "s_7_s0", "s_7_s1", "s_7_s2", "gs_7"]
        );
        let text = problem.to_string();
        assert!(text.contains("(dummy_trans s_7_s0 dummy gs_7)\n(dummy_trans s_7_s1 dummy gs_7)\n"));
        assert!(text.contains("(cur_state s_3_s1)\n(cur_state gs_7)\n))"));
        assert!(!text.contains("gs_3"));
        assert!(is_balanced(&text));
    }

    #[test]
    fn sync_then_goto_goal_is_free() {
        let trace = single_step_trace();
        // single accept state (no dummy transitions) and two accept states
        for constraint in [single_step_constraint("1"), precedence_constraint("1")] {
            let constraints = vec![constraint];
            let replicated = encode(&trace, &constraints);
            let domain = replicated.domain();
            let plan_cost: u32 = ["sync", "goto-goal"]
                .iter()
                .map(|name| domain.action(name).map_or(0, |a| a.effect.cost()))
                .sum();
            assert_eq!(plan_cost, 0);
            assert_eq!(domain.action("add").map(|a| a.effect.cost()), Some(1));
            assert_eq!(domain.action("del").map(|a| a.effect.cost()), Some(1));

            let options = EncodingOptions {
                goto_goal_cost: GotoGoalCost::Unit,
                ..Default::default()
            };
            let domain = Replicated::new(&trace, &constraints, options).unwrap().domain();
            assert_eq!(domain.action("goto-goal").map(|a| a.effect.cost()), Some(1));
        }

        // after `sync a` constraint 1 sits in its only accept state
        let constraints = vec![single_step_constraint("1")];
        let problem = encode(&trace, &constraints).problem(0);
        assert!(problem.objects_of_type(AUTOMATON_STATE).all(|s| !s.starts_with("gs_")));
        let text = problem.to_string();
        assert!(text.contains("(automaton s_1_s0 a s_1_s1)\n"));
        assert!(text.contains("(cur_state s_1_s1)\n))"));
        assert!(!text.contains("dummy_trans"));
    }

    #[test]
    fn trace_guarded_add() {
        let trace = single_step_trace();
        let constraints = vec![single_step_constraint("1")];
        let options = EncodingOptions {
            add_policy: AddPolicy::TraceGuarded,
            ..Default::default()
        };
        let domain = Replicated::new(&trace, &constraints, options).unwrap().domain();
        let add = domain.action("add").unwrap();
        assert_eq!(add.params, domain.action("sync").unwrap().params);
        assert_eq!(
            add.precondition.to_string(),
            "(and (cur_state ?t1) (trace ?t1 ?e ?t2))"
        );
        // the trace pointer stays put
        assert!(!add.effect.to_string().contains("(cur_state ?t2)"));
    }

    #[test]
    fn object_counts() {
        let trace = linear("trace", "", &["a", "b", "c"]);
        let constraints = vec![
            precedence_constraint("1"),
            precedence_constraint("2"),
            single_step_constraint("3"),
        ];
        let problem = encode(&trace, &constraints).problem(0);
        assert_eq!(problem.objects_of_type(TRACE_STATE).count(), 4);
        // 3 + 3 + 2 states plus one global accept per precedence automaton
        assert_eq!(problem.objects_of_type(AUTOMATON_STATE).count(), 10);
        assert_eq!(
            problem.objects_of_type(ACT).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert_eq!(problem.objects_of_type(DUMMY_ACT).count(), 1);
    }

    #[test]
    fn no_constraints() {
        let trace = single_step_trace();
        let problem = encode(&trace, &[]).problem(2);
        assert_eq!(problem.objects_of_type(AUTOMATON_STATE).count(), 0);
        assert_eq!(problem.goal.len(), 2);
        assert!(is_balanced(&problem.to_string()));
    }

    #[test]
    fn activity_named_like_dummy_collides() {
        let trace = linear("trace", "", &["dummy"]);
        let err = Replicated::new(&trace, &[], EncodingOptions::default()).unwrap_err();
        assert_eq!(
            err.kind(),
            &InvalidKind::IdentifierCollision {
                name: "dummy".to_string()
            }
        );
    }

    #[test]
    fn activity_named_like_trace_state_collides() {
        let trace = linear("trace", "", &["t1"]);
        let mut a = Automaton::new("4");
        let q = a.add_state("q");
        a.set_init(q);
        a.add_accept(q);
        let constraints = vec![Constraint::new(AutomatonId::new("4").unwrap(), a)];
        let err = Replicated::new(&trace, &constraints, EncodingOptions::default()).unwrap_err();
        assert!(matches!(err.kind(), InvalidKind::IdentifierCollision { name } if name == "t1"));
    }

    #[test]
    fn states_differing_in_case_collide() {
        let trace = single_step_trace();
        let mut a = Automaton::new("1");
        let lower = a.add_state("s0");
        let upper = a.add_state("S0");
        a.set_init(lower);
        a.add_transition(lower, "a", upper);
        a.add_accept(upper);
        let constraints = vec![Constraint::new(AutomatonId::new("1").unwrap(), a)];
        let err = Replicated::new(&trace, &constraints, EncodingOptions::default()).unwrap_err();
        assert_eq!(err.automaton(), "1");
        assert_eq!(
            err.kind(),
            &InvalidKind::IdentifierCollision {
                name: "s_1_S0".to_string()
            }
        );
    }

    #[test]
    fn activities_differing_in_case_collide() {
        let trace = linear("trace", "", &["Pay", "pay"]);
        let constraints = vec![single_step_constraint("1")];
        let err = Replicated::new(&trace, &constraints, EncodingOptions::default()).unwrap_err();
        assert_eq!(
            err.kind(),
            &InvalidKind::IdentifierCollision {
                name: "pay".to_string()
            }
        );
    }

    #[test]
    fn reserved_word_activity_is_rejected() {
        let trace = linear("trace", "", &["not"]);
        let err = Replicated::new(&trace, &[], EncodingOptions::default()).unwrap_err();
        assert!(matches!(err.kind(), InvalidKind::InvalidName { name, .. } if name == "not"));
    }

    #[test]
    fn dangling_endpoint_is_rejected() {
        let mut trace = single_step_trace();
        let from = trace.state_id_from_name("0").unwrap();
        trace.add_raw_transition(Transition {
            from,
            symbol: "a".to_string(),
            to: StateId::new(9),
        });
        let constraints = vec![single_step_constraint("1")];
        let err = Replicated::new(&trace, &constraints, EncodingOptions::default()).unwrap_err();
        assert!(matches!(err.kind(), InvalidKind::MalformedTransition { .. }));
    }
}
