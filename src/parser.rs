// Copyright 2025 Cornell University
// released under MIT License

use log::info;
use pest::error::InputLocation;
use pest::iterators::{Pair, Pairs};
use pest::{Parser, Span};
use pest_derive::Parser;
use std::path::Path;

use crate::automaton::*;
use crate::diagnostic::*;

#[derive(Parser)]
#[grammar = "automata.pest"]
struct AutomataParser;

/// A trace automaton and the id its problem is named after (`p-trace-<id>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceInput {
    pub id: u64,
    pub automaton: Automaton,
}

/// Everything declared in one automata file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub traces: Vec<TraceInput>,
    pub constraints: Vec<Constraint>,
}

impl ParsedFile {
    /// Source location of the automaton an `EncodingError` names
    pub fn loc_of(&self, automaton: &str) -> Option<Loc> {
        self.traces
            .iter()
            .map(|t| &t.automaton)
            .chain(self.constraints.iter().map(|c| &c.automaton))
            .find(|a| a.name() == automaton)
            .and_then(Automaton::loc)
    }
}

struct ParserContext<'a> {
    fileid: usize,
    handler: &'a mut DiagnosticHandler,
}

/// the `name` children of an item, skipping keywords
fn names<'i>(item: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    item.into_inner().filter(|p| p.as_rule() == Rule::name)
}

impl ParserContext<'_> {
    fn error(&mut self, pair: &Pair<'_, Rule>, msg: String) -> String {
        self.handler
            .emit_diagnostic_parsing(&msg, self.fileid, pair, Level::Error);
        msg
    }

    fn state(&mut self, automaton: &Automaton, pair: &Pair<'_, Rule>) -> Result<StateId, String> {
        match automaton.state_id_from_name(pair.as_str()) {
            Some(id) => Ok(id),
            None => Err(self.error(pair, format!("undeclared state `{}`", pair.as_str()))),
        }
    }

    fn parse_automaton(
        &mut self,
        name: String,
        items: Pairs<'_, Rule>,
        span: Span<'_>,
    ) -> Result<Automaton, String> {
        let mut automaton = Automaton::new(name);
        automaton.set_loc(span.start(), span.end(), self.fileid);
        let items: Vec<Pair<'_, Rule>> = items.collect();

        // states are collected first, so they may be referenced before `states`
        for item in items.iter().filter(|p| p.as_rule() == Rule::states) {
            for state in names(item.clone()) {
                automaton.add_state(state.as_str());
            }
        }

        for item in items {
            match item.as_rule() {
                Rule::states => {}
                Rule::alphabet => {
                    for symbol in names(item) {
                        automaton.declare_symbol(symbol.as_str());
                    }
                }
                Rule::init => {
                    if automaton.init().is_some() {
                        let msg = "initial state is declared more than once".to_string();
                        return Err(self.error(&item, msg));
                    }
                    for state in names(item) {
                        let id = self.state(&automaton, &state)?;
                        automaton.set_init(id);
                    }
                }
                Rule::accept => {
                    for state in names(item) {
                        let id = self.state(&automaton, &state)?;
                        automaton.add_accept(id);
                    }
                }
                Rule::transition => {
                    let span = item.as_span();
                    let parts: Vec<Pair<'_, Rule>> = names(item.clone()).collect();
                    let [from, symbol, to] = parts.as_slice() else {
                        return Err(self.error(&item, "malformed transition".to_string()));
                    };
                    let from = self.state(&automaton, from)?;
                    let to = self.state(&automaton, to)?;
                    let id = automaton.add_transition(from, symbol.as_str(), to);
                    automaton.add_transition_loc(id, span.start(), span.end(), self.fileid);
                }
                rule => return Err(format!("unexpected {rule:?} in automaton body")),
            }
        }
        Ok(automaton)
    }

    fn parse_trace(&mut self, pair: Pair<'_, Rule>) -> Result<TraceInput, String> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let id_pair = inner.next().ok_or("trace without an id")?;
        let id = match id_pair.as_str().parse::<u64>() {
            Ok(id) => id,
            Err(e) => {
                let msg = format!("invalid trace id `{}`: {e}", id_pair.as_str());
                return Err(self.error(&id_pair, msg));
            }
        };
        let automaton = self.parse_automaton(format!("trace {id}"), inner, span)?;
        Ok(TraceInput { id, automaton })
    }

    fn parse_constraint(&mut self, pair: Pair<'_, Rule>) -> Result<Constraint, String> {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let id_pair = inner.next().ok_or("constraint without an id")?;
        let id = match AutomatonId::new(id_pair.as_str()) {
            Ok(id) => id,
            Err(e) => return Err(self.error(&id_pair, e.to_string())),
        };
        let automaton = self.parse_automaton(id.to_string(), inner, span)?;
        Ok(Constraint::new(id, automaton))
    }
}

pub fn parse_file(
    filename: impl AsRef<Path>,
    handler: &mut DiagnosticHandler,
) -> Result<ParsedFile, String> {
    let path = filename.as_ref();
    let input = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
    parse_str(&path.display().to_string(), input, handler)
}

/// Parses `input`, registering it with `handler` under `name`.
pub fn parse_str(
    name: &str,
    input: String,
    handler: &mut DiagnosticHandler,
) -> Result<ParsedFile, String> {
    let fileid = handler.add_file(name.to_string(), input.clone());

    let pairs = match AutomataParser::parse(Rule::file, &input) {
        Ok(pairs) => pairs,
        Err(err) => {
            let (start, end) = match err.location {
                InputLocation::Pos(start) => (start, start),
                InputLocation::Span(span) => span,
            };
            let msg: String = format!("Lexing failed: {}", err.variant.message());
            handler.emit_diagnostic_lexing(&msg, fileid, start, end, Level::Error);
            return Err(msg);
        }
    };

    let mut context = ParserContext { fileid, handler };
    let mut parsed = ParsedFile::default();
    for pair in pairs.flat_map(|file| file.into_inner()) {
        match pair.as_rule() {
            Rule::trace => {
                let span = pair.as_span();
                let trace = context.parse_trace(pair)?;
                if parsed.traces.iter().any(|t| t.id == trace.id) {
                    let msg = format!("trace {} is declared more than once", trace.id);
                    context
                        .handler
                        .emit_diagnostic_lexing(&msg, fileid, span.start(), span.end(), Level::Error);
                    return Err(msg);
                }
                parsed.traces.push(trace);
            }
            Rule::constraint => parsed.constraints.push(context.parse_constraint(pair)?),
            Rule::EOI => {}
            rule => return Err(format!("unexpected {rule:?} at the top level")),
        }
    }

    info!(
        "Parsed {}: {} traces, {} constraint automata",
        name,
        parsed.traces.len(),
        parsed.constraints.len()
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_STEP: &str = "
        // the smallest interesting alignment problem
        trace 0 {
            states 0 1;
            init 0;
            accept 1;
            0 --a-> 1;
        }

        constraint 1 {
            states s0 s1;
            init s0;
            accept s1;
            s0 --a-> s1;
        }
    ";

    fn parse(input: &str) -> (Result<ParsedFile, String>, DiagnosticHandler) {
        let mut handler = DiagnosticHandler::default();
        let res = parse_str("test.aut", input.to_string(), &mut handler);
        (res, handler)
    }

    #[test]
    fn single_step_file() {
        let (res, handler) = parse(SINGLE_STEP);
        let parsed = res.unwrap();
        assert_eq!(handler.error_string(), "");
        assert_eq!(parsed.traces.len(), 1);
        assert_eq!(parsed.constraints.len(), 1);

        let trace = &parsed.traces[0];
        assert_eq!(trace.id, 0);
        assert_eq!(trace.automaton.name(), "trace 0");
        assert_eq!(trace.automaton.size(), 2);
        assert_eq!(trace.automaton.alphabet(), &["a".to_string()]);

        let c = &parsed.constraints[0];
        assert_eq!(c.id.as_str(), "1");
        let init = c.automaton.init().unwrap();
        assert_eq!(c.automaton[init].name(), "s0");
        let (tid, tran) = c.automaton.transitions().next().unwrap();
        assert_eq!(c.automaton.describe_transition(tran), "s0 --a-> s1");
        assert!(c.automaton.transition_loc(tid).is_some());
        assert!(parsed.loc_of("1").is_some());
        assert!(parsed.loc_of("trace 0").is_some());
        assert_eq!(parsed.loc_of("2"), None);
    }

    #[test]
    fn dashed_symbols_and_late_states() {
        let (res, _) = parse(
            "constraint resp {
                s0 --register-request-> s1;
                s1 --pay-> s0;
                alphabet reject;
                states s0 s1;
                init s0;
                accept s0 s1;
            }",
        );
        let parsed = res.unwrap();
        let a = &parsed.constraints[0].automaton;
        assert_eq!(
            a.alphabet(),
            &[
                "register-request".to_string(),
                "pay".to_string(),
                "reject".to_string()
            ]
        );
        assert_eq!(a.accept().len(), 2);
    }

    #[test]
    fn keywords_need_a_boundary() {
        let (res, _) = parse(
            "trace 3 {
                states init0 states;
                init init0;
                accept states;
                init0 --a-> states;
            }",
        );
        let parsed = res.unwrap();
        let a = &parsed.traces[0].automaton;
        let names: Vec<&str> = a.states().map(|(_, s)| s.name()).collect();
        assert_eq!(names, vec!["init0", "states"]);
        assert_eq!(a.num_transitions(), 1);
    }

    #[test]
    fn lexing_errors_are_reported() {
        let (res, handler) = parse("trace 0 { states 0 1 }");
        let msg = res.unwrap_err();
        assert!(msg.starts_with("Lexing failed"));
        assert!(handler.error_string().contains("test.aut:1:"));
    }

    #[test]
    fn undeclared_state() {
        let (res, handler) = parse("constraint 2 { states q0; init q0; accept q9; }");
        assert_eq!(res.unwrap_err(), "undeclared state `q9`");
        assert!(handler.error_string().contains("undeclared state `q9`"));
    }

    #[test]
    fn duplicate_traces_and_inits() {
        let (res, _) = parse("trace 1 { states a; init a; accept a; } trace 1 { states a; }");
        assert_eq!(res.unwrap_err(), "trace 1 is declared more than once");

        let (res, _) = parse("constraint 4 { states a b; init a; init b; }");
        assert_eq!(res.unwrap_err(), "initial state is declared more than once");
    }

    #[test]
    fn fixture_file() {
        let mut handler = DiagnosticHandler::default();
        let parsed = parse_file("tests/automata/precedence.aut", &mut handler).unwrap();
        let ids: Vec<u64> = parsed.traces.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![0, 1]);
        let constraints: Vec<&str> = parsed.constraints.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(constraints, vec!["2", "1"]);
    }

    #[test]
    fn missing_file() {
        let mut handler = DiagnosticHandler::default();
        let err = parse_file("tests/automata/does-not-exist.aut", &mut handler).unwrap_err();
        assert!(err.starts_with("failed to load"));
    }
}
