// Copyright 2025 Cornell University
// released under MIT License

use std::fmt::{self, Write};

use crate::pddl::*;

fn pad(index: usize) -> String {
    " ".repeat(index)
}

pub fn serialize_typed_lists(out: &mut impl Write, lists: &[TypedList]) -> fmt::Result {
    for (ii, list) in lists.iter().enumerate() {
        if ii > 0 {
            write!(out, " ")?;
        }
        write!(out, "{}", list.names.join(" "))?;
        if let Some(tpe) = &list.tpe {
            write!(out, " - {tpe}")?;
        }
    }
    Ok(())
}

/// Writes `formula`; nested quantifiers and conditional effects are broken
/// over several lines, indented relative to `index`.
pub fn serialize_formula(out: &mut impl Write, formula: &Formula, index: usize) -> fmt::Result {
    match formula {
        Formula::Atom(pred, args) => {
            write!(out, "({pred}")?;
            for arg in args {
                write!(out, " {arg}")?;
            }
            write!(out, ")")
        }
        Formula::Increase(fluent, amount) => write!(out, "(increase ({fluent}) {amount})"),
        Formula::FluentEq(fluent, value) => write!(out, "(= ({fluent}) {value})"),
        Formula::Not(inner) => {
            write!(out, "(not ")?;
            serialize_formula(out, inner, index)?;
            write!(out, ")")
        }
        Formula::And(conjuncts) if formula.is_simple() => {
            write!(out, "(and")?;
            for conjunct in conjuncts {
                write!(out, " ")?;
                serialize_formula(out, conjunct, index)?;
            }
            write!(out, ")")
        }
        Formula::And(conjuncts) => {
            write!(out, "(and")?;
            for conjunct in conjuncts {
                write!(out, "\n{}", pad(index + 2))?;
                serialize_formula(out, conjunct, index + 2)?;
            }
            write!(out, ")")
        }
        Formula::Imply(lhs, rhs) => {
            write!(out, "(imply ")?;
            serialize_formula(out, lhs, index)?;
            if formula.is_simple() {
                write!(out, " ")?;
                serialize_formula(out, rhs, index)?;
            } else {
                write!(out, "\n{}", pad(index + 2))?;
                serialize_formula(out, rhs, index + 2)?;
            }
            write!(out, ")")
        }
        Formula::Forall(vars, body) => {
            write!(out, "(forall (")?;
            serialize_typed_lists(out, vars)?;
            write!(out, ")\n{}", pad(index + 2))?;
            serialize_formula(out, body, index + 2)?;
            write!(out, ")")
        }
        Formula::When(cond, effect) => {
            write!(out, "(when ")?;
            serialize_formula(out, cond, index)?;
            write!(out, "\n{}", pad(index + 2))?;
            serialize_formula(out, effect, index + 2)?;
            write!(out, ")")
        }
    }
}

pub fn serialize_action(out: &mut impl Write, action: &Action) -> fmt::Result {
    writeln!(out, "(:action {}", action.name)?;
    write!(out, ":parameters (")?;
    serialize_typed_lists(out, &action.params)?;
    writeln!(out, ")")?;
    write!(out, ":precondition ")?;
    serialize_formula(out, &action.precondition, 0)?;
    writeln!(out)?;
    write!(out, ":effect ")?;
    serialize_formula(out, &action.effect, 0)?;
    writeln!(out)?;
    writeln!(out, ")")
}

pub fn serialize_domain(out: &mut impl Write, domain: &Domain) -> fmt::Result {
    writeln!(out, "(define (domain {})", domain.name)?;
    writeln!(out, "(:requirements {})", domain.requirements.join(" "))?;
    write!(out, "(:types ")?;
    serialize_typed_lists(out, &domain.types)?;
    writeln!(out, ")")?;

    writeln!(out, "(:predicates")?;
    for pred in &domain.predicates {
        write!(out, "({}", pred.name)?;
        if !pred.params.is_empty() {
            write!(out, " ")?;
            serialize_typed_lists(out, &pred.params)?;
        }
        writeln!(out, ")")?;
    }
    writeln!(out, ")")?;

    writeln!(out, "(:functions")?;
    for function in &domain.functions {
        writeln!(out, "({function})")?;
    }
    writeln!(out, ")")?;

    for action in &domain.actions {
        writeln!(out)?;
        serialize_action(out, action)?;
    }
    writeln!(out, ")")
}

pub fn serialize_problem(out: &mut impl Write, problem: &Problem) -> fmt::Result {
    writeln!(out, "(define (problem {})", problem.name)?;
    writeln!(out, "(:domain {})", problem.domain)?;

    writeln!(out, "(:objects")?;
    for (name, tpe) in &problem.objects {
        writeln!(out, "{name} - {tpe}")?;
    }
    writeln!(out, ")")?;

    writeln!(out, "(:init")?;
    for fact in &problem.init {
        serialize_formula(out, fact, 0)?;
        writeln!(out)?;
    }
    writeln!(out, ")")?;

    writeln!(out, "(:goal (and")?;
    for goal in &problem.goal {
        serialize_formula(out, goal, 0)?;
        writeln!(out)?;
    }
    writeln!(out, "))")?;

    writeln!(out, "(:metric minimize ({}))", problem.metric)?;
    writeln!(out, ")")
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        serialize_formula(f, self, 0)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        serialize_domain(f, self)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        serialize_problem(f, self)
    }
}

/// `true` if every `(` in `text` is closed and no `)` is unmatched
pub fn is_balanced(text: &str) -> bool {
    let mut depth: usize = 0;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}
