// Copyright 2025 Cornell University
// released under MIT License

pub mod automaton;
pub mod diagnostic;
pub mod driver;
pub mod encoding;
pub mod errors;
pub mod names;
pub mod parser;
pub mod pddl;
pub mod serialize;
pub mod static_checks;
