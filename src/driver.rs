// Copyright 2025 Cornell University
// released under MIT License

//! File level pipeline used by the command line tool: parse an automata
//! file, encode every trace against all constraints and write the results.

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::diagnostic::DiagnosticHandler;
use crate::encoding::{problem_name, Encoding, EncodingOptions, Strategy};
use crate::parser::{parse_file, ParsedFile};

pub const DOMAIN_FILE: &str = "domain.pddl";

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub strategy: Strategy,
    /// `reuse_domain` suppresses `domain.pddl`
    pub options: EncodingOptions,
    pub out_dir: PathBuf,
}

/// Returns the paths written, domain first.
pub fn compile_file(
    automata: impl AsRef<Path>,
    config: &DriverConfig,
    handler: &mut DiagnosticHandler,
) -> Result<Vec<PathBuf>> {
    let parsed = parse_file(automata.as_ref(), handler).map_err(|msg| anyhow!(msg))?;
    compile_parsed(&parsed, config, handler)
}

pub fn compile_parsed(
    parsed: &ParsedFile,
    config: &DriverConfig,
    handler: &mut DiagnosticHandler,
) -> Result<Vec<PathBuf>> {
    if parsed.traces.is_empty() {
        bail!("no trace automaton to align");
    }
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed to create {}", config.out_dir.display()))?;

    let mut options = config.options;
    let mut written = vec![];
    for trace in &parsed.traces {
        let encoding = match Encoding::new(
            config.strategy,
            &trace.automaton,
            &parsed.constraints,
            options,
        ) {
            Ok(encoding) => encoding,
            Err(err) => {
                handler.emit_encoding_error(&err, parsed.loc_of(err.automaton()));
                return Err(err).with_context(|| format!("failed to encode trace {}", trace.id));
            }
        };
        let compiled = encoding.compile(trace.id);
        if let Some(domain) = compiled.domain {
            written.push(write_file(config.out_dir.join(DOMAIN_FILE), &domain)?);
        }
        let problem_file = config.out_dir.join(format!("{}.pddl", problem_name(trace.id)));
        written.push(write_file(problem_file, &compiled.problem)?);
        // the domain does not depend on the automata
        options.reuse_domain = true;
    }
    Ok(written)
}

fn write_file(path: PathBuf, content: &str) -> Result<PathBuf> {
    fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(path)
}
