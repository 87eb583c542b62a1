// Copyright 2025 Cornell University
// released under MIT License

use std::path::PathBuf;

use anyhow::Context;
use clap::{ColorChoice, Parser};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use trace_alignment::diagnostic::DiagnosticHandler;
use trace_alignment::driver::{compile_file, DriverConfig};
use trace_alignment::encoding::{AddPolicy, EncodingOptions, GotoGoalCost, Strategy};

// $ cargo run -- -a tests/automata/precedence.aut -o out --strategy shared

/// Args for the alignment compiler CLI
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Path to a file with trace and constraint automata
    #[arg(short, long, value_name = "AUTOMATA_FILE")]
    automata: PathBuf,

    /// Directory that receives `domain.pddl` and one `p-trace-<id>.pddl` per trace
    #[arg(short, long, value_name = "OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// How constraint states are turned into planning objects
    #[arg(long, value_enum, default_value_t = Strategy::ReplicatedIds)]
    strategy: Strategy,

    /// Whether `add` may insert any activity or only one the trace offers next
    #[arg(long, value_enum, default_value_t = AddPolicy::Unconstrained)]
    add_policy: AddPolicy,

    /// Cost of the `goto-goal` bookkeeping action (replicated strategy only)
    #[arg(long, value_enum, default_value_t = GotoGoalCost::Free)]
    goto_goal_cost: GotoGoalCost,

    /// Only write the problem files, e.g. when the domain is already on disk
    #[arg(long)]
    problem_only: bool,

    /// Users can specify `-v` or `--verbose` to toggle logging
    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,

    /// To suppress colors in error messages, pass in `--color never`
    /// Otherwise, by default, error messages are displayed w/ ANSI colors
    #[arg(long, value_name = "COLOR_CHOICE", default_value = "auto")]
    color: ColorChoice,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // For concision, we disable timestamps in the log
    let mut logger = env_logger::Builder::new();
    logger
        .format_timestamp(None)
        .filter_level(cli.verbosity.log_level_filter());
    if cli.color == ColorChoice::Never {
        logger.write_style(env_logger::WriteStyle::Never);
    }
    logger.init();

    let mut handler = DiagnosticHandler::new(cli.color);
    let config = DriverConfig {
        strategy: cli.strategy,
        options: EncodingOptions {
            add_policy: cli.add_policy,
            goto_goal_cost: cli.goto_goal_cost,
            reuse_domain: cli.problem_only,
        },
        out_dir: cli.out_dir,
    };

    compile_file(&cli.automata, &config, &mut handler)
        .with_context(|| format!("failed to compile {}", cli.automata.display()))?;
    Ok(())
}
