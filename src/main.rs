use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{info, warn};

use threesbot::{Answer, Policy, Query, Solver, SolverConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// play for the highest expected score
    Expectation,
    /// play for the highest guaranteed score
    Maximin,
}

impl From<PolicyArg> for Policy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Expectation => Policy::Expectation,
            PolicyArg::Maximin => Policy::Maximin,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "threesbot", about = "Answer 2x3 Threes position queries read from stdin")]
struct Args {
    /// Branch selection for player moves [default: expectation]
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Read a previously saved table instead of building one
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write the table here once it is built
    #[arg(long)]
    save: Option<PathBuf>,

    /// Hide the build spinner
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let solver = match &args.load {
        Some(path) => {
            let solver = Solver::load(path).with_context(|| format!("loading {}", path.display()))?;
            if let Some(policy) = args.policy {
                solver.require_policy(policy.into())?;
            }
            solver
        }
        None => {
            let config = SolverConfig {
                policy: args.policy.map(Policy::from).unwrap_or_default(),
                show_progress: !args.quiet,
                ..SolverConfig::default()
            };
            let mut solver = Solver::new(config);
            solver.build().context("building the table")?;
            solver
        }
    };
    if let Some(path) = &args.save {
        solver.save(path).with_context(|| format!("saving {}", path.display()))?;
    }

    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());
    let mut answered = 0;
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let query: Query = match line.parse() {
            Ok(query) => query,
            Err(e) => {
                warn!("skipping {:?}: {}", line, e);
                continue;
            }
        };
        let answer = solver.solve(&query.board, query.kind).unwrap_or_else(|e| {
            warn!("{}: {}", query, e);
            Answer::UNSET
        });
        writeln!(out, "{} = {}", query, answer)?;
        answered += 1;
    }
    out.flush()?;
    info!("answered {} queries", answered);
    Ok(())
}
