//! Rich-mode entrypoint: full control over limits, standard, and archival.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stress_judge::{executor, Report, Standard, StressRun};

/// Stress-testing judge: run a generator/reference/candidate triple `k`
/// times in parallel and report a verdict for every run.
#[derive(Parser, Debug)]
#[command(name = "judge")]
struct Cli {
    /// Generator source; prints a test input on stdout
    generator: PathBuf,
    /// Reference source; prints the trusted answer for the generated input
    reference: PathBuf,
    /// Candidate source; the program under test
    candidate: PathBuf,
    /// Number of repetitions
    count: u32,
    /// Language standard: c++98, c++11, c++14, c++17 or c++20
    standard: String,
    /// Candidate wall-clock limit in milliseconds
    time_limit_ms: u64,
    /// Candidate memory limit in MB
    memory_limit_mb: u64,
    /// Archive directory for failing runs; pass "" to disable archival
    savedir: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("stress_judge=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        std::process::exit(1);
    });

    let standard: Standard = cli.standard.parse()?;
    if cli.count == 0 {
        bail!("repetition count must be at least 1");
    }

    let archive_root = if cli.savedir.is_empty() {
        None
    } else {
        let root = PathBuf::from(&cli.savedir);
        executor::ensure_dir(&root)?;
        Some(root)
    };

    let run = StressRun {
        generator: cli.generator,
        reference: cli.reference,
        candidate: cli.candidate,
        count: cli.count,
        standard,
        time_limit_ms: cli.time_limit_ms,
        memory_limit_mb: cli.memory_limit_mb,
        archive_root,
    };

    let outcomes = run.execute();
    let report = Report::from_outcomes(&outcomes, standard, run.time_limit_ms, run.memory_limit_mb);
    println!("{}", report.to_json()?);
    Ok(())
}
