//! Parallel-only entrypoint: a preset over the same core with the
//! candidate fixed at 2,000 ms / 512 MB under c++17 and no archival.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stress_judge::{Report, Standard, StressRun};

const TIME_LIMIT_MS: u64 = 2_000;
const MEMORY_LIMIT_MB: u64 = 512;
const MAX_COUNT: u32 = 50;

/// Preset stress judge: repeat a generator/reference/candidate triple with
/// fixed candidate limits.
#[derive(Parser, Debug)]
#[command(name = "judge-parallel")]
struct Cli {
    /// Generator source; prints a test input on stdout
    generator: PathBuf,
    /// Reference source; prints the trusted answer for the generated input
    reference: PathBuf,
    /// Candidate source; the program under test
    candidate: PathBuf,
    /// Number of repetitions, 1 to 49
    count: u32,
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

    if cli.count == 0 || cli.count >= MAX_COUNT {
        bail!("k must be 1-49");
    }

    let run = StressRun {
        generator: cli.generator,
        reference: cli.reference,
        candidate: cli.candidate,
        count: cli.count,
        standard: Standard::Cpp17,
        time_limit_ms: TIME_LIMIT_MS,
        memory_limit_mb: MEMORY_LIMIT_MB,
        archive_root: None,
    };

    let outcomes = run.execute();
    let report = Report::from_outcomes(&outcomes, run.standard, TIME_LIMIT_MS, MEMORY_LIMIT_MB);
    println!("{}", report.to_json()?);
    Ok(())
}
