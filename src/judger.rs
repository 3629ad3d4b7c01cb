//! Per-task pipeline: provision, stage, compile, run, compare, archive,
//! tear down.
//!
//! A task is the unit of isolation. Every stage happens inside a private
//! working directory that is removed on all exit paths, and a task always
//! reports a `TaskOutcome`: host-level errors are caught at the pipeline
//! boundary and become `UKE`, so a task can never take its worker down.

use std::cmp;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::comparator;
use crate::compiler;
use crate::executor::{self, ExecutionLimits, ExecutionSpec, ExecutionStatus};
use crate::logger::TaskLogger;
use crate::pool::WorkerPool;
use crate::standards::Standard;
use crate::verdict::Verdict;

/// Program names inside the isolation directory; sources are `<name>.cpp`,
/// executables `<name>.exe`, diagnostics `<name>_err.txt`.
const GENERATOR: &str = "make";
const REFERENCE: &str = "ans";
const CANDIDATE: &str = "unknown";

const INPUT_FILE: &str = "data.in";
const EXPECTED_FILE: &str = "data.ans";
const OUTPUT_FILE: &str = "data.out";

/// Generator bound: wall clock only, no memory cap.
const GENERATOR_TIME_LIMIT_MS: u64 = 5_000;
/// Reference bounds: trusted but still confined.
const REFERENCE_TIME_LIMIT_MS: u64 = 60_000;
const REFERENCE_MEMORY_LIMIT_MB: u64 = 4_096;

/// Upper bound on pool size regardless of the repetition count.
pub const MAX_WORKERS: usize = 4;

/// Read-back cap for the previews carried in an outcome.
const PREVIEW_LIMIT: usize = 10_000;

/// Immutable description of one stress task.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub id: u32,
    pub generator: PathBuf,
    pub reference: PathBuf,
    pub candidate: PathBuf,
    pub standard: Standard,
    /// Candidate wall-clock limit in milliseconds.
    pub time_limit_ms: u64,
    /// Candidate memory limit in MB.
    pub memory_limit_mb: u64,
    /// Root for failing-run evidence; `None` disables archival.
    pub archive_root: Option<PathBuf>,
}

/// Immutable result of one stress task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub id: u32,
    pub verdict: Verdict,
    pub message: String,
    pub standard: Standard,
    /// Generator output, truncated.
    pub input_preview: String,
    /// Reference output, truncated.
    pub expected_preview: String,
    /// Candidate output, truncated.
    pub output_preview: String,
    pub files_saved: bool,
    pub saved_path: Option<PathBuf>,
}

impl TaskOutcome {
    fn new(spec: &TaskSpec, verdict: Verdict, message: impl Into<String>) -> Self {
        Self {
            id: spec.id,
            verdict,
            message: message.into(),
            standard: spec.standard,
            input_preview: String::new(),
            expected_preview: String::new(),
            output_preview: String::new(),
            files_saved: false,
            saved_path: None,
        }
    }

    /// Outcome for failures of the framework itself.
    pub fn framework_error(spec: &TaskSpec, message: impl Into<String>) -> Self {
        Self::new(spec, Verdict::UnknownError, message)
    }
}

/// Run one task to a verdict. Never fails: every host-level error becomes
/// a `UKE` outcome, and the isolation directory is removed on every path.
pub fn run_task(spec: &TaskSpec) -> TaskOutcome {
    let dir = match executor::create_task_dir(spec.id) {
        Ok(dir) => dir,
        Err(err) => {
            return TaskOutcome::framework_error(
                spec,
                format!("failed to provision isolation directory: {:#}", err),
            )
        }
    };
    let logger = TaskLogger::create(&dir, spec.id);
    logger.log(&format!("judge start in {}", dir.display()));

    let mut outcome = judge_in_dir(spec, &dir, &logger).unwrap_or_else(|err| {
        logger.log(&format!("framework error: {:#}", err));
        TaskOutcome::framework_error(spec, format!("{:#}", err))
    });

    if outcome.verdict != Verdict::Accepted {
        if let Some(root) = &spec.archive_root {
            match archive_artifacts(&dir, root, spec, &outcome, &logger) {
                Ok(saved) => {
                    outcome.files_saved = true;
                    outcome.saved_path = Some(saved);
                }
                // Advisory: the verdict stands even when evidence is lost.
                Err(err) => logger.log(&format!("archival failed: {:#}", err)),
            }
        }
    }

    drop(logger);
    executor::remove_dir_best_effort(&dir);
    outcome
}

fn judge_in_dir(spec: &TaskSpec, dir: &Path, logger: &TaskLogger) -> Result<TaskOutcome> {
    let sources = [
        (&spec.generator, GENERATOR),
        (&spec.reference, REFERENCE),
        (&spec.candidate, CANDIDATE),
    ];
    for (origin, program) in sources {
        let staged = dir.join(format!("{}.cpp", program));
        executor::copy_file(origin, &staged)
            .with_context(|| format!("staging {}.cpp failed", program))?;
    }
    logger.log("sources staged");

    for program in [GENERATOR, REFERENCE, CANDIDATE] {
        let source = format!("{}.cpp", program);
        logger.log(&format!("compiling {} as {}", source, spec.standard));
        let compiled = compiler::compile(dir, &source, program, spec.standard)
            .with_context(|| format!("compiler invocation for {} failed", source))?;
        if !compiled.success {
            if let Some(diagnostics) = &compiled.diagnostics {
                logger.log(&format!("compile failed: {}", diagnostics));
            }
            return Ok(TaskOutcome::new(
                spec,
                Verdict::CompileError,
                format!("{} compile error", source),
            ));
        }
        logger.log("compile OK");
    }

    logger.log(&format!(
        "running generator (limit {} ms)",
        GENERATOR_TIME_LIMIT_MS
    ));
    let status = run_stage(
        dir,
        GENERATOR,
        None,
        INPUT_FILE,
        ExecutionLimits {
            time_ms: GENERATOR_TIME_LIMIT_MS,
            memory_mb: 0,
        },
    );
    if !status.is_success() {
        logger.log(&format!("generator failed: {}", status));
        return Ok(TaskOutcome::new(
            spec,
            Verdict::UnknownError,
            format!("make failed: {}", status),
        ));
    }
    let input_preview = read_preview(&dir.join(INPUT_FILE));

    logger.log(&format!(
        "running reference (limit {} ms / {} MB)",
        REFERENCE_TIME_LIMIT_MS, REFERENCE_MEMORY_LIMIT_MB
    ));
    let status = run_stage(
        dir,
        REFERENCE,
        Some(INPUT_FILE),
        EXPECTED_FILE,
        ExecutionLimits {
            time_ms: REFERENCE_TIME_LIMIT_MS,
            memory_mb: REFERENCE_MEMORY_LIMIT_MB,
        },
    );
    if !status.is_success() {
        logger.log(&format!("reference failed: {}", status));
        let mut outcome = TaskOutcome::new(
            spec,
            Verdict::UnknownError,
            format!("ans failed: {}", status),
        );
        outcome.input_preview = input_preview;
        return Ok(outcome);
    }
    let expected_preview = read_preview(&dir.join(EXPECTED_FILE));

    logger.log(&format!(
        "running candidate (limit {} ms / {} MB)",
        spec.time_limit_ms, spec.memory_limit_mb
    ));
    let status = run_stage(
        dir,
        CANDIDATE,
        Some(INPUT_FILE),
        OUTPUT_FILE,
        ExecutionLimits {
            time_ms: spec.time_limit_ms,
            memory_mb: spec.memory_limit_mb,
        },
    );
    let output_preview = read_preview(&dir.join(OUTPUT_FILE));

    let (verdict, message) = match &status {
        ExecutionStatus::TimedOut => (
            Verdict::TimeLimitExceeded,
            "Time Limit Exceeded".to_string(),
        ),
        status if status.is_memory_class() => (
            Verdict::MemoryLimitExceeded,
            "Memory Limit Exceeded".to_string(),
        ),
        ExecutionStatus::SpawnFailed(reason) => (
            Verdict::UnknownError,
            format!("unknown failed to start: {}", reason),
        ),
        ExecutionStatus::Exited(0) => {
            logger.log("comparing outputs");
            if comparator::outputs_match(&dir.join(EXPECTED_FILE), &dir.join(OUTPUT_FILE))? {
                (Verdict::Accepted, "Accepted".to_string())
            } else {
                (Verdict::WrongAnswer, "Wrong Answer".to_string())
            }
        }
        status => {
            logger.log(&format!("candidate failed: {}", status));
            (Verdict::RuntimeError, "Runtime Error".to_string())
        }
    };
    logger.log(&format!("verdict {}", verdict));

    let mut outcome = TaskOutcome::new(spec, verdict, message);
    outcome.input_preview = input_preview;
    outcome.expected_preview = expected_preview;
    outcome.output_preview = output_preview;
    Ok(outcome)
}

fn run_stage(
    dir: &Path,
    program: &str,
    stdin: Option<&str>,
    stdout: &str,
    limits: ExecutionLimits,
) -> ExecutionStatus {
    let mut spec = ExecutionSpec::new(dir, dir.join(format!("{}.exe", program)))
        .with_stdout(dir.join(stdout))
        .with_stderr(dir.join(format!("{}_err.txt", program)))
        .with_limits(limits);
    if let Some(name) = stdin {
        spec = spec.with_stdin(dir.join(name));
    }
    executor::execute_bounded(&spec)
}

/// Read a produced file into the outcome, truncated for transport.
fn read_preview(path: &Path) -> String {
    let Ok(raw) = fs::read(path) else {
        return String::new();
    };
    let text = String::from_utf8_lossy(&raw);
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(PREVIEW_LIMIT).collect();
    if chars.next().is_some() {
        format!("{}\n...(truncated)", preview)
    } else {
        preview
    }
}

/// Copy the evidence for a failing task under `<root>/task_<id>/`.
///
/// Artifact files are copied raw, byte for byte; a stage that never
/// produced its file falls back to the captured preview. Archival is
/// advisory: the caller logs failures and keeps the verdict.
fn archive_artifacts(
    dir: &Path,
    root: &Path,
    spec: &TaskSpec,
    outcome: &TaskOutcome,
    logger: &TaskLogger,
) -> Result<PathBuf> {
    let dest = root.join(format!("task_{}", spec.id));
    executor::ensure_dir(&dest)?;

    stash(
        &dir.join(INPUT_FILE),
        &dest.join("input.txt"),
        &outcome.input_preview,
    )?;
    stash(
        &dir.join(EXPECTED_FILE),
        &dest.join("expected.txt"),
        &outcome.expected_preview,
    )?;
    stash(
        &dir.join(OUTPUT_FILE),
        &dest.join("output.txt"),
        &outcome.output_preview,
    )?;
    stash(logger.path(), &dest.join("log.txt"), "")?;
    fs::write(
        dest.join("summary.txt"),
        format!(
            "Task: {}\nResult: {}\nMsg: {}\n",
            spec.id, outcome.verdict, outcome.message
        ),
    )
    .context("failed to write summary.txt")?;

    logger.log(&format!("saved artifacts to {}", dest.display()));
    Ok(dest)
}

fn stash(src: &Path, dst: &Path, fallback: &str) -> Result<()> {
    if src.is_file() && executor::copy_file(src, dst).is_ok() {
        return Ok(());
    }
    fs::write(dst, fallback).with_context(|| format!("failed to write {}", dst.display()))
}

/// Full stress run: `count` independent tasks over a bounded pool.
#[derive(Debug, Clone)]
pub struct StressRun {
    pub generator: PathBuf,
    pub reference: PathBuf,
    pub candidate: PathBuf,
    pub count: u32,
    pub standard: Standard,
    pub time_limit_ms: u64,
    pub memory_limit_mb: u64,
    pub archive_root: Option<PathBuf>,
}

impl StressRun {
    /// Execute every task and collect outcomes in submission order; the
    /// completion order of workers never shows in the result.
    pub fn execute(&self) -> Vec<TaskOutcome> {
        let workers = cmp::min(self.count as usize, MAX_WORKERS);
        let pool = WorkerPool::new(workers);

        let handles: Vec<_> = (0..self.count)
            .map(|id| {
                let spec = self.task_spec(id);
                pool.submit(move || run_task(&spec))
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(id, handle)| {
                handle.join().unwrap_or_else(|err| {
                    TaskOutcome::framework_error(&self.task_spec(id as u32), format!("{:#}", err))
                })
            })
            .collect()
    }

    fn task_spec(&self, id: u32) -> TaskSpec {
        TaskSpec {
            id,
            generator: self.generator.clone(),
            reference: self.reference.clone(),
            candidate: self.candidate.clone(),
            standard: self.standard,
            time_limit_ms: self.time_limit_ms,
            memory_limit_mb: self.memory_limit_mb,
            archive_root: self.archive_root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with_missing_sources(id: u32) -> TaskSpec {
        TaskSpec {
            id,
            generator: PathBuf::from("/nonexistent/gen.cpp"),
            reference: PathBuf::from("/nonexistent/ref.cpp"),
            candidate: PathBuf::from("/nonexistent/cand.cpp"),
            standard: Standard::Cpp17,
            time_limit_ms: 1_000,
            memory_limit_mb: 256,
            archive_root: None,
        }
    }

    #[test]
    fn missing_sources_become_a_framework_verdict() {
        let outcome = run_task(&spec_with_missing_sources(0));
        assert_eq!(outcome.verdict, Verdict::UnknownError);
        assert!(outcome.message.contains("staging make.cpp failed"));
        assert!(!outcome.files_saved);
    }

    #[test]
    fn previews_truncate_with_a_marker() {
        let dir = tempfile::tempdir().unwrap();
        let long = dir.path().join("long.txt");
        fs::write(&long, "x".repeat(PREVIEW_LIMIT + 5)).unwrap();
        let preview = read_preview(&long);
        assert!(preview.ends_with("\n...(truncated)"));
        assert_eq!(preview.len(), PREVIEW_LIMIT + "\n...(truncated)".len());

        let short = dir.path().join("short.txt");
        fs::write(&short, "5\n").unwrap();
        assert_eq!(read_preview(&short), "5\n");
        assert_eq!(read_preview(&dir.path().join("absent.txt")), "");
    }

    #[test]
    fn framework_error_carries_the_task_identity() {
        let spec = spec_with_missing_sources(42);
        let outcome = TaskOutcome::framework_error(&spec, "boom");
        assert_eq!(outcome.id, 42);
        assert_eq!(outcome.verdict, Verdict::UnknownError);
        assert_eq!(outcome.standard, Standard::Cpp17);
        assert!(outcome.saved_path.is_none());
    }
}
