//! Platform capability layer.
//!
//! Everything host-specific lives here:
//! - Isolation-directory provisioning and teardown
//! - Retried binary file copy
//! - Bounded process execution with stdio redirected to files and an
//!   address-space limit installed before the child runs any user code
//!
//! The layers above consume only this interface and stay portable.

use std::fmt;
use std::fs::{self, File};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::warn;
use wait_timeout::ChildExt;

/// Attempts for `copy_file` before giving up.
const COPY_ATTEMPTS: u32 = 3;
/// Back-off between copy attempts.
const COPY_BACKOFF: Duration = Duration::from_millis(50);
/// Settle delay after reaping a child, before its output files are opened.
const PROCESS_SETTLE: Duration = Duration::from_millis(50);

/// Wall-clock and memory bounds for one child process.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionLimits {
    /// Wall-clock limit in milliseconds.
    pub time_ms: u64,
    /// Virtual address-space limit in MB; 0 disables the limit.
    pub memory_mb: u64,
}

/// How a bounded child run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Normal exit with the given code.
    Exited(i32),
    /// Terminated by the given signal.
    Signaled(i32),
    /// Killed after exceeding the wall-clock limit.
    TimedOut,
    /// The process could not be created.
    SpawnFailed(String),
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Exited(0))
    }

    /// Memory-pressure terminations under an address-space limit: the
    /// allocator aborts on `bad_alloc` (SIGABRT) or a touch of an unmapped
    /// page faults (SIGSEGV/SIGBUS). Callers apply this classification to
    /// the candidate stage only.
    pub fn is_memory_class(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Signaled(sig)
                if *sig == libc::SIGSEGV || *sig == libc::SIGBUS || *sig == libc::SIGABRT
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Exited(code) => write!(f, "exit code {}", code),
            ExecutionStatus::Signaled(sig) => write!(f, "killed by signal {}", sig),
            ExecutionStatus::TimedOut => f.write_str("wall-clock limit exceeded"),
            ExecutionStatus::SpawnFailed(reason) => write!(f, "spawn failed: {}", reason),
        }
    }
}

/// One bounded child run: executable, working directory, stdio files,
/// limits. Arguments are always empty and the environment is inherited.
#[derive(Debug, Clone)]
pub struct ExecutionSpec {
    work_dir: PathBuf,
    executable: PathBuf,
    stdin: Option<PathBuf>,
    stdout: PathBuf,
    stderr: PathBuf,
    limits: ExecutionLimits,
}

impl ExecutionSpec {
    pub fn new(work_dir: impl Into<PathBuf>, executable: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            stdout: work_dir.join("stdout.txt"),
            stderr: work_dir.join("stderr.txt"),
            work_dir,
            executable: executable.into(),
            stdin: None,
            limits: ExecutionLimits {
                time_ms: 1_000,
                memory_mb: 0,
            },
        }
    }

    /// Bind standard input to the named file; without this it reads from
    /// the null device.
    pub fn with_stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn with_stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = path.into();
        self
    }

    pub fn with_stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = path.into();
        self
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Run one child to completion under the spec's bounds.
///
/// Output files are pre-opened (truncating) and handed to the child as its
/// stdio, so no shell sits in between. The address-space limit, when any,
/// is installed between fork and exec: no user code ever runs unconfined.
pub fn execute_bounded(spec: &ExecutionSpec) -> ExecutionStatus {
    let stdout = match File::create(&spec.stdout) {
        Ok(file) => file,
        Err(err) => {
            return ExecutionStatus::SpawnFailed(format!(
                "cannot create {}: {}",
                spec.stdout.display(),
                err
            ))
        }
    };
    let stderr = match File::create(&spec.stderr) {
        Ok(file) => file,
        Err(err) => {
            return ExecutionStatus::SpawnFailed(format!(
                "cannot create {}: {}",
                spec.stderr.display(),
                err
            ))
        }
    };
    let stdin = match &spec.stdin {
        Some(path) => match File::open(path) {
            Ok(file) => Stdio::from(file),
            Err(err) => {
                return ExecutionStatus::SpawnFailed(format!(
                    "cannot open {}: {}",
                    path.display(),
                    err
                ))
            }
        },
        None => Stdio::null(),
    };

    let mut command = Command::new(&spec.executable);
    command
        .current_dir(&spec.work_dir)
        .stdin(stdin)
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    if spec.limits.memory_mb > 0 {
        let bytes = spec.limits.memory_mb.saturating_mul(1024 * 1024);
        unsafe {
            command.pre_exec(move || {
                let limit = libc::rlimit {
                    rlim_cur: bytes,
                    rlim_max: bytes,
                };
                if libc::setrlimit(libc::RLIMIT_AS, &limit) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => return ExecutionStatus::SpawnFailed(err.to_string()),
    };

    let status = match child.wait_timeout(Duration::from_millis(spec.limits.time_ms)) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            thread::sleep(PROCESS_SETTLE);
            return ExecutionStatus::TimedOut;
        }
        Err(err) => return ExecutionStatus::SpawnFailed(format!("wait failed: {}", err)),
    };
    thread::sleep(PROCESS_SETTLE);

    match status.code() {
        Some(code) => ExecutionStatus::Exited(code),
        None => ExecutionStatus::Signaled(status.signal().unwrap_or(0)),
    }
}

/// Isolation directory for one task: `<tmp>/judge_<id>_<pid>_<rand8>`.
/// The embedded pid and random suffix keep concurrent tasks, and
/// concurrent judge invocations, from colliding.
pub fn create_task_dir(task_id: u32) -> Result<PathBuf> {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    let dir = std::env::temp_dir().join(format!(
        "judge_{}_{}_{}",
        task_id,
        std::process::id(),
        suffix
    ));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create task directory {}", dir.display()))?;
    if !dir.is_dir() {
        bail!("task directory {} did not materialize", dir.display());
    }
    Ok(dir)
}

/// Binary copy with verification that the destination exists and is
/// non-empty. Files produced by a stage that just finished may not be
/// visible to an immediate re-open on some hosts, hence the retries.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    let mut last_err = None;
    for attempt in 0..COPY_ATTEMPTS {
        if attempt > 0 {
            thread::sleep(COPY_BACKOFF);
        }
        match fs::copy(src, dst) {
            Ok(_) => {
                if fs::metadata(dst).map(|meta| meta.len() > 0).unwrap_or(false) {
                    return Ok(());
                }
            }
            Err(err) => last_err = Some(err),
        }
    }
    match last_err {
        Some(err) => Err(err).with_context(|| {
            format!("failed to copy {} to {}", src.display(), dst.display())
        }),
        None => bail!(
            "copy of {} to {} produced an empty file",
            src.display(),
            dst.display()
        ),
    }
}

/// Recursive creation; "already exists" is success.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory {}", path.display()))
}

/// Best-effort recursive removal. Cleanup must never change a verdict, so
/// failures are only logged.
pub fn remove_dir_best_effort(path: &Path) {
    if let Err(err) = fs::remove_dir_all(path) {
        if path.exists() {
            warn!("failed to remove {}: {}", path.display(), err);
        }
    }
}
