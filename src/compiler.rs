//! Compiler driver: wraps the external `g++` toolchain.
//!
//! One source in, one executable out; diagnostics go to a per-program
//! `<prog>_err.txt` next to the artifacts so the pipeline can log them.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use wait_timeout::ChildExt;

use crate::standards::Standard;

/// Advisory budget for one compilation; expiry is a compile failure, never
/// a time-limit verdict.
const COMPILE_BUDGET: Duration = Duration::from_millis(5_000);
/// Length of the diagnostics snippet surfaced in messages.
const SNIPPET_LEN: usize = 150;

/// Result of one compilation attempt.
#[derive(Debug)]
pub struct CompileOutcome {
    pub success: bool,
    /// Snippet of the compiler diagnostics, present on failure.
    pub diagnostics: Option<String>,
}

/// Compile `source` (relative to `dir`) into `<program>.exe` with
/// optimization and the requested standard, capturing diagnostics to
/// `<program>_err.txt`. The compiler is located via the executable search
/// path.
pub fn compile(dir: &Path, source: &str, program: &str, standard: Standard) -> Result<CompileOutcome> {
    let gpp = which::which("g++").context("g++ not found on the executable search path")?;

    let output_name = format!("{}.exe", program);
    let diagnostics_path = dir.join(format!("{}_err.txt", program));
    let stderr = fs::File::create(&diagnostics_path)
        .with_context(|| format!("cannot create {}", diagnostics_path.display()))?;

    let mut child = Command::new(&gpp)
        .current_dir(dir)
        .args(["-O2", &standard.compiler_flag(), "-o", &output_name, source])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr))
        .spawn()
        .with_context(|| format!("failed to spawn {}", gpp.display()))?;

    let status = match child
        .wait_timeout(COMPILE_BUDGET)
        .context("failed waiting for the compiler")?
    {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(CompileOutcome {
                success: false,
                diagnostics: Some("compiler timed out".to_string()),
            });
        }
    };

    if status.success() {
        return Ok(CompileOutcome {
            success: true,
            diagnostics: None,
        });
    }

    let raw = fs::read(&diagnostics_path).unwrap_or_default();
    let diagnostics = String::from_utf8_lossy(&raw);
    Ok(CompileOutcome {
        success: false,
        diagnostics: Some(snippet(&diagnostics)),
    })
}

/// First `SNIPPET_LEN` characters of the diagnostics stream.
fn snippet(diagnostics: &str) -> String {
    let mut chars = diagnostics.chars();
    let head: String = chars.by_ref().take(SNIPPET_LEN).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
