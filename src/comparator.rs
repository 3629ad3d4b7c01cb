//! Whitespace-tolerant comparison of two output files.
//!
//! Two files match when their line sequences are identical after stripping
//! trailing spaces, tabs, carriage returns, and newlines from each line and
//! dropping trailing empty lines. Leading and internal whitespace stay
//! significant: contest outputs may begin with meaningful indentation (a
//! matrix row) but conventionally never end with it.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

/// Interval between stability polls.
const STABILITY_POLL: Duration = Duration::from_millis(25);
/// Poll budget before a file is read as-is.
const STABILITY_BUDGET: u32 = 20;

const TRAILING: &[char] = &[' ', '\t', '\r', '\n'];

/// Tolerant equality of two output files.
///
/// Both files are first polled until their sizes are nonzero and stable
/// across two consecutive observations: the OS can report process exit
/// before the filesystem has flushed the child's stdout, and reading a
/// mid-flush file would turn a correct answer into a spurious mismatch.
pub fn outputs_match(expected: &Path, actual: &Path) -> Result<bool> {
    wait_until_stable(expected);
    wait_until_stable(actual);
    Ok(normalized_lines(expected)? == normalized_lines(actual)?)
}

fn wait_until_stable(path: &Path) {
    let mut previous = None;
    for _ in 0..STABILITY_BUDGET {
        let size = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
        if size > 0 && previous == Some(size) {
            return;
        }
        previous = Some(size);
        thread::sleep(STABILITY_POLL);
    }
}

fn normalized_lines(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let text = String::from_utf8_lossy(&raw);
    let mut lines: Vec<String> = text
        .lines()
        .map(|line| line.trim_end_matches(TRAILING).to_string())
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    Ok(lines)
}
