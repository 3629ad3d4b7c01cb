//! Per-task log file with a stderr mirror.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;

/// Append-only log for one task, mirrored to stderr with a `[Task <id>]`
/// prefix. Writes are serialized by an internal mutex so one logger can be
/// shared across callback contexts; file errors never propagate (logging
/// is advisory).
pub struct TaskLogger {
    task_id: u32,
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl TaskLogger {
    pub fn create(dir: &Path, task_id: u32) -> Self {
        let path = dir.join(format!("task_{}_log.txt", task_id));
        let file = OpenOptions::new().create(true).append(true).open(&path).ok();
        let logger = Self {
            task_id,
            path,
            file: Mutex::new(file),
        };
        logger.append(&format!("=== Task {} Start ===", task_id));
        logger
    }

    /// Append a line to the log file and mirror it to stderr.
    pub fn log(&self, message: &str) {
        self.append(message);
        info!("[Task {}] {}", self.task_id, message);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = writeln!(file, "{}", line);
            }
        }
    }
}

impl Drop for TaskLogger {
    fn drop(&mut self) {
        self.append("=== End ===");
    }
}
