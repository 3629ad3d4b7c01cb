//! End-to-end scenarios against a live `g++` toolchain.
//!
//! Every test compiles real C++ triples, so each one checks for `g++`
//! first and skips with a notice when the toolchain is absent.

use std::fs;
use std::path::{Path, PathBuf};

use stress_judge::{Report, Standard, StressRun, TaskOutcome, Verdict};

const GENERATOR: &str = r#"#include <cstdio>
int main() {
    std::printf("5\n");
    return 0;
}
"#;

const ECHO: &str = r#"#include <cstdio>
int main() {
    int n;
    if (std::scanf("%d", &n) != 1) return 1;
    std::printf("%d\n", n);
    return 0;
}
"#;

const OFF_BY_ONE: &str = r#"#include <cstdio>
int main() {
    int n;
    if (std::scanf("%d", &n) != 1) return 1;
    std::printf("%d\n", n + 1);
    return 0;
}
"#;

const SPIN_FOREVER: &str = r#"int main() {
    volatile unsigned spin = 0;
    for (;;) { spin = spin + 1; }
    return 0;
}
"#;

const HUGE_ALLOCATION: &str = r#"#include <cstdio>
#include <cstring>
int main() {
    const size_t size = 600ull * 1024 * 1024;
    char *buffer = new char[size];
    std::memset(buffer, 1, size);
    std::printf("%d\n", (int)buffer[1234]);
    return 0;
}
"#;

const SYNTAX_ERROR: &str = "int main( {\n";

const SLOPPY_WHITESPACE: &str = r#"#include <cstdio>
int main() {
    int n;
    if (std::scanf("%d", &n) != 1) return 1;
    std::printf("%d  \r\n\n\n", n);
    return 0;
}
"#;

const EXIT_NONZERO: &str = r#"int main() { return 7; }
"#;

fn gpp_missing() -> bool {
    if which::which("g++").is_err() {
        eprintln!("skipping: g++ not found on PATH");
        return true;
    }
    false
}

fn stage(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, source).unwrap();
    path
}

fn stress(
    dir: &Path,
    candidate: &str,
    count: u32,
    time_ms: u64,
    mem_mb: u64,
    archive: Option<PathBuf>,
) -> Vec<TaskOutcome> {
    StressRun {
        generator: stage(dir, "gen.cpp", GENERATOR),
        reference: stage(dir, "ref.cpp", ECHO),
        candidate: stage(dir, "cand.cpp", candidate),
        count,
        standard: Standard::Cpp17,
        time_limit_ms: time_ms,
        memory_limit_mb: mem_mb,
        archive_root: archive,
    }
    .execute()
}

#[test]
fn matching_candidate_is_accepted() {
    if gpp_missing() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcomes = stress(dir.path(), ECHO, 1, 2_000, 512, None);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].verdict, Verdict::Accepted, "{}", outcomes[0].message);
    assert!(!outcomes[0].files_saved);
    assert_eq!(outcomes[0].input_preview, "5\n");
    assert_eq!(outcomes[0].expected_preview, "5\n");

    let report = Report::from_outcomes(&outcomes, Standard::Cpp17, 2_000, 512);
    assert_eq!(report.total, 1);
    assert_eq!(report.ac, 1);
}

#[test]
fn off_by_one_candidate_is_wrong_answer() {
    if gpp_missing() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcomes = stress(dir.path(), OFF_BY_ONE, 1, 2_000, 512, None);
    assert_eq!(outcomes[0].verdict, Verdict::WrongAnswer);
    assert_eq!(outcomes[0].output_preview, "6\n");
    assert!(!outcomes[0].files_saved);
}

#[test]
fn spinning_candidate_exceeds_the_time_limit() {
    if gpp_missing() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcomes = stress(dir.path(), SPIN_FOREVER, 1, 500, 512, None);
    assert_eq!(outcomes[0].verdict, Verdict::TimeLimitExceeded);
    assert_eq!(outcomes[0].message, "Time Limit Exceeded");
}

#[test]
fn oversized_allocation_exceeds_the_memory_limit() {
    if gpp_missing() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcomes = stress(dir.path(), HUGE_ALLOCATION, 1, 5_000, 256, None);
    assert_eq!(outcomes[0].verdict, Verdict::MemoryLimitExceeded, "{}", outcomes[0].message);
}

#[test]
fn broken_candidate_is_a_compile_error() {
    if gpp_missing() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcomes = stress(dir.path(), SYNTAX_ERROR, 1, 2_000, 512, None);
    assert_eq!(outcomes[0].verdict, Verdict::CompileError);
    assert_eq!(outcomes[0].message, "unknown.cpp compile error");
    // No run phase was attempted, so there is nothing to preview.
    assert_eq!(outcomes[0].output_preview, "");
}

#[test]
fn nonzero_exit_is_a_runtime_error() {
    if gpp_missing() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcomes = stress(dir.path(), EXIT_NONZERO, 1, 2_000, 512, None);
    assert_eq!(outcomes[0].verdict, Verdict::RuntimeError);
    assert_eq!(outcomes[0].message, "Runtime Error");
}

#[test]
fn trailing_whitespace_from_the_candidate_is_tolerated() {
    if gpp_missing() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcomes = stress(dir.path(), SLOPPY_WHITESPACE, 1, 2_000, 512, None);
    assert_eq!(outcomes[0].verdict, Verdict::Accepted, "{}", outcomes[0].message);
}

#[test]
fn failing_run_archives_its_evidence() {
    if gpp_missing() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("archive");
    let outcomes = stress(dir.path(), OFF_BY_ONE, 1, 2_000, 512, Some(archive.clone()));

    assert_eq!(outcomes[0].verdict, Verdict::WrongAnswer);
    assert!(outcomes[0].files_saved);
    let saved = outcomes[0].saved_path.clone().unwrap();
    assert_eq!(saved, archive.join("task_0"));
    for name in ["input.txt", "expected.txt", "output.txt", "log.txt", "summary.txt"] {
        let artifact = saved.join(name);
        assert!(
            fs::metadata(&artifact).map(|m| m.len() > 0).unwrap_or(false),
            "missing or empty {}",
            name
        );
    }
    assert_eq!(fs::read_to_string(saved.join("input.txt")).unwrap(), "5\n");
    assert_eq!(fs::read_to_string(saved.join("output.txt")).unwrap(), "6\n");
    let summary = fs::read_to_string(saved.join("summary.txt")).unwrap();
    assert!(summary.contains("Result: WA"));
}

#[test]
fn accepted_runs_are_never_archived() {
    if gpp_missing() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("archive");
    let outcomes = stress(dir.path(), ECHO, 1, 2_000, 512, Some(archive.clone()));
    assert_eq!(outcomes[0].verdict, Verdict::Accepted);
    assert!(!outcomes[0].files_saved);
    assert!(!archive.join("task_0").exists());
}

#[test]
fn eight_repetitions_come_back_in_submission_order() {
    if gpp_missing() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let outcomes = stress(dir.path(), ECHO, 8, 2_000, 512, None);
    assert_eq!(outcomes.len(), 8);
    for (index, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.id, index as u32);
        assert_eq!(outcome.verdict, Verdict::Accepted, "{}", outcome.message);
    }
    let report = Report::from_outcomes(&outcomes, Standard::Cpp17, 2_000, 512);
    assert_eq!(report.ac, 8);
    assert_eq!(report.total, 8);
}
