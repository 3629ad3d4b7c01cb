//! Stress-testing judge for competitive-programming solutions.
//!
//! Runs a generator / reference / candidate triple `k` times in parallel,
//! each repetition inside a private isolation directory, and classifies
//! every run as `AC|WA|RE|TLE|MLE|CE|UKE`. Evidence for failing runs can
//! be archived for post-mortem; results are aggregated into a single JSON
//! report on stdout.

pub mod comparator;
pub mod compiler;
pub mod executor;
pub mod judger;
pub mod logger;
pub mod pool;
pub mod report;
pub mod standards;
pub mod verdict;

pub use judger::{run_task, StressRun, TaskOutcome, TaskSpec, MAX_WORKERS};
pub use report::Report;
pub use standards::Standard;
pub use verdict::Verdict;
