//! Aggregated run report emitted on stdout.

use serde::Serialize;

use crate::judger::TaskOutcome;
use crate::standards::Standard;
use crate::verdict::Verdict;

/// Top-level report. Field order here is the wire order.
#[derive(Debug, Serialize)]
pub struct Report {
    pub total: usize,
    pub ac: usize,
    pub wa: usize,
    pub re: usize,
    pub tle: usize,
    pub mle: usize,
    pub ce: usize,
    pub uke: usize,
    pub std_version: String,
    pub time_limit: u64,
    pub memory_limit: u64,
    pub results: Vec<ReportEntry>,
}

/// One task in the report, in submission order.
#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub id: u32,
    pub result: Verdict,
    pub message: String,
    pub std: String,
    pub files_saved: bool,
}

impl Report {
    pub fn from_outcomes(
        outcomes: &[TaskOutcome],
        standard: Standard,
        time_limit_ms: u64,
        memory_limit_mb: u64,
    ) -> Self {
        let mut report = Report {
            total: outcomes.len(),
            ac: 0,
            wa: 0,
            re: 0,
            tle: 0,
            mle: 0,
            ce: 0,
            uke: 0,
            std_version: standard.to_string(),
            time_limit: time_limit_ms,
            memory_limit: memory_limit_mb,
            results: Vec::with_capacity(outcomes.len()),
        };
        for outcome in outcomes {
            match outcome.verdict {
                Verdict::Accepted => report.ac += 1,
                Verdict::WrongAnswer => report.wa += 1,
                Verdict::RuntimeError => report.re += 1,
                Verdict::TimeLimitExceeded => report.tle += 1,
                Verdict::MemoryLimitExceeded => report.mle += 1,
                Verdict::CompileError => report.ce += 1,
                Verdict::UnknownError => report.uke += 1,
            }
            report.results.push(ReportEntry {
                id: outcome.id,
                result: outcome.verdict,
                message: sanitize(&outcome.message),
                std: outcome.standard.to_string(),
                files_saved: outcome.files_saved,
            });
        }
        report
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

/// Keep `\n`, `\r`, `\t` (serialized as their canonical escapes) and
/// printable ASCII; everything else becomes a space so the report stays
/// inspectable in any terminal.
pub fn sanitize(message: &str) -> String {
    message
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => c,
            ' '..='~' => c,
            _ => ' ',
        })
        .collect()
}
