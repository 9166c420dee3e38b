//! Run summaries and reports.

use rexhaust_core::{Anchor, Semantics};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::structured_log::now_utc;

/// Counters of one finished run plus the bounds it ran under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Top-level wrapper used for the run, if any.
    pub topwrapper: Option<String>,
    pub regexps: u64,
    pub tests: u64,
    pub failures: u64,
    pub skipped: u64,
    /// Effective (possibly reduced) string length bound.
    pub max_strlen: usize,
    pub str_alphabet_len: usize,
}

impl RunSummary {
    /// The one-line summary printed after a verification run.
    #[must_use]
    pub fn line(&self) -> String {
        format!(
            "{} regexps, {} tests, {} failures [{}/{} str]",
            self.regexps, self.tests, self.failures, self.max_strlen, self.str_alphabet_len
        )
    }
}

/// Results of a sequence of runs, such as the four anchorings of an egrep
/// suite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteReport {
    pub runs: Vec<RunSummary>,
}

impl SuiteReport {
    #[must_use]
    pub fn total_failures(&self) -> u64 {
        self.runs.iter().map(|run| run.failures).sum()
    }

    #[must_use]
    pub fn total_tests(&self) -> u64 {
        self.runs.iter().map(|run| run.tests).sum()
    }

    /// Err when any run saw a failure.
    pub fn assert_clean(&self) -> Result<(), HarnessError> {
        match self.total_failures() {
            0 => Ok(()),
            failures => Err(HarnessError::Failures { failures }),
        }
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// One recorded query that the replayed engine answered differently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFailure {
    pub regexp: String,
    /// Escaped input string.
    pub input: String,
    pub anchor: Anchor,
    pub semantics: Semantics,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub regexps: usize,
    /// Queries replayed.
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// The first failing queries.
    pub failures: Vec<ReplayFailure>,
}

/// Result of replaying a corpus against a query engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub title: String,
    pub timestamp: String,
    pub summary: ReplaySummary,
}

impl ReplayReport {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        regexps: usize,
        total: usize,
        failed: usize,
        failures: Vec<ReplayFailure>,
    ) -> Self {
        Self {
            title: title.into(),
            timestamp: now_utc(),
            summary: ReplaySummary {
                regexps,
                total,
                passed: total - failed,
                failed,
                failures,
            },
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Regexps: {}\n", self.summary.regexps));
        out.push_str(&format!("- Queries: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        if self.summary.failures.is_empty() {
            return out;
        }
        out.push_str("| Regexp | Input | Mode | Expected | Actual |\n");
        out.push_str("|--------|-------|------|----------|--------|\n");
        for f in &self.summary.failures {
            out.push_str(&format!(
                "| `{}` | `{}` | {:?}/{:?} | {} | {} |\n",
                f.regexp.replace('|', "\\|"),
                f.input.replace('|', "\\|"),
                f.anchor,
                f.semantics,
                f.expected,
                f.actual
            ));
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
