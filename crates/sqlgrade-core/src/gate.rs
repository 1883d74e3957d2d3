//! Pass/fail decision over a summary

use serde::Serialize;

use crate::report::Summary;

/// Outcome of comparing the average score to the minimum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    pub average_score: u32,
    pub minimum_score: u32,
}

impl Verdict {
    /// Pass iff `average_score >= minimum_score`
    pub fn evaluate(summary: &Summary, minimum_score: u32) -> Self {
        Self {
            passed: summary.average_score >= minimum_score,
            average_score: summary.average_score,
            minimum_score,
        }
    }

    /// Process exit code: 0 on pass, 1 on failure
    pub fn exit_code(&self) -> u8 {
        if self.passed {
            0
        } else {
            1
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.passed { "PASSED" } else { "FAILED" };
        write!(
            f,
            "{} (average {} / minimum {})",
            status, self.average_score, self.minimum_score
        )
    }
}
