//! Penalty arithmetic

use serde::{Deserialize, Serialize};

use crate::config::FileScorePolicy;
use crate::error::Finding;

pub const PERFECT_SCORE: u32 = 100;

/// `max(0, 100 - Σ penalty)`
pub fn score_statement(findings: &[Finding]) -> u32 {
    let penalty = findings
        .iter()
        .fold(0u32, |total, f| total.saturating_add(f.penalty));
    PERFECT_SCORE.saturating_sub(penalty)
}

/// Combine statement scores into a file score; a file without statements is perfect
pub fn file_score(statement_scores: &[u32], policy: FileScorePolicy) -> u32 {
    match policy {
        FileScorePolicy::Worst => statement_scores.iter().copied().min(),
        FileScorePolicy::Mean => rounded_mean(statement_scores),
    }
    .unwrap_or(PERFECT_SCORE)
}

/// Arithmetic mean rounded half up, `None` for no values
pub(crate) fn rounded_mean(values: &[u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    let n = values.len() as u64;
    Some(((2 * sum + n) / (2 * n)) as u32)
}

/// Letter grade for a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}
