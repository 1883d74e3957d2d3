//! Analysis configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::dialect::SqlDialect;
use crate::error::{ConfigError, RuleKind};

pub const DEFAULT_MINIMUM_SCORE: u32 = 70;
pub const DEFAULT_CRITICAL_THRESHOLD: u32 = 15;
pub const DEFAULT_MAX_FILE_BYTES: usize = 8 * 1024 * 1024;
pub const DEFAULT_MAX_STATEMENT_BYTES: usize = 1024 * 1024;

/// How a file's score is derived from its statement scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileScorePolicy {
    /// The worst statement decides the file score
    #[default]
    Worst,
    /// Rounded mean of statement scores
    Mean,
}

impl FromStr for FileScorePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "worst" | "min" | "minimum" => Ok(FileScorePolicy::Worst),
            "mean" | "average" | "avg" => Ok(FileScorePolicy::Mean),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

impl std::fmt::Display for FileScorePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileScorePolicy::Worst => write!(f, "worst"),
            FileScorePolicy::Mean => write!(f, "mean"),
        }
    }
}

/// Validated, immutable settings threaded through the analyzer, report and gate.
///
/// Construct with [`AnalysisConfig::builder`]; `build` rejects values that
/// would make the gate meaningless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    minimum_score: u32,
    critical_threshold: u32,
    policy: FileScorePolicy,
    dialect: SqlDialect,
    disabled: Vec<RuleKind>,
    max_file_bytes: usize,
    max_statement_bytes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            minimum_score: DEFAULT_MINIMUM_SCORE,
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
            policy: FileScorePolicy::default(),
            dialect: SqlDialect::default(),
            disabled: Vec::new(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_statement_bytes: DEFAULT_MAX_STATEMENT_BYTES,
        }
    }
}

impl AnalysisConfig {
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    pub fn minimum_score(&self) -> u32 {
        self.minimum_score
    }

    pub fn critical_threshold(&self) -> u32 {
        self.critical_threshold
    }

    pub fn policy(&self) -> FileScorePolicy {
        self.policy
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn disabled(&self) -> &[RuleKind] {
        &self.disabled
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    pub fn max_statement_bytes(&self) -> usize {
        self.max_statement_bytes
    }
}

/// Unvalidated configuration values, as they arrive from files and flags
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfigBuilder {
    minimum_score: Option<i64>,
    critical_threshold: Option<i64>,
    policy: Option<FileScorePolicy>,
    dialect: Option<SqlDialect>,
    disabled: Vec<String>,
    max_file_bytes: Option<usize>,
    max_statement_bytes: Option<usize>,
}

impl AnalysisConfigBuilder {
    pub fn minimum_score(mut self, score: i64) -> Self {
        self.minimum_score = Some(score);
        self
    }

    pub fn critical_threshold(mut self, threshold: i64) -> Self {
        self.critical_threshold = Some(threshold);
        self
    }

    pub fn policy(mut self, policy: FileScorePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Disable a rule by id or code; resolved in `build`
    pub fn disable(mut self, rule: impl Into<String>) -> Self {
        self.disabled.push(rule.into());
        self
    }

    pub fn max_file_bytes(mut self, bytes: usize) -> Self {
        self.max_file_bytes = Some(bytes);
        self
    }

    pub fn max_statement_bytes(mut self, bytes: usize) -> Self {
        self.max_statement_bytes = Some(bytes);
        self
    }

    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let defaults = AnalysisConfig::default();

        let minimum_score = match self.minimum_score {
            Some(score) if !(0..=100).contains(&score) => {
                return Err(ConfigError::MinimumScoreOutOfRange(score))
            }
            Some(score) => score as u32,
            None => defaults.minimum_score,
        };

        let critical_threshold = match self.critical_threshold {
            Some(threshold) if !(1..=100).contains(&threshold) => {
                return Err(ConfigError::CriticalThresholdOutOfRange(threshold))
            }
            Some(threshold) => threshold as u32,
            None => defaults.critical_threshold,
        };

        let max_file_bytes = self.max_file_bytes.unwrap_or(defaults.max_file_bytes);
        if max_file_bytes == 0 {
            return Err(ConfigError::ZeroSizeCap {
                name: "max_file_bytes",
            });
        }
        let max_statement_bytes = self
            .max_statement_bytes
            .unwrap_or(defaults.max_statement_bytes);
        if max_statement_bytes == 0 {
            return Err(ConfigError::ZeroSizeCap {
                name: "max_statement_bytes",
            });
        }

        let mut disabled = Vec::new();
        for name in &self.disabled {
            match RuleKind::from_name(name) {
                Some(kind) if kind.is_rule() => {
                    if !disabled.contains(&kind) {
                        disabled.push(kind);
                    }
                }
                _ => return Err(ConfigError::UnknownRule(name.clone())),
            }
        }

        Ok(AnalysisConfig {
            minimum_score,
            critical_threshold,
            policy: self.policy.unwrap_or(defaults.policy),
            dialect: self.dialect.unwrap_or(defaults.dialect),
            disabled,
            max_file_bytes,
            max_statement_bytes,
        })
    }
}
