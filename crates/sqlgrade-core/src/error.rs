//! Finding and error types

use std::path::PathBuf;

use miette::SourceSpan;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source location of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset from start of source
    pub offset: usize,
    /// Length in bytes
    pub length: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl Span {
    pub fn new(offset: usize, length: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            length,
            line,
            column,
        }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.offset.into(), span.length)
    }
}

/// Finding severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Kinds of findings, in rule-table order followed by file-level notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// Q001: `SELECT *`
    SelectStar,
    /// Q002: SELECT/UPDATE/DELETE without WHERE
    MissingWhere,
    /// Q003: `LIKE '%...'`
    LeadingWildcardLike,
    /// Q004: `LIKE '...%'`
    TrailingWildcardLike,
    /// Q005: function wrapped around a filtered column
    FunctionOnColumn,
    /// Q006: more than six joins
    ExcessiveJoins,
    /// Q007: `NOT IN (SELECT ...)`
    NotInSubquery,
    /// Q008: SELECT without LIMIT
    MissingLimit,
    /// Q009: long OR chains in WHERE
    ExcessiveOr,
    /// Q010: `DISTINCT *`
    DistinctStar,
    /// Q011: `UNION` without `ALL`
    UnionNotAll,
    /// Q012: `ORDER BY` without LIMIT
    #[serde(rename = "orderby-no-limit")]
    OrderByNoLimit,
    /// N001: file could not be read
    UnreadableInput,
    /// N002: file contains no statements
    EmptyInput,
    /// N003: unterminated comment or literal
    UnterminatedLiteral,
    /// N004: statement exceeds the size cap
    StatementTooLarge,
}

impl RuleKind {
    /// The twelve scoring rules, in report order
    pub const RULES: [RuleKind; 12] = [
        RuleKind::SelectStar,
        RuleKind::MissingWhere,
        RuleKind::LeadingWildcardLike,
        RuleKind::TrailingWildcardLike,
        RuleKind::FunctionOnColumn,
        RuleKind::ExcessiveJoins,
        RuleKind::NotInSubquery,
        RuleKind::MissingLimit,
        RuleKind::ExcessiveOr,
        RuleKind::DistinctStar,
        RuleKind::UnionNotAll,
        RuleKind::OrderByNoLimit,
    ];

    /// Every kind, rules first, then notes
    pub const ALL: [RuleKind; 16] = [
        RuleKind::SelectStar,
        RuleKind::MissingWhere,
        RuleKind::LeadingWildcardLike,
        RuleKind::TrailingWildcardLike,
        RuleKind::FunctionOnColumn,
        RuleKind::ExcessiveJoins,
        RuleKind::NotInSubquery,
        RuleKind::MissingLimit,
        RuleKind::ExcessiveOr,
        RuleKind::DistinctStar,
        RuleKind::UnionNotAll,
        RuleKind::OrderByNoLimit,
        RuleKind::UnreadableInput,
        RuleKind::EmptyInput,
        RuleKind::UnterminatedLiteral,
        RuleKind::StatementTooLarge,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            RuleKind::SelectStar => "Q001",
            RuleKind::MissingWhere => "Q002",
            RuleKind::LeadingWildcardLike => "Q003",
            RuleKind::TrailingWildcardLike => "Q004",
            RuleKind::FunctionOnColumn => "Q005",
            RuleKind::ExcessiveJoins => "Q006",
            RuleKind::NotInSubquery => "Q007",
            RuleKind::MissingLimit => "Q008",
            RuleKind::ExcessiveOr => "Q009",
            RuleKind::DistinctStar => "Q010",
            RuleKind::UnionNotAll => "Q011",
            RuleKind::OrderByNoLimit => "Q012",
            RuleKind::UnreadableInput => "N001",
            RuleKind::EmptyInput => "N002",
            RuleKind::UnterminatedLiteral => "N003",
            RuleKind::StatementTooLarge => "N004",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::SelectStar => "select-star",
            RuleKind::MissingWhere => "missing-where",
            RuleKind::LeadingWildcardLike => "leading-wildcard-like",
            RuleKind::TrailingWildcardLike => "trailing-wildcard-like",
            RuleKind::FunctionOnColumn => "function-on-column",
            RuleKind::ExcessiveJoins => "excessive-joins",
            RuleKind::NotInSubquery => "not-in-subquery",
            RuleKind::MissingLimit => "missing-limit",
            RuleKind::ExcessiveOr => "excessive-or",
            RuleKind::DistinctStar => "distinct-star",
            RuleKind::UnionNotAll => "union-not-all",
            RuleKind::OrderByNoLimit => "orderby-no-limit",
            RuleKind::UnreadableInput => "unreadable-input",
            RuleKind::EmptyInput => "empty-input",
            RuleKind::UnterminatedLiteral => "unterminated-literal",
            RuleKind::StatementTooLarge => "statement-too-large",
        }
    }

    /// Points deducted from a statement's score
    pub fn penalty(&self) -> u32 {
        match self {
            RuleKind::SelectStar => 10,
            RuleKind::MissingWhere => 20,
            RuleKind::LeadingWildcardLike => 15,
            RuleKind::TrailingWildcardLike => 5,
            RuleKind::FunctionOnColumn => 15,
            RuleKind::ExcessiveJoins => 10,
            RuleKind::NotInSubquery => 10,
            RuleKind::MissingLimit => 10,
            RuleKind::ExcessiveOr => 10,
            RuleKind::DistinctStar => 10,
            RuleKind::UnionNotAll => 5,
            RuleKind::OrderByNoLimit => 10,
            RuleKind::UnreadableInput
            | RuleKind::EmptyInput
            | RuleKind::UnterminatedLiteral
            | RuleKind::StatementTooLarge => 0,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            RuleKind::MissingWhere => Severity::Critical,
            RuleKind::SelectStar | RuleKind::LeadingWildcardLike | RuleKind::FunctionOnColumn => {
                Severity::High
            }
            RuleKind::ExcessiveJoins
            | RuleKind::NotInSubquery
            | RuleKind::MissingLimit
            | RuleKind::DistinctStar
            | RuleKind::OrderByNoLimit => Severity::Medium,
            RuleKind::TrailingWildcardLike | RuleKind::ExcessiveOr | RuleKind::UnionNotAll => {
                Severity::Low
            }
            RuleKind::UnreadableInput
            | RuleKind::EmptyInput
            | RuleKind::UnterminatedLiteral
            | RuleKind::StatementTooLarge => Severity::Note,
        }
    }

    /// One-line description used by `sqlgrade rules`
    pub fn description(&self) -> &'static str {
        match self {
            RuleKind::SelectStar => "SELECT * returns every column, including ones the caller never reads",
            RuleKind::MissingWhere => "SELECT/UPDATE/DELETE over a table without a WHERE clause",
            RuleKind::LeadingWildcardLike => "LIKE pattern starting with % cannot use an index",
            RuleKind::TrailingWildcardLike => "LIKE pattern ending with % may still scan many rows",
            RuleKind::FunctionOnColumn => "function applied to a filtered column prevents index usage",
            RuleKind::ExcessiveJoins => "more than 6 JOINs in one statement",
            RuleKind::NotInSubquery => "NOT IN with a subquery is slow and mishandles NULL",
            RuleKind::MissingLimit => "SELECT without LIMIT may return unbounded rows",
            RuleKind::ExcessiveOr => "more than 3 OR conditions in one WHERE clause",
            RuleKind::DistinctStar => "DISTINCT * deduplicates every column",
            RuleKind::UnionNotAll => "UNION adds an implicit DISTINCT",
            RuleKind::OrderByNoLimit => "ORDER BY without LIMIT sorts the whole result set",
            RuleKind::UnreadableInput => "file could not be read as UTF-8 text",
            RuleKind::EmptyInput => "file contains no SQL statements",
            RuleKind::UnterminatedLiteral => "unterminated comment or string literal",
            RuleKind::StatementTooLarge => "statement exceeds the analysis size cap",
        }
    }

    /// Whether this kind is one of the twelve scoring rules
    pub fn is_rule(&self) -> bool {
        Self::RULES.contains(self)
    }

    /// Look a kind up by its id (`select-star`) or code (`Q001`)
    pub fn from_name(name: &str) -> Option<RuleKind> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name) || k.code().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One rule violation, or a zero-penalty note about the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: RuleKind,
    pub message: String,
    pub penalty: u32,
    pub severity: Severity,
    /// 1-based ordinal of the statement within its file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Finding {
    /// A finding carrying the rule's standard penalty and severity
    pub fn new(rule: RuleKind, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
            penalty: rule.penalty(),
            severity: rule.severity(),
            statement: None,
            span: None,
            excerpt: None,
            help: None,
        }
    }

    pub fn with_statement(mut self, ordinal: usize) -> Self {
        self.statement = Some(ordinal);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Get the rule code string (e.g., "Q001")
    pub fn code(&self) -> &'static str {
        self.rule.code()
    }
}

/// Invalid analysis configuration; fatal before any file is analyzed
#[derive(Debug, Error, miette::Diagnostic, PartialEq, Eq)]
pub enum ConfigError {
    #[error("minimum score must be between 0 and 100, got {0}")]
    #[diagnostic(code(sqlgrade::config::minimum_score))]
    MinimumScoreOutOfRange(i64),

    #[error("critical threshold must be between 1 and 100, got {0}")]
    #[diagnostic(code(sqlgrade::config::critical_threshold))]
    CriticalThresholdOutOfRange(i64),

    #[error("{name} must be greater than zero")]
    #[diagnostic(code(sqlgrade::config::size_cap))]
    ZeroSizeCap { name: &'static str },

    #[error("unknown rule '{0}'")]
    #[diagnostic(
        code(sqlgrade::config::unknown_rule),
        help("run `sqlgrade rules` to list rule ids")
    )]
    UnknownRule(String),

    #[error("unknown score policy '{0}'")]
    #[diagnostic(
        code(sqlgrade::config::unknown_policy),
        help("supported policies: worst, mean")
    )]
    UnknownPolicy(String),

    #[error("unknown dialect '{0}'")]
    #[diagnostic(
        code(sqlgrade::config::unknown_dialect),
        help("supported dialects: postgresql, mysql")
    )]
    UnknownDialect(String),
}

/// Failure to load a source file; recovered as a file-level note
#[derive(Debug, Error, miette::Diagnostic)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    #[diagnostic(code(sqlgrade::source::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8 (invalid byte at offset {offset})")]
    #[diagnostic(code(sqlgrade::source::encoding))]
    NotUtf8 { path: PathBuf, offset: usize },

    #[error("{path} is {size} bytes, above the {limit} byte limit")]
    #[diagnostic(code(sqlgrade::source::too_large))]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: usize,
    },
}
