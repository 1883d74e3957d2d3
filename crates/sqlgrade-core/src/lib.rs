//! sqlgrade-core: SQL query-quality scoring library
//!
//! Splits SQL files into statements, runs a fixed set of penalty rules over
//! each statement, scores files and aggregates the results into a report
//! with a pass/fail verdict. No database connection is needed.

pub mod analyzer;
pub mod config;
pub mod dialect;
pub mod error;
pub mod gate;
pub mod lexer;
pub mod report;
pub mod rules;
pub mod source;
pub mod splitter;

pub use analyzer::{Analyzer, FileResult, Grade};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, FileScorePolicy};
pub use dialect::SqlDialect;
pub use error::{ConfigError, Finding, RuleKind, Severity, SourceError, Span};
pub use gate::Verdict;
pub use report::{Report, Summary};
pub use rules::{Rule, RuleSet};
pub use source::SourceFile;
pub use splitter::{split_statements, split_statements_for, SplitOutcome, Statement};
