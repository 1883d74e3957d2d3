//! SQL analyzer module

mod score;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::{Finding, RuleKind};
use crate::lexer::StatementView;
use crate::rules::RuleSet;
use crate::source::SourceFile;
use crate::splitter::split_statements_for;

pub use score::{file_score, score_statement, Grade, PERFECT_SCORE};
pub(crate) use score::rounded_mean;

/// Analysis outcome for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub score: u32,
    pub grade: Grade,
    /// Number of statements found by the splitter
    pub statements: usize,
    pub findings: Vec<Finding>,
}

impl FileResult {
    fn new(path: &Path, score: u32, statements: usize, findings: Vec<Finding>) -> Self {
        Self {
            path: path.to_path_buf(),
            score,
            grade: Grade::from_score(score),
            statements,
            findings,
        }
    }

    /// Findings that cost points
    pub fn issues(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.penalty > 0)
    }
}

/// SQL Analyzer - scores SQL files against the rule set
pub struct Analyzer<'a> {
    config: &'a AnalysisConfig,
    rules: RuleSet,
}

impl<'a> Analyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            rules: RuleSet::without(config.disabled()),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Analyze one file's text. Never fails: input problems become zero-penalty notes.
    pub fn analyze_source(&self, source: &SourceFile) -> FileResult {
        let outcome = split_statements_for(source.text(), self.config.dialect());
        let mut findings = Vec::new();

        if let Some(degradation) = outcome.degradation {
            tracing::warn!(
                path = %source.path().display(),
                line = degradation.line,
                "unterminated {}; analyzing the remainder as one statement",
                degradation.construct
            );
            findings.push(Finding::new(
                RuleKind::UnterminatedLiteral,
                format!(
                    "unterminated {} starting at line {}, column {}; the rest of the file was analyzed as one statement",
                    degradation.construct, degradation.line, degradation.column
                ),
            ));
        }

        if outcome.statements.is_empty() {
            findings.push(Finding::new(
                RuleKind::EmptyInput,
                "file contains no SQL statements",
            ));
            return FileResult::new(source.path(), PERFECT_SCORE, 0, findings);
        }

        let mut scores = Vec::with_capacity(outcome.statements.len());
        for statement in &outcome.statements {
            if statement.text.len() > self.config.max_statement_bytes() {
                findings.push(
                    Finding::new(
                        RuleKind::StatementTooLarge,
                        format!(
                            "statement is {} bytes, above the {} byte limit; not analyzed",
                            statement.text.len(),
                            self.config.max_statement_bytes()
                        ),
                    )
                    .with_statement(statement.ordinal)
                    .with_span(statement.span),
                );
                scores.push(PERFECT_SCORE);
                continue;
            }

            // Rules see the text before an unterminated construct; the tokenizer rejects the rest
            let analyzed = match outcome.degradation {
                Some(degradation) if statement.contains(degradation.offset) => {
                    statement.truncated(degradation.offset)
                }
                _ => *statement,
            };
            let view = StatementView::new(&analyzed, self.config.dialect());
            let statement_findings = self.rules.evaluate(&view);
            scores.push(score_statement(&statement_findings));
            findings.extend(statement_findings);
        }

        let score = file_score(&scores, self.config.policy());
        tracing::debug!(
            path = %source.path().display(),
            statements = outcome.statements.len(),
            findings = findings.len(),
            score,
            "analyzed file"
        );
        FileResult::new(source.path(), score, outcome.statements.len(), findings)
    }

    /// Read and analyze a file; an unreadable file scores 100 with a note
    pub fn analyze_path(&self, path: &Path) -> FileResult {
        match SourceFile::read(path, self.config.max_file_bytes()) {
            Ok(source) => self.analyze_source(&source),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                let note = Finding::new(RuleKind::UnreadableInput, e.to_string());
                FileResult::new(path, PERFECT_SCORE, 0, vec![note])
            }
        }
    }

    /// Analyze files in parallel; results come back in input order
    pub fn analyze_paths(&self, paths: &[PathBuf]) -> Vec<FileResult> {
        paths.par_iter().map(|path| self.analyze_path(path)).collect()
    }

    /// Analyze already-loaded sources in parallel, in input order
    pub fn analyze_sources(&self, sources: &[SourceFile]) -> Vec<FileResult> {
        sources
            .par_iter()
            .map(|source| self.analyze_source(source))
            .collect()
    }
}
